//! Benchmarks for solar position and the sun-hours series

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo_types::Point;
use sunraster_algorithms::solar::{
    compute_solar_position, compute_sun_hours, SolarPositionParams, SunHoursParams, TimeFields,
    TimeZoneGrid,
};
use sunraster_algorithms::terrain::{hillshadow, HillshadowParams};
use sunraster_core::{GeoTransform, Raster, Region, CRS};

fn create_dem(size: usize) -> Raster<f64> {
    let mut dem = Raster::new(size, size);
    dem.set_transform(GeoTransform::new(10.0, 46.0, 0.0003, -0.0003));
    dem.set_crs(Some(CRS::wgs84()));

    for row in 0..size {
        for col in 0..size {
            let base = (row + col) as f64;
            let variation = ((row * 7 + col * 13) % 100) as f64 / 10.0;
            dem.set(row, col, 1000.0 + base + variation).unwrap();
        }
    }
    dem
}

fn bench_solar_position(c: &mut Criterion) {
    let mut group = c.benchmark_group("solar_position_global");
    let region = Region::global();
    let at = TimeFields::parse("2022-06-21T12:00:00").unwrap();

    for resolution in [2.0, 1.0, 0.5].iter() {
        let params = SolarPositionParams {
            resolution: *resolution,
        };
        let tz = TimeZoneGrid::nautical(&region.template(*resolution).unwrap()).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(resolution), resolution, |b, _| {
            b.iter(|| compute_solar_position(black_box(&at), &region, &tz, &params).unwrap())
        });
    }

    group.finish();
}

fn bench_hillshadow(c: &mut Criterion) {
    let mut group = c.benchmark_group("hillshadow");

    for size in [128, 256, 512].iter() {
        let dem = create_dem(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| hillshadow(black_box(&dem), HillshadowParams::default()).unwrap())
        });
    }

    group.finish();
}

fn bench_sun_hours(c: &mut Criterion) {
    let mut group = c.benchmark_group("sun_hours_day");
    group.sample_size(10);
    let start = TimeFields::parse("2022-08-27T04:00:00").unwrap();
    let end = TimeFields::parse("2022-08-27T20:00:00").unwrap();

    for size in [64, 128].iter() {
        let dem = create_dem(*size);
        let tz = TimeZoneGrid::nautical(&dem).unwrap();
        let (lon, lat) = dem.pixel_to_geo(size / 2, size / 2);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                compute_sun_hours(
                    &start,
                    &end,
                    30,
                    Point::new(lon, lat),
                    black_box(&dem),
                    &tz,
                    SunHoursParams::default(),
                )
                .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_solar_position, bench_hillshadow, bench_sun_hours);
criterion_main!(benches);
