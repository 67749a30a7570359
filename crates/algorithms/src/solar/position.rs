//! Per-pixel solar position (NOAA general solar position approximation)
//!
//! For a UTC instant and a lon/lat grid, with γ the fractional year:
//!
//! ```text
//! eqtime = 229.18 (0.000075 + 0.001868 cos γ − 0.032077 sin γ
//!                  − 0.014615 cos 2γ − 0.040849 sin 2γ)          minutes
//! decl   = 0.006918 − 0.399912 cos γ + 0.070257 sin γ − 0.006758 cos 2γ
//!          + 0.000907 sin 2γ − 0.002697 cos 3γ + 0.00148 sin 3γ  radians
//! time_offset = eqtime + 4 lon − 60 tz
//! tst    = hour·60 + minute + second/60 + time_offset
//! ha     = tst / 4 − 180
//! elev   = asin(sin lat sin decl + cos lat cos decl cos ha)
//! zenith = 90 − elev
//! az     = acos((sin decl cos lat − cos decl sin lat cos ha) / cos elev)
//!          mirrored to 360 − az in the afternoon (ha ≥ 0)
//! ```
//!
//! Refraction is ignored; accuracy is about 0.01°.

use super::calendar::TimeFields;
use super::timezone::TimeZoneGrid;
use crate::maybe_rayon::*;
use serde::{Deserialize, Serialize};
use sunraster_core::raster::{Raster, RasterElement};
use sunraster_core::{Error, Region, Result};
use tracing::{debug, warn};

/// |cos(elevation)| below this is treated as the sun at zenith or nadir
const SINGULAR_COS_ELEVATION: f64 = 1e-12;

/// Parameters for solar position over a [`Region`]
#[derive(Debug, Clone)]
pub struct SolarPositionParams {
    /// Grid resolution in degrees
    pub resolution: f64,
}

impl Default for SolarPositionParams {
    fn default() -> Self {
        Self { resolution: 0.5 }
    }
}

/// Time-only terms, shared by every pixel of one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalTerms {
    /// γ in radians
    pub fractional_year: f64,
    /// Radians
    pub declination: f64,
    /// Minutes
    pub equation_of_time: f64,
}

impl OrbitalTerms {
    pub fn at(fields: &TimeFields) -> Self {
        let fy = fields.fractional_year();
        let (s1, c1) = fy.sin_cos();
        let (s2, c2) = (2.0 * fy).sin_cos();
        let (s3, c3) = (3.0 * fy).sin_cos();

        let equation_of_time =
            229.18 * (0.000075 + 0.001868 * c1 - 0.032077 * s1 - 0.014615 * c2 - 0.040849 * s2);
        let declination = 0.006918 - 0.399912 * c1 + 0.070257 * s1 - 0.006758 * c2
            + 0.000907 * s2
            - 0.002697 * c3
            + 0.00148 * s3;

        Self {
            fractional_year: fy,
            declination,
            equation_of_time,
        }
    }
}

/// Solar angles at one location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarAngles {
    /// Minutes
    pub time_offset: f64,
    /// Minutes
    pub true_solar_time: f64,
    /// Degrees
    pub hour_angle: f64,
    /// Degrees above the horizon
    pub elevation: f64,
    /// Degrees, `90 − elevation`
    pub zenith: f64,
    /// Degrees clockwise from north, in [0, 360)
    pub azimuth: f64,
    /// Sun exactly at zenith or nadir: azimuth undefined, reported as 0
    pub singular: bool,
}

impl SolarAngles {
    fn undefined() -> Self {
        Self {
            time_offset: f64::NAN,
            true_solar_time: f64::NAN,
            hour_angle: f64::NAN,
            elevation: f64::NAN,
            zenith: f64::NAN,
            azimuth: f64::NAN,
            singular: false,
        }
    }
}

/// Solar angles at a single lon/lat for a UTC offset in hours
pub fn solar_angles(fields: &TimeFields, lon: f64, lat: f64, tz_offset: f64) -> SolarAngles {
    angles_with(&OrbitalTerms::at(fields), fields.minutes_of_day(), lon, lat, tz_offset)
}

#[inline]
fn angles_with(orbit: &OrbitalTerms, minutes_of_day: f64, lon: f64, lat: f64, tz: f64) -> SolarAngles {
    let time_offset = orbit.equation_of_time + 4.0 * lon - 60.0 * tz;
    let true_solar_time = minutes_of_day + time_offset;
    let hour_angle = true_solar_time / 4.0 - 180.0;

    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    let (sin_decl, cos_decl) = orbit.declination.sin_cos();
    let cos_ha = hour_angle.to_radians().cos();

    let elevation_rad = (sin_lat * sin_decl + cos_lat * cos_decl * cos_ha).clamp(-1.0, 1.0).asin();
    let elevation = elevation_rad.to_degrees();
    let zenith = 90.0 - elevation;

    let cos_elev = elevation_rad.cos();
    let singular = cos_elev.abs() < SINGULAR_COS_ELEVATION;
    let azimuth = if singular {
        0.0
    } else {
        let raw = ((sin_decl * cos_lat - cos_decl * sin_lat * cos_ha) / cos_elev)
            .clamp(-1.0, 1.0)
            .acos()
            .to_degrees();
        let az = if hour_angle >= 0.0 { (360.0 - raw).abs() } else { raw.abs() };
        if az >= 360.0 {
            az - 360.0
        } else {
            az
        }
    };

    SolarAngles {
        time_offset,
        true_solar_time,
        hour_angle,
        elevation,
        zenith,
        azimuth,
        singular,
    }
}

/// Solar position bands for one instant over one grid
#[derive(Debug, Clone)]
pub struct SolarPositionResult {
    /// Calendar fields the bands were computed for
    pub fields: TimeFields,
    /// Time-only terms of this instant
    pub orbit: OrbitalTerms,
    /// UTC offset (hours); NaN where uncovered
    pub time_zone: Raster<f64>,
    pub fractional_year: Raster<f64>,
    pub declination: Raster<f64>,
    pub equation_of_time: Raster<f64>,
    pub time_offset: Raster<f64>,
    pub longitude: Raster<f64>,
    pub latitude: Raster<f64>,
    pub true_solar_time: Raster<f64>,
    pub hour_angle: Raster<f64>,
    pub elevation: Raster<f64>,
    pub zenith: Raster<f64>,
    pub azimuth: Raster<f64>,
    /// 1 where the azimuth was undefined and set to 0
    pub singular_mask: Raster<u8>,
    /// 1 where the pixel was evaluated (inside the grid's valid area and
    /// covered by a time zone)
    pub coverage_mask: Raster<u8>,
}

impl SolarPositionResult {
    /// All float bands as (name, raster)
    pub fn bands(&self) -> [(&'static str, &Raster<f64>); 12] {
        [
            ("time_zone", &self.time_zone),
            ("fractional_year", &self.fractional_year),
            ("declination", &self.declination),
            ("equation_of_time", &self.equation_of_time),
            ("time_offset", &self.time_offset),
            ("longitude", &self.longitude),
            ("latitude", &self.latitude),
            ("true_solar_time", &self.true_solar_time),
            ("hour_angle", &self.hour_angle),
            ("elevation", &self.elevation),
            ("zenith", &self.zenith),
            ("azimuth", &self.azimuth),
        ]
    }

    /// Band by name
    pub fn band(&self, name: &str) -> Option<&Raster<f64>> {
        self.bands().into_iter().find(|(n, _)| *n == name).map(|(_, r)| r)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.elevation.shape()
    }
}

/// Solar position over `region` on an EPSG:4326 grid of
/// `params.resolution` degrees. Cells outside the region are NaN.
pub fn compute_solar_position(
    fields: &TimeFields,
    region: &Region,
    time_zones: &TimeZoneGrid,
    params: &SolarPositionParams,
) -> Result<SolarPositionResult> {
    let template = region.template(params.resolution)?;
    debug!(
        timestamp = %fields,
        rows = template.rows(),
        cols = template.cols(),
        resolution = params.resolution,
        "solar position over region"
    );
    compute_solar_position_on(fields, &template, time_zones)
}

/// Solar position at the pixel centres of an existing lon/lat grid.
///
/// No-data cells of `template` are skipped (NaN in every band); its values
/// are otherwise unused.
pub fn compute_solar_position_on<T: RasterElement>(
    fields: &TimeFields,
    template: &Raster<T>,
    time_zones: &TimeZoneGrid,
) -> Result<SolarPositionResult> {
    if let Some(crs) = template.crs() {
        if !crs.is_geographic() {
            return Err(Error::CrsMismatch(crs.identifier(), "EPSG:4326".into()));
        }
    }

    position_grid(fields, OrbitalTerms::at(fields), template, time_zones)
}

fn position_grid<T: RasterElement>(
    fields: &TimeFields,
    orbit: OrbitalTerms,
    template: &Raster<T>,
    time_zones: &TimeZoneGrid,
) -> Result<SolarPositionResult> {
    let (rows, cols) = template.shape();
    let minutes = fields.minutes_of_day();

    // (lon, lat, tz, angles, in_grid)
    type Pixel = (f64, f64, f64, SolarAngles, bool);
    let pixels: Vec<Pixel> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let (lon, lat) = template.pixel_to_geo(col, row);
                    // SAFETY: row < rows, col < cols
                    let v = unsafe { template.get_unchecked(row, col) };
                    if template.is_nodata(v) {
                        return (f64::NAN, f64::NAN, f64::NAN, SolarAngles::undefined(), false);
                    }
                    match time_zones.offset_at(lon, lat) {
                        Some(tz) => {
                            let tz = f64::from(tz);
                            (lon, lat, tz, angles_with(&orbit, minutes, lon, lat, tz), true)
                        }
                        None => (lon, lat, f64::NAN, SolarAngles::undefined(), true),
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let band = |f: &dyn Fn(&Pixel) -> f64| -> Result<Raster<f64>> {
        template.derive_vec(pixels.iter().map(f).collect(), Some(f64::NAN))
    };
    // time-only bands are defined wherever the pixel is
    let timed = |value: f64| move |p: &Pixel| if p.2.is_nan() { f64::NAN } else { value };

    let coverage: Vec<u8> = pixels.iter().map(|p| u8::from(!p.2.is_nan())).collect();
    let singular: Vec<u8> = pixels.iter().map(|p| u8::from(p.3.singular)).collect();

    let uncovered = pixels.iter().filter(|p| p.4 && p.2.is_nan()).count();
    if uncovered > 0 {
        warn!(uncovered, timestamp = %fields, "pixels outside time-zone coverage left undefined");
    }
    let singular_count = singular.iter().filter(|&&s| s != 0).count();
    if singular_count > 0 {
        warn!(singular_count, timestamp = %fields, "sun at zenith or nadir, azimuth set to 0");
    }

    Ok(SolarPositionResult {
        fields: *fields,
        orbit,
        time_zone: band(&|p| p.2)?,
        fractional_year: band(&timed(orbit.fractional_year))?,
        declination: band(&timed(orbit.declination))?,
        equation_of_time: band(&timed(orbit.equation_of_time))?,
        time_offset: band(&|p| p.3.time_offset)?,
        longitude: band(&|p| p.0)?,
        latitude: band(&|p| p.1)?,
        true_solar_time: band(&|p| p.3.true_solar_time)?,
        hour_angle: band(&|p| p.3.hour_angle)?,
        elevation: band(&|p| p.3.elevation)?,
        zenith: band(&|p| p.3.zenith)?,
        azimuth: band(&|p| p.3.azimuth)?,
        singular_mask: template.derive_vec(singular, None)?,
        coverage_mask: template.derive_vec(coverage, None)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sunraster_core::{GeoTransform, CRS};

    fn utc_grid(template: &Raster<f64>) -> TimeZoneGrid {
        let zeros = template.map(|_| 0i32);
        TimeZoneGrid::from_raster(zeros).unwrap()
    }

    #[test]
    fn test_equator_equinox_noon_near_zenith() {
        let t = TimeFields::parse("2022-09-23T12:00:00").unwrap();
        let a = solar_angles(&t, 0.0, 0.0, 0.0);
        assert!((a.elevation - 90.0).abs() < 2.0, "elevation {}", a.elevation);
        assert_relative_eq!(a.zenith, 90.0 - a.elevation, epsilon = 1e-12);
        assert!(!a.singular);
    }

    #[test]
    fn test_morning_east_afternoon_west() {
        let t = TimeFields::parse("2023-06-21T08:00:00").unwrap();
        let morning = solar_angles(&t, 0.0, 45.0, 0.0);
        assert!(morning.hour_angle < 0.0);
        assert!(morning.azimuth > 45.0 && morning.azimuth < 135.0, "az {}", morning.azimuth);

        let t = TimeFields::parse("2023-06-21T16:00:00").unwrap();
        let afternoon = solar_angles(&t, 0.0, 45.0, 0.0);
        assert!(afternoon.azimuth > 225.0 && afternoon.azimuth < 315.0, "az {}", afternoon.azimuth);
    }

    #[test]
    fn test_time_zone_offset_cancels_longitude() {
        // 15° east with UTC+1 is the same local solar time as 0° with UTC+0
        let t = TimeFields::parse("2023-03-01T10:00:00").unwrap();
        let a = solar_angles(&t, 15.0, 30.0, 1.0);
        let b = solar_angles(&t, 0.0, 30.0, 0.0);
        assert_relative_eq!(a.time_offset, b.time_offset, epsilon = 1e-9);
    }

    #[test]
    fn test_orbital_terms_solstice() {
        let t = TimeFields::parse("2023-06-21T12:00:00").unwrap();
        let orbit = OrbitalTerms::at(&t);
        assert_relative_eq!(orbit.declination.to_degrees(), 23.44, epsilon = 0.1);
        assert!(orbit.equation_of_time.abs() < 3.0);
    }

    fn equinox_orbit() -> OrbitalTerms {
        OrbitalTerms {
            fractional_year: 0.0,
            declination: 0.0,
            equation_of_time: 0.0,
        }
    }

    #[test]
    fn test_sun_overhead_is_singular() {
        let a = angles_with(&equinox_orbit(), 720.0, 0.0, 0.0, 0.0);
        assert!(a.singular);
        assert_eq!(a.azimuth, 0.0);
        assert_relative_eq!(a.elevation, 90.0, epsilon = 1e-12);
        assert_relative_eq!(a.zenith, 0.0, epsilon = 1e-12);
        assert_relative_eq!(a.hour_angle, 0.0, epsilon = 1e-12);
        assert_relative_eq!(a.true_solar_time, 720.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_pixel_flagged_in_grid() {
        // cell centres at lon -1, 0, 1 on the equator
        let mut template: Raster<f64> = Raster::new(1, 3);
        template.set_transform(GeoTransform::new(-1.5, 0.5, 1.0, -1.0));
        template.set_crs(Some(CRS::wgs84()));
        let tz = utc_grid(&template);
        let t = TimeFields::parse("2022-03-20T12:00:00").unwrap();

        let result = position_grid(&t, equinox_orbit(), &template, &tz).unwrap();
        assert_eq!(result.singular_mask.count_set(), 1);
        assert_eq!(result.singular_mask.get(0, 1).unwrap(), 1);
        assert_eq!(result.azimuth.get(0, 1).unwrap(), 0.0);
        assert_relative_eq!(result.elevation.get(0, 1).unwrap(), 90.0, epsilon = 1e-12);
        assert_relative_eq!(result.zenith.get(0, 1).unwrap(), 0.0, epsilon = 1e-12);
        assert_eq!(result.coverage_mask.count_set(), 3);

        // before local noon at lon -1, after it at lon 1
        assert!(result.elevation.get(0, 0).unwrap() < 90.0);
        assert_relative_eq!(result.azimuth.get(0, 0).unwrap(), 90.0, epsilon = 1e-6);
        assert_relative_eq!(result.azimuth.get(0, 2).unwrap(), 270.0, epsilon = 1e-6);
    }

    #[test]
    fn test_grid_bands_and_invariants() {
        let region = Region::bbox(-30.0, -40.0, 30.0, 40.0).unwrap();
        let template = region.template(5.0).unwrap();
        let tz = TimeZoneGrid::nautical(&template).unwrap();
        let t = TimeFields::parse("2024-02-29T09:30:00").unwrap();

        let result = compute_solar_position(&t, &region, &tz, &SolarPositionParams { resolution: 5.0 })
            .unwrap();
        assert_eq!(result.shape(), (16, 12));
        assert_eq!(result.coverage_mask.count_set(), 16 * 12);

        for (e, z) in result.elevation.data().iter().zip(result.zenith.data().iter()) {
            assert!((z - (90.0 - e)).abs() < 1e-9);
        }
        for &az in result.azimuth.data().iter() {
            assert!((0.0..360.0).contains(&az), "azimuth {}", az);
        }
        assert_relative_eq!(
            result.latitude.get(0, 0).unwrap(),
            37.5,
            epsilon = 1e-9
        );
        assert!(result.band("hour_angle").is_some());
        assert!(result.band("nope").is_none());
    }

    #[test]
    fn test_uncovered_pixels_are_nan() {
        let mut template: Raster<f64> = Raster::new(1, 4);
        template.set_transform(GeoTransform::new(0.0, 1.0, 1.0, -1.0));
        template.set_crs(Some(CRS::wgs84()));

        let mut zones: Raster<i32> = template.map(|_| 0);
        zones.set_nodata(Some(-128));
        zones.set(0, 3, -128).unwrap();
        let tz = TimeZoneGrid::from_raster(zones).unwrap();

        let t = TimeFields::parse("2022-06-01T12:00:00").unwrap();
        let result = compute_solar_position_on(&t, &template, &tz).unwrap();
        assert!(result.elevation.get(0, 3).unwrap().is_nan());
        assert!(result.declination.get(0, 3).unwrap().is_nan());
        assert!(!result.elevation.get(0, 2).unwrap().is_nan());
        assert_eq!(result.coverage_mask.get(0, 3).unwrap(), 0);
        assert_eq!(result.coverage_mask.count_set(), 3);
    }

    #[test]
    fn test_idempotent() {
        let region = Region::bbox(100.0, -10.0, 120.0, 10.0).unwrap();
        let template = region.template(2.0).unwrap();
        let tz = utc_grid(&template);
        let t = TimeFields::parse("2022-11-02T03:15:45").unwrap();
        let params = SolarPositionParams { resolution: 2.0 };

        let a = compute_solar_position(&t, &region, &tz, &params).unwrap();
        let b = compute_solar_position(&t, &region, &tz, &params).unwrap();
        for ((_, x), (_, y)) in a.bands().iter().zip(b.bands().iter()) {
            for (u, v) in x.data().iter().zip(y.data().iter()) {
                assert!(u.to_bits() == v.to_bits() || (u.is_nan() && v.is_nan()));
            }
        }
    }

    #[test]
    fn test_projected_template_rejected() {
        let mut template: Raster<f64> = Raster::new(2, 2);
        template.set_crs(Some(CRS::from_epsg(32633)));
        let tz = utc_grid(&Raster::new(2, 2));
        let t = TimeFields::parse("2022-06-01T12:00:00").unwrap();
        assert!(compute_solar_position_on(&t, &template, &tz).is_err());
    }
}
