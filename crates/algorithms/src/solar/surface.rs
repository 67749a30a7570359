//! Solar angles relative to the local terrain surface
//!
//! The sun's zenith is tilted by the slope, toward the sun on south-facing
//! cells and away from it on north-facing ones, and the azimuth is measured
//! from the aspect:
//!
//! ```text
//! adj               = −1 if aspect ≤ 90 or aspect ≥ 270, else +1
//! surface_zenith    = zenith + slope · adj
//! surface_elevation = 90 − surface_zenith
//! surface_azimuth   = aspect − azimuth, wrapped into [0, 360)
//! ```
//!
//! Out-of-range surface zeniths on steep slopes are kept as computed.

use super::calendar::TimeFields;
use super::position::{compute_solar_position_on, SolarPositionResult};
use super::timezone::TimeZoneGrid;
use crate::terrain::{aspect, slope, AspectParams, CellSpacing, SlopeParams, FLAT_ASPECT};
use sunraster_core::raster::Raster;
use sunraster_core::{Region, Result};
use tracing::debug;

/// Parameters for solar-surface angles
#[derive(Debug, Clone, Default)]
pub struct SurfaceParams {
    /// Cell spacing used for slope and aspect
    pub spacing: CellSpacing,
}

/// Slope and aspect (degrees) of a DEM
#[derive(Debug, Clone)]
pub struct TerrainSample {
    pub slope: Raster<f64>,
    /// [`FLAT_ASPECT`] on flat cells
    pub aspect: Raster<f64>,
}

impl TerrainSample {
    /// Derive slope and aspect; no-data cells are NaN in both
    pub fn from_dem(dem: &Raster<f64>, spacing: CellSpacing) -> Result<Self> {
        let slope = slope(
            dem,
            SlopeParams {
                spacing,
                ..Default::default()
            },
        )?;
        let aspect = aspect(
            dem,
            AspectParams {
                spacing,
                ..Default::default()
            },
        )?;
        Ok(Self { slope, aspect })
    }
}

/// Solar position plus terrain-relative angles
#[derive(Debug, Clone)]
pub struct SolarSurfaceResult {
    pub position: SolarPositionResult,
    pub slope: Raster<f64>,
    pub aspect: Raster<f64>,
    pub surface_zenith: Raster<f64>,
    pub surface_elevation: Raster<f64>,
    pub surface_azimuth: Raster<f64>,
}

impl SolarSurfaceResult {
    /// Terrain and surface bands as (name, raster)
    pub fn bands(&self) -> [(&'static str, &Raster<f64>); 5] {
        [
            ("slope", &self.slope),
            ("aspect", &self.aspect),
            ("surface_zenith", &self.surface_zenith),
            ("surface_elevation", &self.surface_elevation),
            ("surface_azimuth", &self.surface_azimuth),
        ]
    }

    /// Combine a position result with terrain on the same grid
    pub fn from_position(position: SolarPositionResult, terrain: &TerrainSample) -> Result<Self> {
        let zenith = &position.zenith;
        let azimuth = &position.azimuth;
        let TerrainSample { slope, aspect } = terrain;

        let north_facing = aspect.compare(|a| a <= 90.0 || a >= 270.0);
        let adj = Raster::select(&north_facing, &slope.constant_like(-1.0), &slope.constant_like(1.0))?;
        let tilt = slope.zip_map(&adj, |s, a| s * a)?;
        let surface_zenith = zenith.zip_map(&tilt, |z, t| z + t)?;
        // 90 − surface_zenith; exact when the tilt is zero
        let surface_elevation = position.elevation.zip_map(&tilt, |e, t| e - t)?;

        let azimuth_adj = aspect.zip_map(azimuth, |asp, az| asp - az)?;
        let negative = azimuth_adj.compare(|v| v < 0.0);
        let wrapped = Raster::select(&negative, &azimuth_adj.map(|v| 360.0 + v), &azimuth_adj)?
            .map(|v| if v >= 360.0 { v - 360.0 } else { v });

        // flat cells have no aspect: keep the sun's azimuth
        let flat = aspect.compare(|a| a == FLAT_ASPECT);
        let surface_azimuth = Raster::select(&flat, azimuth, &wrapped)?;

        Ok(Self {
            slope: slope.clone(),
            aspect: aspect.clone(),
            surface_zenith: with_nan_nodata(surface_zenith),
            surface_elevation: with_nan_nodata(surface_elevation),
            surface_azimuth: with_nan_nodata(surface_azimuth),
            position,
        })
    }
}

fn with_nan_nodata(mut band: Raster<f64>) -> Raster<f64> {
    band.set_nodata(Some(f64::NAN));
    band
}

/// Solar-surface angles on the grid of a lon/lat `dem`, limited to `region`.
///
/// Slope and aspect come from the whole DEM so cells on the region border
/// keep their full neighbourhood; every band, slope and aspect included,
/// is NaN outside the region.
pub fn compute_surface_position(
    fields: &TimeFields,
    region: &Region,
    dem: &Raster<f64>,
    time_zones: &TimeZoneGrid,
    params: &SurfaceParams,
) -> Result<SolarSurfaceResult> {
    debug!(timestamp = %fields, rows = dem.rows(), cols = dem.cols(), "solar surface position");
    let full = TerrainSample::from_dem(dem, params.spacing)?;
    let terrain = TerrainSample {
        slope: region.clip(&full.slope),
        aspect: region.clip(&full.aspect),
    };
    let clipped = region.clip(dem);
    let position = compute_solar_position_on(fields, &clipped, time_zones)?;
    SolarSurfaceResult::from_position(position, &terrain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sunraster_core::{GeoTransform, CRS};

    fn geographic_dem(f: impl Fn(usize, usize) -> f64) -> Raster<f64> {
        let mut dem: Raster<f64> = Raster::new(8, 8);
        dem.set_transform(GeoTransform::new(10.0, 46.0, 0.01, -0.01));
        dem.set_crs(Some(CRS::wgs84()));
        for row in 0..8 {
            for col in 0..8 {
                dem.set(row, col, f(row, col)).unwrap();
            }
        }
        dem
    }

    fn position_on(dem: &Raster<f64>, t: &str) -> SolarPositionResult {
        let tz = TimeZoneGrid::nautical(dem).unwrap();
        compute_solar_position_on(&TimeFields::parse(t).unwrap(), dem, &tz).unwrap()
    }

    #[test]
    fn test_flat_dem_is_noop() {
        let dem = geographic_dem(|_, _| 500.0);
        let position = position_on(&dem, "2022-08-27T10:00:00");
        let terrain = TerrainSample::from_dem(&dem, CellSpacing::Auto).unwrap();
        let surface = SolarSurfaceResult::from_position(position.clone(), &terrain).unwrap();

        for row in 0..8 {
            for col in 0..8 {
                let z = position.zenith.get(row, col).unwrap();
                assert_eq!(surface.surface_zenith.get(row, col).unwrap(), z);
                assert_eq!(
                    surface.surface_elevation.get(row, col).unwrap(),
                    position.elevation.get(row, col).unwrap()
                );
                assert_eq!(
                    surface.surface_azimuth.get(row, col).unwrap(),
                    position.azimuth.get(row, col).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_azimuth_negative_wraparound() {
        // aspect 10°, azimuth 350° → 10 − 350 = −340 → 20°
        let mut template: Raster<f64> = Raster::new(1, 1);
        template.set_crs(Some(CRS::wgs84()));
        let mut position = position_on(&template, "2022-08-27T10:00:00");
        position.azimuth.set(0, 0, 350.0).unwrap();

        let terrain = TerrainSample {
            slope: template.like(15.0),
            aspect: template.like(10.0),
        };
        let surface = SolarSurfaceResult::from_position(position, &terrain).unwrap();
        assert_relative_eq!(surface.surface_azimuth.get(0, 0).unwrap(), 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_north_and_south_facing_tilt() {
        let mut template: Raster<f64> = Raster::new(1, 2);
        template.set_crs(Some(CRS::wgs84()));
        let mut position = position_on(&template, "2022-08-27T10:00:00");
        position.zenith = template.like(40.0);
        position.elevation = template.like(50.0);

        let mut aspect = template.like(0.0);
        aspect.set(0, 1, 180.0).unwrap();
        let terrain = TerrainSample {
            slope: template.like(10.0),
            aspect,
        };
        let surface = SolarSurfaceResult::from_position(position, &terrain).unwrap();
        assert_relative_eq!(surface.surface_zenith.get(0, 0).unwrap(), 30.0);
        assert_relative_eq!(surface.surface_zenith.get(0, 1).unwrap(), 50.0);
        assert_relative_eq!(surface.surface_elevation.get(0, 1).unwrap(), 40.0);
    }

    #[test]
    fn test_steep_slope_not_clamped() {
        let mut template: Raster<f64> = Raster::new(1, 1);
        template.set_crs(Some(CRS::wgs84()));
        let mut position = position_on(&template, "2022-08-27T10:00:00");
        position.zenith = template.like(80.0);
        position.elevation = template.like(10.0);
        let terrain = TerrainSample {
            slope: template.like(40.0),
            aspect: template.like(180.0),
        };
        let surface = SolarSurfaceResult::from_position(position, &terrain).unwrap();
        assert_relative_eq!(surface.surface_zenith.get(0, 0).unwrap(), 120.0);
        assert_relative_eq!(surface.surface_elevation.get(0, 0).unwrap(), -30.0);
    }

    #[test]
    fn test_invariants_on_relief() {
        let dem = geographic_dem(|row, col| ((row * 7 + col * 13) % 11) as f64 * 40.0);
        let region = Region::bbox(10.0, 45.9, 10.08, 46.0).unwrap();
        let tz = TimeZoneGrid::nautical(&dem).unwrap();
        let t = TimeFields::parse("2022-08-27T14:20:00").unwrap();
        let surface = compute_surface_position(&t, &region, &dem, &tz, &SurfaceParams::default()).unwrap();

        for ((ze, el), az) in surface
            .surface_zenith
            .data()
            .iter()
            .zip(surface.surface_elevation.data().iter())
            .zip(surface.surface_azimuth.data().iter())
        {
            assert!((ze - (90.0 - el)).abs() < 1e-9);
            assert!((0.0..360.0).contains(az), "surface azimuth {}", az);
        }
    }

    #[test]
    fn test_bands_nan_outside_region() {
        let dem = geographic_dem(|row, col| (row * 8 + col) as f64 * 25.0);
        // western half of the DEM
        let region = Region::bbox(10.0, 45.92, 10.04, 46.0).unwrap();
        let tz = TimeZoneGrid::nautical(&dem).unwrap();
        let t = TimeFields::parse("2022-08-27T10:00:00").unwrap();
        let surface = compute_surface_position(&t, &region, &dem, &tz, &SurfaceParams::default()).unwrap();

        let full = TerrainSample::from_dem(&dem, CellSpacing::Auto).unwrap();
        for row in 0..8 {
            for col in 0..8 {
                let slope = surface.slope.get(row, col).unwrap();
                let aspect = surface.aspect.get(row, col).unwrap();
                if col < 4 {
                    // border cells keep the slope of the full neighbourhood
                    assert_eq!(slope, full.slope.get(row, col).unwrap());
                    assert_eq!(aspect, full.aspect.get(row, col).unwrap());
                    assert!(!surface.surface_zenith.get(row, col).unwrap().is_nan());
                } else {
                    assert!(slope.is_nan(), "slope at ({row}, {col})");
                    assert!(aspect.is_nan(), "aspect at ({row}, {col})");
                    assert!(surface.surface_zenith.get(row, col).unwrap().is_nan());
                    assert!(surface.position.elevation.get(row, col).unwrap().is_nan());
                }
            }
        }
    }
}
