//! Every band at one location and instant

use super::calendar::TimeFields;
use super::position::compute_solar_position_on;
use super::surface::{SolarSurfaceResult, TerrainSample};
use super::timezone::TimeZoneGrid;
use crate::terrain::{hillshade, CellSpacing, HillshadeParams};
use geo_types::{Geometry, Point};
use serde::{Deserialize, Serialize};
use sunraster_core::raster::Raster;
use sunraster_core::{reduce_region, Reducer, Result};

/// Band values at a point, `None` where undefined
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointProbe {
    pub lon: f64,
    pub lat: f64,
    pub timestamp: Option<TimeFields>,
    pub dem: Option<f64>,
    pub time_zone: Option<f64>,
    pub elevation: Option<f64>,
    pub zenith: Option<f64>,
    pub azimuth: Option<f64>,
    pub surface_elevation: Option<f64>,
    pub surface_zenith: Option<f64>,
    pub surface_azimuth: Option<f64>,
    pub slope: Option<f64>,
    pub aspect: Option<f64>,
    /// Default hillshade (315°, 45°), 0-255
    pub hillshade: Option<f64>,
}

/// Sample the DEM, position, surface and hillshade bands at `point`.
///
/// Only the 3x3 block around the point is evaluated. A point off the DEM
/// gives a probe with every band `None`.
pub fn probe(
    point: Point<f64>,
    fields: &TimeFields,
    dem: &Raster<f64>,
    time_zones: &TimeZoneGrid,
    spacing: CellSpacing,
) -> Result<PointProbe> {
    let mut result = PointProbe {
        lon: point.x(),
        lat: point.y(),
        timestamp: Some(*fields),
        ..Default::default()
    };
    let Some((row, col)) = dem.pixel_index(point.x(), point.y()) else {
        return Ok(result);
    };

    let (rows, cols) = dem.shape();
    let (r0, c0) = (row.saturating_sub(1), col.saturating_sub(1));
    let (r1, c1) = ((row + 1).min(rows - 1), (col + 1).min(cols - 1));
    let block = dem.window(r0, c0, r1 - r0 + 1, c1 - c0 + 1)?;

    let position = compute_solar_position_on(fields, &block, time_zones)?;
    let terrain = TerrainSample::from_dem(&block, spacing)?;
    let shade = hillshade(
        &block,
        HillshadeParams {
            spacing,
            ..Default::default()
        },
    )?;
    let surface = SolarSurfaceResult::from_position(position, &terrain)?;

    let at = Geometry::Point(point);
    let first = |band: &Raster<f64>| reduce_region(band, Reducer::First, &at);

    result.dem = first(&block);
    result.time_zone = first(&surface.position.time_zone);
    result.elevation = first(&surface.position.elevation);
    result.zenith = first(&surface.position.zenith);
    result.azimuth = first(&surface.position.azimuth);
    result.surface_elevation = first(&surface.surface_elevation);
    result.surface_zenith = first(&surface.surface_zenith);
    result.surface_azimuth = first(&surface.surface_azimuth);
    result.slope = first(&surface.slope);
    result.aspect = first(&surface.aspect);
    result.hillshade = first(&shade);
    Ok(result)
}
