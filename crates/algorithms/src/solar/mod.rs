//! Solar geometry over rasters
//!
//! - [`calendar`]: UTC timestamps and their calendar fields
//! - [`timezone`]: per-pixel UTC offsets
//! - [`position`]: NOAA sun position per pixel
//! - [`surface`]: sun angles relative to the terrain
//! - [`illumination`]: hillshadow time series and sun hours
//! - [`probe`]: all bands at one point

pub mod calendar;
pub mod illumination;
pub mod position;
pub mod probe;
pub mod surface;
pub mod timezone;

pub use calendar::{is_leap_year, year_length, TimeFields};
pub use illumination::{
    compute_sun_hours, FrameMetadata, IlluminationFrame, IlluminationSeries, SunHours,
    SunHoursAccumulator, SunHoursParams, TimeSeries, TimeSeriesIter,
};
pub use position::{
    compute_solar_position, compute_solar_position_on, solar_angles, OrbitalTerms, SolarAngles,
    SolarPositionParams, SolarPositionResult,
};
pub use probe::{probe, PointProbe};
pub use surface::{compute_surface_position, SolarSurfaceResult, SurfaceParams, TerrainSample};
pub use timezone::{TimeZoneGrid, DEFAULT_ZONE_PROPERTY};
