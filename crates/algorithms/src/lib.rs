//! # sunraster algorithms
//!
//! Per-pixel solar geometry and the terrain products built on it.
//!
//! ## Modules
//!
//! - **terrain**: Slope, aspect, hillshade, hillshadow
//! - **solar**: Solar position, solar-surface angles, sun hours, point probes

pub(crate) mod maybe_rayon;
pub mod solar;
pub mod terrain;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::solar::{
        compute_solar_position, compute_solar_position_on, compute_sun_hours,
        compute_surface_position, probe, IlluminationSeries, PointProbe, SolarPositionParams,
        SolarPositionResult, SolarSurfaceResult, SunHours, SunHoursParams, SurfaceParams,
        TimeFields, TimeSeries, TimeZoneGrid,
    };
    pub use crate::terrain::{
        aspect, hillshade, hillshadow, slope, Aspect, AspectParams, CellSpacing, Hillshade,
        HillshadeParams, Hillshadow, HillshadowParams, Slope, SlopeParams, SlopeUnits,
    };
    pub use sunraster_core::prelude::*;
}
