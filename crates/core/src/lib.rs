//! # sunraster core
//!
//! Grid types, regions and I/O underneath the sunraster solar pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced grid with elementwise operations and
//!   region reduction
//! - `GeoTransform` and `CRS` for georeferencing
//! - `Region`: validated lon/lat extents (boxes or polygons)
//! - Vector features, GeoJSON loading and "first" rasterization
//! - Native GeoTIFF I/O

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod region;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{reduce_region, GeoTransform, Raster, RasterElement, Reducer};
pub use region::Region;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{reduce_region, GeoTransform, Raster, RasterElement, Reducer};
    pub use crate::region::Region;
    pub use crate::Algorithm;
}

/// Core trait for raster algorithms.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
