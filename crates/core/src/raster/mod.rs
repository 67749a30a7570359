//! Raster data structures and operations

mod element;
mod geotransform;
mod grid;
mod ops;
mod reduce;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use reduce::{reduce_region, Reducer};
