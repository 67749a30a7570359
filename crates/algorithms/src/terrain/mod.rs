//! Terrain analysis: slope, aspect, shaded relief and cast shadows

mod aspect;
mod hillshade;
mod hillshadow;
mod horn;
mod slope;
mod spacing;

pub use aspect::{aspect, Aspect, AspectOutput, AspectParams, FLAT_ASPECT};
pub use hillshade::{hillshade, Hillshade, HillshadeParams};
pub use hillshadow::{hillshadow, Hillshadow, HillshadowParams, LIT, SHADOWED};
pub use slope::{slope, Slope, SlopeParams, SlopeUnits};
pub use spacing::{cell_dimensions, CellDimensions, CellSpacing, RowSpacing};
