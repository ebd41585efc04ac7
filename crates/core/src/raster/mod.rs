//! Raster data structures and operations

mod element;
mod geotransform;
mod grid;
mod neighborhood;
mod properties;
mod stack;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use neighborhood::{Neighborhood, NeighborhoodIterator};
pub use properties::{parse_decimal, NumericLocale, RasterProperty};
pub use stack::BandStack;
