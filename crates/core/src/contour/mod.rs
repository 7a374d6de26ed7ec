//! Isopleth polygons for the threshold ladder

pub mod isopleth;
pub mod ladder;

pub use isopleth::{IsoplethPolygon, IsoplethTracer, PlumeOutline};
pub use ladder::{IsoplethLevel, ISOPLETH_LADDER};
