//! Grid map and the point types used to address it.

pub mod grid;
pub mod point_types;

pub use grid::GridMap;
pub use point_types::{Cell, WorldPoint};
