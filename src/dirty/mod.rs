//! Dirty-region tracking backed by an R-tree.

mod core;
pub mod rtree;

pub use core::{DirtyConfig, DirtyEntry, DirtyKind, DirtyRegions, PRIORITY_DEFAULT, PRIORITY_MOVED};
pub use rtree::{BBox, Bounded, RTree};
