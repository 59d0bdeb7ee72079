//! Measure/arrange layout over the scene graph.
//!
//! Callers drive layout through [`LayoutEngine`]; flex distribution and text
//! shaping are exposed for the painter and for tests.

mod core;
pub mod flex;
pub mod text;

pub use core::{Constraints, LayoutEngine, LayoutStats};
pub use flex::{FlexItem, distribute_flex, main_axis_spans};
pub use text::{ELLIPSIS, measure_text, shape_lines};
