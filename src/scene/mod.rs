//! Retained scene graph: the tree of containers and text the engine lays out
//! and paints.
//!
//! Structural operations only mark layout stale. Dirty regions are derived
//! later by the layout pass, which compares old and new bounds.

mod core;
pub mod props;

pub use core::{MeasureCache, Node, NodeId, NodeKind, SceneGraph, TextNode};
pub use props::{
    BorderGlyphs, BorderStyle, Color, ContainerProps, Dimension, Direction, Edges, Props, Style,
    TextProps, WrapMode,
};
