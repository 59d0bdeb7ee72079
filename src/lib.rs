//! Retained-mode layout and differential paint engine for terminal UIs.
//!
//! A component layer describes the screen as a tree of containers and text
//! through [`MutationCommand`] batches. [`RoomHost`] applies them to a
//! [`SceneGraph`], runs flexbox-style layout, tracks what moved in
//! [`DirtyRegions`] and paints only that damage as [`TerminalOp`]s.

pub mod cursor;
pub mod dirty;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod render;
pub mod runtime;
pub mod scene;
pub mod width;

pub use dirty::{DirtyConfig, DirtyEntry, DirtyKind, DirtyRegions};
pub use error::{EngineError, Result};
pub use geometry::{Rect, Size};
pub use layout::{Constraints, LayoutEngine, LayoutStats};
pub use logging::{LogEvent, LogFields, LogLevel, Logger, LoggingError, LoggingResult};
pub use metrics::{EngineMetrics, MetricSnapshot};
pub use render::{AnsiSettings, AnsiSink, Frame, OpSink, Painter, RecordingSink, TerminalOp};
pub use runtime::audit::{
    BufferedCommitAudit, CommitAudit, CommitAuditEvent, CommitAuditEventBuilder, CommitStage,
    NullCommitAudit,
};
pub use runtime::commands::{CommandBatch, MutationCommand, NodeKey, decode_batch};
pub use runtime::driver::cli::{CliDriver, CliDriverError, DriverResult};
pub use runtime::{CanvasInfo, CommitReport, RoomHost, RuntimeConfig};
pub use scene::{
    BorderStyle, Color, ContainerProps, Dimension, Direction, NodeId, Props, SceneGraph, Style,
    TextProps, WrapMode,
};
pub use width::display_width;
