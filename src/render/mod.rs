//! Differential painting: cell buffer, painter and terminal op sinks.

mod ansi;
mod buffer;
mod core;
mod ops;

pub use ansi::{AnsiSettings, AnsiSink};
pub use buffer::{Cell, CellBuffer};
pub use core::{Frame, Painter};
pub use ops::{OpSink, RecordingSink, TerminalOp};
