//! Error types shared by every engine module.

mod types;

pub use types::{EngineError, Result};
