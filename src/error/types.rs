use thiserror::Error;

/// Unified result type for the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced at the edges of the engine.
///
/// Nothing inside the mutate → layout → paint pipeline produces one of these;
/// they come from writing terminal output, decoding command streams and
/// driving the terminal.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("sink rejected frame: {0}")]
    Sink(String),
    #[error("command decode failure: {0}")]
    Decode(String),
    #[error("terminal backend error: {0}")]
    Terminal(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
