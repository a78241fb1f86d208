//! Editor error taxonomy.
//!
//! Only `EngineInitError` changes what the user sees. Serialization and host
//! write failures are logged and recovered where they happen; decode failures
//! are handled inside the lifecycle adapter (see `notegrid_protocol::DecodeError`).

use std::fmt;

use notegrid_engine::EngineError;

/// The calculation engine failed its one-time setup. Fatal for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInitError {
    message: String,
}

impl EngineInitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<EngineError> for EngineInitError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Init(msg) => Self::new(msg),
            other => Self::new(other.to_string()),
        }
    }
}

impl fmt::Display for EngineInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to initialize spreadsheet engine: {}", self.message)
    }
}

impl std::error::Error for EngineInitError {}

/// The current workbook could not be turned into bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// No workbook is loaded.
    NoWorkbook,
    /// The engine refused to produce bytes.
    Engine(EngineError),
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWorkbook => write!(f, "no workbook loaded"),
            Self::Engine(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SerializationError {}

/// The host rejected a write. Not observable in every host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostWriteError(pub String);

impl fmt::Display for HostWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host write failed: {}", self.0)
    }
}

impl std::error::Error for HostWriteError {}
