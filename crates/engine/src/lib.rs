//! Calculation engine contract.
//!
//! The editor treats the spreadsheet engine as an opaque component. All it
//! relies on is:
//!
//! - a one-time asynchronous `init`
//! - a model constructible fresh or from raw bytes
//! - `to_bytes` on a model, deterministic for unmodified content
//!
//! `grid` provides `GridEngine`, a small in-memory engine satisfying the
//! contract. It backs the editor's tests and any embedding without a real engine.

pub mod grid;

use std::fmt;
use std::future::Future;

pub use grid::{GridEngine, GridModel};

/// Workbook name used for notes without prior content.
pub const DEFAULT_WORKBOOK_NAME: &str = "Spreadsheet";
/// Locale used for notes without prior content.
pub const DEFAULT_LOCALE: &str = "en";
/// Timezone used for notes without prior content.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Parameters for a freshly created workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookSpec {
    pub name: String,
    pub locale: String,
    pub timezone: String,
}

impl Default for WorkbookSpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_WORKBOOK_NAME.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

/// Failure reported by an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// One-time setup rejected.
    Init(String),
    /// Bytes handed to the engine are not a workbook it understands.
    Corrupt(String),
    /// A model could not be created from a spec.
    Create(String),
    /// A model could not produce its bytes.
    Serialize(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(msg) => write!(f, "engine init failed: {msg}"),
            Self::Corrupt(msg) => write!(f, "workbook bytes rejected: {msg}"),
            Self::Create(msg) => write!(f, "workbook creation failed: {msg}"),
            Self::Serialize(msg) => write!(f, "workbook serialization failed: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// An in-memory workbook owned by the engine.
///
/// The engine mutates it in response to user interaction; the editor only
/// reads it through `to_bytes`.
pub trait Model {
    fn to_bytes(&self) -> Result<Vec<u8>, EngineError>;
}

/// A spreadsheet calculation engine.
pub trait Engine {
    type Model: Model;

    /// One-time setup. Callers guarantee it is awaited at most once per session.
    fn init(&self) -> impl Future<Output = Result<(), EngineError>>;

    /// Create an empty workbook.
    fn new_model(&self, spec: &WorkbookSpec) -> Result<Self::Model, EngineError>;

    /// Rebuild a workbook from bytes previously produced by `Model::to_bytes`.
    fn model_from_bytes(&self, bytes: &[u8]) -> Result<Self::Model, EngineError>;
}
