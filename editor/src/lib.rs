//! NoteGrid editor core.
//!
//! Embeds a spreadsheet engine inside a host note. The host owns the note
//! text; the editor turns it into a workbook, lets the engine mutate it, and
//! writes it back as an envelope when the user actually changed something.
//!
//! - `lifecycle`: one-time engine init and per-note workbook construction
//! - `bridge`: host notifications in, envelope writes out
//! - `coalesce`: trigger classification, SaveGate, dirty tracking, deadlines
//! - `session`: the state machine tying the above together
//! - `runtime`: a smol driver for a session
//!
//! Everything is single threaded. `EditorSession` takes explicit instants so
//! it can be driven by any event loop or stepped directly in tests.

pub mod bridge;
pub mod coalesce;
pub mod error;
pub mod lifecycle;
pub mod runtime;
pub mod session;
pub mod shell;
pub mod triggers;

pub use bridge::{BridgeConfig, HostApi, HostBridge, HostNotification, PendingNote, RecordingHost};
pub use coalesce::{Coalescer, CoalescerConfig, SaveOutcome, SaveTiming, TriggerAction};
pub use error::{EngineInitError, HostWriteError, SerializationError};
pub use lifecycle::{EngineLifecycle, NoteIdentity, WorkbookHandle};
pub use runtime::run;
pub use session::{EditFn, EditorConfig, EditorEvent, EditorSession};
pub use shell::{Phase, Shell};
pub use triggers::{ContainerEvent, DocumentEvent, LifecycleEvent, Trigger, TriggerScopes};
