//! Host sync bridge.
//!
//! Turns the host's notification stream into "load this note" decisions and
//! carries saves back to the host.
//!
//! This ensures:
//! 1. A self-save echoed back by the host is never treated as an external edit,
//!    even when echoes of several saves arrive late or out of order
//! 2. The same note identity is never loaded twice in a row
//! 3. Notifications arriving before the engine is ready collapse into the
//!    latest one, which is loaded as soon as the engine is ready

use std::collections::VecDeque;

use notegrid_protocol::{HostOptions, NoteEnvelope};

use crate::coalesce::fingerprint;
use crate::error::HostWriteError;
use crate::lifecycle::NoteIdentity;

/// The note host, as seen by the editor.
pub trait HostApi {
    /// One-time setup, called when the bridge connects.
    fn initialize(&mut self, options: &HostOptions);
    /// Current note text, if the host has streamed any.
    fn text(&self) -> Option<String>;
    /// Replace the note text.
    fn set_text(&mut self, text: String) -> Result<(), HostWriteError>;
    /// Replace the human-readable note preview.
    fn set_preview(&mut self, preview: &str) -> Result<(), HostWriteError>;
}

/// Number of publishes remembered for echo matching.
const MAX_TRACKED_PUBLISHES: usize = 32;

/// A notification from the host's update stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostNotification {
    /// The host streamed the current note text.
    Text(String),
    /// The host signalled an update without content; read it via `HostApi::text`.
    Changed,
}

/// A note the bridge has decided should be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNote {
    pub identity: NoteIdentity,
    pub content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub host_options: HostOptions,
    pub preview: String,
    /// Do not load a note until the host provided its content.
    pub wait_for_content: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host_options: HostOptions::default(),
            preview: notegrid_protocol::DEFAULT_PREVIEW.to_string(),
            wait_for_content: true,
        }
    }
}

pub struct HostBridge<H> {
    host: H,
    config: BridgeConfig,
    connected: bool,
    /// Last identity handed out. Identities start at 1.
    counter: u64,
    /// Text most recently streamed by the host.
    last_streamed: Option<String>,
    /// Fingerprints of texts published since the last load, oldest first.
    published: VecDeque<String>,
    /// Latest note announced by the host.
    latest: Option<PendingNote>,
    /// Identity of the note currently loaded.
    loaded: Option<NoteIdentity>,
}

impl<H: HostApi> HostBridge<H> {
    pub fn new(host: H, config: BridgeConfig) -> Self {
        Self {
            host,
            config,
            connected: false,
            counter: 0,
            last_streamed: None,
            published: VecDeque::new(),
            latest: None,
            loaded: None,
        }
    }

    /// Initialize the host. Idempotent.
    pub fn connect(&mut self) {
        if self.connected {
            return;
        }
        self.host.initialize(&self.config.host_options);
        self.connected = true;
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn loaded_identity(&self) -> Option<NoteIdentity> {
        self.loaded
    }

    /// Record a host notification. Does not load anything by itself.
    pub fn receive(&mut self, notification: HostNotification) {
        match notification {
            HostNotification::Text(text) => {
                if self.last_streamed.as_deref() == Some(text.as_str()) {
                    return;
                }
                self.last_streamed = Some(text.clone());
                if self.is_echo(Some(text.as_str())) {
                    log::debug!("Ignoring echo of our own save");
                    return;
                }
                self.announce(Some(text));
            }
            HostNotification::Changed => {
                let text = self.host.text();
                if self.is_echo(text.as_deref()) {
                    log::debug!("Ignoring echo of our own save");
                    return;
                }
                self.announce(text);
            }
        }
    }

    fn is_echo(&self, text: Option<&str>) -> bool {
        text.is_some_and(|text| {
            let print = fingerprint(text.as_bytes());
            self.published.iter().any(|p| *p == print)
        })
    }

    fn announce(&mut self, content: Option<String>) {
        self.counter += 1;
        self.latest = Some(PendingNote {
            identity: NoteIdentity(self.counter),
            content,
        });
    }

    /// The note to load now, if any. Call only once the engine is ready.
    ///
    /// Returns the latest announced note when its identity differs from the
    /// loaded one and its content is available (unless content is not
    /// awaited). The returned identity becomes the loaded identity.
    pub fn take_load(&mut self) -> Option<PendingNote> {
        let latest = self.latest.as_ref()?;
        if Some(latest.identity) == self.loaded {
            return None;
        }
        if latest.content.is_none() && self.config.wait_for_content {
            return None;
        }
        let note = self.latest.take()?;
        self.loaded = Some(note.identity);
        self.published.clear();
        Some(note)
    }

    /// Hand a saved envelope to the host: text first, then preview.
    ///
    /// The text is remembered for echo matching even if the host rejects it.
    /// A rejected preview is logged only.
    pub fn publish(&mut self, envelope: &NoteEnvelope) -> Result<(), HostWriteError> {
        let text = envelope.to_text();
        if self.published.len() == MAX_TRACKED_PUBLISHES {
            self.published.pop_front();
        }
        self.published.push_back(fingerprint(text.as_bytes()));

        self.host.set_text(text)?;
        if let Err(e) = self.host.set_preview(&self.config.preview) {
            log::warn!("{}", e);
        }
        Ok(())
    }
}

/// In-memory host that records every write.
///
/// Used by tests and by embedders that drive the editor without a real host.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub text: Option<String>,
    pub writes: Vec<String>,
    pub previews: Vec<String>,
    pub initialized_with: Vec<HostOptions>,
    /// Reject every write while set.
    pub reject_writes: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

impl HostApi for RecordingHost {
    fn initialize(&mut self, options: &HostOptions) {
        self.initialized_with.push(options.clone());
    }

    fn text(&self) -> Option<String> {
        self.text.clone()
    }

    fn set_text(&mut self, text: String) -> Result<(), HostWriteError> {
        if self.reject_writes {
            return Err(HostWriteError("note is locked".into()));
        }
        self.writes.push(text.clone());
        self.text = Some(text);
        Ok(())
    }

    fn set_preview(&mut self, preview: &str) -> Result<(), HostWriteError> {
        if self.reject_writes {
            return Err(HostWriteError("note is locked".into()));
        }
        self.previews.push(preview.to_string());
        Ok(())
    }
}
