//! Save coalescing for the loaded workbook.
//!
//! Merges a noisy stream of triggers into well-timed saves. The coalescer is
//! a plain state machine: callers pass the current `Instant`, and it never
//! performs IO itself. `save` receives the serializer and the publisher as
//! closures so the decision logic stays in one place.
//!
//! Guards (evaluated in this order on every save):
//! 1. SaveGate: closed for a fixed window after each load, because loading
//!    can synthesize interaction-like events.
//! 2. Dirty flag: set only by an accepted interaction.
//! 3. Fingerprint: bytes identical to the last persisted bytes are not
//!    written again (navigation marks dirty without changing content).
//!
//! Guarantees:
//! - Interactions never save synchronously; they arm a deadline that
//!   fires on a later turn, after the engine applied the mutation.
//! - Repeated saves without content change write at most once.
//! - A load cancels every deadline armed for the previous note.

use std::time::{Duration, Instant};

use notegrid_protocol::NoteEnvelope;

use crate::error::{HostWriteError, SerializationError};
use crate::triggers::{LifecycleEvent, Trigger, TriggerScopes};

/// Default length of the post-load window during which saves are suppressed.
pub const DEFAULT_SAVE_GATE: Duration = Duration::from_millis(500);

/// Content fingerprint of workbook bytes.
pub fn fingerprint(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// When an accepted interaction turns into a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTiming {
    /// On the next scheduling turn.
    NextTurn,
    /// After interactions have been quiet for the given period.
    Debounce(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoalescerConfig {
    pub timing: SaveTiming,
    pub save_gate: Duration,
    pub autosave: Option<Duration>,
    pub scopes: TriggerScopes,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            timing: SaveTiming::NextTurn,
            save_gate: DEFAULT_SAVE_GATE,
            autosave: None,
            scopes: TriggerScopes::ALL,
        }
    }
}

/// What the caller should do after a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    /// Nothing: scope disabled, gate closed, or no workbook.
    Ignored,
    /// The note was marked dirty and a save deadline armed.
    Scheduled,
    /// Save now, synchronously.
    Flush,
    /// Save now, then tear down.
    FlushAndTeardown,
}

/// Result of a save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing loaded, or the gate is still closed.
    GateClosed,
    /// No interaction since the last save.
    Clean,
    /// Serialization failed; the note stays dirty.
    Failed,
    /// Bytes match the last persisted fingerprint; nothing written.
    Unchanged,
    /// A new envelope was handed to the host.
    Written,
    /// A new envelope was handed to the host, which rejected it. Counts as
    /// persisted; the host stays authoritative for its own text.
    Rejected,
}

#[derive(Debug)]
pub struct Coalescer {
    config: CoalescerConfig,
    /// Instant the SaveGate opens for the current note. `None` until the
    /// first load, and again after `close`.
    gate_opens_at: Option<Instant>,
    /// An accepted interaction happened since the last load or save.
    dirty: bool,
    /// Fingerprint of the last written bytes, or of the bytes as loaded.
    /// `None` if the loaded workbook could not be serialized.
    last_persisted: Option<String>,
    /// Pending interaction save.
    save_due: Option<Instant>,
    /// Next periodic autosave.
    autosave_due: Option<Instant>,
}

impl Coalescer {
    pub fn new(config: CoalescerConfig) -> Self {
        Self {
            config,
            gate_opens_at: None,
            dirty: false,
            last_persisted: None,
            save_due: None,
            autosave_due: None,
        }
    }

    pub fn config(&self) -> &CoalescerConfig {
        &self.config
    }

    /// Reset all save eligibility for a freshly loaded note.
    pub fn reset_for_load(&mut self, now: Instant, loaded_fingerprint: Option<String>) {
        self.cancel_timers();
        self.dirty = false;
        self.last_persisted = loaded_fingerprint;
        self.gate_opens_at = Some(now + self.config.save_gate);
        self.autosave_due = self.config.autosave.map(|period| now + period);
    }

    /// Cancel timers and close the gate until the next load.
    pub fn close(&mut self) {
        self.cancel_timers();
        self.gate_opens_at = None;
    }

    pub fn cancel_timers(&mut self) {
        self.save_due = None;
        self.autosave_due = None;
    }

    pub fn gate_open(&self, now: Instant) -> bool {
        self.gate_opens_at.is_some_and(|at| now >= at)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_persisted(&self) -> Option<&str> {
        self.last_persisted.as_deref()
    }

    /// Classify a trigger and update dirty state / deadlines.
    pub fn on_trigger(&mut self, trigger: Trigger, now: Instant) -> TriggerAction {
        if !self.config.scopes.enables(&trigger) {
            return TriggerAction::Ignored;
        }

        match trigger {
            Trigger::Lifecycle(event) => {
                // A flush supersedes any pending deadline
                self.save_due = None;
                match event {
                    LifecycleEvent::Hidden => TriggerAction::Flush,
                    LifecycleEvent::Unload => TriggerAction::FlushAndTeardown,
                }
            }
            _ => {
                if !self.gate_open(now) {
                    return TriggerAction::Ignored;
                }
                self.dirty = true;
                self.save_due = Some(match self.config.timing {
                    SaveTiming::NextTurn => now,
                    SaveTiming::Debounce(quiet) => now + quiet,
                });
                TriggerAction::Scheduled
            }
        }
    }

    /// Earliest armed deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.save_due, self.autosave_due) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Consume due deadlines. Returns true if a save should be attempted.
    pub fn poll_timers(&mut self, now: Instant) -> bool {
        let mut fire = false;

        if self.save_due.is_some_and(|at| at <= now) {
            self.save_due = None;
            fire = true;
        }

        if let (Some(at), Some(period)) = (self.autosave_due, self.config.autosave) {
            if at <= now {
                self.autosave_due = Some(now + period);
                fire = true;
            }
        }

        fire
    }

    /// Run the save algorithm.
    ///
    /// `serialize` produces the current workbook bytes; `publish` hands the
    /// encoded envelope to the host. Neither is called when a guard fails.
    pub fn save<S, P>(&mut self, now: Instant, serialize: S, publish: P) -> SaveOutcome
    where
        S: FnOnce() -> Result<Vec<u8>, SerializationError>,
        P: FnOnce(&NoteEnvelope) -> Result<(), HostWriteError>,
    {
        if !self.gate_open(now) {
            return SaveOutcome::GateClosed;
        }
        if !self.dirty {
            return SaveOutcome::Clean;
        }

        let bytes = match serialize() {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Save abandoned: {}", e);
                return SaveOutcome::Failed;
            }
        };

        let print = fingerprint(&bytes);
        if self.last_persisted.as_deref() == Some(print.as_str()) {
            log::debug!("Save skipped: content unchanged");
            self.dirty = false;
            return SaveOutcome::Unchanged;
        }

        let published = publish(&NoteEnvelope::from_workbook_bytes(&bytes));
        self.last_persisted = Some(print);
        self.dirty = false;
        match published {
            Ok(()) => {
                log::debug!("Saved workbook ({} bytes)", bytes.len());
                SaveOutcome::Written
            }
            Err(e) => {
                log::warn!("{}", e);
                SaveOutcome::Rejected
            }
        }
    }
}
