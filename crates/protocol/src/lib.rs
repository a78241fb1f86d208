//! NoteGrid Host Protocol: v1 Note Envelope
//!
//! This crate defines the persisted text format exchanged with the note host
//! and the option types passed to the host at startup.
//!
//! A note's `text` field holds a JSON envelope wrapping the engine's native
//! workbook bytes:
//!
//! ```text
//! { "workbook": "<base64>", "version": 1 }
//! ```
//!
//! The host's text field is free-form, so decoding never fails loudly: any
//! foreign or corrupted content decodes to "no prior content".
//!
//! # Usage
//!
//! ```ignore
//! use notegrid_protocol::{decode, encode};
//!
//! let text = encode(&workbook_bytes);
//! assert_eq!(decode(Some(&text)), Some(workbook_bytes));
//! assert_eq!(decode(Some("not json")), None);
//! ```

mod envelope;

use serde::{Deserialize, Serialize};

pub use envelope::{decode, encode, try_decode, DecodeError, NoteEnvelope};

/// Current envelope format version. Written into every encoded envelope.
pub const FORMAT_VERSION: u32 = 1;

/// Preview string written next to the note text when nothing else is configured.
pub const DEFAULT_PREVIEW: &str = "Spreadsheet";

/// Debounce the host applies to text writes before syncing them, in milliseconds.
pub const DEFAULT_HOST_DEBOUNCE_MS: u64 = 400;

// =============================================================================
// Host Options
// =============================================================================

/// Options passed once to the host when the editor connects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostOptions {
    /// How long the host waits after a text write before persisting it.
    #[serde(default = "default_debounce_save")]
    pub debounce_save: u64,
}

fn default_debounce_save() -> u64 {
    DEFAULT_HOST_DEBOUNCE_MS
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            debounce_save: DEFAULT_HOST_DEBOUNCE_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_options_wire_name() {
        let json = serde_json::to_string(&HostOptions::default()).unwrap();
        assert_eq!(json, r#"{"debounceSave":400}"#);
    }

    #[test]
    fn test_host_options_missing_field_uses_default() {
        let opts: HostOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts.debounce_save, DEFAULT_HOST_DEBOUNCE_MS);
    }
}
