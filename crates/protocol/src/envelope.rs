//! Codec between the host's note text and engine workbook bytes.

use std::fmt;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::FORMAT_VERSION;

/// Decoder matching browser `atob` leniency: padding optional, stray low bits ignored.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// The persisted unit stored in a note's text field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEnvelope {
    /// Base64 of the engine's native workbook bytes.
    pub workbook: String,
    /// Envelope format version. Only its presence is checked on decode.
    pub version: u32,
}

impl NoteEnvelope {
    /// Wrap workbook bytes in a current-version envelope.
    pub fn from_workbook_bytes(bytes: &[u8]) -> Self {
        Self {
            workbook: STANDARD.encode(bytes),
            version: FORMAT_VERSION,
        }
    }

    /// Render the envelope as the text written to the host.
    pub fn to_text(&self) -> String {
        serde_json::json!({
            "workbook": self.workbook,
            "version": self.version,
        })
        .to_string()
    }

    /// Decode the base64 blob back into workbook bytes.
    pub fn workbook_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        decode_blob(&self.workbook)
    }
}

/// Why a piece of note text could not be turned into workbook bytes.
///
/// Never surfaced to the user; callers log it and start from an empty workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Text was empty or whitespace only.
    Empty,
    /// Text was not valid JSON.
    Json(String),
    /// JSON was valid but not an object.
    NotAnObject,
    /// `workbook` was missing, null, or an empty string.
    MissingWorkbook,
    /// `workbook` was present but not a string.
    WorkbookNotText,
    /// `version` was missing or not a number.
    InvalidVersion,
    /// The blob was not valid base64.
    Base64(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "note text is empty"),
            Self::Json(msg) => write!(f, "note text is not JSON: {msg}"),
            Self::NotAnObject => write!(f, "note envelope is not an object"),
            Self::MissingWorkbook => write!(f, "note envelope has no workbook"),
            Self::WorkbookNotText => write!(f, "note envelope workbook is not a string"),
            Self::InvalidVersion => write!(f, "note envelope version is missing or not a number"),
            Self::Base64(msg) => write!(f, "workbook blob is not valid base64: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Encode workbook bytes as envelope text. Always succeeds.
pub fn encode(bytes: &[u8]) -> String {
    NoteEnvelope::from_workbook_bytes(bytes).to_text()
}

/// Decode note text into workbook bytes, or `None` for absent/foreign/corrupt text.
pub fn decode(raw: Option<&str>) -> Option<Vec<u8>> {
    try_decode(raw?).ok()
}

/// Decode note text into workbook bytes, reporting why decoding failed.
pub fn try_decode(raw: &str) -> Result<Vec<u8>, DecodeError> {
    if raw.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    let value: Value = serde_json::from_str(raw).map_err(|e| DecodeError::Json(e.to_string()))?;
    let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;

    let blob = match obj.get("workbook") {
        Some(Value::String(s)) if !s.is_empty() => s,
        None | Some(Value::Null) | Some(Value::String(_)) => return Err(DecodeError::MissingWorkbook),
        Some(_) => return Err(DecodeError::WorkbookNotText),
    };

    let version = obj
        .get("version")
        .and_then(Value::as_f64)
        .ok_or(DecodeError::InvalidVersion)?;
    if version != f64::from(FORMAT_VERSION) {
        log::debug!("decoding envelope with unknown version {version} as v{FORMAT_VERSION}");
    }

    decode_blob(blob)
}

fn decode_blob(blob: &str) -> Result<Vec<u8>, DecodeError> {
    let compact: String = blob.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    LENIENT
        .decode(compact.as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_shape() {
        let text = encode(b"hello");
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["workbook"], "aGVsbG8=");
        assert_eq!(value["version"], 1);
    }

    #[test]
    fn test_round_trip() {
        let bytes = vec![0u8, 1, 2, 254, 255, 10, 13];
        assert_eq!(decode(Some(&encode(&bytes))), Some(bytes));
    }

    #[test]
    fn test_malformed_inputs_are_absent() {
        let cases = [
            "",
            "   \n\t",
            "not json",
            "{",
            "null",
            "[]",
            "42",
            r#"{"foo":1}"#,
            r#"{"workbook":"aGVsbG8="}"#,
            r#"{"workbook":"aGVsbG8=","version":"1"}"#,
            r#"{"workbook":"aGVsbG8=","version":null}"#,
            r#"{"workbook":"","version":1}"#,
            r#"{"workbook":null,"version":1}"#,
            r#"{"workbook":12,"version":1}"#,
            r#"{"workbook":"!!not base64!!","version":1}"#,
        ];
        for raw in cases {
            assert_eq!(decode(Some(raw)), None, "expected no content for {raw:?}");
        }
        assert_eq!(decode(None), None);
    }

    #[test]
    fn test_error_reasons() {
        assert_eq!(try_decode(" "), Err(DecodeError::Empty));
        assert_eq!(try_decode("[1]"), Err(DecodeError::NotAnObject));
        assert_eq!(try_decode(r#"{"foo":1}"#), Err(DecodeError::MissingWorkbook));
        assert_eq!(
            try_decode(r#"{"workbook":true,"version":1}"#),
            Err(DecodeError::WorkbookNotText)
        );
        assert_eq!(
            try_decode(r#"{"workbook":"aGk=","version":"one"}"#),
            Err(DecodeError::InvalidVersion)
        );
        assert!(matches!(try_decode("nope"), Err(DecodeError::Json(_))));
        assert!(matches!(
            try_decode(r#"{"workbook":"a$b","version":1}"#),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn test_lenient_blob() {
        // Unpadded, with embedded whitespace
        let raw = r#"{"workbook":"aGVs\nbG8","version":1}"#;
        assert_eq!(decode(Some(raw)), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_any_numeric_version_accepted() {
        let raw = r#"{"workbook":"aGVsbG8=","version":2.5}"#;
        assert_eq!(decode(Some(raw)), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let raw = r#"{"workbook":"aGVsbG8=","version":1,"title":"Budget"}"#;
        assert_eq!(decode(Some(raw)), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_envelope_struct_matches_text() {
        let env = NoteEnvelope::from_workbook_bytes(b"abc");
        let parsed: NoteEnvelope = serde_json::from_str(&env.to_text()).unwrap();
        assert_eq!(parsed, env);
        assert_eq!(parsed.workbook_bytes().unwrap(), b"abc");
    }
}
