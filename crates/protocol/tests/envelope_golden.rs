//! Golden fixture compatibility test for the v1 note envelope.
//!
//! Fixtures live in `tests/golden/`. They represent text a host may hand the
//! editor: envelopes written by earlier releases, and foreign or corrupted text.
//!
//! **Rule**: fixtures MUST NOT change. If a test fails, fix the codec, not the fixture.

use std::fs;
use std::path::PathBuf;

use notegrid_protocol::{decode, encode, try_decode, DecodeError};
use proptest::prelude::*;

fn golden(filename: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/golden")
        .join(filename);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

#[test]
fn test_v1_envelopes_decode() {
    for name in ["v1_valid.json", "v1_unpadded.json", "future_version.json"] {
        let text = golden(name);
        assert_eq!(
            decode(Some(&text)).as_deref(),
            Some(&b"hello workbook"[..]),
            "{name} should decode"
        );
    }
}

#[test]
fn test_current_encoder_matches_v1_fixture() {
    assert_eq!(encode(b"hello workbook"), golden("v1_valid.json").trim_end());
}

#[test]
fn test_foreign_text_is_absent() {
    for name in [
        "empty.txt",
        "plain_text.txt",
        "foreign_object.json",
        "missing_version.json",
        "bad_base64.json",
    ] {
        assert_eq!(decode(Some(&golden(name))), None, "{name} should be treated as absent");
    }
}

#[test]
fn test_foreign_text_reasons() {
    assert_eq!(try_decode(&golden("empty.txt")), Err(DecodeError::Empty));
    assert_eq!(try_decode(&golden("foreign_object.json")), Err(DecodeError::MissingWorkbook));
    assert_eq!(try_decode(&golden("missing_version.json")), Err(DecodeError::InvalidVersion));
    assert!(matches!(try_decode(&golden("plain_text.txt")), Err(DecodeError::Json(_))));
    assert!(matches!(try_decode(&golden("bad_base64.json")), Err(DecodeError::Base64(_))));
}

proptest! {
    #[test]
    fn prop_decode_inverts_encode(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let text = encode(&bytes);
        if bytes.is_empty() {
            // An empty blob is indistinguishable from a missing one.
            prop_assert_eq!(decode(Some(&text)), None);
        } else {
            prop_assert_eq!(decode(Some(&text)), Some(bytes));
        }
    }

    #[test]
    fn prop_decode_never_panics(raw in ".*") {
        let _ = decode(Some(&raw));
    }
}
