//! Cadastral reference normalization.
//!
//! The owners export stores references the way people type them
//! (`"12345 A 7"`, `"12345AB 0012"`), while the parcel geometries use a
//! fixed-width key: commune code, zero padding, section letters and a
//! four-digit parcel number.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{error, warn};

use crate::error::{Error, Result};

/// Length of a canonical id when the section has one or two letters.
pub const CANONICAL_LEN: usize = 14;

fn raw_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{5})\s*([A-Z]+)\s*(\d+)$").expect("static parcel id pattern")
    })
}

fn canonical_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{5}(0000[A-Z]|000[A-Z]{2})\d{4}$").expect("static canonical pattern")
    })
}

/// Converts a raw cadastral reference into the canonical parcel id.
///
/// Parcel numbers are left-padded to four digits but never truncated, so a
/// number such as `12345` yields a 15-character id.
pub fn normalize(raw: &str) -> Result<String> {
    let Some(caps) = raw_pattern().captures(raw.trim()) else {
        error!("Id column value '{}' does not match the expected format", raw);
        return Err(Error::MalformedIdentifier {
            raw: raw.to_string(),
        });
    };

    let commune = &caps[1];
    let section = &caps[2];
    let number = &caps[3];
    let padding = if section.len() == 1 { "0000" } else { "000" };

    let id = format!("{commune}{padding}{section}{number:0>4}");
    if id.len() != CANONICAL_LEN {
        warn!("parcel id '{}' normalized to non-standard width: {}", raw, id);
    }
    Ok(id)
}

/// Returns true when `id` already has the 14-character canonical shape.
pub fn is_canonical(id: &str) -> bool {
    canonical_pattern().is_match(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_letter_section_gets_four_zeros() {
        assert_eq!(normalize("12345 A 7").unwrap(), "123450000A0007");
    }

    #[test]
    fn two_letter_section_gets_three_zeros() {
        let id = normalize("12345AB7").unwrap();
        assert_eq!(id, "12345000AB0007");
        assert_eq!(id.len(), CANONICAL_LEN);
    }

    #[test]
    fn whitespace_between_parts_is_optional() {
        assert_eq!(normalize("12345  ZK   123").unwrap(), "12345000ZK0123");
        assert_eq!(normalize(" 12345 B 0042 ").unwrap(), "123450000B0042");
    }

    #[test]
    fn long_parcel_numbers_are_not_truncated() {
        assert_eq!(normalize("12345 A 12345").unwrap(), "123450000A12345");
    }

    #[test]
    fn three_letter_section_uses_short_padding() {
        assert_eq!(normalize("12345 ABC 1").unwrap(), "12345000ABC0001");
    }

    #[test]
    fn rejects_missing_commune_code() {
        for raw in ["1234 A 7", "ABCDE 12 7", "", "12345 a 7", "12345 A-7", "A 12345 7"] {
            match normalize(raw) {
                Err(Error::MalformedIdentifier { raw: got }) => assert_eq!(got, raw),
                other => panic!("expected malformed id for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(normalize("12345 A 7 bis").is_err());
    }

    #[test]
    fn canonical_shape() {
        assert!(is_canonical("123450000A0007"));
        assert!(is_canonical("12345000AB0007"));
        assert!(!is_canonical("12345 A 7"));
        assert!(!is_canonical("123450000A12345"));
    }
}
