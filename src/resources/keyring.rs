//! Keyring document parsing
//!
//! The user export endpoint returns a JSON string wrapping an INI-like
//! keyring document: a bracketed `[entity]` header followed by indented
//! `key = value` lines. The escape sequences arrive literally (`\n`, `\t`
//! as two characters each) and must be substituted before line-oriented
//! matching.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

fn key_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"key\s*=\s*([A-Za-z0-9+/=]+)").unwrap())
}

/// Extract the secret key from an exported keyring document.
///
/// Strips one layer of surrounding quotes, unescapes literal `\n`/`\t`
/// sequences, then matches the first `key = <base64>` assignment.
/// An export with no such assignment is a normal outcome (empty or
/// malformed export) and yields [`Error::KeyNotFound`].
pub fn extract_key(raw: &str, entity: &str) -> Result<String> {
    let document = raw
        .trim()
        .trim_matches('"')
        .replace("\\n", "\n")
        .replace("\\t", "\t");

    key_pattern()
        .captures(&document)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::KeyNotFound {
            entity: entity.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_extracts_key_from_escaped_document() {
        // As delivered by the API: a quoted string with literal escapes.
        let raw = "\"[client.x]\\n\\tkey = AQA25mJp==\\n\\tcaps mon = \\\"allow r\\\"\\n\"";
        assert_eq!(extract_key(raw, "client.x").unwrap(), "AQA25mJp==");
    }

    #[test]
    fn test_extracts_first_key_assignment() {
        let raw = "[client.a]\n\tkey = AAAA+/==\n[client.b]\n\tkey = BBBB==\n";
        assert_eq!(extract_key(raw, "client.a").unwrap(), "AAAA+/==");
    }

    #[test]
    fn test_missing_key_line_is_key_not_found() {
        let raw = "\"[client.x]\\n\\tcaps mon = \\\"allow r\\\"\\n\"";
        let err = extract_key(raw, "client.x").unwrap_err();
        assert_matches!(err, Error::KeyNotFound { ref entity } if entity == "client.x");
    }

    #[test]
    fn test_empty_export_is_key_not_found() {
        assert_matches!(
            extract_key("\"\"", "client.x").unwrap_err(),
            Error::KeyNotFound { .. }
        );
    }

    #[test]
    fn test_key_value_stops_at_non_base64() {
        let raw = "[client.x]\n\tkey = AQBzv+9o5ZfqOxAA2e3vX8LGJ1l4Ckp5Dt0Ytw==\n";
        assert_eq!(
            extract_key(raw, "client.x").unwrap(),
            "AQBzv+9o5ZfqOxAA2e3vX8LGJ1l4Ckp5Dt0Ytw=="
        );
    }
}
