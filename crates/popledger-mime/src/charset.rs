//! Charset decoding for text payloads and encoded words.
//!
//! Labels are resolved with the WHATWG registry from `encoding_rs`, which
//! covers the legacy CJK, Cyrillic and single-byte charsets seen in mail.
//! A missing or unrecognized label, or one that only maps to the
//! replacement encoding, is read as UTF-8 with U+FFFD substituted for
//! invalid sequences, so decoding can never fail.

use encoding_rs::{Encoding, UTF_8};
use tracing::debug;

/// Resolves a MIME charset label.
///
/// `us-ascii` is read as UTF-8: mail labelled ASCII that carries 8-bit
/// bytes is almost always UTF-8.
fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    let label = label.trim().trim_matches('"');
    if label.eq_ignore_ascii_case("us-ascii") || label.eq_ignore_ascii_case("ascii") {
        return Some(UTF_8);
    }
    Encoding::for_label_no_replacement(label.as_bytes())
}

/// Decodes `bytes` using the charset named by `label`.
///
/// A missing or unrecognized label falls back to lossy UTF-8.
#[must_use]
pub fn decode_charset(bytes: &[u8], label: Option<&str>) -> String {
    let encoding = label.and_then(|l| {
        let encoding = encoding_for_label(l);
        if encoding.is_none() {
            debug!(charset = l, "unsupported charset, decoding as UTF-8");
        }
        encoding
    });

    let encoding = encoding.unwrap_or(UTF_8);
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        debug!(charset = encoding.name(), "malformed bytes replaced with U+FFFD");
    }
    text.into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreadable_literal)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8() {
        assert_eq!(decode_charset("Héllo".as_bytes(), Some("UTF-8")), "Héllo");
    }

    #[test]
    fn test_latin1() {
        assert_eq!(decode_charset(b"H\xe9llo", Some("iso-8859-1")), "Héllo");
        assert_eq!(decode_charset(b"H\xe9llo", Some("latin1")), "Héllo");
    }

    #[test]
    fn test_windows1252_smart_quotes() {
        assert_eq!(
            decode_charset(b"\x93quoted\x94 \x80", Some("windows-1252")),
            "\u{201C}quoted\u{201D} \u{20AC}"
        );
    }

    #[test]
    fn test_iso_2022_jp() {
        assert_eq!(
            decode_charset(b"\x1b$B%F%9%H\x1b(B", Some("ISO-2022-JP")),
            "テスト"
        );
    }

    #[test]
    fn test_shift_jis() {
        assert_eq!(
            decode_charset(b"\x83e\x83X\x83g", Some("Shift_JIS")),
            "テスト"
        );
    }

    #[test]
    fn test_koi8_r() {
        assert_eq!(decode_charset(b"\xf0\xd2\xc9\xd7\xc5\xd4", Some("koi8-r")), "Привет");
    }

    #[test]
    fn test_euc_kr() {
        assert_eq!(decode_charset(b"\xc7\xd1\xb1\xdb", Some("euc-kr")), "한글");
    }

    #[test]
    fn test_unknown_charset_falls_back_to_utf8() {
        assert_eq!(decode_charset(b"plain", Some("x-unknown")), "plain");
        assert_eq!(decode_charset(b"bad \xff byte", Some("x-unknown")), "bad \u{FFFD} byte");
    }

    #[test]
    fn test_replacement_only_label_falls_back_to_utf8() {
        assert_eq!(decode_charset(b"caf\xc3\xa9", Some("iso-2022-kr")), "café");
    }

    #[test]
    fn test_us_ascii_reads_utf8() {
        assert_eq!(decode_charset(b"caf\xc3\xa9", Some("us-ascii")), "café");
    }

    #[test]
    fn test_missing_charset() {
        assert_eq!(decode_charset(b"\xc3\xa9", None), "é");
        assert_eq!(decode_charset(b"\xe9", None), "\u{FFFD}");
    }

    #[test]
    fn test_quoted_label() {
        assert_eq!(decode_charset(b"\xe9", Some("\"ISO-8859-1\"")), "é");
    }
}
