//! MIME decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 header decoding. The
//! lenient variants are what the message parser uses: they accept the
//! sloppy output of real mailers and never fail.

use crate::charset::decode_charset;
use crate::error::{Error, Result};
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Base64 engine that ignores missing padding and non-zero trailing bits.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Decodes Base64 data, skipping whitespace and any byte outside the
/// alphabet, and stopping at the first padding character.
///
/// Returns `None` only when what remains still cannot be decoded.
#[must_use]
pub fn decode_base64_lenient(data: &[u8]) -> Option<Vec<u8>> {
    let mut cleaned: Vec<u8> = data
        .iter()
        .copied()
        .take_while(|&b| b != b'=')
        .filter(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
        .collect();

    // A lone trailing sextet cannot hold a full byte.
    if cleaned.len() % 4 == 1 {
        cleaned.pop();
    }

    LENIENT.decode(&cleaned).ok()
}

/// Decodes Quoted-Printable data (RFC 2045).
///
/// Soft line breaks are removed, trailing whitespace on each line is
/// dropped, and malformed escapes are kept literally.
#[must_use]
pub fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());

    for line in data.split_inclusive(|&b| b == b'\n') {
        let (content, line_ending) = split_line_ending(line);
        let content = content.trim_ascii_end();

        match content.strip_suffix(b"=") {
            // Soft line break
            Some(content) => decode_qp_segment(content, &mut result),
            None => {
                decode_qp_segment(content, &mut result);
                result.extend_from_slice(line_ending);
            }
        }
    }

    result
}

/// Decodes a single RFC 2047 Q-encoded word payload.
fn decode_q(text: &str) -> Vec<u8> {
    let with_spaces = text.replace('_', " ");
    let mut result = Vec::with_capacity(with_spaces.len());
    decode_qp_segment(with_spaces.as_bytes(), &mut result);
    result
}

fn decode_qp_segment(segment: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < segment.len() {
        let byte = segment[i];
        if byte == b'=' {
            let hi = segment.get(i + 1).and_then(|&b| hex_value(b));
            let lo = segment.get(i + 2).and_then(|&b| hex_value(b));
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(byte);
        i += 1;
    }
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn split_line_ending(line: &[u8]) -> (&[u8], &[u8]) {
    if let Some(content) = line.strip_suffix(b"\r\n") {
        (content, b"\r\n")
    } else if let Some(content) = line.strip_suffix(b"\n") {
        (content, b"\n")
    } else {
        (line, b"")
    }
}

/// Decodes every RFC 2047 encoded word in a header value.
///
/// Format: `=?charset?encoding?encoded-text?=`
///
/// Whitespace separating two adjacent encoded words is removed. Text that
/// only looks like an encoded word is left untouched.
#[must_use]
pub fn decode_rfc2047(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);

        if let Ok((decoded, consumed)) = decode_encoded_word(candidate) {
            if !(after_word && before.trim().is_empty()) {
                result.push_str(before);
            }
            result.push_str(&decoded);
            rest = &candidate[consumed..];
            after_word = true;
        } else {
            result.push_str(before);
            result.push_str("=?");
            rest = &candidate[2..];
            after_word = false;
        }
    }

    result.push_str(rest);
    result
}

/// Decodes one encoded word at the start of `text`.
///
/// Returns the decoded text and the number of bytes consumed.
fn decode_encoded_word(text: &str) -> Result<(String, usize)> {
    let invalid = || Error::InvalidEncoding(format!("Invalid RFC 2047 word: {text}"));

    let inner = text.strip_prefix("=?").ok_or_else(invalid)?;
    let charset_end = inner.find('?').ok_or_else(invalid)?;
    let charset = &inner[..charset_end];
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return Err(invalid());
    }

    let after_charset = &inner[charset_end + 1..];
    let encoding = after_charset.get(..1).ok_or_else(invalid)?;
    let payload_region = after_charset.strip_prefix(encoding).and_then(|s| s.strip_prefix('?'));
    let payload_region = payload_region.ok_or_else(invalid)?;
    let payload_end = payload_region.find("?=").ok_or_else(invalid)?;
    let payload = &payload_region[..payload_end];
    if payload.contains(char::is_whitespace) {
        return Err(invalid());
    }

    let bytes = match encoding {
        "B" | "b" => decode_base64_lenient(payload.as_bytes()).ok_or_else(invalid)?,
        "Q" | "q" => decode_q(payload),
        other => {
            return Err(Error::InvalidEncoding(format!("Unknown encoding: {other}")));
        }
    };

    // RFC 2231 allows a language suffix: `utf-8*en`
    let label = charset.split('*').next().unwrap_or(charset);
    let consumed = 2 + charset_end + 1 + 2 + payload_end + 2;

    Ok((decode_charset(&bytes, Some(label)), consumed))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_decode() {
        let decoded = decode_base64("SGVsbG8sIFdvcmxkIQ==").unwrap();
        assert_eq!(decoded, b"Hello, World!");
        assert!(decode_base64("not base64!").is_err());
    }

    #[test]
    fn test_base64_lenient_line_wrapped() {
        let encoded = b"SGVsbG8s\r\nIFdvcmxk\r\nIQ==\r\n";
        assert_eq!(decode_base64_lenient(encoded).unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_base64_lenient_missing_padding() {
        assert_eq!(decode_base64_lenient(b"SGk").unwrap(), b"Hi");
    }

    #[test]
    fn test_base64_lenient_stray_characters() {
        assert_eq!(decode_base64_lenient(b"SG*Vs bG8").unwrap(), b"Hello");
        // dangling sextet is dropped
        assert_eq!(decode_base64_lenient(b"SGVsbG8hZ").unwrap(), b"Hello!");
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable(b"Hello, World!"), b"Hello, World!");
        assert_eq!(decode_quoted_printable(b"H=C3=A9llo"), "Héllo".as_bytes());
        assert_eq!(decode_quoted_printable(b"a=3db"), b"a=b");
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        assert_eq!(decode_quoted_printable(b"Hello=\r\nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello=  \nWorld"), b"HelloWorld");
    }

    #[test]
    fn test_quoted_printable_keeps_hard_breaks() {
        assert_eq!(
            decode_quoted_printable(b"line one   \r\nline two\r\n"),
            b"line one\r\nline two\r\n"
        );
    }

    #[test]
    fn test_quoted_printable_malformed_escape() {
        assert_eq!(decode_quoted_printable(b"100=%"), b"100=%");
        assert_eq!(decode_quoted_printable(b"end=G"), b"end=G");
    }

    #[test]
    fn test_rfc2047_decode() {
        assert_eq!(decode_rfc2047("Hello"), "Hello");
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?="), "Héllo");
    }

    #[test]
    fn test_rfc2047_quoted_printable() {
        assert_eq!(decode_rfc2047("=?utf-8?Q?H=C3=A9llo_there?="), "Héllo there");
        assert_eq!(decode_rfc2047("=?ISO-8859-1?q?caf=E9?="), "café");
    }

    #[test]
    fn test_rfc2047_mixed_with_plain_text() {
        assert_eq!(
            decode_rfc2047("Re: =?utf-8?B?SMOpbGxv?= world"),
            "Re: Héllo world"
        );
    }

    #[test]
    fn test_rfc2047_adjacent_words_join() {
        assert_eq!(
            decode_rfc2047("=?utf-8?Q?foo?=\r\n =?utf-8?Q?bar?="),
            "foobar"
        );
        assert_eq!(decode_rfc2047("=?utf-8?Q?a?= b =?utf-8?Q?c?="), "a b c");
    }

    #[test]
    fn test_rfc2047_invalid_word_kept() {
        assert_eq!(decode_rfc2047("=?utf-8?X?abc?="), "=?utf-8?X?abc?=");
        assert_eq!(decode_rfc2047("price =? unknown"), "price =? unknown");
    }

    #[test]
    fn test_rfc2047_japanese_charsets() {
        assert_eq!(decode_rfc2047("=?ISO-2022-JP?B?GyRCJUYlOSVIGyhC?="), "テスト");
        assert_eq!(decode_rfc2047("=?shift_jis?B?g2WDWINn?="), "テスト");
        assert_eq!(decode_rfc2047("=?EUC-JP?B?pcaluaXI?= 1"), "テスト 1");
    }

    #[test]
    fn test_rfc2047_language_suffix() {
        assert_eq!(decode_rfc2047("=?utf-8*en?Q?hi?="), "hi");
    }
}
