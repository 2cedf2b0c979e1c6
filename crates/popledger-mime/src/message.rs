//! Recursive MIME message decoding.

use crate::charset::decode_charset;
use crate::content_type::ContentType;
use crate::encoding::{decode_base64_lenient, decode_quoted_printable};
use crate::header::Headers;
use std::fmt;
use tracing::debug;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    ///
    /// Unknown encodings are treated as `7bit`, i.e. passed through unchanged.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }

    /// Reads the `Content-Transfer-Encoding` header.
    #[must_use]
    pub fn of(headers: &Headers) -> Self {
        headers
            .get("content-transfer-encoding")
            .map_or(Self::SevenBit, Self::parse)
    }

    /// Reverses this encoding.
    ///
    /// Base64 that cannot be decoded even leniently is returned as-is.
    #[must_use]
    pub fn decode(self, body: &[u8]) -> Vec<u8> {
        match self {
            Self::Base64 => decode_base64_lenient(body).unwrap_or_else(|| {
                debug!("undecodable base64 body, keeping raw bytes");
                body.to_vec()
            }),
            Self::QuotedPrintable => decode_quoted_printable(body),
            Self::SevenBit | Self::EightBit | Self::Binary => body.to_vec(),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Decoded content of a leaf part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// `text/*` content decoded with its charset.
    Text(String),
    /// Any other content, transfer-decoded bytes.
    Binary(Vec<u8>),
}

impl Payload {
    /// Returns the text if this is a text payload.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// Returns the raw bytes of the payload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }
}

/// One node of a decoded MIME tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyPart {
    /// A part with content.
    Leaf {
        /// Part headers.
        headers: Headers,
        /// Decoded content.
        data: Payload,
    },
    /// A multipart or encapsulated-message part.
    Container {
        /// Part headers.
        headers: Headers,
        /// Child parts in source order.
        parts: Vec<BodyPart>,
    },
}

impl BodyPart {
    /// Returns the part headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        match self {
            Self::Leaf { headers, .. } | Self::Container { headers, .. } => headers,
        }
    }

    /// Returns the decoded content of a leaf part.
    #[must_use]
    pub const fn data(&self) -> Option<&Payload> {
        match self {
            Self::Leaf { data, .. } => Some(data),
            Self::Container { .. } => None,
        }
    }

    /// Returns the children of a container part (empty for leaves).
    #[must_use]
    pub fn parts(&self) -> &[Self] {
        match self {
            Self::Leaf { .. } => &[],
            Self::Container { parts, .. } => parts,
        }
    }

    /// Gets the content type, falling back to the RFC 2045 default.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        content_type_or(self.headers(), ContentType::default)
    }

    /// Visits this part and all descendant leaves, depth first.
    pub fn leaves(&self) -> Box<dyn Iterator<Item = &Self> + '_> {
        match self {
            Self::Leaf { .. } => Box::new(std::iter::once(self)),
            Self::Container { parts, .. } => Box::new(parts.iter().flat_map(Self::leaves)),
        }
    }
}

/// A decoded message: its headers plus a never-empty body sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    /// Message headers.
    pub headers: Headers,
    /// Top-level body parts. Single-part messages have exactly one leaf.
    pub body: Vec<BodyPart>,
}

impl ParsedMessage {
    /// Gets the From header.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.headers.get("from")
    }

    /// Gets the To header.
    #[must_use]
    pub fn to(&self) -> Option<&str> {
        self.headers.get("to")
    }

    /// Gets the Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("subject")
    }

    /// Gets the Date header.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.headers.get("date")
    }

    /// Gets the Message-ID header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get("message-id")
    }

    /// Returns every leaf of the body, depth first.
    pub fn leaves(&self) -> impl Iterator<Item = &BodyPart> {
        self.body.iter().flat_map(BodyPart::leaves)
    }

    /// Finds the first text/plain leaf.
    #[must_use]
    pub fn text_part(&self) -> Option<&str> {
        self.leaves()
            .find(|part| {
                let ct = part.content_type();
                ct.is_text() && ct.sub_type == "plain"
            })
            .and_then(BodyPart::data)
            .and_then(Payload::as_text)
    }
}

/// Decodes a raw RFC 5322 message.
///
/// Never fails: a multipart body without a usable boundary becomes a single
/// `text/plain` leaf, unknown transfer encodings pass through and
/// undecodable text is replaced character by character.
#[must_use]
pub fn parse(raw: &[u8]) -> ParsedMessage {
    let (header_block, body) = split_header_body(raw);
    let headers = Headers::parse(header_block);

    let body = match parse_part(headers.clone(), body, ContentType::default) {
        BodyPart::Container { headers, parts } if content_type_of(&headers).is_multipart() => {
            parts
        }
        part => vec![part],
    };

    ParsedMessage { headers, body }
}

fn parse_part(mut headers: Headers, body: &[u8], default: fn() -> ContentType) -> BodyPart {
    let content_type = content_type_or(&headers, default);

    if content_type.is_multipart() {
        let blocks = content_type
            .boundary()
            .and_then(|boundary| split_multipart(body, boundary));

        let Some(blocks) = blocks else {
            debug!(
                content_type = %content_type,
                "multipart body without usable boundary, decoding as text/plain"
            );
            headers.set("Content-Type", ContentType::text_plain().to_string());
            return leaf(headers, body, ContentType::text_plain());
        };

        let child_default: fn() -> ContentType = if content_type.sub_type == "digest" {
            || ContentType::new("message", "rfc822")
        } else {
            ContentType::default
        };

        let parts = blocks
            .into_iter()
            .map(|block| {
                let (header_block, body) = split_header_body(block);
                parse_part(Headers::parse(header_block), body, child_default)
            })
            .collect();

        return BodyPart::Container { headers, parts };
    }

    if content_type.is_message() {
        let inner = TransferEncoding::of(&headers).decode(body);
        let (header_block, inner_body) = split_header_body(&inner);
        let embedded = parse_part(Headers::parse(header_block), inner_body, ContentType::default);
        return BodyPart::Container {
            headers,
            parts: vec![embedded],
        };
    }

    leaf(headers, body, content_type)
}

fn leaf(headers: Headers, body: &[u8], content_type: ContentType) -> BodyPart {
    let decoded = TransferEncoding::of(&headers).decode(body);
    let data = if content_type.is_text() {
        Payload::Text(decode_charset(&decoded, content_type.charset()))
    } else {
        Payload::Binary(decoded)
    };
    BodyPart::Leaf { headers, data }
}

fn content_type_of(headers: &Headers) -> ContentType {
    content_type_or(headers, ContentType::default)
}

fn content_type_or(headers: &Headers, default: fn() -> ContentType) -> ContentType {
    headers
        .get("content-type")
        .and_then(|value| ContentType::parse(value).ok())
        .unwrap_or_else(default)
}

/// Splits a header+body unit at the first empty line.
///
/// Without an empty line everything is header and the body is empty.
fn split_header_body(raw: &[u8]) -> (&[u8], &[u8]) {
    let mut offset = 0;
    for line in raw.split_inclusive(|&b| b == b'\n') {
        if line == b"\n" || line == b"\r\n" {
            return (&raw[..offset], &raw[offset + line.len()..]);
        }
        offset += line.len();
    }
    (raw, &raw[raw.len()..])
}

/// Splits a multipart body into its sub-blocks (RFC 2046 section 5.1.1).
///
/// Preamble and epilogue are dropped, and the line break before each
/// delimiter belongs to the delimiter. Returns `None` when no delimiter line
/// is present or no part lies between delimiters. A missing close delimiter
/// ends the last part at the end of the body.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Option<Vec<&'a [u8]>> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut part_start: Option<usize> = None;
    let mut offset = 0;

    for line in body.split_inclusive(|&b| b == b'\n') {
        let line_end = offset + line.len();

        if let Some(rest) = line.strip_prefix(delimiter.as_bytes()) {
            let rest = rest.trim_ascii_end();
            let is_close = rest.starts_with(b"--");

            if rest.is_empty() || is_close {
                if let Some(start) = part_start.take() {
                    parts.push(strip_final_line_break(&body[start..offset]));
                }
                if is_close {
                    return (!parts.is_empty()).then_some(parts);
                }
                part_start = Some(line_end);
            }
        }

        offset = line_end;
    }

    if let Some(start) = part_start {
        parts.push(strip_final_line_break(&body[start.min(body.len())..]));
    }

    (!parts.is_empty()).then_some(parts)
}

fn strip_final_line_break(block: &[u8]) -> &[u8] {
    block
        .strip_suffix(b"\r\n")
        .or_else(|| block.strip_suffix(b"\n"))
        .unwrap_or(block)
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

    fn text(part: &BodyPart) -> &str {
        part.data().and_then(Payload::as_text).unwrap()
    }

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("x-uuencode"), TransferEncoding::SevenBit);
    }

    #[test]
    fn test_single_part_round_trip() {
        let raw = b"From: a@x\r\nTo: b@y\r\nSubject: hi\r\n\r\nhello";
        let message = parse(raw);

        assert_eq!(message.from(), Some("a@x"));
        assert_eq!(message.to(), Some("b@y"));
        assert_eq!(message.subject(), Some("hi"));
        assert_eq!(message.body.len(), 1);
        assert_eq!(text(&message.body[0]), "hello");
        assert_eq!(message.body[0].headers(), &message.headers);
    }

    #[test]
    fn test_split_header_body() {
        assert_eq!(split_header_body(b"A: 1\n\nbody"), (&b"A: 1\n"[..], &b"body"[..]));
        assert_eq!(split_header_body(b"A: 1\r\n"), (&b"A: 1\r\n"[..], &b""[..]));
        assert_eq!(split_header_body(b"\r\nbody"), (&b""[..], &b"body"[..]));
    }

    #[test]
    fn test_multipart_two_parts_in_order() {
        let raw = concat!(
            "Subject: parts\r\n",
            "Content-Type: multipart/mixed; boundary=X\r\n",
            "\r\n",
            "preamble is dropped\r\n",
            "--X\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "first\r\n",
            "--X\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<p>second</p>\r\n",
            "--X--\r\n",
            "epilogue is dropped\r\n",
        );
        let message = parse(raw.as_bytes());

        assert_eq!(message.subject(), Some("parts"));
        assert_eq!(message.body.len(), 2);
        assert_eq!(text(&message.body[0]), "first");
        assert_eq!(text(&message.body[1]), "<p>second</p>");
        assert_eq!(
            message.body[1].headers().get("content-type"),
            Some("text/html")
        );
    }

    #[test]
    fn test_nested_multipart() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=outer\r\n",
            "\r\n",
            "--outer\r\n",
            "Content-Type: multipart/alternative; boundary=\"inner\"\r\n",
            "\r\n",
            "--inner\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "plain\r\n",
            "--inner\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<b>html</b>\r\n",
            "--inner--\r\n",
            "--outer\r\n",
            "Content-Type: application/octet-stream\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "AAEC/w==\r\n",
            "--outer--\r\n",
        );
        let message = parse(raw.as_bytes());

        assert_eq!(message.body.len(), 2);
        let alternative = &message.body[0];
        assert_eq!(alternative.parts().len(), 2);
        assert_eq!(text(&alternative.parts()[0]), "plain");
        assert_eq!(text(&alternative.parts()[1]), "<b>html</b>");
        assert_eq!(
            message.body[1].data(),
            Some(&Payload::Binary(vec![0, 1, 2, 255]))
        );
        assert_eq!(message.leaves().count(), 3);
        assert_eq!(message.text_part(), Some("plain"));
    }

    #[test]
    fn test_multipart_without_delimiters_falls_back_to_leaf() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=missing\r\n",
            "\r\n",
            "no delimiter anywhere\r\n",
        );
        let message = parse(raw.as_bytes());

        assert_eq!(message.body.len(), 1);
        assert_eq!(text(&message.body[0]), "no delimiter anywhere\r\n");
        assert_eq!(
            message.body[0].headers().get("content-type"),
            Some("text/plain")
        );
        // top-level headers are left as received
        assert_eq!(
            message.headers.get("content-type"),
            Some("multipart/mixed; boundary=missing")
        );
    }

    #[test]
    fn test_multipart_without_boundary_parameter() {
        let raw = b"Content-Type: multipart/mixed\r\n\r\n--x\r\n\r\nbody\r\n--x--\r\n";
        let message = parse(raw);
        assert_eq!(message.body.len(), 1);
        assert!(message.body[0].data().is_some());
    }

    #[test]
    fn test_multipart_only_close_delimiter_falls_back() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n--b--\r\n";
        let message = parse(raw);
        assert_eq!(message.body.len(), 1);
        assert_eq!(text(&message.body[0]), "--b--\r\n");
    }

    #[test]
    fn test_multipart_missing_close_delimiter() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\n\n--b\n\nonly part\n";
        let message = parse(raw);
        assert_eq!(message.body.len(), 1);
        assert_eq!(text(&message.body[0]), "only part");
    }

    #[test]
    fn test_boundary_prefix_is_not_a_delimiter() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=b\r\n",
            "\r\n",
            "--b\r\n",
            "\r\n",
            "--bee is just text\r\n",
            "--b--\r\n",
        );
        let message = parse(raw.as_bytes());
        assert_eq!(message.body.len(), 1);
        assert_eq!(text(&message.body[0]), "--bee is just text");
    }

    #[test]
    fn test_quoted_printable_latin1_text() {
        let raw = concat!(
            "Content-Type: text/plain; charset=iso-8859-1\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "caf=E9 cr=E8me=\r\n",
            " br=FBl=E9e",
        );
        let message = parse(raw.as_bytes());
        assert_eq!(text(&message.body[0]), "café crème brûlée");
    }

    #[test]
    fn test_base64_utf8_text() {
        let raw = concat!(
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "SMOpbGxv\r\n",
        );
        let message = parse(raw.as_bytes());
        assert_eq!(text(&message.body[0]), "Héllo");
    }

    #[test]
    fn test_unknown_transfer_encoding_is_identity() {
        let raw = b"Content-Transfer-Encoding: x-custom\r\n\r\n=E9 raw";
        let message = parse(raw);
        assert_eq!(text(&message.body[0]), "=E9 raw");
    }

    #[test]
    fn test_undecodable_text_never_fails() {
        let raw = b"Content-Type: text/plain; charset=x-made-up\r\n\r\nbad \xff\xfe bytes";
        let message = parse(raw);
        assert_eq!(text(&message.body[0]), "bad \u{FFFD}\u{FFFD} bytes");
    }

    #[test]
    fn test_invalid_content_type_defaults_to_text() {
        let raw = b"Content-Type: garbage\r\n\r\nstill text";
        let message = parse(raw);
        assert_eq!(text(&message.body[0]), "still text");
    }

    #[test]
    fn test_non_text_leaf_is_binary() {
        let raw = b"Content-Type: image/png\r\n\r\n\x89PNG";
        let message = parse(raw);
        assert_eq!(
            message.body[0].data(),
            Some(&Payload::Binary(b"\x89PNG".to_vec()))
        );
    }

    #[test]
    fn test_encapsulated_message() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=m\r\n",
            "\r\n",
            "--m\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "see attached\r\n",
            "--m\r\n",
            "Content-Type: message/rfc822\r\n",
            "\r\n",
            "Subject: =?utf-8?Q?inner_=C3=A9?=\r\n",
            "\r\n",
            "inner body\r\n",
            "--m--\r\n",
        );
        let message = parse(raw.as_bytes());

        assert_eq!(message.body.len(), 2);
        let forwarded = &message.body[1];
        assert_eq!(forwarded.parts().len(), 1);
        let inner = &forwarded.parts()[0];
        assert_eq!(inner.headers().get("subject"), Some("inner é"));
        assert_eq!(text(inner), "inner body");
    }

    #[test]
    fn test_digest_parts_default_to_messages() {
        let raw = concat!(
            "Content-Type: multipart/digest; boundary=d\r\n",
            "\r\n",
            "--d\r\n",
            "\r\n",
            "Subject: one\r\n",
            "\r\n",
            "first\r\n",
            "--d--\r\n",
        );
        let message = parse(raw.as_bytes());
        let inner = &message.body[0].parts()[0];
        assert_eq!(inner.headers().get("subject"), Some("one"));
        assert_eq!(text(inner), "first");
    }

    #[test]
    fn test_empty_input_has_one_leaf() {
        let message = parse(b"");
        assert!(message.headers.is_empty());
        assert_eq!(message.body.len(), 1);
        assert_eq!(text(&message.body[0]), "");
    }

    #[test]
    fn test_lf_only_line_endings() {
        let raw = "Content-Type: multipart/mixed; boundary=z\n\n--z\nContent-Type: text/plain\n\none\n--z--\n";
        let message = parse(raw.as_bytes());
        assert_eq!(message.body.len(), 1);
        assert_eq!(text(&message.body[0]), "one");
    }
}
