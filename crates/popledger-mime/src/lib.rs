//! # popledger-mime
//!
//! Best-effort MIME decoding for messages retrieved over POP3.
//!
//! ## Features
//!
//! - **Header decoding**: Unfolding and RFC 2047 encoded words, original casing kept
//! - **Recursive structure**: Multipart and `message/rfc822` bodies become a tree of parts
//! - **Transfer encodings**: Base64 and Quoted-Printable, unknown encodings pass through
//! - **Charsets**: UTF-8, US-ASCII, ISO-8859-1 and Windows-1252, UTF-8 fallback otherwise
//! - **Never fails**: Malformed input degrades to a best-effort leaf instead of an error
//!
//! ## Quick Start
//!
//! ```
//! use popledger_mime::{parse, BodyPart, Payload};
//!
//! let raw = b"From: a@x\r\nTo: b@y\r\nSubject: hi\r\n\r\nhello";
//! let message = parse(raw);
//!
//! assert_eq!(message.headers.get("subject"), Some("hi"));
//! match &message.body[0] {
//!     BodyPart::Leaf { data, .. } => assert_eq!(data, &Payload::Text("hello".into())),
//!     BodyPart::Container { .. } => unreachable!(),
//! }
//! ```
//!
//! ## Serialization
//!
//! With the `serde` feature enabled, [`ParsedMessage`] serializes to a flat
//! object of headers plus a `"Body"` array, which is the shape handed to JSON
//! consumers.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod charset;
mod content_type;
mod error;
mod header;
mod message;
#[cfg(feature = "serde")]
mod ser;

pub mod encoding;

pub use charset::decode_charset;
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{BodyPart, ParsedMessage, Payload, TransferEncoding, parse};
