//! Error types for MIME operations.
//!
//! [`crate::parse`] never returns these; they surface only from the strict
//! helpers ([`crate::ContentType::parse`], [`crate::encoding`]).

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from strict MIME decoding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `Content-Type` value without a usable `type/subtype`.
    #[error("Malformed content type: {0}")]
    InvalidContentType(String),

    /// Malformed encoded word or unknown encoding letter.
    #[error("Malformed encoded text: {0}")]
    InvalidEncoding(String),

    /// Strict base64 rejected the input.
    #[error("Base64: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
