//! Errors raised while building, encoding or parsing messages.

use std::string::FromUtf8Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Message construction and parsing failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A header line without a `name: value` shape.
    #[error("Malformed header line: {0}")]
    InvalidHeader(String),

    /// A `Content-Type` value without `type/subtype`.
    #[error("Malformed Content-Type: {0}")]
    InvalidContentType(String),

    /// Bad quoted-printable escape or RFC 2047 encoded-word.
    #[error("Bad transfer encoding: {0}")]
    InvalidEncoding(String),

    /// Malformed base64 body or encoded-word.
    #[error("Bad base64 payload: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Bytes labelled UTF-8 that are not.
    #[error("Invalid UTF-8 text: {0}")]
    Utf8Decode(#[from] FromUtf8Error),

    /// Charset label not recognized, or not usable for outgoing mail.
    #[error("Unknown charset: {0}")]
    UnknownCharset(String),

    /// Text contains characters the target charset cannot represent.
    #[error("Text cannot be represented in charset {charset}")]
    UnmappableText {
        /// Target charset label.
        charset: String,
    },

    /// An address that does not look like `local@domain`.
    #[error("Unusable address: {0}")]
    InvalidAddress(String),

    /// A multipart `Content-Type` without a `boundary` parameter.
    #[error("Multipart body has no boundary parameter")]
    MissingBoundary,

    /// Multipart body whose delimiters do not line up.
    #[error("Broken multipart body: {0}")]
    InvalidMultipart(String),

    /// A header the message cannot go out without.
    #[error("Message has no {0} header")]
    MissingHeader(String),

    /// Anything else that keeps a message from being read or assembled.
    #[error("Cannot process message: {0}")]
    Parse(String),
}

impl Error {
    /// True when the charset could not be resolved or could not hold the text.
    #[must_use]
    pub const fn is_encoding_error(&self) -> bool {
        matches!(self, Self::UnknownCharset(_) | Self::UnmappableText { .. })
    }
}
