//! # mailsmith-mime
//!
//! MIME message generation library for outgoing email.
//!
//! ## Features
//!
//! - **Charset negotiation**: Pick `us-ascii` for ASCII content, transcode
//!   everything else into a requested charset
//! - **Header encoding**: RFC 2047 encoded words for non-ASCII header text
//! - **Message building**: Single-part `text/plain` or
//!   `multipart/alternative` with an HTML part
//! - **Envelope extraction**: Envelope sender, recipients and routing hint
//! - **Parsing**: Read serialized messages back for inspection
//!
//! ## Quick Start
//!
//! ### Negotiating a Charset
//!
//! ```ignore
//! use mailsmith_mime::MessageText;
//!
//! let text = MessageText {
//!     subject: "Grüße",
//!     body: "Hallo",
//!     html: None,
//!     from_name: None,
//! };
//!
//! let negotiated = text.negotiate(Some("iso-8859-1"))?;
//! assert_eq!(negotiated.charset.name(), "iso-8859-1");
//! ```
//!
//! ### Building Messages
//!
//! ```ignore
//! use mailsmith_mime::{Charset, MessageBuilder, Mailbox};
//! use mailsmith_mime::encoding::encode_rfc2047;
//!
//! let charset = Charset::utf8();
//! let subject = encode_rfc2047("Héllo".as_bytes(), &charset)?;
//!
//! let message = MessageBuilder::new()
//!     .from(Mailbox::with_name("Site", "noreply@example.com").header_value())
//!     .to("recipient@example.com")
//!     .subject(subject)
//!     .charset(charset)
//!     .text_body(b"Plain text version".to_vec())
//!     .html_body(b"<h1>HTML version</h1>".to_vec())
//!     .build()?; // Creates multipart/alternative
//!
//! let recipients = message.recipients();
//! let wire = message.to_bytes();
//! ```
//!
//! ### Encoding/Decoding
//!
//! ```ignore
//! use mailsmith_mime::encoding::{decode_rfc2047, encode_base64, encode_quoted_printable};
//!
//! // Base64
//! let encoded = encode_base64(b"Hello, World!");
//!
//! // Quoted-Printable
//! let encoded = encode_quoted_printable("Héllo, Wørld!".as_bytes());
//!
//! // RFC 2047 header decoding
//! let decoded = decode_rfc2047("=?utf-8?B?SMOpbGxv?=")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod builder;
mod charset;
mod content_type;
mod envelope;
mod error;
mod header;
mod message;
mod wrap;

pub mod encoding;

pub use address::{Mailbox, RoutingHint, parse_address, sanitize_display_name};
pub use builder::{MessageBuilder, generate_boundary};
pub use charset::{Charset, DEFAULT_CHARSET, MessageText, Negotiated};
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part, TransferEncoding};
pub use wrap::{DEFAULT_WRAP_WIDTH, wrap_text};
