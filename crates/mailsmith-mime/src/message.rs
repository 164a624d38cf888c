//! MIME message structure, serialization and parsing.

use crate::charset::Charset;
use crate::content_type::ContentType;
use crate::encoding::{
    decode_base64, decode_quoted_printable, encode_base64, encode_quoted_printable,
};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Base64 line length in message bodies.
const BASE64_LINE_LENGTH: usize = 76;

/// `Content-Transfer-Encoding` of a part.
///
/// Text parts are always written as quoted-printable; the other variants
/// exist so parsed messages keep what they declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// `7bit`, also assumed when the header is absent or unknown.
    #[default]
    SevenBit,
    /// `8bit`.
    EightBit,
    /// `base64`, wrapped at 76 columns.
    Base64,
    /// `quoted-printable`.
    QuotedPrintable,
    /// `binary`.
    Binary,
}

impl TransferEncoding {
    const ALL: [Self; 5] = [
        Self::SevenBit,
        Self::EightBit,
        Self::Base64,
        Self::QuotedPrintable,
        Self::Binary,
    ];

    /// The header token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SevenBit => "7bit",
            Self::EightBit => "8bit",
            Self::Base64 => "base64",
            Self::QuotedPrintable => "quoted-printable",
            Self::Binary => "binary",
        }
    }

    /// Reads a header token, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|encoding| encoding.as_str().eq_ignore_ascii_case(token))
            .unwrap_or_default()
    }

    /// Encodes raw body bytes for the wire.
    #[must_use]
    pub fn encode(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::QuotedPrintable => encode_quoted_printable(data).into_bytes(),
            Self::Base64 => encode_base64(data)
                .as_bytes()
                .chunks(BASE64_LINE_LENGTH)
                .collect::<Vec<_>>()
                .join(&b"\r\n"[..]),
            Self::SevenBit | Self::EightBit | Self::Binary => data.to_vec(),
        }
    }

    /// Decodes a wire body back into raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid for this encoding.
    pub fn decode(self, data: &[u8]) -> Result<Vec<u8>> {
        let text = String::from_utf8_lossy(data);
        match self {
            Self::Base64 => decode_base64(&text.split_whitespace().collect::<String>()),
            Self::QuotedPrintable => decode_quoted_printable(&text),
            Self::SevenBit | Self::EightBit | Self::Binary => Ok(data.to_vec()),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MIME message part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Content type, including the charset parameter for text parts.
    pub content_type: ContentType,
    /// Transfer encoding applied on the wire.
    pub transfer_encoding: TransferEncoding,
    /// Raw body bytes in the part's charset, before transfer encoding.
    pub body: Vec<u8>,
}

impl Part {
    /// Creates a new part.
    #[must_use]
    pub const fn new(
        content_type: ContentType,
        transfer_encoding: TransferEncoding,
        body: Vec<u8>,
    ) -> Self {
        Self {
            content_type,
            transfer_encoding,
            body,
        }
    }

    /// Creates a quoted-printable text part (`text/<subtype>`).
    #[must_use]
    pub fn text(sub_type: &str, charset: &Charset, body: Vec<u8>) -> Self {
        Self::new(
            ContentType::new("text", sub_type).with_parameter("charset", charset.name()),
            TransferEncoding::QuotedPrintable,
            body,
        )
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.content_type.charset()
    }

    /// Gets the body as text, decoded from the part's charset.
    ///
    /// # Errors
    ///
    /// Returns an error if the charset is unknown or the body is invalid in it.
    pub fn body_text(&self) -> Result<String> {
        Charset::for_label(self.charset().unwrap_or("us-ascii"))?.decode(&self.body)
    }

    fn content_headers(&self) -> String {
        format!(
            "Content-Type: {}\r\nContent-Transfer-Encoding: {}\r\n",
            self.content_type, self.transfer_encoding
        )
    }

    fn parse(raw: &str, default_type: &ContentType) -> Result<Self> {
        let (head, body) = split_head_body(raw);
        let headers = Headers::parse(head)?;
        let content_type = headers
            .get("content-type")
            .map_or_else(|| Ok(default_type.clone()), ContentType::parse)?;
        let transfer_encoding = headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse);
        let body = transfer_encoding.decode(body.as_bytes())?;

        Ok(Self::new(content_type, transfer_encoding, body))
    }
}

/// MIME message ready for transmission.
///
/// Holds either one part (sent as the message body) or several parts
/// under `multipart/alternative`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message headers, excluding the MIME content headers.
    pub headers: Headers,
    /// Message parts.
    pub parts: Vec<Part>,
    /// Multipart boundary; `None` for single-part messages.
    pub boundary: Option<String>,
}

impl Message {
    /// Creates a single-part message.
    #[must_use]
    pub fn single_part(headers: Headers, part: Part) -> Self {
        Self {
            headers,
            parts: vec![part],
            boundary: None,
        }
    }

    /// Creates a `multipart/alternative` message.
    #[must_use]
    pub fn multipart(headers: Headers, boundary: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            headers,
            parts,
            boundary: Some(boundary.into()),
        }
    }

    /// Gets the content type of the whole message.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        match (&self.boundary, self.parts.first()) {
            (Some(boundary), _) => ContentType::multipart_alternative(boundary.clone()),
            (None, Some(part)) => part.content_type.clone(),
            (None, None) => ContentType::text_plain("us-ascii"),
        }
    }

    /// Checks if this is a multipart message.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        self.boundary.is_some()
    }

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

    /// Finds the first text/plain part.
    #[must_use]
    pub fn text_part(&self) -> Option<&Part> {
        self.find_part("plain")
    }

    /// Finds the first text/html part.
    #[must_use]
    pub fn html_part(&self) -> Option<&Part> {
        self.find_part("html")
    }

    fn find_part(&self, sub_type: &str) -> Option<&Part> {
        self.parts.iter().find(|part| {
            part.content_type.is_text() && part.content_type.sub_type.eq_ignore_ascii_case(sub_type)
        })
    }

    /// Serializes the message to its wire form.
    ///
    /// Lines end in CRLF. Headers come first, in order, followed by
    /// `MIME-Version` and the content headers.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.headers.to_string().into_bytes();
        out.extend_from_slice(b"MIME-Version: 1.0\r\n");

        match (&self.boundary, self.parts.as_slice()) {
            (None, [part]) => {
                out.extend_from_slice(part.content_headers().as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(&part.transfer_encoding.encode(&part.body));
            }
            _ => {
                let boundary = self.boundary.as_deref().unwrap_or_default();
                let content_type = ContentType::multipart_alternative(boundary);
                out.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());

                for part in &self.parts {
                    out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
                    out.extend_from_slice(part.content_headers().as_bytes());
                    out.extend_from_slice(b"\r\n");
                    out.extend_from_slice(&part.transfer_encoding.encode(&part.body));
                    out.extend_from_slice(b"\r\n");
                }
                out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
            }
        }

        out
    }

    /// Parses a serialized message.
    ///
    /// Bodies must be transfer-encoded text (7bit, quoted-printable or
    /// base64); raw 8-bit bodies are read lossily.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type is invalid, a multipart body has
    /// no boundary or no parts, or a body fails to decode.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let raw = String::from_utf8_lossy(raw);
        let (head, body) = split_head_body(&raw);
        let mut headers = Headers::parse(head)?;

        let content_type = headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain("us-ascii")), ContentType::parse)?;

        let message = if content_type.is_multipart() {
            let boundary = content_type
                .boundary()
                .ok_or(Error::MissingBoundary)?
                .to_string();
            let parts = split_multipart(body, &boundary)
                .into_iter()
                .map(|section| Part::parse(section, &ContentType::text_plain("us-ascii")))
                .collect::<Result<Vec<_>>>()?;
            if parts.is_empty() {
                return Err(Error::InvalidMultipart("no parts found".to_string()));
            }
            Self {
                headers: Headers::new(),
                parts,
                boundary: Some(boundary),
            }
        } else {
            let transfer_encoding = headers
                .get("content-transfer-encoding")
                .map_or(TransferEncoding::SevenBit, TransferEncoding::parse);
            let body = transfer_encoding.decode(body.as_bytes())?;
            Self::single_part(
                Headers::new(),
                Part::new(content_type, transfer_encoding, body),
            )
        };

        for name in ["mime-version", "content-type", "content-transfer-encoding"] {
            headers.remove(name);
        }

        Ok(Self { headers, ..message })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

/// Splits raw text at the first blank line.
fn split_head_body(raw: &str) -> (&str, &str) {
    let crlf = raw.find("\r\n\r\n").map(|i| (i, i + 4));
    let lf = raw.find("\n\n").map(|i| (i, i + 2));

    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };

    match split {
        Some((head_end, body_start)) => (&raw[..head_end], &raw[body_start..]),
        None => (raw, ""),
    }
}

/// Returns the sections between `--boundary` delimiters.
fn split_multipart<'a>(body: &'a str, boundary: &str) -> Vec<&'a str> {
    let delimiter = format!("--{boundary}");
    let mut sections = body.split(delimiter.as_str());
    sections.next(); // preamble

    let mut parts = Vec::new();
    for section in sections {
        if section.starts_with("--") {
            break;
        }
        let section = section
            .strip_prefix("\r\n")
            .or_else(|| section.strip_prefix('\n'))
            .unwrap_or(section);
        let section = section
            .strip_suffix("\r\n")
            .or_else(|| section.strip_suffix('\n'))
            .unwrap_or(section);
        parts.push(section);
    }
    parts
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

    fn headers() -> Headers {
        [
            ("From", "sender@example.com"),
            ("To", "recipient@example.com"),
            ("Subject", "Test"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_transfer_encoding_tokens() {
        for encoding in TransferEncoding::ALL {
            let token = encoding.to_string().to_uppercase();
            assert_eq!(TransferEncoding::parse(&format!(" {token} ")), encoding);
        }
        assert_eq!(TransferEncoding::parse("x-uuencode"), TransferEncoding::SevenBit);
    }

    #[test]
    fn test_base64_body_wrapped() {
        let encoded = TransferEncoding::Base64.encode(&[0u8; 120]);
        let text = String::from_utf8(encoded.clone()).unwrap();
        assert!(text.split("\r\n").all(|line| line.len() <= 76));
        assert_eq!(TransferEncoding::Base64.decode(&encoded).unwrap(), vec![0u8; 120]);
    }

    #[test]
    fn test_part_body_text_latin1() {
        let charset = Charset::for_label("iso-8859-1").unwrap();
        let part = Part::text("plain", &charset, b"Gr\xfc\xdfe".to_vec());
        assert_eq!(part.charset(), Some("iso-8859-1"));
        assert_eq!(part.body_text().unwrap(), "Grüße");
    }

    #[test]
    fn test_single_part_wire_form() {
        let part = Part::text("plain", &Charset::us_ascii(), b"Hello, World!".to_vec());
        let message = Message::single_part(headers(), part);
        let wire = String::from_utf8(message.to_bytes()).unwrap();

        assert_eq!(
            wire,
            concat!(
                "From: sender@example.com\r\n",
                "To: recipient@example.com\r\n",
                "Subject: Test\r\n",
                "MIME-Version: 1.0\r\n",
                "Content-Type: text/plain; charset=us-ascii\r\n",
                "Content-Transfer-Encoding: quoted-printable\r\n",
                "\r\n",
                "Hello, World!"
            )
        );
    }

    #[test]
    fn test_multipart_wire_form() {
        let charset = Charset::utf8();
        let message = Message::multipart(
            headers(),
            "=_b1",
            vec![
                Part::text("plain", &charset, "Plain é\n".as_bytes().to_vec()),
                Part::text("html", &charset, b"<p>HTML</p>".to_vec()),
            ],
        );
        let wire = String::from_utf8(message.to_bytes()).unwrap();

        assert!(wire.contains("Content-Type: multipart/alternative; boundary=\"=_b1\"\r\n\r\n--=_b1\r\n"));
        assert!(wire.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(wire.contains("Plain =C3=A9\r\n"));
        assert!(wire.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(wire.ends_with("<p>HTML</p>\r\n--=_b1--\r\n"));
    }

    #[test]
    fn test_parse_round_trip_single_part() {
        let part = Part::text("plain", &Charset::utf8(), "Héllo".as_bytes().to_vec());
        let message = Message::single_part(headers(), part);

        let parsed = Message::parse(&message.to_bytes()).unwrap();
        assert_eq!(parsed, message);
        assert!(!parsed.is_multipart());
    }

    #[test]
    fn test_parse_round_trip_multipart() {
        let charset = Charset::utf8();
        let message = Message::multipart(
            headers(),
            "=_b2",
            vec![
                Part::text("plain", &charset, b"Plain".to_vec()),
                Part::text("html", &charset, b"<p>HTML</p>".to_vec()),
            ],
        );

        let parsed = Message::parse(&message.to_bytes()).unwrap();
        assert_eq!(parsed, message);
        assert_eq!(parsed.text_part().unwrap().body_text().unwrap(), "Plain");
        assert_eq!(parsed.html_part().unwrap().body_text().unwrap(), "<p>HTML</p>");
        assert_eq!(parsed.content_type().essence(), "multipart/alternative");
    }

    #[test]
    fn test_parse_without_content_type() {
        let parsed = Message::parse(b"Subject: Hi\nFrom: a@b.com\n\nbody text").unwrap();
        assert_eq!(parsed.subject(), Some("Hi"));
        assert_eq!(parsed.parts.len(), 1);
        assert_eq!(parsed.parts[0].body, b"body text");
        assert_eq!(parsed.content_type().essence(), "text/plain");
    }

    #[test]
    fn test_parse_multipart_missing_boundary() {
        let raw = b"Content-Type: multipart/alternative\r\n\r\nbody";
        assert!(matches!(Message::parse(raw), Err(Error::MissingBoundary)));
    }

    #[test]
    fn test_parse_multipart_without_parts() {
        let raw = b"Content-Type: multipart/alternative; boundary=x\r\n\r\nno delimiters";
        assert!(matches!(Message::parse(raw), Err(Error::InvalidMultipart(_))));
    }
}
