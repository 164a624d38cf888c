//! Builder for outgoing messages.

use crate::charset::Charset;
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::message::{Message, Part};
use chrono::{DateTime, FixedOffset, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;

/// Prefix of generated multipart boundaries.
///
/// Quoted-printable output never contains `=_`, so a boundary with this
/// prefix cannot collide with encoded content.
const BOUNDARY_PREFIX: &str = "=_mailsmith_";

/// Assembles headers and text bodies into a [`Message`].
///
/// Header values must already be header-safe: non-ASCII text encoded with
/// [`encode_rfc2047`](crate::encoding::encode_rfc2047) and display names
/// composed with [`Mailbox::header_value`](crate::Mailbox::header_value).
/// Bodies are raw bytes in the builder's charset.
///
/// # Examples
///
/// ```
/// use mailsmith_mime::{Charset, MessageBuilder};
///
/// let message = MessageBuilder::new()
///     .from("sender@example.com")
///     .to("recipient@example.com")
///     .subject("Test")
///     .charset(Charset::us_ascii())
///     .text_body(b"Plain text version".to_vec())
///     .html_body(b"<h1>HTML version</h1>".to_vec())
///     .build()
///     .unwrap();
///
/// assert!(message.is_multipart());
/// assert_eq!(message.parts.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    to: Option<String>,
    cc: Option<String>,
    bcc: Option<String>,
    subject: Option<String>,
    date: Option<DateTime<FixedOffset>>,
    extra_headers: Headers,
    charset: Charset,
    text: Option<Vec<u8>>,
    html: Option<Vec<u8>>,
    boundary: Option<String>,
}

impl MessageBuilder {
    /// Creates an empty builder using `utf-8`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the From header value.
    #[must_use]
    pub fn from(mut self, value: impl Into<String>) -> Self {
        self.from = Some(value.into());
        self
    }

    /// Sets the To header value.
    #[must_use]
    pub fn to(mut self, value: impl Into<String>) -> Self {
        self.to = Some(value.into());
        self
    }

    /// Sets the Cc header value. Defaults to empty.
    #[must_use]
    pub fn cc(mut self, value: impl Into<String>) -> Self {
        self.cc = Some(value.into());
        self
    }

    /// Sets the Bcc header value. Defaults to empty.
    #[must_use]
    pub fn bcc(mut self, value: impl Into<String>) -> Self {
        self.bcc = Some(value.into());
        self
    }

    /// Sets the (already encoded) Subject header value.
    #[must_use]
    pub fn subject(mut self, value: impl Into<String>) -> Self {
        self.subject = Some(value.into());
        self
    }

    /// Overrides the Date header. Defaults to the time of [`build`](Self::build).
    #[must_use]
    pub const fn date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.date = Some(date);
        self
    }

    /// Appends an extra header after the standard ones.
    ///
    /// Repeated names are kept; extra headers never replace standard ones.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.add(name, value);
        self
    }

    /// Appends every header in `headers` after the standard ones.
    #[must_use]
    pub fn headers(mut self, headers: &Headers) -> Self {
        self.extra_headers.extend(headers);
        self
    }

    /// Sets the charset declared on every part.
    #[must_use]
    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn text_body(mut self, body: Vec<u8>) -> Self {
        self.text = Some(body);
        self
    }

    /// Sets the HTML body, making the message `multipart/alternative`.
    #[must_use]
    pub fn html_body(mut self, body: Vec<u8>) -> Self {
        self.html = Some(body);
        self
    }

    /// Overrides the generated multipart boundary.
    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Builds the message.
    ///
    /// Headers are written as From, To, Cc, Bcc, Subject, Date, then any
    /// extra headers in the order they were added. With an HTML body the
    /// message holds a `text/plain` part (body plus a trailing newline) and
    /// a `text/html` part; otherwise a single `text/plain` part.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingHeader`] if From, To or Subject is unset,
    /// [`Error::Parse`] if there is no text body, or
    /// [`Error::InvalidHeader`] if any header name or value holds a line
    /// break.
    pub fn build(self) -> Result<Message> {
        let from = self.from.ok_or_else(|| missing("From"))?;
        let to = self.to.ok_or_else(|| missing("To"))?;
        let subject = self.subject.ok_or_else(|| missing("Subject"))?;
        let mut text = self
            .text
            .ok_or_else(|| Error::Parse("No text body".to_string()))?;
        let date = self.date.unwrap_or_else(|| Utc::now().fixed_offset());

        let mut headers = Headers::new();
        headers.add("From", from);
        headers.add("To", to);
        headers.add("Cc", self.cc.unwrap_or_default());
        headers.add("Bcc", self.bcc.unwrap_or_default());
        headers.add("Subject", subject);
        headers.add("Date", date.to_rfc2822());
        headers.extend(&self.extra_headers);
        reject_line_breaks(&headers)?;

        let message = match self.html {
            Some(html) => {
                text.push(b'\n');
                let boundary = self.boundary.unwrap_or_else(generate_boundary);
                Message::multipart(
                    headers,
                    boundary,
                    vec![
                        Part::text("plain", &self.charset, text),
                        Part::text("html", &self.charset, html),
                    ],
                )
            }
            None => Message::single_part(headers, Part::text("plain", &self.charset, text)),
        };

        Ok(message)
    }
}

fn missing(name: &str) -> Error {
    Error::MissingHeader(name.to_string())
}

/// Headers are written one per line, so a CR or LF would start a new one.
fn reject_line_breaks(headers: &Headers) -> Result<()> {
    let is_break = |c: char| c == '\r' || c == '\n';
    match headers
        .iter()
        .find(|(name, value)| name.contains(is_break) || value.contains(is_break))
    {
        Some((name, _)) => Err(Error::InvalidHeader(format!("{name} contains a line break"))),
        None => Ok(()),
    }
}

/// Generates a random multipart boundary.
#[must_use]
pub fn generate_boundary() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("{BOUNDARY_PREFIX}{suffix}")
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
    use chrono::TimeZone;

    fn base() -> MessageBuilder {
        let date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 1, 12, 30, 0)
            .unwrap();
        MessageBuilder::new()
            .from("\"Site\" <noreply@example.com>")
            .to("user@example.com")
            .subject("Welcome")
            .date(date)
            .text_body(b"Hello".to_vec())
    }

    #[test]
    fn test_single_part_message() {
        let message = base().charset(Charset::us_ascii()).build().unwrap();

        assert!(!message.is_multipart());
        assert_eq!(message.parts.len(), 1);
        let part = &message.parts[0];
        assert_eq!(part.content_type.essence(), "text/plain");
        assert_eq!(part.charset(), Some("us-ascii"));
        assert_eq!(part.body, b"Hello");
    }

    #[test]
    fn test_multipart_message() {
        let charset = Charset::for_label("iso-8859-1").unwrap();
        let message = base()
            .charset(charset)
            .html_body(b"<p>Hello</p>".to_vec())
            .build()
            .unwrap();

        assert!(message.is_multipart());
        assert_eq!(message.parts.len(), 2);
        assert_eq!(message.parts[0].content_type.essence(), "text/plain");
        assert_eq!(message.parts[0].body, b"Hello\n");
        assert_eq!(message.parts[1].content_type.essence(), "text/html");
        assert!(message.parts.iter().all(|p| p.charset() == Some("iso-8859-1")));
        assert!(message.boundary.as_deref().unwrap().starts_with(BOUNDARY_PREFIX));
    }

    #[test]
    fn test_standard_header_order() {
        let message = base()
            .header("X-Campaign", "spring")
            .header("Reply-To", "support@example.com")
            .header("X-Campaign", "launch")
            .build()
            .unwrap();

        let names: Vec<&str> = message.headers.iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            ["From", "To", "Cc", "Bcc", "Subject", "Date", "X-Campaign", "Reply-To", "X-Campaign"]
        );
        assert_eq!(message.headers.get("Cc"), Some(""));
        assert_eq!(message.headers.get("Bcc"), Some(""));
        assert_eq!(message.date(), Some("Fri, 1 Mar 2024 12:30:00 +0000"));
    }

    #[test]
    fn test_extra_headers_do_not_replace_standard() {
        let message = base().header("Subject", "Injected").build().unwrap();
        assert_eq!(message.subject(), Some("Welcome"));
        assert_eq!(message.headers.get_all("Subject"), ["Welcome", "Injected"]);
    }

    #[test]
    fn test_line_breaks_in_headers_rejected() {
        let err = base().subject("Hi\r\nBcc: evil@attacker.example").build();
        assert!(matches!(err, Err(Error::InvalidHeader(msg)) if msg.starts_with("Subject")));

        let err = base().to("user@example.com\nBcc: evil@attacker.example").build();
        assert!(matches!(err, Err(Error::InvalidHeader(msg)) if msg.starts_with("To")));

        let err = base().header("X-Campaign", "spring\rBcc: x@y.z").build();
        assert!(matches!(err, Err(Error::InvalidHeader(msg)) if msg.starts_with("X-Campaign")));

        let err = base().header("X-A\nBcc", "x@y.z").build();
        assert!(matches!(err, Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_missing_fields() {
        let err = MessageBuilder::new().to("a@x.com").subject("s").text_body(vec![]).build();
        assert!(matches!(err, Err(Error::MissingHeader(name)) if name == "From"));

        let err = MessageBuilder::new().from("a@x.com").to("b@x.com").subject("s").build();
        assert!(matches!(err, Err(Error::Parse(_))));
    }

    #[test]
    fn test_explicit_boundary() {
        let message = base()
            .boundary("fixed")
            .html_body(b"<p/>".to_vec())
            .build()
            .unwrap();
        assert_eq!(message.boundary.as_deref(), Some("fixed"));
    }

    #[test]
    fn test_generated_boundaries_differ() {
        let a = generate_boundary();
        let b = generate_boundary();
        assert_ne!(a, b);
        assert_eq!(a.len(), BOUNDARY_PREFIX.len() + 24);
    }
}
