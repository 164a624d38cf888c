//! Send requests.

use mailsmith_mime::{Headers, Message};
use serde::{Deserialize, Serialize};

/// A structured request to send one email.
///
/// `to`, `from`, `subject` and `body` are required. Every other field is
/// optional:
///
/// | Field | Unset means |
/// |-------|-------------|
/// | `toname`, `fromname` | no display name, bare address |
/// | `html` | single `text/plain` part |
/// | `cc`, `bcc` | header emitted with empty value |
/// | `charset` | the site's default charset |
/// | `wrap` | body not re-wrapped |
/// | `headers` | no extra headers |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailRequest {
    /// Recipient address.
    pub to: String,
    /// Sender address.
    pub from: String,
    /// Recipient display name.
    #[serde(default)]
    pub toname: Option<String>,
    /// Sender display name.
    #[serde(default)]
    pub fromname: Option<String>,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
    /// HTML body.
    #[serde(default)]
    pub html: Option<String>,
    /// Carbon copy addresses.
    #[serde(default)]
    pub cc: Option<Vec<String>>,
    /// Blind carbon copy addresses.
    #[serde(default)]
    pub bcc: Option<Vec<String>>,
    /// Requested charset for non-ASCII content.
    #[serde(default)]
    pub charset: Option<String>,
    /// Whether to wrap the plain text body.
    #[serde(default)]
    pub wrap: Option<bool>,
    /// Extra headers appended after the standard ones.
    #[serde(default)]
    pub headers: Headers,
}

impl MailRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(
        to: impl Into<String>,
        from: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            from: from.into(),
            toname: None,
            fromname: None,
            subject: subject.into(),
            body: body.into(),
            html: None,
            cc: None,
            bcc: None,
            charset: None,
            wrap: None,
            headers: Headers::new(),
        }
    }

    /// Sets the recipient display name.
    #[must_use]
    pub fn toname(mut self, name: impl Into<String>) -> Self {
        self.toname = Some(name.into());
        self
    }

    /// Sets the sender display name.
    #[must_use]
    pub fn fromname(mut self, name: impl Into<String>) -> Self {
        self.fromname = Some(name.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Adds a CC recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<String>) -> Self {
        self.cc.get_or_insert_with(Vec::new).push(recipient.into());
        self
    }

    /// Adds a BCC recipient.
    #[must_use]
    pub fn bcc(mut self, recipient: impl Into<String>) -> Self {
        self.bcc.get_or_insert_with(Vec::new).push(recipient.into());
        self
    }

    /// Sets the requested charset.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Sets whether the plain text body is wrapped.
    #[must_use]
    pub const fn wrap(mut self, wrap: bool) -> Self {
        self.wrap = Some(wrap);
        self
    }

    /// Appends an extra header. Repeated names are kept.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }
}

/// Input to [`Mailer::send`](crate::Mailer::send).
#[derive(Debug, Clone)]
pub enum SendRequest {
    /// Structured fields to be negotiated, encoded and built.
    Structured(MailRequest),
    /// An already complete message, sent as is.
    Prebuilt(Message),
}

impl From<MailRequest> for SendRequest {
    fn from(request: MailRequest) -> Self {
        Self::Structured(request)
    }
}

impl From<Message> for SendRequest {
    fn from(message: Message) -> Self {
        Self::Prebuilt(message)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods() {
        let request = MailRequest::new("a@x.com", "noreply@example.com", "Hi", "Body")
            .toname("Al")
            .cc("c@z.com")
            .cc("d@w.com")
            .wrap(true)
            .header("X-Tag", "one")
            .header("X-Tag", "two");

        assert_eq!(request.toname.as_deref(), Some("Al"));
        assert_eq!(request.cc, Some(vec!["c@z.com".to_string(), "d@w.com".to_string()]));
        assert!(request.bcc.is_none());
        assert_eq!(request.wrap, Some(true));
        assert_eq!(request.headers.get_all("x-tag"), ["one", "two"]);
    }

    #[test]
    fn test_deserialize_defaults() {
        let request: MailRequest = serde_json::from_str(
            r#"{"to": "a@x.com", "from": "b@y.com", "subject": "Hi", "body": "Hello"}"#,
        )
        .unwrap();

        assert_eq!(request, MailRequest::new("a@x.com", "b@y.com", "Hi", "Hello"));
    }

    #[test]
    fn test_deserialize_headers() {
        let request: MailRequest = serde_json::from_str(
            r#"{"to": "a@x.com", "from": "b@y.com", "subject": "Hi", "body": "Hello",
                "headers": [["X-Tag", "one"], ["X-Tag", "two"]]}"#,
        )
        .unwrap();

        assert_eq!(request.headers.len(), 2);
    }

    #[test]
    fn test_deserialize_missing_required() {
        let result: serde_json::Result<MailRequest> =
            serde_json::from_str(r#"{"to": "a@x.com", "subject": "Hi", "body": "Hello"}"#);
        assert!(result.is_err());
    }
}
