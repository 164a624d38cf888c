//! Top-level send pipeline.

use super::dispatch::{Dispatcher, Envelope};
use super::telemetry::{NoopTelemetry, SENT_COUNTER, Telemetry, record};
use crate::config::SiteConfig;
use crate::error::Result;
use crate::request::{MailRequest, SendRequest};
use mailsmith_mime::encoding::encode_rfc2047;
use mailsmith_mime::{
    Charset, DEFAULT_WRAP_WIDTH, Mailbox, Message, MessageBuilder, MessageText, Negotiated,
    sanitize_display_name, wrap_text,
};
use std::borrow::Cow;

/// Turns send requests into messages and hands them to a dispatcher.
///
/// Building is synchronous and touches no shared state, so one mailer can
/// be shared across threads.
#[derive(Debug, Clone)]
pub struct Mailer<D, T = NoopTelemetry> {
    config: SiteConfig,
    dispatcher: D,
    telemetry: T,
}

impl<D: Dispatcher> Mailer<D> {
    /// Creates a mailer without telemetry.
    #[must_use]
    pub const fn new(config: SiteConfig, dispatcher: D) -> Self {
        Self {
            config,
            dispatcher,
            telemetry: NoopTelemetry,
        }
    }
}

impl<D: Dispatcher, T: Telemetry> Mailer<D, T> {
    /// Replaces the telemetry sink.
    #[must_use]
    pub fn with_telemetry<U: Telemetry>(self, telemetry: U) -> Mailer<D, U> {
        Mailer {
            config: self.config,
            dispatcher: self.dispatcher,
            telemetry,
        }
    }

    /// Returns the site configuration.
    #[must_use]
    pub const fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Returns the dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Sends one message.
    ///
    /// Structured requests are built with [`build_message`](Self::build_message);
    /// prebuilt messages are sent as is. Returns whether the dispatcher
    /// accepted the message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be built, including when its
    /// content cannot be transcoded into the requested charset. A rejected
    /// enqueue is `Ok(false)`, not an error.
    pub fn send(&self, request: impl Into<SendRequest>, caller: &str) -> Result<bool> {
        record(&self.telemetry, SENT_COUNTER, caller);

        let message = match request.into() {
            SendRequest::Structured(request) => self.build_message(&request)?,
            SendRequest::Prebuilt(message) => message,
        };

        let envelope = Envelope::from_message(&message)?;
        let recipients = envelope.recipients.len();
        let routing_hint = envelope.routing_hint.clone();

        let accepted = self.dispatcher.enqueue(envelope);
        if accepted {
            tracing::info!(caller, recipients, routing_hint = ?routing_hint, "Message enqueued");
        } else {
            tracing::warn!(caller, recipients, "Dispatcher rejected message");
        }

        Ok(accepted)
    }

    /// Builds the MIME message for a structured request.
    ///
    /// The body is wrapped first if requested. Display names are
    /// sanitized, then the charset is negotiated over subject, bodies and
    /// sender name, and non-ASCII header text is RFC 2047 encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested charset is unknown or cannot
    /// represent the content.
    pub fn build_message(&self, request: &MailRequest) -> Result<Message> {
        let body = if request.wrap.unwrap_or(false) {
            Cow::Owned(wrap_text(&request.body, DEFAULT_WRAP_WIDTH))
        } else {
            Cow::Borrowed(request.body.as_str())
        };
        let fromname = request.fromname.as_deref().map(sanitize_display_name);

        let text = MessageText {
            subject: &request.subject,
            body: &body,
            html: request.html.as_deref(),
            from_name: fromname.as_deref(),
        };
        let requested = request
            .charset
            .as_deref()
            .unwrap_or(&self.config.default_charset);

        let Negotiated {
            charset,
            subject,
            body,
            html,
            from_name,
        } = text.negotiate(Some(requested))?;
        tracing::debug!(requested, charset = %charset, "Negotiated message charset");

        let subject = encode_rfc2047(&subject, &charset)?;
        let from_name = from_name
            .map(|name| encode_rfc2047(&name, &charset))
            .transpose()?;
        let to_name = request
            .toname
            .as_deref()
            .map(|name| encode_recipient_name(&sanitize_display_name(name), &charset))
            .transpose()?;

        let mut builder = MessageBuilder::new()
            .from(mailbox_value(&request.from, from_name))
            .to(mailbox_value(&request.to, to_name))
            .subject(subject)
            .headers(&request.headers);

        if let Some(cc) = &request.cc {
            builder = builder.cc(cc.join(", "));
        }
        if let Some(bcc) = &request.bcc {
            builder = builder.bcc(bcc.join(", "));
        }
        if let Some(html) = html {
            builder = builder.html_body(html.into_owned());
        }

        Ok(builder
            .text_body(body.into_owned())
            .charset(charset)
            .build()?)
    }
}

/// Encodes the recipient display name, which is not part of charset
/// negotiation.
///
/// A non-ASCII name in an otherwise ASCII message is encoded as UTF-8.
fn encode_recipient_name(name: &str, charset: &Charset) -> mailsmith_mime::Result<String> {
    if name.is_ascii() {
        return Ok(name.to_string());
    }

    let charset = if charset.is_us_ascii() {
        Charset::utf8()
    } else {
        charset.clone()
    };
    encode_rfc2047(&charset.encode(name)?, &charset)
}

fn mailbox_value(address: &str, name: Option<String>) -> String {
    let mailbox = match name {
        Some(name) => Mailbox::with_name(name, address),
        None => Mailbox::new(address),
    };
    mailbox.header_value()
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
    use crate::Error;
    use crate::service::dispatch::ChannelDispatcher;

    fn mailer() -> Mailer<ChannelDispatcher> {
        let (dispatcher, _receiver) = ChannelDispatcher::new();
        Mailer::new(SiteConfig::new("Example", "https://example.com"), dispatcher)
    }

    fn request() -> MailRequest {
        MailRequest::new("a@x.com", "noreply@example.com", "Hello", "Plain body")
    }

    #[test]
    fn test_ascii_request_is_us_ascii() {
        let message = mailer()
            .build_message(&request().charset("iso-8859-1"))
            .unwrap();
        assert_eq!(message.parts[0].charset(), Some("us-ascii"));
        assert_eq!(message.subject(), Some("Hello"));
        assert_eq!(message.from(), Some("noreply@example.com"));
    }

    #[test]
    fn test_default_charset_from_config() {
        let (dispatcher, _receiver) = ChannelDispatcher::new();
        let mailer = Mailer::new(
            SiteConfig::new("Example", "https://example.com").with_default_charset("iso-8859-1"),
            dispatcher,
        );
        let mut request = request();
        request.body = "Grüße".to_string();

        let message = mailer.build_message(&request).unwrap();
        assert_eq!(message.parts[0].charset(), Some("iso-8859-1"));
        assert_eq!(message.parts[0].body, b"Gr\xfc\xdfe");
    }

    #[test]
    fn test_names_encoded_and_sanitized() {
        let message = mailer()
            .build_message(&request().fromname("Zoë \"Admin\"").toname("Bob\n<Smith>"))
            .unwrap();
        assert_eq!(
            message.from(),
            Some("\"=?utf-8?B?Wm/DqyBBZG1pbg==?=\" <noreply@example.com>")
        );
        assert_eq!(message.to(), Some("\"BobSmith\" <a@x.com>"));
    }

    #[test]
    fn test_non_ascii_recipient_name_in_ascii_message() {
        let message = mailer().build_message(&request().toname("José")).unwrap();
        assert_eq!(message.parts[0].charset(), Some("us-ascii"));
        assert_eq!(message.to(), Some("\"=?utf-8?B?Sm9zw6k=?=\" <a@x.com>"));
    }

    #[test]
    fn test_wrap_applied_only_when_requested() {
        let long = "word ".repeat(30);
        let unwrapped = mailer().build_message(&request()).unwrap();
        let mut req = request();
        req.body = long.clone();

        let plain = mailer().build_message(&req).unwrap();
        assert!(!plain.parts[0].body.contains(&b'\n'));

        let wrapped = mailer().build_message(&req.wrap(true)).unwrap();
        assert!(wrapped.parts[0].body.contains(&b'\n'));
        assert_eq!(unwrapped.parts[0].body, b"Plain body");
    }

    #[test]
    fn test_unmappable_text_is_encoding_error() {
        let mut req = request().charset("iso-8859-1");
        req.subject = "日本".to_string();

        let err = mailer().build_message(&req).unwrap_err();
        assert!(err.is_encoding_error());
        assert!(matches!(err, Error::Mime(_)));
    }

    #[test]
    fn test_send_returns_false_when_rejected() {
        let mailer = mailer();
        assert!(!mailer.send(request(), "test").unwrap());
    }
}
