//! End-to-end tests for the send pipeline.
//!
//! A recording dispatcher captures envelopes so the serialized payload can
//! be parsed back and inspected.

#![allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mailsmith_core::service::TelemetryError;
use mailsmith_core::{
    ChannelDispatcher, Dispatcher, Envelope, FormattedMailComposer, HtmlSanitizer, MailRequest,
    Mailer, MarkdownRenderer, MessageCatalog, SiteConfig, Telemetry,
};
use mailsmith_mime::encoding::decode_rfc2047;
use mailsmith_mime::{Message, MessageBuilder};

#[derive(Default)]
struct RecordingDispatcher {
    envelopes: Mutex<Vec<Envelope>>,
    reject: bool,
}

impl RecordingDispatcher {
    fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    fn last(&self) -> Envelope {
        self.envelopes.lock().unwrap().last().cloned().unwrap()
    }

    fn count(&self) -> usize {
        self.envelopes.lock().unwrap().len()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn enqueue(&self, envelope: Envelope) -> bool {
        if self.reject {
            return false;
        }
        self.envelopes.lock().unwrap().push(envelope);
        true
    }
}

#[derive(Default)]
struct CountingTelemetry {
    calls: AtomicUsize,
    fail: bool,
}

impl Telemetry for CountingTelemetry {
    fn increment(&self, counter: &str, caller: &str) -> Result<(), TelemetryError> {
        assert_eq!(counter, "mail.sent");
        assert_eq!(caller, "signup");
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err("statsd unreachable".into());
        }
        Ok(())
    }
}

struct Paragraphs;

impl MarkdownRenderer for Paragraphs {
    fn render(&self, text: &str) -> String {
        text.split("\n\n").map(|p| format!("<p>{p}</p>\n")).collect()
    }
}

struct Identity;

impl HtmlSanitizer for Identity {
    fn sanitize(&self, html: &str) -> String {
        html.to_string()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config() -> SiteConfig {
    SiteConfig::new("Example", "https://example.com")
}

fn mailer() -> (Mailer<Arc<RecordingDispatcher>>, Arc<RecordingDispatcher>) {
    init_tracing();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    (Mailer::new(config(), Arc::clone(&dispatcher)), dispatcher)
}

fn request() -> MailRequest {
    MailRequest::new("a@x.com", "noreply@example.com", "Welcome", "Hello there")
}

fn sent(dispatcher: &RecordingDispatcher) -> Message {
    Message::parse(&dispatcher.last().payload).unwrap()
}

#[test]
fn test_ascii_content_is_us_ascii_whatever_was_requested() {
    let (mailer, dispatcher) = mailer();
    let request = request()
        .fromname("Example Team")
        .html("<p>Hello there</p>")
        .charset("iso-8859-1");

    assert!(mailer.send(request, "signup").unwrap());

    let message = sent(&dispatcher);
    assert!(message.parts.iter().all(|p| p.charset() == Some("us-ascii")));
}

#[test]
fn test_non_ascii_content_transcoded_to_requested_charset() {
    let (mailer, dispatcher) = mailer();
    let request = MailRequest::new("a@x.com", "noreply@example.com", "Grüße", "Schöne Grüße")
        .fromname("Jürgen")
        .html("<p>Schöne Grüße</p>")
        .charset("iso-8859-1");

    assert!(mailer.send(request, "signup").unwrap());

    let message = sent(&dispatcher);
    let text = message.text_part().unwrap();
    let html = message.html_part().unwrap();
    assert_eq!(text.charset(), Some("iso-8859-1"));
    assert_eq!(html.charset(), Some("iso-8859-1"));
    assert_eq!(text.body, b"Sch\xf6ne Gr\xfc\xdfe\r\n");
    assert_eq!(html.body_text().unwrap(), "<p>Schöne Grüße</p>");

    let subject = message.subject().unwrap();
    assert!(subject.starts_with("=?iso-8859-1?B?"));
    assert_eq!(decode_rfc2047(subject).unwrap(), "Grüße");

    let from = message.from().unwrap();
    assert!(from.starts_with("\"=?iso-8859-1?B?"));
    assert!(from.ends_with("\" <noreply@example.com>"));
}

#[test]
fn test_utf8_subject_round_trips() {
    let (mailer, dispatcher) = mailer();
    let subject = "Ünïcödé subject that is long enough to need more than one encoded word ✓";
    let request = MailRequest::new("a@x.com", "noreply@example.com", subject, "Body");

    assert!(mailer.send(request, "signup").unwrap());

    let message = sent(&dispatcher);
    let encoded = message.subject().unwrap();
    assert!(encoded.split(' ').all(|word| word.len() <= 75));
    assert_eq!(decode_rfc2047(encoded).unwrap(), subject);
}

#[test]
fn test_unmappable_content_fails_the_send() {
    let (mailer, dispatcher) = mailer();
    let request = MailRequest::new("a@x.com", "noreply@example.com", "Hi", "こんにちは")
        .charset("iso-8859-1");

    let err = mailer.send(request, "signup").unwrap_err();
    assert!(err.is_encoding_error());
    assert_eq!(dispatcher.count(), 0);
}

#[test]
fn test_unknown_charset_fails_the_send() {
    let (mailer, _dispatcher) = mailer();
    let request = MailRequest::new("a@x.com", "noreply@example.com", "Hi", "Grüße")
        .charset("no-such-charset");

    assert!(mailer.send(request, "signup").unwrap_err().is_encoding_error());
}

#[test]
fn test_single_recipient_routing_hint() {
    let (mailer, dispatcher) = mailer();

    assert!(mailer.send(request(), "signup").unwrap());

    let envelope = dispatcher.last();
    assert_eq!(envelope.envelope_from, "noreply@example.com");
    assert_eq!(envelope.recipients, ["a@x.com"]);
    assert_eq!(envelope.routing_hint.as_deref(), Some("x.com@a"));
}

#[test]
fn test_multiple_recipients_have_no_routing_hint() {
    let (mailer, dispatcher) = mailer();
    let request = request().toname("Al").cc("b@y.com").bcc("c@z.com");

    assert!(mailer.send(request, "signup").unwrap());

    let envelope = dispatcher.last();
    assert_eq!(envelope.recipients, ["a@x.com", "b@y.com", "c@z.com"]);
    assert!(envelope.routing_hint.is_none());
}

#[test]
fn test_zero_recipients_still_sent() {
    let (mailer, dispatcher) = mailer();
    let message = MessageBuilder::new()
        .from("noreply@example.com")
        .to("")
        .subject("Nobody")
        .text_body(b"Hello".to_vec())
        .build()
        .unwrap();

    assert!(mailer.send(message, "signup").unwrap());

    let envelope = dispatcher.last();
    assert!(envelope.recipients.is_empty());
    assert!(envelope.routing_hint.is_none());
}

#[test]
fn test_malformed_single_recipient_skips_hint() {
    let (mailer, dispatcher) = mailer();
    let mut request = request();
    request.to = "not-an-address".to_string();

    assert!(mailer.send(request, "signup").unwrap());
    assert!(dispatcher.last().routing_hint.is_none());
}

#[test]
fn test_display_names_sanitized() {
    let (mailer, dispatcher) = mailer();
    let request = request().fromname("Eve\"\nEvil").toname("<Mallory>\t");

    assert!(mailer.send(request, "signup").unwrap());

    let message = sent(&dispatcher);
    assert_eq!(message.from(), Some("\"EveEvil\" <noreply@example.com>"));
    assert_eq!(message.to(), Some("\"Mallory\" <a@x.com>"));

    let payload = String::from_utf8(dispatcher.last().payload).unwrap();
    let from_line = payload.lines().find(|l| l.starts_with("From:")).unwrap();
    assert_eq!(from_line.matches('"').count(), 2);
}

#[test]
fn test_name_sanitized_to_empty_uses_bare_address() {
    let (mailer, dispatcher) = mailer();

    assert!(mailer.send(request().fromname("\"<>\""), "signup").unwrap());
    assert_eq!(sent(&dispatcher).from(), Some("noreply@example.com"));
}

#[test]
fn test_backslash_in_names_keeps_addresses_intact() {
    let (mailer, dispatcher) = mailer();
    let request = request().fromname("Admin\\").toname("Bob\\");

    assert!(mailer.send(request, "signup").unwrap());

    let envelope = dispatcher.last();
    assert_eq!(envelope.envelope_from, "noreply@example.com");
    assert_eq!(envelope.recipients, ["a@x.com"]);
    assert_eq!(envelope.routing_hint.as_deref(), Some("x.com@a"));
    assert_eq!(sent(&dispatcher).from(), Some("\"Admin\\\\\" <noreply@example.com>"));
}

#[test]
fn test_line_break_in_subject_fails_send() {
    let (mailer, dispatcher) = mailer();
    let mut request = request();
    request.subject = "Hi\r\nBcc: evil@attacker.example".to_string();

    let err = mailer.send(request, "signup").unwrap_err();
    assert!(matches!(
        err,
        mailsmith_core::Error::Mime(mailsmith_mime::Error::InvalidHeader(_))
    ));
    assert!(!err.is_encoding_error());
    assert_eq!(dispatcher.count(), 0);
}

#[test]
fn test_line_break_in_extra_header_fails_send() {
    let (mailer, dispatcher) = mailer();
    let request = request().header("X-Mailer-Tag", "one\nBcc: evil@attacker.example");

    assert!(mailer.send(request, "signup").is_err());
    assert_eq!(dispatcher.count(), 0);
}

#[test]
fn test_html_gives_two_parts() {
    let (mailer, dispatcher) = mailer();

    assert!(mailer.send(request().html("<p>Hello there</p>"), "signup").unwrap());

    let message = sent(&dispatcher);
    assert!(message.is_multipart());
    assert_eq!(message.parts.len(), 2);
    assert_eq!(message.parts[0].content_type.essence(), "text/plain");
    assert_eq!(message.parts[1].content_type.essence(), "text/html");
    assert_eq!(message.parts[0].body, b"Hello there\r\n");
}

#[test]
fn test_no_html_gives_one_part() {
    let (mailer, dispatcher) = mailer();

    assert!(mailer.send(request(), "signup").unwrap());

    let message = sent(&dispatcher);
    assert!(!message.is_multipart());
    assert_eq!(message.parts.len(), 1);
    assert_eq!(message.parts[0].content_type.essence(), "text/plain");
}

#[test]
fn test_header_order_and_extra_headers() {
    let (mailer, dispatcher) = mailer();
    let request = request()
        .header("X-Mailer-Tag", "one")
        .header("Reply-To", "support@example.com")
        .header("X-Mailer-Tag", "two");

    assert!(mailer.send(request, "signup").unwrap());

    let message = sent(&dispatcher);
    let names: Vec<&str> = message.headers.iter().map(|(name, _)| name).collect();
    assert_eq!(
        names,
        ["From", "To", "Cc", "Bcc", "Subject", "Date", "X-Mailer-Tag", "Reply-To", "X-Mailer-Tag"]
    );
    assert_eq!(message.headers.get("Cc"), Some(""));
    assert_eq!(message.headers.get_all("X-Mailer-Tag"), ["one", "two"]);
}

#[test]
fn test_wire_form_uses_crlf() {
    let (mailer, dispatcher) = mailer();

    assert!(mailer.send(request().html("<p>Hi</p>"), "signup").unwrap());

    let payload = dispatcher.last().payload;
    let text = String::from_utf8(payload).unwrap();
    assert!(text.contains("MIME-Version: 1.0\r\n"));
    assert!(text.contains("Content-Transfer-Encoding: quoted-printable\r\n"));
    assert!(!text.replace("\r\n", "").contains('\n'));
}

#[test]
fn test_rejected_enqueue_returns_false() {
    init_tracing();
    let mailer = Mailer::new(config(), RecordingDispatcher::rejecting());

    assert!(!mailer.send(request(), "signup").unwrap());
}

#[test]
fn test_telemetry_counts_sends() {
    let (mailer, _dispatcher) = mailer();
    let telemetry = Arc::new(CountingTelemetry::default());
    let mailer = mailer.with_telemetry(TelemetryHandle(Arc::clone(&telemetry)));

    assert!(mailer.send(request(), "signup").unwrap());
    assert!(mailer.send(request(), "signup").unwrap());
    assert_eq!(telemetry.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_telemetry_failure_is_swallowed() {
    let (mailer, dispatcher) = mailer();
    let mailer = mailer.with_telemetry(CountingTelemetry {
        fail: true,
        ..CountingTelemetry::default()
    });

    assert!(mailer.send(request(), "signup").unwrap());
    assert_eq!(dispatcher.count(), 1);
}

struct PanickingTelemetry;

impl Telemetry for PanickingTelemetry {
    fn increment(&self, _counter: &str, _caller: &str) -> Result<(), TelemetryError> {
        panic!("metrics client crashed")
    }
}

#[test]
fn test_panicking_telemetry_does_not_abort_send() {
    let (mailer, dispatcher) = mailer();
    let mailer = mailer.with_telemetry(PanickingTelemetry);

    assert!(mailer.send(request(), "signup").unwrap());
    assert_eq!(dispatcher.count(), 1);
}

struct TelemetryHandle(Arc<CountingTelemetry>);

impl Telemetry for TelemetryHandle {
    fn increment(&self, counter: &str, caller: &str) -> Result<(), TelemetryError> {
        self.0.increment(counter, caller)
    }
}

#[test]
fn test_formatted_mail_sent_as_alternative() {
    let (mailer, dispatcher) = mailer();
    let catalog = MessageCatalog::new()
        .with_message("mail_greeting", "Hi {user},")
        .with_message("mail_footer", "-- {site_name}");
    let composer = FormattedMailComposer::new(config(), catalog, Paragraphs, Identity);

    let mail = composer.format_mail("Read the [guide](https://example.com/guide).", Some("Pat"));
    assert_eq!(
        mail.plaintext,
        "Hi Pat,\n\nRead the guide (https://example.com/guide).\n\n-- Example"
    );

    let request = mail.into_request("a@x.com", "noreply@example.com", "Welcome");
    assert!(mailer.send(request, "signup").unwrap());

    let message = sent(&dispatcher);
    assert_eq!(
        message.text_part().unwrap().body_text().unwrap(),
        "Hi Pat,\r\n\r\nRead the guide (https://example.com/guide).\r\n\r\n-- Example\r\n"
    );
    assert!(
        message
            .html_part()
            .unwrap()
            .body_text()
            .unwrap()
            .starts_with("<p>Hi Pat,</p>")
    );
}

#[test]
fn test_formatted_mail_without_greeting() {
    let composer = FormattedMailComposer::new(
        config(),
        MessageCatalog::english(),
        Paragraphs,
        Identity,
    );

    let mail = composer.format_mail("Hello", None);
    assert_eq!(
        mail.plaintext,
        "Hello\n\n--\nThis message was sent by Example (https://example.com)."
    );
}

#[tokio::test]
async fn test_channel_dispatcher_receives_envelope() {
    init_tracing();
    let (dispatcher, mut receiver) = ChannelDispatcher::new();
    let mailer = Mailer::new(config(), dispatcher);

    assert!(mailer.send(request(), "signup").unwrap());

    let envelope = receiver.recv().await.unwrap();
    assert_eq!(envelope.recipients, ["a@x.com"]);
    let message = Message::parse(&envelope.payload).unwrap();
    assert_eq!(message.subject(), Some("Welcome"));
}
