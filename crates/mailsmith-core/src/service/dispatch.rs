//! Handoff of finished messages to the delivery layer.

use crate::error::Result;
use mailsmith_mime::Message;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Everything the delivery layer needs to transmit one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Envelope sender (return path).
    pub envelope_from: String,
    /// Recipients: To, then Cc, then Bcc.
    pub recipients: Vec<String>,
    /// Serialized message.
    pub payload: Vec<u8>,
    /// Sharding key, present only for single-recipient messages.
    pub routing_hint: Option<String>,
}

impl Envelope {
    /// Extracts the envelope data from a message and serializes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the From header is missing or holds no address.
    pub fn from_message(message: &Message) -> Result<Self> {
        Ok(Self {
            envelope_from: message.envelope_from()?,
            recipients: message.recipients(),
            payload: message.to_bytes(),
            routing_hint: message.routing_hint().map(|hint| hint.to_string()),
        })
    }
}

/// Accepts finished messages for asynchronous delivery.
///
/// Implementations must not block on transmission.
pub trait Dispatcher: Send + Sync {
    /// Enqueues an envelope. Returns false if it was not accepted.
    fn enqueue(&self, envelope: Envelope) -> bool;
}

impl<D: Dispatcher + ?Sized> Dispatcher for std::sync::Arc<D> {
    fn enqueue(&self, envelope: Envelope) -> bool {
        (**self).enqueue(envelope)
    }
}

/// Dispatcher backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::UnboundedSender<Envelope>,
}

impl ChannelDispatcher {
    /// Creates a dispatcher and the receiver its envelopes arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Dispatcher for ChannelDispatcher {
    fn enqueue(&self, envelope: Envelope) -> bool {
        self.sender.send(envelope).is_ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mailsmith_mime::MessageBuilder;

    fn message(to: &str) -> Message {
        MessageBuilder::new()
            .from("\"Site\" <noreply@example.com>")
            .to(to)
            .subject("Hi")
            .text_body(b"Hello".to_vec())
            .build()
            .unwrap()
    }

    #[test]
    fn test_envelope_from_message() {
        let message = message("A@X.com");
        let envelope = Envelope::from_message(&message).unwrap();

        assert_eq!(envelope.envelope_from, "noreply@example.com");
        assert_eq!(envelope.recipients, ["A@X.com"]);
        assert_eq!(envelope.routing_hint.as_deref(), Some("x.com@a"));
        assert_eq!(envelope.payload, message.to_bytes());
    }

    #[tokio::test]
    async fn test_channel_dispatcher_delivers() {
        let (dispatcher, mut receiver) = ChannelDispatcher::new();
        let envelope = Envelope::from_message(&message("a@x.com")).unwrap();

        assert!(dispatcher.enqueue(envelope.clone()));
        assert_eq!(receiver.recv().await, Some(envelope));
    }

    #[tokio::test]
    async fn test_channel_dispatcher_rejects_when_closed() {
        let (dispatcher, receiver) = ChannelDispatcher::new();
        drop(receiver);

        let envelope = Envelope::from_message(&message("a@x.com")).unwrap();
        assert!(!dispatcher.enqueue(envelope));
    }
}
