//! SMTP envelope data extracted from a built message.

use crate::address::{Mailbox, RoutingHint, parse_address};
use crate::error::{Error, Result};
use crate::message::Message;

/// Headers whose addresses receive the message, in expansion order.
const RECIPIENT_HEADERS: [&str; 3] = ["To", "Cc", "Bcc"];

impl Message {
    /// Returns the envelope sender: the address part of the From header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingHeader`] if there is no From header, or
    /// [`Error::InvalidAddress`] if it holds no address.
    pub fn envelope_from(&self) -> Result<String> {
        let from = self
            .from()
            .ok_or_else(|| Error::MissingHeader("From".to_string()))?;
        parse_address(from)
    }

    /// Returns every envelope recipient from To, Cc and Bcc, in header order.
    ///
    /// Repeated headers are all expanded. Addresses are not validated or
    /// deduplicated.
    #[must_use]
    pub fn recipients(&self) -> Vec<String> {
        RECIPIENT_HEADERS
            .iter()
            .flat_map(|name| self.headers.get_all(name))
            .flat_map(Mailbox::parse_list)
            .map(|mailbox| mailbox.address)
            .collect()
    }

    /// Returns a routing hint when the message has exactly one recipient.
    ///
    /// A single recipient that is not of the form `local@domain` yields no
    /// hint.
    #[must_use]
    pub fn routing_hint(&self) -> Option<RoutingHint> {
        match self.recipients().as_slice() {
            [recipient] => {
                let hint = RoutingHint::for_address(recipient);
                if hint.is_none() {
                    tracing::debug!(recipient = %recipient, "No routing hint for malformed address");
                }
                hint
            }
            _ => None,
        }
    }
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
    use crate::builder::MessageBuilder;

    fn message(to: &str, cc: &str, bcc: &str) -> Message {
        MessageBuilder::new()
            .from("\"Site Team\" <noreply@example.com>")
            .to(to)
            .cc(cc)
            .bcc(bcc)
            .subject("Hi")
            .text_body(b"Hello".to_vec())
            .build()
            .unwrap()
    }

    #[test]
    fn test_envelope_from() {
        let message = message("a@x.com", "", "");
        assert_eq!(message.envelope_from().unwrap(), "noreply@example.com");
    }

    #[test]
    fn test_envelope_from_missing() {
        let mut message = message("a@x.com", "", "");
        message.headers.remove("From");
        assert!(matches!(
            message.envelope_from(),
            Err(Error::MissingHeader(name)) if name == "From"
        ));
    }

    #[test]
    fn test_recipients_in_header_order() {
        let message = message(
            "\"A\" <a@x.com>, b@y.com",
            "c@z.com",
            "d@w.com",
        );
        assert_eq!(
            message.recipients(),
            ["a@x.com", "b@y.com", "c@z.com", "d@w.com"]
        );
    }

    #[test]
    fn test_recipients_repeated_headers() {
        let mut message = message("a@x.com", "", "");
        message.headers.add("Cc", "e@v.com");
        assert_eq!(message.recipients(), ["a@x.com", "e@v.com"]);
    }

    #[test]
    fn test_routing_hint_single_recipient() {
        let hint = message("\"Al\" <Al@X.com>", "", "").routing_hint().unwrap();
        assert_eq!(hint.as_str(), "x.com@al");
    }

    #[test]
    fn test_routing_hint_multiple_recipients() {
        assert!(message("a@x.com", "b@y.com", "").routing_hint().is_none());
        assert!(message("a@x.com, b@y.com", "", "").routing_hint().is_none());
    }

    #[test]
    fn test_routing_hint_no_recipients() {
        assert!(message("", "", "").routing_hint().is_none());
    }

    #[test]
    fn test_routing_hint_malformed_recipient() {
        assert!(message("not-an-address", "", "").routing_hint().is_none());
    }
}
