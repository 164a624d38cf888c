//! Email address types.
//!
//! Parsing here is syntactic extraction only: it pulls addresses out of
//! `To`/`Cc`/`Bcc`-style header values without judging deliverability.

use crate::error::{Error, Result};

/// Characters stripped from display names before they reach a header.
const DISPLAY_NAME_STRIPPED: &[char] = &['\n', '\r', '\t', '"', '<', '>'];

/// Removes characters that could break out of a quoted display name.
#[must_use]
pub fn sanitize_display_name(name: &str) -> String {
    name.chars()
        .filter(|c| !DISPLAY_NAME_STRIPPED.contains(c))
        .collect()
}

/// Mailbox (optional display name + address).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address.
    pub address: String,
}

impl Mailbox {
    /// Creates a new mailbox with just an address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    /// Creates a new mailbox with a display name and address.
    #[must_use]
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: address.into(),
        }
    }

    /// Formats the mailbox for a header value.
    ///
    /// The display name is sanitized first. A non-empty name gives
    /// `"name" <address>`, otherwise the bare address is used. Backslashes
    /// in the name are escaped so the quoted string stays closed.
    #[must_use]
    pub fn header_value(&self) -> String {
        let name = self
            .name
            .as_deref()
            .map(sanitize_display_name)
            .unwrap_or_default();

        if name.is_empty() {
            self.address.clone()
        } else {
            format!("\"{}\" <{}>", name.replace('\\', "\\\\"), self.address)
        }
    }

    /// Parses an address-list header value.
    ///
    /// Accepts comma-separated `name <addr>` and bare-address entries,
    /// quoted display names, comments and groups. Entries with no
    /// address are skipped.
    #[must_use]
    pub fn parse_list(value: &str) -> Vec<Self> {
        let mut parser = ListParser::default();
        let mut chars = value.chars();

        while let Some(c) = chars.next() {
            match c {
                '"' => parser.quoted(&mut chars),
                '(' => skip_comment(&mut chars),
                '<' => {
                    let angle: String = chars.by_ref().take_while(|&a| a != '>').collect();
                    parser.angle = Some(angle);
                }
                ',' | ';' => parser.finish_entry(),
                // Group label ("undisclosed-recipients:")
                ':' if parser.angle.is_none() => parser.phrase.clear(),
                _ => parser.phrase.push(c),
            }
        }
        parser.finish_entry();

        parser.mailboxes
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.header_value())
    }
}

#[derive(Default)]
struct ListParser {
    mailboxes: Vec<Mailbox>,
    phrase: String,
    angle: Option<String>,
}

impl ListParser {
    fn quoted(&mut self, chars: &mut std::str::Chars<'_>) {
        while let Some(q) = chars.next() {
            match q {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        self.phrase.push(escaped);
                    }
                }
                '"' => break,
                _ => self.phrase.push(q),
            }
        }
    }

    fn finish_entry(&mut self) {
        let phrase = self.phrase.split_whitespace().collect::<Vec<_>>().join(" ");
        self.phrase.clear();

        let mailbox = match self.angle.take() {
            Some(angle) => {
                // Drop obsolete source routes: "<@relay:user@host>"
                let address = angle.rsplit(':').next().unwrap_or(&angle).trim();
                let name = (!phrase.is_empty()).then_some(phrase);
                Mailbox {
                    name,
                    address: address.to_string(),
                }
            }
            None => Mailbox::new(phrase.replace(' ', "")),
        };

        if !mailbox.address.is_empty() {
            self.mailboxes.push(mailbox);
        }
    }
}

fn skip_comment(chars: &mut std::str::Chars<'_>) {
    let mut depth = 1;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
            _ => {}
        }
    }
}

/// Extracts the address portion of a single-mailbox header value.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] if the value holds no address.
pub fn parse_address(value: &str) -> Result<String> {
    Mailbox::parse_list(value)
        .into_iter()
        .next()
        .map(|mailbox| mailbox.address)
        .ok_or_else(|| Error::InvalidAddress(value.to_string()))
}

/// Sharding key for single-recipient messages: `domain@local-part`,
/// lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoutingHint(String);

impl RoutingHint {
    /// Computes the hint for an address of the form `local-part@domain`.
    ///
    /// The split happens at the last `@`. Returns `None` when either side
    /// is empty or there is no `@`.
    #[must_use]
    pub fn for_address(address: &str) -> Option<Self> {
        let (local, domain) = address.trim().rsplit_once('@')?;
        if local.is_empty() || domain.is_empty() {
            return None;
        }
        Some(Self(format!(
            "{}@{}",
            domain.to_lowercase(),
            local.to_lowercase()
        )))
    }

    /// Returns the hint as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoutingHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
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

    fn addresses(value: &str) -> Vec<String> {
        Mailbox::parse_list(value)
            .into_iter()
            .map(|m| m.address)
            .collect()
    }

    #[test]
    fn test_sanitize_display_name() {
        assert_eq!(sanitize_display_name("Eve\"\nEvil"), "EveEvil");
        assert_eq!(sanitize_display_name("<Bob>\t\"Smith\"\r"), "BobSmith");
        assert_eq!(sanitize_display_name("Plain Name"), "Plain Name");
    }

    #[test]
    fn test_header_value_with_name() {
        let mailbox = Mailbox::with_name("John Doe", "john@example.com");
        assert_eq!(mailbox.header_value(), "\"John Doe\" <john@example.com>");
    }

    #[test]
    fn test_header_value_sanitizes_name() {
        let mailbox = Mailbox::with_name("Eve\"\nEvil", "eve@example.com");
        let value = mailbox.header_value();
        assert_eq!(value, "\"EveEvil\" <eve@example.com>");
        assert!(!value.contains('\n'));
        assert_eq!(value.matches('"').count(), 2);
    }

    #[test]
    fn test_header_value_escapes_backslash() {
        let value = Mailbox::with_name("Admin\\", "noreply@example.com").header_value();
        assert_eq!(value, "\"Admin\\\\\" <noreply@example.com>");

        let parsed = Mailbox::parse_list(&value);
        assert_eq!(parsed, [Mailbox::with_name("Admin\\", "noreply@example.com")]);
        assert_eq!(parse_address(&value).unwrap(), "noreply@example.com");
    }

    #[test]
    fn test_header_value_empty_name_is_bare() {
        assert_eq!(Mailbox::new("a@x.com").header_value(), "a@x.com");
        assert_eq!(Mailbox::with_name("\"<>", "a@x.com").header_value(), "a@x.com");
    }

    #[test]
    fn test_parse_list_bare_and_named() {
        let list = Mailbox::parse_list("a@x.com, Bob <b@y.com>, \"Smith, Carol\" <c@z.com>");
        assert_eq!(list.len(), 3);
        assert_eq!(list[0], Mailbox::new("a@x.com"));
        assert_eq!(list[1], Mailbox::with_name("Bob", "b@y.com"));
        assert_eq!(list[2], Mailbox::with_name("Smith, Carol", "c@z.com"));
    }

    #[test]
    fn test_parse_list_encoded_name() {
        let list = Mailbox::parse_list("\"=?utf-8?B?SMOpbGxv?=\" <h@example.com>");
        assert_eq!(addresses("\"=?utf-8?B?SMOpbGxv?=\" <h@example.com>"), ["h@example.com"]);
        assert_eq!(list[0].name.as_deref(), Some("=?utf-8?B?SMOpbGxv?="));
    }

    #[test]
    fn test_parse_list_comments_and_groups() {
        assert_eq!(addresses("a@x.com (Alice), b@y.com"), ["a@x.com", "b@y.com"]);
        assert_eq!(addresses("team: a@x.com, b@y.com;"), ["a@x.com", "b@y.com"]);
        assert_eq!(addresses("<@relay.example:c@z.com>"), ["c@z.com"]);
    }

    #[test]
    fn test_parse_list_skips_empty_entries() {
        assert!(addresses("").is_empty());
        assert!(addresses(" , ,").is_empty());
        assert!(addresses("undisclosed-recipients:;").is_empty());
    }

    #[test]
    fn test_parse_list_keeps_malformed_addresses() {
        assert_eq!(addresses("not-an-address"), ["not-an-address"]);
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("\"Site\" <noreply@example.com>").unwrap(), "noreply@example.com");
        assert!(matches!(parse_address("  "), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_routing_hint() {
        let hint = RoutingHint::for_address("a@x.com").unwrap();
        assert_eq!(hint.as_str(), "x.com@a");

        let hint = RoutingHint::for_address("John.Doe@Example.COM").unwrap();
        assert_eq!(hint.to_string(), "example.com@john.doe");
    }

    #[test]
    fn test_routing_hint_malformed() {
        assert!(RoutingHint::for_address("no-at-sign").is_none());
        assert!(RoutingHint::for_address("@x.com").is_none());
        assert!(RoutingHint::for_address("a@").is_none());
    }
}
