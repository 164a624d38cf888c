//! MIME header handling.

use crate::encoding::decode_rfc2047;
use crate::error::{Error, Result};
use std::fmt;

/// Ordered collection of email headers.
///
/// Names keep the case they were added with and are compared
/// case-insensitively. Repeated names are allowed and keep their order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    /// An empty header block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value, keeping any existing values.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Replaces every value of `name` with `value`.
    ///
    /// The header keeps the position of its first occurrence.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.position(&name) {
            Some(index) => {
                self.headers[index].1 = value;
                let mut seen = 0;
                self.headers.retain(|(n, _)| {
                    if n.eq_ignore_ascii_case(&name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.headers.push((name, value)),
        }
    }

    /// First value of `name`, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.headers[i].1.as_str())
    }

    /// Every value of `name`, in order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Drops every value of `name`.
    pub fn remove(&mut self, name: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Appends every header from `other`, after the existing ones.
    pub fn extend(&mut self, other: &Self) {
        self.headers.extend(other.headers.iter().cloned());
    }

    /// Returns the number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns an iterator over all headers in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Parses a header block, stopping at the first empty line.
    ///
    /// Folded lines (starting with a space or tab) are unfolded into the
    /// previous field, joined by a single space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] for a line that is neither a
    /// `Name: value` field nor a continuation.
    pub fn parse(text: &str) -> Result<Self> {
        let mut headers = Self::new();

        for line in text.lines().take_while(|line| !line.is_empty()) {
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = headers.headers.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::InvalidHeader(line.to_string()))?;
            headers.add(name.trim(), value.trim());
        }

        Ok(headers)
    }

    /// Decodes RFC 2047 encoded-words in `value`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown charset or a malformed encoded-word.
    pub fn decode_value(value: &str) -> Result<String> {
        decode_rfc2047(value)
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.add(name, value);
        }
        headers
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            write!(f, "{name}: {value}\r\n")?;
        }

        Ok(())
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

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.add("Reply-To", "support@example.com");
        assert_eq!(headers.get("reply-to"), Some("support@example.com"));
        assert_eq!(headers.get("REPLY-TO"), Some("support@example.com"));
        assert!(headers.get("Sender").is_none());
    }

    #[test]
    fn test_headers_keep_insertion_order() {
        let mut headers = Headers::new();
        headers.add("X-Tag", "first");
        headers.add("From", "a@example.com");
        headers.add("X-Tag", "second");

        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["X-Tag", "From", "X-Tag"]);
        assert_eq!(headers.get_all("x-tag"), ["first", "second"]);
    }

    #[test]
    fn test_headers_set() {
        let mut headers = Headers::new();
        headers.add("To", "ana@lists.example.org");
        headers.add("Subject", "Hi");
        headers.add("To", "ben@lists.example.org");
        assert_eq!(headers.get_all("To").len(), 2);

        headers.set("To", "cleo@lists.example.org");
        assert_eq!(headers.get_all("To"), ["cleo@lists.example.org"]);
        assert_eq!(headers.iter().next(), Some(("To", "cleo@lists.example.org")));
    }

    #[test]
    fn test_remove_drops_every_value() {
        let mut headers: Headers = [("Cc", "a@x.com"), ("Subject", "Hi"), ("cc", "b@y.com")]
            .into_iter()
            .collect();

        headers.remove("CC");
        assert_eq!(headers.len(), 1);
        assert!(headers.get_all("Cc").is_empty());
    }

    #[test]
    fn test_parse_unfolds_continuations() {
        let text = concat!(
            "Subject: =?utf-8?B?w6k=?=\r\n",
            "\t=?utf-8?B?w6k=?=\r\n",
            "Cc: \r\n",
            "Content-Type: multipart/alternative;\r\n",
            "  boundary=\"=_x\"\r\n",
            "\r\n",
            "Ignored: body text\r\n"
        );

        let headers = Headers::parse(text).unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("Subject"), Some("=?utf-8?B?w6k=?= =?utf-8?B?w6k=?="));
        assert_eq!(headers.get("Cc"), Some(""));
        assert_eq!(
            headers.get("Content-Type"),
            Some("multipart/alternative; boundary=\"=_x\"")
        );
    }

    #[test]
    fn test_parse_rejects_malformed_line() {
        let result = Headers::parse("From: a@x.com\nnot a header\n");
        assert!(matches!(result, Err(Error::InvalidHeader(line)) if line == "not a header"));
    }

    #[test]
    fn test_display_then_parse() {
        let headers: Headers = [("From", "a@x.com"), ("Bcc", ""), ("X-Tag", "1"), ("X-Tag", "2")]
            .into_iter()
            .collect();
        assert_eq!(Headers::parse(&headers.to_string()).unwrap(), headers);
    }

    #[test]
    fn test_display_uses_crlf() {
        let headers: Headers = [("Subject", "Hi"), ("Cc", "")].into_iter().collect();
        assert_eq!(headers.to_string(), "Subject: Hi\r\nCc: \r\n");
    }

    #[test]
    fn test_headers_extend_appends() {
        let mut headers: Headers = [("From", "a@example.com")].into_iter().collect();
        let extra: Headers = [("X-Mailer", "one"), ("X-Mailer", "two")]
            .into_iter()
            .collect();
        headers.extend(&extra);
        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get_all("X-Mailer"), ["one", "two"]);
    }

    #[test]
    fn test_decode_value() {
        assert_eq!(Headers::decode_value("=?utf-8?B?SMOpbGxv?=").unwrap(), "Héllo");
    }
}
