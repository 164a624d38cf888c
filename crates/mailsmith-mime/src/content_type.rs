//! `Content-Type` values.

use crate::error::{Error, Result};
use std::fmt;

/// RFC 2045 `tspecials`; parameter values containing any of these are quoted.
const TSPECIALS: &str = "()<>@,;:\\\"/[]?=";

/// A media type with its parameters, e.g. `text/plain; charset=utf-8`.
///
/// Type, subtype and parameter names are stored lowercased. Parameters keep
/// the order they were added in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Top-level type, e.g. `text` or `multipart`.
    pub main_type: String,
    /// Subtype, e.g. `plain`, `html` or `alternative`.
    pub sub_type: String,
    /// `(name, value)` pairs.
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a media type without parameters.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into().to_ascii_lowercase(),
            sub_type: sub_type.into().to_ascii_lowercase(),
            parameters: Vec::new(),
        }
    }

    /// `text/plain` in `charset`.
    #[must_use]
    pub fn text_plain(charset: &str) -> Self {
        Self::new("text", "plain").with_parameter("charset", charset)
    }

    /// `text/html` in `charset`.
    #[must_use]
    pub fn text_html(charset: &str) -> Self {
        Self::new("text", "html").with_parameter("charset", charset)
    }

    /// `multipart/alternative` delimited by `boundary`.
    #[must_use]
    pub fn multipart_alternative(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "alternative").with_parameter("boundary", boundary)
    }

    /// Sets a parameter. An existing parameter of the same name keeps its
    /// position and takes the new value.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        if let Some(slot) = self.parameters.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.parameters.push((name, value));
        }
        self
    }

    /// Looks up a parameter by name, ignoring case.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find_map(|(n, v)| n.eq_ignore_ascii_case(name).then_some(v.as_str()))
    }

    /// The `charset` parameter.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// The `boundary` parameter.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }

    /// `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// True for `multipart/*`.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// True for `text/*`.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type == "text"
    }

    /// Parses a header value such as `multipart/alternative; boundary="=_x"`.
    ///
    /// Quoted parameter values may contain `;` and backslash escapes.
    /// Parameters without `=` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContentType`] if the type or subtype is missing.
    pub fn parse(value: &str) -> Result<Self> {
        let mut segments = split_unquoted(value, ';').into_iter();
        let essence = segments.next().unwrap_or_default();

        let (main_type, sub_type) = essence
            .split_once('/')
            .map(|(m, s)| (m.trim(), s.trim()))
            .filter(|(m, s)| !m.is_empty() && !s.is_empty())
            .ok_or_else(|| Error::InvalidContentType(value.to_string()))?;

        Ok(segments
            .filter_map(|segment| segment.split_once('='))
            .fold(Self::new(main_type, sub_type), |content_type, (name, raw)| {
                content_type.with_parameter(name.trim(), unquote(raw.trim()))
            }))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;

        for (name, value) in &self.parameters {
            let needs_quotes = value.is_empty()
                || value
                    .chars()
                    .any(|c| c.is_ascii_whitespace() || c.is_ascii_control() || TSPECIALS.contains(c));
            if needs_quotes {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "; {name}=\"{escaped}\"")?;
            } else {
                write!(f, "; {name}={value}")?;
            }
        }

        Ok(())
    }
}

/// Splits on `separator` outside double quotes.
fn split_unquoted(value: &str, separator: char) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            c if c == separator && !quoted => {
                segments.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    segments.push(&value[start..]);
    segments
}

/// Strips surrounding quotes and backslash escapes.
fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            result.extend(chars.next());
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let plain = ContentType::text_plain("iso-8859-1");
        assert_eq!(plain.essence(), "text/plain");
        assert_eq!(plain.charset(), Some("iso-8859-1"));
        assert!(plain.is_text());

        let alternative = ContentType::multipart_alternative("=_mailsmith_abc");
        assert_eq!(alternative.essence(), "multipart/alternative");
        assert_eq!(alternative.boundary(), Some("=_mailsmith_abc"));
        assert!(alternative.is_multipart());
    }

    #[test]
    fn test_names_lowercased() {
        let ct = ContentType::parse("Text/HTML; CharSet=UTF-8").unwrap();
        assert_eq!(ct.essence(), "text/html");
        assert_eq!(ct.parameters, [("charset".to_string(), "UTF-8".to_string())]);
    }

    #[test]
    fn test_parse_quoted_boundary_with_separator() {
        let ct = ContentType::parse("multipart/alternative; boundary=\"a;b \\\"c\\\"\"; x=1")
            .unwrap();
        assert_eq!(ct.boundary(), Some("a;b \"c\""));
        assert_eq!(ct.parameter("x"), Some("1"));
    }

    #[test]
    fn test_parse_ignores_bare_parameters() {
        let ct = ContentType::parse("text/plain; flowed; charset=us-ascii;").unwrap();
        assert_eq!(ct.parameters.len(), 1);
        assert_eq!(ct.charset(), Some("us-ascii"));
    }

    #[test]
    fn test_parse_invalid() {
        for value in ["", "text", "/plain", "text/", " ; charset=utf-8"] {
            assert!(
                matches!(ContentType::parse(value), Err(Error::InvalidContentType(_))),
                "{value:?}"
            );
        }
    }

    #[test]
    fn test_display_quotes_when_needed() {
        assert_eq!(
            ContentType::text_plain("utf-8").to_string(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            ContentType::multipart_alternative("=_abc").to_string(),
            "multipart/alternative; boundary=\"=_abc\""
        );
        assert_eq!(
            ContentType::new("text", "plain")
                .with_parameter("name", "say \"hi\"")
                .to_string(),
            "text/plain; name=\"say \\\"hi\\\"\""
        );
    }

    #[test]
    fn test_display_then_parse() {
        let ct = ContentType::multipart_alternative("=_a b;c").with_parameter("x", "");
        assert_eq!(ContentType::parse(&ct.to_string()).unwrap(), ct);
    }

    #[test]
    fn test_with_parameter_replaces_in_place() {
        let ct = ContentType::text_plain("utf-8")
            .with_parameter("format", "flowed")
            .with_parameter("Charset", "iso-8859-1");

        assert_eq!(
            ct.parameters,
            [
                ("charset".to_string(), "iso-8859-1".to_string()),
                ("format".to_string(), "flowed".to_string()),
            ]
        );
    }
}
