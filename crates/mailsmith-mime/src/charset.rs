//! Charset selection and transcoding for outgoing messages.
//!
//! A message carries exactly one charset. When every text field is plain
//! ASCII the message is labelled `us-ascii`, whatever charset the caller
//! asked for. Otherwise the requested charset is used, and for anything
//! other than `utf-8` or `us-ascii` each field is transcoded from UTF-8.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};

use crate::error::{Error, Result};

/// Charset used when the caller does not request one.
pub const DEFAULT_CHARSET: &str = "utf-8";

const US_ASCII: &str = "us-ascii";

/// A negotiated message charset.
///
/// `utf-8` and `us-ascii` are pass-through: Rust strings are already
/// UTF-8, and ASCII is a subset of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    name: String,
    encoding: Option<&'static Encoding>,
}

impl Charset {
    /// The `us-ascii` charset.
    #[must_use]
    pub fn us_ascii() -> Self {
        Self {
            name: US_ASCII.to_string(),
            encoding: None,
        }
    }

    /// The `utf-8` charset.
    #[must_use]
    pub fn utf8() -> Self {
        Self {
            name: DEFAULT_CHARSET.to_string(),
            encoding: None,
        }
    }

    /// Resolves a charset label such as `iso-8859-1` or `Shift_JIS`.
    ///
    /// The label is kept (lowercased) as the name written into headers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCharset`] if the label is not recognized or
    /// names an encoding that cannot be produced (UTF-16, `replacement`).
    pub fn for_label(label: &str) -> Result<Self> {
        let name = label.trim().to_ascii_lowercase();

        if name == US_ASCII || name == "ascii" {
            return Ok(Self {
                name,
                encoding: None,
            });
        }

        let encoding = Encoding::for_label(name.as_bytes())
            .ok_or_else(|| Error::UnknownCharset(label.to_string()))?;

        if encoding == UTF_8 {
            return Ok(Self {
                name,
                encoding: None,
            });
        }

        // encoding_rs encodes UTF-16 and `replacement` as UTF-8.
        if encoding.output_encoding() != encoding {
            return Err(Error::UnknownCharset(label.to_string()));
        }

        Ok(Self {
            name,
            encoding: Some(encoding),
        })
    }

    /// Returns the charset name as written in `charset=` parameters.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if text must be transcoded for this charset.
    #[must_use]
    pub const fn needs_transcoding(&self) -> bool {
        self.encoding.is_some()
    }

    /// Returns true for `us-ascii`.
    #[must_use]
    pub fn is_us_ascii(&self) -> bool {
        self.encoding.is_none() && (self.name == US_ASCII || self.name == "ascii")
    }

    /// Transcodes UTF-8 text into this charset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnmappableText`] if the text contains characters
    /// this charset cannot represent.
    pub fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>> {
        let Some(encoding) = self.encoding else {
            return Ok(Cow::Borrowed(text.as_bytes()));
        };

        let (bytes, _, had_unmappable) = encoding.encode(text);
        if had_unmappable {
            return Err(Error::UnmappableText {
                charset: self.name.clone(),
            });
        }
        Ok(bytes)
    }

    /// Decodes bytes in this charset back into a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are malformed for this charset.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        let Some(encoding) = self.encoding else {
            return String::from_utf8(bytes.to_vec()).map_err(Into::into);
        };

        encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(Cow::into_owned)
            .ok_or_else(|| Error::InvalidEncoding(format!("malformed {} text", self.name)))
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::utf8()
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// The text fields of a message that take part in charset negotiation.
#[derive(Debug, Clone, Copy)]
pub struct MessageText<'a> {
    /// Subject line.
    pub subject: &'a str,
    /// Plain text body.
    pub body: &'a str,
    /// Optional HTML body.
    pub html: Option<&'a str>,
    /// Optional sender display name.
    pub from_name: Option<&'a str>,
}

/// Result of charset negotiation: the chosen charset and every field
/// transcoded into it.
#[derive(Debug, Clone)]
pub struct Negotiated<'a> {
    /// The single charset of the message.
    pub charset: Charset,
    /// Subject in the chosen charset.
    pub subject: Cow<'a, [u8]>,
    /// Plain text body in the chosen charset.
    pub body: Cow<'a, [u8]>,
    /// HTML body in the chosen charset.
    pub html: Option<Cow<'a, [u8]>>,
    /// Sender display name in the chosen charset.
    pub from_name: Option<Cow<'a, [u8]>>,
}

impl<'a> MessageText<'a> {
    /// Returns true if every present field is plain ASCII.
    #[must_use]
    pub fn is_ascii(&self) -> bool {
        self.subject.is_ascii()
            && self.body.is_ascii()
            && self.html.is_none_or(str::is_ascii)
            && self.from_name.is_none_or(str::is_ascii)
    }

    /// Picks the message charset and transcodes every field into it.
    ///
    /// `requested` falls back to [`DEFAULT_CHARSET`] when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCharset`] or [`Error::UnmappableText`] if a
    /// field cannot be transcoded into the requested charset.
    pub fn negotiate(&self, requested: Option<&str>) -> Result<Negotiated<'a>> {
        let charset = if self.is_ascii() {
            Charset::us_ascii()
        } else {
            Charset::for_label(requested.unwrap_or(DEFAULT_CHARSET))?
        };

        Ok(Negotiated {
            subject: charset.encode(self.subject)?,
            body: charset.encode(self.body)?,
            html: self.html.map(|html| charset.encode(html)).transpose()?,
            from_name: self.from_name.map(|name| charset.encode(name)).transpose()?,
            charset,
        })
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
    use proptest::prelude::*;

    fn text<'a>(subject: &'a str, body: &'a str) -> MessageText<'a> {
        MessageText {
            subject,
            body,
            html: None,
            from_name: None,
        }
    }

    #[test]
    fn test_ascii_overrides_requested_charset() {
        let negotiated = text("Hello", "Plain body")
            .negotiate(Some("iso-8859-1"))
            .unwrap();
        assert_eq!(negotiated.charset.name(), "us-ascii");
        assert_eq!(&*negotiated.body, b"Plain body");
    }

    #[test]
    fn test_non_ascii_uses_default() {
        let negotiated = text("Héllo", "body").negotiate(None).unwrap();
        assert_eq!(negotiated.charset.name(), "utf-8");
        assert_eq!(&*negotiated.subject, "Héllo".as_bytes());
    }

    #[test]
    fn test_non_ascii_html_only() {
        let mut fields = text("Hello", "body");
        fields.html = Some("<p>café</p>");
        let negotiated = fields.negotiate(Some("utf-8")).unwrap();
        assert_eq!(negotiated.charset.name(), "utf-8");
    }

    #[test]
    fn test_non_ascii_from_name_only() {
        let mut fields = text("Hello", "body");
        fields.from_name = Some("Zoë");
        let negotiated = fields.negotiate(None).unwrap();
        assert_eq!(negotiated.charset.name(), "utf-8");
    }

    #[test]
    fn test_latin1_transcodes_every_field() {
        let fields = MessageText {
            subject: "Café",
            body: "Crème brûlée",
            html: Some("<b>é</b>"),
            from_name: Some("José"),
        };
        let negotiated = fields.negotiate(Some("ISO-8859-1")).unwrap();

        assert_eq!(negotiated.charset.name(), "iso-8859-1");
        assert_eq!(&*negotiated.subject, b"Caf\xe9");
        assert_eq!(&*negotiated.body, b"Cr\xe8me br\xfbl\xe9e");
        assert_eq!(negotiated.html.as_deref(), Some(&b"<b>\xe9</b>"[..]));
        assert_eq!(negotiated.from_name.as_deref(), Some(&b"Jos\xe9"[..]));
    }

    #[test]
    fn test_unmappable_text_fails() {
        let err = text("日本語", "body").negotiate(Some("iso-8859-1")).unwrap_err();
        assert!(matches!(err, Error::UnmappableText { .. }));
        assert!(err.is_encoding_error());
    }

    #[test]
    fn test_unknown_charset_fails() {
        let err = text("Héllo", "body").negotiate(Some("klingon")).unwrap_err();
        assert!(matches!(err, Error::UnknownCharset(_)));
    }

    #[test]
    fn test_utf16_is_rejected() {
        assert!(matches!(
            Charset::for_label("utf-16le"),
            Err(Error::UnknownCharset(_))
        ));
    }

    #[test]
    fn test_passthrough_charsets() {
        assert!(!Charset::for_label("UTF-8").unwrap().needs_transcoding());
        assert!(!Charset::for_label("us-ascii").unwrap().needs_transcoding());
        assert!(Charset::for_label("us-ascii").unwrap().is_us_ascii());
        assert!(Charset::for_label("koi8-r").unwrap().needs_transcoding());
    }

    #[test]
    fn test_decode_round_trip() {
        let charset = Charset::for_label("iso-8859-1").unwrap();
        let bytes = charset.encode("Grüße").unwrap();
        assert_eq!(charset.decode(&bytes).unwrap(), "Grüße");
    }

    proptest! {
        #[test]
        fn prop_ascii_fields_negotiate_us_ascii(
            subject in "[ -~]{0,40}",
            body in "[ -~\n]{0,200}",
            html in proptest::option::of("[ -~]{0,80}"),
            from_name in proptest::option::of("[ -~]{0,20}"),
            requested in prop_oneof![Just("utf-8"), Just("iso-8859-1"), Just("koi8-r")],
        ) {
            let fields = MessageText {
                subject: &subject,
                body: &body,
                html: html.as_deref(),
                from_name: from_name.as_deref(),
            };
            let negotiated = fields.negotiate(Some(requested)).unwrap();
            prop_assert_eq!(negotiated.charset.name(), "us-ascii");
        }

        #[test]
        fn prop_latin1_negotiation_keeps_requested_charset(
            prefix in "[a-z ]{0,20}",
            accented in "[àâçéèêëîïôûùüÿ]{1,10}",
        ) {
            let subject = format!("{prefix}{accented}");
            let negotiated = text(&subject, "body").negotiate(Some("iso-8859-1")).unwrap();
            prop_assert_eq!(negotiated.charset.name(), "iso-8859-1");
            prop_assert_eq!(negotiated.subject.len(), subject.chars().count());
        }
    }
}
