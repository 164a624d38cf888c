//! Byte-level codecs for bodies and header text.
//!
//! Bodies are written as quoted-printable with CRLF hard breaks. Header text
//! outside ASCII becomes RFC 2047 `B` encoded-words in the message charset.

use crate::charset::Charset;
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Standard-alphabet, padded base64 without line breaks.
#[must_use]
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Inverse of [`encode_base64`].
///
/// # Errors
///
/// Returns [`Error::Base64Decode`] on malformed input.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}

/// Maximum line length for Quoted-Printable encoding.
const MAX_LINE_LENGTH: usize = 76;

/// Maximum length of a single RFC 2047 encoded-word.
const MAX_ENCODED_WORD_LENGTH: usize = 75;

/// Encodes data using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks in the input (`\n` or `\r\n`) become CRLF hard breaks.
/// Longer lines get soft breaks so no output line exceeds 76 characters.
#[must_use]
pub fn encode_quoted_printable(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() + data.len() / 4);
    let mut lines = data.split(|&b| b == b'\n').peekable();

    while let Some(line) = lines.next() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        encode_quoted_printable_line(line, &mut result);
        if lines.peek().is_some() {
            result.push_str("\r\n");
        }
    }

    result
}

fn encode_quoted_printable_line(line: &[u8], result: &mut String) {
    let mut line_length = 0;

    for (i, &byte) in line.iter().enumerate() {
        let is_last = i + 1 == line.len();
        let literal = match byte {
            // Printable ASCII except '='
            b'!'..=b'<' | b'>'..=b'~' => true,
            // Whitespace is fine unless it would end the line
            b' ' | b'\t' => !is_last,
            _ => false,
        };
        let width = if literal { 1 } else { 3 };

        // Leave room for the trailing '=' of a soft break
        if line_length + width > MAX_LINE_LENGTH - 1 {
            result.push_str("=\r\n");
            line_length = 0;
        }

        if literal {
            result.push(byte as char);
        } else {
            let _ = write!(result, "={byte:02X}");
        }
        line_length += width;
    }
}

/// Decodes Quoted-Printable text (RFC 2045) into raw bytes.
///
/// Hard line breaks are returned as CRLF.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            result.push(bytes[i]);
            i += 1;
            continue;
        }

        // Soft line break
        match bytes.get(i + 1..i + 3) {
            Some(b"\r\n") => {
                i += 3;
                continue;
            }
            _ if bytes.get(i + 1) == Some(&b'\n') => {
                i += 2;
                continue;
            }
            _ => {}
        }

        // Hex encoded byte
        let hex = bytes
            .get(i + 1..i + 3)
            .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".to_string()))?;
        let hex = std::str::from_utf8(hex)
            .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
        let byte = u8::from_str_radix(hex, 16)
            .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
        result.push(byte);
        i += 3;
    }

    Ok(result)
}

/// Encodes header text using RFC 2047 "B" encoded-words.
///
/// `text` must already be in `charset`. Pure ASCII text is returned as-is.
/// Longer text is split into several space-separated encoded-words, each
/// at most 75 characters long and never splitting a character.
///
/// # Errors
///
/// Returns an error if `text` is not valid in `charset`.
pub fn encode_rfc2047(text: &[u8], charset: &Charset) -> Result<String> {
    if text.is_ascii() {
        return Ok(String::from_utf8_lossy(text).into_owned());
    }

    let name = charset.name();
    // "=?" + name + "?B?" + payload + "?="
    let overhead = name.len() + 7;
    let max_payload = MAX_ENCODED_WORD_LENGTH.saturating_sub(overhead).max(4);
    let max_bytes = (max_payload / 4) * 3;

    let decoded = charset.decode(text)?;
    let mut words = Vec::new();
    let mut chunk = String::new();
    let mut chunk_bytes = 0;
    let mut buf = [0u8; 4];

    for ch in decoded.chars() {
        let width = charset.encode(ch.encode_utf8(&mut buf))?.len();
        if chunk_bytes + width > max_bytes && !chunk.is_empty() {
            words.push(encoded_word(&chunk, charset)?);
            chunk.clear();
            chunk_bytes = 0;
        }
        chunk.push(ch);
        chunk_bytes += width;
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk, charset)?);
    }

    Ok(words.join(" "))
}

fn encoded_word(text: &str, charset: &Charset) -> Result<String> {
    let bytes = charset.encode(text)?;
    Ok(format!("=?{}?B?{}?=", charset.name(), encode_base64(&bytes)))
}

/// Decodes RFC 2047 encoded-words within a header value.
///
/// Whitespace between adjacent encoded-words is dropped, as the RFC
/// requires. Text outside encoded-words is kept verbatim.
///
/// # Errors
///
/// Returns an error if an encoded-word has an unknown charset or encoding,
/// or its payload is malformed.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    let mut previous_was_word = false;

    while let Some(word) = EncodedWord::find(rest) {
        let between = &rest[..word.start];
        if !(previous_was_word && between.trim().is_empty()) {
            result.push_str(between);
        }
        result.push_str(&word.decode()?);
        previous_was_word = true;
        rest = &rest[word.end..];
    }
    result.push_str(rest);

    Ok(result)
}

/// A located `=?charset?encoding?payload?=` token.
struct EncodedWord<'a> {
    start: usize,
    end: usize,
    charset: &'a str,
    encoding: &'a str,
    payload: &'a str,
}

impl<'a> EncodedWord<'a> {
    fn find(text: &'a str) -> Option<Self> {
        let mut from = 0;

        while let Some(offset) = text[from..].find("=?") {
            let start = from + offset;
            if let Some(word) = Self::parse_at(text, start) {
                return Some(word);
            }
            from = start + 2;
        }

        None
    }

    fn parse_at(text: &'a str, start: usize) -> Option<Self> {
        let inner = &text[start + 2..];
        let (charset, after) = inner.split_once('?')?;
        let (encoding, after) = after.split_once('?')?;
        let payload_length = after.find("?=")?;
        let payload = &after[..payload_length];

        let valid = !charset.is_empty()
            && !charset.contains(char::is_whitespace)
            && encoding.len() == 1
            && !payload.contains(char::is_whitespace);
        if !valid {
            return None;
        }

        let end = start + 2 + charset.len() + 1 + encoding.len() + 1 + payload_length + 2;
        Some(Self {
            start,
            end,
            charset,
            encoding,
            payload,
        })
    }

    fn decode(&self) -> Result<String> {
        // RFC 2231 language suffix: "utf-8*en"
        let label = self.charset.split('*').next().unwrap_or(self.charset);
        let charset = Charset::for_label(label)?;

        let bytes = match self.encoding {
            "B" | "b" => decode_base64(self.payload)?,
            // Quoted-Printable with underscore for space
            "Q" | "q" => decode_quoted_printable(&self.payload.replace('_', " "))?,
            other => {
                return Err(Error::InvalidEncoding(format!(
                    "Unknown encoding: {other}"
                )));
            }
        };

        charset.decode(&bytes)
    }
}
