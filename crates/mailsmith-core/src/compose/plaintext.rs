//! Reduction of markdown source text to plain text.

use regex::Regex;
use std::sync::LazyLock;

/// Anything between `<` and the next `>`.
#[allow(clippy::expect_used)]
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex is valid"));

/// The `[label](` head of a markdown inline link.
#[allow(clippy::expect_used)]
static LINK_HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(").expect("link regex is valid"));

/// Strips markup tags from `text`.
#[must_use]
pub fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").into_owned()
}

/// Rewrites every `[label](url` into `label (url`.
///
/// Only the `[label](` head is rewritten; the closing `)` and anything after
/// it are left in place.
#[must_use]
pub fn rewrite_links(text: &str) -> String {
    LINK_HEAD_RE.replace_all(text, "${1} (").into_owned()
}

/// Converts markdown source text to plain text: tags stripped first, then
/// inline links rewritten.
#[must_use]
pub fn to_plaintext(text: &str) -> String {
    rewrite_links(&strip_tags(text))
}
