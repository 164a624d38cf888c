//! Templated mail composition.
//!
//! Wraps a body in a localized greeting and footer and renders it twice:
//! once to HTML through a markdown renderer and sanitizer, and once to
//! plain text by stripping markup from the same source.

mod catalog;
mod plaintext;

pub use catalog::MessageCatalog;
pub use plaintext::{rewrite_links, strip_tags, to_plaintext};

use crate::config::SiteConfig;
use crate::request::MailRequest;
use std::collections::HashMap;

/// Message id of the greeting line. Substitutes `user`.
pub const GREETING_ID: &str = "mail_greeting";

/// Message id of the footer. Substitutes `site_name` and `site_root`.
pub const FOOTER_ID: &str = "mail_footer";

/// Resolves localized strings.
pub trait Localizer {
    /// Resolves `message_id`, filling in `substitutions`.
    fn translate(&self, message_id: &str, substitutions: &HashMap<&str, &str>) -> String;
}

/// Renders markdown to HTML.
pub trait MarkdownRenderer {
    /// Renders `text` to HTML.
    fn render(&self, text: &str) -> String;
}

/// Normalizes rendered HTML.
pub trait HtmlSanitizer {
    /// Returns the sanitized form of `html`.
    fn sanitize(&self, html: &str) -> String;
}

/// HTML and plain text renderings of one composed mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedMail {
    /// Rendered and sanitized HTML.
    pub html: String,
    /// Plain text with markup stripped.
    pub plaintext: String,
}

impl FormattedMail {
    /// Turns the rendering into a send request with the plain text as body
    /// and the HTML as the alternative part.
    #[must_use]
    pub fn into_request(
        self,
        to: impl Into<String>,
        from: impl Into<String>,
        subject: impl Into<String>,
    ) -> MailRequest {
        MailRequest::new(to, from, subject, self.plaintext).html(self.html)
    }
}

/// Builds greeting + body + footer mails.
#[derive(Debug, Clone)]
pub struct FormattedMailComposer<L, R, S> {
    config: SiteConfig,
    localizer: L,
    renderer: R,
    sanitizer: S,
}

impl<L, R, S> FormattedMailComposer<L, R, S>
where
    L: Localizer,
    R: MarkdownRenderer,
    S: HtmlSanitizer,
{
    /// Creates a composer.
    #[must_use]
    pub const fn new(config: SiteConfig, localizer: L, renderer: R, sanitizer: S) -> Self {
        Self {
            config,
            localizer,
            renderer,
            sanitizer,
        }
    }

    /// Returns the site configuration.
    #[must_use]
    pub const fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Composes `body` into HTML and plain text.
    ///
    /// With `greeting_user` set, a localized greeting line comes first. The
    /// localized footer is always appended. Parts are separated by a blank
    /// line.
    #[must_use]
    pub fn format_mail(&self, body: &str, greeting_user: Option<&str>) -> FormattedMail {
        let text = self.working_text(body, greeting_user);

        let html = self.sanitizer.sanitize(&self.renderer.render(&text));
        let plaintext = to_plaintext(&text);

        FormattedMail { html, plaintext }
    }

    fn working_text(&self, body: &str, greeting_user: Option<&str>) -> String {
        let footer = self.localizer.translate(
            FOOTER_ID,
            &HashMap::from([
                ("site_name", self.config.site_name.as_str()),
                ("site_root", self.config.site_root.as_str()),
            ]),
        );

        let mut sections = Vec::with_capacity(3);
        if let Some(user) = greeting_user {
            sections.push(
                self.localizer
                    .translate(GREETING_ID, &HashMap::from([("user", user)])),
            );
        }
        sections.push(body.to_string());
        sections.push(footer);

        sections.join("\n\n")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Paragraphs;

    impl MarkdownRenderer for Paragraphs {
        fn render(&self, text: &str) -> String {
            text.split("\n\n").map(|p| format!("<p>{p}</p>")).collect()
        }
    }

    struct Trim;

    impl HtmlSanitizer for Trim {
        fn sanitize(&self, html: &str) -> String {
            html.trim().to_string()
        }
    }

    fn composer() -> FormattedMailComposer<MessageCatalog, Paragraphs, Trim> {
        let catalog = MessageCatalog::new()
            .with_message(GREETING_ID, "Hi {user},")
            .with_message(FOOTER_ID, "{site_name} {site_root}");
        FormattedMailComposer::new(
            SiteConfig::new("Example", "https://example.com"),
            catalog,
            Paragraphs,
            Trim,
        )
    }

    #[test]
    fn test_without_greeting() {
        let mail = composer().format_mail("Hello", None);
        assert_eq!(mail.plaintext, "Hello\n\nExample https://example.com");
        assert_eq!(mail.html, "<p>Hello</p><p>Example https://example.com</p>");
    }

    #[test]
    fn test_with_greeting() {
        let mail = composer().format_mail("Hello", Some("Pat"));
        assert_eq!(mail.plaintext, "Hi Pat,\n\nHello\n\nExample https://example.com");
        assert!(mail.html.starts_with("<p>Hi Pat,</p>"));
    }

    #[test]
    fn test_into_request() {
        let request = composer()
            .format_mail("Hello", None)
            .into_request("a@x.com", "noreply@example.com", "Welcome");
        assert_eq!(request.body, "Hello\n\nExample https://example.com");
        assert_eq!(
            request.html.as_deref(),
            Some("<p>Hello</p><p>Example https://example.com</p>")
        );
    }

    #[test]
    fn test_plaintext_from_source_not_html() {
        let mail = composer().format_mail("Go <b>now</b>: [click here](http://x.com)", None);
        assert!(mail.plaintext.starts_with("Go now: click here (http://x.com)\n\n"));
        assert!(mail.html.contains("<b>now</b>"));
    }
}
