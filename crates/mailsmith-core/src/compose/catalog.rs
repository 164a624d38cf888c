//! Message catalog used to localize mail snippets.

use super::Localizer;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Message id to template table.
///
/// Templates use `{name}` placeholders, filled from the substitution map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageCatalog {
    messages: HashMap<String, String>,
}

impl MessageCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog with English greeting and footer templates.
    #[must_use]
    pub fn english() -> Self {
        Self::new()
            .with_message(super::GREETING_ID, "Hello {user},")
            .with_message(
                super::FOOTER_ID,
                "--\nThis message was sent by {site_name} ({site_root}).",
            )
    }

    /// Adds or replaces a template.
    #[must_use]
    pub fn with_message(mut self, id: impl Into<String>, template: impl Into<String>) -> Self {
        self.messages.insert(id.into(), template.into());
        self
    }

    /// Loads a catalog from a JSON object of id to template.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not an object of strings.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the raw template for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&str> {
        self.messages.get(id).map(String::as_str)
    }
}

impl Localizer for MessageCatalog {
    fn translate(&self, message_id: &str, substitutions: &HashMap<&str, &str>) -> String {
        let Some(template) = self.get(message_id) else {
            return message_id.to_string();
        };

        substitutions
            .iter()
            .fold(template.to_string(), |text, (key, value)| {
                text.replace(&format!("{{{key}}}"), value)
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_substitutes() {
        let catalog = MessageCatalog::new().with_message("hi", "Hi {user}, welcome to {site}!");
        let subs = HashMap::from([("user", "Pat"), ("site", "Example")]);
        assert_eq!(catalog.translate("hi", &subs), "Hi Pat, welcome to Example!");
    }

    #[test]
    fn test_translate_unknown_id() {
        let catalog = MessageCatalog::new();
        assert_eq!(catalog.translate("missing", &HashMap::new()), "missing");
    }

    #[test]
    fn test_translate_leaves_unknown_placeholders() {
        let catalog = MessageCatalog::new().with_message("hi", "Hi {user}");
        assert_eq!(catalog.translate("hi", &HashMap::new()), "Hi {user}");
    }

    #[test]
    fn test_from_json() {
        let catalog = MessageCatalog::from_json(r#"{"mail_greeting": "Hallo {user},"}"#).unwrap();
        assert_eq!(catalog.get("mail_greeting"), Some("Hallo {user},"));
        assert!(MessageCatalog::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_english_templates() {
        let catalog = MessageCatalog::english();
        let subs = HashMap::from([("site_name", "Example"), ("site_root", "https://example.com")]);
        assert_eq!(
            catalog.translate("mail_footer", &subs),
            "--\nThis message was sent by Example (https://example.com)."
        );
    }
}
