//! Site-wide configuration.

use crate::error::{Error, Result};
use mailsmith_mime::DEFAULT_CHARSET;
use serde::{Deserialize, Serialize};

/// Read-only site configuration passed to the composer and the mailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site name shown in mail footers.
    pub site_name: String,
    /// Site root URL shown in mail footers.
    pub site_root: String,
    /// Charset used when a request does not name one.
    pub default_charset: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: String::new(),
            site_root: String::new(),
            default_charset: DEFAULT_CHARSET.to_string(),
        }
    }
}

impl SiteConfig {
    /// Creates a configuration with the default charset.
    #[must_use]
    pub fn new(site_name: impl Into<String>, site_root: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            site_root: site_root.into(),
            ..Self::default()
        }
    }

    /// Sets the default charset.
    #[must_use]
    pub fn with_default_charset(mut self, charset: impl Into<String>) -> Self {
        self.default_charset = charset.into();
        self
    }

    /// Loads a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the default charset is
    /// empty.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        if config.default_charset.trim().is_empty() {
            return Err(Error::Config("default_charset must not be empty".to_string()));
        }
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_charset() {
        assert_eq!(SiteConfig::default().default_charset, "utf-8");
        assert_eq!(SiteConfig::new("Site", "https://x.com").default_charset, "utf-8");
    }

    #[test]
    fn test_from_json_partial() {
        let config = SiteConfig::from_json(r#"{"site_name": "Example"}"#).unwrap();
        assert_eq!(config.site_name, "Example");
        assert_eq!(config.site_root, "");
        assert_eq!(config.default_charset, "utf-8");
    }

    #[test]
    fn test_from_json_full() {
        let config = SiteConfig::from_json(
            r#"{"site_name": "Example", "site_root": "https://example.com", "default_charset": "iso-8859-1"}"#,
        )
        .unwrap();
        assert_eq!(
            config,
            SiteConfig::new("Example", "https://example.com").with_default_charset("iso-8859-1")
        );
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(SiteConfig::from_json("{"), Err(Error::Serde(_))));
        assert!(matches!(
            SiteConfig::from_json(r#"{"default_charset": " "}"#),
            Err(Error::Config(_))
        ));
    }
}
