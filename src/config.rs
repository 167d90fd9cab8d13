use serde::Deserialize;

use crate::error::{AdapterError, Result};

/// Tag used for the synthesized container element when no mount target is configured.
pub const DEFAULT_TAG: &str = "kinesis-app";

/// Value of the container's `name` attribute when the shell does not supply a fragment name.
pub const DEFAULT_FALLBACK_NAME: &str = "kinesis-fragment";

/// Global event broadcast by the shell whenever it navigates between fragments.
pub const DEFAULT_NAVIGATION_EVENT: &str = "kinesis:navigate";

/// How the fragment's router is brought back in line with the page location after a mount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResyncPolicy {
    /// Always force the router to re-resolve the current location, ignoring any cached route.
    #[default]
    Force,

    /// Wait for the router to become ready, and only resolve the location if nothing matched.
    WhenUnmatched,
}

/// Construction-time settings for a [`crate::Lifecycle`]. Fixed for the lifetime of the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterConfig {
    /// Selector for the mount target. When absent a container element is synthesized.
    pub el: Option<String>,

    /// Tag of the synthesized container element.
    pub tag: String,

    /// `name` attribute used for the container when the props carry no name.
    pub fallback_name: String,

    /// Name of the shell's navigation event.
    pub navigation_event: String,

    pub resync: ResyncPolicy,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            el: None,
            tag: DEFAULT_TAG.to_string(),
            fallback_name: DEFAULT_FALLBACK_NAME.to_string(),
            navigation_event: DEFAULT_NAVIGATION_EVENT.to_string(),
            resync: ResyncPolicy::default(),
        }
    }
}

impl AdapterConfig {
    /// Parse a configuration from JSON. Missing fields fall back to their defaults.
    pub fn from_json(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    /// Check the settings that would otherwise only fail once the page rejects them.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_tag(&self.tag) {
            return Err(AdapterError::InvalidTag(self.tag.clone()));
        }

        Ok(())
    }
}

/// Custom element names must start with a lowercase ASCII letter, contain a hyphen, and contain no
/// uppercase characters.
fn is_valid_tag(tag: &str) -> bool {
    tag.starts_with(|c: char| c.is_ascii_lowercase())
        && tag.contains('-')
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_'))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = AdapterConfig::from_json("{}").unwrap();

        assert_eq!(config, AdapterConfig::default());
    }

    #[test]
    fn camel_case_fields() {
        let config = AdapterConfig::from_json(
            r##"{
                "el": "#root",
                "fallbackName": "billing",
                "navigationEvent": "shell:navigate",
                "resync": "whenUnmatched"
            }"##,
        )
        .unwrap();

        assert_eq!(config.el.as_deref(), Some("#root"));
        assert_eq!(config.fallback_name, "billing");
        assert_eq!(config.navigation_event, "shell:navigate");
        assert_eq!(config.resync, ResyncPolicy::WhenUnmatched);
        assert_eq!(config.tag, DEFAULT_TAG);
    }

    #[test]
    fn rejects_tag_without_hyphen() {
        let err = AdapterConfig::from_json(r#"{ "tag": "app" }"#).unwrap_err();

        assert!(matches!(err, AdapterError::InvalidTag(tag) if tag == "app"));
    }

    #[test]
    fn rejects_uppercase_tag() {
        assert!(!is_valid_tag("My-App"));
        assert!(is_valid_tag("billing-app2"));
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(
            AdapterConfig::from_json("{"),
            Err(AdapterError::Config(_))
        ));
    }
}
