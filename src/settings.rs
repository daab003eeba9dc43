use serde::Deserialize;
use tracing::warn;

/// Whether a flow-style collection kind is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStyle {
    #[default]
    Allow,
    Forbid,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleSettings {
    pub flow_mapping: FlowStyle,
    pub flow_sequence: FlowStyle,
}

/// Client-provided configuration.
///
/// Accepted from `initializationOptions` and `workspace/didChangeConfiguration`,
/// either as the bare object or nested under a `yaml` key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Indent unit used when rewriting flow collections to block style.
    pub indentation: String,
    pub style: StyleSettings,
    pub link_provider: bool,
    /// Names of extra definition resolvers. Accepted but not yet wired.
    pub definition_resolvers: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            indentation: "  ".to_string(),
            style: StyleSettings::default(),
            link_provider: true,
            definition_resolvers: Vec::new(),
        }
    }
}

impl Settings {
    /// Parse settings from a client payload, returning `None` for payloads
    /// that are absent or malformed.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        let section = value.get("yaml").unwrap_or(value);
        match serde_json::from_value(section.clone()) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!(error = %e, "settings: ignoring invalid configuration");
                None
            }
        }
    }
}
