//! Analyst configuration
//!
//! Everything here is read once at startup. The rule catalog itself is
//! either the built-in default or a JSON file named by `catalog_path`.

use crate::catalog::RuleCatalog;
use crate::reconcile::MergePolicy;
use crate::AssessmentError;
use std::path::PathBuf;

pub const ENV_CATALOG_PATH: &str = "COMPLIANCE_CATALOG_PATH";
pub const ENV_MERGE_POLICY: &str = "COMPLIANCE_MERGE_POLICY";
pub const ENV_MODEL: &str = "COMPLIANCE_MODEL";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";

/// Settings for the external model call. The call itself is made elsewhere.
#[derive(Clone, PartialEq)]
pub struct ModelSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

impl ModelSettings {
    /// The configured credential; a blank key counts as missing
    pub fn require_api_key(&self) -> Result<&str, AssessmentError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(AssessmentError::MissingConfiguration(format!(
                "model API key not configured (set {})",
                ENV_API_KEY
            ))),
        }
    }
}

// Keeps the credential out of logs
impl std::fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Analyst configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalystConfig {
    /// JSON rule catalog; the built-in catalog is used when absent
    pub catalog_path: Option<PathBuf>,
    pub merge_policy: MergePolicy,
    pub model: ModelSettings,
}

impl AnalystConfig {
    /// Build from process environment variables
    pub fn from_env() -> Result<Self, AssessmentError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AssessmentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_CATALOG_PATH).filter(|p| !p.trim().is_empty()) {
            config.catalog_path = Some(PathBuf::from(path));
        }

        if let Some(policy) = lookup(ENV_MERGE_POLICY) {
            config.merge_policy = policy.parse().map_err(|e| {
                AssessmentError::Configuration(format!("{}: {}", ENV_MERGE_POLICY, e))
            })?;
        }

        if let Some(model) = lookup(ENV_MODEL).filter(|m| !m.trim().is_empty()) {
            config.model.model = model;
        }

        config.model.api_key = lookup(ENV_API_KEY);

        Ok(config)
    }

    /// Load the configured catalog, falling back to the built-in one
    pub fn load_catalog(&self) -> Result<RuleCatalog, AssessmentError> {
        match &self.catalog_path {
            Some(path) => RuleCatalog::from_json_file(path),
            None => Ok(RuleCatalog::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AnalystConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config, AnalystConfig::default());
        assert_eq!(config.merge_policy, MergePolicy::Lenient);
        assert_eq!(config.model.model, "gpt-4o-mini");
        assert_eq!(config.model.max_tokens, 2048);
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_values_from_lookup() {
        let config = AnalystConfig::from_lookup(lookup_from(&[
            (ENV_MERGE_POLICY, "strict"),
            (ENV_MODEL, "gpt-4o"),
            (ENV_API_KEY, "sk-test"),
            (ENV_CATALOG_PATH, "/etc/compliance/catalog.json"),
        ]))
        .unwrap();

        assert_eq!(config.merge_policy, MergePolicy::Strict);
        assert_eq!(config.model.model, "gpt-4o");
        assert_eq!(config.model.require_api_key().unwrap(), "sk-test");
        assert_eq!(
            config.catalog_path,
            Some(PathBuf::from("/etc/compliance/catalog.json"))
        );
    }

    #[test]
    fn test_invalid_merge_policy() {
        let result = AnalystConfig::from_lookup(lookup_from(&[(ENV_MERGE_POLICY, "yolo")]));
        assert!(matches!(result, Err(AssessmentError::Configuration(_))));
    }

    #[test]
    fn test_missing_api_key() {
        let settings = ModelSettings::default();
        assert!(matches!(
            settings.require_api_key(),
            Err(AssessmentError::MissingConfiguration(_))
        ));

        let blank = ModelSettings {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.require_api_key().is_err());
    }

    #[test]
    fn test_api_key_redacted_in_debug() {
        let settings = ModelSettings {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", settings);

        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_load_catalog() {
        let config = AnalystConfig::default();
        assert_eq!(config.load_catalog().unwrap(), RuleCatalog::default());

        let mut catalog = RuleCatalog::default();
        catalog.thresholds.amount_high = 25_000.0;
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), catalog.to_json().unwrap()).unwrap();

        let config = AnalystConfig {
            catalog_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(config.load_catalog().unwrap().thresholds.amount_high, 25_000.0);
    }
}
