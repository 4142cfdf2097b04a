//! Custom-rule sourcing abstraction.

use async_trait::async_trait;
use redqc_core::CustomRule;

/// Error type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while orchestrating a run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Rule source failure
    #[error("rule provider error: {0}")]
    Provider(String),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Source of user-authored rules for a project.
///
/// This trait allows different rule backends to be plugged in; the
/// engine only ever asks for the enabled rules of one project scope.
#[async_trait]
pub trait RuleProvider: Send + Sync {
    /// Enabled rules for the given project scope.
    async fn enabled_rules(&self, scope: &str) -> Result<Vec<CustomRule>>;
}

/// In-memory provider over a fixed rule list, used when rules are
/// loaded from a file up front and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRuleProvider {
    rules: Vec<CustomRule>,
}

impl StaticRuleProvider {
    /// Create over a fixed rule list.
    pub fn new(rules: Vec<CustomRule>) -> Self {
        Self { rules }
    }

    /// Parse rules from a JSON array.
    pub fn from_json(json: &str) -> Result<Self> {
        let rules: Vec<CustomRule> = serde_json::from_str(json)?;
        Ok(Self::new(rules))
    }
}

#[async_trait]
impl RuleProvider for StaticRuleProvider {
    async fn enabled_rules(&self, _scope: &str) -> Result<Vec<CustomRule>> {
        Ok(self
            .rules
            .iter()
            .filter(|r| r.enabled)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_filters_disabled() {
        let json = r#"[
            {"name": "a", "rule_type": "uniqueness", "field": "code"},
            {"name": "b", "rule_type": "uniqueness", "field": "code", "enabled": false}
        ]"#;
        let provider = StaticRuleProvider::from_json(json).unwrap();
        let rules = provider.enabled_rules("any").await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "a");
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(StaticRuleProvider::from_json("{not json").is_err());
    }
}
