//! Interpreter configuration.

use serde::{Deserialize, Serialize};

/// Limits and naming used by an [`crate::Interpreter`].
///
/// Every field has a default, so a partial JSON document is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Deepest allowed nesting of user-function calls.
    pub max_call_depth: usize,
    /// How many idle contexts the pool keeps for reuse.
    pub context_pool_capacity: usize,
    /// File name reported in syntax errors from `eval_source`.
    pub file_name: String,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 200,
            context_pool_capacity: 32,
            file_name: "<script>".to_string(),
        }
    }
}

impl InterpreterConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InterpreterConfig::default();
        assert_eq!(config.max_call_depth, 200);
        assert_eq!(config.context_pool_capacity, 32);
        assert_eq!(config.file_name, "<script>");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = InterpreterConfig::from_json(r#"{ "max_call_depth": 12 }"#).unwrap();
        assert_eq!(config.max_call_depth, 12);
        assert_eq!(config.context_pool_capacity, 32);
    }

    #[test]
    fn test_json_round_trip() {
        let config = InterpreterConfig {
            max_call_depth: 5,
            context_pool_capacity: 0,
            file_name: "boot.yu".into(),
        };
        let back = InterpreterConfig::from_json(&config.to_json()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_rejects_wrong_types() {
        assert!(InterpreterConfig::from_json(r#"{ "max_call_depth": "deep" }"#).is_err());
    }
}
