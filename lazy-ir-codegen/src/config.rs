//! Generator configuration, threaded through every emitter.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::GenResult;

/// Identifies which backend's kernel signatures the dispatch functions use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendIndex(pub String);

impl Default for BackendIndex {
    fn default() -> Self {
        Self("Lazy".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenConfig {
    pub backend_index: BackendIndex,
    /// Concrete handle type used in generated `lazy_<arg>` declarations.
    pub tensor_class: String,
    /// Base graph-node class every generated node derives from.
    pub node_base: String,
    /// Class the dispatch functions are defined on.
    pub class_method_name: String,
    /// Operators with no interned `at::aten::` symbol upstream.
    pub missing_interned_symbols: BTreeSet<String>,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            backend_index: BackendIndex::default(),
            tensor_class: "LazyTensor".to_string(),
            node_base: "TsNode".to_string(),
            class_method_name: "LazyNativeFunctions".to_string(),
            missing_interned_symbols: ["sigmoid_backward".to_string()].into_iter().collect(),
        }
    }
}

impl GenConfig {
    pub fn from_json_str(json: &str) -> GenResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let cfg = GenConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, GenConfig::default());
        assert!(cfg.missing_interned_symbols.contains("sigmoid_backward"));
    }

    #[test]
    fn partial_json_overrides_fields() {
        let cfg = GenConfig::from_json_str(
            r#"{
                "backend_index": "XLA",
                "tensor_class": "XLATensor",
                "missing_interned_symbols": ["foo_bar"]
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.backend_index, BackendIndex("XLA".to_string()));
        assert_eq!(cfg.tensor_class, "XLATensor");
        assert_eq!(cfg.node_base, "TsNode");
        assert!(!cfg.missing_interned_symbols.contains("sigmoid_backward"));
        assert!(cfg.missing_interned_symbols.contains("foo_bar"));
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = GenConfig::from_json_str("{\"tensor_class\": 3}").unwrap_err();
        assert!(err.to_string().contains("config error"), "got: {err}");
    }
}
