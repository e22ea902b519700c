use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{PreviewError, PreviewResult};
use crate::previewer::RenderMode;

/// Previewer settings. Every field has a default, so a config file only
/// needs to mention what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewConfig {
    /// Selector of the preview surface, prefixed to every top-level style rule.
    pub scope_selector: String,
    /// Id given to the preview target when the markup has none.
    pub target_id: String,
    /// Runtime label → render mode.
    pub runtimes: BTreeMap<String, RenderMode>,
    pub delegate: DelegateConfig,
}

/// How to start and talk to the delegate process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DelegateConfig {
    /// Program and arguments.
    pub command: Vec<String>,
    /// Upper bound for every synchronous call.
    pub timeout_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        let mut runtimes = BTreeMap::new();
        runtimes.insert("JavaScript".to_string(), RenderMode::InProcess);
        runtimes.insert("Vala".to_string(), RenderMode::OutOfProcess);

        Self {
            scope_selector: "#workbench_output".to_string(),
            target_id: "workbench_target".to_string(),
            runtimes,
            delegate: DelegateConfig::default(),
        }
    }
}

impl Default for DelegateConfig {
    fn default() -> Self {
        Self {
            command: vec!["workbench-vala-previewer".to_string()],
            timeout_ms: 5000,
        }
    }
}

impl DelegateConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl PreviewConfig {
    /// Parse a YAML config document.
    pub fn from_yaml(yaml: &str) -> PreviewResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> PreviewResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PreviewError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Render mode configured for a runtime label.
    pub fn mode_for(&self, label: &str) -> PreviewResult<RenderMode> {
        self.runtimes
            .get(label)
            .copied()
            .ok_or_else(|| PreviewError::UnknownRuntime {
                label: label.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = PreviewConfig::default();
        assert_eq!(config.scope_selector, "#workbench_output");
        assert_eq!(config.target_id, "workbench_target");
        assert_eq!(config.mode_for("JavaScript").unwrap(), RenderMode::InProcess);
        assert_eq!(config.mode_for("Vala").unwrap(), RenderMode::OutOfProcess);
        assert_eq!(config.delegate.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = PreviewConfig::from_yaml(
            "scopeSelector: \"#preview\"\ndelegate:\n  timeoutMs: 250\n",
        )
        .unwrap();
        assert_eq!(config.scope_selector, "#preview");
        assert_eq!(config.target_id, "workbench_target");
        assert_eq!(config.delegate.timeout_ms, 250);
        assert_eq!(config.delegate.command, vec!["workbench-vala-previewer"]);
    }

    #[test]
    fn runtimes_replace_the_default_table() {
        let config = PreviewConfig::from_yaml(
            "runtimes:\n  Python: inProcess\n  Rust: outOfProcess\n",
        )
        .unwrap();
        assert_eq!(config.mode_for("Rust").unwrap(), RenderMode::OutOfProcess);
        assert!(matches!(
            config.mode_for("Vala"),
            Err(PreviewError::UnknownRuntime { .. })
        ));
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(PreviewConfig::from_yaml("").unwrap(), PreviewConfig::default());
    }

    #[test]
    fn bad_yaml_is_a_config_error() {
        let err = PreviewConfig::from_yaml("scopeSelector: [unclosed").unwrap_err();
        assert!(matches!(err, PreviewError::Config(_)));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = PreviewConfig::load("/nonexistent/preview.yaml").unwrap_err();
        assert!(matches!(err, PreviewError::Config(_)));
    }
}
