use anyhow::{Context, Result};
use rewind_store::StoreConfig;
use serde::Deserialize;
use std::path::Path;

/// Application configuration, read from JSON or YAML.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rollback: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `--verbose` is not given.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl AppConfig {
    /// Load from `path`; `.yaml`/`.yml` are read as YAML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text)
                .with_context(|| format!("parsing YAML config {}", path.display()))?,
            _ => serde_json::from_str(&text)
                .with_context(|| format!("parsing JSON config {}", path.display()))?,
        };
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_json_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rewind.json");
        std::fs::write(
            &path,
            r#"{"rollback": {"max_history": 4, "auto_cleanup": true}, "logging": {"level": "warn"}}"#,
        )
        .unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.rollback.capacity(), Some(4));
        assert!(config.rollback.enabled);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn load_yaml_config_with_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rewind.yaml");
        std::fs::write(&path, "rollback:\n  enabled: false\n").unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert!(!config.rollback.enabled);
        assert_eq!(config.rollback.max_history, 10);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn missing_config_reports_path() {
        let err = AppConfig::load(Path::new("/nonexistent/rewind.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/rewind.json"));
    }
}
