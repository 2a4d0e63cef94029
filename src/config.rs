use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::engine::devices::default_prefixes;

pub const DEFAULT_MODULES: &[&str] = &["datto_rmm", "prtg_monitoring"];

/// Per-client run configuration, one JSON file per client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_name: String,
    #[serde(default = "default_report_period")]
    pub report_period: String,
    #[serde(default = "default_data_directory")]
    pub data_directory: String,
    #[serde(default = "default_modules")]
    pub modules_to_run: Vec<String>,
    #[serde(default)]
    pub extraction: ExtractionSettings,
}

/// Policy knobs for the extraction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSettings {
    #[serde(default = "default_os_label")]
    pub os_label: String,
    #[serde(default = "default_prefixes")]
    pub device_id_prefixes: Vec<String>,
    #[serde(default = "default_low_space_threshold")]
    pub low_space_threshold: f64,
    #[serde(default = "default_compliance_target")]
    pub compliance_target: f64,
    #[serde(default = "default_top_disk_count")]
    pub top_disk_count: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            os_label: default_os_label(),
            device_id_prefixes: default_prefixes(),
            low_space_threshold: default_low_space_threshold(),
            compliance_target: default_compliance_target(),
            top_disk_count: default_top_disk_count(),
        }
    }
}

fn default_report_period() -> String {
    Utc::now().format("%B %Y").to_string()
}

fn default_data_directory() -> String {
    "data/".to_string()
}

fn default_modules() -> Vec<String> {
    DEFAULT_MODULES
        .iter()
        .map(|module| module.to_string())
        .collect()
}

fn default_os_label() -> String {
    "Windows 10".to_string()
}

fn default_low_space_threshold() -> f64 {
    85.0
}

fn default_compliance_target() -> f64 {
    90.0
}

fn default_top_disk_count() -> usize {
    10
}

impl ClientConfig {
    pub fn new(client_name: &str, report_period: Option<&str>, data_directory: &str) -> Self {
        Self {
            client_name: client_name.trim().to_string(),
            report_period: report_period
                .map(ToOwned::to_owned)
                .unwrap_or_else(default_report_period),
            data_directory: data_directory.to_string(),
            modules_to_run: default_modules(),
            extraction: ExtractionSettings::default(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read(path).with_context(|| format!("failed to read config {}", path.display()))?;
        let config: ClientConfig = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        if config.client_name.trim().is_empty() {
            bail!("config {} has an empty client_name", path.display());
        }
        if !(0.0..=100.0).contains(&config.extraction.low_space_threshold) {
            bail!(
                "config {} has low_space_threshold outside 0-100: {}",
                path.display(),
                config.extraction.low_space_threshold
            );
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("acme.json");
        fs::write(&path, r#"{ "client_name": "Acme Corp" }"#).expect("write config");

        let config = ClientConfig::load(&path).expect("config loads");
        assert_eq!(config.client_name, "Acme Corp");
        assert_eq!(config.data_directory, "data/");
        assert_eq!(config.modules_to_run, vec!["datto_rmm", "prtg_monitoring"]);
        assert_eq!(config.extraction.os_label, "Windows 10");
        assert_eq!(config.extraction.low_space_threshold, 85.0);
        assert!(!config.report_period.is_empty());
    }

    #[test]
    fn partial_extraction_block_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("acme.json");
        fs::write(
            &path,
            r#"{ "client_name": "Acme", "report_period": "January 2026", "extraction": { "os_label": "Windows 7" } }"#,
        )
        .expect("write config");

        let config = ClientConfig::load(&path).expect("config loads");
        assert_eq!(config.report_period, "January 2026");
        assert_eq!(config.extraction.os_label, "Windows 7");
        assert_eq!(config.extraction.compliance_target, 90.0);
        assert_eq!(config.extraction.device_id_prefixes, default_prefixes());
    }

    #[test]
    fn empty_client_name_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("blank.json");
        fs::write(&path, r#"{ "client_name": "  " }"#).expect("write config");
        assert!(ClientConfig::load(&path).is_err());
        assert!(ClientConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
