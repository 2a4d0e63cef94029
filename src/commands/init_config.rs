use std::fs;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::cli::InitConfigArgs;
use crate::config::ClientConfig;
use crate::util::{config_slug, write_json_pretty};

pub fn run(args: InitConfigArgs) -> Result<()> {
    for client in &args.clients {
        let client = client.trim();
        if client.is_empty() {
            continue;
        }

        let config = ClientConfig::new(client, args.report_period.as_deref(), &args.data_directory);
        let path = args.config_dir.join(format!("{}.json", config_slug(client)));

        if path.exists() {
            let raw = fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let existing: Value = serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            if !is_generated_default(&existing, &config)? {
                info!(client, path = %path.display(), "keeping customized config");
                continue;
            }
        }

        write_json_pretty(&path, &config)?;
        info!(client, path = %path.display(), "wrote client config");
    }

    Ok(())
}

/// An existing file still equals what this command would generate. The
/// report period is left out so regenerating next month refreshes it.
fn is_generated_default(existing: &Value, generated: &ClientConfig) -> Result<bool> {
    let mut generated = serde_json::to_value(generated).context("failed to serialize config")?;
    let mut existing = existing.clone();
    for value in [&mut generated, &mut existing] {
        if let Some(object) = value.as_object_mut() {
            object.remove("report_period");
        }
    }
    Ok(existing == generated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(dir: &std::path::Path, period: &str) -> InitConfigArgs {
        InitConfigArgs {
            clients: vec!["Acme Corp.".to_string(), " ".to_string()],
            config_dir: dir.to_path_buf(),
            report_period: Some(period.to_string()),
            data_directory: "data/".to_string(),
        }
    }

    #[test]
    fn writes_default_config_under_slug() {
        let dir = tempfile::tempdir().expect("tempdir");
        run(args(dir.path(), "January 2026")).expect("init succeeds");

        let config = ClientConfig::load(&dir.path().join("acme_corp_.json")).expect("config loads");
        assert_eq!(config.client_name, "Acme Corp.");
        assert_eq!(config.report_period, "January 2026");
        assert_eq!(config.modules_to_run, vec!["datto_rmm", "prtg_monitoring"]);
        assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 1);
    }

    #[test]
    fn regenerates_defaults_but_keeps_customized_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("acme_corp_.json");

        run(args(dir.path(), "January 2026")).expect("init succeeds");
        run(args(dir.path(), "February 2026")).expect("re-init succeeds");
        let config = ClientConfig::load(&path).expect("config loads");
        assert_eq!(config.report_period, "February 2026");

        let mut custom = config.clone();
        custom.modules_to_run = vec!["prtg_monitoring".to_string()];
        write_json_pretty(&path, &custom).expect("write custom");

        run(args(dir.path(), "March 2026")).expect("re-init succeeds");
        let config = ClientConfig::load(&path).expect("config loads");
        assert_eq!(config.modules_to_run, vec!["prtg_monitoring"]);
        assert_eq!(config.report_period, "February 2026");
    }
}
