//! Config command handlers

use std::path::Path;

use anyhow::{bail, Context, Result};

use daybook_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&Path>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => output.json(&serde_json::json!({
            "data_dir": config.data_dir,
            "log_file": config.log_file,
            "remote_timeout_secs": config.remote_timeout_secs,
        })),
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:            {}", config.data_dir.display());
            println!(
                "  log_file:            {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  remote_timeout_secs: {}", config.remote_timeout_secs);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, config_path: Option<&Path>, output: &Output) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    let save_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        "remote_timeout_secs" => {
            let secs: u64 = value
                .parse()
                .context("Invalid value for remote_timeout_secs. Use a whole number of seconds.")?;
            if secs == 0 {
                bail!("remote_timeout_secs must be greater than zero");
            }
            config.remote_timeout_secs = secs;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, log_file, remote_timeout_secs",
                key
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_apply_keys() {
        let mut config = Config::default();

        apply(&mut config, "data_dir", "/tmp/daybook").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/daybook"));

        apply(&mut config, "log_file", "/tmp/daybook.log").unwrap();
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/daybook.log")));
        apply(&mut config, "log_file", "none").unwrap();
        assert_eq!(config.log_file, None);

        apply(&mut config, "remote_timeout_secs", "5").unwrap();
        assert_eq!(config.remote_timeout_secs, 5);
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();
        assert!(apply(&mut config, "remote_timeout_secs", "soon").is_err());
        assert!(apply(&mut config, "remote_timeout_secs", "0").is_err());
        assert!(apply(&mut config, "sync_url", "x").is_err());
    }

    #[test]
    fn test_set_writes_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let data_dir = temp_dir.path().join("data");
        std::fs::write(&path, format!("data_dir = {:?}\n", data_dir.display().to_string()))
            .unwrap();
        let output = Output::new(OutputFormat::Quiet);

        set(
            "remote_timeout_secs".to_string(),
            "12".to_string(),
            Some(&path),
            &output,
        )
        .unwrap();

        let saved = Config::load_from_path(&path).unwrap();
        assert_eq!(saved.remote_timeout_secs, 12);
    }
}
