use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::tftp::client::config::ClientConfig;

/// Name of the optional configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".tftpc.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<ClientConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<ClientConfig>,
}

impl AppConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn generate_config_file(force: bool) -> anyhow::Result<()> {
        Self::write_config_file(Path::new(CONFIG_FILE), force)
    }

    pub fn write_config_file(path: &Path, force: bool) -> anyhow::Result<()> {
        if path.exists() && !force {
            anyhow::bail!(
                "Configuration file {} already exists. Use --force to overwrite.",
                path.display()
            );
        }

        fs::write(path, Self::generate_full_config()?)?;

        info!("Configuration file generated: {}", path.display());
        info!("Please edit this file to customize configuration");
        Ok(())
    }

    pub fn generate_full_config() -> anyhow::Result<String> {
        let config = AppConfig {
            get: Some(ClientConfig::new("127.0.0.1".to_string(), 69)),
            put: Some(ClientConfig::new("127.0.0.1".to_string(), 69)),
        };
        let toml_content = toml::to_string_pretty(&config)?;
        Ok(format!(
            "# tftpc configuration file\n# All fields are optional, command line arguments override config file values\n\n{}",
            toml_content
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_generated_config_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        AppConfig::write_config_file(&path, false).unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        let get = config.get.unwrap();
        assert_eq!(get.port, Some(69));
        assert_eq!(get.timeout, Some(Duration::from_millis(500)));
        assert_eq!(get.retries, Some(3));
    }

    #[test]
    fn test_existing_config_needs_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[get]\nport = 6969\n").unwrap();

        assert!(AppConfig::write_config_file(&path, false).is_err());
        assert_eq!(
            AppConfig::load_from_file(&path).unwrap().get.unwrap().port,
            Some(6969)
        );

        AppConfig::write_config_file(&path, true).unwrap();
        assert_eq!(
            AppConfig::load_from_file(&path).unwrap().get.unwrap().port,
            Some(69)
        );
    }

    #[test]
    fn test_sections_are_optional() {
        let config: AppConfig = toml::from_str("[put]\nserver = \"10.1.1.1\"\n").unwrap();
        assert!(config.get.is_none());
        assert_eq!(config.put.unwrap().server.as_deref(), Some("10.1.1.1"));
    }
}
