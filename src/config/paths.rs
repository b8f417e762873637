use std::path::PathBuf;

use crate::error::ConfigurationError;

const APP_DIR: &str = "poetry-duet";

/// Where the config file, secrets file and logs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub config_file: PathBuf,
    pub secrets_file: PathBuf,
    pub config_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl ConfigPaths {
    /// Default locations, or the directory of `config_override` when given.
    pub fn resolve(config_override: Option<PathBuf>) -> Result<Self, ConfigurationError> {
        let (config_dir, config_file) = match config_override {
            Some(path) => {
                let dir = path
                    .parent()
                    .map(PathBuf::from)
                    .ok_or_else(missing_home)?;
                (dir, path)
            }
            None => {
                let dir = default_config_dir()?;
                let file = dir.join("config.toml");
                (dir, file)
            }
        };
        Ok(Self {
            secrets_file: config_dir.join("secrets.json"),
            logs_dir: default_data_dir()?.join("logs"),
            config_file,
            config_dir,
        })
    }
}

fn missing_home() -> ConfigurationError {
    ConfigurationError::ConfigFile("missing home directory for config paths".into())
}

fn default_config_dir() -> Result<PathBuf, ConfigurationError> {
    let home = dirs::home_dir().ok_or_else(missing_home)?;
    Ok(home.join(".config").join(APP_DIR))
}

fn default_data_dir() -> Result<PathBuf, ConfigurationError> {
    let home = dirs::home_dir().ok_or_else(missing_home)?;
    Ok(home.join(".local").join("share").join(APP_DIR))
}
