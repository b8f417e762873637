use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigurationError;

use super::paths::ConfigPaths;
use super::types::AppConfig;

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub paths: ConfigPaths,
    pub config_exists: bool,
}

/// Loads `config.toml`, falling back to defaults when it does not exist.
pub fn load_config(path_override: Option<PathBuf>) -> Result<LoadedConfig, ConfigurationError> {
    let paths = ConfigPaths::resolve(path_override)?;
    let (config, config_exists) = read_config(&paths.config_file)?;
    if config_exists {
        secure_file_permissions(&paths.config_file)?;
        log::debug!("Loaded config from {}", paths.config_file.display());
    }
    Ok(LoadedConfig {
        config,
        paths,
        config_exists,
    })
}

fn read_config(path: &Path) -> Result<(AppConfig, bool), ConfigurationError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok((toml::from_str(&contents)?, true)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok((AppConfig::default(), false)),
        Err(err) => Err(err.into()),
    }
}

/// Tightens group/other permissions on files that may hold secrets.
pub fn secure_file_permissions(path: &Path) -> Result<(), ConfigurationError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = fs::metadata(path) {
            let mut perms = metadata.permissions();
            if perms.mode() & 0o077 != 0 {
                perms.set_mode(0o600);
                fs::set_permissions(path, perms)?;
            }
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
