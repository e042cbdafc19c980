//! Configuration handling
use std::{
    fs::{create_dir_all, read_to_string, File},
    io::Write,
    path::PathBuf,
};

use home::home_dir;
use serde::{Deserialize, Serialize};

use crate::{cli::MigraCli, errors::MigraError};

/// Destination host used when the config file does not name one.
const DEFAULT_HOST: &str = "github.com";

/// Configuration data
#[derive(Deserialize, Default, Clone, Debug)]
pub struct MigraConfig {
    /// path to the configuration file
    pub config_path: PathBuf,

    /// actual configuration data
    pub config_data: ConfigData,

    /// CLI arguments
    pub cli_args: MigraCli,
}

/// Contents of the configuration file
#[derive(Deserialize, Serialize, Default, Clone, Debug)]
pub struct ConfigData {
    /// Default cap on concurrent migrations
    pub jobs: Option<usize>,

    /// Destination host for push URLs and rewritten submodule references
    pub host: Option<String>,
}

impl MigraConfig {
    /// Create a new Config object from the default path
    /// # Errors
    /// Error if the config file can't be opened or parsed
    pub fn try_new(cli_args: MigraCli) -> Result<Self, MigraError> {
        let config_path = match cli_args.config.clone() {
            Some(p) => p,
            None => Self::get_config_path()?,
        };
        let contents = read_to_string(config_path.clone())
            .map_err(|e| MigraError::new_with_source("Unable to open config", e))?;
        let config_data = toml::from_str(&contents)?;
        Ok(Self {
            config_path,
            cli_args,
            config_data,
        })
    }

    /// Get the path to the config file
    /// # Errors
    /// Error if the home directory can't be found
    pub fn get_config_path() -> Result<PathBuf, MigraError> {
        let home_dir = match home_dir() {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => return Err("Unable to get your home dir! home::home_dir() isn't working".into()),
        };
        let config_directory = home_dir.join(".config").join(".migra");
        let config_path = config_directory.join("config.toml");
        create_dir_all(config_directory)
            .map_err(|e| MigraError::new_with_source("Unable to create config dir", e))?;
        if !config_path.exists() {
            let mut file = File::create(&config_path)
                .map_err(|e| MigraError::new_with_source("Unable to create config file", e))?;
            file.write_all(b"")
                .map_err(|e| MigraError::new_with_source("Unable to write to config file", e))?;
        }
        Ok(config_path)
    }

    /// Target owner the repositories are created under
    pub fn owner(&self) -> &str {
        &self.cli_args.owner
    }

    /// Cap on concurrent migrations; `None` means one worker per repository
    pub fn jobs(&self) -> Option<usize> {
        self.cli_args.jobs.or(self.config_data.jobs)
    }

    /// Destination host for push URLs and rewritten submodule references
    pub fn host(&self) -> String {
        self.config_data
            .host
            .clone()
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
    }

    /// Source host string to rewrite in submodule configurations
    pub fn rewrite_from(&self) -> Option<&str> {
        self.cli_args.rewrite_from.as_deref()
    }
}
