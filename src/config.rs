use crate::error::PolicyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

pub const DEFAULT_GROUP_WAIT: &str = "30s";
pub const DEFAULT_GROUP_INTERVAL: &str = "5m";
pub const DEFAULT_REPEAT_INTERVAL: &str = "4h";

fn default_group_wait() -> String {
    DEFAULT_GROUP_WAIT.to_string()
}

fn default_group_interval() -> String {
    DEFAULT_GROUP_INTERVAL.to_string()
}

fn default_repeat_interval() -> String {
    DEFAULT_REPEAT_INTERVAL.to_string()
}

/// Values the inheritance resolver falls back to when no policy in the ancestry sets a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDefaults {
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default = "default_group_wait")]
    pub group_wait: String,
    #[serde(default = "default_group_interval")]
    pub group_interval: String,
    #[serde(default = "default_repeat_interval")]
    pub repeat_interval: String,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        PolicyDefaults {
            receiver: None,
            group_by: Vec::new(),
            group_wait: default_group_wait(),
            group_interval: default_group_interval(),
            repeat_interval: default_repeat_interval(),
        }
    }
}

pub trait DefaultsProvider: Send + Sync {
    fn get_defaults(&self) -> Result<PolicyDefaults, PolicyError>;
    fn set_defaults(&self, defaults: PolicyDefaults) -> Result<(), PolicyError>;
}

/// Reads and writes the `[defaults]` table of a TOML file.
#[derive(Debug, Serialize, Deserialize)]
pub struct TomlDefaultsProvider {
    path: PathBuf,
}

impl TomlDefaultsProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlDefaultsProvider { path }
    }
}

impl DefaultsProvider for TomlDefaultsProvider {
    fn get_defaults(&self) -> Result<PolicyDefaults, PolicyError> {
        tracing::debug!("Attempting to read policy defaults from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using built-in policy defaults.");
            return Ok(PolicyDefaults::default());
        }
        let content = read_to_string(&self.path)?;
        let config: BTreeMap<String, PolicyDefaults> = toml::from_str(&content)?;
        config
            .get("defaults")
            .cloned()
            .ok_or_else(|| PolicyError::NotFound("defaults not found in config".to_string()))
    }

    fn set_defaults(&self, defaults: PolicyDefaults) -> Result<(), PolicyError> {
        tracing::debug!("Attempting to write policy defaults to: {:?}", &self.path);
        let mut config = BTreeMap::new();
        config.insert("defaults".to_string(), defaults);
        let toml_string = toml::to_string(&config)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}

pub fn get_content<P: AsRef<Path>>(path: P) -> Result<String, PolicyError> {
    tracing::debug!("Reading {:?}", path.as_ref());
    Ok(read_to_string(path)?)
}
