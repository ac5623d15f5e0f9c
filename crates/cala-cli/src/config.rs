//! Configuration management for the Cala CLI.

use anyhow::{Context, Result};
use cala::prelude::*;
use cala::runtime::loader::{DEFAULT_ENTRY_EXPORT, DEFAULT_MEMORY_EXPORT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "cala.toml";

/// Cala project configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub loader: LoaderSection,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderSection {
    #[serde(default = "default_module")]
    pub module: String,
    #[serde(default = "default_entry_export")]
    pub entry_export: String,
    #[serde(default = "default_memory_export")]
    pub memory_export: String,
    /// Resolve `module` against this origin instead of the filesystem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Wait for Enter after an alert when stdin is a terminal.
    #[serde(default = "default_alert_blocking")]
    pub alert_blocking: bool,
}

// Default value functions
fn default_module() -> String { "cala.wasm".to_string() }
fn default_entry_export() -> String { DEFAULT_ENTRY_EXPORT.to_string() }
fn default_memory_export() -> String { DEFAULT_MEMORY_EXPORT.to_string() }
fn default_alert_blocking() -> bool { true }

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LoaderSection {
    fn default() -> Self {
        Self {
            module: default_module(),
            entry_export: default_entry_export(),
            memory_export: default_memory_export(),
            origin: None,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            alert_blocking: default_alert_blocking(),
        }
    }
}

impl Config {
    /// Load config from cala.toml in the current or parent directories.
    pub fn load() -> Result<Self> {
        match find_config_file() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save config to the specified path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = Self::to_toml(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Loader settings, rejecting export names a module could never carry.
    pub fn loader_config(&self) -> std::result::Result<LoaderConfig, CalaError> {
        for (field, value) in [
            ("loader.entry_export", &self.loader.entry_export),
            ("loader.memory_export", &self.loader.memory_export),
        ] {
            if value.trim().is_empty() {
                return Err(CalaError::invalid_config(field, value.as_str(), "must not be empty"));
            }
        }
        Ok(LoaderConfig::default()
            .with_entry_export(self.loader.entry_export.clone())
            .with_memory_export(self.loader.memory_export.clone())
            .with_capabilities(self.capabilities))
    }

    pub fn identity(&self) -> HostIdentity {
        HostIdentity::new(self.host.user_agent.clone())
    }
}

/// Find cala.toml in current or parent directories.
fn find_config_file() -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}
