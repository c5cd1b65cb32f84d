use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::session::names::{runtime_name, safe_name};
use crate::utils::expand_tilde;

pub mod defaults;
pub mod manager;
pub mod validation;

pub use manager::ConfigManager;

/// Startup configuration for the lifecycle manager.
///
/// Loaded from one mandatory JSON document plus an optional user
/// overrides document applied key-by-key (see [`ConfigManager`]).
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Image reference for new session containers.
    pub docker_image: String,

    /// Per-container memory cap in bytes.
    pub mem_limit: u64,

    /// Staging root for backup artifacts and mount points;
    /// tilde-expanded.
    pub backup_location: String,

    /// Object-store bucket for backups; absent means local-only backup.
    #[serde(default)]
    pub backup_bucket: Option<String>,

    /// Raw session names of administrative users.
    #[serde(default)]
    pub admin_users: Vec<String>,

    /// Raw session names whose containers maintenance never touches.
    #[serde(default)]
    pub protected_sessions: Vec<String>,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Json(e) => write!(f, "JSON error: {}", e),
            ConfigError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(error: std::io::Error) -> Self {
        ConfigError::Io(error)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        ConfigError::Json(error)
    }
}

impl Config {
    pub fn load_or_create() -> Result<Self> {
        ConfigManager::load_or_create()
    }

    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Tilde-expanded staging root.
    pub fn staging_root(&self) -> PathBuf {
        expand_tilde(&self.backup_location)
    }

    /// Safe-form names of administrative users' sessions.
    pub fn admin_session_names(&self) -> Vec<String> {
        self.admin_users.iter().map(|u| safe_name(u)).collect()
    }

    /// Runtime-form container names of protected sessions.
    pub fn protected_container_names(&self) -> Vec<String> {
        self.protected_sessions
            .iter()
            .map(|s| runtime_name(s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precomputed_name_forms() {
        let config = Config {
            docker_image: "numbox/session:latest".to_string(),
            mem_limit: 1 << 30,
            backup_location: "/var/numbox".to_string(),
            backup_bucket: None,
            admin_users: vec!["admin@example.com".to_string()],
            protected_sessions: vec!["root@host".to_string()],
        };

        assert_eq!(config.admin_session_names(), vec!["admin_at_example_com"]);
        assert_eq!(config.protected_container_names(), vec!["/root_at_host"]);
    }

    #[test]
    fn test_optional_keys_default() {
        let config: Config = serde_json::from_str(
            r#"{
                "docker_image": "numbox/session:latest",
                "mem_limit": 1073741824,
                "backup_location": "~/.numbox/backups"
            }"#,
        )
        .unwrap();

        assert_eq!(config.backup_bucket, None);
        assert!(config.admin_users.is_empty());
        assert!(config.protected_sessions.is_empty());
    }
}
