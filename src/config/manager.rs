use super::defaults::{default_config, get_config_file_path, get_user_config_file_path};
use super::{Config, ConfigError, Result};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::utils::ensure_dir;

pub struct ConfigManager;

impl ConfigManager {
    pub fn get_config_path() -> String {
        get_config_file_path().to_string_lossy().to_string()
    }

    /// Load the main document and the optional user overrides document,
    /// creating a default main document on first run.
    pub fn load_or_create() -> Result<Config> {
        let config_path = get_config_file_path();
        if !config_path.exists() {
            let config = default_config();
            config.validate()?;
            Self::save_to_path(&config, &config_path)?;
            return Ok(config);
        }
        Self::load_with_paths(&config_path, Some(&get_user_config_file_path()))
    }

    /// Load from explicit paths. `user_path` is skipped when absent;
    /// when present its top-level keys override the main document's.
    pub fn load_with_paths(main_path: &Path, user_path: Option<&Path>) -> Result<Config> {
        let mut document: Value = serde_json::from_str(&fs::read_to_string(main_path)?)?;

        if let Some(user_path) = user_path {
            if user_path.exists() {
                let overrides: Value = serde_json::from_str(&fs::read_to_string(user_path)?)?;
                merge_overrides(&mut document, overrides)?;
            }
        }

        let config: Config = serde_json::from_value(document)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(config: &Config) -> Result<()> {
        Self::save_to_path(config, &get_config_file_path())
    }

    pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let mut file = fs::File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Apply `overrides` onto `document` key-by-key at the top level. Both
/// documents must be JSON objects.
fn merge_overrides(document: &mut Value, overrides: Value) -> Result<()> {
    let (Value::Object(base), Value::Object(extra)) = (document, overrides) else {
        return Err(ConfigError::Validation(
            "configuration documents must be JSON objects".to_string(),
        ));
    };
    for (key, value) in extra {
        base.insert(key, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_json(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    const MAIN: &str = r#"{
        "docker_image": "numbox/session:latest",
        "mem_limit": 1073741824,
        "backup_location": "/var/numbox/backups",
        "backup_bucket": "numbox-backups",
        "admin_users": ["admin@example.com"],
        "protected_sessions": []
    }"#;

    #[test]
    fn test_load_without_overrides() {
        let dir = TempDir::new().unwrap();
        let main = write_json(&dir, "numbox.conf", MAIN);

        let config = ConfigManager::load_with_paths(&main, None).unwrap();
        assert_eq!(config.docker_image, "numbox/session:latest");
        assert_eq!(config.backup_bucket.as_deref(), Some("numbox-backups"));
    }

    #[test]
    fn test_user_overrides_win_key_by_key() {
        let dir = TempDir::new().unwrap();
        let main = write_json(&dir, "numbox.conf", MAIN);
        let user = write_json(
            &dir,
            "numbox.user",
            r#"{"mem_limit": 536870912, "protected_sessions": ["root@host"]}"#,
        );

        let config = ConfigManager::load_with_paths(&main, Some(&user)).unwrap();
        // Overridden keys
        assert_eq!(config.mem_limit, 536870912);
        assert_eq!(config.protected_sessions, vec!["root@host"]);
        // Untouched keys survive
        assert_eq!(config.docker_image, "numbox/session:latest");
        assert_eq!(config.admin_users, vec!["admin@example.com"]);
    }

    #[test]
    fn test_missing_user_document_is_fine() {
        let dir = TempDir::new().unwrap();
        let main = write_json(&dir, "numbox.conf", MAIN);
        let absent = dir.path().join("numbox.user");

        let config = ConfigManager::load_with_paths(&main, Some(&absent)).unwrap();
        assert_eq!(config.mem_limit, 1073741824);
    }

    #[test]
    fn test_malformed_document_is_rejected() {
        let dir = TempDir::new().unwrap();
        let main = write_json(&dir, "numbox.conf", "mem_limit = 12");
        assert!(ConfigManager::load_with_paths(&main, None).is_err());
    }

    #[test]
    fn test_invalid_merged_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let main = write_json(&dir, "numbox.conf", MAIN);
        let user = write_json(&dir, "numbox.user", r#"{"mem_limit": 0}"#);
        assert!(ConfigManager::load_with_paths(&main, Some(&user)).is_err());
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("numbox.conf");

        let config = crate::config::defaults::default_config();
        ConfigManager::save_to_path(&config, &path).unwrap();

        let loaded = ConfigManager::load_with_paths(&path, None).unwrap();
        assert_eq!(loaded.docker_image, config.docker_image);
    }
}
