use super::Config;

pub fn default_config() -> Config {
    Config {
        docker_image: "numbox/session:latest".to_string(),
        mem_limit: 1 << 30,
        backup_location: "~/.numbox/backups".to_string(),
        backup_bucket: None,
        admin_users: vec![],
        protected_sessions: vec![],
    }
}

pub fn get_default_config_dir() -> std::path::PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "numbox") {
        proj_dirs.config_dir().to_path_buf()
    } else {
        // Fallback for rare case where directories crate fails
        std::path::PathBuf::from(".").join(".config").join("numbox")
    }
}

/// Mandatory configuration document.
pub fn get_config_file_path() -> std::path::PathBuf {
    get_default_config_dir().join("numbox.conf")
}

/// Optional per-user overrides, applied key-by-key over the main
/// document.
pub fn get_user_config_file_path() -> std::path::PathBuf {
    get_default_config_dir().join("numbox.user")
}
