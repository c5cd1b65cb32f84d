use super::{Config, ConfigError, Result};

pub fn validate_config(config: &Config) -> Result<()> {
    if config.docker_image.trim().is_empty() {
        return Err(ConfigError::Validation(
            "docker_image must not be empty".to_string(),
        ));
    }
    if config.mem_limit == 0 {
        return Err(ConfigError::Validation(
            "mem_limit must be greater than zero".to_string(),
        ));
    }
    if config.backup_location.trim().is_empty() {
        return Err(ConfigError::Validation(
            "backup_location must not be empty".to_string(),
        ));
    }
    if let Some(bucket) = &config.backup_bucket {
        if bucket.trim().is_empty() {
            return Err(ConfigError::Validation(
                "backup_bucket must not be empty when set".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::default_config;

    #[test]
    fn test_valid_config_passes() {
        validate_config(&default_config()).unwrap();
    }

    #[test]
    fn test_empty_image_rejected() {
        let mut config = default_config();
        config.docker_image = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_mem_limit_rejected() {
        let mut config = default_config();
        config.mem_limit = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_backup_location_rejected() {
        let mut config = default_config();
        config.backup_location = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_bucket_rejected() {
        let mut config = default_config();
        config.backup_bucket = Some(String::new());
        assert!(validate_config(&config).is_err());
    }
}
