//! Filesystem path helpers shared by the staging and config layers

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Expand a leading `~` to the current user's home directory.
///
/// Paths without a tilde prefix are returned unchanged, as are paths for
/// which no home directory can be resolved.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(base) = directories::BaseDirs::new() {
            return base.home_dir().to_path_buf();
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(base) = directories::BaseDirs::new() {
            return base.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}

/// Create a directory and all parents, tolerating a directory that already
/// exists.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Create a directory with the given mode. The mode is only applied when
/// this call actually creates the directory; an existing directory keeps
/// its permissions.
pub fn ensure_dir_mode(path: &Path, mode: u32) -> io::Result<()> {
    let created = !path.exists();
    ensure_dir(path)?;
    if created {
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expand_tilde_plain_path() {
        assert_eq!(expand_tilde("/var/numbox"), PathBuf::from("/var/numbox"));
        assert_eq!(expand_tilde("relative/dir"), PathBuf::from("relative/dir"));
    }

    #[test]
    fn test_expand_tilde_home_prefix() {
        let expanded = expand_tilde("~/backups");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("backups"));
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("a").join("b");

        ensure_dir(&target).unwrap();
        assert!(target.is_dir());

        // Second call must not fail
        ensure_dir(&target).unwrap();
    }

    #[test]
    fn test_ensure_dir_mode_sets_mode_on_creation() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("mount");

        ensure_dir_mode(&target, 0o777).unwrap();
        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o777);
    }

    #[test]
    fn test_ensure_dir_mode_keeps_existing_permissions() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("mount");

        ensure_dir_mode(&target, 0o700).unwrap();
        ensure_dir_mode(&target, 0o777).unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
