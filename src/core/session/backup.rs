//! Backup and restore of session home directories
//!
//! A backup is a gzipped tar of the user home tree inside the container,
//! staged locally and tiered to the object store when one is configured.
//! Freshness is decided by timestamp: a stopped container's snapshot
//! stays valid until the container runs again, so repeated sweeps over a
//! quiet fleet upload nothing.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::store::ObjectStore;
use crate::utils::{ensure_dir_mode, mtime_to_utc, parse_runtime_time};

use super::container::SessionContainer;
use super::HOME_DIR;

/// Tar entry prefix of the in-container user home; stripped from every
/// restored entry.
pub const ARCHIVE_PREFIX: &str = "juser/";

/// Name of the filtered archive a starting container unpacks.
pub const RESTORE_FILE: &str = "restore.tar.gz";

/// What a backup call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupOutcome {
    /// Container had no name to key the artifact by.
    Skipped,
    /// Prior snapshot is at least as new as the container's last state
    /// transition.
    Current,
    /// A new artifact was written; `uploaded` tells whether it moved to
    /// the object store or stayed in staging.
    Stored { uploaded: bool },
}

pub struct BackupEngine {
    staging: PathBuf,
    store: Option<Arc<dyn ObjectStore>>,
    tz_offset_secs: i64,
}

impl BackupEngine {
    pub fn new(staging: PathBuf, store: Option<Arc<dyn ObjectStore>>, tz_offset_secs: i64) -> Self {
        Self {
            staging,
            store,
            tz_offset_secs,
        }
    }

    pub fn staging(&self) -> &Path {
        &self.staging
    }

    /// Snapshot one container's home tree if it is newer than the prior
    /// snapshot.
    pub fn backup(&self, cont: &mut SessionContainer) -> Result<BackupOutcome> {
        let Some(session) = cont.session_name()? else {
            debug!("Skipping backup of unnamed container {}", cont.id());
            return Ok(BackupOutcome::Skipped);
        };

        let key = format!("{session}.tar.gz");
        let local = self.staging.join(&key);

        if let Some(prior) = self.prior_snapshot_time(&local, &key)? {
            if self.change_time(cont)?.map_or(true, |change| change <= prior) {
                debug!("Already backed up {}", cont.describe());
                return Ok(BackupOutcome::Current);
            }
        }

        let data = cont
            .snapshot(HOME_DIR)
            .with_context(|| format!("snapshot of {} failed", cont.id()))?;
        if let Err(err) = write_gzip(&local, &data) {
            // No partial artifact may survive a failed write
            let _ = fs::remove_file(&local);
            return Err(err).with_context(|| format!("writing {}", local.display()));
        }
        info!("Backed up {} into {}", cont.describe(), local.display());

        let backup_time = mtime_to_utc(&fs::metadata(&local)?, self.tz_offset_secs)
            .with_context(|| format!("unreadable mtime on {}", local.display()))?;

        let Some(store) = &self.store else {
            return Ok(BackupOutcome::Stored { uploaded: false });
        };
        match store.put(&local, &backup_time.to_rfc3339_opts(SecondsFormat::Secs, true)) {
            Ok(()) => {
                fs::remove_file(&local)?;
                info!("Moved backup of {session} to object store");
                Ok(BackupOutcome::Stored { uploaded: true })
            }
            Err(err) => {
                // Artifact stays in staging for the next sweep
                warn!("Upload of {key} failed, keeping local copy: {err}");
                Ok(BackupOutcome::Stored { uploaded: false })
            }
        }
    }

    /// Prepare `<staging>/<session>/restore.tar.gz` from the most recent
    /// backup artifact, if any exists.
    pub fn prepare_restore(&self, session: &str) -> Result<()> {
        let mount = self.staging.join(session);
        ensure_dir_mode(&mount, 0o777)
            .with_context(|| format!("creating mount point {}", mount.display()))?;

        let key = format!("{session}.tar.gz");
        let src = self.staging.join(&key);
        let from_store = match &self.store {
            Some(store) => match store.get(&key, &src) {
                Ok(found) => found,
                Err(err) => {
                    // Proceed as if no remote backup existed
                    warn!("Restore download of {key} failed: {err}");
                    false
                }
            },
            None => false,
        };

        if !src.exists() {
            debug!("No backup artifact for {session}; starting with a fresh home");
            return Ok(());
        }

        let dest = mount.join(RESTORE_FILE);
        info!(
            "Filtering restore archive {} -> {}",
            src.display(),
            dest.display()
        );
        filter_restore_archive(&src, &dest)?;
        fs::set_permissions(&dest, fs::Permissions::from_mode(0o666))?;

        // The staging copy is redundant once the store holds the artifact
        if from_store {
            fs::remove_file(&src)?;
        }
        Ok(())
    }

    fn prior_snapshot_time(&self, local: &Path, key: &str) -> Result<Option<DateTime<Utc>>> {
        if local.exists() {
            return Ok(mtime_to_utc(&fs::metadata(local)?, self.tz_offset_secs));
        }
        let Some(store) = &self.store else {
            return Ok(None);
        };
        Ok(store
            .head(key)?
            .and_then(|meta| meta.backup_time)
            .as_deref()
            .and_then(parse_runtime_time))
    }

    /// Instant of the container's most recent state transition. Never
    /// started falls back to the creation time.
    fn change_time(&self, cont: &mut SessionContainer) -> Result<Option<DateTime<Utc>>> {
        let started = cont.time_started()?;
        let finished = cont.time_finished()?;
        Ok(match (started, finished) {
            (Some(s), Some(f)) => Some(s.max(f)),
            (Some(s), None) => Some(s),
            (None, _) => cont.time_created()?,
        })
    }
}

fn write_gzip(path: &Path, data: &[u8]) -> Result<()> {
    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(data)?;
    encoder.finish()?;
    Ok(())
}

/// Copy `src` to `dest`, keeping only entries a restored home should
/// contain and stripping the user-home prefix from each name.
pub fn filter_restore_archive(src: &Path, dest: &Path) -> Result<()> {
    let reader = File::open(src).with_context(|| format!("opening {}", src.display()))?;
    let mut archive = tar::Archive::new(GzDecoder::new(reader));

    let writer = File::create(dest).with_context(|| format!("creating {}", dest.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(writer, Compression::default()));

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().into_owned();
        let Some(stripped) = filter_entry_name(&name) else {
            continue;
        };
        let mut header = entry.header().clone();
        builder.append_data(&mut header, stripped, &mut entry)?;
    }

    builder.into_inner()?.finish()?;
    Ok(())
}

/// Decide whether a backup entry survives the restore filter; returns
/// its name with the user-home prefix stripped.
///
/// Dotfiles are dropped (shell history, editor state) except the `.ssh`
/// tree, which carries authorized keys. `resty` holds transient runtime
/// state and is never restored.
pub fn filter_entry_name(name: &str) -> Option<String> {
    let stripped = name.strip_prefix(ARCHIVE_PREFIX)?;
    if stripped.is_empty() {
        return None;
    }
    if stripped.starts_with('.') && !stripped.starts_with(".ssh") {
        return None;
    }
    if stripped.starts_with("resty") {
        return None;
    }
    Some(stripped.to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Build a gzipped home tar with the given regular-file entries.
    pub(crate) fn build_home_tar(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (name, contents) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, contents.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    /// Entry names of a gzipped tar.
    pub(crate) fn archive_names(data: &[u8]) -> Vec<String> {
        let mut archive = tar::Archive::new(GzDecoder::new(data));
        archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect()
    }
}
