//! Session lifecycle service
//!
//! Owns the injected runtime and store clients, the liveness registry,
//! and the staging root. Launch, stop, delete, and backup on one session
//! are serialized by a per-session advisory lock; the maintenance sweep
//! treats each container independently and never fails the pass for one
//! bad container.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::runtime::{BindMount, ContainerRuntime, CreateSpec, RuntimeError};
use crate::core::store::ObjectStore;
use crate::utils::{ensure_dir, local_tz_offset_secs};

use super::backup::{BackupEngine, BackupOutcome};
use super::container::SessionContainer;
use super::liveness::LivenessRegistry;
use super::names::{runtime_name, safe_name, session_from_runtime};
use super::{CNAME_TOKEN, SESSION_PORTS, SESSION_VOLUMES};

/// Policy knobs for one maintenance pass. Taken by value so callers
/// cannot alias the protected list into long-lived state.
#[derive(Debug, Clone, Default)]
pub struct MaintainParams {
    /// Hard cap on session age; zero disables deletion.
    pub delete_timeout: Duration,
    /// Idle window before a running session is stopped; zero disables.
    pub stop_timeout: Duration,
    /// Runtime-form container names the sweep never touches.
    pub protected_names: Vec<String>,
}

pub struct SessionManager {
    runtime: Arc<dyn ContainerRuntime>,
    backup: BackupEngine,
    liveness: LivenessRegistry,
    image: String,
    mem_limit: u64,
    host_volumes: Vec<String>,
    staging: PathBuf,
    session_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionManager {
    /// Build the manager from injected clients and configuration. The
    /// staging root is created here and exists for the process lifetime.
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        store: Option<Arc<dyn ObjectStore>>,
        config: &Config,
    ) -> Result<Self> {
        let staging = config.staging_root();
        ensure_dir(&staging)
            .with_context(|| format!("creating staging root {}", staging.display()))?;

        let host_volumes = vec![staging.join(CNAME_TOKEN).to_string_lossy().into_owned()];
        let tz_offset_secs = local_tz_offset_secs();

        Ok(Self {
            runtime,
            backup: BackupEngine::new(staging.clone(), store, tz_offset_secs),
            liveness: LivenessRegistry::new(),
            image: config.docker_image.clone(),
            mem_limit: config.mem_limit,
            host_volumes,
            staging,
            session_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn liveness(&self) -> &LivenessRegistry {
        &self.liveness
    }

    pub fn staging(&self) -> &std::path::Path {
        &self.staging
    }

    /// Record front-end activity for a session. Accepts raw or safe
    /// session names.
    pub fn record_ping(&self, session: &str) {
        self.liveness.record_ping(&safe_name(session));
    }

    /// Find the container for a session, if one exists.
    pub fn lookup_by_name(&self, session: &str) -> Result<Option<SessionContainer>> {
        let target = runtime_name(session);
        for summary in self.runtime.list(true)? {
            if summary.names.iter().any(|n| n == &target) {
                return Ok(Some(SessionContainer::new(
                    summary.id,
                    Arc::clone(&self.runtime),
                )));
            }
        }
        Ok(None)
    }

    /// Launch the container for a session, creating it if needed.
    /// `reuse=false` discards any existing container first.
    pub fn launch_by_name(&self, session: &str, reuse: bool) -> Result<SessionContainer> {
        let lock = self.session_lock(session);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        info!("Launching container for session {session}");

        let mut existing = self.lookup_by_name(session)?;
        if let Some(cont) = existing.take() {
            if reuse {
                existing = Some(cont);
            } else {
                self.delete_locked(cont)?;
            }
        }

        let mut cont = match existing {
            Some(cont) => cont,
            None => self.create_new(session)?,
        };

        if !cont.is_running()? {
            self.start_locked(&mut cont)?;
        }
        Ok(cont)
    }

    /// Stop a session's container if it is running.
    pub fn stop(&self, cont: &mut SessionContainer) -> Result<()> {
        let lock = self.lock_for(cont)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.stop_locked(cont)
    }

    /// Kill (if needed) and remove a session's container, dropping its
    /// liveness entry and mount point.
    pub fn delete(&self, mut cont: SessionContainer) -> Result<()> {
        let lock = self.lock_for(&mut cont)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.delete_locked(cont)
    }

    /// Back up one container's home tree (see [`BackupEngine::backup`]).
    pub fn backup(&self, cont: &mut SessionContainer) -> Result<BackupOutcome> {
        let lock = self.lock_for(cont)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.backup.backup(cont)
    }

    /// Back up every container; per-container failures are logged and
    /// the pass continues.
    pub fn backup_all(&self) -> Result<()> {
        info!("Starting container backup pass");
        for summary in self.runtime.list(true)? {
            let mut cont = SessionContainer::new(summary.id.clone(), Arc::clone(&self.runtime));
            if let Err(err) = self.backup(&mut cont) {
                warn!("Backup of container {} failed: {err:#}", summary.id);
            }
        }
        info!("Finished container backup pass");
        Ok(())
    }

    /// One maintenance pass: delete over-aged containers, stop idle
    /// ones, and reconcile the liveness registry with the observed
    /// container set.
    pub fn maintain(&self, params: MaintainParams) -> Result<()> {
        info!("Starting container maintenance");
        let now = Utc::now();
        let delete_before = deadline(now, params.delete_timeout);
        let stop_before = deadline(now, params.stop_timeout);

        let mut observed = HashSet::new();
        for summary in self.runtime.list(true)? {
            let id = summary.id.clone();
            if let Err(err) = self.maintain_one(
                summary.id,
                now,
                delete_before,
                stop_before,
                &params.protected_names,
                &mut observed,
            ) {
                warn!("Maintenance of container {id} failed: {err:#}");
            }
        }

        self.liveness.retain_names(&observed);
        info!("Finished container maintenance");
        Ok(())
    }

    /// Number of currently running session containers.
    pub fn active_count(&self) -> Result<usize> {
        Ok(self.runtime.list(false)?.len())
    }

    fn maintain_one(
        &self,
        id: String,
        now: DateTime<Utc>,
        delete_before: Option<DateTime<Utc>>,
        stop_before: Option<DateTime<Utc>>,
        protected_names: &[String],
        observed: &mut HashSet<String>,
    ) -> Result<()> {
        let mut cont = SessionContainer::new(id, Arc::clone(&self.runtime));
        let Some(name) = cont.name()? else {
            debug!("Ignoring unnamed {}", cont.describe());
            return Ok(());
        };
        let session = session_from_runtime(&name).to_string();
        observed.insert(session.clone());

        if protected_names.iter().any(|p| p == &name) {
            debug!("Ignoring protected {}", cont.describe());
            return Ok(());
        }

        let running = cont.is_running()?;
        let last_ping = self.liveness.last_ping(&session);

        // No ping record for a live container means the front-end was
        // restarted while the container survived
        if running && last_ping.is_none() {
            info!("Discovered running {}", cont.describe());
            self.liveness.record_ping_at(&session, now);
        }

        let started = cont.time_started()?.unwrap_or(DateTime::<Utc>::MIN_UTC);
        if let Some(deadline) = delete_before {
            if started < deadline {
                // Hard session lifetime wins over recent activity
                info!("Running beyond allowed time: {}", cont.describe());
                self.delete(cont)?;
                return Ok(());
            }
        }

        if running {
            if let (Some(deadline), Some(ping)) = (stop_before, last_ping) {
                if ping < deadline {
                    info!("Inactive beyond allowed time: {}", cont.describe());
                    self.stop(&mut cont)?;
                }
            }
        }
        Ok(())
    }

    fn create_new(&self, session: &str) -> Result<SessionContainer> {
        let safe = safe_name(session);

        self.backup
            .prepare_restore(&safe)
            .with_context(|| format!("preparing restore for {safe}"))?;

        let binds = self
            .host_volumes
            .iter()
            .zip(SESSION_VOLUMES)
            .map(|(template, container)| BindMount {
                host: PathBuf::from(template.replace(CNAME_TOKEN, &safe)),
                container: container.to_string(),
            })
            .collect();

        let spec = CreateSpec {
            image: self.image.clone(),
            name: safe.clone(),
            mem_limit: self.mem_limit,
            ports: SESSION_PORTS.to_vec(),
            binds,
        };

        let id = match self.runtime.create(&spec) {
            Ok(id) => id,
            // Someone else created it between lookup and create; adopt
            // theirs
            Err(RuntimeError::Conflict { .. }) => self
                .lookup_by_name(session)?
                .map(|cont| cont.id().to_string())
                .ok_or_else(|| anyhow!("container {safe} vanished after name conflict"))?,
            Err(err) => return Err(err.into()),
        };

        let mut cont = SessionContainer::new(id, Arc::clone(&self.runtime));
        info!("Created {}", cont.describe());
        Ok(cont)
    }

    fn start_locked(&self, cont: &mut SessionContainer) -> Result<()> {
        cont.refresh();
        if cont.is_running()? {
            debug!("Already started {}", cont.describe());
            return Ok(());
        }
        self.runtime.start(cont.id())?;
        cont.refresh();
        info!("Started {}", cont.describe());

        if let Some(session) = cont.session_name()? {
            self.liveness.record_ping(&session);
        }
        Ok(())
    }

    fn stop_locked(&self, cont: &mut SessionContainer) -> Result<()> {
        cont.refresh();
        if !cont.is_running()? {
            debug!("Already stopped {}", cont.describe());
            return Ok(());
        }
        self.runtime.stop(cont.id())?;
        cont.refresh();
        info!("Stopped {}", cont.describe());
        Ok(())
    }

    fn delete_locked(&self, mut cont: SessionContainer) -> Result<()> {
        cont.refresh();
        let session = cont.session_name()?;
        info!("Deleting {}", cont.describe());

        if cont.is_running()? {
            self.runtime.kill(cont.id())?;
            cont.refresh();
        }
        self.runtime.remove(cont.id())?;

        if let Some(session) = session {
            self.liveness.remove(&session);

            // Non-recursive on purpose: an un-uploaded backup left in
            // the mount point must survive for the next sweep
            let mount = self.staging.join(&session);
            match fs::remove_dir(&mount) {
                Ok(()) => info!("Removed mount point {}", mount.display()),
                Err(err) => {
                    warn!("Could not remove mount point {}: {err}", mount.display());
                }
            }
        }
        Ok(())
    }

    fn session_lock(&self, session: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .session_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(safe_name(session)).or_default())
    }

    fn lock_for(&self, cont: &mut SessionContainer) -> Result<Arc<Mutex<()>>> {
        let session = cont.session_name()?.unwrap_or_default();
        Ok(self.session_lock(&session))
    }
}

fn deadline(now: DateTime<Utc>, timeout: Duration) -> Option<DateTime<Utc>> {
    if timeout.is_zero() {
        return None;
    }
    let delta = chrono::Duration::from_std(timeout).ok()?;
    now.checked_sub_signed(delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_zero_timeout_disables() {
        assert_eq!(deadline(Utc::now(), Duration::ZERO), None);
    }

    #[test]
    fn test_deadline_subtracts_timeout() {
        let now = Utc::now();
        let before = deadline(now, Duration::from_secs(600)).unwrap();
        assert_eq!(now - before, chrono::Duration::seconds(600));
    }

    #[test]
    fn test_maintain_params_default_disables_both_policies() {
        let params = MaintainParams::default();
        assert!(params.delete_timeout.is_zero());
        assert!(params.stop_timeout.is_zero());
        assert!(params.protected_names.is_empty());
    }
}
