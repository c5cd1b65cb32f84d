//! In-memory runtime double used by the test suite
//!
//! Mirrors the observable behavior of the Docker CLI adapter closely
//! enough for lifecycle, sweep, and backup tests: name conflicts on
//! create, host ports assigned at start, remove refusing a running
//! container, and runtime-style ISO timestamps (including the zero value
//! for "never").

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::error::{RuntimeError, RuntimeResult};
use super::types::{
    ContainerDetails, ContainerSummary, CreateSpec, ImageSummary, PortBinding,
};
use super::ContainerRuntime;

const NEVER: &str = "0001-01-01T00:00:00Z";

#[derive(Debug, Clone)]
struct MockContainer {
    details: ContainerDetails,
    declared_ports: Vec<u16>,
    snapshot: Vec<u8>,
}

#[derive(Clone, Default)]
pub struct MockRuntime {
    containers: Arc<Mutex<HashMap<String, MockContainer>>>,
    images: Arc<Mutex<Vec<ImageSummary>>>,
    next_host_port: Arc<Mutex<u16>>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            containers: Arc::new(Mutex::new(HashMap::new())),
            images: Arc::new(Mutex::new(Vec::new())),
            next_host_port: Arc::new(Mutex::new(49000)),
        }
    }

    fn runtime_form(name: &str) -> String {
        if name.starts_with('/') {
            name.to_string()
        } else {
            format!("/{name}")
        }
    }

    fn now_iso() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    fn iso(when: DateTime<Utc>) -> String {
        when.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    /// Runtime id of the container with the given (safe or runtime-form)
    /// name.
    pub fn id_of(&self, name: &str) -> Option<String> {
        let target = Self::runtime_form(name);
        let containers = self.containers.lock().unwrap();
        containers
            .values()
            .find(|c| c.details.name.as_deref() == Some(target.as_str()))
            .map(|c| c.details.id.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.id_of(name).is_some()
    }

    pub fn is_running(&self, name: &str) -> bool {
        let target = Self::runtime_form(name);
        let containers = self.containers.lock().unwrap();
        containers
            .values()
            .any(|c| c.details.name.as_deref() == Some(target.as_str()) && c.details.state.running)
    }

    /// Runtime-form names of every container, running or not.
    pub fn container_names(&self) -> Vec<String> {
        let containers = self.containers.lock().unwrap();
        containers
            .values()
            .filter_map(|c| c.details.name.clone())
            .collect()
    }

    pub fn set_started_at(&self, name: &str, when: DateTime<Utc>) {
        self.with_container(name, |c| {
            c.details.state.started_at = Some(Self::iso(when));
        });
    }

    pub fn set_finished_at(&self, name: &str, when: DateTime<Utc>) {
        self.with_container(name, |c| {
            c.details.state.finished_at = Some(Self::iso(when));
        });
    }

    pub fn set_running(&self, name: &str, running: bool) {
        self.with_container(name, |c| {
            c.details.state.running = running;
        });
    }

    /// Tar bytes returned by the next `snapshot` call for this container.
    pub fn set_snapshot(&self, name: &str, data: Vec<u8>) {
        self.with_container(name, |c| {
            c.snapshot = data;
        });
    }

    pub fn add_image(&self, id: &str, tags: &[&str]) {
        let mut images = self.images.lock().unwrap();
        images.push(ImageSummary {
            id: id.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        });
    }

    /// Insert a container verbatim, bypassing create semantics. Used to
    /// model oddities like unnamed containers.
    pub fn insert_raw(&self, details: ContainerDetails) {
        let mut containers = self.containers.lock().unwrap();
        containers.insert(
            details.id.clone(),
            MockContainer {
                details,
                declared_ports: Vec::new(),
                snapshot: Vec::new(),
            },
        );
    }

    fn with_container<F: FnOnce(&mut MockContainer)>(&self, name: &str, f: F) {
        let target = Self::runtime_form(name);
        let mut containers = self.containers.lock().unwrap();
        if let Some(container) = containers
            .values_mut()
            .find(|c| c.details.name.as_deref() == Some(target.as_str()))
        {
            f(container);
        }
    }
}

impl ContainerRuntime for MockRuntime {
    fn create(&self, spec: &CreateSpec) -> RuntimeResult<String> {
        let runtime_name = Self::runtime_form(&spec.name);
        let mut containers = self.containers.lock().unwrap();

        if containers
            .values()
            .any(|c| c.details.name.as_deref() == Some(runtime_name.as_str()))
        {
            return Err(RuntimeError::Conflict {
                name: spec.name.clone(),
            });
        }

        let id = format!("mock-{}", uuid::Uuid::new_v4());
        let details = ContainerDetails {
            id: id.clone(),
            name: Some(runtime_name),
            image: spec.image.clone(),
            created: Some(Self::now_iso()),
            state: super::types::ContainerState {
                running: false,
                started_at: Some(NEVER.to_string()),
                finished_at: Some(NEVER.to_string()),
            },
            network_settings: Default::default(),
        };
        containers.insert(
            id.clone(),
            MockContainer {
                details,
                declared_ports: spec.ports.clone(),
                snapshot: Vec::new(),
            },
        );
        Ok(id)
    }

    fn start(&self, id: &str) -> RuntimeResult<()> {
        let mut containers = self.containers.lock().unwrap();
        let container = containers.get_mut(id).ok_or_else(|| RuntimeError::NotFound {
            name: id.to_string(),
        })?;
        if container.details.state.running {
            return Ok(());
        }
        container.details.state.running = true;
        container.details.state.started_at = Some(Self::now_iso());

        let mut next_port = self.next_host_port.lock().unwrap();
        for port in container.declared_ports.clone() {
            let binding = PortBinding {
                host_ip: "127.0.0.1".to_string(),
                host_port: next_port.to_string(),
            };
            *next_port += 1;
            container
                .details
                .network_settings
                .ports
                .insert(format!("{port}/tcp"), Some(vec![binding]));
        }
        Ok(())
    }

    fn stop(&self, id: &str) -> RuntimeResult<()> {
        let mut containers = self.containers.lock().unwrap();
        let container = containers.get_mut(id).ok_or_else(|| RuntimeError::NotFound {
            name: id.to_string(),
        })?;
        if container.details.state.running {
            container.details.state.running = false;
            container.details.state.finished_at = Some(Self::now_iso());
        }
        Ok(())
    }

    fn kill(&self, id: &str) -> RuntimeResult<()> {
        self.stop(id)
    }

    fn remove(&self, id: &str) -> RuntimeResult<()> {
        let mut containers = self.containers.lock().unwrap();
        match containers.get(id) {
            Some(container) if container.details.state.running => {
                Err(RuntimeError::CommandFailed {
                    command: "rm".to_string(),
                    stderr: format!("cannot remove running container {id}"),
                })
            }
            Some(_) => {
                containers.remove(id);
                Ok(())
            }
            None => Err(RuntimeError::NotFound {
                name: id.to_string(),
            }),
        }
    }

    fn inspect(&self, id: &str) -> RuntimeResult<ContainerDetails> {
        let containers = self.containers.lock().unwrap();
        containers
            .get(id)
            .map(|c| c.details.clone())
            .ok_or_else(|| RuntimeError::NotFound {
                name: id.to_string(),
            })
    }

    fn list(&self, include_stopped: bool) -> RuntimeResult<Vec<ContainerSummary>> {
        let containers = self.containers.lock().unwrap();
        Ok(containers
            .values()
            .filter(|c| include_stopped || c.details.state.running)
            .map(|c| ContainerSummary {
                id: c.details.id.clone(),
                names: c.details.name.clone().into_iter().collect(),
            })
            .collect())
    }

    fn snapshot(&self, id: &str, _path: &str) -> RuntimeResult<Vec<u8>> {
        let containers = self.containers.lock().unwrap();
        containers
            .get(id)
            .map(|c| c.snapshot.clone())
            .ok_or_else(|| RuntimeError::NotFound {
                name: id.to_string(),
            })
    }

    fn images(&self) -> RuntimeResult<Vec<ImageSummary>> {
        Ok(self.images.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::runtime::types::BindMount;

    fn spec(name: &str) -> CreateSpec {
        CreateSpec {
            image: "numbox/session:test".to_string(),
            name: name.to_string(),
            mem_limit: 1 << 30,
            ports: vec![4200, 8000],
            binds: vec![BindMount {
                host: "/tmp/numbox/u".into(),
                container: "/numbox".to_string(),
            }],
        }
    }

    #[test]
    fn test_create_conflicts_on_duplicate_name() {
        let runtime = MockRuntime::new();
        runtime.create(&spec("u")).unwrap();
        let err = runtime.create(&spec("u")).unwrap_err();
        assert!(matches!(err, RuntimeError::Conflict { .. }));
    }

    #[test]
    fn test_start_assigns_loopback_ports() {
        let runtime = MockRuntime::new();
        let id = runtime.create(&spec("u")).unwrap();
        runtime.start(&id).unwrap();

        let details = runtime.inspect(&id).unwrap();
        assert!(details.state.running);
        assert!(details.host_port(4200).is_some());
        assert!(details.host_port(8000).is_some());
        assert_ne!(details.host_port(4200), details.host_port(8000));
    }

    #[test]
    fn test_remove_refuses_running_container() {
        let runtime = MockRuntime::new();
        let id = runtime.create(&spec("u")).unwrap();
        runtime.start(&id).unwrap();
        assert!(runtime.remove(&id).is_err());

        runtime.kill(&id).unwrap();
        runtime.remove(&id).unwrap();
        assert!(!runtime.contains("u"));
    }

    #[test]
    fn test_list_filters_stopped_containers() {
        let runtime = MockRuntime::new();
        let id = runtime.create(&spec("u")).unwrap();
        assert_eq!(runtime.list(false).unwrap().len(), 0);
        assert_eq!(runtime.list(true).unwrap().len(), 1);

        runtime.start(&id).unwrap();
        assert_eq!(runtime.list(false).unwrap().len(), 1);
    }
}
