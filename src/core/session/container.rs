//! Handle over one session container
//!
//! Wraps a runtime-assigned container id together with a cached view of
//! the runtime-reported properties. The cache has no TTL; `refresh()`
//! invalidates it explicitly and accessors re-inspect lazily, so one
//! logical operation pays for at most one inspect. Handles do not own
//! the container; several handles for the same id are equivalent.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::core::runtime::{ContainerDetails, ContainerRuntime, RuntimeError, RuntimeResult};
use crate::utils::parse_runtime_time;

use super::names::session_from_runtime;
use super::SESSION_PORTS;

pub struct SessionContainer {
    id: String,
    runtime: Arc<dyn ContainerRuntime>,
    props: Option<ContainerDetails>,
    host_ports: Option<Vec<u16>>,
}

impl SessionContainer {
    pub fn new(id: impl Into<String>, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            id: id.into(),
            runtime,
            props: None,
            host_ports: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Drop the cached properties and port tuple; the next accessor
    /// re-fetches from the runtime.
    pub fn refresh(&mut self) {
        self.props = None;
        self.host_ports = None;
    }

    fn props(&mut self) -> RuntimeResult<&ContainerDetails> {
        if self.props.is_none() {
            self.props = Some(self.runtime.inspect(&self.id)?);
        }
        self.props
            .as_ref()
            .ok_or_else(|| RuntimeError::Malformed("inspect returned no properties".to_string()))
    }

    /// Runtime-form name (`/safe-session-name`), if the container is
    /// named.
    pub fn name(&mut self) -> RuntimeResult<Option<String>> {
        Ok(self.props()?.name.clone())
    }

    /// Safe session name, without the runtime's leading slash.
    pub fn session_name(&mut self) -> RuntimeResult<Option<String>> {
        Ok(self
            .props()?
            .name
            .as_deref()
            .map(|n| session_from_runtime(n).to_string()))
    }

    pub fn is_running(&mut self) -> RuntimeResult<bool> {
        Ok(self.props()?.state.running)
    }

    pub fn time_created(&mut self) -> RuntimeResult<Option<DateTime<Utc>>> {
        Ok(self
            .props()?
            .created
            .as_deref()
            .and_then(parse_runtime_time))
    }

    pub fn time_started(&mut self) -> RuntimeResult<Option<DateTime<Utc>>> {
        Ok(self
            .props()?
            .state
            .started_at
            .as_deref()
            .and_then(parse_runtime_time))
    }

    pub fn time_finished(&mut self) -> RuntimeResult<Option<DateTime<Utc>>> {
        Ok(self
            .props()?
            .state
            .finished_at
            .as_deref()
            .and_then(parse_runtime_time))
    }

    /// Host ports bound for the session's declared ports, in declared
    /// order. Fails if a declared port has no binding, which means the
    /// container is not started.
    pub fn host_ports(&mut self) -> RuntimeResult<Vec<u16>> {
        if let Some(ports) = &self.host_ports {
            return Ok(ports.clone());
        }
        let props = self.props()?;
        let mut ports = Vec::with_capacity(SESSION_PORTS.len());
        for port in SESSION_PORTS {
            let bound = props.host_port(port).ok_or_else(|| {
                RuntimeError::Malformed(format!("no host binding for port {port}"))
            })?;
            ports.push(bound);
        }
        self.host_ports = Some(ports.clone());
        Ok(ports)
    }

    /// Repo tags of the container's image.
    pub fn image_tags(&mut self) -> RuntimeResult<Vec<String>> {
        let image_id = self.props()?.image.clone();
        for image in self.runtime.images()? {
            if image.id == image_id {
                return Ok(image.tags);
            }
        }
        Ok(Vec::new())
    }

    /// Uncompressed tar stream of `path` inside the container.
    pub fn snapshot(&self, path: &str) -> RuntimeResult<Vec<u8>> {
        self.runtime.snapshot(&self.id, path)
    }

    /// Short description for log lines; swallows inspect failures since
    /// it is only a debugging aid.
    pub fn describe(&mut self) -> String {
        let name = self
            .name()
            .ok()
            .flatten()
            .unwrap_or_else(|| "<unnamed>".to_string());
        format!("container id={} name={}", self.id, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::runtime::{BindMount, CreateSpec, MockRuntime};

    fn spec(name: &str) -> CreateSpec {
        CreateSpec {
            image: "numbox/session:test".to_string(),
            name: name.to_string(),
            mem_limit: 1 << 30,
            ports: SESSION_PORTS.to_vec(),
            binds: vec![BindMount {
                host: "/tmp/numbox/u".into(),
                container: "/numbox".to_string(),
            }],
        }
    }

    #[test]
    fn test_accessors_after_start() {
        let runtime = Arc::new(MockRuntime::new());
        let id = runtime.create(&spec("u_at_x_y")).unwrap();
        runtime.start(&id).unwrap();

        let mut cont = SessionContainer::new(id, runtime.clone() as Arc<dyn ContainerRuntime>);
        assert_eq!(cont.name().unwrap().as_deref(), Some("/u_at_x_y"));
        assert_eq!(cont.session_name().unwrap().as_deref(), Some("u_at_x_y"));
        assert!(cont.is_running().unwrap());
        assert!(cont.time_started().unwrap().is_some());
        assert_eq!(cont.time_finished().unwrap(), None);
        assert_eq!(cont.host_ports().unwrap().len(), SESSION_PORTS.len());
    }

    #[test]
    fn test_refresh_invalidates_cached_state() {
        let runtime = Arc::new(MockRuntime::new());
        let id = runtime.create(&spec("u")).unwrap();

        let mut cont =
            SessionContainer::new(id.clone(), runtime.clone() as Arc<dyn ContainerRuntime>);
        assert!(!cont.is_running().unwrap());

        runtime.start(&id).unwrap();
        // Stale until refreshed
        assert!(!cont.is_running().unwrap());
        cont.refresh();
        assert!(cont.is_running().unwrap());
    }

    #[test]
    fn test_host_ports_require_started_container() {
        let runtime = Arc::new(MockRuntime::new());
        let id = runtime.create(&spec("u")).unwrap();

        let mut cont = SessionContainer::new(id, runtime as Arc<dyn ContainerRuntime>);
        assert!(cont.host_ports().is_err());
    }

    #[test]
    fn test_image_tags_lookup() {
        let runtime = Arc::new(MockRuntime::new());
        let id = runtime.create(&spec("u")).unwrap();
        runtime.add_image("numbox/session:test", &["numbox/session:test"]);

        let mut cont = SessionContainer::new(id, runtime as Arc<dyn ContainerRuntime>);
        assert_eq!(cont.image_tags().unwrap(), vec!["numbox/session:test"]);
    }

    #[test]
    fn test_never_timestamps_read_as_none() {
        let runtime = Arc::new(MockRuntime::new());
        let id = runtime.create(&spec("u")).unwrap();

        let mut cont = SessionContainer::new(id, runtime as Arc<dyn ContainerRuntime>);
        assert_eq!(cont.time_started().unwrap(), None);
        assert_eq!(cont.time_finished().unwrap(), None);
        assert!(cont.time_created().unwrap().is_some());
    }
}
