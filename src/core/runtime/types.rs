//! Wire types reported by the container runtime

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Everything needed to create one session container.
///
/// Exposed ports are published on `127.0.0.1` with host-assigned port
/// numbers; bind mounts are always read-write.
#[derive(Debug, Clone)]
pub struct CreateSpec {
    pub image: String,
    pub name: String,
    pub mem_limit: u64,
    pub ports: Vec<u16>,
    pub binds: Vec<BindMount>,
}

/// A host directory mounted read-write into the container.
#[derive(Debug, Clone)]
pub struct BindMount {
    pub host: PathBuf,
    pub container: String,
}

/// One row of a container listing.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub id: String,
    /// Runtime-form names, each prefixed with `/`.
    pub names: Vec<String>,
}

/// One row of an image listing.
#[derive(Debug, Clone)]
pub struct ImageSummary {
    pub id: String,
    pub tags: Vec<String>,
}

/// Inspect payload for a single container, as reported by the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDetails {
    #[serde(rename = "Id")]
    pub id: String,

    /// Runtime-form name (`/safe-session-name`); unnamed containers omit it.
    #[serde(rename = "Name", default)]
    pub name: Option<String>,

    #[serde(rename = "Image", default)]
    pub image: String,

    #[serde(rename = "Created", default)]
    pub created: Option<String>,

    #[serde(rename = "State", default)]
    pub state: ContainerState,

    #[serde(rename = "NetworkSettings", default)]
    pub network_settings: NetworkSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerState {
    #[serde(rename = "Running", default)]
    pub running: bool,

    #[serde(rename = "StartedAt", default)]
    pub started_at: Option<String>,

    #[serde(rename = "FinishedAt", default)]
    pub finished_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Keyed `"<port>/tcp"`, e.g. `{"4200/tcp": [{"HostPort": "49153"}]}`.
    #[serde(rename = "Ports", default)]
    pub ports: HashMap<String, Option<Vec<PortBinding>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortBinding {
    #[serde(rename = "HostIp", default)]
    pub host_ip: String,

    #[serde(rename = "HostPort")]
    pub host_port: String,
}

impl ContainerDetails {
    /// Host port bound to the given container TCP port, if published.
    pub fn host_port(&self, container_port: u16) -> Option<u16> {
        let key = format!("{container_port}/tcp");
        let bindings = self.network_settings.ports.get(&key)?.as_ref()?;
        bindings.first()?.host_port.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_payload_deserializes() {
        let payload = r#"{
            "Id": "abc123",
            "Name": "/u_at_x_y",
            "Image": "sha256:deadbeef",
            "Created": "2024-05-01T10:00:00.000000000Z",
            "State": {
                "Running": true,
                "StartedAt": "2024-05-01T10:00:01Z",
                "FinishedAt": "0001-01-01T00:00:00Z"
            },
            "NetworkSettings": {
                "Ports": {
                    "4200/tcp": [{"HostIp": "127.0.0.1", "HostPort": "49153"}],
                    "8000/tcp": null
                }
            }
        }"#;

        let details: ContainerDetails = serde_json::from_str(payload).unwrap();
        assert_eq!(details.name.as_deref(), Some("/u_at_x_y"));
        assert!(details.state.running);
        assert_eq!(details.host_port(4200), Some(49153));
        assert_eq!(details.host_port(8000), None);
        assert_eq!(details.host_port(9999), None);
    }

    #[test]
    fn test_inspect_payload_tolerates_missing_sections() {
        let details: ContainerDetails = serde_json::from_str(r#"{"Id": "abc"}"#).unwrap();
        assert_eq!(details.name, None);
        assert!(!details.state.running);
        assert!(details.network_settings.ports.is_empty());
    }
}
