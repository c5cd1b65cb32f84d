//! Docker CLI implementation of the container runtime contract

use std::process::Command;

use super::error::{RuntimeError, RuntimeResult};
use super::types::{ContainerDetails, ContainerSummary, CreateSpec, ImageSummary};
use super::ContainerRuntime;

/// Talks to the local Docker daemon through the `docker` binary.
///
/// Stateless; the daemon connection is owned by the CLI. Errors are
/// classified from stderr so callers can coerce name conflicts and
/// missing containers to the desired end state.
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }

    fn run(&self, args: &[String]) -> RuntimeResult<Vec<u8>> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| RuntimeError::Unavailable(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let command = args.first().cloned().unwrap_or_default();
            return Err(classify_failure(&command, stderr));
        }

        Ok(output.stdout)
    }

    fn run_text(&self, args: &[String]) -> RuntimeResult<String> {
        let stdout = self.run(args)?;
        Ok(String::from_utf8_lossy(&stdout).to_string())
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRuntime for DockerCli {
    fn create(&self, spec: &CreateSpec) -> RuntimeResult<String> {
        let mut args = vec![
            "create".to_string(),
            "--name".to_string(),
            spec.name.clone(),
            "--memory".to_string(),
            spec.mem_limit.to_string(),
        ];
        for port in &spec.ports {
            args.push("-p".to_string());
            args.push(format!("127.0.0.1::{port}"));
        }
        for bind in &spec.binds {
            args.push("-v".to_string());
            args.push(format!("{}:{}", bind.host.display(), bind.container));
        }
        args.push(spec.image.clone());

        match self.run_text(&args) {
            Ok(stdout) => Ok(stdout.trim().to_string()),
            Err(RuntimeError::CommandFailed { stderr, .. })
                if stderr.contains("is already in use") =>
            {
                Err(RuntimeError::Conflict {
                    name: spec.name.clone(),
                })
            }
            Err(err) => Err(err),
        }
    }

    fn start(&self, id: &str) -> RuntimeResult<()> {
        self.run(&["start".to_string(), id.to_string()])?;
        Ok(())
    }

    fn stop(&self, id: &str) -> RuntimeResult<()> {
        self.run(&["stop".to_string(), id.to_string()])?;
        Ok(())
    }

    fn kill(&self, id: &str) -> RuntimeResult<()> {
        self.run(&["kill".to_string(), id.to_string()])?;
        Ok(())
    }

    fn remove(&self, id: &str) -> RuntimeResult<()> {
        self.run(&["rm".to_string(), id.to_string()])?;
        Ok(())
    }

    fn inspect(&self, id: &str) -> RuntimeResult<ContainerDetails> {
        let stdout = self.run(&["inspect".to_string(), id.to_string()])?;
        let mut parsed: Vec<ContainerDetails> = serde_json::from_slice(&stdout)?;
        if parsed.is_empty() {
            return Err(RuntimeError::NotFound {
                name: id.to_string(),
            });
        }
        Ok(parsed.remove(0))
    }

    fn list(&self, include_stopped: bool) -> RuntimeResult<Vec<ContainerSummary>> {
        let mut args = vec!["ps".to_string()];
        if include_stopped {
            args.push("-a".to_string());
        }
        args.push("--no-trunc".to_string());
        args.push("--format".to_string());
        args.push("{{.ID}}\t{{.Names}}".to_string());

        let stdout = self.run_text(&args)?;
        Ok(parse_container_listing(&stdout))
    }

    fn snapshot(&self, id: &str, path: &str) -> RuntimeResult<Vec<u8>> {
        self.run(&["cp".to_string(), format!("{id}:{path}"), "-".to_string()])
    }

    fn images(&self) -> RuntimeResult<Vec<ImageSummary>> {
        let args = vec![
            "images".to_string(),
            "--no-trunc".to_string(),
            "--format".to_string(),
            "{{.ID}}\t{{.Repository}}:{{.Tag}}".to_string(),
        ];
        let stdout = self.run_text(&args)?;
        Ok(parse_image_listing(&stdout))
    }
}

fn classify_failure(command: &str, stderr: String) -> RuntimeError {
    let lowered = stderr.to_lowercase();
    if lowered.contains("cannot connect to the docker daemon") {
        return RuntimeError::Unavailable(stderr);
    }
    if lowered.contains("no such container") || lowered.contains("no such object") {
        return RuntimeError::NotFound { name: stderr };
    }
    RuntimeError::CommandFailed {
        command: command.to_string(),
        stderr,
    }
}

/// Parse `docker ps --format '{{.ID}}\t{{.Names}}'` output.
///
/// `ps` prints names without the runtime's leading slash; the slash is
/// restored here so listings and inspect payloads agree.
fn parse_container_listing(stdout: &str) -> Vec<ContainerSummary> {
    stdout
        .lines()
        .filter_map(|line| {
            let (id, names) = line.split_once('\t')?;
            if id.is_empty() {
                return None;
            }
            let names = names
                .split(',')
                .filter(|n| !n.is_empty())
                .map(|n| format!("/{n}"))
                .collect();
            Some(ContainerSummary {
                id: id.to_string(),
                names,
            })
        })
        .collect()
}

/// Parse `docker images --format '{{.ID}}\t{{.Repository}}:{{.Tag}}'`
/// output, grouping tags per image id.
fn parse_image_listing(stdout: &str) -> Vec<ImageSummary> {
    let mut images: Vec<ImageSummary> = Vec::new();
    for line in stdout.lines() {
        let Some((id, tag)) = line.split_once('\t') else {
            continue;
        };
        if id.is_empty() {
            continue;
        }
        let tag = tag.trim();
        match images.iter_mut().find(|img| img.id == id) {
            Some(existing) => {
                if tag != "<none>:<none>" {
                    existing.tags.push(tag.to_string());
                }
            }
            None => {
                let tags = if tag == "<none>:<none>" {
                    Vec::new()
                } else {
                    vec![tag.to_string()]
                };
                images.push(ImageSummary {
                    id: id.to_string(),
                    tags,
                });
            }
        }
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_listing_restores_slash() {
        let listing = parse_container_listing("abc123\tu_at_x_y\ndef456\tother\n");
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].id, "abc123");
        assert_eq!(listing[0].names, vec!["/u_at_x_y"]);
        assert_eq!(listing[1].names, vec!["/other"]);
    }

    #[test]
    fn test_parse_container_listing_multiple_names() {
        let listing = parse_container_listing("abc\tprimary,alias\n");
        assert_eq!(listing[0].names, vec!["/primary", "/alias"]);
    }

    #[test]
    fn test_parse_container_listing_empty_output() {
        assert!(parse_container_listing("").is_empty());
        assert!(parse_container_listing("\n").is_empty());
    }

    #[test]
    fn test_parse_image_listing_groups_tags() {
        let listing = parse_image_listing(
            "sha256:aa\tnumbox/session:latest\nsha256:aa\tnumbox/session:v3\nsha256:bb\t<none>:<none>\n",
        );
        assert_eq!(listing.len(), 2);
        assert_eq!(
            listing[0].tags,
            vec!["numbox/session:latest", "numbox/session:v3"]
        );
        assert!(listing[1].tags.is_empty());
    }

    #[test]
    fn test_classify_daemon_down() {
        let err = classify_failure(
            "ps",
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock".to_string(),
        );
        assert!(matches!(err, RuntimeError::Unavailable(_)));
    }

    #[test]
    fn test_classify_missing_container() {
        let err = classify_failure("inspect", "Error: No such container: xyz".to_string());
        assert!(matches!(err, RuntimeError::NotFound { .. }));
    }

    #[test]
    fn test_classify_generic_failure() {
        let err = classify_failure("create", "some other failure".to_string());
        assert!(matches!(err, RuntimeError::CommandFailed { .. }));
    }
}
