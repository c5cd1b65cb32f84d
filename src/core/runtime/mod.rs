//! Container runtime integration
//!
//! The lifecycle manager talks to the runtime exclusively through the
//! [`ContainerRuntime`] trait. `DockerCli` is the production
//! implementation; `MockRuntime` backs the test suite.

pub mod client;
pub mod error;
pub mod mock;
pub mod types;

pub use client::DockerCli;
pub use error::{RuntimeError, RuntimeResult};
pub use mock::MockRuntime;
pub use types::{
    BindMount, ContainerDetails, ContainerState, ContainerSummary, CreateSpec, ImageSummary,
    NetworkSettings, PortBinding,
};

/// Thin contract over the container runtime's lifecycle and copy
/// operations. All calls are blocking.
pub trait ContainerRuntime: Send + Sync {
    /// Create a container from the spec and return its runtime-assigned id.
    ///
    /// A name collision surfaces as [`RuntimeError::Conflict`]; the caller
    /// treats the existing container as the result after a lookup.
    fn create(&self, spec: &CreateSpec) -> RuntimeResult<String>;

    fn start(&self, id: &str) -> RuntimeResult<()>;

    fn stop(&self, id: &str) -> RuntimeResult<()>;

    fn kill(&self, id: &str) -> RuntimeResult<()>;

    fn remove(&self, id: &str) -> RuntimeResult<()>;

    fn inspect(&self, id: &str) -> RuntimeResult<ContainerDetails>;

    /// List containers; `include_stopped` widens the listing beyond
    /// currently-running ones.
    fn list(&self, include_stopped: bool) -> RuntimeResult<Vec<ContainerSummary>>;

    /// Contents of `path` inside the container as an uncompressed tar
    /// stream.
    fn snapshot(&self, id: &str, path: &str) -> RuntimeResult<Vec<u8>>;

    fn images(&self) -> RuntimeResult<Vec<ImageSummary>>;
}
