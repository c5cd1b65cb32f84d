pub mod cli;
pub mod config;
pub mod core;
pub mod utils;

pub use crate::config::Config;
pub use crate::core::runtime::{ContainerRuntime, DockerCli};
pub use crate::core::session::{
    BackupEngine, BackupOutcome, LivenessRegistry, MaintainParams, SessionContainer,
    SessionManager,
};
pub use crate::core::store::{ObjectStore, S3Store};
