pub mod commands;
pub mod parser;

pub use parser::{Cli, Commands};

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::{Config, ConfigManager};
use crate::core::runtime::{ContainerRuntime, DockerCli};
use crate::core::session::SessionManager;
use crate::core::store::{ObjectStore, S3Store};

pub fn execute_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Config(args) => commands::config::execute(args),
        Commands::Launch(args) => {
            let config = load_config()?;
            let manager = build_manager(&config)?;
            commands::launch::execute(&manager, args)
        }
        Commands::Maintain(args) => {
            let config = load_config()?;
            let manager = build_manager(&config)?;
            commands::maintain::execute(&config, &manager, args)
        }
        Commands::Backup(args) => {
            let config = load_config()?;
            let manager = build_manager(&config)?;
            commands::backup::execute(&manager, args)
        }
    }
}

fn load_config() -> Result<Config> {
    ConfigManager::load_or_create().context("failed to load configuration")
}

/// Wire the long-lived runtime and store clients into a manager.
fn build_manager(config: &Config) -> Result<SessionManager> {
    let runtime = Arc::new(DockerCli::new()) as Arc<dyn ContainerRuntime>;
    let store = match &config.backup_bucket {
        Some(bucket) => {
            let store = S3Store::new(bucket)
                .with_context(|| format!("connecting to backup bucket {bucket}"))?;
            Some(Arc::new(store) as Arc<dyn ObjectStore>)
        }
        None => None,
    };
    SessionManager::new(runtime, store, config)
}
