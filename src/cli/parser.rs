use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "numbox")]
#[command(about = "Session container lifecycle manager")]
#[command(
    version,
    long_about = "Manages per-user sandboxed compute containers: launch, \
                  idle shutdown, hard-lifetime eviction, and home-directory \
                  backup to an object store"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch (or reuse) the container for a session
    Launch(LaunchArgs),
    /// Run one maintenance sweep over all containers
    Maintain(MaintainArgs),
    /// Back up session home directories
    Backup(BackupArgs),
    /// Show configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct LaunchArgs {
    /// Session name (typically the user's email-like identifier)
    pub session: String,

    /// Discard any existing container and start fresh
    #[arg(long, help = "Discard any existing container and start fresh")]
    pub fresh: bool,
}

#[derive(Args, Debug)]
pub struct MaintainArgs {
    /// Hard cap on session age in seconds (0 disables deletion)
    #[arg(long, default_value_t = 0)]
    pub delete_timeout: u64,

    /// Idle window in seconds before a session is stopped (0 disables)
    #[arg(long, default_value_t = 0)]
    pub stop_timeout: u64,
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Back up a single session instead of all containers
    pub session: Option<String>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print the configuration file path instead of the contents
    #[arg(long, help = "Print the configuration file path")]
    pub path: bool,
}
