use clap::Parser;
use tracing_subscriber::EnvFilter;

use numbox::cli::{execute_command, Cli};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Err(e) = execute_command(cli) {
        eprintln!("numbox: {e:#}");
        std::process::exit(1);
    }
}
