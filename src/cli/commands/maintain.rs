use anyhow::Result;
use std::time::Duration;

use crate::cli::parser::MaintainArgs;
use crate::config::Config;
use crate::core::session::{MaintainParams, SessionManager};

pub fn execute(config: &Config, manager: &SessionManager, args: MaintainArgs) -> Result<()> {
    let params = MaintainParams {
        delete_timeout: Duration::from_secs(args.delete_timeout),
        stop_timeout: Duration::from_secs(args.stop_timeout),
        protected_names: config.protected_container_names(),
    };
    manager.maintain(params)?;

    println!("Maintenance done; {} active session(s)", manager.active_count()?);
    Ok(())
}
