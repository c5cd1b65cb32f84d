use anyhow::Result;

use crate::cli::parser::LaunchArgs;
use crate::core::session::{SessionManager, SESSION_PORTS};

pub fn execute(manager: &SessionManager, args: LaunchArgs) -> Result<()> {
    let mut cont = manager.launch_by_name(&args.session, !args.fresh)?;

    let ports = cont.host_ports()?;
    let bindings: Vec<String> = SESSION_PORTS
        .iter()
        .zip(&ports)
        .map(|(container, host)| format!("{container}->127.0.0.1:{host}"))
        .collect();
    println!(
        "Session '{}' is running ({})",
        args.session,
        bindings.join(", ")
    );
    Ok(())
}
