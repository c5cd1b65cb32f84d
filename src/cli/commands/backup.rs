use anyhow::{bail, Result};

use crate::cli::parser::BackupArgs;
use crate::core::session::SessionManager;

pub fn execute(manager: &SessionManager, args: BackupArgs) -> Result<()> {
    match args.session {
        Some(session) => {
            let Some(mut cont) = manager.lookup_by_name(&session)? else {
                bail!("no container exists for session '{session}'");
            };
            let outcome = manager.backup(&mut cont)?;
            println!("Backup of '{session}': {outcome:?}");
        }
        None => {
            manager.backup_all()?;
            println!("Backup pass finished");
        }
    }
    Ok(())
}
