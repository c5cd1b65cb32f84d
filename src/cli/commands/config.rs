use anyhow::Result;

use crate::cli::parser::ConfigArgs;
use crate::config::ConfigManager;

pub fn execute(args: ConfigArgs) -> Result<()> {
    if args.path {
        println!("{}", ConfigManager::get_config_path());
        return Ok(());
    }
    let config = ConfigManager::load_or_create()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
