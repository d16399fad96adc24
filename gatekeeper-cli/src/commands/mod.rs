//! Command handlers -- one module per subcommand

pub mod call;
pub mod scan;

use gatekeeper_core::config::GatekeeperConfig;

use crate::cli::Cli;
use crate::error::CliError;

/// Build the effective configuration: CLI flags > environment > file > defaults.
pub async fn load_config(cli: &Cli) -> Result<GatekeeperConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => GatekeeperConfig::load(path).await?,
        None => GatekeeperConfig::from_env()?,
    };

    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(path) = &cli.registry {
        config.registry.path = path.display().to_string();
    }

    config.validate()?;
    Ok(config)
}
