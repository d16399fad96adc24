use clap::Parser;

use gatekeeper_cli::cli::{Cli, Commands};
use gatekeeper_cli::commands;
use gatekeeper_cli::logging::init_tracing;
use gatekeeper_cli::output::OutputWriter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(&cli).await;

    if let Ok(config) = &config {
        if let Err(e) = init_tracing(&config.general) {
            eprintln!("warning: {e}");
        }
        gatekeeper_core::metrics::describe_all();
    }

    let writer = OutputWriter::new(cli.output);
    let result = match cli.command {
        Commands::Call(args) => commands::call::execute(args, config).await,
        Commands::Scan(args) => match config {
            Ok(config) => commands::scan::execute(args, &config, &writer).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
    Ok(())
}
