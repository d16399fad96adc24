//! `gatekeeper call` command handler
//!
//! Always writes exactly one JSON object to stdout. Configuration or request
//! problems are reported inside that object, never through the exit code.

use std::sync::Arc;

use gatekeeper_core::config::GatekeeperConfig;
use gatekeeper_registry::FileRegistry;
use gatekeeper_scanner::ScanPipeline;

use crate::boundary::{self, Dispatcher, Response};
use crate::cli::CallArgs;
use crate::error::CliError;

/// Execute the `call` command.
pub async fn execute(
    args: CallArgs,
    config: Result<GatekeeperConfig, CliError>,
) -> Result<(), CliError> {
    let raw = boundary::read_request(args.request, &mut std::io::stdin().lock());
    let response = respond(config, raw).await;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    boundary::write_response(&mut handle, &response)
}

/// Produce the response for one invocation with the production pipeline and registry.
pub async fn respond(
    config: Result<GatekeeperConfig, CliError>,
    raw: Result<String, CliError>,
) -> Response {
    let config = match config {
        Ok(config) => config,
        Err(e) => return Response::Error(e.to_string()),
    };
    let raw = match raw {
        Ok(raw) => raw,
        Err(e) => return Response::Error(format!("invalid request: {e}")),
    };

    let pipeline = match ScanPipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => return Response::Error(CliError::from(e).to_string()),
    };
    let registry = FileRegistry::new(&config.registry.path);

    Arc::new(Dispatcher::new(pipeline, registry))
        .handle_guarded(raw)
        .await
}
