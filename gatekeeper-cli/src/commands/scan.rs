//! `gatekeeper scan` command handler

use std::io::Write;

use serde::Serialize;
use serde_json::json;
use tracing::info;

use gatekeeper_core::config::GatekeeperConfig;
use gatekeeper_core::types::{PipelineOutcome, ScanRequest, SecurityReport, ToolsSummary};
use gatekeeper_registry::{FileRegistry, RegistryStore, ServerRecord};
use gatekeeper_scanner::ScanPipeline;

use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `scan` command.
pub async fn execute(
    args: ScanArgs,
    config: &GatekeeperConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let pipeline = ScanPipeline::from_config(config)?;
    let request = ScanRequest::new(args.repo_url, args.server_name);

    info!(repo_url = %request.repo_url, server_name = %request.server_name, "starting scan");
    let outcome = pipeline.execute(&request).await;

    let registered = match (&outcome, args.register) {
        (
            PipelineOutcome::Success {
                security_report,
                tools,
            },
            true,
        ) => {
            let registry = FileRegistry::new(&config.registry.path);
            register(&registry, &request, security_report, tools).await?;
            true
        }
        _ => false,
    };

    writer.render(&ScanView {
        outcome: &outcome,
        registered,
    })?;

    match outcome {
        PipelineOutcome::Success { .. } => Ok(()),
        PipelineOutcome::Failure { error } => Err(CliError::Scan(error)),
    }
}

/// Store a successful scan under the request's server name.
///
/// Fields of an existing record other than the scan results are kept.
pub async fn register<R: RegistryStore>(
    registry: &R,
    request: &ScanRequest,
    report: &SecurityReport,
    tools: &ToolsSummary,
) -> Result<ServerRecord, CliError> {
    let mut record = registry
        .get(&request.server_name)
        .await?
        .unwrap_or_else(|| ServerRecord::new(request.server_name.as_str()));

    record
        .fields
        .insert("repository_url".to_owned(), json!(request.repo_url));
    record
        .fields
        .insert("security_report".to_owned(), serde_json::to_value(report)?);
    record
        .fields
        .insert("tools".to_owned(), serde_json::to_value(tools)?);

    let saved = registry.upsert(record).await?;
    info!(server = %saved.name, "scan result registered");
    Ok(saved)
}

/// Scan command payload.
#[derive(Serialize)]
pub struct ScanView<'a> {
    #[serde(flatten)]
    pub outcome: &'a PipelineOutcome,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub registered: bool,
}

impl Render for ScanView<'_> {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let (report, tools) = match self.outcome {
            PipelineOutcome::Success {
                security_report,
                tools,
            } => (security_report, tools),
            PipelineOutcome::Failure { error } => {
                writeln!(w, "{} {}", "Scan failed:".red().bold(), error)?;
                return Ok(());
            }
        };

        writeln!(w, "Repository: {} ({})", report.repo_name.bold(), report.repo_url)?;
        writeln!(w, "Static analysis: {}", "passed".green().bold())?;
        writeln!(w)?;

        if tools.names.is_empty() {
            writeln!(w, "Tools: none discovered")?;
        } else {
            writeln!(w, "Tools ({}): {}", tools.count, tools.names.join(", "))?;
        }
        writeln!(w)?;

        let secrets = format!("{} found", report.total_secrets);
        if report.total_secrets > 0 {
            writeln!(w, "Secrets: {}", secrets.red().bold())?;
            writeln!(w, "{:<28} {:<10} Location", "Type", "Validity")?;
            writeln!(w, "{}", "-".repeat(72))?;
            for s in &report.secrets {
                writeln!(
                    w,
                    "{:<28} {:<10} {}:{}",
                    s.secret_type, s.validity, s.file, s.line
                )?;
            }
        } else {
            writeln!(w, "Secrets: {}", secrets.green())?;
        }
        writeln!(w)?;

        let issues = format!("{} found", report.total_issues);
        if report.total_issues > 0 {
            writeln!(w, "Lint issues: {}", issues.yellow().bold())?;
            writeln!(w, "{:<8} {:<6} {:<32} Issue", "Severity", "Test", "Location")?;
            writeln!(w, "{}", "-".repeat(80))?;
            for i in &report.issues {
                let severity = match i.severity.as_str() {
                    "HIGH" => i.severity.red().bold(),
                    "MEDIUM" => i.severity.yellow(),
                    _ => i.severity.normal(),
                };
                writeln!(
                    w,
                    "{:<8} {:<6} {:<32} {}",
                    severity,
                    i.test_id,
                    format!("{}:{}", i.file, i.line),
                    i.text
                )?;
            }
        } else {
            writeln!(w, "Lint issues: {}", issues.green())?;
        }

        if !report.diagnostics.is_empty() {
            writeln!(w)?;
            writeln!(w, "{}", "Skipped scanners:".yellow())?;
            for d in &report.diagnostics {
                writeln!(w, "  {} ({}): {}", d.scanner, d.kind, d.message)?;
            }
        }

        if self.registered {
            writeln!(w)?;
            writeln!(w, "Registered in registry.")?;
        }

        Ok(())
    }
}
