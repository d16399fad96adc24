//! 시크릿 스캐너 어댑터 (GitGuardian ggshield)
//!
//! `ggshield secret scan repo <path> --json --exit-zero`를 실행하고 JSON 출력을
//! [`SecretScanResult`]로 변환합니다. API 키는 `GITGUARDIAN_API_KEY`로 전달됩니다.
//!
//! 두 가지 출력 형식을 모두 받아들입니다.
//!
//! ```text
//! 구형: {"filename": "...", "secrets": [{"type", "validity", "start_line"}]}
//! 신형: {"entities_with_incidents": [{"filename", "incidents": [{"type", "validity",
//!        "occurrences": [{"line_start"}]}]}]}
//! ```
//!
//! 최상위는 객체 하나이거나 객체 배열입니다.

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use gatekeeper_core::config::SecretScanConfig;
use gatekeeper_core::types::{SecretFinding, SecretScanResult};

use super::process::{ToolCommand, run_tool};
use super::{ScanAdapter, ScanTarget, ScannerKind, relative_path};
use crate::error::ScanError;

const TOOL: &str = "ggshield";
const UNKNOWN: &str = "unknown";

/// ggshield 어댑터
#[derive(Debug, Clone)]
pub struct SecretScanAdapter {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    api_key: String,
}

impl SecretScanAdapter {
    /// 설정에서 어댑터를 생성합니다.
    pub fn new(config: &SecretScanConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            api_key: config.api_key.clone(),
        }
    }
}

impl ScanAdapter for SecretScanAdapter {
    type Output = SecretScanResult;

    fn kind(&self) -> ScannerKind {
        ScannerKind::SecretScan
    }

    async fn scan(&self, target: &ScanTarget) -> Result<SecretScanResult, ScanError> {
        let command = ToolCommand::new(&self.program, &self.args, &target.path, self.timeout)
            .current_dir(&target.path)
            .env("GITGUARDIAN_API_KEY", &self.api_key);

        let output = run_tool(TOOL, &command).await?;
        let stdout = output.usable_stdout(TOOL)?;
        if stdout.is_empty() {
            debug!("ggshield produced no output, treating as no secrets");
            return Ok(SecretScanResult::empty());
        }

        let findings = parse_ggshield_output(stdout, &target.path)?;
        debug!(secrets = findings.len(), "secret scan finished");
        Ok(SecretScanResult::from_findings(findings))
    }
}

/// ggshield JSON 출력을 시크릿 목록으로 변환합니다.
pub fn parse_ggshield_output(stdout: &str, root: &Path) -> Result<Vec<SecretFinding>, ScanError> {
    let value: Value = serde_json::from_str(stdout).map_err(|e| invalid(e.to_string()))?;

    let items = match value {
        Value::Object(_) => vec![value],
        Value::Array(items) => items,
        _ => return Err(invalid("expected a JSON object or array")),
    };

    let mut findings = Vec::new();
    for item in &items {
        let Some(object) = item.as_object() else {
            continue;
        };

        let filename = str_field(item, "filename");

        if let Some(secrets) = object.get("secrets").and_then(Value::as_array) {
            for secret in secrets {
                findings.push(SecretFinding {
                    secret_type: str_field(secret, "type"),
                    validity: str_field(secret, "validity"),
                    file: relative_path(&filename, root),
                    line: u64_field(secret, "start_line"),
                });
            }
        }

        if let Some(entities) = object
            .get("entities_with_incidents")
            .and_then(Value::as_array)
        {
            for entity in entities {
                let entity_file = str_field(entity, "filename");
                let incidents = entity
                    .get("incidents")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                for incident in incidents {
                    let line = incident
                        .get("occurrences")
                        .and_then(Value::as_array)
                        .and_then(|occ| occ.first())
                        .map(|occ| u64_field(occ, "line_start"))
                        .unwrap_or(0);
                    let secret_type = incident
                        .get("type")
                        .or_else(|| incident.get("detector"))
                        .and_then(Value::as_str)
                        .unwrap_or(UNKNOWN)
                        .to_owned();
                    findings.push(SecretFinding {
                        secret_type,
                        validity: str_field(incident, "validity"),
                        file: relative_path(&entity_file, root),
                        line,
                    });
                }
            }
        }
    }

    Ok(findings)
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN)
        .to_owned()
}

fn u64_field(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn invalid(reason: impl Into<String>) -> ScanError {
    ScanError::InvalidOutput {
        tool: TOOL.to_owned(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/tmp/gatekeeper_scan_x/repo";

    #[test]
    fn parses_single_object_with_secrets() {
        let out = r#"{
            "filename": "/tmp/gatekeeper_scan_x/repo/config.py",
            "secrets": [
                {"type": "AWS Keys", "validity": "valid", "start_line": 12},
                {"type": "Generic Password", "start_line": 30}
            ]
        }"#;
        let findings = parse_ggshield_output(out, Path::new(ROOT)).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].secret_type, "AWS Keys");
        assert_eq!(findings[0].validity, "valid");
        assert_eq!(findings[0].file, "config.py");
        assert_eq!(findings[0].line, 12);
        assert_eq!(findings[1].validity, "unknown");
    }

    #[test]
    fn parses_array_of_objects_in_order() {
        let out = r#"[
            {"filename": "a.env", "secrets": [{"type": "Slack Token", "validity": "invalid", "start_line": 1}]},
            {"filename": "b.env", "secrets": [{"type": "Stripe Key", "validity": "valid", "start_line": 2}]}
        ]"#;
        let findings = parse_ggshield_output(out, Path::new(ROOT)).unwrap();
        let files: Vec<_> = findings.iter().map(|f| f.file.as_str()).collect();
        assert_eq!(files, vec!["a.env", "b.env"]);
    }

    #[test]
    fn parses_entities_with_incidents() {
        let out = r#"{
            "id": "/tmp/gatekeeper_scan_x/repo",
            "type": "path_scan",
            "total_incidents": 1,
            "entities_with_incidents": [{
                "filename": "src/settings.ts",
                "incidents": [{
                    "type": "GitHub Token",
                    "validity": "valid",
                    "occurrences": [{"line_start": 7, "line_end": 7}]
                }]
            }]
        }"#;
        let findings = parse_ggshield_output(out, Path::new(ROOT)).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].secret_type, "GitHub Token");
        assert_eq!(findings[0].file, "src/settings.ts");
        assert_eq!(findings[0].line, 7);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let out = r#"{"secrets": [{}]}"#;
        let findings = parse_ggshield_output(out, Path::new(ROOT)).unwrap();
        assert_eq!(
            findings,
            vec![SecretFinding {
                secret_type: "unknown".to_owned(),
                validity: "unknown".to_owned(),
                file: "unknown".to_owned(),
                line: 0,
            }]
        );
    }

    #[test]
    fn clean_scan_has_no_findings() {
        let out = r#"{"id": ".", "type": "path_scan", "total_incidents": 0}"#;
        assert!(parse_ggshield_output(out, Path::new(ROOT)).unwrap().is_empty());
    }

    #[test]
    fn scalar_output_is_invalid() {
        let err = parse_ggshield_output("42", Path::new(ROOT)).unwrap_err();
        assert_eq!(err.kind(), "invalid_output");
    }

    #[test]
    fn malformed_json_is_invalid() {
        let err = parse_ggshield_output("Error: API key missing", Path::new(ROOT)).unwrap_err();
        assert_eq!(err.kind(), "invalid_output");
    }

    #[tokio::test]
    async fn missing_ggshield_is_tool_missing() {
        let config = SecretScanConfig {
            program: "gatekeeper-no-such-ggshield".to_owned(),
            ..SecretScanConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let err = SecretScanAdapter::new(&config)
            .scan(&ScanTarget::new(dir.path(), "acme_weather"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::ToolMissing { .. }));
    }
}
