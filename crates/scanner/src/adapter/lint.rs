//! 보안 린터 어댑터 (bandit)
//!
//! `bandit -r <path> -f json -q`를 실행합니다. bandit은 이슈를 찾으면 종료 코드 1을
//! 반환하므로, stdout이 있는 한 종료 코드와 무관하게 파싱합니다.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use gatekeeper_core::config::LintConfig;
use gatekeeper_core::types::{LintFinding, LintResult};

use super::process::{ToolCommand, run_tool};
use super::{ScanAdapter, ScanTarget, ScannerKind, relative_path};
use crate::error::ScanError;

const TOOL: &str = "bandit";

/// bandit 어댑터
#[derive(Debug, Clone)]
pub struct LintAdapter {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl LintAdapter {
    /// 설정에서 어댑터를 생성합니다.
    pub fn new(config: &LintConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl ScanAdapter for LintAdapter {
    type Output = LintResult;

    fn kind(&self) -> ScannerKind {
        ScannerKind::Lint
    }

    async fn scan(&self, target: &ScanTarget) -> Result<LintResult, ScanError> {
        let command = ToolCommand::new(&self.program, &self.args, &target.path, self.timeout)
            .current_dir(&target.path);

        let output = run_tool(TOOL, &command).await?;
        let stdout = output.usable_stdout(TOOL)?;
        if stdout.is_empty() {
            return Ok(LintResult::empty());
        }

        let issues = parse_bandit_output(stdout, &target.path)?;
        debug!(issues = issues.len(), "security lint finished");
        Ok(LintResult::from_findings(issues))
    }
}

#[derive(Debug, Deserialize)]
struct BanditReport {
    results: Vec<BanditIssue>,
}

#[derive(Debug, Deserialize)]
struct BanditIssue {
    #[serde(default)]
    test_id: String,
    #[serde(default)]
    test_name: String,
    #[serde(default)]
    issue_severity: String,
    #[serde(default)]
    issue_confidence: String,
    #[serde(default)]
    issue_text: String,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    line_number: u64,
    #[serde(default)]
    issue_cwe: Option<BanditCwe>,
}

#[derive(Debug, Deserialize)]
struct BanditCwe {
    id: Option<u64>,
}

/// bandit JSON 리포트를 이슈 목록으로 변환합니다.
pub fn parse_bandit_output(stdout: &str, root: &Path) -> Result<Vec<LintFinding>, ScanError> {
    let report: BanditReport =
        serde_json::from_str(stdout).map_err(|e| ScanError::InvalidOutput {
            tool: TOOL.to_owned(),
            reason: e.to_string(),
        })?;

    Ok(report
        .results
        .into_iter()
        .map(|issue| LintFinding {
            test_id: issue.test_id,
            test_name: issue.test_name,
            severity: issue.issue_severity,
            confidence: issue.issue_confidence,
            text: issue.issue_text,
            file: relative_path(&issue.filename, root),
            line: issue.line_number,
            cwe: issue.issue_cwe.and_then(|cwe| cwe.id),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/tmp/gatekeeper_scan_y/repo";

    const SAMPLE: &str = r#"{
        "errors": [],
        "generated_at": "2026-01-10T09:00:00Z",
        "metrics": {"_totals": {"loc": 120}},
        "results": [
            {
                "code": "subprocess.call(cmd, shell=True)",
                "filename": "/tmp/gatekeeper_scan_y/repo/server.py",
                "issue_confidence": "HIGH",
                "issue_cwe": {"id": 78, "link": "https://cwe.mitre.org/data/definitions/78.html"},
                "issue_severity": "HIGH",
                "issue_text": "subprocess call with shell=True identified, security issue.",
                "line_number": 42,
                "test_id": "B602",
                "test_name": "subprocess_popen_with_shell_equals_true"
            },
            {
                "filename": "/tmp/gatekeeper_scan_y/repo/tools/util.py",
                "issue_confidence": "MEDIUM",
                "issue_severity": "LOW",
                "issue_text": "Consider possible security implications associated with pickle module.",
                "line_number": 3,
                "test_id": "B403",
                "test_name": "blacklist"
            }
        ]
    }"#;

    #[test]
    fn parses_bandit_results_in_order() {
        let issues = parse_bandit_output(SAMPLE, Path::new(ROOT)).unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].test_id, "B602");
        assert_eq!(issues[0].severity, "HIGH");
        assert_eq!(issues[0].file, "server.py");
        assert_eq!(issues[0].line, 42);
        assert_eq!(issues[0].cwe, Some(78));
        assert_eq!(issues[1].file, "tools/util.py");
        assert_eq!(issues[1].cwe, None);
    }

    #[test]
    fn empty_results_is_empty() {
        let issues = parse_bandit_output(r#"{"errors": [], "results": []}"#, Path::new(ROOT))
            .unwrap();
        assert!(issues.is_empty());
    }

    #[test]
    fn missing_results_is_invalid_output() {
        let err = parse_bandit_output(r#"{"errors": []}"#, Path::new(ROOT)).unwrap_err();
        assert_eq!(err.kind(), "invalid_output");
    }

    #[test]
    fn non_json_is_invalid_output() {
        let err = parse_bandit_output("[main] ERROR no such file", Path::new(ROOT)).unwrap_err();
        assert_eq!(err.kind(), "invalid_output");
    }

    #[tokio::test]
    async fn missing_bandit_is_tool_missing() {
        let config = LintConfig {
            program: "gatekeeper-no-such-bandit".to_owned(),
            ..LintConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let err = LintAdapter::new(&config)
            .scan(&ScanTarget::new(dir.path(), "acme_weather"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::ToolMissing { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_code_one_with_report_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let config = LintConfig {
            program: "sh".to_owned(),
            args: vec![
                "-c".to_owned(),
                r#"echo '{"results": [{"test_id": "B105", "filename": "{path}/app.py", "line_number": 9}]}'; exit 1"#
                    .to_owned(),
            ],
            timeout_secs: 10,
        };
        let result = LintAdapter::new(&config)
            .scan(&ScanTarget::new(dir.path(), "acme_weather"))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.total_issues, 1);
        assert_eq!(result.issues[0].test_id, "B105");
        assert_eq!(result.issues[0].file, "app.py");
    }
}
