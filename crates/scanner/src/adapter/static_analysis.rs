//! 정적 분석 어댑터 (필수 스캐너)
//!
//! 설정된 래퍼 명령을 실행하고 stdout의 JSON 객체 하나를 [`StaticAnalysisResult`]로
//! 변환합니다. 분석 서버 자격 증명과 프로젝트 키는 환경변수로 전달됩니다.
//!
//! | 환경변수 | 값 |
//! |----------|----|
//! | `SONAR_TOKEN` | `static_analysis.token` |
//! | `SONAR_HOST_URL` | `static_analysis.host_url` |
//! | `SONAR_PROJECT_KEY` | 저장소 식별자 (`owner_repo`) |

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::debug;

use gatekeeper_core::config::StaticAnalysisConfig;
use gatekeeper_core::types::StaticAnalysisResult;

use super::process::{ToolCommand, run_tool};
use super::{ScanAdapter, ScanTarget, ScannerKind};
use crate::error::ScanError;

const TOOL: &str = "static analysis";

/// 정적 분석 어댑터
#[derive(Debug, Clone)]
pub struct StaticAnalysisAdapter {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    token: String,
    host_url: String,
}

impl StaticAnalysisAdapter {
    /// 설정에서 어댑터를 생성합니다.
    pub fn new(config: &StaticAnalysisConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            token: config.token.clone(),
            host_url: config.host_url.clone(),
        }
    }

    fn command(&self, target: &ScanTarget) -> ToolCommand {
        ToolCommand::new(&self.program, &self.args, &target.path, self.timeout)
            .current_dir(&target.path)
            .env("SONAR_TOKEN", &self.token)
            .env("SONAR_HOST_URL", &self.host_url)
            .env("SONAR_PROJECT_KEY", &target.project_key)
    }
}

impl ScanAdapter for StaticAnalysisAdapter {
    type Output = StaticAnalysisResult;

    fn kind(&self) -> ScannerKind {
        ScannerKind::StaticAnalysis
    }

    async fn scan(&self, target: &ScanTarget) -> Result<StaticAnalysisResult, ScanError> {
        let output = run_tool(TOOL, &self.command(target)).await?;
        let stdout = output.usable_stdout(TOOL)?;
        let result = parse_static_output(stdout)?;
        debug!(
            success = result.success,
            sections = result.report_data.as_ref().map_or(0, Map::len),
            "static analysis finished"
        );
        Ok(result)
    }
}

/// 래퍼 출력(JSON 객체)을 파싱합니다.
///
/// - 최상위가 객체가 아니면 `InvalidOutput`
/// - `"success"`가 없으면 성공으로 간주
/// - 중첩된 `"report_data"` 객체가 있으면 그것을, 없으면 `"success"`를 뺀 나머지를 리포트로 사용
/// - 중첩된 경우에도 최상위 `"error"`는 리포트로 옮겨 실패 사유가 유지됨
pub fn parse_static_output(stdout: &str) -> Result<StaticAnalysisResult, ScanError> {
    if stdout.trim().is_empty() {
        return Err(invalid("empty output"));
    }

    let value: Value = serde_json::from_str(stdout).map_err(|e| invalid(e.to_string()))?;
    let Value::Object(mut object) = value else {
        return Err(invalid("expected a JSON object"));
    };

    let success = match object.remove("success") {
        None => true,
        Some(Value::Bool(b)) => b,
        Some(other) => return Err(invalid(format!("'success' must be a boolean, got {other}"))),
    };

    let report_data = match object.remove("report_data") {
        Some(Value::Object(mut nested)) => {
            if let Some(error) = object.remove("error") {
                nested.entry("error").or_insert(error);
            }
            nested
        }
        Some(Value::Null) | None => object,
        Some(_) => return Err(invalid("'report_data' must be an object")),
    };

    Ok(StaticAnalysisResult {
        success,
        report_data: Some(report_data),
    })
}

/// 실패 결과에서 사람이 읽을 사유를 꺼냅니다.
pub fn failure_reason(result: &StaticAnalysisResult) -> String {
    result
        .report_data
        .as_ref()
        .and_then(|data| data.get("error"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| "no reason given".to_owned())
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

    #[test]
    fn parses_nested_report_data() {
        let out = r#"{"success": true, "report_data": {"bugs": 2, "vulnerabilities": 0}}"#;
        let result = parse_static_output(out).unwrap();
        assert!(result.success);
        let data = result.report_data.unwrap();
        assert_eq!(data["bugs"], 2);
        assert!(!data.contains_key("success"));
    }

    #[test]
    fn flat_object_becomes_report_data() {
        let out = r#"{"quality_gate": "OK", "code_smells": 14}"#;
        let result = parse_static_output(out).unwrap();
        assert!(result.success);
        assert_eq!(result.report_data.unwrap()["quality_gate"], "OK");
    }

    #[test]
    fn reported_failure_is_not_success() {
        let out = r#"{"success": false, "error": "SonarQube token not configured"}"#;
        let result = parse_static_output(out).unwrap();
        assert!(!result.success);
        assert_eq!(failure_reason(&result), "SonarQube token not configured");
    }

    #[test]
    fn top_level_error_survives_nested_report_data() {
        let out = r#"{"success": false, "error": "quality gate failed", "report_data": {"bugs": 9}}"#;
        let result = parse_static_output(out).unwrap();
        assert!(!result.success);
        assert_eq!(failure_reason(&result), "quality gate failed");
        assert_eq!(result.report_data.unwrap()["bugs"], 9);
    }

    #[test]
    fn failure_without_error_field_has_default_reason() {
        let result = parse_static_output(r#"{"success": false}"#).unwrap();
        assert_eq!(failure_reason(&result), "no reason given");
    }

    #[test]
    fn non_object_is_invalid_output() {
        let err = parse_static_output("[1, 2, 3]").unwrap_err();
        assert_eq!(err.kind(), "invalid_output");
    }

    #[test]
    fn malformed_json_is_invalid_output() {
        let err = parse_static_output("{not json").unwrap_err();
        assert_eq!(err.kind(), "invalid_output");
    }

    #[test]
    fn empty_output_is_invalid_output() {
        let err = parse_static_output("").unwrap_err();
        assert_eq!(err.kind(), "invalid_output");
    }

    #[test]
    fn non_boolean_success_is_invalid_output() {
        let err = parse_static_output(r#"{"success": "yes"}"#).unwrap_err();
        assert_eq!(err.kind(), "invalid_output");
    }

    #[test]
    fn command_passes_credentials_and_project_key() {
        let config = StaticAnalysisConfig {
            token: "sq-token".to_owned(),
            ..StaticAnalysisConfig::default()
        };
        let adapter = StaticAnalysisAdapter::new(&config);
        let target = ScanTarget::new("/tmp/ws/repo", "acme_weather");
        let cmd = adapter.command(&target);
        assert!(cmd.args().iter().any(|a| a == "/tmp/ws/repo"));
        assert_eq!(cmd.env_value("SONAR_TOKEN"), Some("sq-token"));
        assert_eq!(cmd.env_value("SONAR_PROJECT_KEY"), Some("acme_weather"));
        assert_eq!(cmd.env_value("SONAR_HOST_URL"), Some("https://sonarcloud.io"));
    }

    #[tokio::test]
    async fn missing_wrapper_is_tool_missing() {
        let config = StaticAnalysisConfig {
            program: "gatekeeper-no-such-sonar-wrapper".to_owned(),
            ..StaticAnalysisConfig::default()
        };
        let adapter = StaticAnalysisAdapter::new(&config);
        let dir = tempfile::tempdir().unwrap();
        let err = adapter
            .scan(&ScanTarget::new(dir.path(), "acme_weather"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "tool_missing");
    }
}
