//! 리포트 집계 -- 스캐너 결과를 하나의 [`SecurityReport`]로 병합
//!
//! 순수 함수입니다. I/O도 실패 경로도 없으며, 입력의 모든 발견 항목을 순서 그대로
//! 보존합니다. 출력의 개수 필드는 항상 실제 목록 길이와 같습니다.

use serde_json::{Map, Value};

use gatekeeper_core::types::{
    LintResult, RepoIdentity, ScannerDiagnostic, SecretScanResult, SecurityReport,
    StaticAnalysisResult,
};

/// 스캐너 결과를 보안 리포트로 병합합니다.
pub fn aggregate(
    identity: &RepoIdentity,
    static_result: StaticAnalysisResult,
    secret_result: SecretScanResult,
    lint_result: LintResult,
    diagnostics: Vec<ScannerDiagnostic>,
) -> SecurityReport {
    let static_analysis = Value::Object(static_result.report_data.unwrap_or_else(Map::new));

    SecurityReport {
        repo_name: identity.repo_name.clone(),
        repo_url: identity.repo_url.clone(),
        static_analysis,
        total_secrets: secret_result.secrets.len(),
        secrets: secret_result.secrets,
        total_issues: lint_result.issues.len(),
        issues: lint_result.issues,
        diagnostics,
    }
}
