//! 도메인 타입 -- 스캔 요청부터 최종 보안 리포트까지의 데이터 구조
//!
//! 파이프라인의 각 단계가 주고받는 값을 정의합니다.
//! 모든 타입은 요청 하나에 대해 새로 생성되며, 요청 간에 공유되지 않습니다.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// 스캔 요청
///
/// 파이프라인 실행 한 번의 불변 입력입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// 대상 저장소 URL
    pub repo_url: String,
    /// 레지스트리에 등록될 서버 이름
    pub server_name: String,
}

impl ScanRequest {
    /// 새 스캔 요청을 생성합니다.
    pub fn new(repo_url: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            server_name: server_name.into(),
        }
    }
}

/// 저장소 식별 정보
///
/// `repo_name`은 URL에서 `owner_repo` 형태로 추출하며,
/// 추출할 수 없으면 요청의 `server_name`을 사용합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoIdentity {
    /// `owner_repo` 또는 서버 이름
    pub repo_name: String,
    /// 원본 저장소 URL
    pub repo_url: String,
}

impl RepoIdentity {
    /// 스캔 요청에서 저장소 식별 정보를 만듭니다.
    pub fn from_request(request: &ScanRequest) -> Self {
        let repo_name = match parse_owner_repo(&request.repo_url) {
            Some((owner, repo)) => format!("{owner}_{repo}"),
            None => request.server_name.clone(),
        };
        Self {
            repo_name,
            repo_url: request.repo_url.clone(),
        }
    }
}

impl fmt::Display for RepoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.repo_name, self.repo_url)
    }
}

/// 저장소 URL에서 `(owner, repo)`를 추출합니다.
///
/// `https://host/owner/repo(.git)`와 `git@host:owner/repo(.git)` 형식을 지원합니다.
/// 경로 세그먼트가 2개 미만이면 `None`을 반환합니다.
pub fn parse_owner_repo(url: &str) -> Option<(String, String)> {
    let trimmed = url.trim().trim_end_matches('/');

    let path = if let Some(rest) = trimmed.strip_prefix("git@") {
        rest.split_once(':')?.1
    } else {
        let without_scheme = trimmed.split_once("://")?.1;
        without_scheme.split_once('/')?.1
    };

    let path = path.strip_suffix(".git").unwrap_or(path);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return None;
    }

    let owner = segments[segments.len() - 2];
    let repo = segments[segments.len() - 1];
    Some((owner.to_owned(), repo.to_owned()))
}

/// 도구 탐색 결과
///
/// `tool_count`는 항상 `tool_names.len()`과 같습니다.
/// 필드는 생성자에서만 설정되므로 이 불변식이 깨지지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolManifest {
    tool_names: Vec<String>,
    tool_count: usize,
}

impl ToolManifest {
    /// 도구 이름 목록으로 manifest를 생성합니다.
    pub fn new(tool_names: Vec<String>) -> Self {
        let tool_count = tool_names.len();
        Self {
            tool_names,
            tool_count,
        }
    }

    /// 빈 manifest (탐색 실패 시 기본값)
    pub fn empty() -> Self {
        Self::default()
    }

    /// 발견된 도구 이름 (발견 순서 유지)
    pub fn tool_names(&self) -> &[String] {
        &self.tool_names
    }

    /// 발견된 도구 수
    pub fn tool_count(&self) -> usize {
        self.tool_count
    }
}

/// 응답에 포함되는 도구 요약 (`{"names": [...], "count": n}`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsSummary {
    /// 도구 이름
    pub names: Vec<String>,
    /// 도구 수
    pub count: usize,
}

impl From<ToolManifest> for ToolsSummary {
    fn from(manifest: ToolManifest) -> Self {
        Self {
            count: manifest.tool_count,
            names: manifest.tool_names,
        }
    }
}

/// 정적 분석(필수 스캐너) 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticAnalysisResult {
    /// 분석 성공 여부
    pub success: bool,
    /// 분석 도구가 돌려준 원본 리포트 (구조는 해석하지 않음)
    pub report_data: Option<serde_json::Map<String, serde_json::Value>>,
}

/// 시크릿 탐지 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretFinding {
    /// 시크릿 유형 (예: "AWS Keys")
    #[serde(rename = "type")]
    pub secret_type: String,
    /// 유효성 (valid, invalid, unknown 등)
    pub validity: String,
    /// checkout 기준 상대 경로
    pub file: String,
    /// 시작 라인
    pub line: u64,
}

/// 시크릿 스캔 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretScanResult {
    /// 스캔 성공 여부
    pub success: bool,
    /// 발견된 시크릿 수
    pub total_secrets: usize,
    /// 발견 순서대로의 시크릿 목록
    pub secrets: Vec<SecretFinding>,
}

impl SecretScanResult {
    /// 발견 항목으로 결과를 생성합니다.
    pub fn from_findings(secrets: Vec<SecretFinding>) -> Self {
        Self {
            success: true,
            total_secrets: secrets.len(),
            secrets,
        }
    }

    /// 스캐너 실패 시 대체되는 중립 결과
    pub fn empty() -> Self {
        Self::from_findings(Vec::new())
    }
}

impl Default for SecretScanResult {
    fn default() -> Self {
        Self::empty()
    }
}

/// 보안 린터 탐지 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintFinding {
    /// 규칙 ID (예: "B602")
    pub test_id: String,
    /// 규칙 이름
    pub test_name: String,
    /// 심각도 (LOW, MEDIUM, HIGH)
    pub severity: String,
    /// 신뢰도 (LOW, MEDIUM, HIGH)
    pub confidence: String,
    /// 설명
    pub text: String,
    /// checkout 기준 상대 경로
    pub file: String,
    /// 라인 번호
    pub line: u64,
    /// CWE ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwe: Option<u64>,
}

/// 보안 린터 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintResult {
    /// 스캔 성공 여부
    pub success: bool,
    /// 발견된 이슈 수
    pub total_issues: usize,
    /// 발견 순서대로의 이슈 목록
    pub issues: Vec<LintFinding>,
}

impl LintResult {
    /// 발견 항목으로 결과를 생성합니다.
    pub fn from_findings(issues: Vec<LintFinding>) -> Self {
        Self {
            success: true,
            total_issues: issues.len(),
            issues,
        }
    }

    /// 스캐너 실패 시 대체되는 중립 결과
    pub fn empty() -> Self {
        Self::from_findings(Vec::new())
    }
}

impl Default for LintResult {
    fn default() -> Self {
        Self::empty()
    }
}

/// best-effort 스캐너 실패 진단 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerDiagnostic {
    /// 스캐너 이름 (secret_scan, lint)
    pub scanner: String,
    /// 에러 종류 (tool_missing, timeout, invalid_output, execution_failed)
    pub kind: String,
    /// 에러 메시지
    pub message: String,
}

/// 집계된 보안 리포트
///
/// 레지스트리가 그대로 저장하는 버전 없는 고정 형식입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityReport {
    /// 저장소 이름 (`owner_repo`)
    pub repo_name: String,
    /// 저장소 URL
    pub repo_url: String,
    /// 정적 분석 리포트 원본
    pub static_analysis: serde_json::Value,
    /// 시크릿 수
    pub total_secrets: usize,
    /// 시크릿 목록
    pub secrets: Vec<SecretFinding>,
    /// 린터 이슈 수
    pub total_issues: usize,
    /// 린터 이슈 목록
    pub issues: Vec<LintFinding>,
    /// best-effort 스캐너 실패 사유 (없으면 직렬화하지 않음)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ScannerDiagnostic>,
}

/// 프로세스 경계를 넘어 호출자에게 전달되는 유일한 값
///
/// 직렬화 형식:
/// - 성공: `{"success": true, "security_report": {...}, "tools": {"names": [...], "count": n}}`
/// - 실패: `{"success": false, "error": "..."}`
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// 리포트 생성 성공
    Success {
        /// 집계된 리포트
        security_report: Box<SecurityReport>,
        /// 발견된 도구
        tools: ToolsSummary,
    },
    /// 리포트를 만들 수 없음
    Failure {
        /// 실패 사유
        error: String,
    },
}

impl PipelineOutcome {
    /// 성공 결과를 생성합니다.
    pub fn success(security_report: SecurityReport, tools: ToolsSummary) -> Self {
        Self::Success {
            security_report: Box::new(security_report),
            tools,
        }
    }

    /// 실패 결과를 생성합니다.
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    /// 성공 여부
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl Serialize for PipelineOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success {
                security_report,
                tools,
            } => {
                let mut state = serializer.serialize_struct("PipelineOutcome", 3)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("security_report", security_report)?;
                state.serialize_field("tools", tools)?;
                state.end()
            }
            Self::Failure { error } => {
                let mut state = serializer.serialize_struct("PipelineOutcome", 2)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
                state.end()
            }
        }
    }
}
