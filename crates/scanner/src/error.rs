//! 스캐너 에러 타입
//!
//! 세 계층으로 나뉩니다.
//!
//! - [`WorkspaceError`]: 저장소 fetch 실패. 항상 파이프라인 치명 에러입니다.
//! - [`ScanError`]: 외부 분석 도구 하나의 실패. 스캐너 중요도에 따라 치명 여부가 결정됩니다.
//! - [`ScannerError`]: 오케스트레이터 수준 에러. `From<ScannerError> for GatekeeperError`
//!   구현을 통해 `?` 연산자로 상위 에러 타입으로 전파됩니다.

use std::time::Duration;

use gatekeeper_core::error::{ConfigError, GatekeeperError, PipelineError};

/// 작업 공간 획득(clone) 에러
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// 허용되지 않는 저장소 URL
    #[error("invalid repository url '{url}': {reason}")]
    InvalidUrl {
        /// 요청된 URL
        url: String,
        /// 거부 사유
        reason: String,
    },

    /// git 실행 파일을 찾을 수 없음
    #[error("git executable '{0}' not found")]
    GitNotFound(String),

    /// clone 실패
    #[error("git clone failed: {0}")]
    CloneFailed(String),

    /// clone 타임아웃
    #[error("git clone timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// clone은 성공했으나 checkout이 비어 있음
    #[error("cloned repository is empty")]
    EmptyCheckout,

    /// 임시 디렉토리 생성 실패
    #[error("failed to create temporary workspace: {0}")]
    TempDir(#[source] std::io::Error),
}

/// 외부 분석 도구 실행 에러
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 실행 파일 또는 서비스를 사용할 수 없음
    #[error("{tool} is not installed or not on PATH")]
    ToolMissing {
        /// 도구 이름
        tool: String,
    },

    /// 타임아웃 초과
    #[error("{tool} timed out after {}s", .timeout.as_secs())]
    Timeout {
        /// 도구 이름
        tool: String,
        /// 적용된 타임아웃
        timeout: Duration,
    },

    /// 출력을 기대한 형태로 파싱할 수 없음
    #[error("{tool} produced invalid output: {reason}")]
    InvalidOutput {
        /// 도구 이름
        tool: String,
        /// 파싱 실패 사유
        reason: String,
    },

    /// 사용 가능한 출력 없이 비정상 종료
    #[error("{tool} failed: {reason}")]
    ExecutionFailed {
        /// 도구 이름
        tool: String,
        /// 종료 코드 또는 stderr 요약
        reason: String,
    },
}

impl ScanError {
    /// 메트릭 레이블과 진단 정보에 쓰이는 안정적인 에러 종류 이름을 반환합니다.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolMissing { .. } => "tool_missing",
            Self::Timeout { .. } => "timeout",
            Self::InvalidOutput { .. } => "invalid_output",
            Self::ExecutionFailed { .. } => "execution_failed",
        }
    }
}

/// 스캔 오케스트레이터 에러
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    /// 저장소 fetch 실패
    #[error("repository fetch failed: {0}")]
    Fetch(#[from] WorkspaceError),

    /// 필수 스캐너 실행 실패
    #[error("static analysis failed: {0}")]
    MandatoryScan(#[from] ScanError),

    /// 필수 스캐너가 `success: false`를 보고함
    #[error("static analysis reported failure: {0}")]
    Rejected(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<ScannerError> for GatekeeperError {
    fn from(err: ScannerError) -> Self {
        match err {
            ScannerError::Fetch(e) => GatekeeperError::Pipeline(PipelineError::Fetch(e.to_string())),
            ScannerError::MandatoryScan(e) => {
                GatekeeperError::Pipeline(PipelineError::MandatoryScan(e.to_string()))
            }
            ScannerError::Rejected(msg) => {
                GatekeeperError::Pipeline(PipelineError::MandatoryScan(msg))
            }
            ScannerError::Config { field, reason } => {
                GatekeeperError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_kinds_are_stable() {
        let cases = [
            (
                ScanError::ToolMissing {
                    tool: "bandit".to_owned(),
                },
                "tool_missing",
            ),
            (
                ScanError::Timeout {
                    tool: "ggshield".to_owned(),
                    timeout: Duration::from_secs(60),
                },
                "timeout",
            ),
            (
                ScanError::InvalidOutput {
                    tool: "bandit".to_owned(),
                    reason: "expected value".to_owned(),
                },
                "invalid_output",
            ),
            (
                ScanError::ExecutionFailed {
                    tool: "ggshield".to_owned(),
                    reason: "exit status 2".to_owned(),
                },
                "execution_failed",
            ),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn timeout_display_includes_seconds() {
        let err = ScanError::Timeout {
            tool: "ggshield".to_owned(),
            timeout: Duration::from_secs(60),
        };
        assert_eq!(err.to_string(), "ggshield timed out after 60s");
    }

    #[test]
    fn tool_missing_display() {
        let err = ScanError::ToolMissing {
            tool: "bandit".to_owned(),
        };
        assert!(err.to_string().contains("not installed"));
    }

    #[test]
    fn fetch_error_converts_to_pipeline_fetch() {
        let err: GatekeeperError =
            ScannerError::Fetch(WorkspaceError::CloneFailed("repository not found".to_owned()))
                .into();
        let msg = err.to_string();
        assert!(msg.contains("fetch"));
        assert!(msg.contains("clone"));
    }

    #[test]
    fn rejected_converts_to_mandatory_scan() {
        let err: GatekeeperError = ScannerError::Rejected("quality gate failed".to_owned()).into();
        assert!(matches!(
            err,
            GatekeeperError::Pipeline(PipelineError::MandatoryScan(_))
        ));
    }

    #[test]
    fn config_error_converts() {
        let err: GatekeeperError = ScannerError::Config {
            field: "workspace.git_program".to_owned(),
            reason: "must not be empty".to_owned(),
        }
        .into();
        assert!(matches!(err, GatekeeperError::Config(_)));
    }

    #[test]
    fn workspace_timeout_display() {
        let err = WorkspaceError::Timeout(Duration::from_secs(300));
        assert_eq!(err.to_string(), "git clone timed out after 300s");
    }
}
