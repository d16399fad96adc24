//! 스캐너 어댑터 -- 외부 분석 도구 호출과 출력 정규화
//!
//! [`ScanAdapter`] trait은 오케스트레이터의 일반적인 `scan(path)` 요청을 각 도구의
//! 프로세스 호출로 바꾸고, 원시 출력을 정규화된 결과 타입으로 변환합니다.
//!
//! # 지원 도구
//!
//! - 정적 분석 (SonarQube 계열 래퍼) -- [`StaticAnalysisAdapter`], 필수
//! - 시크릿 스캐너 (ggshield) -- [`SecretScanAdapter`], best-effort
//! - 보안 린터 (bandit) -- [`LintAdapter`], best-effort
//!
//! # 확장
//!
//! 새 도구를 추가하려면 `ScanAdapter`를 구현하고 오케스트레이터에 연결합니다.

pub mod lint;
pub mod process;
pub mod secrets;
pub mod static_analysis;

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::ScanError;

pub use lint::LintAdapter;
pub use secrets::SecretScanAdapter;
pub use static_analysis::StaticAnalysisAdapter;

/// 스캐너 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScannerKind {
    /// 정적 분석 (필수)
    StaticAnalysis,
    /// 시크릿 스캐너
    SecretScan,
    /// 보안 린터
    Lint,
}

impl ScannerKind {
    /// 메트릭 레이블과 진단 정보에 쓰이는 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaticAnalysis => "static_analysis",
            Self::SecretScan => "secret_scan",
            Self::Lint => "lint",
        }
    }
}

impl fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 스캔 대상
///
/// 작업 공간의 checkout 경로와 분석 서버에 전달할 프로젝트 키를 담습니다.
/// 모든 어댑터가 같은 대상을 읽기 전용으로 공유합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    /// checkout 경로
    pub path: PathBuf,
    /// 프로젝트 키 (`owner_repo`)
    pub project_key: String,
}

impl ScanTarget {
    /// 새 스캔 대상을 생성합니다.
    pub fn new(path: impl Into<PathBuf>, project_key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            project_key: project_key.into(),
        }
    }
}

/// 스캐너 어댑터 trait
///
/// 구현체는 외부 프로세스를 타임아웃 안에서 한 번 실행하고 결과를 정규화합니다.
/// 대상 디렉토리에 쓰지 않아야 합니다.
pub trait ScanAdapter: Send + Sync {
    /// 정규화된 결과 타입
    type Output: Send;

    /// 스캐너 종류를 반환합니다.
    fn kind(&self) -> ScannerKind;

    /// 대상을 스캔합니다.
    ///
    /// # Errors
    ///
    /// - `ScanError::ToolMissing`: 도구가 설치되지 않음
    /// - `ScanError::Timeout`: 설정된 타임아웃 초과
    /// - `ScanError::InvalidOutput`: 출력 파싱 실패
    /// - `ScanError::ExecutionFailed`: 출력 없는 비정상 종료
    fn scan(
        &self,
        target: &ScanTarget,
    ) -> impl Future<Output = Result<Self::Output, ScanError>> + Send;
}

/// 도구가 보고한 파일 경로를 checkout 기준 상대 경로로 바꿉니다.
///
/// 리포트에 임시 디렉토리 경로가 남지 않도록 합니다.
pub fn relative_path(file: &str, root: &Path) -> String {
    let path = Path::new(file);
    let relative = path
        .strip_prefix(root)
        .or_else(|_| match root.canonicalize() {
            Ok(canonical) => path.strip_prefix(canonical),
            Err(_) => path.strip_prefix(root),
        })
        .unwrap_or(path);
    let display = relative.display().to_string();
    match display.strip_prefix("./") {
        Some(stripped) => stripped.to_owned(),
        None => display,
    }
}
