//! Gatekeeper 공통 크레이트
//!
//! MCP 서버 등록 전 보안 스캔 파이프라인이 공유하는 도메인 타입, 에러, 설정,
//! 메트릭 이름을 정의합니다. 외부 프로세스 실행이나 파일 시스템 작업은 포함하지 않습니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, GatekeeperError, PipelineError, RegistryError};

// 설정
pub use config::GatekeeperConfig;

// 도메인 타입
pub use types::{
    LintFinding, LintResult, PipelineOutcome, RepoIdentity, ScanRequest, ScannerDiagnostic,
    SecretFinding, SecretScanResult, SecurityReport, StaticAnalysisResult, ToolManifest,
    ToolsSummary,
};
