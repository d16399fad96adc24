//! Gatekeeper 스캔 파이프라인
//!
//! MCP 서버 저장소를 임시 작업 공간에 clone하고, 선언된 도구를 탐색하고,
//! 외부 보안 분석 도구를 실행한 뒤 결과를 하나의 보안 리포트로 병합합니다.
//!
//! # Module Structure
//!
//! - [`error`]: 도메인 에러 (`WorkspaceError`, `ScanError`, `ScannerError`)
//! - [`workspace`]: 임시 작업 공간과 clone (`WorkspaceManager`, `RepoFetcher`, `GitFetcher`)
//! - [`discovery`]: 정적 도구 탐색 (`ToolDiscovery`)
//! - [`adapter`]: 외부 도구 어댑터 (`ScanAdapter`, 정적 분석, ggshield, bandit)
//! - [`aggregator`]: 리포트 병합 (`aggregate`)
//! - [`pipeline`]: 오케스트레이터 (`ScanPipeline`, `RepositoryScanner`)
//!
//! # Architecture
//!
//! ```text
//! ScanRequest --> WorkspaceManager --> Workspace
//!                                          |
//!                                 StaticAnalysisAdapter (필수)
//!                                          |
//!                 +------------------------+------------------------+
//!                 |                        |                        |
//!           ToolDiscovery          SecretScanAdapter           LintAdapter
//!                 |                        |                        |
//!            ToolManifest           SecretScanResult            LintResult
//!                 +------------------------+------------------------+
//!                                          |
//!                                      aggregate
//!                                          |
//!                                   PipelineOutcome
//! ```

pub mod adapter;
pub mod aggregator;
pub mod discovery;
pub mod error;
pub mod pipeline;
pub mod workspace;

// --- Public API Re-exports ---

// Orchestrator
pub use pipeline::{RepositoryScanner, ScanPipeline};

// Error
pub use error::{ScanError, ScannerError, WorkspaceError};

// Workspace
pub use workspace::{GitFetcher, RepoFetcher, Workspace, WorkspaceManager};

// Discovery
pub use discovery::ToolDiscovery;

// Adapters
pub use adapter::{
    LintAdapter, ScanAdapter, ScanTarget, ScannerKind, SecretScanAdapter, StaticAnalysisAdapter,
};

// Aggregation
pub use aggregator::aggregate;
