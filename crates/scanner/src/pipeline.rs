//! 스캔 오케스트레이터 -- 작업 공간, 탐색, 스캐너, 집계의 순서 제어
//!
//! # 실행 순서
//!
//! ```text
//! Start -> Fetching --(실패)--> Aborted
//!              |
//!              v
//!        StaticAnalysis --(실패)--> Aborted (작업 공간 정리)
//!              |
//!              v
//!   Discovery | SecretScan | Lint   (동시 실행, best-effort 실패는 기본값으로 대체)
//!              |
//!              v
//!         Aggregating -> Cleanup -> Done
//! ```
//!
//! 작업 공간은 fetch 성공 이후 어떤 경로로 끝나든 정리됩니다. 명시적으로
//! [`Workspace::release`]를 호출하고, 패닉으로 풀리는 경우에는 drop이 처리합니다.

use std::future::Future;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use gatekeeper_core::config::GatekeeperConfig;
use gatekeeper_core::error::{ConfigError, GatekeeperError};
use gatekeeper_core::metrics as m;
use gatekeeper_core::types::{
    LintResult, PipelineOutcome, RepoIdentity, ScanRequest, ScannerDiagnostic, SecretScanResult,
    SecurityReport, StaticAnalysisResult, ToolManifest,
};

use crate::adapter::static_analysis::failure_reason;
use crate::adapter::{
    LintAdapter, ScanAdapter, ScanTarget, ScannerKind, SecretScanAdapter, StaticAnalysisAdapter,
};
use crate::aggregator::aggregate;
use crate::discovery::ToolDiscovery;
use crate::error::{ScanError, ScannerError};
use crate::workspace::{GitFetcher, RepoFetcher, Workspace, WorkspaceManager};

/// 저장소 스캔 진입점 trait
///
/// 프로세스 경계 어댑터는 이 trait을 통해 파이프라인을 호출하므로,
/// 테스트에서는 외부 도구 없이 결과를 대체할 수 있습니다.
pub trait RepositoryScanner: Send + Sync {
    /// 요청 하나에 대해 파이프라인을 한 번 실행합니다.
    fn scan_repository(
        &self,
        request: &ScanRequest,
    ) -> impl Future<Output = PipelineOutcome> + Send;
}

/// 스캔 파이프라인
///
/// 요청 간 공유 상태는 읽기 전용 설정뿐입니다. 실행마다 새 작업 공간과 결과 값을 만듭니다.
pub struct ScanPipeline<
    F = GitFetcher,
    S = StaticAnalysisAdapter,
    X = SecretScanAdapter,
    L = LintAdapter,
> {
    workspace: WorkspaceManager<F>,
    discovery: ToolDiscovery,
    static_analysis: S,
    secrets: X,
    lint: L,
}

impl ScanPipeline {
    /// 설정에서 실제 git/외부 도구를 사용하는 파이프라인을 생성합니다.
    ///
    /// # Errors
    ///
    /// 설정 검증에 실패하면 `ScannerError::Config`를 반환합니다.
    pub fn from_config(config: &GatekeeperConfig) -> Result<Self, ScannerError> {
        config.validate().map_err(|e| match e {
            GatekeeperError::Config(ConfigError::InvalidValue { field, reason }) => {
                ScannerError::Config { field, reason }
            }
            other => ScannerError::Config {
                field: "config".to_owned(),
                reason: other.to_string(),
            },
        })?;

        Ok(Self::new(
            WorkspaceManager::from_config(&config.workspace),
            ToolDiscovery::new(&config.discovery),
            StaticAnalysisAdapter::new(&config.static_analysis),
            SecretScanAdapter::new(&config.secret_scan),
            LintAdapter::new(&config.lint),
        ))
    }
}

impl<F, S, X, L> ScanPipeline<F, S, X, L>
where
    F: RepoFetcher,
    S: ScanAdapter<Output = StaticAnalysisResult>,
    X: ScanAdapter<Output = SecretScanResult>,
    L: ScanAdapter<Output = LintResult>,
{
    /// 구성 요소를 직접 지정해 파이프라인을 생성합니다.
    pub fn new(
        workspace: WorkspaceManager<F>,
        discovery: ToolDiscovery,
        static_analysis: S,
        secrets: X,
        lint: L,
    ) -> Self {
        Self {
            workspace,
            discovery,
            static_analysis,
            secrets,
            lint,
        }
    }

    /// 파이프라인을 실행하고 리포트와 도구 목록을 반환합니다.
    ///
    /// # Errors
    ///
    /// - `ScannerError::Fetch`: 저장소를 가져오지 못함
    /// - `ScannerError::MandatoryScan`: 정적 분석 도구 실행 실패
    /// - `ScannerError::Rejected`: 정적 분석이 실패를 보고함
    pub async fn run(
        &self,
        request: &ScanRequest,
    ) -> Result<(SecurityReport, ToolManifest), ScannerError> {
        let scan_id = Uuid::new_v4();
        let span = info_span!("scan", %scan_id, server_name = %request.server_name);
        self.run_inner(request).instrument(span).await
    }

    /// 파이프라인을 실행하고 호출자에게 보낼 [`PipelineOutcome`]으로 변환합니다.
    pub async fn execute(&self, request: &ScanRequest) -> PipelineOutcome {
        match self.run(request).await {
            Ok((report, manifest)) => PipelineOutcome::success(report, manifest.into()),
            Err(e) => PipelineOutcome::failure(e.to_string()),
        }
    }

    async fn run_inner(
        &self,
        request: &ScanRequest,
    ) -> Result<(SecurityReport, ToolManifest), ScannerError> {
        counter!(m::SCANS_STARTED_TOTAL).increment(1);
        let started = Instant::now();

        let identity = RepoIdentity::from_request(request);
        info!(
            repo_url = %identity.repo_url,
            repo_name = %identity.repo_name,
            "scan started"
        );

        let workspace = match self.workspace.acquire(&request.repo_url).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!(error = %e, "repository fetch failed");
                counter!(m::SCANS_FAILED_TOTAL, m::LABEL_STAGE => "fetch").increment(1);
                return Err(e.into());
            }
        };

        let result = self.scan_workspace(&workspace, &identity).await;
        workspace.release();

        let elapsed = started.elapsed();
        histogram!(m::SCAN_DURATION_SECONDS).record(elapsed.as_secs_f64());

        match result {
            Ok((ref report, ref manifest)) => {
                counter!(m::SCANS_SUCCEEDED_TOTAL).increment(1);
                info!(
                    tools = manifest.tool_count(),
                    secrets = report.total_secrets,
                    issues = report.total_issues,
                    duration_ms = elapsed.as_millis() as u64,
                    "scan completed"
                );
            }
            Err(ref e) => {
                counter!(m::SCANS_FAILED_TOTAL, m::LABEL_STAGE => ScannerKind::StaticAnalysis.as_str())
                    .increment(1);
                warn!(
                    error = %e,
                    duration_ms = elapsed.as_millis() as u64,
                    "scan aborted"
                );
            }
        }

        result
    }

    async fn scan_workspace(
        &self,
        workspace: &Workspace,
        identity: &RepoIdentity,
    ) -> Result<(SecurityReport, ToolManifest), ScannerError> {
        let target = ScanTarget::new(workspace.root_path(), identity.repo_name.as_str());

        // 필수 단계: 이후 단계보다 먼저, 단독으로 실행
        let static_result = self.static_analysis.scan(&target).await?;
        if !static_result.success {
            return Err(ScannerError::Rejected(failure_reason(&static_result)));
        }

        let (manifest, secrets, lint) = tokio::join!(
            self.discovery.discover(&target.path),
            self.secrets.scan(&target),
            self.lint.scan(&target),
        );

        let mut diagnostics = Vec::new();
        let secrets = best_effort(self.secrets.kind(), secrets, &mut diagnostics);
        let lint = best_effort(self.lint.kind(), lint, &mut diagnostics);

        histogram!(m::TOOLS_DISCOVERED).record(manifest.tool_count() as f64);

        let report = aggregate(identity, static_result, secrets, lint, diagnostics);
        Ok((report, manifest))
    }
}

impl<F, S, X, L> RepositoryScanner for ScanPipeline<F, S, X, L>
where
    F: RepoFetcher,
    S: ScanAdapter<Output = StaticAnalysisResult>,
    X: ScanAdapter<Output = SecretScanResult>,
    L: ScanAdapter<Output = LintResult>,
{
    async fn scan_repository(&self, request: &ScanRequest) -> PipelineOutcome {
        self.execute(request).await
    }
}

/// best-effort 스캐너 결과를 적용합니다. 실패는 기본값으로 대체하고 진단 정보를 남깁니다.
fn best_effort<T: Default>(
    kind: ScannerKind,
    result: Result<T, ScanError>,
    diagnostics: &mut Vec<ScannerDiagnostic>,
) -> T {
    result.unwrap_or_else(|e| {
        warn!(
            scanner = kind.as_str(),
            kind = e.kind(),
            error = %e,
            "best-effort scanner failed, using empty result"
        );
        counter!(
            m::SCANNER_FALLBACKS_TOTAL,
            m::LABEL_SCANNER => kind.as_str(),
            m::LABEL_KIND => e.kind()
        )
        .increment(1);
        diagnostics.push(ScannerDiagnostic {
            scanner: kind.as_str().to_owned(),
            kind: e.kind().to_owned(),
            message: e.to_string(),
        });
        T::default()
    })
}
