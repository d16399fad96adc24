//! 에러 타입 -- 도메인별 에러 정의
//!
//! 각 크레이트는 자기 도메인 에러(`WorkspaceError`, `ScanError`, `CliError` 등)를 가지며,
//! `From` 구현을 통해 [`GatekeeperError`]로 변환됩니다.

/// Gatekeeper 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum GatekeeperError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 스캔 파이프라인 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 레지스트리 저장소 에러
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 스캔 파이프라인 에러
///
/// 호출자에게 `{success: false, error}`로 노출되는 파이프라인 치명 에러입니다.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 저장소 fetch(clone) 실패
    #[error("repository fetch failed: {0}")]
    Fetch(String),

    /// 필수 스캐너(정적 분석) 실패
    #[error("static analysis failed: {0}")]
    MandatoryScan(String),

    /// 리포트 집계 실패
    ///
    /// 예약된 variant입니다. 현재 집계(`aggregate`)는 실패하지 않으므로 생성되지 않으며,
    /// 외부 호출자가 에러 분류를 완전하게 매칭할 수 있도록 남겨 둡니다.
    #[error("report aggregation failed: {0}")]
    Aggregation(String),
}

/// 레지스트리 저장소 에러
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// 서버 레코드를 찾을 수 없음
    #[error("server '{0}' not found")]
    NotFound(String),

    /// 저장소 읽기 실패
    #[error("failed to read registry {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    /// 레지스트리 문서가 손상됨
    #[error("corrupt registry document {path}: {reason}")]
    Corrupt { path: String, reason: String },

    /// 잘못된 레코드
    #[error("invalid server record: {0}")]
    InvalidRecord(String),

    /// 저장소 쓰기 실패
    #[error("failed to write registry {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}
