//! 설정 관리 -- gatekeeper.toml 파싱 및 런타임 설정
//!
//! [`GatekeeperConfig`]는 파이프라인 전체 설정을 담는 최상위 구조체입니다.
//! 프로세스 시작 시 한 번 생성된 뒤 참조로 오케스트레이터와 각 어댑터에 전달되며,
//! 이후 어떤 코드도 환경변수를 직접 읽지 않습니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`GATEKEEPER_SECRET_SCAN_API_KEY=...` 형식)
//! 3. 설정 파일 (`gatekeeper.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), gatekeeper_core::error::GatekeeperError> {
//! use gatekeeper_core::config::GatekeeperConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = GatekeeperConfig::load("gatekeeper.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = GatekeeperConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, GatekeeperError};

/// 외부 도구 인자에서 checkout 경로로 치환되는 자리표시자
pub const PATH_PLACEHOLDER: &str = "{path}";

/// 외부 프로세스 타임아웃 상한 (초)
const MAX_TIMEOUT_SECS: u64 = 3600;

/// 탐색 대상 파일 크기 상한 (바이트)
const MAX_DISCOVERY_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Gatekeeper 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatekeeperConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 작업 공간(clone) 설정
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    /// 정적 분석 스캐너 설정 (필수)
    #[serde(default)]
    pub static_analysis: StaticAnalysisConfig,
    /// 시크릿 스캐너 설정 (best-effort)
    #[serde(default)]
    pub secret_scan: SecretScanConfig,
    /// 보안 린터 설정 (best-effort)
    #[serde(default)]
    pub lint: LintConfig,
    /// 도구 탐색 설정
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// 레지스트리 저장소 설정
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl GatekeeperConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, GatekeeperError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일 없이 기본값 + 환경변수로 설정을 생성합니다.
    pub fn from_env() -> Result<Self, GatekeeperError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, GatekeeperError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GatekeeperError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                GatekeeperError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, GatekeeperError> {
        toml::from_str(toml_str).map_err(|e| {
            GatekeeperError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `GATEKEEPER_{SECTION}_{FIELD}`
    /// 예: `GATEKEEPER_LINT_TIMEOUT_SECS=300`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "GATEKEEPER_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "GATEKEEPER_GENERAL_LOG_FORMAT");

        // Workspace
        override_string(
            &mut self.workspace.git_program,
            "GATEKEEPER_WORKSPACE_GIT_PROGRAM",
        );
        override_u64(
            &mut self.workspace.clone_timeout_secs,
            "GATEKEEPER_WORKSPACE_CLONE_TIMEOUT_SECS",
        );
        override_u32(
            &mut self.workspace.clone_depth,
            "GATEKEEPER_WORKSPACE_CLONE_DEPTH",
        );
        override_string(
            &mut self.workspace.temp_prefix,
            "GATEKEEPER_WORKSPACE_TEMP_PREFIX",
        );
        override_string(
            &mut self.workspace.auth_token,
            "GATEKEEPER_WORKSPACE_AUTH_TOKEN",
        );

        // Static analysis
        override_string(
            &mut self.static_analysis.program,
            "GATEKEEPER_STATIC_ANALYSIS_PROGRAM",
        );
        override_u64(
            &mut self.static_analysis.timeout_secs,
            "GATEKEEPER_STATIC_ANALYSIS_TIMEOUT_SECS",
        );
        override_string(
            &mut self.static_analysis.token,
            "GATEKEEPER_STATIC_ANALYSIS_TOKEN",
        );
        override_string(
            &mut self.static_analysis.host_url,
            "GATEKEEPER_STATIC_ANALYSIS_HOST_URL",
        );

        // Secret scan
        override_string(
            &mut self.secret_scan.program,
            "GATEKEEPER_SECRET_SCAN_PROGRAM",
        );
        override_u64(
            &mut self.secret_scan.timeout_secs,
            "GATEKEEPER_SECRET_SCAN_TIMEOUT_SECS",
        );
        override_string(
            &mut self.secret_scan.api_key,
            "GATEKEEPER_SECRET_SCAN_API_KEY",
        );

        // Lint
        override_string(&mut self.lint.program, "GATEKEEPER_LINT_PROGRAM");
        override_u64(&mut self.lint.timeout_secs, "GATEKEEPER_LINT_TIMEOUT_SECS");

        // Discovery
        override_u64(
            &mut self.discovery.max_file_size,
            "GATEKEEPER_DISCOVERY_MAX_FILE_SIZE",
        );
        override_usize(
            &mut self.discovery.max_files,
            "GATEKEEPER_DISCOVERY_MAX_FILES",
        );
        override_csv(
            &mut self.discovery.skip_dirs,
            "GATEKEEPER_DISCOVERY_SKIP_DIRS",
        );

        // Registry
        override_string(&mut self.registry.path, "GATEKEEPER_REGISTRY_PATH");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), GatekeeperError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.workspace.git_program.trim().is_empty() {
            return Err(invalid("workspace.git_program", "must not be empty"));
        }
        validate_timeout(
            "workspace.clone_timeout_secs",
            self.workspace.clone_timeout_secs,
        )?;
        if self.workspace.temp_prefix.is_empty()
            || self.workspace.temp_prefix.contains(std::path::MAIN_SEPARATOR)
            || self.workspace.temp_prefix.contains('/')
        {
            return Err(invalid(
                "workspace.temp_prefix",
                "must be a non-empty file name prefix",
            ));
        }

        validate_tool(
            "static_analysis",
            &self.static_analysis.program,
            &self.static_analysis.args,
            self.static_analysis.timeout_secs,
        )?;
        validate_tool(
            "secret_scan",
            &self.secret_scan.program,
            &self.secret_scan.args,
            self.secret_scan.timeout_secs,
        )?;
        validate_tool(
            "lint",
            &self.lint.program,
            &self.lint.args,
            self.lint.timeout_secs,
        )?;

        if self.discovery.max_file_size == 0
            || self.discovery.max_file_size > MAX_DISCOVERY_FILE_SIZE
        {
            return Err(invalid(
                "discovery.max_file_size",
                format!("must be 1-{MAX_DISCOVERY_FILE_SIZE}"),
            ));
        }
        if self.discovery.max_files == 0 {
            return Err(invalid("discovery.max_files", "must be greater than 0"));
        }

        if self.registry.path.is_empty() {
            return Err(invalid("registry.path", "must not be empty"));
        }
        if Path::new(&self.registry.path)
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(invalid(
                "registry.path",
                "contains path traversal pattern '..'",
            ));
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 작업 공간 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// git 실행 파일
    pub git_program: String,
    /// clone 타임아웃 (초)
    pub clone_timeout_secs: u64,
    /// shallow clone 깊이 (0이면 전체 이력)
    pub clone_depth: u32,
    /// 임시 디렉토리 이름 접두어
    pub temp_prefix: String,
    /// 비공개 저장소용 토큰 (비어 있으면 사용하지 않음)
    pub auth_token: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            git_program: "git".to_owned(),
            clone_timeout_secs: 300,
            clone_depth: 1,
            temp_prefix: "gatekeeper_scan_".to_owned(),
            auth_token: String::new(),
        }
    }
}

/// 정적 분석 스캐너 설정
///
/// 설정된 명령은 분석 결과를 JSON 객체 하나로 stdout에 출력해야 합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticAnalysisConfig {
    /// 실행 파일
    pub program: String,
    /// 인자 (`{path}`는 checkout 경로로 치환)
    pub args: Vec<String>,
    /// 타임아웃 (초)
    pub timeout_secs: u64,
    /// 분석 서버 토큰 (`SONAR_TOKEN`으로 전달)
    pub token: String,
    /// 분석 서버 URL (`SONAR_HOST_URL`로 전달)
    pub host_url: String,
}

impl Default for StaticAnalysisConfig {
    fn default() -> Self {
        Self {
            program: "sonar-report".to_owned(),
            args: vec!["--format".to_owned(), "json".to_owned(), "{path}".to_owned()],
            timeout_secs: 600,
            token: String::new(),
            host_url: "https://sonarcloud.io".to_owned(),
        }
    }
}

/// 시크릿 스캐너 설정 (ggshield)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretScanConfig {
    /// 실행 파일
    pub program: String,
    /// 인자 (`{path}`는 checkout 경로로 치환)
    pub args: Vec<String>,
    /// 타임아웃 (초)
    pub timeout_secs: u64,
    /// GitGuardian API 키 (`GITGUARDIAN_API_KEY`로 전달)
    pub api_key: String,
}

impl Default for SecretScanConfig {
    fn default() -> Self {
        Self {
            program: "ggshield".to_owned(),
            args: ["secret", "scan", "repo", "{path}", "--json", "--exit-zero"]
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            timeout_secs: 60,
            api_key: String::new(),
        }
    }
}

/// 보안 린터 설정 (bandit)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    /// 실행 파일
    pub program: String,
    /// 인자 (`{path}`는 checkout 경로로 치환)
    pub args: Vec<String>,
    /// 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            program: "bandit".to_owned(),
            args: ["-r", "{path}", "-f", "json", "-q"]
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            timeout_secs: 120,
        }
    }
}

/// 도구 탐색 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// 읽을 파일의 최대 크기 (바이트)
    pub max_file_size: u64,
    /// 검사할 최대 파일 수
    pub max_files: usize,
    /// 건너뛸 디렉토리 이름
    pub skip_dirs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024, // 1 MB
            max_files: 10_000,
            skip_dirs: [
                ".git",
                "node_modules",
                ".venv",
                "venv",
                "__pycache__",
                "dist",
                "build",
                "target",
            ]
            .iter()
            .map(|s| (*s).to_owned())
            .collect(),
        }
    }
}

/// 레지스트리 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// 레지스트리 JSON 문서 경로
    pub path: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: "registry/mcp.json".to_owned(),
        }
    }
}

// --- 검증 헬퍼 ---

fn invalid(field: &str, reason: impl Into<String>) -> GatekeeperError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

fn validate_timeout(field: &str, secs: u64) -> Result<(), GatekeeperError> {
    if secs == 0 || secs > MAX_TIMEOUT_SECS {
        return Err(invalid(field, format!("must be 1-{MAX_TIMEOUT_SECS}")));
    }
    Ok(())
}

fn validate_tool(
    section: &str,
    program: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<(), GatekeeperError> {
    if program.trim().is_empty() {
        return Err(invalid(&format!("{section}.program"), "must not be empty"));
    }
    if !args.iter().any(|a| a.contains(PATH_PLACEHOLDER)) {
        return Err(invalid(
            &format!("{section}.args"),
            format!("must contain the {PATH_PLACEHOLDER} placeholder"),
        ));
    }
    validate_timeout(&format!("{section}.timeout_secs"), timeout_secs)
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
