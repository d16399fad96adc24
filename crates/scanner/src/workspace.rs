//! 작업 공간 관리 -- 요청별 임시 디렉토리와 저장소 clone
//!
//! [`WorkspaceManager::acquire`]는 고유한 이름의 임시 디렉토리를 만들고 그 안에 저장소를
//! clone합니다. 반환된 [`Workspace`]는 디렉토리를 소유하며, [`Workspace::release`]를
//! 호출하거나 drop되는 순간 디렉토리 트리를 삭제합니다. 따라서 정상 종료, 조기 반환,
//! 에러 전파 어느 경로에서도 디렉토리가 남지 않습니다.
//!
//! clone은 [`RepoFetcher`] trait 뒤에 있어 테스트에서 git 없이 대체할 수 있습니다.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

use gatekeeper_core::config::WorkspaceConfig;

use crate::error::WorkspaceError;

/// checkout 디렉토리 이름 (임시 디렉토리 아래)
const CHECKOUT_DIR: &str = "repo";

/// 저장소 fetch trait
///
/// `dest`는 아직 존재하지 않는 경로이며, 구현체는 그 위치에 checkout을 만들어야 합니다.
pub trait RepoFetcher: Send + Sync {
    /// 저장소를 `dest`로 가져옵니다.
    fn fetch(
        &self,
        repo_url: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<(), WorkspaceError>> + Send;
}

/// git CLI 기반 fetcher
///
/// shallow, single-branch, 태그 없이 clone하며 hook과 템플릿, 터미널 프롬프트를 끕니다.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    program: String,
    depth: u32,
    timeout: Duration,
    auth_token: Option<String>,
}

impl GitFetcher {
    /// 설정에서 fetcher를 생성합니다.
    pub fn new(config: &WorkspaceConfig) -> Self {
        let auth_token = if config.auth_token.is_empty() {
            None
        } else {
            Some(config.auth_token.clone())
        };
        Self {
            program: config.git_program.clone(),
            depth: config.clone_depth,
            timeout: Duration::from_secs(config.clone_timeout_secs),
            auth_token,
        }
    }

    /// 저장소 URL을 검증합니다.
    ///
    /// `https://` 또는 `git@` 형식만 허용합니다. 로컬 경로, `file://`, `ext::` 같은
    /// 전송 방식은 거부됩니다.
    pub fn validate_url(url: &str) -> Result<(), WorkspaceError> {
        let reject = |reason: &str| WorkspaceError::InvalidUrl {
            url: url.to_owned(),
            reason: reason.to_owned(),
        };

        if url.trim().is_empty() {
            return Err(reject("url is empty"));
        }
        if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(reject("url contains whitespace or control characters"));
        }

        if let Some(rest) = url.strip_prefix("https://") {
            let host = rest.split('/').next().unwrap_or_default();
            if host.is_empty() || rest.len() <= host.len() + 1 {
                return Err(reject("missing host or repository path"));
            }
            return Ok(());
        }

        if let Some(rest) = url.strip_prefix("git@") {
            match rest.split_once(':') {
                Some((host, path)) if !host.is_empty() && !path.is_empty() => return Ok(()),
                _ => return Err(reject("expected git@host:owner/repo")),
            }
        }

        Err(reject("only https:// and git@ urls are supported"))
    }

    /// 토큰이 설정되어 있으면 https URL에 삽입합니다.
    fn clone_url(&self, url: &str) -> String {
        match (&self.auth_token, url.strip_prefix("https://")) {
            (Some(token), Some(rest)) if !rest.split('/').next().unwrap_or_default().contains('@') => {
                format!("https://{token}@{rest}")
            }
            _ => url.to_owned(),
        }
    }

    /// clone 실패 stderr를 사용자에게 보일 사유로 분류합니다. 토큰은 제거됩니다.
    fn classify_failure(&self, stderr: &str) -> String {
        let lower = stderr.to_lowercase();
        if lower.contains("repository not found") || lower.contains("does not exist") {
            return "repository not found or not accessible".to_owned();
        }
        if lower.contains("authentication failed")
            || lower.contains("could not read username")
            || lower.contains("permission denied")
        {
            return "authentication required".to_owned();
        }
        if lower.contains("could not resolve host") {
            return "host unreachable".to_owned();
        }

        let mut reason = stderr.trim().to_owned();
        if let Some(ref token) = self.auth_token {
            reason = reason.replace(token.as_str(), "***");
        }
        if reason.is_empty() {
            "git exited with an error".to_owned()
        } else {
            reason
        }
    }
}

impl RepoFetcher for GitFetcher {
    async fn fetch(&self, repo_url: &str, dest: &Path) -> Result<(), WorkspaceError> {
        Self::validate_url(repo_url)?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("-c").arg("core.hooksPath=/dev/null").arg("clone");
        if self.depth > 0 {
            cmd.arg("--depth").arg(self.depth.to_string());
        }
        cmd.args(["--single-branch", "--no-tags", "--quiet", "--"])
            .arg(self.clone_url(repo_url))
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_TEMPLATE_DIR", "")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(repo_url, depth = self.depth, "cloning repository");

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WorkspaceError::GitNotFound(self.program.clone())
            } else {
                WorkspaceError::CloneFailed(format!("failed to spawn git: {e}"))
            }
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| WorkspaceError::Timeout(self.timeout))?
            .map_err(|e| WorkspaceError::CloneFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WorkspaceError::CloneFailed(self.classify_failure(&stderr)));
        }

        Ok(())
    }
}

/// 요청 하나가 독점하는 임시 작업 공간
///
/// drop 시 디렉토리 트리가 삭제됩니다.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    checkout: PathBuf,
}

impl Workspace {
    /// 저장소 checkout 경로 (분석 대상)
    pub fn root_path(&self) -> &Path {
        &self.checkout
    }

    /// 임시 디렉토리 경로 (checkout의 부모)
    pub fn temp_path(&self) -> &Path {
        self.dir.path()
    }

    /// 작업 공간을 삭제합니다. 삭제 실패는 경고로만 남깁니다.
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "workspace removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove workspace"),
        }
    }
}

/// 작업 공간 관리자
#[derive(Debug, Clone)]
pub struct WorkspaceManager<F> {
    fetcher: F,
    temp_prefix: String,
    base_dir: Option<PathBuf>,
}

impl WorkspaceManager<GitFetcher> {
    /// git fetcher로 관리자를 생성합니다.
    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self::new(GitFetcher::new(config), &config.temp_prefix)
    }
}

impl<F: RepoFetcher> WorkspaceManager<F> {
    /// 주어진 fetcher로 관리자를 생성합니다.
    pub fn new(fetcher: F, temp_prefix: &str) -> Self {
        Self {
            fetcher,
            temp_prefix: temp_prefix.to_owned(),
            base_dir: None,
        }
    }

    /// 임시 디렉토리를 만들 상위 디렉토리를 지정합니다 (기본값: 시스템 임시 디렉토리).
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// 새 작업 공간을 만들고 저장소를 clone합니다.
    ///
    /// 실패하면 만들었던 임시 디렉토리는 반환 전에 삭제됩니다.
    pub async fn acquire(&self, repo_url: &str) -> Result<Workspace, WorkspaceError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.temp_prefix);
        let dir = match self.base_dir {
            Some(ref base) => builder.tempdir_in(base),
            None => builder.tempdir(),
        }
        .map_err(WorkspaceError::TempDir)?;

        let checkout = dir.path().join(CHECKOUT_DIR);
        self.fetcher.fetch(repo_url, &checkout).await?;

        if !has_content(&checkout).await {
            return Err(WorkspaceError::EmptyCheckout);
        }

        info!(path = %checkout.display(), "workspace ready");
        Ok(Workspace { dir, checkout })
    }
}

/// `.git` 외의 항목이 하나라도 있는지 확인합니다.
async fn has_content(checkout: &Path) -> bool {
    let Ok(mut entries) = tokio::fs::read_dir(checkout).await else {
        return false;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name() != ".git" {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CopyFetcher {
        files: Vec<(&'static str, &'static str)>,
    }

    impl RepoFetcher for CopyFetcher {
        async fn fetch(&self, _repo_url: &str, dest: &Path) -> Result<(), WorkspaceError> {
            tokio::fs::create_dir_all(dest).await.unwrap();
            for (name, content) in &self.files {
                tokio::fs::write(dest.join(name), content).await.unwrap();
            }
            Ok(())
        }
    }

    struct FailingFetcher;

    impl RepoFetcher for FailingFetcher {
        async fn fetch(&self, repo_url: &str, _dest: &Path) -> Result<(), WorkspaceError> {
            GitFetcher::validate_url(repo_url)?;
            Err(WorkspaceError::CloneFailed("remote hung up".to_owned()))
        }
    }

    fn git_fetcher(token: &str) -> GitFetcher {
        GitFetcher::new(&WorkspaceConfig {
            auth_token: token.to_owned(),
            ..WorkspaceConfig::default()
        })
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn validate_url_accepts_https_and_ssh() {
        GitFetcher::validate_url("https://github.com/acme/weather-mcp").unwrap();
        GitFetcher::validate_url("https://github.com/acme/weather-mcp.git").unwrap();
        GitFetcher::validate_url("git@github.com:acme/weather-mcp.git").unwrap();
    }

    #[test]
    fn validate_url_rejects_other_schemes() {
        for url in [
            "",
            "http://github.com/acme/repo",
            "file:///etc",
            "ext::sh -c touch% /tmp/pwned",
            "/home/user/repo",
            "--upload-pack=evil",
            "https://",
            "https://github.com",
            "git@github.com",
            "https://github.com/acme/repo\nmalicious",
        ] {
            assert!(
                matches!(
                    GitFetcher::validate_url(url),
                    Err(WorkspaceError::InvalidUrl { .. })
                ),
                "should reject {url:?}"
            );
        }
    }

    #[test]
    fn clone_url_injects_token_into_https() {
        let fetcher = git_fetcher("ghp_token123");
        assert_eq!(
            fetcher.clone_url("https://github.com/acme/private"),
            "https://ghp_token123@github.com/acme/private"
        );
    }

    #[test]
    fn clone_url_without_token_is_unchanged() {
        let fetcher = git_fetcher("");
        assert_eq!(
            fetcher.clone_url("https://github.com/acme/repo"),
            "https://github.com/acme/repo"
        );
    }

    #[test]
    fn clone_url_leaves_ssh_and_existing_userinfo() {
        let fetcher = git_fetcher("ghp_token123");
        assert_eq!(
            fetcher.clone_url("git@github.com:acme/repo.git"),
            "git@github.com:acme/repo.git"
        );
        assert_eq!(
            fetcher.clone_url("https://user@github.com/acme/repo"),
            "https://user@github.com/acme/repo"
        );
    }

    #[test]
    fn classify_failure_recognises_common_errors() {
        let fetcher = git_fetcher("");
        assert_eq!(
            fetcher.classify_failure("remote: Repository not found.\nfatal: repository 'x' not found"),
            "repository not found or not accessible"
        );
        assert_eq!(
            fetcher.classify_failure("fatal: Authentication failed for 'https://github.com/a/b'"),
            "authentication required"
        );
        assert_eq!(
            fetcher.classify_failure("fatal: could not read Username for 'https://github.com'"),
            "authentication required"
        );
    }

    #[test]
    fn classify_failure_redacts_token() {
        let fetcher = git_fetcher("ghp_secret");
        let reason = fetcher.classify_failure("fatal: unable to access 'https://ghp_secret@host/x'");
        assert!(!reason.contains("ghp_secret"));
        assert!(reason.contains("***"));
    }

    #[tokio::test]
    async fn acquire_creates_checkout_and_release_removes_it() {
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(
            CopyFetcher {
                files: vec![("server.py", "print('hi')")],
            },
            "gatekeeper_test_",
        )
        .with_base_dir(base.path());

        let workspace = manager
            .acquire("https://github.com/acme/weather-mcp")
            .await
            .unwrap();
        assert!(workspace.root_path().join("server.py").exists());
        assert!(
            workspace
                .temp_path()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("gatekeeper_test_")
        );
        assert_eq!(entries(base.path()), 1);

        workspace.release();
        assert_eq!(entries(base.path()), 0);
    }

    #[tokio::test]
    async fn dropping_workspace_removes_directory() {
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(
            CopyFetcher {
                files: vec![("index.ts", "export {}")],
            },
            "gatekeeper_test_",
        )
        .with_base_dir(base.path());

        {
            let _workspace = manager.acquire("https://host/org/repo").await.unwrap();
            assert_eq!(entries(base.path()), 1);
        }
        assert_eq!(entries(base.path()), 0);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_no_directory() {
        let base = tempfile::tempdir().unwrap();
        let manager =
            WorkspaceManager::new(FailingFetcher, "gatekeeper_test_").with_base_dir(base.path());

        let err = manager.acquire("not-a-url").await.unwrap_err();
        assert!(matches!(err, WorkspaceError::InvalidUrl { .. }));
        assert_eq!(entries(base.path()), 0);

        let err = manager.acquire("https://host/org/repo").await.unwrap_err();
        assert!(matches!(err, WorkspaceError::CloneFailed(_)));
        assert_eq!(entries(base.path()), 0);
    }

    #[tokio::test]
    async fn checkout_with_only_git_dir_is_empty() {
        struct GitOnlyFetcher;
        impl RepoFetcher for GitOnlyFetcher {
            async fn fetch(&self, _url: &str, dest: &Path) -> Result<(), WorkspaceError> {
                tokio::fs::create_dir_all(dest.join(".git")).await.unwrap();
                Ok(())
            }
        }

        let base = tempfile::tempdir().unwrap();
        let manager =
            WorkspaceManager::new(GitOnlyFetcher, "gatekeeper_test_").with_base_dir(base.path());
        let err = manager.acquire("https://host/org/empty").await.unwrap_err();
        assert!(matches!(err, WorkspaceError::EmptyCheckout));
        assert_eq!(entries(base.path()), 0);
    }

    #[tokio::test]
    async fn missing_git_binary_is_git_not_found() {
        let fetcher = GitFetcher::new(&WorkspaceConfig {
            git_program: "gatekeeper-no-such-git".to_owned(),
            ..WorkspaceConfig::default()
        });
        let dest = tempfile::tempdir().unwrap();
        let err = fetcher
            .fetch("https://github.com/acme/repo", &dest.path().join("repo"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::GitNotFound(_)));
    }
}
