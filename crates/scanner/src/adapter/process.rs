//! 외부 도구 프로세스 실행
//!
//! 모든 스캐너 어댑터는 [`run_tool`]을 통해 외부 프로세스를 실행합니다.
//! 실행 파일 부재, 타임아웃, 출력 없는 비정상 종료를 [`ScanError`]로 분류하며,
//! 타임아웃 시 자식 프로세스는 drop과 함께 종료됩니다.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use gatekeeper_core::config::PATH_PLACEHOLDER;

use crate::error::ScanError;

/// 에러 메시지에 포함할 stderr 최대 길이 (문자)
const MAX_STDERR_SUMMARY: usize = 512;

/// 실행할 외부 도구 명령
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    cwd: Option<PathBuf>,
    timeout: Duration,
}

impl ToolCommand {
    /// 새 명령을 생성합니다. `args`의 `{path}`는 `target`으로 치환됩니다.
    pub fn new(program: &str, args: &[String], target: &Path, timeout: Duration) -> Self {
        Self {
            program: program.to_owned(),
            args: expand_args(args, target),
            envs: Vec::new(),
            cwd: None,
            timeout,
        }
    }

    /// 환경변수를 추가합니다. 값이 비어 있으면 무시합니다.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        if !value.is_empty() {
            self.envs.push((key.to_owned(), value.to_owned()));
        }
        self
    }

    /// 작업 디렉토리를 지정합니다.
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    #[cfg(test)]
    pub(crate) fn args(&self) -> &[String] {
        &self.args
    }

    #[cfg(test)]
    pub(crate) fn env_value(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// 종료된 외부 도구의 출력
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// 종료 코드 (시그널로 종료된 경우 `None`)
    pub exit_code: Option<i32>,
    /// 표준 출력 (UTF-8 손실 변환)
    pub stdout: String,
    /// 표준 에러 (UTF-8 손실 변환)
    pub stderr: String,
}

impl ToolOutput {
    /// 정상 종료 여부
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// 파싱할 stdout을 반환합니다.
    ///
    /// 비정상 종료라도 stdout이 있으면 파싱을 시도할 수 있도록 그대로 반환하고,
    /// stdout이 비어 있는 비정상 종료만 `ExecutionFailed`로 처리합니다.
    pub fn usable_stdout(&self, tool: &str) -> Result<&str, ScanError> {
        let stdout = self.stdout.trim();
        if stdout.is_empty() && !self.success() {
            let status = match self.exit_code {
                Some(code) => format!("exit code {code}"),
                None => "terminated by signal".to_owned(),
            };
            let stderr = summarize(&self.stderr);
            let reason = if stderr.is_empty() {
                status
            } else {
                format!("{status}: {stderr}")
            };
            return Err(ScanError::ExecutionFailed {
                tool: tool.to_owned(),
                reason,
            });
        }
        Ok(stdout)
    }
}

/// 외부 도구를 실행하고 종료를 기다립니다.
pub async fn run_tool(tool: &str, command: &ToolCommand) -> Result<ToolOutput, ScanError> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in &command.envs {
        cmd.env(key, value);
    }
    if let Some(ref dir) = command.cwd {
        cmd.current_dir(dir);
    }

    debug!(tool, program = %command.program, args = ?command.args, "spawning external tool");

    let child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ScanError::ToolMissing {
                tool: tool.to_owned(),
            }
        } else {
            ScanError::ExecutionFailed {
                tool: tool.to_owned(),
                reason: format!("failed to spawn {}: {e}", command.program),
            }
        }
    })?;

    let output = tokio::time::timeout(command.timeout, child.wait_with_output())
        .await
        .map_err(|_| ScanError::Timeout {
            tool: tool.to_owned(),
            timeout: command.timeout,
        })?
        .map_err(|e| ScanError::ExecutionFailed {
            tool: tool.to_owned(),
            reason: format!("failed to collect output: {e}"),
        })?;

    Ok(ToolOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// 인자의 `{path}` 자리표시자를 대상 경로로 치환합니다.
pub fn expand_args(args: &[String], target: &Path) -> Vec<String> {
    let target = target.display().to_string();
    args.iter()
        .map(|arg| arg.replace(PATH_PLACEHOLDER, &target))
        .collect()
}

fn summarize(stderr: &str) -> String {
    let trimmed = stderr.trim();
    match trimmed.char_indices().nth(MAX_STDERR_SUMMARY) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_owned(),
    }
}
