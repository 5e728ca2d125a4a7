use crate::infrastructure::error::{GitError, GitResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// 提交者 / 作者身份，通过环境变量注入，不修改全局 git 配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitIdentity {
    pub committer_name: String,
    pub committer_email: String,
    /// `--author` 参数，形如 `Name <email>`
    pub author: String,
}

impl Default for GitIdentity {
    fn default() -> Self {
        Self {
            committer_name: "Git Docstore".to_string(),
            committer_email: "docstore@localhost".to_string(),
            author: "Git Docstore <docstore@localhost>".to_string(),
        }
    }
}

/// 一次 git 调用的结果
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    /// stdout 与 stderr 合并
    pub combined: Vec<u8>,
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn combined_lossy(&self) -> String {
        String::from_utf8_lossy(&self.combined).into_owned()
    }
}

/// 执行 git 子命令的能力
///
/// 解析器和服务只依赖这个接口，替换成内嵌实现时无需改动它们。
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// 执行 `git <args>`，非零退出返回 [`GitError::Execution`]
    async fn run(&self, args: &[&str]) -> GitResult<CommandOutput>;
}

/// 基于 `tokio::process` 的真实实现
#[derive(Debug, Clone)]
pub struct GitCommandRunner {
    git_path: PathBuf,
    work_dir: PathBuf,
    identity: GitIdentity,
    timeout: Option<Duration>,
}

impl GitCommandRunner {
    pub fn new(work_dir: impl Into<PathBuf>, identity: GitIdentity) -> Self {
        Self {
            git_path: PathBuf::from("git"),
            work_dir: work_dir.into(),
            identity,
            timeout: None,
        }
    }

    pub fn with_git_path(mut self, git_path: impl Into<PathBuf>) -> Self {
        self.git_path = git_path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn identity(&self) -> &GitIdentity {
        &self.identity
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.git_path);
        cmd.args(args)
            .current_dir(&self.work_dir)
            .env("GIT_COMMITTER_NAME", &self.identity.committer_name)
            .env("GIT_COMMITTER_EMAIL", &self.identity.committer_email)
            // 状态短语匹配依赖英文输出
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl CommandRunner for GitCommandRunner {
    async fn run(&self, args: &[&str]) -> GitResult<CommandOutput> {
        let command = args.join(" ");
        let start = Instant::now();

        let mut cmd = self.command(args);
        let child = cmd.output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child)
                .await
                .map_err(|_| GitError::Timeout {
                    command: command.clone(),
                    seconds: limit.as_secs(),
                })?,
            None => child.await,
        }
        .map_err(|source| GitError::Spawn {
            command: command.clone(),
            source,
        })?;

        let mut combined = output.stdout.clone();
        combined.extend_from_slice(&output.stderr);
        let result = CommandOutput {
            stdout: output.stdout,
            combined,
            code: output.status.code(),
        };

        debug!(
            command = %command,
            code = ?result.code,
            elapsed = ?start.elapsed(),
            "git invocation finished"
        );

        if !result.success() {
            return Err(GitError::Execution {
                command,
                code: result.code,
                output: result.combined_lossy(),
            });
        }
        Ok(result)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_output_helpers() {
        let output = CommandOutput {
            stdout: b"out".to_vec(),
            combined: b"out\nerr".to_vec(),
            code: Some(0),
        };
        assert!(output.success());
        assert_eq!(output.stdout_lossy(), "out");
        assert_eq!(output.combined_lossy(), "out\nerr");

        let failed = CommandOutput {
            code: Some(1),
            ..CommandOutput::default()
        };
        assert!(!failed.success());
        assert!(!CommandOutput::default().success());
    }

    #[test]
    fn test_zero_timeout_disables_limit() {
        let runner = GitCommandRunner::new(".", GitIdentity::default())
            .with_timeout(Some(Duration::from_secs(0)));
        assert!(runner.timeout.is_none());

        let runner = runner.with_timeout(Some(Duration::from_secs(5)));
        assert_eq!(runner.timeout, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let runner = GitCommandRunner::new(".", GitIdentity::default())
            .with_git_path("/nonexistent/bin/git-docstore-missing");
        let err = runner.run(&["status"]).await.unwrap_err();
        assert!(matches!(err, GitError::Spawn { .. }), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_scripted_runner_prefix_matching() {
        let runner = testing::ScriptedRunner::new()
            .ok("log", b"generic")
            .ok("log --format=%at -1 --", b"1700000000")
            .fail("rev-parse HEAD", 128, "fatal: ambiguous argument 'HEAD'");

        let out = runner.run(&["log", "--format=%at", "-1", "--", "index"]).await.unwrap();
        assert_eq!(out.stdout, b"1700000000");

        let out = runner.run(&["log", "--oneline"]).await.unwrap();
        assert_eq!(out.stdout, b"generic");

        let err = runner.run(&["rev-parse", "HEAD"]).await.unwrap_err();
        assert_eq!(err.exit_code(), Some(128));

        // 未脚本化的命令默认成功且无输出
        let out = runner.run(&["fetch"]).await.unwrap();
        assert!(out.stdout.is_empty());
        assert_eq!(runner.calls().len(), 4);
    }
}
