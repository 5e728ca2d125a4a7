use super::models::RepositoryState;
use super::parsers;
use super::runner::CommandRunner;
use crate::infrastructure::error::{GitError, GitResult};
use std::sync::Arc;
use tracing::{debug, warn};

const BEHIND_PHRASE: &str = "Your branch is behind";
const AHEAD_PHRASE: &str = "Your branch is ahead";
const DIVERGED_PHRASE: &str = "have diverged";

/// 按固定短语判断 `git status -uno` 的输出，落后优先
pub fn classify_status(output: &[u8]) -> RepositoryState {
    let text = String::from_utf8_lossy(output);
    if text.contains(BEHIND_PHRASE) {
        RepositoryState::BehindRemote
    } else if text.contains(AHEAD_PHRASE) {
        RepositoryState::AheadOfRemote
    } else if text.contains(DIVERGED_PHRASE) {
        RepositoryState::Diverged
    } else {
        RepositoryState::Clean
    }
}

/// 仓库状态检测，每次调用都重新执行 git 命令，不做缓存
#[derive(Clone)]
pub struct RepositoryStateDetector {
    runner: Arc<dyn CommandRunner>,
    remote_configured: bool,
}

impl RepositoryStateDetector {
    pub fn new(runner: Arc<dyn CommandRunner>, remote_configured: bool) -> Self {
        Self {
            runner,
            remote_configured,
        }
    }

    pub fn remote_configured(&self) -> bool {
        self.remote_configured
    }

    /// 未跟踪且未被忽略的文件
    ///
    /// 使用 `-z` 取得原始路径，非 ASCII 文件名不会被 core.quotePath 转义。
    pub async fn untracked_files(&self) -> GitResult<Vec<String>> {
        let output = self
            .runner
            .run(&["ls-files", "--exclude-standard", "--others", "-z"])
            .await
            .map_err(|e| GitError::StateDetection {
                message: e.to_string(),
            })?;
        Ok(parsers::parse_nul_list(&output.stdout))
    }

    pub async fn fetch(&self) -> GitResult<()> {
        self.runner.run(&["fetch"]).await?;
        Ok(())
    }

    /// 只比较上游，不检查未跟踪文件
    pub async fn upstream_state(&self) -> GitResult<RepositoryState> {
        Ok(self.upstream_status().await?.0)
    }

    /// 上游比较结果和 `git status` 原文
    pub async fn upstream_status(&self) -> GitResult<(RepositoryState, String)> {
        let output = self
            .runner
            .run(&["status", "-uno"])
            .await
            .map_err(|e| GitError::StateDetection {
                message: e.to_string(),
            })?;
        Ok((classify_status(&output.stdout), output.stdout_lossy()))
    }

    /// 完整检测：未跟踪文件优先，然后（配置了远程时）fetch，再比较上游
    ///
    /// fetch 失败只记录警告，按本地已知的上游信息继续判断。
    pub async fn detect(&self) -> GitResult<RepositoryState> {
        if let Some(state) = self.untracked_state().await? {
            return Ok(state);
        }

        if self.remote_configured {
            if let Err(e) = self.fetch().await {
                warn!(error = %e, "fetch failed, comparing against last known upstream");
            }
        }

        let state = self.upstream_state().await?;
        debug!(%state, "repository state detected");
        Ok(state)
    }

    /// 请求路径上使用的快速检测，不访问远程
    pub async fn quick_check(&self) -> GitResult<RepositoryState> {
        if let Some(state) = self.untracked_state().await? {
            return Ok(state);
        }
        self.upstream_state().await
    }

    async fn untracked_state(&self) -> GitResult<Option<RepositoryState>> {
        let untracked = self.untracked_files().await?;
        if untracked.is_empty() {
            Ok(None)
        } else {
            Ok(Some(RepositoryState::UntrackedPresent(untracked)))
        }
    }
}
