use super::runner::{CommandRunner, GitIdentity};
use crate::infrastructure::error::GitResult;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

pub const DEFAULT_EMPTY_COMMIT_MESSAGE: &str = "commit from docstore";

/// 远程名与默认分支
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub name: String,
    pub branch: String,
}

impl Default for RemoteTarget {
    fn default() -> Self {
        Self {
            name: "origin".to_string(),
            branch: "master".to_string(),
        }
    }
}

/// 修改仓库的操作：暂存、提交、推送、拉取
///
/// 同一进程内的所有修改操作共用一把锁，避免并发请求争抢 git 的 index 锁。
#[derive(Clone)]
pub struct MutationService {
    runner: Arc<dyn CommandRunner>,
    identity: GitIdentity,
    remote: RemoteTarget,
    empty_message: String,
    lock: Arc<Mutex<()>>,
}

impl MutationService {
    pub fn new(runner: Arc<dyn CommandRunner>, identity: GitIdentity, remote: RemoteTarget) -> Self {
        Self {
            runner,
            identity,
            remote,
            empty_message: DEFAULT_EMPTY_COMMIT_MESSAGE.to_string(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_empty_message(mut self, message: impl Into<String>) -> Self {
        self.empty_message = message.into();
        self
    }

    /// 外部需要把多个修改组合成一个原子流程时使用
    pub(crate) fn lock_handle(&self) -> Arc<Mutex<()>> {
        self.lock.clone()
    }

    pub async fn stage(&self, path: &str) -> GitResult<()> {
        let _guard = self.lock.lock().await;
        self.stage_locked(path).await
    }

    pub async fn unstage(&self, path: &str) -> GitResult<()> {
        let _guard = self.lock.lock().await;
        self.runner.run(&["rm", path]).await?;
        Ok(())
    }

    pub async fn commit(&self, message: &str) -> GitResult<()> {
        let _guard = self.lock.lock().await;
        self.commit_locked(message).await
    }

    /// 使用默认提交信息
    pub async fn commit_empty(&self) -> GitResult<()> {
        let _guard = self.lock.lock().await;
        self.commit_locked(&self.empty_message).await
    }

    pub async fn push(&self) -> GitResult<()> {
        let _guard = self.lock.lock().await;
        self.push_locked().await
    }

    pub async fn pull(&self) -> GitResult<()> {
        let _guard = self.lock.lock().await;
        self.pull_locked().await
    }

    pub(crate) async fn stage_locked(&self, path: &str) -> GitResult<()> {
        self.runner.run(&["add", path]).await?;
        Ok(())
    }

    pub(crate) async fn commit_locked(&self, message: &str) -> GitResult<()> {
        let message = if message.trim().is_empty() {
            self.empty_message.as_str()
        } else {
            message
        };
        self.runner
            .run(&["commit", "--author", &self.identity.author, "-m", message])
            .await?;
        Ok(())
    }

    pub(crate) async fn push_locked(&self) -> GitResult<()> {
        info!(remote = %self.remote.name, branch = %self.remote.branch, "pushing");
        self.runner
            .run(&["push", "-u", &self.remote.name, &self.remote.branch])
            .await?;
        Ok(())
    }

    pub(crate) async fn pull_locked(&self) -> GitResult<()> {
        info!(remote = %self.remote.name, "pulling");
        self.runner.run(&["pull"]).await?;
        Ok(())
    }
}
