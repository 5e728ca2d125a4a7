use super::commit::MutationService;
use super::models::RepositoryState;
use super::state::RepositoryStateDetector;
use crate::infrastructure::error::{GitError, GitResult};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// 一次对账的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncOutcome {
    UpToDate,
    Pulled,
    Pushed,
    /// 本地领先但未开启保存时推送
    AheadNotPushed,
}

/// 启动 / 定时对账：根据仓库状态决定自动拉取或推送
#[derive(Clone)]
pub struct SyncPolicy {
    detector: RepositoryStateDetector,
    mutations: MutationService,
    push_on_save: bool,
}

impl SyncPolicy {
    pub fn new(detector: RepositoryStateDetector, mutations: MutationService, push_on_save: bool) -> Self {
        Self {
            detector,
            mutations,
            push_on_save,
        }
    }

    /// 执行一次对账
    ///
    /// 未跟踪文件和分叉都需要人工处理，返回对应错误；fetch 失败直接返回。
    pub async fn reconcile(&self) -> GitResult<SyncOutcome> {
        let untracked = self.detector.untracked_files().await?;
        if !untracked.is_empty() {
            return Err(GitError::UntrackedFiles { files: untracked });
        }

        if self.detector.remote_configured() {
            self.detector.fetch().await?;
        }

        let (state, status) = self.detector.upstream_status().await?;
        debug!(%state, "reconciling");

        match state {
            RepositoryState::BehindRemote => {
                info!("repository is behind remote, pulling");
                self.mutations.pull().await?;
                Ok(SyncOutcome::Pulled)
            }
            RepositoryState::Diverged => Err(GitError::RepositoryDiverged { status }),
            RepositoryState::AheadOfRemote if self.push_on_save => {
                info!("repository is ahead of remote, pushing");
                self.mutations.push().await?;
                Ok(SyncOutcome::Pushed)
            }
            RepositoryState::AheadOfRemote => Ok(SyncOutcome::AheadNotPushed),
            RepositoryState::Clean => Ok(SyncOutcome::UpToDate),
            RepositoryState::UntrackedPresent(files) => Err(GitError::UntrackedFiles { files }),
        }
    }

    /// 按固定间隔对账，直到 `shutdown` 变为 true
    ///
    /// 单次失败只记录日志，下一个周期重试。
    pub async fn run_periodic(&self, every: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.reconcile().await {
                        Ok(outcome) => debug!(?outcome, "periodic sync"),
                        Err(e) if e.requires_operator() => error!(error = %e, "periodic sync needs manual resolution"),
                        Err(e) => warn!(error = %e, "periodic sync failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("periodic sync stopped");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::commit::RemoteTarget;
    use crate::git::runner::testing::ScriptedRunner;
    use crate::git::runner::GitIdentity;
    use std::sync::Arc;

    fn build(runner: ScriptedRunner, remote: bool, push_on_save: bool) -> (SyncPolicy, Arc<ScriptedRunner>) {
        let runner = Arc::new(runner);
        let detector = RepositoryStateDetector::new(runner.clone(), remote);
        let mutations =
            MutationService::new(runner.clone(), GitIdentity::default(), RemoteTarget::default());
        (SyncPolicy::new(detector, mutations, push_on_save), runner)
    }

    #[tokio::test]
    async fn test_untracked_fails_startup() {
        let (policy, runner) = build(
            ScriptedRunner::new().ok("ls-files --exclude-standard --others -z", b"stray.md\0"),
            true,
            true,
        );
        let err = policy.reconcile().await.unwrap_err();
        assert!(matches!(err, GitError::UntrackedFiles { ref files } if files == &["stray.md"]));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_behind_pulls() {
        let (policy, runner) = build(
            ScriptedRunner::new().ok("status -uno", b"Your branch is behind 'origin/master' by 1 commit"),
            true,
            false,
        );
        assert_eq!(policy.reconcile().await.unwrap(), SyncOutcome::Pulled);
        assert_eq!(
            runner.calls(),
            vec!["ls-files --exclude-standard --others -z", "fetch", "status -uno", "pull"]
        );
    }

    #[tokio::test]
    async fn test_ahead_pushes_only_with_push_on_save() {
        let ahead = b"Your branch is ahead of 'origin/master' by 1 commit.";

        let (policy, runner) = build(ScriptedRunner::new().ok("status -uno", ahead), true, true);
        assert_eq!(policy.reconcile().await.unwrap(), SyncOutcome::Pushed);
        assert_eq!(runner.calls().last().unwrap(), "push -u origin master");

        let (policy, runner) = build(ScriptedRunner::new().ok("status -uno", ahead), true, false);
        assert_eq!(policy.reconcile().await.unwrap(), SyncOutcome::AheadNotPushed);
        assert!(!runner.calls().iter().any(|c| c.starts_with("push")));
    }

    #[tokio::test]
    async fn test_diverged_is_operator_error() {
        let (policy, _) = build(
            ScriptedRunner::new().ok("status -uno", b"Your branch and 'origin/master' have diverged,"),
            true,
            true,
        );
        let err = policy.reconcile().await.unwrap_err();
        assert!(matches!(err, GitError::RepositoryDiverged { .. }));
        assert!(err.to_string().contains("have diverged"));
    }

    #[tokio::test]
    async fn test_clean_without_remote_skips_fetch() {
        let (policy, runner) = build(ScriptedRunner::new(), false, true);
        assert_eq!(policy.reconcile().await.unwrap(), SyncOutcome::UpToDate);
        assert_eq!(
            runner.calls(),
            vec!["ls-files --exclude-standard --others -z", "status -uno"]
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let (policy, _) = build(
            ScriptedRunner::new().fail("fetch", 128, "fatal: could not read from remote"),
            true,
            false,
        );
        let err = policy.reconcile().await.unwrap_err();
        assert!(err.to_string().contains("could not read from remote"));
    }

    #[tokio::test]
    async fn test_periodic_stops_on_shutdown() {
        let (policy, runner) = build(ScriptedRunner::new(), false, false);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            policy.run_periodic(Duration::from_millis(10), rx).await;
        });
        tokio::time::sleep(Duration::from_millis(35)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        // 第一次 tick 立即触发，之后每 10ms 一次
        let status_calls = runner.calls().iter().filter(|c| *c == "status -uno").count();
        assert!(status_calls >= 2, "expected repeated reconciliation, got {}", status_calls);
    }
}
