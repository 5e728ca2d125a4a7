use super::commit::{MutationService, RemoteTarget, DEFAULT_EMPTY_COMMIT_MESSAGE};
use super::core::GitCore;
use super::history::HistoryService;
use super::models::FileTimes;
use super::runner::{CommandRunner, GitCommandRunner, GitIdentity};
use super::search::SearchService;
use super::state::RepositoryStateDetector;
use super::sync::{SyncOutcome, SyncPolicy};
use super::tree::TreeService;
use crate::config::Config;
use crate::infrastructure::error::{GitError, GitResult};
use std::sync::Arc;
use tracing::{debug, info};

/// 构建 [`DocumentStore`] 所需的运行参数
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub identity: GitIdentity,
    pub remote: RemoteTarget,
    pub remote_configured: bool,
    pub push_on_save: bool,
    pub empty_commit_message: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            identity: GitIdentity::default(),
            remote: RemoteTarget::default(),
            remote_configured: false,
            push_on_save: false,
            empty_commit_message: DEFAULT_EMPTY_COMMIT_MESSAGE.to_string(),
        }
    }
}

impl From<&Config> for StoreOptions {
    fn from(config: &Config) -> Self {
        Self {
            identity: config.identity(),
            remote: RemoteTarget {
                name: config.remote_name.clone(),
                branch: config.branch.clone(),
            },
            remote_configured: config.remote_url.is_some(),
            push_on_save: config.push_on_save,
            empty_commit_message: config.empty_commit_message.clone(),
        }
    }
}

/// 以 git 仓库为后端的文档存储
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore").finish_non_exhaustive()
    }
}

struct StoreInner {
    runner: Arc<dyn CommandRunner>,
    history: HistoryService,
    tree: TreeService,
    mutations: MutationService,
    search: SearchService,
    detector: RepositoryStateDetector,
    sync: SyncPolicy,
    options: StoreOptions,
}

impl DocumentStore {
    pub fn new(runner: Arc<dyn CommandRunner>, options: StoreOptions) -> Self {
        let mutations = MutationService::new(runner.clone(), options.identity.clone(), options.remote.clone())
            .with_empty_message(options.empty_commit_message.clone());
        let detector = RepositoryStateDetector::new(runner.clone(), options.remote_configured);
        let sync = SyncPolicy::new(detector.clone(), mutations.clone(), options.push_on_save);

        Self {
            inner: Arc::new(StoreInner {
                history: HistoryService::new(runner.clone()),
                tree: TreeService::new(runner.clone()),
                search: SearchService::new(runner.clone()),
                mutations,
                detector,
                sync,
                runner,
                options,
            }),
        }
    }

    /// 用配置中的仓库目录、git 路径和身份构建
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(Self::runner_for(config)), StoreOptions::from(config))
    }

    /// 准备仓库目录（必要时 clone / init）后打开
    pub async fn open(config: &Config, init: bool) -> anyhow::Result<Self> {
        let runner = Self::runner_for(config);
        let bootstrap = GitCore::prepare(
            &runner,
            &config.git_path,
            &config.repo_dir,
            config.remote_url.as_deref(),
            init,
        )
        .await?;
        debug!(?bootstrap, dir = %config.repo_dir.display(), "repository ready");
        Ok(Self::new(Arc::new(runner), StoreOptions::from(config)))
    }

    fn runner_for(config: &Config) -> GitCommandRunner {
        GitCommandRunner::new(config.repo_dir.clone(), config.identity())
            .with_git_path(config.git_path.clone())
            .with_timeout(config.command_timeout())
    }

    pub fn runner(&self) -> Arc<dyn CommandRunner> {
        self.inner.runner.clone()
    }

    pub fn history(&self) -> &HistoryService {
        &self.inner.history
    }

    pub fn tree(&self) -> &TreeService {
        &self.inner.tree
    }

    pub fn mutations(&self) -> &MutationService {
        &self.inner.mutations
    }

    pub fn search(&self) -> &SearchService {
        &self.inner.search
    }

    pub fn state(&self) -> &RepositoryStateDetector {
        &self.inner.detector
    }

    pub fn sync_policy(&self) -> &SyncPolicy {
        &self.inner.sync
    }

    pub fn options(&self) -> &StoreOptions {
        &self.inner.options
    }

    /// 页面显示用的创建 / 修改时间；空仓库直接返回 0，不执行 log 查询
    ///
    /// 无法判断仓库是否为空（git 无法启动、超时）时返回错误，而不是 0。
    pub async fn page_times(&self, path: &str) -> GitResult<FileTimes> {
        if self.inner.tree.is_empty().await? {
            return Ok(FileTimes::default());
        }
        Ok(self.inner.history.get_times_concurrently(path).await)
    }

    /// 保存文档：暂存、提交，开启保存时推送则推送到远程
    ///
    /// 整个流程持有修改锁。返回是否执行了推送。
    pub async fn save(&self, path: &str, message: Option<&str>) -> GitResult<bool> {
        let mutations = &self.inner.mutations;
        let lock = mutations.lock_handle();
        let _guard = lock.lock().await;

        mutations.stage_locked(path).await?;
        mutations
            .commit_locked(message.unwrap_or(&self.inner.options.empty_commit_message))
            .await?;

        let push = self.inner.options.push_on_save && self.inner.options.remote_configured;
        if push {
            mutations.push_locked().await?;
        }
        info!(path, pushed = push, "document saved");
        Ok(push)
    }

    /// 启动时对账；空仓库只检查未跟踪文件
    pub async fn startup(&self) -> GitResult<SyncOutcome> {
        if self.inner.tree.is_empty().await? {
            info!("repository has no commits yet, skipping upstream reconciliation");
            let untracked = self.inner.detector.untracked_files().await?;
            if !untracked.is_empty() {
                return Err(GitError::UntrackedFiles { files: untracked });
            }
            return Ok(SyncOutcome::UpToDate);
        }
        self.inner.sync.reconcile().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::runner::testing::ScriptedRunner;
    use std::time::Duration;

    fn build_store(runner: ScriptedRunner, options: StoreOptions) -> (DocumentStore, Arc<ScriptedRunner>) {
        let runner = Arc::new(runner);
        (DocumentStore::new(runner.clone(), options), runner)
    }

    #[tokio::test]
    async fn test_page_times_on_empty_repository() {
        let (store, runner) = build_store(
            ScriptedRunner::new().fail("rev-parse --verify -q HEAD", 1, ""),
            StoreOptions::default(),
        );
        assert_eq!(store.page_times("index").await.unwrap(), FileTimes::default());
        assert_eq!(runner.calls(), vec!["rev-parse --verify -q HEAD"]);
    }

    #[tokio::test]
    async fn test_page_times_surfaces_git_failure() {
        let (store, runner) = build_store(
            ScriptedRunner::new().timeout("rev-parse", 60),
            StoreOptions::default(),
        );
        let err = store.page_times("index").await.unwrap_err();
        assert!(matches!(err, GitError::Timeout { .. }));
        assert!(!runner.calls().iter().any(|c| c.starts_with("log")));

        let (store, _) = build_store(
            ScriptedRunner::new().timeout("rev-parse", 60),
            StoreOptions::default(),
        );
        assert!(store.startup().await.is_err());
    }

    #[tokio::test]
    async fn test_page_times() {
        let (store, _) = build_store(
            ScriptedRunner::new()
                .ok("rev-parse --verify -q HEAD", b"abc\n")
                .ok("log --diff-filter=A", b"1700000000")
                .ok("log --format=%at -1 --", b"1700000900"),
            StoreOptions::default(),
        );
        let times = store.page_times("index").await.unwrap();
        assert_eq!(times.created, 1700000000);
        assert_eq!(times.modified, 1700000900);
    }

    #[tokio::test]
    async fn test_save_pushes_only_with_remote_and_push_on_save() {
        let options = StoreOptions {
            remote_configured: true,
            push_on_save: true,
            ..StoreOptions::default()
        };
        let (store, runner) = build_store(ScriptedRunner::new(), options);
        assert!(store.save("docs/a.md", Some("docs/a.md updated")).await.unwrap());
        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], "add docs/a.md");
        assert!(calls[1].ends_with("-m docs/a.md updated"));
        assert_eq!(calls[2], "push -u origin master");

        let options = StoreOptions {
            remote_configured: false,
            push_on_save: true,
            ..StoreOptions::default()
        };
        let (store, runner) = build_store(ScriptedRunner::new(), options);
        assert!(!store.save("docs/a.md", None).await.unwrap());
        assert!(runner.calls()[1].ends_with("-m commit from docstore"));
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_save_stops_on_commit_failure() {
        let options = StoreOptions {
            remote_configured: true,
            push_on_save: true,
            ..StoreOptions::default()
        };
        let (store, runner) = build_store(
            ScriptedRunner::new().fail("commit", 1, "nothing to commit, working tree clean"),
            options,
        );
        let err = store.save("index", None).await.unwrap_err();
        assert!(err.to_string().contains("nothing to commit"));
        assert!(!runner.calls().iter().any(|c| c.starts_with("push")));
    }

    #[tokio::test]
    async fn test_concurrent_saves_do_not_interleave() {
        let (store, runner) = build_store(
            ScriptedRunner::new().with_delay(Duration::from_millis(20)),
            StoreOptions::default(),
        );
        let a = store.clone();
        let b = store.clone();
        let (ra, rb) = tokio::join!(a.save("a.md", None), b.save("b.md", None));
        ra.unwrap();
        rb.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls[0].starts_with("add"));
        assert!(calls[1].starts_with("commit"));
        assert!(calls[2].starts_with("add"));
        assert!(calls[3].starts_with("commit"));
    }

    #[tokio::test]
    async fn test_startup_on_empty_repository() {
        let (store, runner) = build_store(
            ScriptedRunner::new().fail("rev-parse --verify -q HEAD", 1, ""),
            StoreOptions {
                remote_configured: true,
                ..StoreOptions::default()
            },
        );
        assert_eq!(store.startup().await.unwrap(), SyncOutcome::UpToDate);
        assert!(!runner.calls().iter().any(|c| c == "fetch" || c == "status -uno"));
    }

    #[tokio::test]
    async fn test_startup_reconciles() {
        let (store, runner) = build_store(
            ScriptedRunner::new()
                .ok("rev-parse --verify -q HEAD", b"abc\n")
                .ok("status -uno", b"Your branch is behind 'origin/master' by 3 commits"),
            StoreOptions {
                remote_configured: true,
                ..StoreOptions::default()
            },
        );
        assert_eq!(store.startup().await.unwrap(), SyncOutcome::Pulled);
        assert_eq!(runner.calls().last().unwrap(), "pull");
    }
}
