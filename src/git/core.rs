use super::runner::CommandRunner;
use crate::infrastructure::error::GitResult;
use std::path::Path;
use tokio::process::Command;
use tracing::info;

/// 启动时的仓库准备
pub struct GitCore;

/// 仓库目录不是 git 仓库时的处理方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bootstrap {
    /// 已经是仓库，无需处理
    Existing,
    Cloned,
    Initialized,
}

impl GitCore {
    /// 检查目录本身是否是 Git 仓库的根
    ///
    /// 只在上层目录属于某个仓库时不算，否则后续提交会落进上层仓库。
    pub async fn is_git_repo(git_path: &Path, dir: &Path) -> bool {
        if !dir.join(".git").exists() {
            return false;
        }
        Command::new(git_path)
            .args(["rev-parse", "--git-dir"])
            .current_dir(dir)
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// 确保仓库目录存在并且是 git 仓库
    ///
    /// 目录不是仓库时：`init` 为 false 直接报错；配置了远程则 clone 到该目录，
    /// 否则 `git init`。
    pub async fn prepare(
        runner: &dyn CommandRunner,
        git_path: &Path,
        dir: &Path,
        remote_url: Option<&str>,
        init: bool,
    ) -> anyhow::Result<Bootstrap> {
        if !dir.exists() {
            info!("{} does not exist, creating it", dir.display());
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", dir.display(), e))?;
        }

        if Self::is_git_repo(git_path, dir).await {
            return Ok(Bootstrap::Existing);
        }

        if !init {
            anyhow::bail!(
                "{} is not a git repository. Clone or move your existing repository here, change the config, or run with --init",
                dir.display()
            );
        }

        match remote_url {
            Some(url) => {
                info!("cloning {} into {}", url, dir.display());
                Self::clone_into(runner, url).await?;
                Ok(Bootstrap::Cloned)
            }
            None => {
                info!("initializing empty repository in {}", dir.display());
                runner.run(&["init"]).await?;
                Ok(Bootstrap::Initialized)
            }
        }
    }

    async fn clone_into(runner: &dyn CommandRunner, url: &str) -> GitResult<()> {
        runner.run(&["clone", url, "."]).await?;
        Ok(())
    }
}
