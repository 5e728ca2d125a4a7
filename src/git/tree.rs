use super::models::TreeEntry;
use super::parsers;
use super::runner::CommandRunner;
use crate::infrastructure::error::{GitError, GitResult};
use std::sync::Arc;

/// HEAD 上的文件与目录列表
#[derive(Clone)]
pub struct TreeService {
    runner: Arc<dyn CommandRunner>,
}

impl TreeService {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// `ls-files -z` 的扁平列表
    pub async fn list_all_tracked_files(&self) -> GitResult<Vec<String>> {
        let output = self.runner.run(&["ls-files", "-z"]).await?;
        Ok(parsers::parse_nul_list(&output.stdout))
    }

    /// 递归列出 HEAD 下所有条目，目录本身也包含在内
    pub async fn list_tree(&self) -> GitResult<Vec<TreeEntry>> {
        let output = self.runner.run(&["ls-tree", "-r", "-t", "-z", "HEAD"]).await?;
        parsers::parse_tree(&output.stdout)
    }

    /// 只列出 `dir` 下一层
    pub async fn list_directory(&self, dir: &str) -> GitResult<Vec<TreeEntry>> {
        let dir = dir.trim_matches('/');
        let treeish = format!("HEAD:{}", dir);
        let output = self.runner.run(&["ls-tree", "-z", &treeish]).await?;
        parsers::parse_tree(&output.stdout)
    }

    /// HEAD 无法解析（还没有任何提交）时为空仓库
    ///
    /// 只有 git 正常退出但解析失败才算空；无法启动或超时原样返回错误。
    pub async fn is_empty(&self) -> GitResult<bool> {
        match self.runner.run(&["rev-parse", "--verify", "-q", "HEAD"]).await {
            Ok(_) => Ok(false),
            Err(GitError::Execution { .. }) => Ok(true),
            Err(e) => Err(e),
        }
    }
}
