use super::models::{CommitLogEntry, FileTimes, HistoryRecord};
use super::parsers;
use super::runner::CommandRunner;
use crate::infrastructure::error::{GitError, GitResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// 文件历史查询：创建 / 修改时间、提交日志、某一提交时的内容与 diff
#[derive(Clone)]
pub struct HistoryService {
    runner: Arc<dyn CommandRunner>,
}

impl HistoryService {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// 文件创建时间（跟随重命名，取最早的添加记录）
    ///
    /// 从未提交过的文件返回 [`GitError::NotInRepository`]。
    pub async fn get_creation_time(&self, path: &str) -> GitResult<i64> {
        let start = Instant::now();
        let output = self
            .runner
            .run(&["log", "--diff-filter=A", "--follow", "--format=%at", "-1", "--", path])
            .await?;
        debug!(path, elapsed = ?start.elapsed(), "get_creation_time");

        match parsers::parse_timestamp(&output.stdout)? {
            Some(ctime) => Ok(ctime),
            None => {
                info!("{} is not checked into git", path);
                Err(GitError::NotInRepository {
                    path: path.to_string(),
                })
            }
        }
    }

    /// 文件最后修改时间；从未提交过的文件返回 0 而不是错误
    pub async fn get_modification_time(&self, path: &str) -> GitResult<i64> {
        let start = Instant::now();
        let output = self
            .runner
            .run(&["log", "--format=%at", "-1", "--", path])
            .await?;
        debug!(path, elapsed = ?start.elapsed(), "get_modification_time");

        match parsers::parse_timestamp(&output.stdout)? {
            Some(mtime) => Ok(mtime),
            None => {
                info!("{} is not checked into git", path);
                Ok(0)
            }
        }
    }

    /// 并发查询创建和修改时间，任一失败时对应字段为 0
    pub async fn get_times_concurrently(&self, path: &str) -> FileTimes {
        let start = Instant::now();
        let (created, modified) = tokio::join!(
            self.get_creation_time(path),
            self.get_modification_time(path)
        );
        debug!(path, elapsed = ?start.elapsed(), "get_times_concurrently");

        FileTimes {
            created: created.unwrap_or_else(|e| {
                if !e.is_recoverable() {
                    warn!(path, error = %e, "creation time lookup failed");
                }
                0
            }),
            modified: modified.unwrap_or_else(|e| {
                warn!(path, error = %e, "modification time lookup failed");
                0
            }),
        }
    }

    /// 文件提交日志，最新的在前
    pub async fn get_file_log(&self, path: &str) -> GitResult<Vec<CommitLogEntry>> {
        let output = self
            .runner
            .run(&["log", "--pretty=format:%H,%at,%s", path])
            .await?;
        parsers::parse_file_log(path, &output.stdout)
    }

    /// 文件在某一提交时的原始字节
    pub async fn get_file_at_commit(&self, path: &str, commit: &str) -> GitResult<Vec<u8>> {
        let object = format!("{}:{}", commit, path);
        let output = self.runner.run(&["show", &object]).await?;
        Ok(output.stdout)
    }

    /// 某一提交的完整 diff
    pub async fn get_commit_diff(&self, commit: &str) -> GitResult<String> {
        let output = self.runner.run(&["show", commit]).await?;
        Ok(output.stdout_lossy())
    }

    /// 单个提交的时间戳，有效的提交引用必然有时间戳
    pub async fn get_commit_timestamp(&self, commit: &str) -> GitResult<i64> {
        let output = self
            .runner
            .run(&["log", "--format=%at", "-1", commit])
            .await?;
        parsers::parse_timestamp(&output.stdout)?
            .ok_or_else(|| GitError::parse("commit timestamp", output.stdout_lossy()))
    }

    /// 整个仓库的提交历史
    pub async fn get_repository_history(&self) -> GitResult<Vec<HistoryRecord>> {
        let start = Instant::now();
        let output = self
            .runner
            .run(&[
                "log",
                "--name-only",
                &format!("--pretty=format:{} %at %H", parsers::HISTORY_SENTINEL),
                "-z",
                "HEAD",
            ])
            .await?;
        let records = parsers::parse_history(&output.stdout)?;
        debug!(count = records.len(), elapsed = ?start.elapsed(), "get_repository_history");
        Ok(records)
    }
}
