use super::models::SearchResult;
use super::parsers;
use super::runner::CommandRunner;
use crate::infrastructure::error::{GitError, GitResult};
use std::sync::Arc;
use tracing::debug;

/// 在调用方给定（已做权限过滤）的候选文件中搜索
#[derive(Clone)]
pub struct SearchService {
    runner: Arc<dyn CommandRunner>,
}

impl SearchService {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// 内容命中每行一条结果，文件名命中追加一条 `result_line` 为空的结果
    ///
    /// `file_spec` 是带引号、空格连接的路径集合。同一个文件可能同时出现
    /// 内容命中和文件名命中，两者都保留。
    pub async fn search(&self, term: &str, file_spec: &str) -> GitResult<Vec<SearchResult>> {
        let candidates = parsers::split_candidates(file_spec);
        if candidates.is_empty() || term.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = self.search_content(term, &candidates).await?;
        let content_hits = results.len();

        results.extend(
            candidates
                .iter()
                .filter(|path| path.contains(term))
                .map(|path| SearchResult {
                    name: path.clone(),
                    result_line: String::new(),
                }),
        );

        debug!(
            term,
            content_hits,
            filename_hits = results.len() - content_hits,
            "search finished"
        );
        Ok(results)
    }

    async fn search_content(&self, term: &str, candidates: &[String]) -> GitResult<Vec<SearchResult>> {
        // -z 让文件名原样输出，不受 core.quotePath 影响
        let mut args = vec!["grep", "-z", "-i", "-e", term, "--"];
        args.extend(candidates.iter().map(String::as_str));

        match self.runner.run(&args).await {
            Ok(output) => Ok(parsers::parse_grep_output(&output.stdout)),
            // git grep 没有匹配时以 1 退出
            Err(GitError::Execution { code: Some(1), .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}
