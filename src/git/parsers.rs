//! Git 文本输出解析
//!
//! 全部为纯函数，直接对子进程的原始字节进行解析，不依赖任何 git 进程，
//! 整数解析失败时整条记录作废，不返回部分结果。

use super::models::{CommitLogEntry, EntryType, HistoryRecord, SearchResult, TreeEntry};
use crate::infrastructure::error::{GitError, GitResult};
use std::collections::BTreeSet;

/// `git log --pretty=format:_END %at %H` 中每个提交前的分隔符
pub const HISTORY_SENTINEL: &str = "_END";

/// 短哈希长度
pub const SHORT_HASH_LEN: usize = 7;

/// 解析 NUL 分隔的路径列表（`ls-files -z` 等）
pub fn parse_nul_list(output: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(output).replace('\0', "\n");
    text.split('\n')
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// 解析 `%at` 输出，空输出返回 `None`
pub fn parse_timestamp(output: &[u8]) -> GitResult<Option<i64>> {
    let text = String::from_utf8_lossy(output);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i64>()
        .map(Some)
        .map_err(|_| GitError::parse("timestamp", trimmed))
}

/// 解析 `hash,date,message` 行，消息中的逗号原样保留
pub fn parse_log_line(filename: &str, line: &str) -> GitResult<CommitLogEntry> {
    let mut fields = line.splitn(3, ',');
    let (hash, date) = match (fields.next(), fields.next()) {
        (Some(hash), Some(date)) => (hash, date),
        _ => return Err(GitError::parse("log line", line)),
    };
    let message = fields.next().unwrap_or_default();

    let date = date
        .parse::<i64>()
        .map_err(|_| GitError::parse("log line date", line))?;
    let commit = hash
        .get(..SHORT_HASH_LEN)
        .ok_or_else(|| GitError::parse("log line hash", line))?;

    Ok(CommitLogEntry {
        filename: filename.to_string(),
        commit: commit.to_string(),
        date,
        message: message.to_string(),
    })
}

/// 解析单个文件的完整提交日志，保持 git 输出的顺序（最新在前）
pub fn parse_file_log(filename: &str, output: &[u8]) -> GitResult<Vec<CommitLogEntry>> {
    String::from_utf8_lossy(output)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_log_line(filename, line))
        .collect()
}

/// 解析 `ls-tree` 单行：`<mode> <type> <object>\t<path>`
///
/// 元数据与路径之间既可能是制表符也可能是空格；只保留类型和路径。
pub fn parse_tree_entry(line: &str) -> GitResult<TreeEntry> {
    let (meta, path) = match line.split_once('\t') {
        Some((meta, path)) => (meta.to_string(), path.to_string()),
        None => {
            let fields: Vec<&str> = line.splitn(4, ' ').collect();
            if fields.len() < 4 {
                return Err(GitError::parse("tree entry", line));
            }
            (fields[..3].join(" "), fields[3].to_string())
        }
    };

    let mut meta_fields = meta.split_whitespace();
    let entry_type = meta_fields
        .nth(1)
        .and_then(|t| t.parse::<EntryType>().ok())
        .ok_or_else(|| GitError::parse("tree entry type", line))?;

    if path.is_empty() {
        return Err(GitError::parse("tree entry path", line));
    }

    Ok(TreeEntry {
        entry_type,
        filename: path,
    })
}

/// 解析 NUL 分隔的 `ls-tree -z` 输出
pub fn parse_tree(output: &[u8]) -> GitResult<Vec<TreeEntry>> {
    parse_nul_list(output)
        .iter()
        .map(|line| parse_tree_entry(line))
        .collect()
}

/// 解析哨兵分隔的历史流
///
/// 输出按 NUL 和换行切成片段。第一个片段必须是 `_END <epoch> <fullhash>` 头部；
/// 之后只有形如完整头部的片段才开始新记录，路径中出现 `_END` 仍算文件名。
pub fn parse_history(output: &[u8]) -> GitResult<Vec<HistoryRecord>> {
    let text = String::from_utf8_lossy(output);
    let mut segments = text
        .split(['\0', '\n'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty());

    let first = match segments.next() {
        Some(first) => first,
        None => return Ok(Vec::new()),
    };
    let mut current = parse_history_header(first)?;
    let mut records = Vec::new();

    for segment in segments {
        match try_history_header(segment) {
            Some(record) => records.push(std::mem::replace(&mut current, record)),
            None => {
                current.filenames.insert(segment.to_string());
            }
        }
    }
    records.push(current);
    Ok(records)
}

fn parse_history_header(segment: &str) -> GitResult<HistoryRecord> {
    try_history_header(segment).ok_or_else(|| GitError::parse("history header", segment))
}

/// `_END <epoch> <hash>`，哈希必须全是十六进制字符
fn try_history_header(segment: &str) -> Option<HistoryRecord> {
    let rest = segment.strip_prefix(HISTORY_SENTINEL)?.strip_prefix(' ')?;
    let mut fields = rest.split(' ');
    let (epoch, hash) = match (fields.next(), fields.next(), fields.next()) {
        (Some(epoch), Some(hash), None) => (epoch, hash),
        _ => return None,
    };
    if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let timestamp = epoch.parse::<i64>().ok()?;

    Some(HistoryRecord {
        timestamp,
        commit_hash: hash.to_string(),
        filenames: BTreeSet::new(),
    })
}

/// 解析 `git grep` 输出
///
/// `-z` 时文件名以 NUL 结束且不加引号；没有 NUL 的行按 `name:line` 解析。
pub fn parse_grep_output(output: &[u8]) -> Vec<SearchResult> {
    String::from_utf8_lossy(output)
        .lines()
        .filter_map(|line| line.split_once('\0').or_else(|| line.split_once(':')))
        .map(|(name, result)| SearchResult {
            name: name.to_string(),
            result_line: result.to_string(),
        })
        .collect()
}

/// 拆分带引号、空格连接的候选路径集合，例如 `"a b.md" "c.md"`
///
/// 反斜杠转义与 shell 双引号一致：引号内只转义 `"` 和 `\`，引号外转义任意字符。
pub fn split_candidates(file_spec: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    let mut chars = file_spec.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                has_token = true;
                match chars.peek() {
                    Some(&next) if !in_quotes || next == '"' || next == '\\' => {
                        current.push(next);
                        chars.next();
                    }
                    _ => current.push(c),
                }
            }
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token && !current.is_empty() {
                    paths.push(std::mem::take(&mut current));
                }
                has_token = false;
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token && !current.is_empty() {
        paths.push(current);
    }
    paths
}

/// 把路径列表拼成候选集合字符串，与 [`split_candidates`] 互逆
pub fn quote_candidates<S: AsRef<str>>(paths: &[S]) -> String {
    paths
        .iter()
        .map(|p| {
            let escaped = p.as_ref().replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{}\"", escaped)
        })
        .collect::<Vec<_>>()
        .join(" ")
}
