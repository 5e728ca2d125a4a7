use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 单个文件的一条提交记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitLogEntry {
    pub filename: String,
    /// 7 位短哈希
    pub commit: String,
    /// Unix 秒
    pub date: i64,
    pub message: String,
}

/// `ls-tree` 条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Blob,
    /// 可以继续列出的目录
    Tree,
    /// 子模块
    Commit,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Blob => "blob",
            EntryType::Tree => "tree",
            EntryType::Commit => "commit",
        }
    }
}

impl std::str::FromStr for EntryType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blob" => Ok(EntryType::Blob),
            "tree" => Ok(EntryType::Tree),
            "commit" => Ok(EntryType::Commit),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub filename: String,
}

impl TreeEntry {
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Tree
    }
}

/// 仓库历史流中的一条提交
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: i64,
    pub commit_hash: String,
    /// 第一个提交可能为空
    pub filenames: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    /// 仅文件名命中时为空
    pub result_line: String,
}

impl SearchResult {
    pub fn is_filename_match(&self) -> bool {
        self.result_line.is_empty()
    }
}

/// 创建 / 修改时间，查询失败时对应字段为 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTimes {
    pub created: i64,
    pub modified: i64,
}

/// 仓库状态，每次查询重新计算
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "files")]
pub enum RepositoryState {
    Clean,
    UntrackedPresent(Vec<String>),
    AheadOfRemote,
    BehindRemote,
    Diverged,
}

/// 状态对应的运维建议
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuggestedAction {
    Push,
    Pull,
    Investigate,
}

impl RepositoryState {
    pub fn suggested_action(&self) -> Option<SuggestedAction> {
        match self {
            RepositoryState::AheadOfRemote => Some(SuggestedAction::Push),
            RepositoryState::BehindRemote => Some(SuggestedAction::Pull),
            RepositoryState::Diverged => Some(SuggestedAction::Investigate),
            RepositoryState::Clean | RepositoryState::UntrackedPresent(_) => None,
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, RepositoryState::Clean)
    }
}

impl fmt::Display for RepositoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryState::Clean => f.write_str("Git repo is clean."),
            RepositoryState::UntrackedPresent(files) => {
                write!(f, "Untracked files: {}", files.join(", "))
            }
            RepositoryState::AheadOfRemote => f.write_str("Git repo is ahead of remote."),
            RepositoryState::BehindRemote => f.write_str("Git repo is behind remote."),
            RepositoryState::Diverged => f.write_str("Git repo has diverged from remote."),
        }
    }
}
