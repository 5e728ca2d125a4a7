use thiserror::Error;

/// 文档仓库操作错误类型
#[derive(Error, Debug)]
pub enum GitError {
    /// 子进程以非零状态退出，携带合并后的输出
    #[error("error during `git {command}` (exit code {}):\n{output}", display_code(.code))]
    Execution {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("failed to run `git {command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`git {command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    /// 输出存在但格式不正确，不会重试
    #[error("failed to parse {what}: {input:?}")]
    Parse { what: &'static str, input: String },

    /// 文件从未提交过
    #[error("{path} is not checked into git")]
    NotInRepository { path: String },

    #[error("untracked files present, resolve them manually:\n{}", .files.join("\n"))]
    UntrackedFiles { files: Vec<String> },

    #[error("local and remote branches have diverged, manual reconciliation required:\n{status}")]
    RepositoryDiverged { status: String },

    /// 状态命令本身失败，区别于成功解析出的脏状态
    #[error("unable to detect repository state: {message}")]
    StateDetection { message: String },
}

pub type GitResult<T> = Result<T, GitError>;

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

impl GitError {
    pub(crate) fn parse(what: &'static str, input: impl Into<String>) -> Self {
        GitError::Parse {
            what,
            input: input.into(),
        }
    }

    /// 调用方可以降级处理的错误（例如页面上显示空的创建时间）
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GitError::NotInRepository { .. })
    }

    /// 需要人工介入才能继续自动同步
    pub fn requires_operator(&self) -> bool {
        matches!(
            self,
            GitError::RepositoryDiverged { .. } | GitError::UntrackedFiles { .. }
        )
    }

    /// 子进程的合并输出，仅 `Execution` 携带
    pub fn combined_output(&self) -> Option<&str> {
        match self {
            GitError::Execution { output, .. } => Some(output),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            GitError::Execution { code, .. } => *code,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_carries_output() {
        let err = GitError::Execution {
            command: "push -u origin master".to_string(),
            code: Some(128),
            output: "fatal: 'origin' does not appear to be a git repository".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("git push -u origin master"));
        assert!(msg.contains("exit code 128"));
        assert!(msg.contains("does not appear to be a git repository"));
        assert_eq!(err.exit_code(), Some(128));
        assert!(err.combined_output().unwrap().starts_with("fatal:"));
    }

    #[test]
    fn test_killed_process_has_no_code() {
        let err = GitError::Execution {
            command: "pull".to_string(),
            code: None,
            output: String::new(),
        };
        assert!(err.to_string().contains("exit code signal"));
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn test_error_classification() {
        let not_in_repo = GitError::NotInRepository {
            path: "notes.md".to_string(),
        };
        assert!(not_in_repo.is_recoverable());
        assert!(!not_in_repo.requires_operator());
        assert_eq!(not_in_repo.to_string(), "notes.md is not checked into git");

        let diverged = GitError::RepositoryDiverged {
            status: "have diverged".to_string(),
        };
        assert!(!diverged.is_recoverable());
        assert!(diverged.requires_operator());

        let untracked = GitError::UntrackedFiles {
            files: vec!["a.md".to_string(), "b.md".to_string()],
        };
        assert!(untracked.requires_operator());
        assert!(untracked.to_string().ends_with("a.md\nb.md"));

        let parse = GitError::parse("timestamp", "abc");
        assert!(!parse.is_recoverable());
        assert!(parse.combined_output().is_none());
    }
}
