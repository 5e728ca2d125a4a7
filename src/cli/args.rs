use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "git-docstore",
    version,
    about = "以 git 仓库作为文档存储 - 历史查询、搜索、保存和远程同步",
    long_about = "git-docstore 把一个 git 工作目录当作版本化的文档存储使用：查询文件创建/修改时间、提交历史和任意版本内容，在指定文件集合中搜索，保存并提交文档，并与远程仓库自动对账。"
)]
pub struct Args {
    /// 仓库目录（覆盖 DOCSTORE_REPO_DIR）
    #[arg(short = 'r', long, global = true, value_name = "DIR")]
    pub repo: Option<PathBuf>,

    /// 保存后推送到远程
    #[arg(short = 'p', long = "push-on-save", global = true, default_value_t = false)]
    pub push_on_save: bool,

    /// 以 JSON 输出结果
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// 输出调试日志
    #[arg(short = 'v', long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 显示仓库状态（不访问远程）
    Status,

    /// 与远程对账：落后则拉取，领先且开启保存推送则推送
    Sync {
        /// 按配置的间隔持续对账，Ctrl-C 退出
        #[arg(short = 'w', long, default_value_t = false)]
        watch: bool,

        /// 持续对账的间隔秒数（覆盖 DOCSTORE_SYNC_INTERVAL）
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },

    /// 文件的提交历史
    Log { path: String },

    /// 文件的创建和最后修改时间
    Times { path: String },

    /// 显示某个提交，给出路径时只输出该版本的文件内容
    Show { commit: String, path: Option<String> },

    /// 某个提交的完整差异
    Diff { commit: String },

    /// 列出所有已跟踪文件
    Ls,

    /// 列出 HEAD 的目录树，给出目录时只列该目录
    Tree { dir: Option<String> },

    /// 全仓库按提交分组的变更历史
    History,

    /// 在给定文件中搜索，文件名命中也会列出
    Search {
        term: String,
        #[arg(required = true, num_args = 1..)]
        paths: Vec<String>,
    },

    /// 暂存并提交一个文件
    Save {
        path: String,
        /// 提交信息，省略时使用默认信息
        #[arg(short, long)]
        message: Option<String>,
    },

    /// 仓库目录不是 git 仓库时 clone 远程或 init
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["git-docstore", "save", "docs/a.md", "-m", "edit", "--push-on-save", "--repo", "/srv/wiki"]);
        assert!(args.push_on_save);
        assert_eq!(args.repo, Some(PathBuf::from("/srv/wiki")));
        assert_eq!(
            args.command,
            Command::Save {
                path: "docs/a.md".to_string(),
                message: Some("edit".to_string()),
            }
        );
    }

    #[test]
    fn test_search_requires_paths() {
        assert!(Args::try_parse_from(["git-docstore", "search", "omg"]).is_err());

        let args = Args::parse_from(["git-docstore", "--json", "search", "omg", "omg.md", "my notes.md"]);
        assert!(args.json);
        assert_eq!(
            args.command,
            Command::Search {
                term: "omg".to_string(),
                paths: vec!["omg.md".to_string(), "my notes.md".to_string()],
            }
        );
    }

    #[test]
    fn test_sync_watch() {
        let args = Args::parse_from(["git-docstore", "sync", "--watch", "--interval", "30"]);
        assert_eq!(
            args.command,
            Command::Sync {
                watch: true,
                interval: Some(30),
            }
        );
    }

    #[test]
    fn test_optional_positionals() {
        let args = Args::parse_from(["git-docstore", "tree"]);
        assert_eq!(args.command, Command::Tree { dir: None });

        let args = Args::parse_from(["git-docstore", "show", "abc1234", "index"]);
        assert_eq!(
            args.command,
            Command::Show {
                commit: "abc1234".to_string(),
                path: Some("index".to_string()),
            }
        );
    }
}
