use crate::git::runner::GitIdentity;
use crate::git::DEFAULT_EMPTY_COMMIT_MESSAGE;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "DOCSTORE_";
const DEFAULT_CONFIG_FILE: &str = "docstore.toml";

#[derive(Debug, Clone)]
pub struct Config {
    pub repo_dir: PathBuf,
    pub git_path: PathBuf,
    pub committer_name: String,
    pub committer_email: String,
    /// `Name <email>` 形式；未设置时由提交者信息拼出
    pub author: Option<String>,
    pub empty_commit_message: String,
    pub remote_url: Option<String>,
    pub remote_name: String,
    pub branch: String,
    pub push_on_save: bool,
    pub command_timeout_secs: Option<u64>,
    pub sync_interval_secs: Option<u64>,
    pub debug: bool,
}

/// 配置文件中的字段，全部可选
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    repo_dir: Option<PathBuf>,
    git_path: Option<PathBuf>,
    committer_name: Option<String>,
    committer_email: Option<String>,
    author: Option<String>,
    empty_commit_message: Option<String>,
    remote_url: Option<String>,
    remote_name: Option<String>,
    branch: Option<String>,
    push_on_save: Option<bool>,
    command_timeout_secs: Option<u64>,
    sync_interval_secs: Option<u64>,
    debug: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        let identity = GitIdentity::default();
        Self {
            repo_dir: PathBuf::from("repository"),
            git_path: PathBuf::from("git"),
            committer_name: identity.committer_name,
            committer_email: identity.committer_email,
            author: None,
            empty_commit_message: DEFAULT_EMPTY_COMMIT_MESSAGE.to_string(),
            remote_url: None,
            remote_name: "origin".to_string(),
            branch: "master".to_string(),
            push_on_save: false,
            command_timeout_secs: Some(60),
            sync_interval_secs: None,
            debug: false,
        }
    }
}

impl Config {
    /// 默认值 -> 配置文件 -> .env -> 环境变量
    pub fn new() -> anyhow::Result<Self> {
        let mut config = Config::default();

        // 配置文件路径本身也可以来自 .env
        #[cfg(not(test))]
        config.load_from_env_file();

        if let Some(path) = Self::config_file_path() {
            config.load_from_file(&path)?;
        }

        config.load_from_env()?;
        Ok(config)
    }

    fn config_file_path() -> Option<PathBuf> {
        if let Ok(path) = env::var(format!("{}CONFIG", ENV_PREFIX)) {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        local.exists().then_some(local)
    }

    pub fn load_from_env_file(&mut self) {
        // 先加载用户目录，再加载当前目录
        if let Ok(home) = env::var("HOME") {
            let user_env_path = PathBuf::from(format!("{}/.git-docstore/.env", home));
            if user_env_path.exists() {
                dotenvy::from_path(user_env_path).ok();
            }
        }

        dotenvy::dotenv().ok();
    }

    pub fn load_from_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        self.merge_toml(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path.display(), e))
    }

    fn merge_toml(&mut self, content: &str) -> anyhow::Result<()> {
        let file: FileConfig = toml::from_str(content)?;

        if let Some(v) = file.repo_dir {
            self.repo_dir = v;
        }
        if let Some(v) = file.git_path {
            self.git_path = v;
        }
        if let Some(v) = file.committer_name {
            self.committer_name = v;
        }
        if let Some(v) = file.committer_email {
            self.committer_email = v;
        }
        if file.author.is_some() {
            self.author = file.author;
        }
        if let Some(v) = file.empty_commit_message {
            self.empty_commit_message = v;
        }
        if file.remote_url.is_some() {
            self.remote_url = file.remote_url;
        }
        if let Some(v) = file.remote_name {
            self.remote_name = v;
        }
        if let Some(v) = file.branch {
            self.branch = v;
        }
        if let Some(v) = file.push_on_save {
            self.push_on_save = v;
        }
        if file.command_timeout_secs.is_some() {
            self.command_timeout_secs = file.command_timeout_secs;
        }
        if file.sync_interval_secs.is_some() {
            self.sync_interval_secs = file.sync_interval_secs;
        }
        if let Some(v) = file.debug {
            self.debug = v;
        }
        Ok(())
    }

    pub fn load_from_env(&mut self) -> anyhow::Result<()> {
        self.apply_env(|key| env::var(key).ok())
    }

    /// 按 `DOCSTORE_*` 变量覆盖；`lookup` 接收完整变量名
    fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(v) = var("REPO_DIR") {
            self.repo_dir = PathBuf::from(v);
        }
        if let Some(v) = var("GIT_PATH") {
            self.git_path = PathBuf::from(v);
        }
        if let Some(v) = var("COMMITTER_NAME") {
            self.committer_name = v;
        }
        if let Some(v) = var("COMMITTER_EMAIL") {
            self.committer_email = v;
        }
        if let Some(v) = var("AUTHOR") {
            self.author = Some(v);
        }
        if let Some(v) = var("EMPTY_COMMIT_MESSAGE") {
            self.empty_commit_message = v;
        }
        if let Some(v) = var("REMOTE_URL") {
            // 空字符串表示不配置远程
            self.remote_url = if v.trim().is_empty() { None } else { Some(v) };
        }
        if let Some(v) = var("REMOTE_NAME") {
            self.remote_name = v;
        }
        if let Some(v) = var("BRANCH") {
            self.branch = v;
        }
        if let Some(v) = var("PUSH_ON_SAVE") {
            self.push_on_save = parse_bool("PUSH_ON_SAVE", &v)?;
        }
        if let Some(v) = var("COMMAND_TIMEOUT") {
            self.command_timeout_secs = Some(parse_secs("COMMAND_TIMEOUT", &v)?);
        }
        if let Some(v) = var("SYNC_INTERVAL") {
            self.sync_interval_secs = Some(parse_secs("SYNC_INTERVAL", &v)?);
        }
        if let Some(v) = var("DEBUG") {
            self.debug = parse_bool("DEBUG", &v)?;
        }
        Ok(())
    }

    pub fn update_from_args(&mut self, args: &crate::cli::args::Args) {
        // 命令行参数优先级最高
        if let Some(repo) = &args.repo {
            self.repo_dir = repo.clone();
        }
        if args.push_on_save {
            self.push_on_save = true;
        }
        if args.verbose {
            self.debug = true;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.repo_dir.as_os_str().is_empty() {
            anyhow::bail!("repo_dir must not be empty. Set DOCSTORE_REPO_DIR or pass --repo");
        }
        if self.committer_name.trim().is_empty() || self.committer_email.trim().is_empty() {
            anyhow::bail!("Committer name and email are required");
        }
        if let Some(author) = &self.author {
            if !is_author_string(author) {
                anyhow::bail!("Author must look like `Name <email>`, got: {}", author);
            }
        }
        if self.remote_name.trim().is_empty() || self.branch.trim().is_empty() {
            anyhow::bail!("Remote name and branch must not be empty");
        }
        if self.push_on_save && self.remote_url.is_none() {
            anyhow::bail!("push_on_save is enabled but no remote_url is configured. Set DOCSTORE_REMOTE_URL or disable push on save");
        }
        if self.sync_interval_secs == Some(0) {
            anyhow::bail!("sync_interval_secs must be greater than zero");
        }
        Ok(())
    }

    /// 注入到 git 调用中的身份
    pub fn identity(&self) -> GitIdentity {
        let author = self
            .author
            .clone()
            .unwrap_or_else(|| format!("{} <{}>", self.committer_name, self.committer_email));
        GitIdentity {
            committer_name: self.committer_name.clone(),
            committer_email: self.committer_email.clone(),
            author,
        }
    }

    /// 0 或未设置表示不限时
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn sync_interval(&self) -> Option<Duration> {
        self.sync_interval_secs.map(Duration::from_secs)
    }
}

fn parse_bool(name: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("{}{} must be a boolean, got: {}", ENV_PREFIX, name, other),
    }
}

fn parse_secs(name: &str, value: &str) -> anyhow::Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{}{} must be a number of seconds, got: {}", ENV_PREFIX, name, value))
}

fn is_author_string(author: &str) -> bool {
    match (author.find('<'), author.trim_end().strip_suffix('>')) {
        (Some(open), Some(_)) => open > 0 && !author[..open].trim().is_empty(),
        _ => false,
    }
}
