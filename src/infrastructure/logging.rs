use std::io;
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    pub include_file_location: bool,
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            include_file_location: false,
            filter: None,
        }
    }
}

impl LoggingConfig {
    /// 按 CLI 的 verbose / debug 开关选择日志级别
    pub fn for_verbosity(verbose: bool) -> Self {
        Self {
            level: if verbose { Level::DEBUG } else { Level::INFO },
            include_file_location: verbose,
            ..Self::default()
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// 人类可读的格式
    Pretty,
    /// 紧凑格式
    Compact,
    /// JSON 格式
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("Unsupported log format: {}", other),
        }
    }
}

/// 日志输出目标
#[derive(Debug, Clone, PartialEq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File(String),
}

fn build_filter(config: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    let filter = match &config.filter {
        Some(filter) => EnvFilter::try_new(filter)?,
        None => EnvFilter::from_default_env()
            .add_directive(format!("git_docstore={}", config.level).parse()?),
    };
    Ok(filter)
}

/// 设置日志系统
pub fn setup_logging(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = build_filter(&config)?;

    let fmt_layer = match &config.output {
        LogOutput::Stdout => create_fmt_layer(&config, io::stdout),
        LogOutput::Stderr => create_fmt_layer(&config, io::stderr),
        LogOutput::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            create_fmt_layer(&config, std::sync::Mutex::new(file))
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

fn create_fmt_layer<W>(config: &LoggingConfig, make_writer: W) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'writer> fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(make_writer)
        .with_target(true)
        .with_level(true)
        .with_file(config.include_file_location)
        .with_line_number(config.include_file_location);

    match config.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}
