use chrono::{DateTime, Local};
use clap::Parser;
use git_docstore::cli::args::{Args, Command};
use git_docstore::config::Config;
use git_docstore::git::parsers::{quote_candidates, SHORT_HASH_LEN};
use git_docstore::git::{DocumentStore, SuggestedAction, SyncOutcome};
use git_docstore::infrastructure::{setup_logging, LoggingConfig};
use serde::Serialize;
use std::io::Write;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

fn format_time(timestamp: i64) -> String {
    if timestamp == 0 {
        return "-".to_string();
    }
    DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn short_hash(hash: &str) -> &str {
    hash.get(..SHORT_HASH_LEN).unwrap_or(hash)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn describe_outcome(outcome: SyncOutcome) -> &'static str {
    match outcome {
        SyncOutcome::UpToDate => "✅ 仓库与远程一致",
        SyncOutcome::Pulled => "⬇️  已从远程拉取",
        SyncOutcome::Pushed => "⬆️  已推送到远程",
        SyncOutcome::AheadNotPushed => "⚠️  本地领先远程，未开启保存时推送",
    }
}

async fn handle_status(store: &DocumentStore, json: bool) -> anyhow::Result<()> {
    let state = store.state().quick_check().await?;
    if json {
        return print_json(&state);
    }

    println!("{}", state);
    if let Some(action) = state.suggested_action() {
        let hint = match action {
            SuggestedAction::Push => "运行 `git-docstore sync --push-on-save` 推送本地提交",
            SuggestedAction::Pull => "运行 `git-docstore sync` 拉取远程提交",
            SuggestedAction::Investigate => "本地与远程已分叉，需要手动处理",
        };
        println!("💡 {}", hint);
    }
    Ok(())
}

async fn handle_sync(
    store: &DocumentStore,
    config: &Config,
    watch_mode: bool,
    interval: Option<u64>,
    json: bool,
) -> anyhow::Result<()> {
    let outcome = store.startup().await?;
    if json {
        print_json(&outcome)?;
    } else {
        println!("{}", describe_outcome(outcome));
    }

    if !watch_mode {
        return Ok(());
    }

    let every = interval
        .map(Duration::from_secs)
        .or_else(|| config.sync_interval())
        .unwrap_or(Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS));
    if every.is_zero() {
        anyhow::bail!("Sync interval must be greater than zero");
    }

    let (tx, rx) = watch::channel(false);
    let policy = store.sync_policy().clone();
    let handle = tokio::spawn(async move { policy.run_periodic(every, rx).await });

    info!("periodic sync every {:?}, press Ctrl-C to stop", every);
    tokio::signal::ctrl_c().await?;
    tx.send(true).ok();
    handle.await?;
    Ok(())
}

async fn run(args: Args, config: Config) -> anyhow::Result<()> {
    let json = args.json;

    if args.command == Command::Init {
        DocumentStore::open(&config, true).await?;
        println!("✅ {} 已就绪", config.repo_dir.display());
        return Ok(());
    }

    let store = DocumentStore::open(&config, false).await?;

    match args.command {
        Command::Init => {}
        Command::Status => handle_status(&store, json).await?,
        Command::Sync { watch, interval } => {
            handle_sync(&store, &config, watch, interval, json).await?
        }
        Command::Log { path } => {
            let entries = store.history().get_file_log(&path).await?;
            if json {
                return print_json(&entries);
            }
            for entry in entries {
                println!(
                    "{}  {}  {}",
                    short_hash(&entry.commit),
                    format_time(entry.date),
                    entry.message
                );
            }
        }
        Command::Times { path } => {
            let times = store.page_times(&path).await?;
            if json {
                return print_json(&times);
            }
            println!("created:  {}", format_time(times.created));
            println!("modified: {}", format_time(times.modified));
        }
        Command::Show {
            commit,
            path: Some(path),
        } => {
            let content = store.history().get_file_at_commit(&path, &commit).await?;
            std::io::stdout().write_all(&content)?;
        }
        Command::Show { commit, path: None } => {
            let timestamp = store.history().get_commit_timestamp(&commit).await?;
            let diff = store.history().get_commit_diff(&commit).await?;
            println!("# {}", format_time(timestamp));
            print!("{}", diff);
        }
        Command::Diff { commit } => {
            print!("{}", store.history().get_commit_diff(&commit).await?);
        }
        Command::Ls => {
            let files = store.tree().list_all_tracked_files().await?;
            if json {
                return print_json(&files);
            }
            for file in files {
                println!("{}", file);
            }
        }
        Command::Tree { dir } => {
            let entries = match dir.as_deref() {
                Some(dir) => store.tree().list_directory(dir).await?,
                None => store.tree().list_tree().await?,
            };
            if json {
                return print_json(&entries);
            }
            for entry in entries {
                let marker = if entry.is_dir() { "/" } else { "" };
                println!("{:<6} {}{}", entry.entry_type.as_str(), entry.filename, marker);
            }
        }
        Command::History => {
            let records = store.history().get_repository_history().await?;
            if json {
                return print_json(&records);
            }
            for record in records {
                println!(
                    "{}  {}",
                    short_hash(&record.commit_hash),
                    format_time(record.timestamp)
                );
                for name in &record.filenames {
                    println!("    {}", name);
                }
            }
        }
        Command::Search { term, paths } => {
            let results = store.search().search(&term, &quote_candidates(&paths)).await?;
            if json {
                return print_json(&results);
            }
            if results.is_empty() {
                println!("❌ 没有找到匹配 \"{}\" 的内容", term);
            }
            for result in results {
                if result.is_filename_match() {
                    println!("{} (文件名)", result.name);
                } else {
                    println!("{}: {}", result.name, result.result_line);
                }
            }
        }
        Command::Save { path, message } => {
            let pushed = store.save(&path, message.as_deref()).await?;
            if pushed {
                println!("✅ {} 已提交并推送", path);
            } else {
                println!("✅ {} 已提交", path);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::new()?;
    config.update_from_args(&args);
    config.validate()?;

    setup_logging(LoggingConfig::for_verbosity(config.debug))?;

    run(args, config).await
}
