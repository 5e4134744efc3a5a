//! StudySpark terminal client.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use services::{AppServices, Clock, ContentClientConfig, GenerationRequest};
use tracing::debug;

mod cli;
mod commands;
mod logging;

use crate::cli::{Cli, Command, HistoryCommand};
use crate::logging::{LogConfig, init_logging};

const DB_URL_VAR: &str = "STUDYSPARK_DB_URL";
const DEFAULT_DB_URL: &str = "sqlite://studyspark.sqlite3";

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = client_config(&cli)?;
    let db_url = cli
        .db_url
        .clone()
        .or_else(|| std::env::var(DB_URL_VAR).ok())
        .filter(|value| !value.trim().is_empty())
        .map_or_else(|| DEFAULT_DB_URL.to_owned(), normalize_sqlite_url);
    debug!(%db_url, api = %config.base_url(), "starting");

    // sqlx will not create the database file itself.
    prepare_sqlite_file(&db_url)?;
    let services = AppServices::new_sqlite(&db_url, Clock::default(), config)
        .await
        .with_context(|| format!("failed to open {db_url}"))?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout().lock();

    match cli.command {
        Command::Explain(args) => {
            let mut controller = services.controller().await;
            let request = GenerationRequest::topic(args.topic, args.level);
            commands::generate_and_take(&mut controller, request, &mut input, &mut out).await
        }
        Command::Quiz(args) => {
            let content = match (args.content, args.file) {
                (Some(content), _) => content,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None) => bail!("either --content or --file is required"),
            };
            let mut controller = services.controller().await;
            let request = GenerationRequest::content(content, args.questions);
            commands::generate_and_take(&mut controller, request, &mut input, &mut out).await
        }
        Command::History(HistoryCommand::List) => {
            let controller = services.controller().await;
            commands::print_history(&controller.history_items(), &mut out)
        }
        Command::History(HistoryCommand::Retake { id }) => {
            let mut controller = services.controller().await;
            commands::retake(&mut controller, id, &mut input, &mut out).await
        }
        Command::History(HistoryCommand::Remove { id }) => {
            let mut controller = services.controller().await;
            let before = controller.history().len();
            controller.remove_from_history(id).await?;
            if controller.history().len() == before {
                writeln!(out, "No session with id {id}.")?;
            } else {
                writeln!(out, "Removed {id}.")?;
            }
            Ok(())
        }
        Command::History(HistoryCommand::Clear) => {
            let mut controller = services.controller().await;
            controller.clear_history().await?;
            writeln!(out, "History cleared.")?;
            Ok(())
        }
        Command::Health => commands::health(services.content().as_ref(), &mut out).await,
    }
}

/// Environment first, then command-line overrides.
fn client_config(cli: &Cli) -> anyhow::Result<ContentClientConfig> {
    let mut config = ContentClientConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config = ContentClientConfig::new(url)?.with_timeout(config.timeout());
    }
    if let Some(secs) = cli.timeout_secs {
        if secs == 0 {
            bail!("--timeout must be at least 1 second");
        }
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database URL: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database URL: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&LogConfig::from_verbosity(cli.verbose)) {
        eprintln!("error: failed to initialize logging: {err}");
        std::process::exit(1);
    }
    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
