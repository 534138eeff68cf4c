mod seed;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use finlit_core::Clock;
use finlit_core::model::{AttemptId, ModuleId, QuizId, UserId};
use serde::Serialize;
use services::LearningEngine;
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "finlit")]
#[command(about = "Progress and assessment tooling for the financial literacy catalog", long_about = None)]
#[command(version)]
struct Cli {
    /// SQLite URL or file path
    #[arg(
        long,
        global = true,
        env = "FINLIT_DB_URL",
        default_value = "sqlite://finlit.sqlite3"
    )]
    db: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upsert the demo budgeting module
    Seed,
    /// Show every published module with the learner's progress
    Overview {
        #[arg(long, env = "FINLIT_USER_ID")]
        user: UserId,
    },
    /// Show one module's progress summary
    Summary {
        #[arg(long, env = "FINLIT_USER_ID")]
        user: UserId,
        module_id: ModuleId,
    },
    /// List a learner's attempts at a quiz, newest first
    History {
        #[arg(long, env = "FINLIT_USER_ID")]
        user: UserId,
        quiz_id: QuizId,
    },
    /// Reconstruct the review of a stored attempt
    Review { attempt_id: AttemptId },
    /// Regenerate a learner's progress rows from their history
    Rebuild {
        #[arg(long, env = "FINLIT_USER_ID")]
        user: UserId,
    },
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path = Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the database file and its directory exist before connecting.
fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(rest) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let db_url = normalize_sqlite_url(&cli.db);
    prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url)
        .await
        .with_context(|| format!("opening {db_url}"))?;
    tracing::debug!(db = %db_url, "storage ready");

    let engine = LearningEngine::new(&storage, Clock::default());
    match cli.command {
        Command::Seed => {
            let catalog = seed::seed(&storage).await?;
            println!(
                "seeded module {} with {} lessons",
                catalog.module.id(),
                catalog.lessons.len()
            );
        }
        Command::Overview { user } => print_json(&engine.list_module_overviews(user).await?)?,
        Command::Summary { user, module_id } => {
            print_json(&engine.module_progress_summary(user, module_id).await?)?;
        }
        Command::History { user, quiz_id } => {
            print_json(&engine.attempt_history(user, quiz_id).await?)?;
        }
        Command::Review { attempt_id } => print_json(&engine.review_attempt(attempt_id).await?)?,
        Command::Rebuild { user } => print_json(&engine.rebuild_progress(user).await?)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    run(Cli::parse()).await
}
