//! Command-line definitions.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};
use study_core::model::{Level, QuestionCount, SessionId};

#[derive(Debug, Parser)]
#[command(
    name = "studyspark",
    version,
    about = "Learn a topic or quiz yourself on your notes",
    long_about = "Ask the generation service to explain a topic or to turn study notes \
                  into a multiple-choice quiz, answer it in the terminal and keep the \
                  last ten results."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// SQLite database holding history [env: STUDYSPARK_DB_URL].
    #[arg(long = "db", value_name = "URL", global = true)]
    pub db_url: Option<String>,

    /// Base URL of the generation service [env: STUDYSPARK_API_URL].
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Request timeout in seconds [env: STUDYSPARK_TIMEOUT_SECS].
    #[arg(long = "timeout", value_name = "SECS", global = true)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Explain a topic at a level, then quiz on it.
    Explain(ExplainArgs),

    /// Generate a quiz from study content.
    Quiz(QuizArgs),

    /// Inspect or reuse past sessions.
    #[command(subcommand)]
    History(HistoryCommand),

    /// Check that the generation service is reachable.
    Health,
}

#[derive(Debug, Args)]
pub struct ExplainArgs {
    /// What to learn about.
    #[arg(long)]
    pub topic: String,

    /// Audience: child, teen or adult.
    #[arg(long, default_value_t = Level::Adult)]
    pub level: Level,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["content", "file"])))]
pub struct QuizArgs {
    /// Study content, inline.
    #[arg(long)]
    pub content: Option<String>,

    /// Read study content from a file.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Number of questions: 3, 5, 7 or 10.
    #[arg(long, default_value_t = QuestionCount::default(), value_parser = parse_question_count)]
    pub questions: QuestionCount,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List past sessions, newest first.
    List,

    /// Take a past quiz again.
    Retake {
        #[arg(value_name = "ID")]
        id: SessionId,
    },

    /// Delete one past session.
    Remove {
        #[arg(value_name = "ID")]
        id: SessionId,
    },

    /// Delete all past sessions.
    Clear,
}

fn parse_question_count(raw: &str) -> Result<QuestionCount, String> {
    let value: u32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("`{raw}` is not a number"))?;
    QuestionCount::new(value).map_err(|err| err.to_string())
}
