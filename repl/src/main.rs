//! SQLBook console - interactive SQL against a SQLite database.
//!
//! This is the entry point for the `sqlbook` binary.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use sqlbook_core::DEFAULT_PAGE_SIZE;
use sqlbook_repl::Repl;
use sqlbook_session::{QuerySession, SessionConfig};
use sqlbook_source::SqliteSource;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sqlbook")]
#[command(about = "SQLBook console - run SQL one statement at a time")]
struct Args {
    /// SQLite database file, or :memory:
    #[arg(long, env = "SQLBOOK_DATABASE", default_value = ":memory:")]
    database: String,

    /// Rows shown per page
    #[arg(long, env = "SQLBOOK_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Log level
    #[arg(long, env = "SQLBOOK_LOG", default_value = "warn")]
    log_level: String,

    /// Scripts to run before (or instead of) the interactive prompt
    scripts: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log_level)?)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    let source = SqliteSource::open(&args.database)?;
    let config = SessionConfig::new(args.page_size)?;
    let mut repl = Repl::new(QuerySession::with_config(source, config));

    repl.run_files(&args.scripts).map_err(|e| anyhow!(e))?;

    // Enter interactive mode if stdin is a terminal
    let stdin = io::stdin();
    if stdin.is_terminal() {
        repl.interactive()?;
    } else if args.scripts.is_empty() {
        // Only read from a stdin pipe if no scripts were passed
        let mut input = String::new();
        stdin.lock().read_to_string(&mut input)?;
        repl.run_script(&input).map_err(|e| anyhow!(e))?;
    }
    Ok(())
}
