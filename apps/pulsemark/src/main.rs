//! # Pulsemark Binary
//!
//! CLI entry point: argument parsing, tracing setup, and dispatch into
//! [`pulsemark::cli`] and [`pulsemark::api`].

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use pulsemark::api;
use pulsemark::cli::{
    self, CliError, cmd_check, cmd_export, cmd_history, cmd_import, cmd_init, cmd_latest,
    cmd_parse, cmd_publish, cmd_recent, cmd_render, cmd_tally, cmd_trend,
};

#[derive(Parser, Debug)]
#[command(name = "pulsemark", version, about = "Sentiment pipeline status reporting")]
struct Cli {
    /// Output machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a snapshot JSON file into a Markdown status report
    Render {
        /// Snapshot JSON file
        #[arg(long)]
        snapshot: PathBuf,
        /// Write the report here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Parse a Markdown status report into snapshot JSON
    Parse {
        /// Report file
        #[arg(long)]
        report: PathBuf,
    },
    /// Parse a report and audit its arithmetic (exit 1 on violations)
    Check {
        /// Report file
        #[arg(long)]
        report: PathBuf,
    },
    /// Tally post records into a snapshot
    Tally {
        /// Post records JSON file
        #[arg(long)]
        posts: PathBuf,
        /// Validation checks JSON file to pass through
        #[arg(long)]
        checks: Option<PathBuf>,
        /// Generation time (YYYY-MM-DD HH:MM:SS, UTC); defaults to now
        #[arg(long)]
        generated_at: Option<String>,
        /// Print the rendered report instead of snapshot JSON
        #[arg(long)]
        render: bool,
    },
    /// Per-day sentiment trend for a post file
    Trend {
        /// Post records JSON file
        #[arg(long)]
        posts: PathBuf,
    },
    /// Most recent posts from a post file
    Recent {
        /// Post records JSON file
        #[arg(long)]
        posts: PathBuf,
        /// Maximum number of posts to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Create a snapshot history database
    Init {
        /// History database path
        #[arg(long)]
        db: PathBuf,
        /// Replace an existing database
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Audit a snapshot and append it to the history
    Publish {
        /// History database path
        #[arg(long)]
        db: PathBuf,
        /// Snapshot JSON file
        #[arg(long)]
        snapshot: PathBuf,
    },
    /// Write the newest stored snapshot as a canonical archive
    Export {
        /// History database path
        #[arg(long)]
        db: PathBuf,
        /// Archive output path
        #[arg(long)]
        out: PathBuf,
    },
    /// Import a canonical archive into the history
    Import {
        /// History database path
        #[arg(long)]
        db: PathBuf,
        /// Archive file
        #[arg(long)]
        archive: PathBuf,
    },
    /// Show the newest stored snapshot
    Latest {
        /// History database path
        #[arg(long)]
        db: PathBuf,
        /// Print the rendered report instead of snapshot JSON
        #[arg(long)]
        report: bool,
    },
    /// List stored generation times
    History {
        /// History database path
        #[arg(long)]
        db: PathBuf,
    },
    /// Serve the snapshot history over HTTP
    Serve {
        /// History database path
        #[arg(long)]
        db: PathBuf,
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
        /// API key required for POST /snapshot (falls back to PULSEMARK_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    match cli.command {
        Commands::Render { snapshot, out } => {
            cmd_render(&snapshot, out.as_deref())?;
        }
        Commands::Parse { report } => {
            cmd_parse(&report)?;
        }
        Commands::Check { report } => {
            let audit = cmd_check(&report, cli.json)?;
            if !audit.is_consistent() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Tally {
            posts,
            checks,
            generated_at,
            render,
        } => {
            let generated_at = match generated_at {
                Some(text) => cli::parse_generated_at(&text)?,
                None => cli::now_seconds(),
            };
            cmd_tally(&posts, checks.as_deref(), generated_at, render)?;
        }
        Commands::Trend { posts } => {
            cmd_trend(&posts, cli.json)?;
        }
        Commands::Recent { posts, limit } => {
            cmd_recent(&posts, limit, cli.json)?;
        }
        Commands::Init { db, force } => {
            cmd_init(&db, force)?;
        }
        Commands::Publish { db, snapshot } => {
            cmd_publish(&db, &snapshot, cli.json)?;
        }
        Commands::Export { db, out } => {
            cmd_export(&db, &out)?;
        }
        Commands::Import { db, archive } => {
            cmd_import(&db, &archive, cli.json)?;
        }
        Commands::Latest { db, report } => {
            cmd_latest(&db, report)?;
        }
        Commands::History { db } => {
            cmd_history(&db, cli.json)?;
        }
        Commands::Serve { db, addr, api_key } => {
            let api_key = api_key.or_else(|| std::env::var("PULSEMARK_API_KEY").ok());
            api::serve(&db, addr, api_key).await?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
