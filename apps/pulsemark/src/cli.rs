//! # CLI Commands
//!
//! Command implementations for the `pulsemark` binary.
//!
//! Each command is a plain `cmd_*` function over paths and flags, so the
//! integration tests can drive them without spawning a process. File I/O
//! and the clock live here; all logic is delegated to `pulsemark-core`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

use pulsemark_core::render::TIMESTAMP_FORMAT;
use pulsemark_core::{
    AuditReport, FormatError, HistoryStore, ParseError, PostRecord, StatusSnapshot, StoreError,
    ValidationCheck, audit_snapshot, daily_trend, decode_canonical, encode_canonical,
    parse_report, recent_posts, render_report, tally_snapshot,
};

// =============================================================================
// ERRORS
// =============================================================================

/// Failures surfaced to the CLI user.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Serve(#[from] crate::api::ServeError),

    #[error("invalid timestamp {0:?} (expected YYYY-MM-DD HH:MM:SS)")]
    InvalidTimestamp(String),

    #[error("database already exists: {} (use --force to reinitialize)", .0.display())]
    DatabaseExists(PathBuf),

    #[error("snapshot rejected by audit ({0} violation(s))")]
    AuditRejected(usize),

    #[error("history is empty")]
    EmptyHistory,
}

// =============================================================================
// HELPERS
// =============================================================================

/// Read a snapshot from a JSON file.
pub fn load_snapshot(path: &Path) -> Result<StatusSnapshot, CliError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Read post records from a JSON file.
pub fn load_posts(path: &Path) -> Result<Vec<PostRecord>, CliError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Read validation checks from a JSON file.
pub fn load_checks(path: &Path) -> Result<Vec<ValidationCheck>, CliError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Parse a `--generated-at` argument in the report's timestamp format.
pub fn parse_generated_at(text: &str) -> Result<DateTime<Utc>, CliError> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| CliError::InvalidTimestamp(text.to_string()))
}

/// The current wall clock, truncated to whole seconds.
///
/// The report format carries second precision; truncating here keeps a
/// published snapshot identical to its own rendered-and-reparsed form.
#[must_use]
pub fn now_seconds() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// REPORT COMMANDS
// =============================================================================

/// Render a snapshot JSON file into a Markdown report.
pub fn cmd_render(snapshot_path: &Path, out: Option<&Path>) -> Result<(), CliError> {
    let snapshot = load_snapshot(snapshot_path)?;
    let report = render_report(&snapshot);
    match out {
        Some(path) => {
            std::fs::write(path, &report)?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => print!("{report}"),
    }
    Ok(())
}

/// Parse a Markdown report into snapshot JSON (printed to stdout).
pub fn cmd_parse(report_path: &Path) -> Result<(), CliError> {
    let text = std::fs::read_to_string(report_path)?;
    let snapshot = parse_report(&text)?;
    print_json(&snapshot)
}

/// Parse a report and audit its arithmetic.
///
/// Returns the audit report; the caller decides the exit code.
pub fn cmd_check(report_path: &Path, json: bool) -> Result<AuditReport, CliError> {
    let text = std::fs::read_to_string(report_path)?;
    let snapshot = parse_report(&text)?;
    let audit = audit_snapshot(&snapshot);

    if json {
        print_json(&audit)?;
    } else {
        for finding in &audit.findings {
            println!("{:?}  {} ({})", finding.outcome, finding.check, finding.detail);
        }
        if audit.is_consistent() {
            println!("consistent");
        } else {
            println!("INCONSISTENT: {} violation(s)", audit.violations().count());
        }
    }
    Ok(audit)
}

/// Tally post records into a snapshot.
pub fn cmd_tally(
    posts_path: &Path,
    checks_path: Option<&Path>,
    generated_at: DateTime<Utc>,
    as_report: bool,
) -> Result<(), CliError> {
    let posts = load_posts(posts_path)?;
    let checks = match checks_path {
        Some(path) => load_checks(path)?,
        None => Vec::new(),
    };
    let snapshot = tally_snapshot(&posts, checks, generated_at);
    if as_report {
        print!("{}", render_report(&snapshot));
        Ok(())
    } else {
        print_json(&snapshot)
    }
}

/// Print the per-day sentiment trend for a post file.
pub fn cmd_trend(posts_path: &Path, json: bool) -> Result<(), CliError> {
    let posts = load_posts(posts_path)?;
    let trend = daily_trend(&posts);
    if json {
        print_json(&trend)
    } else {
        println!("date        negative  neutral  positive  pending");
        for (date, day) in &trend {
            println!(
                "{date}  {:>8}  {:>7}  {:>8}  {:>7}",
                day.sentiment.negative, day.sentiment.neutral, day.sentiment.positive, day.pending
            );
        }
        Ok(())
    }
}

/// Print the most recent posts from a post file.
pub fn cmd_recent(posts_path: &Path, limit: usize, json: bool) -> Result<(), CliError> {
    let posts = load_posts(posts_path)?;
    let recent = recent_posts(&posts, limit);
    if json {
        print_json(&recent)
    } else {
        for post in &recent {
            let when = post.posted_at.format(TIMESTAMP_FORMAT);
            let label = post
                .score
                .as_ref()
                .map_or("not analyzed", |s| s.label.as_str());
            println!("{when}  {:>10}  {label}", post.platform.as_str());
        }
        Ok(())
    }
}

// =============================================================================
// HISTORY COMMANDS
// =============================================================================

/// Create a history database.
pub fn cmd_init(db_path: &Path, force: bool) -> Result<(), CliError> {
    if db_path.exists() {
        if !force {
            return Err(CliError::DatabaseExists(db_path.to_path_buf()));
        }
        std::fs::remove_file(db_path)?;
    }
    HistoryStore::open(db_path)?;
    tracing::info!(path = %db_path.display(), "history database initialized");
    Ok(())
}

/// Audit a snapshot, then append it to the history.
///
/// Snapshots with audit violations never reach disk.
fn publish_snapshot(db_path: &Path, snapshot: &StatusSnapshot, json: bool) -> Result<(), CliError> {
    let audit = audit_snapshot(snapshot);
    if !audit.is_consistent() {
        for violation in audit.violations() {
            eprintln!("violation: {} ({})", violation.check, violation.detail);
        }
        return Err(CliError::AuditRejected(audit.violations().count()));
    }

    let store = HistoryStore::open(db_path)?;
    let key = store.append(snapshot)?;
    if json {
        print_json(&serde_json::json!({ "stored": key }))?;
    } else {
        println!("stored snapshot {key}");
    }
    Ok(())
}

/// Audit a snapshot JSON file and append it to the history.
pub fn cmd_publish(db_path: &Path, snapshot_path: &Path, json: bool) -> Result<(), CliError> {
    let snapshot = load_snapshot(snapshot_path)?;
    publish_snapshot(db_path, &snapshot, json)
}

/// Write the newest stored snapshot as a canonical archive.
pub fn cmd_export(db_path: &Path, out: &Path) -> Result<(), CliError> {
    let store = HistoryStore::open(db_path)?;
    let snapshot = store.latest()?.ok_or(CliError::EmptyHistory)?;
    let bytes = encode_canonical(&snapshot)?;
    std::fs::write(out, bytes)?;
    tracing::info!(path = %out.display(), "canonical archive written");
    Ok(())
}

/// Import a canonical archive into the history.
pub fn cmd_import(db_path: &Path, archive: &Path, json: bool) -> Result<(), CliError> {
    let bytes = std::fs::read(archive)?;
    let snapshot = decode_canonical(&bytes)?;
    publish_snapshot(db_path, &snapshot, json)
}

/// Show the newest stored snapshot.
pub fn cmd_latest(db_path: &Path, as_report: bool) -> Result<(), CliError> {
    let store = HistoryStore::open(db_path)?;
    match store.latest()? {
        None => {
            println!("history is empty");
            Ok(())
        }
        Some(snapshot) => {
            if as_report {
                print!("{}", render_report(&snapshot));
                Ok(())
            } else {
                print_json(&snapshot)
            }
        }
    }
}

/// List stored generation times.
pub fn cmd_history(db_path: &Path, json: bool) -> Result<(), CliError> {
    let store = HistoryStore::open(db_path)?;
    let timestamps = store.timestamps()?;
    if json {
        print_json(&timestamps)
    } else {
        for ts in timestamps {
            match DateTime::from_timestamp(ts, 0) {
                Some(when) => println!("{ts}  {}", when.format(TIMESTAMP_FORMAT)),
                None => println!("{ts}"),
            }
        }
        Ok(())
    }
}
