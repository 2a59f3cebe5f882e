//! Append-only run log with secret redaction.

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::warn;

const LOG_DIR_ENV: &str = "MULTIRESEARCH_LOG_DIR";
const RETENTION_ENV: &str = "MULTIRESEARCH_LOG_RETENTION_DAYS";
const DEFAULT_LOG_DIR: &str = "data/logs";
const DEFAULT_RETENTION_DAYS: u64 = 90;

static REDACTION_PATTERNS: Lazy<Vec<(String, Regex)>> = Lazy::new(|| {
    vec![
        (
            "api_key".to_string(),
            Regex::new(r"(?i)(api[_-]?key\s*[:=]\s*)([A-Za-z0-9\-_.+/]+)")
                .expect("invalid api_key regex"),
        ),
        (
            "secret".to_string(),
            Regex::new(r"(?i)(secret\s*[:=]\s*)([A-Za-z0-9\-_.+/]+)")
                .expect("invalid secret regex"),
        ),
        (
            "bearer".to_string(),
            Regex::new(r"(?i)(bearer\s+)([A-Za-z0-9\-_.+=/]+)").expect("invalid bearer regex"),
        ),
    ]
});

/// Facts about one finished run, sanitized before they reach disk.
#[derive(Debug, Clone)]
pub struct RunLogInput {
    pub session_id: String,
    pub query: String,
    pub phase: String,
    pub report_chars: usize,
    pub agents_reporting: usize,
    pub error: Option<String>,
}

#[derive(Serialize)]
struct RunLogRecord {
    timestamp: String,
    session_id: String,
    query: String,
    phase: String,
    report_chars: usize,
    agents_reporting: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    redactions: Vec<String>,
}

fn log_base_dir() -> PathBuf {
    std::env::var(LOG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_DIR))
}

fn retention_days() -> u64 {
    std::env::var(RETENTION_ENV)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETENTION_DAYS)
}

/// Append one run record to the current month's JSONL file.
pub fn log_run(input: RunLogInput) -> Result<PathBuf> {
    log_run_to(&log_base_dir(), input)
}

fn log_run_to(base_dir: &Path, input: RunLogInput) -> Result<PathBuf> {
    let mut redactions = HashSet::new();
    let query = sanitize_text(&input.query, &mut redactions);
    let error = input
        .error
        .map(|message| sanitize_text(&message, &mut redactions));

    let now = Utc::now();
    let record = RunLogRecord {
        timestamp: now.to_rfc3339(),
        session_id: input.session_id,
        query,
        phase: input.phase,
        report_chars: input.report_chars,
        agents_reporting: input.agents_reporting,
        error,
        redactions: {
            let mut names: Vec<String> = redactions.into_iter().collect();
            names.sort();
            names
        },
    };

    let path = base_dir.join(format!("runs-{:04}-{:02}.jsonl", now.year(), now.month()));
    append_json_line(&path, &record)?;
    Ok(path)
}

/// Delete log files older than the retention window; returns how many were
/// removed.
pub fn remove_stale_logs() -> Result<usize> {
    remove_stale_logs_in(&log_base_dir(), retention_days())
}

fn remove_stale_logs_in(base_dir: &Path, retention_days: u64) -> Result<usize> {
    if !base_dir.exists() {
        return Ok(0);
    }

    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(retention_days * 24 * 60 * 60))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut removed = 0;
    for entry in fs::read_dir(base_dir)
        .with_context(|| format!("failed to read log directory {}", base_dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
            continue;
        }
        let modified = entry.metadata().and_then(|meta| meta.modified());
        match modified {
            Ok(modified) if modified < cutoff => {
                fs::remove_file(&path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
                removed += 1;
            }
            Ok(_) => {}
            Err(err) => warn!(path = %path.display(), error = %err, "unreadable log metadata"),
        }
    }

    Ok(removed)
}

fn append_json_line<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let line = serde_json::to_string(value)?;
    writeln!(writer, "{}", line)
        .with_context(|| format!("failed to append log entry to {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

fn sanitize_text(input: &str, redactions: &mut HashSet<String>) -> String {
    let mut output = input.to_string();
    for (name, regex) in REDACTION_PATTERNS.iter() {
        let mut matched = false;
        output = regex
            .replace_all(&output, |caps: &Captures| {
                matched = true;
                format!("{}[REDACTED]", &caps[1])
            })
            .to_string();
        if matched {
            redactions.insert(name.clone());
        }
    }
    output
}
