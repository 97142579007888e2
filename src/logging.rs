//! Step-level logging for active-learning runs.
//!
//! Every completed loop step is buffered in memory; every `log_every`-th
//! step is also appended to the JSONL journal at `logs/active_loop.jsonl`.
//! The buffer makes runs inspectable in tests without touching the
//! filesystem.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

const JOURNAL_PATH: &str = "logs/active_loop.jsonl";

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    let line = serde_json::to_string(value).map_err(io::Error::from)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

/// Single journal entry emitted after a completed loop step.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepLogEntry {
    pub sequence: usize,
    pub step: usize,
    pub train_loss: f32,
    pub train_accuracy: f32,
    pub eval_loss: f32,
    pub eval_accuracy: f32,
    pub requested: usize,
    pub labelled_now: usize,
    pub labelled_total: usize,
    pub pool_remaining: usize,
    pub timestamp_ms: u128,
}

/// Buffering step logger with a configurable journal interval.
#[derive(Debug, Clone)]
pub struct StepLogger {
    log_every: usize,
    sequence: usize,
    entries: Vec<StepLogEntry>,
    journal_path: PathBuf,
}

impl StepLogger {
    pub fn new(log_every: usize) -> Self {
        Self {
            log_every: log_every.max(1),
            sequence: 0,
            entries: Vec::new(),
            journal_path: PathBuf::from(JOURNAL_PATH),
        }
    }

    #[cfg(test)]
    fn set_journal_path(&mut self, path: impl Into<PathBuf>) {
        self.journal_path = path.into();
    }

    pub fn entries(&self) -> &[StepLogEntry] {
        &self.entries
    }

    /// Assigns the next sequence number, buffers the entry, then journals
    /// it when it falls on the interval. The buffer keeps the entry even
    /// when the journal write fails.
    pub fn record(&mut self, mut entry: StepLogEntry) -> io::Result<()> {
        self.sequence += 1;
        entry.sequence = self.sequence;
        self.entries.push(entry.clone());

        if self.sequence % self.log_every == 0 {
            if let Some(dir) = self.journal_path.parent() {
                fs::create_dir_all(dir)?;
            }
            append_json_line(&self.journal_path, &entry)?;
        }

        Ok(())
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp_now() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
    }
}
