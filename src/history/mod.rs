//! Execution history
//!
//! One JSON document per run, named `{workflow}-{unix_millis}-{run_id8}.json`:
//!
//! ```json
//! {
//!   "run_id": "0b6f7a4e-...",
//!   "timestamp": "2026-03-01T12:00:00Z",
//!   "workflow": "deploy",
//!   "success": false,
//!   "duration_ms": 1834,
//!   "steps": [
//!     { "stepName": "Build", "success": true, "duration_ms": 1800 },
//!     { "stepName": "Test", "success": false, "error": "Command exited with code 1", "duration_ms": 34 }
//!   ]
//! }
//! ```
//!
//! Every run is also appended as one JSON line to `glue.log` in the same
//! directory. At 5 MB the log rotates to `glue.1.log`, keeping five files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::engine::result::{millis, StepResult};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Failed to access history at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode execution log: {0}")]
    Encode(#[from] serde_json::Error),
}

impl HistoryError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A recorded run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub workflow: String,
    pub success: bool,
    /// Sum of the step durations
    #[serde(rename = "duration_ms", with = "millis")]
    pub duration: Duration,
    pub steps: Vec<StepResult>,
}

impl ExecutionLog {
    pub fn new(workflow: impl Into<String>, steps: Vec<StepResult>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            workflow: workflow.into(),
            success: steps.iter().all(|s| s.success),
            duration: steps.iter().map(|s| s.duration).sum(),
            steps,
        }
    }

    fn file_name(&self) -> String {
        let run_id = self.run_id.simple().to_string();
        format!(
            "{}-{}-{}.json",
            sanitize(&self.workflow),
            self.timestamp.timestamp_millis(),
            &run_id[..8]
        )
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "workflow".to_string()
    } else {
        cleaned
    }
}

const RUN_LOG: &str = "glue";
const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

#[derive(Serialize)]
struct RunLogLine<'a> {
    level: &'static str,
    message: &'static str,
    #[serde(flatten)]
    log: &'a ExecutionLog,
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

/// Persists and reads back execution logs in a directory
#[derive(Debug, Clone)]
pub struct HistoryRecorder {
    dir: PathBuf,
    max_log_bytes: u64,
}

impl HistoryRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_log_bytes: MAX_LOG_BYTES,
        }
    }

    /// Size at which `glue.log` rotates
    pub fn with_log_limit(mut self, bytes: u64) -> Self {
        self.max_log_bytes = bytes;
        self
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", RUN_LOG))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one log for a finished (or aborted) run
    #[instrument(skip(self, steps), fields(steps = steps.len()))]
    pub fn record(&self, workflow: &str, steps: &[StepResult]) -> Result<PathBuf, HistoryError> {
        let log = ExecutionLog::new(workflow, steps.to_vec());
        self.write(&log)
    }

    pub fn write(&self, log: &ExecutionLog) -> Result<PathBuf, HistoryError> {
        fs::create_dir_all(&self.dir).map_err(|e| HistoryError::io(&self.dir, e))?;

        let path = self.dir.join(log.file_name());
        let json = serde_json::to_string_pretty(log)?;
        fs::write(&path, json).map_err(|e| HistoryError::io(&path, e))?;
        info!(path = %path.display(), "Execution log written");

        // the JSON record above is what `list` reads; the run log is secondary
        if let Err(e) = self.append_run_log(log) {
            warn!("Failed to append to run log: {}", e);
        }
        Ok(path)
    }

    fn append_run_log(&self, log: &ExecutionLog) -> Result<(), HistoryError> {
        let path = self.log_path();
        if fs::metadata(&path).is_ok_and(|m| m.len() >= self.max_log_bytes) {
            self.rotate_run_log()?;
        }

        let line = serde_json::to_string(&RunLogLine {
            level: if log.success { "info" } else { "error" },
            message: "Workflow execution",
            log,
        })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| HistoryError::io(&path, e))?;
        writeln!(file, "{}", line).map_err(|e| HistoryError::io(&path, e))
    }

    /// `glue.log` -> `glue.1.log` -> ... -> `glue.{MAX-1}.log`, dropping the oldest
    fn rotate_run_log(&self) -> Result<(), HistoryError> {
        let numbered = |n: usize| self.dir.join(format!("{}.{}.log", RUN_LOG, n));

        let oldest = numbered(MAX_LOG_FILES - 1);
        match fs::remove_file(&oldest) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(HistoryError::io(&oldest, e)),
        }
        for n in (1..MAX_LOG_FILES - 1).rev() {
            let from = numbered(n);
            if from.exists() {
                fs::rename(&from, numbered(n + 1)).map_err(|e| HistoryError::io(&from, e))?;
            }
        }
        let current = self.log_path();
        fs::rename(&current, numbered(1)).map_err(|e| HistoryError::io(&current, e))
    }

    /// Most recent logs first, at most `limit`. Unreadable files are skipped.
    pub fn list(&self, limit: usize) -> Vec<ExecutionLog> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(dir = %self.dir.display(), "Cannot read history directory: {}", e);
                return Vec::new();
            }
        };

        let mut logs: Vec<(PathBuf, ExecutionLog)> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| has_extension(path, "json"))
            .filter_map(|path| {
                let parsed = fs::read_to_string(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|text| {
                        serde_json::from_str::<ExecutionLog>(&text).map_err(|e| e.to_string())
                    });
                match parsed {
                    Ok(log) => Some((path, log)),
                    Err(e) => {
                        debug!(path = %path.display(), "Skipping history file: {}", e);
                        None
                    }
                }
            })
            .collect();

        logs.sort_by(|(a_path, a), (b_path, b)| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b_path.cmp(a_path))
        });

        logs.into_iter().take(limit).map(|(_, log)| log).collect()
    }

    /// Remove every record and the run log. Not atomic: a failure may leave some behind.
    pub fn clear(&self) -> Result<(), HistoryError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(HistoryError::io(&self.dir, e)),
        };

        for entry in entries {
            let path = entry.map_err(|e| HistoryError::io(&self.dir, e))?.path();
            if has_extension(&path, "json") || has_extension(&path, "log") {
                fs::remove_file(&path).map_err(|e| HistoryError::io(&path, e))?;
            }
        }
        Ok(())
    }
}
