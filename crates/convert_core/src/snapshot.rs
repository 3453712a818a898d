use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque identifier the service returns for a started job (its `download_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Downloading,
    Completed,
    Failed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Downloading)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "downloading" => Ok(JobStatus::Downloading),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "error" => Ok(JobStatus::Error),
            other => Err(format!("unknown job status `{other}`")),
        }
    }
}

pub const STATUS_UNAVAILABLE: &str = "status unavailable";

/// One observation of a remote job. Each snapshot stands on its own; progress
/// may go backwards between snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub status: JobStatus,
    progress: u8,
    pub message: String,
    pub filename: Option<String>,
}

impl ProgressSnapshot {
    /// Build a snapshot from raw wire values; progress is clamped to `0..=100`.
    pub fn new(
        status: JobStatus,
        raw_progress: f64,
        message: impl Into<String>,
        filename: Option<String>,
    ) -> Self {
        Self {
            status,
            progress: clamp_progress(raw_progress),
            message: message.into(),
            filename: filename.filter(|name| !name.trim().is_empty()),
        }
    }

    /// Synthetic terminal snapshot used once polling gives up.
    pub fn status_unavailable() -> Self {
        Self::new(JobStatus::Error, 0.0, STATUS_UNAVAILABLE, None)
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

fn clamp_progress(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u8
}
