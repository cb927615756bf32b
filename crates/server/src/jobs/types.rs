// crates/server/src/jobs/types.rs
//! Types for the font build job system.

use chrono::{DateTime, Utc};
use fontpack_core::FontId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of a build job.
///
/// `Enqueued` means waiting for a free worker, `Running` means occupying a
/// worker slot. `Ready` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Enqueued,
    Running,
    Ready,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Enqueued => "enqueued",
            JobStatus::Running => "running",
            JobStatus::Ready => "ready",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Ready | JobStatus::Failed)
    }
}

/// Lifecycle record of one build attempt for one font id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub font_id: FontId,
    pub status: JobStatus,
    /// 1 for the first build, incremented each time a failed job is retried.
    pub attempt: u32,
    pub enqueued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_slot: Option<usize>,
}

impl Job {
    pub(crate) fn enqueued(font_id: FontId, attempt: u32) -> Self {
        Self {
            font_id,
            status: JobStatus::Enqueued,
            attempt,
            enqueued_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
            result_url: None,
            worker_slot: None,
        }
    }

    /// A job rebuilt from an artifact found on disk.
    pub(crate) fn recovered(font_id: FontId, result_url: String) -> Self {
        let now = Utc::now();
        Self {
            font_id,
            status: JobStatus::Ready,
            attempt: 0,
            enqueued_at: now,
            started_at: None,
            finished_at: Some(now),
            error: None,
            result_url: Some(result_url),
            worker_slot: None,
        }
    }
}

/// A status change requested by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTransition {
    Started { slot: usize },
    Succeeded { url: String },
    Failed { error: String },
}

impl JobTransition {
    pub fn target(&self) -> JobStatus {
        match self {
            JobTransition::Started { .. } => JobStatus::Running,
            JobTransition::Succeeded { .. } => JobStatus::Ready,
            JobTransition::Failed { .. } => JobStatus::Failed,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no job registered for {0}")]
    UnknownJob(FontId),

    #[error("job {font_id} cannot move from {from} to {to}")]
    InvalidTransition {
        font_id: FontId,
        from: &'static str,
        to: &'static str,
    },
}

/// Number of registered jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub enqueued: usize,
    pub running: usize,
    pub ready: usize,
    pub failed: usize,
}
