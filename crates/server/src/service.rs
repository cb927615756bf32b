// crates/server/src/service.rs
//! The `generate` and `status` operations.
//!
//! Transport-agnostic: route handlers and tests call [`FontService`]
//! directly with the decoded request.

use std::sync::Arc;

use fontpack_core::{fingerprint, validate, FontId, GlyphCatalog, OutputStore, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::jobs::{Job, JobRegistry, JobStatus, Scheduler};
use crate::metrics;

/// What a client sees when polling a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Font id the status refers to.
    pub id: String,
    pub status: JobStatus,
    /// 1-based queue rank, only while `enqueued`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    /// Download link, only when `ready`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Build failure detail, only when `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid request")]
    InvalidRequest(#[source] ValidationError),

    #[error("Unknown job id.")]
    UnknownJob(String),
}

pub struct FontService {
    catalog: Arc<GlyphCatalog>,
    store: OutputStore,
    registry: Arc<JobRegistry>,
    scheduler: Arc<Scheduler>,
}

impl FontService {
    pub fn new(
        catalog: Arc<GlyphCatalog>,
        store: OutputStore,
        registry: Arc<JobRegistry>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        Self {
            catalog,
            store,
            registry,
            scheduler,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    /// Validate the request, deduplicate it by fingerprint and schedule a
    /// build if none exists yet. Reports the resulting job status.
    pub async fn generate(&self, request: &Value) -> Result<StatusResponse, ServiceError> {
        let validated = validate(request, &self.catalog).map_err(|e| {
            metrics::record_generate("invalid");
            tracing::debug!(error = %e, "rejected generate request");
            ServiceError::InvalidRequest(e)
        })?;

        let font_id = fingerprint(&validated.glyphs);
        let (_, created) = self.registry.get_or_create(&font_id).await;

        if created {
            metrics::record_generate("created");
            tracing::info!(
                font_id = %font_id,
                glyphs = validated.glyphs.len(),
                dropped = validated.dropped.total(),
                "new font build requested"
            );
            self.scheduler.submit(font_id.clone(), validated.glyphs);
        } else {
            metrics::record_generate("deduplicated");
        }

        self.status(font_id.as_str()).await
    }

    /// Report the state of the job for `id`.
    pub async fn status(&self, id: &str) -> Result<StatusResponse, ServiceError> {
        let unknown = || ServiceError::UnknownJob(id.to_string());
        let font_id = FontId::parse(id).ok_or_else(unknown)?;
        let job = self.registry.get(&font_id).await.ok_or_else(unknown)?;
        Ok(self.describe(job))
    }

    fn describe(&self, job: Job) -> StatusResponse {
        // Re-read a queued job together with its rank; a worker may have
        // taken it since the registry lookup.
        let (job, position) = match job.status {
            JobStatus::Enqueued => {
                let (current, position) = self.scheduler.snapshot(&job.font_id);
                (current.unwrap_or(job), position)
            }
            _ => (job, None),
        };

        let mut response = StatusResponse {
            id: job.font_id.to_string(),
            status: job.status,
            position: None,
            url: None,
            error: None,
        };
        match job.status {
            JobStatus::Enqueued => response.position = position,
            JobStatus::Running => {}
            JobStatus::Ready => {
                response.url = Some(
                    job.result_url
                        .clone()
                        .unwrap_or_else(|| self.store.download_url(&job.font_id)),
                )
            }
            JobStatus::Failed => response.error = job.error.clone(),
        }
        response
    }
}
