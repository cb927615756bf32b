// crates/server/src/jobs/registry.rs
//! In-memory job table with read-through to the output store.
//!
//! The map holds hot state for the lifetime of the process. For ids the map
//! does not know, the artifact on disk is the source of truth: a present
//! artifact is reported as a `ready` job and cached in the map.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use fontpack_core::{FontId, OutputStore};

use super::types::{Job, JobCounts, JobStatus, JobTransition, RegistryError};

/// Font id → job.
///
/// Entries are never evicted. The filesystem check in
/// [`JobRegistry::get_or_create`] and [`JobRegistry::get`] runs without the
/// lock held.
pub struct JobRegistry {
    jobs: RwLock<HashMap<FontId, Job>>,
    store: OutputStore,
}

impl JobRegistry {
    pub fn new(store: OutputStore) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            store,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<FontId, Job>> {
        self.jobs.read().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned reading job registry");
            PoisonError::into_inner(e)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<FontId, Job>> {
        self.jobs.write().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned writing job registry");
            PoisonError::into_inner(e)
        })
    }

    /// In-memory lookup only, no filesystem access.
    pub fn peek(&self, font_id: &FontId) -> Option<Job> {
        self.read().get(font_id).cloned()
    }

    /// Look up a job, falling back to the output store for unknown ids.
    pub async fn get(&self, font_id: &FontId) -> Option<Job> {
        if let Some(job) = self.peek(font_id) {
            return Some(job);
        }
        if !self.store.exists(font_id).await {
            return None;
        }
        let recovered = Job::recovered(font_id.clone(), self.store.download_url(font_id));
        let job = self
            .write()
            .entry(font_id.clone())
            .or_insert(recovered)
            .clone();
        tracing::debug!(font_id = %font_id, status = job.status.as_str(), "job recovered from output store");
        Some(job)
    }

    /// Return the job for `font_id`, creating an `enqueued` one if needed.
    ///
    /// A new job is created (and `true` returned) when there is no entry, or
    /// only a `failed` one, and no artifact on disk. Concurrent callers for
    /// the same id agree on a single creator.
    pub async fn get_or_create(&self, font_id: &FontId) -> (Job, bool) {
        if let Some(job) = self.peek(font_id) {
            if job.status != JobStatus::Failed {
                return (job, false);
            }
        }

        let on_disk = self.store.exists(font_id).await;

        let mut jobs = self.write();
        let previous_attempt = match jobs.get(font_id) {
            Some(job) if job.status != JobStatus::Failed => return (job.clone(), false),
            Some(job) => Some(job.attempt),
            None => None,
        };

        if on_disk {
            let job = Job::recovered(font_id.clone(), self.store.download_url(font_id));
            jobs.insert(font_id.clone(), job.clone());
            return (job, false);
        }

        let attempt = previous_attempt.map_or(1, |a| a + 1);
        let job = Job::enqueued(font_id.clone(), attempt);
        jobs.insert(font_id.clone(), job.clone());
        drop(jobs);

        if attempt > 1 {
            tracing::info!(font_id = %font_id, attempt, "retrying failed font build");
        }
        (job, true)
    }

    /// Apply a status change. Only the scheduler drives transitions.
    ///
    /// Allowed: enqueued → running, running → ready, running → failed.
    pub(crate) fn transition(
        &self,
        font_id: &FontId,
        transition: JobTransition,
    ) -> Result<Job, RegistryError> {
        let mut jobs = self.write();
        let job = jobs
            .get_mut(font_id)
            .ok_or_else(|| RegistryError::UnknownJob(font_id.clone()))?;

        let allowed = matches!(
            (job.status, &transition),
            (JobStatus::Enqueued, JobTransition::Started { .. })
                | (JobStatus::Running, JobTransition::Succeeded { .. })
                | (JobStatus::Running, JobTransition::Failed { .. })
        );
        if !allowed {
            return Err(RegistryError::InvalidTransition {
                font_id: font_id.clone(),
                from: job.status.as_str(),
                to: transition.target().as_str(),
            });
        }

        let now = Utc::now();
        job.status = transition.target();
        match transition {
            JobTransition::Started { slot } => {
                job.started_at = Some(now);
                job.worker_slot = Some(slot);
            }
            JobTransition::Succeeded { url } => {
                job.finished_at = Some(now);
                job.worker_slot = None;
                job.result_url = Some(url);
            }
            JobTransition::Failed { error } => {
                job.finished_at = Some(now);
                job.worker_slot = None;
                job.error = Some(error);
            }
        }
        Ok(job.clone())
    }

    /// Jobs that are waiting or building, oldest first.
    pub fn active(&self) -> Vec<Job> {
        let mut active: Vec<Job> = self
            .read()
            .values()
            .filter(|job| !job.status.is_terminal())
            .cloned()
            .collect();
        active.sort_by_key(|job| job.enqueued_at);
        active
    }

    pub fn counts(&self) -> JobCounts {
        let mut counts = JobCounts::default();
        for job in self.read().values() {
            match job.status {
                JobStatus::Enqueued => counts.enqueued += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Ready => counts.ready += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
