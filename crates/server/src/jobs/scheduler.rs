// crates/server/src/jobs/scheduler.rs
//! Fixed-size worker pool with a FIFO queue of pending builds.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use fontpack_core::{CanonicalGlyphList, FontId, OutputStore};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::builder::{BuildError, BuildRequest, FontBuilder};
use super::registry::JobRegistry;
use super::types::{Job, JobStatus, JobTransition};
use crate::metrics;

/// Default number of concurrent builds.
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Worker count, at least 1.
    pub concurrency: usize,
    /// Abort builds that take longer than this.
    pub build_timeout: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            build_timeout: None,
        }
    }
}

struct QueuedBuild {
    font_id: FontId,
    glyphs: CanonicalGlyphList,
}

#[derive(Default)]
struct BuildQueue {
    pending: VecDeque<QueuedBuild>,
    /// Ids that are pending or occupying a worker.
    in_flight: HashSet<FontId>,
}

struct Inner {
    config: SchedulerConfig,
    registry: Arc<JobRegistry>,
    store: OutputStore,
    builder: Arc<dyn FontBuilder>,
    queue: Mutex<BuildQueue>,
    wakeup: Notify,
}

/// Runs builds for registered jobs on a bounded worker pool.
///
/// Must be created inside a Tokio runtime. Workers are aborted when the
/// scheduler is dropped; builds never outlive it.
pub struct Scheduler {
    inner: Arc<Inner>,
    workers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn start(
        config: SchedulerConfig,
        registry: Arc<JobRegistry>,
        store: OutputStore,
        builder: Arc<dyn FontBuilder>,
    ) -> Self {
        let config = SchedulerConfig {
            concurrency: config.concurrency.max(1),
            ..config
        };
        tracing::info!(
            concurrency = config.concurrency,
            builder = builder.name(),
            timeout_secs = config.build_timeout.map(|d| d.as_secs()),
            "starting build scheduler"
        );

        let inner = Arc::new(Inner {
            config,
            registry,
            store,
            builder,
            queue: Mutex::new(BuildQueue::default()),
            wakeup: Notify::new(),
        });

        let workers = (0..inner.config.concurrency)
            .map(|slot| {
                let inner = Arc::clone(&inner);
                tokio::spawn(async move { inner.worker_loop(slot).await })
            })
            .collect();

        Self { inner, workers }
    }

    /// Queue a build for a job the registry holds as `enqueued`.
    ///
    /// Returns `false`, doing nothing, if the id is already queued or
    /// building, or if the registry job is not `enqueued`.
    pub fn submit(&self, font_id: FontId, glyphs: CanonicalGlyphList) -> bool {
        match self.inner.registry.peek(&font_id) {
            Some(job) if job.status == JobStatus::Enqueued => {}
            other => {
                tracing::debug!(
                    font_id = %font_id,
                    status = other.as_ref().map(|j| j.status.as_str()),
                    "submit ignored, job not enqueued"
                );
                return false;
            }
        }

        let depth = {
            let mut queue = self.inner.lock_queue();
            if !queue.in_flight.insert(font_id.clone()) {
                tracing::debug!(font_id = %font_id, "submit ignored, build already in flight");
                return false;
            }
            queue.pending.push_back(QueuedBuild { font_id, glyphs });
            queue.pending.len()
        };
        metrics::set_queue_depth(depth);
        self.inner.wakeup.notify_one();
        true
    }

    /// 1-based rank of `font_id` among pending builds, `None` if it is not
    /// waiting for a worker.
    pub fn position(&self, font_id: &FontId) -> Option<usize> {
        self.snapshot(font_id).1
    }

    /// The registry job for `font_id` and its queue rank, read together
    /// under the queue lock. A worker taking the build moves both at once,
    /// so an `enqueued` job seen here that was submitted has a position.
    pub fn snapshot(&self, font_id: &FontId) -> (Option<Job>, Option<usize>) {
        let queue = self.inner.lock_queue();
        let job = self.inner.registry.peek(font_id);
        let position = queue
            .pending
            .iter()
            .position(|b| &b.font_id == font_id)
            .map(|i| i + 1);
        (job, position)
    }

    /// Number of builds waiting for a worker.
    pub fn queue_depth(&self) -> usize {
        self.inner.lock_queue().pending.len()
    }

    pub fn concurrency(&self) -> usize {
        self.inner.config.concurrency
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

impl Inner {
    fn lock_queue(&self) -> MutexGuard<'_, BuildQueue> {
        self.queue.lock().unwrap_or_else(|e| {
            tracing::error!("Mutex poisoned on build queue");
            PoisonError::into_inner(e)
        })
    }

    async fn worker_loop(self: Arc<Self>, slot: usize) {
        loop {
            // Register interest before checking the queue so a submit in
            // between still wakes this worker.
            let notified = self.wakeup.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.take_next(slot) {
                Some(build) => self.run(slot, build).await,
                None => notified.await,
            }
        }
    }

    /// Pop the next pending build and mark its job running, as one step
    /// under the queue lock that [`Scheduler::snapshot`] also holds.
    fn take_next(&self, slot: usize) -> Option<QueuedBuild> {
        let mut queue = self.lock_queue();
        while let Some(build) = queue.pending.pop_front() {
            match self
                .registry
                .transition(&build.font_id, JobTransition::Started { slot })
            {
                Ok(_) => {
                    metrics::set_queue_depth(queue.pending.len());
                    return Some(build);
                }
                Err(e) => {
                    tracing::error!(font_id = %build.font_id, error = %e, "dropping queued build");
                    queue.in_flight.remove(&build.font_id);
                }
            }
        }
        metrics::set_queue_depth(0);
        None
    }

    async fn run(&self, slot: usize, build: QueuedBuild) {
        let QueuedBuild { font_id, glyphs } = build;
        let started = Instant::now();
        tracing::info!(font_id = %font_id, slot, glyphs = glyphs.len(), "font build started");

        let staged = self.store.staging_path(&font_id);
        let request = BuildRequest {
            font_id: font_id.clone(),
            glyphs,
            output: staged.clone(),
        };

        let result = match self.execute(request).await {
            Ok(built) => self
                .store
                .commit(&built, &font_id)
                .await
                .map_err(BuildError::from),
            Err(e) => Err(e),
        };

        // Artifact is in place before the job can be observed as ready.
        let transition = match &result {
            Ok(_) => JobTransition::Succeeded {
                url: self.store.download_url(&font_id),
            },
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&staged).await {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(path = %staged.display(), error = %rm, "failed to remove staged output");
                    }
                }
                JobTransition::Failed {
                    error: e.to_string(),
                }
            }
        };

        let elapsed = started.elapsed();
        match &result {
            Ok(path) => tracing::info!(
                font_id = %font_id,
                slot,
                path = %path.display(),
                duration_secs = elapsed.as_secs_f64(),
                "font build ready"
            ),
            Err(e) => tracing::warn!(
                font_id = %font_id,
                slot,
                error = %e,
                duration_secs = elapsed.as_secs_f64(),
                "font build failed"
            ),
        }
        metrics::record_build(result.is_ok(), elapsed);

        self.finish(&font_id, transition);
    }

    /// Run the builder on its own task so a panic is contained, applying
    /// the configured timeout.
    async fn execute(&self, request: BuildRequest) -> Result<std::path::PathBuf, BuildError> {
        let builder = Arc::clone(&self.builder);
        let task = tokio::spawn(async move { builder.build(request).await });
        let abort = task.abort_handle();

        let joined = match self.config.build_timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    abort.abort();
                    return Err(BuildError::TimedOut(limit));
                }
            },
            None => task.await,
        };

        match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(BuildError::Panicked),
            Err(e) => Err(BuildError::Other(format!("build task aborted: {e}"))),
        }
    }

    /// Release the in-flight slot and record the terminal status together,
    /// so a retry submitted after a failure is never rejected as a duplicate.
    fn finish(&self, font_id: &FontId, transition: JobTransition) {
        let mut queue = self.lock_queue();
        queue.in_flight.remove(font_id);
        if let Err(e) = self.registry.transition(font_id, transition) {
            tracing::error!(font_id = %font_id, error = %e, "failed to record build result");
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// Builder whose builds block until released by the test.
    pub struct GatedBuilder {
        release: Semaphore,
        started: AtomicUsize,
        fail_next: Mutex<usize>,
    }

    impl GatedBuilder {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                release: Semaphore::new(0),
                started: AtomicUsize::new(0),
                fail_next: Mutex::new(0),
            })
        }

        /// Let `n` blocked or future builds proceed.
        pub fn release(&self, n: usize) {
            self.release.add_permits(n);
        }

        /// The next `n` builds fail instead of writing output.
        pub fn fail_next(&self, n: usize) {
            *self.fail_next.lock().unwrap() = n;
        }

        pub fn started(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FontBuilder for GatedBuilder {
        async fn build(&self, request: BuildRequest) -> Result<PathBuf, BuildError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let permit = self
                .release
                .acquire()
                .await
                .map_err(|e| BuildError::Other(e.to_string()))?;
            permit.forget();

            let fail = {
                let mut left = self.fail_next.lock().unwrap();
                let fail = *left > 0;
                *left = left.saturating_sub(1);
                fail
            };
            if fail {
                return Err(BuildError::Other("injected failure".into()));
            }

            tokio::fs::create_dir_all(request.output.parent().unwrap()).await?;
            tokio::fs::write(&request.output, request.font_id.as_str()).await?;
            Ok(request.output)
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    /// Poll until `check` passes or five seconds elapse.
    pub async fn eventually<F: FnMut() -> bool>(mut check: F) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !check() {
            assert!(Instant::now() < deadline, "condition not met within 5s");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
