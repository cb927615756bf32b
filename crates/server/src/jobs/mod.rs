// crates/server/src/jobs/mod.rs
//! Font build job system.
//!
//! Provides:
//! - `JobRegistry`: font id → job table with output store read-through
//! - `Scheduler`: bounded worker pool with a FIFO pending queue
//! - `FontBuilder`: the build capability, with `CommandBuilder` for external builders
//! - `Job` / `JobStatus`: lifecycle records reported by status queries

pub mod builder;
pub mod registry;
pub mod scheduler;
pub mod types;

pub use builder::{BuildError, BuildRequest, CommandBuilder, FontBuilder};
pub use registry::JobRegistry;
pub use scheduler::{Scheduler, SchedulerConfig, DEFAULT_CONCURRENCY};
pub use types::{Job, JobCounts, JobStatus, JobTransition, RegistryError};
