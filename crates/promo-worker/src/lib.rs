//! Promo video batch worker.
//!
//! This crate provides:
//! - Environment configuration
//! - Manifest loading and validation
//! - Job launchers (child worker processes or in-process)
//! - Bounded-parallel batch orchestration
//! - Structured logging and render metrics

pub mod config;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod manifest;
pub mod metrics;
pub mod orchestrator;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use launcher::{
    InProcessLauncher, JobLauncher, ProcessLauncher, DEADLINE_FLAG, RENDER_JOB_COMMAND,
};
pub use logging::{init_tracing, JobLogger};
pub use manifest::{load_manifest, parse_manifest};
pub use orchestrator::{build_report, BatchOrchestrator};
