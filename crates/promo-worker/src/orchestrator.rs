//! Batch orchestration.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;

use promo_models::{BatchReport, ProductRenderJob, RenderResult};

use crate::launcher::JobLauncher;
use crate::logging::JobLogger;
use crate::metrics;

/// Runs a batch of render jobs with bounded parallelism.
pub struct BatchOrchestrator {
    launcher: Arc<dyn JobLauncher>,
    max_parallel: usize,
}

impl BatchOrchestrator {
    pub fn new(launcher: Arc<dyn JobLauncher>, max_parallel: usize) -> Self {
        Self {
            launcher,
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Render every job. One result per job, in job order; a failing job
    /// never stops the others.
    pub async fn run(&self, jobs: Vec<ProductRenderJob>) -> BatchReport {
        let total = jobs.len();
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        info!(jobs = total, max_parallel = self.max_parallel, "Starting batch");

        let futures = jobs.into_iter().enumerate().map(|(idx, job)| {
            let semaphore = semaphore.clone();
            let launcher = self.launcher.clone();
            async move {
                // Never closed, so acquisition only fails if it is dropped
                let _permit = semaphore.acquire_owned().await.ok();

                let logger = JobLogger::new(&job.product_id, "render");
                logger.log_start(&format!("{}/{}", idx + 1, total));

                let result = launcher.launch(job).await;
                log_result(&logger, &result);
                metrics::record_render(&result);
                result
            }
        });

        let results = join_all(futures).await;
        let report = build_report(results);

        metrics::record_batch(total);
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch finished"
        );
        report
    }
}

fn log_result(logger: &JobLogger, result: &RenderResult) {
    match result.output_path() {
        Some(path) => logger.log_completion(&format!("{} in {} ms", path.display(), result.elapsed_ms)),
        None => logger.log_error(&result.log_line()),
    }
}

/// Aggregate results into log lines and the outputs that exist on disk.
pub fn build_report(results: Vec<RenderResult>) -> BatchReport {
    let logs = results.iter().map(RenderResult::log_line).collect();
    let rendered = results
        .iter()
        .filter_map(RenderResult::output_path)
        .filter(|p| p.exists())
        .cloned()
        .collect();

    BatchReport {
        results,
        logs,
        rendered,
    }
}
