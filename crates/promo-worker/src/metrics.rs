//! Render metrics recorded through the `metrics` facade.

use metrics::{counter, histogram};

use promo_models::RenderResult;

/// Metric names as constants for consistency.
pub mod names {
    pub const RENDERS_TOTAL: &str = "promo_renders_total";
    pub const RENDER_SECONDS: &str = "promo_render_seconds";
    pub const BATCHES_TOTAL: &str = "promo_batches_total";
}

/// Record one finished render.
pub fn record_render(result: &RenderResult) {
    let outcome = if result.is_success() { "success" } else { "failure" };
    let labels = [("outcome", outcome.to_string())];

    counter!(names::RENDERS_TOTAL, &labels).increment(1);
    histogram!(names::RENDER_SECONDS, &labels).record(result.elapsed_ms as f64 / 1000.0);
}

/// Record a finished batch.
pub fn record_batch(jobs: usize) {
    counter!(names::BATCHES_TOTAL).increment(1);
    histogram!("promo_batch_jobs").record(jobs as f64);
}
