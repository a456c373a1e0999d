//! Structured per-product logging utilities.
//!
//! Provides consistent, structured logging for product renders with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use promo_models::ProductId;

/// Product logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    product_id: String,
    operation: String,
}

impl JobLogger {
    /// Create a new logger for a product and operation.
    ///
    /// # Arguments
    /// * `product_id` - The product being worked on
    /// * `operation` - The type of operation (e.g., "render", "estimate")
    pub fn new(product_id: &ProductId, operation: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            product_id = %self.product_id,
            operation = %self.operation,
            "Started: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            product_id = %self.product_id,
            operation = %self.operation,
            "Warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            product_id = %self.product_id,
            operation = %self.operation,
            "Failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            product_id = %self.product_id,
            operation = %self.operation,
            "Completed: {}", message
        );
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this product.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "product",
            product_id = %self.product_id,
            operation = %self.operation
        )
    }
}

/// Install the global tracing subscriber.
///
/// Logs always go to stderr so a `render-job` child keeps stdout for its
/// result payload. `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "promo=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
