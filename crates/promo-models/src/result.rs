//! Render results and batch reports.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::product::ProductId;

/// Outcome of one product render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderOutcome {
    Success {
        output_path: PathBuf,
    },
    Failure {
        error: String,
        /// Captured external-process output, verbatim
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diagnostics: Option<String>,
    },
}

/// Result of rendering one product, tagged with its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderResult {
    pub product_id: ProductId,
    #[serde(flatten)]
    pub outcome: RenderOutcome,
    /// Wall-clock render time in milliseconds
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl RenderResult {
    pub fn success(product_id: ProductId, output_path: impl Into<PathBuf>) -> Self {
        Self {
            product_id,
            outcome: RenderOutcome::Success {
                output_path: output_path.into(),
            },
            elapsed_ms: 0,
        }
    }

    pub fn failure(product_id: ProductId, error: impl Into<String>, diagnostics: Option<String>) -> Self {
        Self {
            product_id,
            outcome: RenderOutcome::Failure {
                error: error.into(),
                diagnostics,
            },
            elapsed_ms: 0,
        }
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RenderOutcome::Success { .. })
    }

    pub fn output_path(&self) -> Option<&PathBuf> {
        match &self.outcome {
            RenderOutcome::Success { output_path } => Some(output_path),
            RenderOutcome::Failure { .. } => None,
        }
    }

    /// Human-readable line for the batch log.
    pub fn log_line(&self) -> String {
        match &self.outcome {
            RenderOutcome::Success { output_path } => {
                format!("OK [{}] {}", self.product_id, output_path.display())
            }
            RenderOutcome::Failure { error, diagnostics } => match diagnostics {
                Some(stderr) if !stderr.trim().is_empty() => format!(
                    "FAILED [{}] {}\nFFMPEG STDERR:\n{}",
                    self.product_id, error, stderr
                ),
                _ => format!("FAILED [{}] {}", self.product_id, error),
            },
        }
    }
}

/// Aggregated outcome of a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BatchReport {
    /// One result per job, in job order
    pub results: Vec<RenderResult>,
    /// Log lines for every job (success and failure)
    pub logs: Vec<String>,
    /// Output files that were reported successful and exist on disk
    pub rendered: Vec<PathBuf>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_lines() {
        let ok = RenderResult::success(ProductId::new("A1"), "/out/A1.mp4");
        assert_eq!(ok.log_line(), "OK [A1] /out/A1.mp4");

        let failed = RenderResult::failure(
            ProductId::new("A2"),
            "FFmpeg exited with non-zero status",
            Some("Invalid data found".to_string()),
        );
        let line = failed.log_line();
        assert!(line.starts_with("FAILED [A2]"));
        assert!(line.contains("Invalid data found"));
    }

    #[test]
    fn test_result_json_shape() {
        let ok = RenderResult::success(ProductId::new("A1"), "/out/A1.mp4").with_elapsed_ms(1200);
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["product_id"], "A1");
        assert_eq!(value["output_path"], "/out/A1.mp4");

        let back: RenderResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, ok);
    }

    #[test]
    fn test_report_counts() {
        let report = BatchReport {
            results: vec![
                RenderResult::success(ProductId::new("A"), "/o/A.mp4"),
                RenderResult::failure(ProductId::new("B"), "boom", None),
            ],
            ..Default::default()
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
    }
}
