//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent render worker processes
    pub max_concurrent_renders: usize,
    /// Maximum concurrent ffprobe calls for estimation and voice checks
    pub max_parallel_probes: usize,
    /// Per-render ffmpeg timeout
    pub render_timeout: Duration,
    /// Extra time a worker child gets beyond `render_timeout` before it is killed
    pub worker_grace: Duration,
    /// Default output directory when the manifest does not set one
    pub output_root: PathBuf,
    /// Executable spawned for `render-job` children (defaults to the current exe)
    pub worker_exe: Option<PathBuf>,
    /// Subtitle font override
    pub subtitle_font: Option<PathBuf>,
    /// Render inside this process instead of spawning worker children
    pub in_process: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_renders: 2,
            max_parallel_probes: 5,
            render_timeout: Duration::from_secs(1800), // 30 minutes
            worker_grace: Duration::from_secs(30),
            output_root: PathBuf::from("./output"),
            worker_exe: None,
            subtitle_font: None,
            in_process: false,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_renders: std::env::var("PROMO_MAX_RENDERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(2),
            max_parallel_probes: std::env::var("PROMO_MAX_PROBES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(5),
            render_timeout: Duration::from_secs(
                std::env::var("PROMO_RENDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            worker_grace: Duration::from_secs(
                std::env::var("PROMO_WORKER_GRACE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            output_root: std::env::var("PROMO_OUTPUT_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./output")),
            worker_exe: std::env::var("PROMO_WORKER_EXE").ok().map(PathBuf::from),
            subtitle_font: std::env::var("PROMO_SUBTITLE_FONT").ok().map(PathBuf::from),
            in_process: std::env::var("PROMO_IN_PROCESS")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    /// Total time a worker child may run.
    pub fn worker_deadline(&self) -> Duration {
        self.render_timeout + self.worker_grace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_renders, 2);
        assert_eq!(config.max_parallel_probes, 5);
        assert_eq!(config.worker_deadline(), Duration::from_secs(1830));
        assert!(!config.in_process);
    }
}
