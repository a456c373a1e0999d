//! FFprobe container duration probe.
//!
//! Probing never raises: every failure mode is reported as
//! `ProbeOutcome::Failed` so callers can tell "unknown" apart from a real
//! zero-length file, while aggregation treats both as 0.0.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Result of probing one file.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// Container duration in seconds
    Duration(f64),
    /// Probe could not produce a duration
    Failed(String),
}

impl ProbeOutcome {
    /// Duration with failures counted as 0.0.
    pub fn seconds(&self) -> f64 {
        match self {
            ProbeOutcome::Duration(d) => *d,
            ProbeOutcome::Failed(_) => 0.0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ProbeOutcome::Failed(_))
    }
}

/// Probe the container duration of a media file with `ffprobe`.
pub async fn probe_duration(path: impl AsRef<Path>) -> ProbeOutcome {
    probe_duration_with("ffprobe", path).await
}

/// Probe with an explicit ffprobe program.
pub async fn probe_duration_with(program: &str, path: impl AsRef<Path>) -> ProbeOutcome {
    let path = path.as_ref();

    if !path.exists() {
        return ProbeOutcome::Failed(format!("file not found: {}", path.display()));
    }

    let output = Command::new(program)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            debug!(path = %path.display(), "ffprobe could not be started: {}", e);
            return ProbeOutcome::Failed(format!("ffprobe could not be started: {}", e));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(path = %path.display(), "ffprobe failed: {}", stderr.trim());
        return ProbeOutcome::Failed(format!("ffprobe exited with {}: {}", output.status, stderr.trim()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    match parse_duration_output(&stdout) {
        Some(duration) => ProbeOutcome::Duration(duration),
        None => ProbeOutcome::Failed(format!("unparsable duration: {:?}", stdout.trim())),
    }
}

/// Parse the single value printed by `-show_entries format=duration`.
pub(crate) fn parse_duration_output(stdout: &str) -> Option<f64> {
    let value: f64 = stdout.lines().next()?.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}
