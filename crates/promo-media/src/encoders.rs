//! Video encoder detection.

use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Software encoder that is always offered.
pub const SOFTWARE_ENCODER: &str = "libx264";

/// Hardware encoders worth offering, in preference order.
pub const HARDWARE_ENCODERS: &[&str] = &[
    "h264_nvenc",
    "hevc_nvenc",
    "av1_nvenc",
    "h264_qsv",
    "hevc_qsv",
    "av1_qsv",
    "h264_amf",
    "hevc_amf",
    "av1_amf",
    "h264_mf",
    "hevc_mf",
    "h264_vaapi",
    "hevc_vaapi",
    "av1_vaapi",
];

/// Encoder names from `ffmpeg -encoders` output.
pub(crate) fn parse_encoder_names(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let flags = fields.next()?;
            let name = fields.next()?;
            flags.starts_with('V').then(|| name.to_string())
        })
        .collect()
}

/// Usable video encoders: `libx264` first, then known hardware encoders the
/// ffmpeg build reports.
pub fn select_encoders(reported: &[String]) -> Vec<String> {
    let mut encoders = vec![SOFTWARE_ENCODER.to_string()];
    encoders.extend(
        HARDWARE_ENCODERS
            .iter()
            .filter(|hw| reported.iter().any(|r| r == *hw))
            .map(|hw| hw.to_string()),
    );
    encoders
}

/// Preferred H.264 encoder among the usable ones.
pub fn preferred_encoder(encoders: &[String]) -> &str {
    encoders
        .iter()
        .find(|e| e.starts_with("h264_"))
        .map(String::as_str)
        .unwrap_or(SOFTWARE_ENCODER)
}

/// Query an ffmpeg binary for its usable video encoders.
pub async fn detect_encoders(program: &str) -> MediaResult<Vec<String>> {
    let program = which::which(program).map_err(|_| MediaError::FfmpegNotFound)?;

    let output = Command::new(program)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "ffmpeg -encoders failed",
            Some(String::from_utf8_lossy(&output.stderr).into_owned()),
            output.status.code(),
        ));
    }

    let reported = parse_encoder_names(&String::from_utf8_lossy(&output.stdout));
    debug!(count = reported.len(), "ffmpeg reported video encoders");
    Ok(select_encoders(&reported))
}
