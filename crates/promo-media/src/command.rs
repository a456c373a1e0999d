//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// One `-i` input together with the options that precede it.
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegInput {
    /// Input arguments (before -i)
    pub args: Vec<String>,
    /// Input file path
    pub path: PathBuf,
}

impl FfmpegInput {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            args: Vec::new(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn with_args<I, S>(path: impl AsRef<Path>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            path: path.as_ref().to_path_buf(),
        }
    }
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Global arguments (before the first input)
    global_args: Vec<String>,
    /// Inputs in declaration order
    inputs: Vec<FfmpegInput>,
    /// Output arguments (after the last input)
    output_args: Vec<String>,
    /// Output file path
    output: PathBuf,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            global_args: Vec::new(),
            inputs: Vec::new(),
            output_args: Vec::new(),
            output: output.as_ref().to_path_buf(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add a global argument.
    pub fn global_arg(mut self, arg: impl Into<String>) -> Self {
        self.global_args.push(arg.into());
        self
    }

    /// Add a plain input.
    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.input_spec(FfmpegInput::new(path))
    }

    /// Add an input with its own options.
    pub fn input_spec(mut self, input: FfmpegInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Limit output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream or filter-graph label to the output.
    pub fn map(self, stream: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(stream)
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Declared inputs, in order.
    pub fn inputs(&self) -> &[FfmpegInput] {
        &self.inputs
    }

    /// Output file path.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        // Overwrite flag
        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-hide_banner".to_string());

        // Log level
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        args.extend(self.global_args.iter().cloned());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        // Output args
        args.extend(self.output_args.iter().cloned());

        // Output file
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Captured output of a finished FFmpeg process.
#[derive(Debug, Clone, Default)]
pub struct FfmpegOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runner for FFmpeg commands with output capture and timeout.
pub struct FfmpegRunner {
    /// Program name or path
    program: String,
    /// Timeout in seconds
    timeout_secs: Option<u64>,
    /// Start ffmpeg as the leader of a new process group
    own_process_group: bool,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            timeout_secs: None,
            own_process_group: true,
        }
    }

    /// Use another ffmpeg binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Keep ffmpeg in the caller's process group.
    ///
    /// A render worker child uses this so that the parent's `killpg` on its
    /// group also reaches ffmpeg.
    pub fn in_caller_group(mut self) -> Self {
        self.own_process_group = false;
        self
    }

    /// Run an FFmpeg command to completion, capturing stdout and stderr.
    ///
    /// A non-zero exit is returned as `MediaError::FfmpegFailed` carrying the
    /// full stderr text.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<FfmpegOutput> {
        let program = which::which(&self.program).map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", self.program, args.join(" "));

        let mut command = Command::new(program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so a timeout can take down encoder helpers too
        #[cfg(unix)]
        if self.own_process_group {
            command.process_group(0);
        }

        let child = command.spawn()?;
        let pid = child.id();

        let output = match self.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output()).await {
                    Ok(result) => result?,
                    Err(_) => {
                        // Dropping the wait future already killed ffmpeg itself
                        if self.own_process_group {
                            warn!("FFmpeg timed out after {} seconds, killing process group", secs);
                            kill_process_group(pid);
                        } else {
                            warn!("FFmpeg timed out after {} seconds", secs);
                        }
                        return Err(MediaError::Timeout(secs));
                    }
                }
            }
            None => child.wait_with_output().await?,
        };

        let captured = FfmpegOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if output.status.success() {
            Ok(captured)
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(captured.stderr),
                output.status.code(),
            ))
        }
    }
}

/// SIGKILL every process in the group led by `pid`.
#[cfg(unix)]
pub fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = pid {
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!(pid, "killpg failed: {}", e);
        }
    }
}

#[cfg(not(unix))]
pub fn kill_process_group(_pid: Option<u32>) {}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("out.mp4")
            .global_arg("-hwaccel")
            .global_arg("auto")
            .input("a.mp4")
            .input_spec(FfmpegInput::with_args("outro.mp4", ["-t", "3"]))
            .filter_complex("[0:v]scale=1920:1080[v0]")
            .map("[v0]");

        let args = cmd.build_args();
        assert_eq!(args[0], "-y");
        assert_eq!(args.last().unwrap(), "out.mp4");

        let hw = args.iter().position(|a| a == "-hwaccel").unwrap();
        let first_input = args.iter().position(|a| a == "-i").unwrap();
        assert!(hw < first_input);

        // Input options stay attached to their input
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "3");
        assert_eq!(args[t + 2], "-i");
        assert_eq!(args[t + 3], "outro.mp4");
        assert_eq!(cmd.inputs().len(), 2);
    }

    #[test]
    fn test_output_duration() {
        let args = FfmpegCommand::new("trim.wav").input("voice.wav").duration(39.9).build_args();
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "39.900");
        // -t after the input applies to the output
        assert!(t > args.iter().position(|a| a == "-i").unwrap());
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let runner = FfmpegRunner::new().with_program("definitely-not-ffmpeg-xyz");
        let cmd = FfmpegCommand::new("out.mp4").input("in.mp4");
        let err = runner.run(&cmd).await.unwrap_err();
        assert!(matches!(err, MediaError::FfmpegNotFound));
    }
}
