//! Job launchers: where a single product render actually runs.
//!
//! `ProcessLauncher` hands each job to a fresh OS process of this binary in
//! `render-job` mode, so a crash or a wedged ffmpeg only takes down that job.
//! The job travels as JSON on the child's stdin and the `RenderResult` comes
//! back as JSON on its stdout. The child leads its own process group and
//! keeps its ffmpeg in it, so a deadline kill takes the whole job down.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use promo_media::{kill_process_group, remove_partial_output, render_product, RenderContext};
use promo_models::{ProductRenderJob, RenderResult};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Subcommand a worker child is started with.
pub const RENDER_JOB_COMMAND: &str = "render-job";

/// Flag carrying the child's whole-job deadline in seconds.
pub const DEADLINE_FLAG: &str = "--deadline-secs";

/// Runs one render job to completion.
#[async_trait]
pub trait JobLauncher: Send + Sync {
    /// Render `job`. Failures are reported in the result, never raised.
    async fn launch(&self, job: ProductRenderJob) -> RenderResult;
}

/// Renders in the current process.
pub struct InProcessLauncher {
    ctx: RenderContext,
}

impl InProcessLauncher {
    pub fn new(ctx: RenderContext) -> Self {
        Self { ctx }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(
            RenderContext::default()
                .with_timeout(config.render_timeout.as_secs())
                .with_deadline(config.render_timeout),
        )
    }
}

#[async_trait]
impl JobLauncher for InProcessLauncher {
    async fn launch(&self, job: ProductRenderJob) -> RenderResult {
        render_product(&job, &self.ctx).await
    }
}

/// Renders each job in a child process.
pub struct ProcessLauncher {
    exe: PathBuf,
    /// When the parent kills the child's process group
    deadline: Duration,
    /// When the child gives up on its own
    job_deadline: Option<Duration>,
}

impl ProcessLauncher {
    pub fn new(exe: impl Into<PathBuf>, deadline: Duration) -> Self {
        Self {
            exe: exe.into(),
            deadline,
            job_deadline: None,
        }
    }

    /// Ask the child to stop its job after `job_deadline`.
    pub fn with_job_deadline(mut self, job_deadline: Duration) -> Self {
        self.job_deadline = Some(job_deadline);
        self
    }

    /// Launcher for the configured worker executable, or this binary.
    pub fn from_config(config: &WorkerConfig) -> WorkerResult<Self> {
        let exe = match &config.worker_exe {
            Some(exe) => exe.clone(),
            None => std::env::current_exe()?,
        };
        Ok(Self::new(exe, config.worker_deadline()).with_job_deadline(config.render_timeout))
    }

    /// Arguments the worker child is started with.
    pub fn child_args(&self) -> Vec<String> {
        let mut args = vec![RENDER_JOB_COMMAND.to_string()];
        if let Some(deadline) = self.job_deadline {
            args.push(DEADLINE_FLAG.to_string());
            args.push(deadline.as_secs().max(1).to_string());
        }
        args
    }

    async fn run_child(&self, job: &ProductRenderJob) -> WorkerResult<RenderResult> {
        let payload = serde_json::to_vec(job)?;

        let mut command = Command::new(&self.exe);
        command
            .args(self.child_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // ffmpeg stays in this group, so killpg reaches it too
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| WorkerError::launch_failed(format!("{}: {}", self.exe.display(), e)))?;
        let pid = child.id();

        debug!(product_id = %job.product_id, pid = ?pid, "Spawned render worker");

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| WorkerError::launch_failed("worker stdin not captured"))?;
        // A child that dies early closes its stdin; its exit status tells the story
        if let Err(e) = stdin.write_all(&payload).await {
            debug!(product_id = %job.product_id, "Could not send job to render worker: {}", e);
        }
        drop(stdin);

        let output = match tokio::time::timeout(self.deadline, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(product_id = %job.product_id, pid = ?pid, "Render worker hit its deadline, killing process group");
                kill_process_group(pid);
                remove_partial_output(&job.output_path()).await;
                return Ok(RenderResult::failure(
                    job.product_id.clone(),
                    format!("render worker timed out after {} seconds", self.deadline.as_secs()),
                    None,
                ));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let diagnostics = (!stderr.trim().is_empty()).then_some(stderr);

        if !output.status.success() {
            return Ok(RenderResult::failure(
                job.product_id.clone(),
                format!("render worker exited with {}", output.status),
                diagnostics,
            ));
        }

        match parse_child_output(&output.stdout) {
            Some(result) if result.product_id == job.product_id => Ok(result),
            Some(result) => Ok(RenderResult::failure(
                job.product_id.clone(),
                format!("render worker answered for product {}", result.product_id),
                diagnostics,
            )),
            None => Ok(RenderResult::failure(
                job.product_id.clone(),
                "render worker produced no result",
                diagnostics,
            )),
        }
    }
}

/// Last non-empty stdout line parsed as a `RenderResult`.
pub(crate) fn parse_child_output(stdout: &[u8]) -> Option<RenderResult> {
    let text = String::from_utf8_lossy(stdout);
    let line = text.lines().rev().find(|l| !l.trim().is_empty())?;
    serde_json::from_str(line).ok()
}

#[async_trait]
impl JobLauncher for ProcessLauncher {
    async fn launch(&self, job: ProductRenderJob) -> RenderResult {
        let started = Instant::now();
        let result = match self.run_child(&job).await {
            Ok(result) => result,
            Err(e) => {
                warn!(product_id = %job.product_id, "Render worker failed: {}", e);
                RenderResult::failure(job.product_id.clone(), e.to_string(), None)
            }
        };

        if result.elapsed_ms == 0 {
            result.with_elapsed_ms(started.elapsed().as_millis() as u64)
        } else {
            result
        }
    }
}
