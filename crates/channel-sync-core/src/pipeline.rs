use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

pub const DUBBING_ENV: &str = "CHANNEL_SYNC_DUBBING";
pub const IS_RETRY_ENV: &str = "CHANNEL_SYNC_IS_RETRY";
const DEFAULT_FAILED_STEP: &str = "pipeline";

/// One invocation of the downstream per-item pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    /// Queue value, relative to the input root
    pub video_file: String,
    /// Location on disk
    pub input_path: PathBuf,
    pub dubbing: bool,
    pub is_retry: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Success,
    Failed { step: String, message: String },
}

/// The downstream processing pipeline, treated as an opaque step.
///
/// An `Err` means the pipeline could not be run at all; a pipeline that ran
/// and failed reports [`PipelineOutcome::Failed`].
#[async_trait]
pub trait TaskPipeline: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self, request: &PipelineRequest) -> Result<PipelineOutcome>;
}

#[derive(Debug, Deserialize)]
struct FailureReport {
    error_step: Option<String>,
    error_message: Option<String>,
}

/// Runs a configured command once per item: `argv... <input_path>`.
pub struct CommandPipeline {
    argv: Vec<String>,
    working_dir: PathBuf,
}

impl CommandPipeline {
    pub fn new(argv: Vec<String>, working_dir: impl Into<PathBuf>) -> Result<Self> {
        if argv.first().map(|p| p.trim().is_empty()).unwrap_or(true) {
            return Err(anyhow!("pipeline_command must name a program"));
        }
        Ok(Self {
            argv,
            working_dir: working_dir.into(),
        })
    }
}

/// Failure details from the last `{"error_step", "error_message"}` JSON line on stdout,
/// else the last stderr line.
pub fn failure_from_output(stdout: &str, stderr: &str) -> PipelineOutcome {
    let report = stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str::<FailureReport>(line).ok())
        .filter(|r| r.error_step.is_some() || r.error_message.is_some());

    if let Some(report) = report {
        return PipelineOutcome::Failed {
            step: report.error_step.unwrap_or_else(|| DEFAULT_FAILED_STEP.to_string()),
            message: report.error_message.unwrap_or_default(),
        };
    }
    let message = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or("pipeline exited with an error")
        .to_string();
    PipelineOutcome::Failed {
        step: DEFAULT_FAILED_STEP.to_string(),
        message,
    }
}

#[async_trait]
impl TaskPipeline for CommandPipeline {
    fn name(&self) -> &str {
        &self.argv[0]
    }

    async fn run(&self, request: &PipelineRequest) -> Result<PipelineOutcome> {
        let program = &self.argv[0];
        info!(video_file = %request.video_file, program = %program, "Running pipeline");

        let output = Command::new(program)
            .args(&self.argv[1..])
            .arg(&request.input_path)
            .current_dir(&self.working_dir)
            .env(DUBBING_ENV, if request.dubbing { "1" } else { "0" })
            .env(IS_RETRY_ENV, if request.is_retry { "1" } else { "0" })
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("failed to run pipeline command {}", program))?;

        if output.status.success() {
            return Ok(PipelineOutcome::Success);
        }
        debug!(code = ?output.status.code(), "Pipeline command failed");
        Ok(failure_from_output(
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_from_json_line() {
        let stdout = "step 1 ok\n{\"error_step\": \"transcribe\", \"error_message\": \"no audio\"}\n";
        assert_eq!(
            failure_from_output(stdout, "Traceback...\nValueError: x"),
            PipelineOutcome::Failed {
                step: "transcribe".to_string(),
                message: "no audio".to_string()
            }
        );
    }

    #[test]
    fn test_failure_from_stderr() {
        assert_eq!(
            failure_from_output("{not json}\n", "warning\nValueError: bad input\n\n"),
            PipelineOutcome::Failed {
                step: "pipeline".to_string(),
                message: "ValueError: bad input".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_empty_command() {
        assert!(CommandPipeline::new(vec![], ".").is_err());
        assert!(CommandPipeline::new(vec![" ".to_string()], ".").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_pipeline_runs_program() {
        let dir = tempfile::tempdir().unwrap();
        let script = "if [ \"$CHANNEL_SYNC_DUBBING\" = \"0\" ] && [ -n \"$1\" ]; then exit 0; fi; \
                      echo '{\"error_step\":\"env\",\"error_message\":\"unexpected\"}'; exit 1";
        let pipeline = CommandPipeline::new(
            vec!["sh".to_string(), "-c".to_string(), script.to_string(), "pipeline".to_string()],
            dir.path(),
        )
        .unwrap();
        let request = PipelineRequest {
            video_file: "channels/A/a.mp4".to_string(),
            input_path: dir.path().join("a.mp4"),
            dubbing: false,
            is_retry: false,
        };
        assert_eq!(pipeline.run(&request).await.unwrap(), PipelineOutcome::Success);

        let failing = CommandPipeline::new(
            vec!["sh".to_string(), "-c".to_string(), "echo broken >&2; exit 3".to_string()],
            dir.path(),
        )
        .unwrap();
        assert_eq!(
            failing.run(&request).await.unwrap(),
            PipelineOutcome::Failed {
                step: "pipeline".to_string(),
                message: "broken".to_string()
            }
        );
    }
}
