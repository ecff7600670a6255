//! Optional external converter run on uploaded files before import.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ImportConfig;
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("External processor timed out after {0:?}")]
    TimedOut(Duration),

    #[error("External processor cancelled")]
    Cancelled,

    #[error("External processor exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Unable to run external processor: {0}")]
    Spawn(String),
}

impl From<ExternalError> for ApiError {
    fn from(err: ExternalError) -> Self {
        match err {
            ExternalError::TimedOut(_) => ApiError::TimedOut(err.to_string()),
            ExternalError::Cancelled => ApiError::Cancelled(err.to_string()),
            ExternalError::Failed { .. } => ApiError::Upstream(err.to_string()),
            ExternalError::Spawn(msg) => ApiError::Internal(msg),
        }
    }
}

/// Captured output of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs `command args... <input>` bounded by a timeout and a cancellation
/// token. The child is killed when either fires.
#[derive(Debug, Clone)]
pub struct ExternalProcessor {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalProcessor {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    /// Builds a processor when `import.external_command` is set.
    pub fn from_config(config: &ImportConfig) -> Option<Self> {
        config
            .external_command
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|command| {
                Self::new(
                    command,
                    config.external_args.clone(),
                    Duration::from_secs(config.external_timeout_secs),
                )
            })
    }

    pub async fn run(
        &self,
        input: &Path,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ExternalError> {
        let child = Command::new(&self.command)
            .args(&self.args)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExternalError::Spawn(e.to_string()))?;

        info!(command = %self.command, input = %input.display(), "Started external processor");

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(command = %self.command, "External processor cancelled");
                return Err(ExternalError::Cancelled);
            }
            result = tokio::time::timeout(self.timeout, child.wait_with_output()) => match result {
                Err(_) => {
                    warn!(command = %self.command, timeout = ?self.timeout, "External processor timed out");
                    return Err(ExternalError::TimedOut(self.timeout));
                }
                Ok(result) => result.map_err(|e| ExternalError::Spawn(e.to_string()))?,
            },
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ExternalError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }
        Ok(ProcessOutput { stdout, stderr })
    }
}
