use super::report::parse_report;
use super::{ProbeOutcome, SpeedTestResult};
use crate::settings::Settings;
use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum SpeedtestError {
    #[error("failed to launch {}: {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("speedtest output is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("unreadable speedtest output: {0}")]
    Report(#[from] serde_json::Error),
}

/// The speedtest CLI, run once per plugin execution.
pub struct SpeedtestBinary {
    path: PathBuf,
    args: Vec<String>,
}

impl SpeedtestBinary {
    pub fn new(path: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            path: path.into(),
            args,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.binary.clone(), settings.binary_args.clone())
    }

    pub async fn run(&self) -> SpeedTestResult {
        SpeedTestResult::from(self.invoke().await)
    }

    /// Runs the binary to completion. Every failure is folded into the
    /// returned outcome.
    pub async fn invoke(&self) -> ProbeOutcome {
        tracing::info!("[INTRSPD] Executing native binary: {}", self.path.display());

        match self.execute().await {
            Ok(outcome) => {
                match &outcome {
                    ProbeOutcome::Measured(m) => tracing::info!(
                        "[INTRSPD] Result (down|up): {} Mbps | {} Mbps",
                        m.download_mbps(),
                        m.upload_mbps()
                    ),
                    ProbeOutcome::BinaryFailed { code, stderr } => tracing::info!(
                        exit_code = ?code,
                        "[INTRSPD] Native binary failed: {}",
                        stderr.trim_end()
                    ),
                    ProbeOutcome::Errored(_) => {}
                }
                outcome
            }
            Err(e) => {
                tracing::info!("[INTRSPD] Error: {e}");
                ProbeOutcome::Errored(e.to_string())
            }
        }
    }

    async fn execute(&self) -> Result<ProbeOutcome, SpeedtestError> {
        let output = Command::new(&self.path)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| SpeedtestError::Launch {
                path: self.path.clone(),
                source,
            })?;

        if !output.status.success() {
            return Ok(ProbeOutcome::BinaryFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let stdout = String::from_utf8(output.stdout)?;
        let measurement = parse_report(&stdout)?;
        Ok(ProbeOutcome::Measured(measurement))
    }
}
