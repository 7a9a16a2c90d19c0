use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::value::RawValue;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::Predictor;
use crate::config::PredictorConfig;
use crate::error::PredictError;
use crate::models::{PredictionResult, RelayedPrediction};

const STDERR_SNIPPET_LEN: usize = 500;

/// Longest text accepted as a single argument; Linux caps one argv string at
/// 128 KiB including its terminating NUL.
pub const MAX_TEXT_BYTES: usize = 128 * 1024 - 1;

/// Runs an external program once per prediction, passing the text as its last
/// argument and reading a JSON `PredictionResult` from its stdout.
#[derive(Debug, Clone)]
pub struct ProcessPredictor {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
    strict_exit_status: bool,
}

/// Shape the bundled predict script prints when it fails internally.
#[derive(Deserialize)]
struct FailureEnvelope {
    error: String,
}

impl ProcessPredictor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
            strict_exit_status: false,
        }
    }

    pub fn from_config(config: &PredictorConfig) -> Self {
        let predictor = Self::new(config.program.clone())
            .with_args(config.args.clone())
            .with_strict_exit_status(config.strict_exit_status);
        match config.timeout_ms {
            0 => predictor,
            ms => predictor.with_timeout(Duration::from_millis(ms)),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_strict_exit_status(mut self, strict: bool) -> Self {
        self.strict_exit_status = strict;
        self
    }

    fn command(&self, text: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        // Dropping the request future must not leave the child running.
        cmd.kill_on_drop(true)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

#[async_trait]
impl Predictor for ProcessPredictor {
    async fn predict(&self, text: &str) -> Result<PredictionResult, PredictError> {
        Ok(self.predict_relayed(text).await?.result)
    }

    async fn predict_relayed(&self, text: &str) -> Result<RelayedPrediction, PredictError> {
        if text.len() > MAX_TEXT_BYTES {
            warn!(len = text.len(), "text too long to pass as an argument");
            return Err(PredictError::InputTooLong {
                len: text.len(),
                max: MAX_TEXT_BYTES,
            });
        }

        let child = self
            .command(text)
            .spawn()
            .map_err(|source| PredictError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        info!(program = %self.program, pid = child.id(), "spawned predictor process");

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    warn!(timeout_ms = limit.as_millis() as u64, "predictor timed out, killing it");
                    PredictError::Timeout {
                        timeout_ms: limit.as_millis() as u64,
                    }
                })??,
            None => child.wait_with_output().await?,
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!(stderr = %truncate_snippet(stderr.trim(), STDERR_SNIPPET_LEN), "predictor stderr");
        }
        info!(code = ?output.status.code(), "predictor process exited");

        if self.strict_exit_status && !output.status.success() {
            return Err(PredictError::ExitStatus {
                code: output.status.code(),
                stderr: truncate_snippet(stderr.trim(), STDERR_SNIPPET_LEN).to_string(),
            });
        }

        debug!(stdout = %String::from_utf8_lossy(&output.stdout), "predictor stdout");
        parse_relayed(&output.stdout)
    }
}

/// Parses a predictor's complete stdout as a `PredictionResult`.
pub fn parse_prediction(stdout: &[u8]) -> Result<PredictionResult, PredictError> {
    parse_relayed(stdout).map(|relayed| relayed.result)
}

/// Validates stdout and keeps its JSON text, minus surrounding whitespace,
/// for relaying byte for byte.
pub fn parse_relayed(stdout: &[u8]) -> Result<RelayedPrediction, PredictError> {
    let body: Box<RawValue> =
        serde_json::from_slice(stdout).map_err(|err| parse_failure(err, stdout))?;
    let result: PredictionResult =
        serde_json::from_str(body.get()).map_err(|err| parse_failure(err, stdout))?;

    if !result.confidence.is_finite() || !(0.0..=1.0).contains(&result.confidence) {
        warn!(confidence = result.confidence, "predictor confidence out of range");
        return Err(PredictError::Parse {
            detail: format!("confidence {} is outside [0, 1]", result.confidence),
        });
    }
    Ok(RelayedPrediction { result, body })
}

fn parse_failure(err: serde_json::Error, stdout: &[u8]) -> PredictError {
    let detail = match serde_json::from_slice::<FailureEnvelope>(stdout) {
        Ok(envelope) => format!("predictor reported an error: {}", envelope.error),
        Err(_) => err.to_string(),
    };
    warn!(%detail, "failed to parse predictor output");
    PredictError::Parse { detail }
}

fn truncate_snippet(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
