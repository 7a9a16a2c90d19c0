use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

/// Main configuration loaded from sentiment.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub predictor: PredictorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Mirrors a permissive CORS policy; disable when served behind the same origin.
    pub allow_any_origin: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            allow_any_origin: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorBackend {
    Process,
    NaiveBayes,
}

impl std::str::FromStr for PredictorBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "process" => Ok(Self::Process),
            "naive_bayes" | "naive-bayes" => Ok(Self::NaiveBayes),
            other => anyhow::bail!("unknown predictor backend {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub backend: PredictorBackend,
    pub program: String,
    /// Leading arguments; the input text is appended after them.
    pub args: Vec<String>,
    /// 0 disables the limit.
    pub timeout_ms: u64,
    /// Treat a non-zero exit as a failure even when stdout parsed.
    pub strict_exit_status: bool,
    pub model_path: Option<PathBuf>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            backend: PredictorBackend::Process,
            program: "python".to_string(),
            args: vec!["python-scripts/predict.py".to_string()],
            timeout_ms: 30_000,
            strict_exit_status: false,
            model_path: None,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        // SENTIMENT_ENV_FILE if set, otherwise ./.env when present
        match std::env::var("SENTIMENT_ENV_FILE") {
            Ok(env_path) => {
                let _ = dotenvy::from_path(env_path);
            }
            Err(_) => {
                let _ = dotenvy::dotenv();
            }
        }

        let config_path =
            std::env::var("SENTIMENT_CONFIG").unwrap_or_else(|_| "sentiment.toml".to_string());

        let mut config = Self::from_file(Path::new(&config_path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML config; only a missing file falls back to defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .with_context(|| format!("parsing config file {}", path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => {
                Err(err).with_context(|| format!("reading config file {}", path.display()))
            }
        }
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Applies `SENTIMENT_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("SENTIMENT_BIND") {
            self.server.bind = bind;
        }
        if let Some(v) = lookup("SENTIMENT_ALLOW_ANY_ORIGIN") {
            self.server.allow_any_origin = parse_flag(&v);
        }
        if let Some(backend) = lookup("SENTIMENT_PREDICTOR_BACKEND") {
            self.predictor.backend = backend.parse()?;
        }
        if let Some(program) = lookup("SENTIMENT_PREDICTOR_PROGRAM") {
            self.predictor.program = program;
        }
        if let Some(script) = lookup("SENTIMENT_PREDICTOR_SCRIPT") {
            self.predictor.args = vec![script];
        }
        if let Some(ms) = lookup("SENTIMENT_PREDICTOR_TIMEOUT_MS") {
            self.predictor.timeout_ms = ms
                .trim()
                .parse()
                .with_context(|| format!("SENTIMENT_PREDICTOR_TIMEOUT_MS={ms:?} is not a number"))?;
        }
        if let Some(v) = lookup("SENTIMENT_STRICT_EXIT_STATUS") {
            self.predictor.strict_exit_status = parse_flag(&v);
        }
        if let Some(path) = lookup("SENTIMENT_MODEL_PATH") {
            self.predictor.model_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.server.bind.trim().is_empty(), "server.bind must not be empty");
        match self.predictor.backend {
            PredictorBackend::Process => ensure!(
                !self.predictor.program.trim().is_empty(),
                "predictor.program must not be empty for the process backend"
            ),
            PredictorBackend::NaiveBayes => ensure!(
                self.predictor.model_path.is_some(),
                "predictor.model_path is required for the naive_bayes backend"
            ),
        }
        Ok(())
    }
}

fn parse_flag(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}
