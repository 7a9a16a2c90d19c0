//! Prediction backends.
//!
//! The forwarding handler only sees [`Predictor`]; whether the judgment comes
//! from a child process or an in-process model is a deployment choice made in
//! [`build_predictor`].

mod naive_bayes;
mod process;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{PredictorBackend, PredictorConfig};
use crate::error::PredictError;
use crate::models::{PredictionResult, RelayedPrediction};

pub use naive_bayes::{NaiveBayesModel, NaiveBayesPredictor};
pub use process::{parse_prediction, parse_relayed, ProcessPredictor, MAX_TEXT_BYTES};

#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, text: &str) -> Result<PredictionResult, PredictError>;

    /// Result plus the JSON to relay. Predictors that read JSON from elsewhere
    /// override this to hand back the source text untouched.
    async fn predict_relayed(&self, text: &str) -> Result<RelayedPrediction, PredictError> {
        let result = self.predict(text).await?;
        RelayedPrediction::from_result(result).map_err(|err| PredictError::Model {
            message: err.to_string(),
        })
    }
}

pub fn build_predictor(config: &PredictorConfig) -> anyhow::Result<Arc<dyn Predictor>> {
    match config.backend {
        PredictorBackend::Process => Ok(Arc::new(ProcessPredictor::from_config(config))),
        PredictorBackend::NaiveBayes => {
            let path = config
                .model_path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("naive_bayes backend requires model_path"))?;
            let model = NaiveBayesModel::load(path)?;
            tracing::info!(
                path = %path.display(),
                classes = model.classes().len(),
                vocabulary = model.vocabulary_len(),
                "loaded naive bayes model"
            );
            Ok(Arc::new(NaiveBayesPredictor::new(model)))
        }
    }
}
