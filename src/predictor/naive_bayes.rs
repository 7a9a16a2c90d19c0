use std::collections::HashMap;
use std::path::Path;

use anyhow::{ensure, Context};
use async_trait::async_trait;
use ndarray::{Array1, Array2};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::Predictor;
use crate::error::PredictError;
use crate::models::PredictionResult;

// Same default token pattern as scikit-learn's CountVectorizer.
static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// Multinomial naive Bayes exported from a fitted count-vectorizer pipeline.
///
/// Expected JSON layout:
/// `{ "classes": [..], "vocabulary": {"term": index}, "class_log_prior": [..],
///    "feature_log_prob": [[..], ..] }`
#[derive(Debug, Clone)]
pub struct NaiveBayesModel {
    classes: Vec<String>,
    vocabulary: HashMap<String, usize>,
    class_log_prior: Array1<f64>,
    feature_log_prob: Array2<f64>,
}

#[derive(Deserialize)]
struct ModelFile {
    classes: Vec<String>,
    vocabulary: HashMap<String, usize>,
    class_log_prior: Vec<f64>,
    feature_log_prob: Vec<Vec<f64>>,
}

impl NaiveBayesModel {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading model file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("loading model file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let file: ModelFile = serde_json::from_str(raw)?;
        let n_classes = file.classes.len();
        let n_features = file.vocabulary.len();

        ensure!(n_classes > 0, "model has no classes");
        ensure!(
            file.class_log_prior.len() == n_classes,
            "class_log_prior has {} entries, expected {}",
            file.class_log_prior.len(),
            n_classes
        );
        ensure!(
            file.feature_log_prob.len() == n_classes,
            "feature_log_prob has {} rows, expected {}",
            file.feature_log_prob.len(),
            n_classes
        );
        for (row, probs) in file.feature_log_prob.iter().enumerate() {
            ensure!(
                probs.len() == n_features,
                "feature_log_prob row {} has {} columns, expected {}",
                row,
                probs.len(),
                n_features
            );
        }
        if let Some((term, &idx)) = file.vocabulary.iter().find(|(_, &idx)| idx >= n_features) {
            anyhow::bail!("vocabulary term {term:?} has index {idx} outside 0..{n_features}");
        }

        let flat: Vec<f64> = file.feature_log_prob.into_iter().flatten().collect();
        let feature_log_prob = Array2::from_shape_vec((n_classes, n_features), flat)?;

        Ok(Self {
            classes: file.classes,
            vocabulary: file.vocabulary,
            class_log_prior: Array1::from(file.class_log_prior),
            feature_log_prob,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    fn counts(&self, text: &str) -> Array1<f64> {
        let mut counts = Array1::<f64>::zeros(self.vocabulary.len());
        let lowered = text.to_lowercase();
        for token in TOKEN_PATTERN.find_iter(&lowered) {
            if let Some(&idx) = self.vocabulary.get(token.as_str()) {
                counts[idx] += 1.0;
            }
        }
        counts
    }

    /// Returns the winning class and its posterior probability.
    pub fn classify(&self, text: &str) -> (usize, f64) {
        let counts = self.counts(text);
        let joint = self.feature_log_prob.dot(&counts) + &self.class_log_prior;

        let max = joint.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        let log_norm = max + joint.mapv(|v| (v - max).exp()).sum().ln();

        let (best, best_log) = joint
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| {
                if v > bv {
                    (i, v)
                } else {
                    (bi, bv)
                }
            });
        (best, (best_log - log_norm).exp())
    }
}

/// In-process stand-in for the external predict script.
pub struct NaiveBayesPredictor {
    model: NaiveBayesModel,
}

impl NaiveBayesPredictor {
    pub fn new(model: NaiveBayesModel) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Predictor for NaiveBayesPredictor {
    async fn predict(&self, text: &str) -> Result<PredictionResult, PredictError> {
        let (class, confidence) = self.model.classify(text);
        let prediction = self
            .model
            .classes
            .get(class)
            .cloned()
            .ok_or_else(|| PredictError::Model {
                message: format!("class index {class} out of range"),
            })?;
        if !confidence.is_finite() {
            return Err(PredictError::Model {
                message: "posterior is not finite".to_string(),
            });
        }
        Ok(PredictionResult {
            prediction,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"{
        "classes": ["Negative", "Positive"],
        "vocabulary": {"awful": 0, "great": 1, "movie": 2},
        "class_log_prior": [-0.6931471805599453, -0.6931471805599453],
        "feature_log_prob": [
            [-0.5108256237659907, -2.3025850929940455, -1.2039728043259361],
            [-2.3025850929940455, -0.5108256237659907, -1.2039728043259361]
        ]
    }"#;

    fn predictor() -> NaiveBayesPredictor {
        NaiveBayesPredictor::new(NaiveBayesModel::from_json(MODEL).unwrap())
    }

    #[tokio::test]
    async fn picks_class_with_highest_posterior() {
        let p = predictor();
        let result = p.predict("What a GREAT movie!").await.unwrap();
        assert_eq!(result.prediction, "Positive");
        // exp(-0.51) / (exp(-0.51) + exp(-2.30)) with equal priors and shared "movie" term
        assert!((result.confidence - 0.8571428571428571).abs() < 1e-9);

        let result = p.predict("awful").await.unwrap();
        assert_eq!(result.prediction, "Negative");
    }

    #[tokio::test]
    async fn unknown_terms_fall_back_to_priors() {
        let result = predictor().predict("zzz q").await.unwrap();
        assert!((result.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn tokenizes_like_count_vectorizer() {
        let model = NaiveBayesModel::from_json(MODEL).unwrap();
        // single characters are dropped, case is folded, punctuation splits tokens
        let counts = model.counts("A GREAT, great movie-awful x");
        assert_eq!(counts.to_vec(), vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let bad = r#"{
            "classes": ["Negative", "Positive"],
            "vocabulary": {"great": 0},
            "class_log_prior": [-0.69],
            "feature_log_prob": [[-0.5], [-0.5]]
        }"#;
        assert!(NaiveBayesModel::from_json(bad).is_err());

        let bad_index = r#"{
            "classes": ["Negative"],
            "vocabulary": {"great": 3},
            "class_log_prior": [0.0],
            "feature_log_prob": [[-0.5]]
        }"#;
        assert!(NaiveBayesModel::from_json(bad_index).is_err());
    }
}
