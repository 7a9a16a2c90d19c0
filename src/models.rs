use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Sentiment judgment produced by a predictor.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionResult {
    pub prediction: String,
    pub confidence: f64,
}

/// A validated result together with the exact JSON text sent to the caller.
#[derive(Debug, Clone)]
pub struct RelayedPrediction {
    pub result: PredictionResult,
    pub body: Box<RawValue>,
}

impl RelayedPrediction {
    /// Serializes `result` for predictors that have no JSON of their own.
    pub fn from_result(result: PredictionResult) -> serde_json::Result<Self> {
        let body = serde_json::value::to_raw_value(&result)?;
        Ok(Self { result, body })
    }
}

impl PredictionResult {
    /// Confidence as a percentage with two decimals, e.g. `87.34%`.
    pub fn confidence_percent(&self) -> String {
        format_confidence(self.confidence)
    }
}

pub fn format_confidence(confidence: f64) -> String {
    format!("{:.2}%", confidence * 100.0)
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PredictRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }

    pub fn with_detail(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: Some(detail.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_renders_with_two_decimals() {
        let result = PredictionResult {
            prediction: "positive".to_string(),
            confidence: 0.8734,
        };
        assert_eq!(result.confidence_percent(), "87.34%");
        assert_eq!(format_confidence(1.0), "100.00%");
        assert_eq!(format_confidence(0.0), "0.00%");
    }

    #[test]
    fn relayed_result_serializes_when_no_source_json() {
        let relayed = RelayedPrediction::from_result(PredictionResult {
            prediction: "Negative".to_string(),
            confidence: 0.25,
        })
        .unwrap();
        assert_eq!(
            relayed.body.get(),
            r#"{"prediction":"Negative","confidence":0.25}"#
        );
    }

    #[test]
    fn error_body_omits_missing_detail() {
        let body = serde_json::to_value(ErrorBody::new("Method not allowed")).unwrap();
        assert_eq!(body, serde_json::json!({ "message": "Method not allowed" }));

        let body =
            serde_json::to_value(ErrorBody::with_detail("Error parsing prediction", "eof"))
                .unwrap();
        assert_eq!(body["error"], "eof");
    }

    #[test]
    fn request_text_is_optional() {
        let req: PredictRequest = serde_json::from_str("{}").unwrap();
        assert!(req.text.is_none());
        assert!(serde_json::from_str::<PredictRequest>(r#"{"text": 5}"#).is_err());
    }
}
