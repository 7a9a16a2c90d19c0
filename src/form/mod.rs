//! Client side of the prediction exchange.
//!
//! [`FormState`] holds what the user sees: the input text, the last label and
//! confidence, and the last error. Submitting is split into
//! [`FormState::begin_submit`] and [`FormState::apply_response`] so a UI can
//! keep several requests in flight; [`FormState::submit`] does both for the
//! simple case.

mod client;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::models::{format_confidence, PredictionResult};

pub use client::{HttpPredictClient, DEFAULT_API_URL};

pub const EMPTY_INPUT_MESSAGE: &str = "Please enter some text for analysis.";
pub const FETCH_ERROR_MESSAGE: &str = "An error occurred while fetching the prediction.";

#[async_trait]
pub trait PredictClient: Send + Sync {
    async fn predict(&self, text: &str) -> Result<PredictionResult, ClientError>;
}

/// How responses to overlapping submissions are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseOrdering {
    /// Every response is applied in arrival order; a slow older request can
    /// overwrite a newer result.
    #[default]
    LastResponseWins,
    /// Responses older than the latest applied one are dropped.
    LatestRequestWins,
}

/// A request the form has committed to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub seq: u64,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct FormState {
    text: String,
    prediction: Option<String>,
    confidence: Option<f64>,
    error: Option<String>,
    ordering: ResponseOrdering,
    next_seq: u64,
    applied_seq: u64,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ordering(ordering: ResponseOrdering) -> Self {
        Self {
            ordering,
            ..Self::default()
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn prediction(&self) -> Option<&str> {
        self.prediction.as_deref()
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Validates the current text. Returns `None` (and sets the error) when it
    /// is blank; otherwise clears the error and hands out a numbered submission.
    pub fn begin_submit(&mut self) -> Option<Submission> {
        if self.text.trim().is_empty() {
            self.error = Some(EMPTY_INPUT_MESSAGE.to_string());
            return None;
        }
        self.error = None;
        self.next_seq += 1;
        Some(Submission {
            seq: self.next_seq,
            text: self.text.clone(),
        })
    }

    /// Applies the outcome of `submission`. Failures keep the previous result.
    pub fn apply_response(
        &mut self,
        submission: &Submission,
        response: Result<PredictionResult, ClientError>,
    ) {
        if self.ordering == ResponseOrdering::LatestRequestWins
            && submission.seq < self.applied_seq
        {
            debug!(
                seq = submission.seq,
                applied = self.applied_seq,
                "dropping stale response"
            );
            return;
        }
        self.applied_seq = self.applied_seq.max(submission.seq);

        match response {
            Ok(result) => {
                debug!(
                    prediction = %result.prediction,
                    confidence = result.confidence,
                    "prediction received"
                );
                self.prediction = Some(result.prediction);
                self.confidence = Some(result.confidence);
            }
            Err(err) => {
                warn!(error = %err, "error fetching prediction");
                self.error = Some(FETCH_ERROR_MESSAGE.to_string());
            }
        }
    }

    pub async fn submit<C>(&mut self, client: &C)
    where
        C: PredictClient + ?Sized,
    {
        let Some(submission) = self.begin_submit() else {
            return;
        };
        let response = client.predict(&submission.text).await;
        self.apply_response(&submission, response);
    }

    /// Result panel: the error line, then the label and percentage.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        if let Some(error) = &self.error {
            lines.push(error.clone());
        }
        if let Some(prediction) = self.prediction.as_deref().filter(|p| !p.is_empty()) {
            lines.push(format!("Prediction: {prediction}"));
            if let Some(confidence) = self.confidence {
                lines.push(format!("Confidence: {}", format_confidence(confidence)));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        calls: Mutex<Vec<String>>,
        reply: Option<PredictionResult>,
    }

    impl RecordingClient {
        fn replying(prediction: &str, confidence: f64) -> Self {
            Self {
                calls: Mutex::default(),
                reply: Some(PredictionResult {
                    prediction: prediction.to_string(),
                    confidence,
                }),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PredictClient for RecordingClient {
        async fn predict(&self, text: &str) -> Result<PredictionResult, ClientError> {
            self.calls.lock().unwrap().push(text.to_string());
            self.reply
                .clone()
                .ok_or(ClientError::Status { status: 400 })
        }
    }

    fn result(prediction: &str, confidence: f64) -> PredictionResult {
        PredictionResult {
            prediction: prediction.to_string(),
            confidence,
        }
    }

    #[tokio::test]
    async fn submit_sends_exactly_one_request_with_the_text() {
        let client = RecordingClient::replying("positive", 0.8734);
        let mut form = FormState::new();
        form.set_text("  what a lovely day ");
        form.submit(&client).await;

        assert_eq!(client.calls(), vec!["  what a lovely day ".to_string()]);
        assert_eq!(form.prediction(), Some("positive"));
        assert_eq!(form.render(), "Prediction: positive\nConfidence: 87.34%");
    }

    #[tokio::test]
    async fn blank_input_never_reaches_the_client() {
        let client = RecordingClient::replying("positive", 0.9);
        let mut form = FormState::new();
        for blank in ["", "   ", "\n\t"] {
            form.set_text(blank);
            form.submit(&client).await;
            assert_eq!(form.error(), Some(EMPTY_INPUT_MESSAGE));
        }
        assert!(client.calls().is_empty());
        assert_eq!(form.prediction(), None);
    }

    #[tokio::test]
    async fn failure_keeps_previous_prediction() {
        let mut form = FormState::new();
        form.set_text("great");
        form.submit(&RecordingClient::replying("positive", 0.75)).await;

        form.set_text("meh");
        form.submit(&RecordingClient::default()).await;

        assert_eq!(form.error(), Some(FETCH_ERROR_MESSAGE));
        assert_eq!(form.prediction(), Some("positive"));
        assert_eq!(form.confidence(), Some(0.75));
        assert_eq!(
            form.render(),
            format!("{FETCH_ERROR_MESSAGE}\nPrediction: positive\nConfidence: 75.00%")
        );
    }

    #[test]
    fn blank_submit_keeps_previous_prediction() {
        let mut form = FormState::new();
        form.set_text("fine");
        let sub = form.begin_submit().unwrap();
        form.apply_response(&sub, Ok(result("positive", 0.6)));

        form.set_text(" ");
        assert!(form.begin_submit().is_none());
        assert_eq!(form.prediction(), Some("positive"));
        assert_eq!(form.confidence(), Some(0.6));
    }

    #[test]
    fn new_submission_clears_previous_error() {
        let mut form = FormState::new();
        assert!(form.begin_submit().is_none());
        assert!(form.error().is_some());
        form.set_text("ok");
        form.begin_submit().unwrap();
        assert_eq!(form.error(), None);
    }

    #[test]
    fn last_response_wins_by_default() {
        let mut form = FormState::new();
        form.set_text("first");
        let first = form.begin_submit().unwrap();
        form.set_text("second");
        let second = form.begin_submit().unwrap();

        form.apply_response(&second, Ok(result("positive", 0.9)));
        form.apply_response(&first, Ok(result("negative", 0.7)));
        assert_eq!(form.prediction(), Some("negative"));
    }

    #[test]
    fn latest_request_wins_drops_stale_responses() {
        let mut form = FormState::with_ordering(ResponseOrdering::LatestRequestWins);
        form.set_text("first");
        let first = form.begin_submit().unwrap();
        form.set_text("second");
        let second = form.begin_submit().unwrap();

        form.apply_response(&second, Ok(result("positive", 0.9)));
        form.apply_response(&first, Err(ClientError::Status { status: 500 }));
        form.apply_response(&first, Ok(result("negative", 0.7)));

        assert_eq!(form.prediction(), Some("positive"));
        assert_eq!(form.error(), None);
    }
}
