//! Error types for the forwarding handler and its predictors

use actix_web::{
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use thiserror::Error;

use crate::models::ErrorBody;

pub const MISSING_TEXT_MESSAGE: &str = "Text input is required";
pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method not allowed";
pub const PARSE_ERROR_MESSAGE: &str = "Error parsing prediction";
pub const RUN_ERROR_MESSAGE: &str = "Error running prediction";
pub const TIMEOUT_MESSAGE: &str = "Prediction timed out";
pub const TEXT_TOO_LONG_MESSAGE: &str = "Text input is too long";

/// Failure of a single `Predictor::predict` call.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to collect predictor output: {0}")]
    Io(#[from] std::io::Error),

    #[error("predictor output is not a prediction result: {detail}")]
    Parse { detail: String },

    #[error("predictor exited with status {code:?}: {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("predictor timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("text is {len} bytes, the predictor accepts at most {max}")]
    InputTooLong { len: usize, max: usize },

    #[error("model error: {message}")]
    Model { message: String },
}

/// Caller-visible failure of `POST /api/predict`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", MISSING_TEXT_MESSAGE)]
    MissingText,

    #[error("{}", METHOD_NOT_ALLOWED_MESSAGE)]
    MethodNotAllowed,

    #[error(transparent)]
    Prediction(#[from] PredictError),
}

impl ApiError {
    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::MissingText => ErrorBody::new(MISSING_TEXT_MESSAGE),
            ApiError::MethodNotAllowed => ErrorBody::new(METHOD_NOT_ALLOWED_MESSAGE),
            ApiError::Prediction(err @ PredictError::Parse { .. }) => {
                ErrorBody::with_detail(PARSE_ERROR_MESSAGE, err.to_string())
            }
            ApiError::Prediction(err @ PredictError::Timeout { .. }) => {
                ErrorBody::with_detail(TIMEOUT_MESSAGE, err.to_string())
            }
            ApiError::Prediction(err @ PredictError::InputTooLong { .. }) => {
                ErrorBody::with_detail(TEXT_TOO_LONG_MESSAGE, err.to_string())
            }
            ApiError::Prediction(err) => ErrorBody::with_detail(RUN_ERROR_MESSAGE, err.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingText => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Prediction(PredictError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Prediction(PredictError::InputTooLong { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        if let ApiError::MethodNotAllowed = self {
            response.insert_header((header::ALLOW, "POST"));
        }
        response.json(self.body())
    }
}

/// Failure of the client form's outbound request.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with status {status}")]
    Status { status: u16 },

    #[error("malformed response body: {0}")]
    Decode(String),
}
