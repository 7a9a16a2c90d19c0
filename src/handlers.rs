use actix_web::{http::header::ContentType, web, HttpRequest, HttpResponse};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::PredictRequest;
use crate::server::AppState;

pub async fn predict(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let span = info_span!("predict", request_id = %Uuid::new_v4());
    relay_prediction(&state, &body).instrument(span).await
}

async fn relay_prediction(state: &AppState, body: &[u8]) -> Result<HttpResponse, ApiError> {
    info!(bytes = body.len(), "received prediction request");

    // Undecodable bodies and non-string `text` are treated like a missing field.
    let text = serde_json::from_slice::<PredictRequest>(body)
        .ok()
        .and_then(|req| req.text)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| {
            warn!("rejected request without text");
            ApiError::MissingText
        })?;

    let relayed = state.predictor.predict_relayed(&text).await.map_err(|err| {
        warn!(error = %err, "prediction failed");
        ApiError::from(err)
    })?;

    info!(
        prediction = %relayed.result.prediction,
        confidence = relayed.result.confidence,
        "relaying prediction"
    );
    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(relayed.body.get().to_owned()))
}

pub async fn method_not_allowed(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    info!(method = %req.method(), path = %req.path(), "method not allowed");
    Err(ApiError::MethodNotAllowed)
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}
