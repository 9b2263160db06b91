//! Axum request handlers for the codec endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{
    protocol::{
        DecryptRequest, DecryptResponse, EncryptRequest, EncryptResponse, ErrorResponse,
        HealthResponse, MacRequest, MacResponse, VerifyRequest, VerifyResponse,
    },
    ServiceError,
};
use tracing::debug;

use super::state::AppState;

/// `POST /encrypt`: seal a plaintext string into a storable envelope.
pub async fn encrypt(
    State(state): State<AppState>,
    body: Result<Json<EncryptRequest>, JsonRejection>,
) -> Response {
    let req = match parse(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let envelope = state.codec.encrypt(&req.plaintext.unwrap_or_default());
    (StatusCode::OK, Json(EncryptResponse { envelope })).into_response()
}

/// `POST /decrypt`: open a stored envelope. Rejected envelopes yield `""`.
pub async fn decrypt(
    State(state): State<AppState>,
    body: Result<Json<DecryptRequest>, JsonRejection>,
) -> Response {
    let req = match parse(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let plaintext = state.codec.decrypt(&req.envelope.unwrap_or_default());
    (StatusCode::OK, Json(DecryptResponse { plaintext })).into_response()
}

/// `POST /mac`: tag `data` for an immediately following `/verify`.
pub async fn mac(
    State(state): State<AppState>,
    body: Result<Json<MacRequest>, JsonRejection>,
) -> Response {
    let req = match parse(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let tag = state.codec.mac(&req.data);
    (StatusCode::OK, Json(MacResponse { tag })).into_response()
}

/// `POST /verify`: check a tag produced by `/mac` on this process.
pub async fn verify(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Response {
    let req = match parse(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let valid = state.codec.verify(&req.data, &req.tag);
    (StatusCode::OK, Json(VerifyResponse { valid })).into_response()
}

/// `GET /health`: report which key tier is resident.
///
/// Always `200`: a key is always available. `status` is `"degraded"` when the
/// key will not survive a restart.
pub async fn health(State(state): State<AppState>) -> Response {
    let tier = state.codec.tier();
    let body = HealthResponse {
        status: if tier.is_durable() { "ok" } else { "degraded" }.into(),
        key_tier: tier.as_str().into(),
        durable: tier.is_durable(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> Response {
    error_response(&ServiceError::NotFound(
        "the requested resource does not exist".into(),
    ))
}

fn parse<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match body {
        Ok(Json(req)) => Ok(req),
        Err(rejection) => {
            debug!(status = %rejection.status(), "rejected request body");
            Err(error_response(&ServiceError::BadRequest(
                rejection.body_text(),
            )))
        }
    }
}

fn error_response(err: &ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(err))).into_response()
}
