use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credential::{CredentialIssuer, QrPayload};
use crate::models::{EventSummary, TicketSummary};
use crate::redemption::GateVerifier;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// Shared handler state; everything inside is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub issuer: CredentialIssuer,
    pub verifier: GateVerifier,
    pub token_ttl: Duration,
}

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "gatepass-api",
    };

    success(payload, "Health check successful").into_response()
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    /// Override of the default 24h credential lifetime, in seconds.
    pub expires_in_secs: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub payload: QrPayload,
    pub qr_svg: String,
}

pub async fn issue_credential(
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
    body: Option<Json<IssueRequest>>,
) -> Response {
    let window = body
        .and_then(|Json(req)| req.expires_in_secs)
        .map(Duration::seconds)
        .unwrap_or(state.token_ttl);

    match state.issuer.issue(ticket_id, window).await {
        Ok(credential) => success(
            IssueResponse {
                payload: credential.payload,
                qr_svg: credential.qr_svg,
            },
            "Credential issued",
        )
        .into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    /// The decoded QR string, exactly as the scan client read it.
    pub qr: String,
    pub scanner_id: Uuid,
}

/// Always HTTP 200: the scan client shows pass or fail from the body, and
/// a rejection is a normal outcome, not a transport error.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<TicketSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventSummary>,
}

pub async fn scan(State(state): State<AppState>, Json(req): Json<ScanRequest>) -> Response {
    match state.verifier.verify_and_redeem(&req.qr, req.scanner_id).await {
        Ok(admission) => Json(ScanResponse {
            success: true,
            message: "Ticket admitted".to_string(),
            code: None,
            ticket: Some(admission.ticket),
            event: admission.event,
        })
        .into_response(),
        Err(rejection) => Json(ScanResponse {
            success: false,
            message: rejection.to_string(),
            code: Some(rejection.code()),
            ticket: None,
            event: None,
        })
        .into_response(),
    }
}

#[derive(Serialize)]
struct PurgeResponse {
    purged: u64,
}

pub async fn purge_expired(State(state): State<AppState>) -> Response {
    match state.verifier.purge_expired().await {
        Ok(purged) => {
            success(PurgeResponse { purged }, "Expired tokens purged").into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}
