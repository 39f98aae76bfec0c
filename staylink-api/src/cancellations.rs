use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{get, post},
    Json,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use staylink_booking::{CancellationEligibility, CancellationOutcome};
use uuid::Uuid;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/{id}/cancellation", get(cancellation_eligibility))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

/// GET /v1/bookings/{id}/cancellation
async fn cancellation_eligibility(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancellationEligibility>, AppError> {
    let eligibility = state.cancellations.eligibility(id, Utc::now()).await?;
    Ok(Json(eligibility))
}

/// POST /v1/bookings/{id}/cancel
/// Body is optional: `{ "reason": "..." }`
async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<CancellationOutcome>, AppError> {
    let req: CancelRequest = if body.is_empty() {
        CancelRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::ValidationError(format!("Invalid cancel request: {}", e)))?
    };

    let outcome = state.cancellations.cancel(id, req.reason, Utc::now()).await?;
    Ok(Json(outcome))
}
