use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json,
    Router,
};
use staylink_booking::{BookingSelection, PrebookOutcome, PrebookRequest, PrebookResponse, SelectionRequest};
use tracing::info;
use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/selections", post(create_selection))
        .route("/v1/prebook", post(prebook))
}

/// POST /v1/selections
/// Price a room, rate and add-ons picked on the hotel page
async fn create_selection(
    State(state): State<AppState>,
    payload: Result<Json<SelectionRequest>, JsonRejection>,
) -> Result<Json<BookingSelection>, AppError> {
    let Json(req) = payload?;
    let selection = state.selections.assemble(&req).await?;
    Ok(Json(selection))
}

/// POST /v1/prebook
/// Re-confirm the quoted price with the supplier before payment
async fn prebook(
    State(state): State<AppState>,
    payload: Result<Json<PrebookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PrebookResponse>), AppError> {
    let Json(req) = payload?;
    let outcome = state.prebook.validate(&req).await?;

    let status = match &outcome {
        PrebookOutcome::Confirmed { .. } | PrebookOutcome::PriceDrift { .. } => StatusCode::OK,
        PrebookOutcome::Unavailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PrebookOutcome::SupplierFailure { .. } => StatusCode::BAD_GATEWAY,
    };

    info!(
        supplier = %req.supplier_code,
        hotel_id = %req.hotel_id,
        status = status.as_u16(),
        "Prebook evaluated"
    );

    Ok((status, Json(PrebookResponse::from(&outcome))))
}
