use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json,
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use staylink_core::{HotelDetails, HotelSummary, RatePlan, StayQuery, SupplierCode, SupplierSearchParams};
use tracing::info;
use crate::{error::AppError, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelSearchRequest {
    /// Absent: search every configured supplier.
    #[serde(default)]
    pub supplier: Option<SupplierCode>,
    #[serde(flatten)]
    pub params: SupplierSearchParams,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelSearchResponse {
    pub hotels: Vec<HotelSummary>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct HotelQuery {
    pub supplier: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub adults: Option<u32>,
    pub children: Option<u32>,
    pub rooms: Option<u32>,
}

impl HotelQuery {
    /// Stay to price the rooms for; `None` when no dates were given.
    fn stay(&self) -> Result<Option<StayQuery>, AppError> {
        let (check_in, check_out) = match (self.check_in, self.check_out) {
            (None, None) => return Ok(None),
            (Some(check_in), Some(check_out)) => (check_in, check_out),
            _ => {
                return Err(AppError::ValidationError(
                    "check_in and check_out must be given together".to_string(),
                ))
            }
        };
        let stay = StayQuery {
            check_in,
            check_out,
            adults: self.adults.unwrap_or(2),
            children: self.children.unwrap_or(0),
            rooms: self.rooms.unwrap_or(1),
        };
        stay.validate()?;
        Ok(Some(stay))
    }
}

#[derive(Debug, Deserialize)]
pub struct SupplierQuery {
    pub supplier: Option<String>,
}

pub fn parse_supplier(raw: Option<&str>) -> Result<Option<SupplierCode>, AppError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<SupplierCode>())
        .transpose()
        .map_err(AppError::from)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/hotels/search", post(search_hotels))
        .route("/v1/hotels/{id}", get(get_hotel))
        .route("/v1/rate-plans/{id}", get(get_rate_plan))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/hotels/search
/// One supplier when named, otherwise every configured supplier merged
async fn search_hotels(
    State(state): State<AppState>,
    payload: Result<Json<HotelSearchRequest>, JsonRejection>,
) -> Result<Json<HotelSearchResponse>, AppError> {
    let Json(req) = payload?;
    req.params.validate()?;

    let hotels = match req.supplier {
        Some(code) => state.registry.get_adapter(Some(code)).search(&req.params).await,
        None => state.registry.multi_supplier_search(&req.params).await,
    };

    info!(
        destination = %req.params.destination,
        supplier = ?req.supplier,
        results = hotels.len(),
        "Hotel search completed"
    );

    Ok(Json(HotelSearchResponse {
        count: hotels.len(),
        hotels,
    }))
}

/// GET /v1/hotels/{id}
async fn get_hotel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HotelQuery>,
) -> Result<Json<HotelDetails>, AppError> {
    let supplier = parse_supplier(query.supplier.as_deref())?;
    let stay = query.stay()?;

    state
        .registry
        .get_adapter(supplier)
        .get_hotel_details(&id, stay.as_ref())
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError(format!("Hotel {} not found", id)))
}

/// GET /v1/rate-plans/{id}
async fn get_rate_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SupplierQuery>,
) -> Result<Json<RatePlan>, AppError> {
    let supplier = parse_supplier(query.supplier.as_deref())?;

    state
        .registry
        .get_adapter(supplier)
        .get_rate_plan(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError(format!("Rate plan {} not found", id)))
}
