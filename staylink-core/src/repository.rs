use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Local inventory (read-only; writes belong to booking persistence)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct HotelRecord {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub city: String,
    pub country: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
    pub star_rating: f32,
    pub review_score: Option<f32>,
    pub review_count: u32,
    pub currency: String,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomTypeRecord {
    pub id: String,
    pub hotel_id: String,
    pub name: String,
    pub description: Option<String>,
    pub max_adults: u32,
    pub max_children: u32,
    pub max_occupancy: u32,
    pub size_sqm: Option<f32>,
    pub view: Option<String>,
}

/// A stored rate. Prices are per room per night except `fees` (per room per stay).
#[derive(Debug, Clone, PartialEq)]
pub struct RatePlanRecord {
    pub id: String,
    pub room_type_id: String,
    pub hotel_id: String,
    pub name: String,
    pub board_type: String,
    pub rate_type: String,
    pub payment_type: String,
    pub is_refundable: bool,
    pub currency: String,
    pub base_rate: Decimal,
    pub taxes: Decimal,
    pub fees: Decimal,
    pub available_rooms: u32,
    pub cancellation_policy_name: Option<String>,
    pub cancellation_policy_description: Option<String>,
    /// Free cancellation ends this many hours before check-in.
    pub free_cancellation_hours: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddOnRecord {
    pub id: String,
    pub hotel_id: String,
    /// Set when the add-on belongs to a single rate plan.
    pub rate_plan_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub pricing: String,
    pub included: bool,
}

/// Repository trait for the local hotel inventory
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn list_active_hotels(
        &self,
    ) -> Result<Vec<HotelRecord>, Box<dyn std::error::Error + Send + Sync>>;

    /// Lookup by id or slug.
    async fn find_hotel(
        &self,
        id_or_slug: &str,
    ) -> Result<Option<HotelRecord>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_room_types(
        &self,
        hotel_id: &str,
    ) -> Result<Vec<RoomTypeRecord>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_rate_plans(
        &self,
        hotel_ids: &[String],
    ) -> Result<Vec<RatePlanRecord>, Box<dyn std::error::Error + Send + Sync>>;

    async fn find_rate_plan(
        &self,
        id: &str,
    ) -> Result<Option<RatePlanRecord>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_add_ons(
        &self,
        hotel_id: &str,
    ) -> Result<Vec<AddOnRecord>, Box<dyn std::error::Error + Send + Sync>>;
}

// ============================================================================
// Bookings (owned by the persistence collaborator)
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    Failed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Failed => "FAILED",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "COMPLETED" => Some(BookingStatus::Completed),
            "FAILED" => Some(BookingStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingRecord {
    pub id: Uuid,
    pub reference: String,
    pub status: BookingStatus,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub is_free_cancellation: bool,
    pub total_amount: Decimal,
    pub currency: String,
    /// Payment processor's charge id, needed to request a refund.
    pub payment_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub booking_id: Uuid,
    pub action: String,
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Repository trait for booking state used by cancellation
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn get_booking(
        &self,
        id: Uuid,
    ) -> Result<Option<BookingRecord>, Box<dyn std::error::Error + Send + Sync>>;

    /// Moves a booking from `from` to `to` only while it is still in `from`.
    /// Returns `false` when the booking is missing or another writer got there first.
    async fn transition_booking_status(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    async fn record_activity(
        &self,
        entry: &ActivityEntry,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
