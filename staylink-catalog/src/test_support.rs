//! Fixtures shared with downstream crates' tests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use staylink_core::repository::{AddOnRecord, HotelRecord, InventoryRepository, RatePlanRecord, RoomTypeRecord};
use staylink_core::{
    CoreResult, HotelDetails, HotelSummary, Location, RateCheck, RateConfirmation, RatePlan, StayQuery,
    SupplierAdapter, SupplierCode, SupplierSearchParams,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type RepoResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Inventory tables held in memory. `fail` makes every call error.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventory {
    pub hotels: Vec<HotelRecord>,
    pub room_types: Vec<RoomTypeRecord>,
    pub rate_plans: Vec<RatePlanRecord>,
    pub add_ons: Vec<AddOnRecord>,
    pub fail: bool,
}

impl InMemoryInventory {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn check(&self) -> RepoResult<()> {
        if self.fail {
            return Err("connection refused".into());
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryRepository for InMemoryInventory {
    async fn list_active_hotels(&self) -> RepoResult<Vec<HotelRecord>> {
        self.check()?;
        Ok(self.hotels.clone())
    }

    async fn find_hotel(&self, id_or_slug: &str) -> RepoResult<Option<HotelRecord>> {
        self.check()?;
        Ok(self
            .hotels
            .iter()
            .find(|h| h.id == id_or_slug || h.slug == id_or_slug)
            .cloned())
    }

    async fn list_room_types(&self, hotel_id: &str) -> RepoResult<Vec<RoomTypeRecord>> {
        self.check()?;
        Ok(self.room_types.iter().filter(|r| r.hotel_id == hotel_id).cloned().collect())
    }

    async fn list_rate_plans(&self, hotel_ids: &[String]) -> RepoResult<Vec<RatePlanRecord>> {
        self.check()?;
        Ok(self
            .rate_plans
            .iter()
            .filter(|p| hotel_ids.contains(&p.hotel_id))
            .cloned()
            .collect())
    }

    async fn find_rate_plan(&self, id: &str) -> RepoResult<Option<RatePlanRecord>> {
        self.check()?;
        Ok(self.rate_plans.iter().find(|p| p.id == id).cloned())
    }

    async fn list_add_ons(&self, hotel_id: &str) -> RepoResult<Vec<AddOnRecord>> {
        self.check()?;
        Ok(self.add_ons.iter().filter(|a| a.hotel_id == hotel_id).cloned().collect())
    }
}

fn hotel(id: &str, slug: &str, name: &str, city: &str, stars: f32) -> HotelRecord {
    HotelRecord {
        id: id.to_string(),
        slug: slug.to_string(),
        name: name.to_string(),
        city: city.to_string(),
        country: Some("Portugal".to_string()),
        address: None,
        latitude: None,
        longitude: None,
        description: Some(format!("{} in {}", name, city)),
        star_rating: stars,
        review_score: Some(8.5),
        review_count: 120,
        currency: "EUR".to_string(),
        amenities: vec!["wifi".to_string()],
        images: vec![format!("https://img.staylink.test/{}.jpg", slug)],
    }
}

fn room(id: &str, hotel_id: &str, adults: u32, children: u32, occupancy: u32) -> RoomTypeRecord {
    RoomTypeRecord {
        id: id.to_string(),
        hotel_id: hotel_id.to_string(),
        name: id.replace('-', " "),
        description: None,
        max_adults: adults,
        max_children: children,
        max_occupancy: occupancy,
        size_sqm: Some(24.0),
        view: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn plan(
    id: &str,
    room_type_id: &str,
    hotel_id: &str,
    base: i64,
    taxes: i64,
    fees: i64,
    available: u32,
    free_cancellation_hours: Option<i64>,
) -> RatePlanRecord {
    let refundable = free_cancellation_hours.is_some();
    RatePlanRecord {
        id: id.to_string(),
        room_type_id: room_type_id.to_string(),
        hotel_id: hotel_id.to_string(),
        name: if refundable { "Flexible" } else { "Saver" }.to_string(),
        board_type: "BED_AND_BREAKFAST".to_string(),
        rate_type: if refundable { "FLEXIBLE" } else { "NON_REFUNDABLE" }.to_string(),
        payment_type: "PREPAID".to_string(),
        is_refundable: refundable,
        currency: "EUR".to_string(),
        base_rate: Decimal::from(base),
        taxes: Decimal::from(taxes),
        fees: Decimal::from(fees),
        available_rooms: available,
        cancellation_policy_name: free_cancellation_hours.map(|_| "Free cancellation".to_string()),
        cancellation_policy_description: None,
        free_cancellation_hours,
    }
}

fn add_on(id: &str, rate_plan_id: Option<&str>, price: i64, pricing: &str) -> AddOnRecord {
    AddOnRecord {
        id: id.to_string(),
        hotel_id: "hotel-alfama".to_string(),
        rate_plan_id: rate_plan_id.map(str::to_string),
        name: id.trim_start_matches("addon-").replace('-', " "),
        description: None,
        price: Decimal::from(price),
        currency: "EUR".to_string(),
        pricing: pricing.to_string(),
        included: false,
    }
}

/// Two Lisbon hotels and one in Porto.
///
/// Alfama House has a sold-out saver rate that is cheaper than its flexible one.
pub fn sample_inventory() -> InMemoryInventory {
    InMemoryInventory {
        hotels: vec![
            hotel("hotel-alfama", "alfama-house", "Alfama House", "Lisbon", 4.0),
            hotel("hotel-baixa", "baixa-grand", "Baixa Grand Hotel", "Lisbon", 5.0),
            hotel("hotel-ribeira", "ribeira-inn", "Ribeira Inn", "Porto", 3.0),
        ],
        room_types: vec![
            room("room-alfama-double", "hotel-alfama", 2, 1, 3),
            room("room-alfama-family", "hotel-alfama", 4, 2, 4),
            room("room-baixa-suite", "hotel-baixa", 2, 0, 2),
            room("room-ribeira-twin", "hotel-ribeira", 2, 0, 2),
        ],
        rate_plans: vec![
            plan("rp-alfama-flex", "room-alfama-double", "hotel-alfama", 90, 10, 20, 3, Some(24)),
            plan("rp-alfama-nr", "room-alfama-double", "hotel-alfama", 80, 10, 20, 0, None),
            plan("rp-alfama-family", "room-alfama-family", "hotel-alfama", 150, 15, 0, 2, None),
            plan("rp-baixa-suite", "room-baixa-suite", "hotel-baixa", 250, 25, 0, 1, Some(48)),
            plan("rp-ribeira-twin", "room-ribeira-twin", "hotel-ribeira", 60, 5, 0, 4, None),
        ],
        add_ons: vec![
            add_on("addon-parking", None, 15, "PER_NIGHT"),
            add_on("addon-breakfast-upgrade", Some("rp-alfama-flex"), 12, "PER_GUEST_PER_NIGHT"),
        ],
        fail: false,
    }
}

pub fn summary(supplier: SupplierCode, id: &str, name: &str, price: Decimal) -> HotelSummary {
    HotelSummary {
        id: id.to_string(),
        slug: staylink_shared::text::slugify(name),
        supplier,
        name: name.to_string(),
        location: Location {
            city: "Lisbon".to_string(),
            ..Location::default()
        },
        star_rating: 4.0,
        review_score: None,
        review_count: 0,
        currency: "EUR".to_string(),
        starting_price: price,
        cheapest_rate_plan_id: None,
        thumbnail: None,
    }
}

/// Adapter returning canned data, optionally slow or panicking.
#[derive(Default)]
pub struct ScriptedAdapter {
    pub code: Option<SupplierCode>,
    pub hotels: Vec<HotelSummary>,
    pub details: Vec<HotelDetails>,
    pub rate_plans: Vec<RatePlan>,
    pub delay: Option<Duration>,
    pub panic_on_search: bool,
    pub search_calls: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new(code: SupplierCode) -> Self {
        Self {
            code: Some(code),
            ..Self::default()
        }
    }

    pub fn with_hotels(mut self, hotels: Vec<HotelSummary>) -> Self {
        self.hotels = hotels;
        self
    }

    pub fn with_details(mut self, details: HotelDetails) -> Self {
        self.details.push(details);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_search = true;
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SupplierAdapter for ScriptedAdapter {
    fn code(&self) -> SupplierCode {
        self.code.unwrap_or(SupplierCode::Local)
    }

    async fn search(&self, _params: &SupplierSearchParams) -> Vec<HotelSummary> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_on_search {
            panic!("scripted supplier failure");
        }
        self.hotels.clone()
    }

    async fn get_hotel_details(&self, hotel_id: &str, _stay: Option<&StayQuery>) -> Option<HotelDetails> {
        self.details.iter().find(|d| d.summary.id == hotel_id).cloned()
    }

    async fn get_rate_plan(&self, rate_plan_id: &str) -> Option<RatePlan> {
        self.rate_plans.iter().find(|p| p.id == rate_plan_id).cloned()
    }
}

/// Rate confirmation returning a fixed answer and recording the calls it receives.
pub struct ScriptedConfirmation {
    result: CoreResult<RateCheck>,
    calls: AtomicUsize,
}

impl ScriptedConfirmation {
    pub fn new(result: CoreResult<RateCheck>) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn available_at(price: Decimal) -> Arc<Self> {
        Self::new(Ok(RateCheck {
            available: true,
            current_price: Some(price),
            currency: Some("EUR".to_string()),
            price_changed: true,
        }))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateConfirmation for ScriptedConfirmation {
    async fn confirm_rate(&self, _rate_ref: &str, _quoted_amount: Decimal) -> CoreResult<RateCheck> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}
