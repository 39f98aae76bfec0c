//! Adapter over the application's own inventory tables.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;
use staylink_core::pricing::{self, PriceComponents};
use staylink_core::repository::{AddOnRecord, HotelRecord, InventoryRepository, RatePlanRecord, RoomTypeRecord};
use staylink_core::{
    AddOn, AddOnPricing, BoardType, CancellationPolicy, HotelDetails, HotelSummary, Location, NightlyPrice,
    PaymentType, RatePlan, RateType, RoomType, StayQuery, SupplierAdapter, SupplierCode, SupplierSearchParams,
};
use staylink_shared::text;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::filters;

pub struct LocalAdapter {
    repository: Arc<dyn InventoryRepository>,
}

impl LocalAdapter {
    pub fn new(repository: Arc<dyn InventoryRepository>) -> Self {
        Self { repository }
    }

    async fn room_types_by_hotel(&self, hotels: &[HotelRecord]) -> HashMap<String, Vec<RoomTypeRecord>> {
        let lookups = hotels.iter().map(|hotel| async move {
            match self.repository.list_room_types(&hotel.id).await {
                Ok(rooms) => (hotel.id.clone(), rooms),
                Err(e) => {
                    warn!(hotel_id = %hotel.id, error = %e, "Failed to load room types");
                    (hotel.id.clone(), Vec::new())
                }
            }
        });
        futures::future::join_all(lookups).await.into_iter().collect()
    }
}

#[async_trait]
impl SupplierAdapter for LocalAdapter {
    fn code(&self) -> SupplierCode {
        SupplierCode::Local
    }

    async fn search(&self, params: &SupplierSearchParams) -> Vec<HotelSummary> {
        let hotels = match self.repository.list_active_hotels().await {
            Ok(hotels) => hotels,
            Err(e) => {
                warn!(error = %e, "Local inventory unavailable, returning no results");
                return Vec::new();
            }
        };

        let matched: Vec<HotelRecord> = hotels
            .into_iter()
            .filter(|hotel| matches_destination(hotel, &params.destination))
            .collect();
        if matched.is_empty() {
            return Vec::new();
        }

        let ids: Vec<String> = matched.iter().map(|h| h.id.clone()).collect();
        let plans = match self.repository.list_rate_plans(&ids).await {
            Ok(plans) => plans,
            Err(e) => {
                warn!(error = %e, "Failed to load local rate plans");
                return Vec::new();
            }
        };
        let rooms = self.room_types_by_hotel(&matched).await;

        let summaries: Vec<HotelSummary> = matched
            .iter()
            .filter_map(|hotel| {
                let hotel_rooms = rooms.get(&hotel.id).map(Vec::as_slice).unwrap_or_default();
                summarize(hotel, hotel_rooms, &plans, &params.stay)
            })
            .collect();

        debug!(destination = %params.destination, count = summaries.len(), "Local search completed");
        filters::apply(summaries, params)
    }

    async fn get_hotel_details(&self, hotel_id: &str, stay: Option<&StayQuery>) -> Option<HotelDetails> {
        let hotel = match self.repository.find_hotel(hotel_id).await {
            Ok(Some(hotel)) => hotel,
            Ok(None) => return None,
            Err(e) => {
                warn!(hotel_id, error = %e, "Failed to load local hotel");
                return None;
            }
        };

        let stay = stay.cloned().unwrap_or_else(|| StayQuery::default_from(Utc::now().date_naive()));
        let ids = [hotel.id.clone()];
        let (rooms, plans, add_ons) = tokio::join!(
            self.repository.list_room_types(&hotel.id),
            self.repository.list_rate_plans(&ids),
            self.repository.list_add_ons(&hotel.id),
        );

        let (rooms, plans, add_ons) = match (rooms, plans, add_ons) {
            (Ok(rooms), Ok(plans), Ok(add_ons)) => (rooms, plans, add_ons),
            (rooms, plans, add_ons) => {
                let error = [rooms.err(), plans.err(), add_ons.err()]
                    .into_iter()
                    .flatten()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                warn!(hotel_id, error = %error, "Failed to load local hotel inventory");
                return None;
            }
        };

        Some(build_details(&hotel, &rooms, &plans, &add_ons, &stay, Utc::now()))
    }

    async fn get_rate_plan(&self, rate_plan_id: &str) -> Option<RatePlan> {
        let record = match self.repository.find_rate_plan(rate_plan_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                warn!(rate_plan_id, error = %e, "Failed to load local rate plan");
                return None;
            }
        };

        let add_ons = match self.repository.list_add_ons(&record.hotel_id).await {
            Ok(add_ons) => add_ons,
            Err(e) => {
                warn!(rate_plan_id, error = %e, "Failed to load rate plan add-ons");
                Vec::new()
            }
        };
        let plan_add_ons: Vec<AddOn> = add_ons
            .iter()
            .filter(|a| a.rate_plan_id.as_deref() == Some(record.id.as_str()))
            .map(add_on_from_record)
            .collect();

        // Standalone lookups are priced for one room, one night from tomorrow
        let now = Utc::now();
        let stay = StayQuery::default_from(now.date_naive());
        Some(rate_plan_from_record(&record, &StayQuery { rooms: 1, ..stay }, plan_add_ons, now))
    }
}

fn matches_destination(hotel: &HotelRecord, destination: &str) -> bool {
    text::contains_normalized(&hotel.city, destination)
        || hotel.country.as_deref().is_some_and(|c| text::contains_normalized(c, destination))
        || text::contains_normalized(&hotel.name, destination)
}

fn location_of(hotel: &HotelRecord) -> Location {
    Location {
        city: hotel.city.clone(),
        country: hotel.country.clone(),
        address: hotel.address.clone(),
        latitude: hotel.latitude,
        longitude: hotel.longitude,
    }
}

/// `None` when no room fits the party or no bookable plan remains.
fn summarize(
    hotel: &HotelRecord,
    rooms: &[RoomTypeRecord],
    plans: &[RatePlanRecord],
    stay: &StayQuery,
) -> Option<HotelSummary> {
    let nights = stay.nights().max(1) as u32;
    let cheapest = plans
        .iter()
        .filter(|plan| plan.hotel_id == hotel.id && plan.available_rooms >= stay.rooms.max(1))
        .filter(|plan| {
            rooms
                .iter()
                .find(|room| room.id == plan.room_type_id)
                .is_some_and(|room| room_fits(room, stay))
        })
        .map(|plan| {
            let parts = PriceComponents::from_unit_rates(plan.base_rate, plan.taxes, plan.fees, nights, stay.rooms);
            (plan, pricing::per_room_night(parts.total_amount, nights, stay.rooms))
        })
        .min_by(|a, b| a.1.cmp(&b.1))?;

    Some(HotelSummary {
        id: hotel.id.clone(),
        slug: hotel.slug.clone(),
        supplier: SupplierCode::Local,
        name: hotel.name.clone(),
        location: location_of(hotel),
        star_rating: hotel.star_rating,
        review_score: hotel.review_score,
        review_count: hotel.review_count,
        currency: hotel.currency.clone(),
        starting_price: cheapest.1,
        cheapest_rate_plan_id: Some(cheapest.0.id.clone()),
        thumbnail: hotel.images.first().cloned(),
    })
}

fn room_fits(room: &RoomTypeRecord, stay: &StayQuery) -> bool {
    room.max_occupancy.saturating_mul(stay.rooms.max(1)) >= stay.guests()
}

fn build_details(
    hotel: &HotelRecord,
    rooms: &[RoomTypeRecord],
    plans: &[RatePlanRecord],
    add_ons: &[AddOnRecord],
    stay: &StayQuery,
    now: DateTime<Utc>,
) -> HotelDetails {
    let room_types: Vec<RoomType> = rooms
        .iter()
        .map(|room| {
            let rate_plans = plans
                .iter()
                .filter(|plan| plan.room_type_id == room.id)
                .map(|plan| {
                    let plan_add_ons = add_ons
                        .iter()
                        .filter(|a| a.rate_plan_id.as_deref() == Some(plan.id.as_str()))
                        .map(add_on_from_record)
                        .collect();
                    rate_plan_from_record(plan, stay, plan_add_ons, now)
                })
                .collect();

            RoomType {
                id: room.id.clone(),
                name: room.name.clone(),
                description: room.description.clone(),
                max_adults: room.max_adults,
                max_children: room.max_children,
                max_occupancy: room.max_occupancy,
                size_sqm: room.size_sqm,
                view: room.view.clone(),
                rate_plans,
            }
        })
        .collect();

    let (starting_price, cheapest_rate_plan_id) = room_types
        .iter()
        .filter_map(RoomType::cheapest_rate_plan)
        .min_by(|a, b| a.nightly_room_price().cmp(&b.nightly_room_price()))
        .map(|plan| (plan.nightly_room_price(), Some(plan.id.clone())))
        .unwrap_or((Decimal::ZERO, None));

    HotelDetails {
        summary: HotelSummary {
            id: hotel.id.clone(),
            slug: hotel.slug.clone(),
            supplier: SupplierCode::Local,
            name: hotel.name.clone(),
            location: location_of(hotel),
            star_rating: hotel.star_rating,
            review_score: hotel.review_score,
            review_count: hotel.review_count,
            currency: hotel.currency.clone(),
            starting_price,
            cheapest_rate_plan_id,
            thumbnail: hotel.images.first().cloned(),
        },
        description: hotel.description.clone(),
        amenities: hotel.amenities.clone(),
        images: hotel.images.clone(),
        add_ons: add_ons
            .iter()
            .filter(|a| a.rate_plan_id.is_none())
            .map(add_on_from_record)
            .collect(),
        room_types,
    }
}

pub(crate) fn rate_plan_from_record(
    record: &RatePlanRecord,
    stay: &StayQuery,
    add_ons: Vec<AddOn>,
    now: DateTime<Utc>,
) -> RatePlan {
    let nights = stay.nights().max(1) as u32;
    let rooms = stay.rooms.max(1);
    let parts = PriceComponents::from_unit_rates(record.base_rate, record.taxes, record.fees, nights, rooms);

    let nightly_amount = (record.base_rate + record.taxes) * Decimal::from(rooms);
    let nightly_breakdown = (0..nights)
        .map(|night| NightlyPrice {
            date: stay.check_in + Duration::days(i64::from(night)),
            amount: nightly_amount,
        })
        .collect();

    let check_in_at = stay.check_in.and_time(NaiveTime::MIN).and_utc();
    let deadline = record
        .free_cancellation_hours
        .filter(|_| record.is_refundable)
        .map(|hours| check_in_at - Duration::hours(hours));

    let cancellation_policy = match (&record.cancellation_policy_name, deadline) {
        (None, None) => None,
        (name, deadline) => Some(CancellationPolicy {
            name: name.clone().unwrap_or_else(|| {
                if deadline.is_some() { "Free cancellation" } else { "Non-refundable" }.to_string()
            }),
            description: record.cancellation_policy_description.clone(),
            refundable_until_hours: pricing::refundable_until_hours(deadline, now),
        }),
    };

    RatePlan {
        id: record.id.clone(),
        supplier: SupplierCode::Local,
        name: record.name.clone(),
        board_type: BoardType::from_code(&record.board_type).unwrap_or_default(),
        rate_type: RateType::from_code(&record.rate_type).unwrap_or_default(),
        payment_type: PaymentType::from_code(&record.payment_type).unwrap_or_default(),
        is_refundable: record.is_refundable,
        currency: record.currency.clone(),
        base_rate: parts.base_rate,
        taxes: parts.taxes,
        fees: parts.fees,
        total_amount: parts.total_amount,
        nights,
        rooms,
        nightly_breakdown,
        available_rooms: record.available_rooms,
        cancellation_policy,
        add_ons,
        booking_ref: None,
    }
}

fn add_on_from_record(record: &AddOnRecord) -> AddOn {
    AddOn {
        id: record.id.clone(),
        name: record.name.clone(),
        description: record.description.clone(),
        price: record.price,
        currency: record.currency.clone(),
        pricing: AddOnPricing::from_code(&record.pricing).unwrap_or_default(),
        included: record.included,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_inventory, InMemoryInventory};
    use chrono::NaiveDate;

    fn stay(check_in: &str, nights: i64, adults: u32, rooms: u32) -> StayQuery {
        let check_in = NaiveDate::parse_from_str(check_in, "%Y-%m-%d").unwrap();
        StayQuery {
            check_in,
            check_out: check_in + Duration::days(nights),
            adults,
            children: 0,
            rooms,
        }
    }

    fn adapter() -> LocalAdapter {
        LocalAdapter::new(Arc::new(sample_inventory()))
    }

    #[tokio::test]
    async fn test_search_matches_city_case_insensitively() {
        let params = SupplierSearchParams::new("lisBON", stay("2026-11-01", 2, 2, 1));
        let results = adapter().search(&params).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|h| h.location.city == "Lisbon"));
        assert!(results.windows(2).all(|w| w[0].starting_price <= w[1].starting_price));
    }

    #[tokio::test]
    async fn test_search_starting_price_is_cheapest_available_plan() {
        let params = SupplierSearchParams::new("Alfama", stay("2026-11-01", 2, 2, 1));
        let results = adapter().search(&params).await;

        assert_eq!(results.len(), 1);
        // 90 base + 10 taxes per night, 20 fees per stay over two nights
        assert_eq!(results[0].starting_price, Decimal::from(110));
        assert_eq!(results[0].cheapest_rate_plan_id.as_deref(), Some("rp-alfama-flex"));
    }

    #[tokio::test]
    async fn test_search_skips_hotels_without_room_for_the_party() {
        let params = SupplierSearchParams::new("Lisbon", stay("2026-11-01", 1, 5, 1));
        assert!(adapter().search(&params).await.is_empty());
    }

    #[tokio::test]
    async fn test_repository_failure_degrades_to_empty() {
        let adapter = LocalAdapter::new(Arc::new(InMemoryInventory::failing()));
        let params = SupplierSearchParams::new("Lisbon", stay("2026-11-01", 1, 2, 1));
        assert!(adapter.search(&params).await.is_empty());
        assert!(adapter.get_hotel_details("hotel-alfama", None).await.is_none());
    }

    #[tokio::test]
    async fn test_details_prices_every_plan_consistently() {
        let stay = stay("2026-11-01", 3, 3, 2);
        let details = adapter().get_hotel_details("alfama-house", Some(&stay)).await.unwrap();

        assert_eq!(details.summary.id, "hotel-alfama");
        assert!(!details.room_types.is_empty());
        assert_eq!(details.add_ons.len(), 1, "hotel-level add-ons only");
        for plan in details.room_types.iter().flat_map(|r| &r.rate_plans) {
            assert!(plan.is_consistent(), "plan {} total does not match components", plan.id);
            assert_eq!(plan.nights, 3);
            assert_eq!(plan.rooms, 2);
            assert_eq!(plan.nightly_breakdown.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_unknown_hotel_is_absent() {
        assert!(adapter().get_hotel_details("nope", None).await.is_none());
        assert!(adapter().get_rate_plan("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_get_rate_plan_is_one_room_one_night() {
        let plan = adapter().get_rate_plan("rp-alfama-flex").await.unwrap();
        assert_eq!((plan.nights, plan.rooms), (1, 1));
        assert_eq!(plan.total_amount, Decimal::from(120));
        assert_eq!(plan.add_ons.len(), 1);
        assert!(plan.is_refundable);
        assert_eq!(plan.rate_type, RateType::Flexible);
    }

    #[test]
    fn test_cancellation_deadline_clamps_to_zero() {
        let record = sample_inventory().rate_plans.into_iter().find(|p| p.id == "rp-alfama-flex").unwrap();
        let stay = stay("2026-11-01", 1, 2, 1);
        let after_deadline = NaiveDate::from_ymd_opt(2026, 10, 31)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc();

        let plan = rate_plan_from_record(&record, &stay, Vec::new(), after_deadline);
        let policy = plan.cancellation_policy.unwrap();
        assert_eq!(policy.refundable_until_hours, Some(0));
    }

    #[test]
    fn test_non_refundable_plan_has_no_deadline() {
        let record = sample_inventory().rate_plans.into_iter().find(|p| p.id == "rp-alfama-nr").unwrap();
        let plan = rate_plan_from_record(&record, &stay("2026-11-01", 1, 2, 1), Vec::new(), Utc::now());
        assert_eq!(plan.rate_type, RateType::NonRefundable);
        assert!(!plan.has_free_cancellation());
    }
}
