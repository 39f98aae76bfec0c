//! Atlas payloads and their normalization into the canonical model.
//!
//! Every wire field is optional; mapping decides the defaults.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use staylink_core::pricing::{self, PriceComponents};
use staylink_core::{
    BoardType, CancellationPolicy, ErrorClass, HotelDetails, HotelSummary, Location, NightlyPrice, PaymentType,
    RatePlan, RateType, RoomType, StayQuery, SupplierCode,
};
use staylink_shared::text;

use crate::http;

/// Body-level error codes meaning the account is throttled or unusable.
const QUOTA_ERRORS: [&str; 4] = ["quota_exceeded", "overdue_debt", "rate_limit_exceeded", "invalid_auth"];

/// Prebook error codes meaning the rate is gone rather than the call failing.
const UNAVAILABLE_ERRORS: [&str; 3] = ["no_available_rates", "rate_not_found", "hotel_not_found"];

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub status: Option<String>,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn is_ok(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s.eq_ignore_ascii_case("ok")) && self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionsData {
    pub regions: Vec<AtlasRegion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasRegion {
    pub id: Option<i64>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HotelsData {
    pub hotels: Vec<AtlasHotel>,
    pub changes: Option<PrebookChanges>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrebookChanges {
    pub price_changed: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasHotel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub star_rating: Option<f32>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub review_score: Option<f32>,
    pub review_count: Option<u32>,
    pub images: Vec<String>,
    pub rates: Vec<AtlasRate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasRate {
    pub book_hash: Option<String>,
    pub match_hash: Option<String>,
    pub room_name: Option<String>,
    pub meal: Option<String>,
    /// Price of each night for all rooms.
    pub daily_prices: Vec<Decimal>,
    pub allotment: Option<u32>,
    pub payment_options: Option<PaymentOptions>,
    pub rg_ext: Option<RoomExt>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentOptions {
    pub payment_types: Vec<PaymentOption>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentOption {
    pub amount: Option<Decimal>,
    pub currency_code: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub tax_data: Option<TaxData>,
    pub cancellation_penalties: Option<Penalties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxData {
    pub taxes: Vec<AtlasTax>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasTax {
    pub name: Option<String>,
    pub amount: Option<Decimal>,
    /// Absent means the tax is already inside `amount`.
    pub included_by_supplier: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Penalties {
    pub free_cancellation_before: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomExt {
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HotelInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub star_rating: Option<f32>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub review_score: Option<f32>,
    pub review_count: Option<u32>,
    pub amenity_groups: Vec<AmenityGroup>,
    pub images: Vec<String>,
    pub room_groups: Vec<RoomGroup>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AmenityGroup {
    pub group_name: Option<String>,
    pub amenities: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomGroup {
    pub name: Option<String>,
    pub description: Option<String>,
    pub size_sqm: Option<f32>,
    pub view: Option<String>,
    pub rg_ext: Option<RoomExt>,
}

// ============================================================================
// Classification
// ============================================================================

/// `status` is `None` when the failure came from the response body of a 200.
pub fn classify(status: Option<StatusCode>, error: Option<&str>) -> ErrorClass {
    if let Some(error) = error {
        let error = error.to_ascii_lowercase();
        if QUOTA_ERRORS.iter().any(|code| error.contains(code)) {
            return ErrorClass::Quota;
        }
    }
    status.and_then(http::status_class).unwrap_or(ErrorClass::Fatal)
}

pub fn is_unavailable(error: &str) -> bool {
    let error = error.to_ascii_lowercase();
    UNAVAILABLE_ERRORS.iter().any(|code| error.contains(code))
}

// ============================================================================
// Field mapping
// ============================================================================

pub fn board_type(meal: Option<&str>) -> BoardType {
    let Some(meal) = meal else {
        return BoardType::RoomOnly;
    };
    let meal = meal.to_ascii_lowercase().replace(['_', ' '], "-");
    match meal.as_str() {
        "all-inclusive" | "ultra-all-inclusive" => BoardType::AllInclusive,
        "full-board" => BoardType::FullBoard,
        "half-board" | "half-board-lunch" | "half-board-dinner" | "dinner" => BoardType::HalfBoard,
        m if m.contains("breakfast") => BoardType::BedAndBreakfast,
        _ => BoardType::RoomOnly,
    }
}

pub fn payment_type(kind: Option<&str>) -> PaymentType {
    match kind.map(str::to_ascii_lowercase).as_deref() {
        Some("hotel") => PaymentType::PayAtHotel,
        Some("deposit") => PaymentType::Deposit,
        Some("credit") | Some("credit_limit") => PaymentType::CreditLimit,
        _ => PaymentType::Prepaid,
    }
}

/// Accepts RFC 3339 or a naive timestamp read as UTC.
pub fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn primary_payment(rate: &AtlasRate) -> Option<&PaymentOption> {
    rate.payment_options.as_ref().and_then(|p| p.payment_types.first())
}

/// Stay price split into components. Taxes the supplier collects are inside
/// `amount`; taxes due at the property become fees so the total is what the guest pays.
pub fn rate_price(rate: &AtlasRate, nights: u32, rooms: u32) -> Option<PriceComponents> {
    let payment = primary_payment(rate);
    let amount = payment
        .and_then(|p| p.amount)
        .or_else(|| (!rate.daily_prices.is_empty()).then(|| rate.daily_prices.iter().sum()))?;

    let Some(taxes) = payment.and_then(|p| p.tax_data.as_ref()) else {
        return Some(PriceComponents::from_inclusive_total(amount, nights, rooms));
    };

    let (included, at_property) = taxes.taxes.iter().fold((Decimal::ZERO, Decimal::ZERO), |(inc, due), tax| {
        let value = tax.amount.unwrap_or_default();
        if tax.included_by_supplier.unwrap_or(true) {
            (inc + value, due)
        } else {
            (inc, due + value)
        }
    });

    Some(PriceComponents::from_stay_totals(
        amount - included,
        included,
        at_property,
        nights,
        rooms,
    ))
}

pub fn free_cancellation_deadline(rate: &AtlasRate) -> Option<DateTime<Utc>> {
    primary_payment(rate)
        .and_then(|p| p.cancellation_penalties.as_ref())
        .and_then(|c| c.free_cancellation_before.as_deref())
        .and_then(parse_deadline)
}

pub fn rate_plan(rate: &AtlasRate, stay: &StayQuery, currency_fallback: &str, now: DateTime<Utc>) -> Option<RatePlan> {
    let book_hash = rate.book_hash.clone()?;
    let nights = stay.nights().max(1) as u32;
    let rooms = stay.rooms.max(1);
    let parts = rate_price(rate, nights, rooms)?;

    let payment = primary_payment(rate);
    let deadline = free_cancellation_deadline(rate);
    let refundable = deadline.is_some_and(|d| d > now);
    let cancellation_policy = deadline.map(|d| CancellationPolicy {
        name: "Free cancellation".to_string(),
        description: Some(format!("Free cancellation until {} UTC", d.format("%Y-%m-%d %H:%M"))),
        refundable_until_hours: pricing::refundable_until_hours(Some(d), now),
    });

    let nightly_breakdown = if rate.daily_prices.len() == nights as usize {
        rate.daily_prices
            .iter()
            .enumerate()
            .map(|(i, amount)| NightlyPrice {
                date: stay.check_in + Duration::days(i as i64),
                amount: *amount,
            })
            .collect()
    } else {
        Vec::new()
    };

    let room_name = rate.room_name.clone().unwrap_or_else(|| "Room".to_string());
    let board = board_type(rate.meal.as_deref());

    Some(RatePlan {
        id: book_hash.clone(),
        supplier: SupplierCode::Atlas,
        name: format!("{} - {}", room_name, board_label(board)),
        board_type: board,
        rate_type: if refundable { RateType::Flexible } else { RateType::NonRefundable },
        payment_type: payment_type(payment.and_then(|p| p.kind.as_deref())),
        is_refundable: refundable,
        currency: payment
            .and_then(|p| p.currency_code.clone())
            .unwrap_or_else(|| currency_fallback.to_string()),
        base_rate: parts.base_rate,
        taxes: parts.taxes,
        fees: parts.fees,
        total_amount: parts.total_amount,
        nights,
        rooms,
        nightly_breakdown,
        available_rooms: rooms_left(rate, rooms),
        cancellation_policy,
        add_ons: Vec::new(),
        booking_ref: Some(book_hash),
    })
}

/// An absent allotment means the supplier did not cap the rate.
fn rooms_left(rate: &AtlasRate, rooms: u32) -> u32 {
    rate.allotment.unwrap_or(rooms)
}

fn board_label(board: BoardType) -> &'static str {
    match board {
        BoardType::RoomOnly => "Room only",
        BoardType::BedAndBreakfast => "Breakfast included",
        BoardType::HalfBoard => "Half board",
        BoardType::FullBoard => "Full board",
        BoardType::AllInclusive => "All inclusive",
    }
}

/// `None` when the hotel has no id or no rate with a usable price.
pub fn summary(hotel: &AtlasHotel, stay: &StayQuery) -> Option<HotelSummary> {
    let id = hotel.id.clone()?;
    let nights = stay.nights().max(1) as u32;
    let rooms = stay.rooms.max(1);

    let (cheapest, price) = hotel
        .rates
        .iter()
        .filter(|rate| rooms_left(rate, rooms) > 0)
        .filter_map(|rate| {
            let parts = rate_price(rate, nights, rooms)?;
            Some((rate, pricing::per_room_night(parts.total_amount, nights, rooms)))
        })
        .min_by(|a, b| a.1.cmp(&b.1))?;

    let name = hotel.name.clone().unwrap_or_else(|| id.clone());
    Some(HotelSummary {
        slug: text::slugify(&name),
        id,
        supplier: SupplierCode::Atlas,
        name,
        location: Location {
            city: hotel.city.clone().unwrap_or_default(),
            country: hotel.country.clone(),
            address: hotel.address.clone(),
            latitude: hotel.latitude,
            longitude: hotel.longitude,
        },
        star_rating: hotel.star_rating.unwrap_or(0.0),
        review_score: hotel.review_score,
        review_count: hotel.review_count.unwrap_or(0),
        currency: primary_payment(cheapest)
            .and_then(|p| p.currency_code.clone())
            .unwrap_or_else(|| "EUR".to_string()),
        starting_price: price,
        cheapest_rate_plan_id: cheapest.book_hash.clone(),
        thumbnail: hotel.images.first().map(|url| thumbnail_url(url)),
    })
}

/// Image URLs carry a `{size}` placeholder.
fn thumbnail_url(template: &str) -> String {
    template.replace("{size}", "640x400")
}

fn full_size_url(template: &str) -> String {
    template.replace("{size}", "1024x768")
}

/// Rates are grouped into room types by room name, in first-seen order.
pub fn details(info: &HotelInfo, rates: &[AtlasRate], stay: &StayQuery, now: DateTime<Utc>) -> Option<HotelDetails> {
    let id = info.id.clone()?;
    let name = info.name.clone().unwrap_or_else(|| id.clone());
    let currency = rates
        .iter()
        .find_map(|r| primary_payment(r).and_then(|p| p.currency_code.clone()))
        .unwrap_or_else(|| "EUR".to_string());

    let mut room_types: Vec<RoomType> = Vec::new();
    for rate in rates {
        let Some(plan) = rate_plan(rate, stay, &currency, now) else {
            continue;
        };
        let room_name = rate.room_name.clone().unwrap_or_else(|| "Room".to_string());
        let room_id = text::slugify(&room_name);

        match room_types.iter_mut().find(|room| room.id == room_id) {
            Some(room) => room.rate_plans.push(plan),
            None => {
                let group = info
                    .room_groups
                    .iter()
                    .find(|g| g.name.as_deref().map(text::normalize_key) == Some(text::normalize_key(&room_name)));
                let capacity = rate
                    .rg_ext
                    .as_ref()
                    .and_then(|ext| ext.capacity)
                    .or_else(|| group.and_then(|g| g.rg_ext.as_ref()).and_then(|ext| ext.capacity))
                    .unwrap_or(2)
                    .max(1);

                room_types.push(RoomType {
                    id: room_id,
                    name: room_name,
                    description: group.and_then(|g| g.description.clone()),
                    max_adults: capacity,
                    max_children: capacity - 1,
                    max_occupancy: capacity,
                    size_sqm: group.and_then(|g| g.size_sqm),
                    view: group.and_then(|g| g.view.clone()),
                    rate_plans: vec![plan],
                });
            }
        }
    }

    let (starting_price, cheapest_rate_plan_id) = room_types
        .iter()
        .filter_map(RoomType::cheapest_rate_plan)
        .min_by(|a, b| a.nightly_room_price().cmp(&b.nightly_room_price()))
        .map(|plan| (plan.nightly_room_price(), Some(plan.id.clone())))
        .unwrap_or((Decimal::ZERO, None));

    Some(HotelDetails {
        summary: HotelSummary {
            slug: text::slugify(&name),
            id,
            supplier: SupplierCode::Atlas,
            name,
            location: Location {
                city: info.city.clone().unwrap_or_default(),
                country: info.country.clone(),
                address: info.address.clone(),
                latitude: info.latitude,
                longitude: info.longitude,
            },
            star_rating: info.star_rating.unwrap_or(0.0),
            review_score: info.review_score,
            review_count: info.review_count.unwrap_or(0),
            currency,
            starting_price,
            cheapest_rate_plan_id,
            thumbnail: info.images.first().map(|url| thumbnail_url(url)),
        },
        description: info.description.clone(),
        amenities: info.amenity_groups.iter().flat_map(|g| g.amenities.iter().cloned()).collect(),
        images: info.images.iter().map(|url| full_size_url(url)).collect(),
        add_ons: Vec::new(),
        room_types,
    })
}

/// Picks a city-level region when the autocomplete returns several kinds.
pub fn pick_region(regions: &[AtlasRegion]) -> Option<i64> {
    regions
        .iter()
        .find(|r| r.kind.as_deref().is_some_and(|k| k.eq_ignore_ascii_case("city")))
        .or_else(|| regions.first())
        .and_then(|r| r.id)
}
