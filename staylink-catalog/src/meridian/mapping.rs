//! Meridian payloads and their normalization into the canonical model.

use chrono::{DateTime, Days, NaiveDate, Utc};
use reqwest::StatusCode;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use staylink_core::pricing::{self, PriceComponents};
use staylink_core::{
    BoardType, CancellationPolicy, ErrorClass, HotelDetails, HotelSummary, Location, NightlyPrice, PaymentType,
    RatePlan, RateType, RoomType, StayQuery, SupplierCode,
};
use staylink_shared::text;

use crate::atlas::mapping::parse_deadline;
use crate::http;

// ============================================================================
// Wire types
// ============================================================================

/// Hotel codes arrive as numbers from search and as strings elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Code {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Code::Number(n) => write!(f, "{}", n),
            Code::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorBody {
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorDetail {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationsResponse {
    pub destinations: Vec<Destination>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Destination {
    pub code: Option<String>,
    pub name: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityResponse {
    pub hotels: Vec<MeridianHotel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckRatesResponse {
    pub hotel: Option<MeridianHotel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeridianHotel {
    pub code: Option<Code>,
    pub name: Option<String>,
    pub category_code: Option<String>,
    pub category_name: Option<String>,
    pub destination_name: Option<String>,
    pub country_code: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub currency: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub rooms: Vec<MeridianRoom>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeridianRoom {
    pub code: Option<String>,
    pub name: Option<String>,
    pub rates: Vec<MeridianRate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeridianRate {
    pub rate_key: Option<String>,
    /// `NOR` normal, `NRF` non-refundable.
    pub rate_class: Option<String>,
    /// `BOOKABLE` or `RECHECK`.
    pub rate_type: Option<String>,
    /// Stay price for every room on the rate.
    pub net: Option<Decimal>,
    pub allotment: Option<u32>,
    pub payment_type: Option<String>,
    pub board_code: Option<String>,
    pub board_name: Option<String>,
    pub rooms: Option<u32>,
    pub adults: Option<u32>,
    pub children: Option<u32>,
    pub cancellation_policies: Vec<MeridianPenalty>,
    pub taxes: Option<MeridianTaxes>,
    pub daily_rates: Vec<DailyRate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeridianPenalty {
    pub amount: Option<Decimal>,
    /// Penalty applies from this instant; cancelling before it is free.
    pub from: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeridianTaxes {
    pub all_included: Option<bool>,
    pub taxes: Vec<MeridianTax>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeridianTax {
    /// `false` means payable at the property.
    pub included: Option<bool>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DailyRate {
    pub offset: Option<u32>,
    pub daily_net: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HotelContentResponse {
    pub hotel: Option<HotelContent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HotelContent {
    pub code: Option<Code>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_code: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub facilities: Vec<String>,
    pub images: Vec<String>,
    pub rooms: Vec<RoomContent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Coordinates {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomContent {
    pub room_code: Option<String>,
    pub description: Option<String>,
    pub max_adults: Option<u32>,
    pub max_children: Option<u32>,
    pub max_pax: Option<u32>,
    pub size_sqm: Option<f32>,
    pub view: Option<String>,
}

// ============================================================================
// Classification
// ============================================================================

pub fn classify(status: Option<StatusCode>, error_code: Option<&str>) -> ErrorClass {
    if let Some(code) = error_code {
        let code = code.to_ascii_uppercase();
        if code.contains("QUOTA") || code.contains("LIMIT") {
            return ErrorClass::Quota;
        }
    }
    status.and_then(http::status_class).unwrap_or(ErrorClass::Fatal)
}

pub fn is_unavailable(error_code: &str) -> bool {
    let code = error_code.to_ascii_uppercase();
    code.contains("NOT_AVAILABLE") || code.contains("SOLD_OUT")
}

// ============================================================================
// Field mapping
// ============================================================================

pub fn board_type(code: Option<&str>) -> BoardType {
    match code.map(|c| c.trim().to_ascii_uppercase()).as_deref() {
        Some("BB") | Some("CB") | Some("AB") => BoardType::BedAndBreakfast,
        Some("HB") => BoardType::HalfBoard,
        Some("FB") => BoardType::FullBoard,
        Some("AI") | Some("TI") => BoardType::AllInclusive,
        _ => BoardType::RoomOnly,
    }
}

pub fn payment_type(code: Option<&str>) -> PaymentType {
    match code.map(str::to_ascii_uppercase).as_deref() {
        Some("AT_HOTEL") => PaymentType::PayAtHotel,
        _ => PaymentType::Prepaid,
    }
}

/// Leading digits of `4EST` or `4 STARS`.
pub fn star_rating(category_code: Option<&str>, category_name: Option<&str>) -> f32 {
    [category_code, category_name]
        .into_iter()
        .flatten()
        .find_map(|raw| {
            let digits: String = raw.trim().chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u8>().ok()
        })
        .map(|stars| f32::from(stars.min(5)))
        .unwrap_or(0.0)
}

/// Earliest penalty start; before it cancelling is free.
pub fn free_cancellation_deadline(rate: &MeridianRate) -> Option<DateTime<Utc>> {
    rate.cancellation_policies
        .iter()
        .filter_map(|p| p.from.as_deref().and_then(parse_deadline))
        .min()
}

pub fn rate_price(rate: &MeridianRate, nights: u32, rooms: u32) -> Option<PriceComponents> {
    let net = rate
        .net
        .or_else(|| (!rate.daily_rates.is_empty()).then(|| rate.daily_rates.iter().filter_map(|d| d.daily_net).sum()))?;

    let Some(taxes) = &rate.taxes else {
        return Some(PriceComponents::from_inclusive_total(net, nights, rooms));
    };

    let (included, at_property) = taxes.taxes.iter().fold((Decimal::ZERO, Decimal::ZERO), |(inc, due), tax| {
        let value = tax.amount.unwrap_or_default();
        let is_included = tax.included.or(taxes.all_included).unwrap_or(true);
        if is_included {
            (inc + value, due)
        } else {
            (inc, due + value)
        }
    });

    Some(PriceComponents::from_stay_totals(net - included, included, at_property, nights, rooms))
}

pub fn rate_plan(rate: &MeridianRate, room: &MeridianRoom, stay: &StayQuery, currency: &str, now: DateTime<Utc>) -> Option<RatePlan> {
    let rate_key = rate.rate_key.clone()?;
    let nights = stay.nights().max(1) as u32;
    let rooms = rate.rooms.unwrap_or(stay.rooms).max(1);
    let parts = rate_price(rate, nights, rooms)?;

    let non_refundable_class = rate.rate_class.as_deref().is_some_and(|c| c.eq_ignore_ascii_case("NRF"));
    let deadline = if non_refundable_class { None } else { free_cancellation_deadline(rate) };
    let refundable = deadline.is_some_and(|d| d > now);

    let cancellation_policy = if non_refundable_class {
        Some(CancellationPolicy {
            name: "Non-refundable".to_string(),
            description: None,
            refundable_until_hours: None,
        })
    } else {
        deadline.map(|d| CancellationPolicy {
            name: "Free cancellation".to_string(),
            description: Some(format!("Free cancellation until {} UTC", d.format("%Y-%m-%d %H:%M"))),
            refundable_until_hours: pricing::refundable_until_hours(Some(d), now),
        })
    };

    let nightly_breakdown = rate
        .daily_rates
        .iter()
        .filter_map(|d| {
            Some(NightlyPrice {
                date: stay.check_in.checked_add_days(Days::new(u64::from(d.offset?)))?,
                amount: d.daily_net?,
            })
        })
        .collect();

    let board = board_type(rate.board_code.as_deref());
    let room_name = room.name.clone().unwrap_or_else(|| "Room".to_string());
    let board_name = rate.board_name.clone().unwrap_or_else(|| format!("{:?}", board));

    Some(RatePlan {
        id: rate_key.clone(),
        supplier: SupplierCode::Meridian,
        name: format!("{} - {}", room_name, board_name),
        board_type: board,
        rate_type: if refundable { RateType::Flexible } else { RateType::NonRefundable },
        payment_type: payment_type(rate.payment_type.as_deref()),
        is_refundable: refundable,
        currency: currency.to_string(),
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
        booking_ref: Some(rate_key),
    })
}

/// An absent allotment means the supplier did not cap the rate.
fn rooms_left(rate: &MeridianRate, rooms: u32) -> u32 {
    rate.allotment.unwrap_or(rooms)
}

pub fn summary(hotel: &MeridianHotel, stay: &StayQuery) -> Option<HotelSummary> {
    let id = hotel.code.as_ref()?.to_string();
    let nights = stay.nights().max(1) as u32;

    let (cheapest, price) = hotel
        .rooms
        .iter()
        .flat_map(|room| room.rates.iter())
        .filter_map(|rate| {
            let rooms = rate.rooms.unwrap_or(stay.rooms).max(1);
            if rooms_left(rate, rooms) == 0 {
                return None;
            }
            let parts = rate_price(rate, nights, rooms)?;
            Some((rate, pricing::per_room_night(parts.total_amount, nights, rooms)))
        })
        .min_by(|a, b| a.1.cmp(&b.1))?;

    let name = hotel.name.clone().unwrap_or_else(|| id.clone());
    Some(HotelSummary {
        slug: text::slugify(&name),
        id,
        supplier: SupplierCode::Meridian,
        name,
        location: Location {
            city: hotel.destination_name.clone().unwrap_or_default(),
            country: hotel.country_code.clone(),
            address: None,
            latitude: hotel.latitude.and_then(|d| d.to_f64()),
            longitude: hotel.longitude.and_then(|d| d.to_f64()),
        },
        star_rating: star_rating(hotel.category_code.as_deref(), hotel.category_name.as_deref()),
        review_score: None,
        review_count: 0,
        currency: hotel.currency.clone().unwrap_or_else(|| "EUR".to_string()),
        starting_price: price,
        cheapest_rate_plan_id: cheapest.rate_key.clone(),
        thumbnail: None,
    })
}

/// Static content joined with live rates; rooms without rates are kept so the page can show them.
pub fn details(
    content: &HotelContent,
    availability: Option<&MeridianHotel>,
    stay: &StayQuery,
    now: DateTime<Utc>,
) -> Option<HotelDetails> {
    let id = content.code.as_ref()?.to_string();
    let name = content.name.clone().unwrap_or_else(|| id.clone());
    let currency = availability
        .and_then(|h| h.currency.clone())
        .unwrap_or_else(|| "EUR".to_string());

    let live_rooms: &[MeridianRoom] = availability.map(|h| h.rooms.as_slice()).unwrap_or_default();

    let mut room_types: Vec<RoomType> = content
        .rooms
        .iter()
        .filter_map(|room| {
            let code = room.room_code.clone()?;
            let live = live_rooms.iter().find(|r| r.code.as_deref() == Some(code.as_str()));
            let max_adults = room.max_adults.unwrap_or(2);
            let max_children = room.max_children.unwrap_or(0);
            Some(RoomType {
                name: live
                    .and_then(|r| r.name.clone())
                    .or_else(|| room.description.clone())
                    .unwrap_or_else(|| code.clone()),
                id: code,
                description: room.description.clone(),
                max_adults,
                max_children,
                max_occupancy: room.max_pax.unwrap_or(max_adults + max_children),
                size_sqm: room.size_sqm,
                view: room.view.clone(),
                rate_plans: live
                    .map(|r| r.rates.iter().filter_map(|rate| rate_plan(rate, r, stay, &currency, now)).collect())
                    .unwrap_or_default(),
            })
        })
        .collect();

    // Live rooms missing from static content still get listed
    for live in live_rooms {
        let Some(code) = live.code.clone() else { continue };
        if room_types.iter().any(|r| r.id == code) {
            continue;
        }
        let occupancy = live.rates.iter().filter_map(|r| r.adults.zip(r.children)).map(|(a, c)| a + c).max().unwrap_or(2);
        room_types.push(RoomType {
            name: live.name.clone().unwrap_or_else(|| code.clone()),
            id: code,
            description: None,
            max_adults: occupancy,
            max_children: occupancy.saturating_sub(1),
            max_occupancy: occupancy,
            size_sqm: None,
            view: None,
            rate_plans: live.rates.iter().filter_map(|rate| rate_plan(rate, live, stay, &currency, now)).collect(),
        });
    }

    let (starting_price, cheapest_rate_plan_id) = room_types
        .iter()
        .filter_map(RoomType::cheapest_rate_plan)
        .min_by(|a, b| a.nightly_room_price().cmp(&b.nightly_room_price()))
        .map(|plan| (plan.nightly_room_price(), Some(plan.id.clone())))
        .unwrap_or((Decimal::ZERO, None));

    let coordinates = content.coordinates.clone().unwrap_or_default();
    Some(HotelDetails {
        summary: HotelSummary {
            slug: text::slugify(&name),
            id,
            supplier: SupplierCode::Meridian,
            name,
            location: Location {
                city: content.city.clone().unwrap_or_default(),
                country: content.country_code.clone(),
                address: content.address.clone(),
                latitude: coordinates.latitude,
                longitude: coordinates.longitude,
            },
            star_rating: star_rating(content.category_code.as_deref(), None),
            review_score: None,
            review_count: 0,
            currency,
            starting_price,
            cheapest_rate_plan_id,
            thumbnail: content.images.first().cloned(),
        },
        description: content.description.clone(),
        amenities: content.facilities.clone(),
        images: content.images.clone(),
        add_ons: Vec::new(),
        room_types,
    })
}

/// The rate a check answered for `rate_key`. A response carrying a single
/// rate under a new key is taken as the re-keyed original.
pub fn checked_rate<'a>(hotel: &'a MeridianHotel, rate_key: &str) -> Option<(&'a MeridianRoom, &'a MeridianRate)> {
    let mut rates = hotel.rooms.iter().flat_map(|room| room.rates.iter().map(move |rate| (room, rate)));
    if let Some(found) = rates.clone().find(|(_, rate)| rate.rate_key.as_deref() == Some(rate_key)) {
        return Some(found);
    }
    match (rates.next(), rates.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

/// Stay a checked rate was priced for; falls back to one night from tomorrow.
pub fn checked_stay(hotel: &MeridianHotel, rate: &MeridianRate, today: NaiveDate) -> StayQuery {
    let default = StayQuery::default_from(today);
    let check_in = hotel.check_in.unwrap_or(default.check_in);
    let check_out = hotel
        .check_out
        .filter(|out| *out > check_in)
        .or_else(|| check_in.checked_add_days(Days::new(1)))
        .unwrap_or(check_in);
    let rooms = rate.rooms.unwrap_or(1).max(1);
    StayQuery {
        check_in,
        check_out,
        adults: rate.adults.unwrap_or(default.adults).max(rooms),
        children: rate.children.unwrap_or(0),
        rooms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn stay(nights: i64) -> StayQuery {
        let check_in = NaiveDate::from_ymd_opt(2026, 11, 10).unwrap();
        StayQuery {
            check_in,
            check_out: check_in + Duration::days(nights),
            adults: 2,
            children: 0,
            rooms: 1,
        }
    }

    fn now() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2026, 11, 1).unwrap().and_hms_opt(0, 0, 0).unwrap().and_utc()
    }

    fn room(rates: serde_json::Value) -> MeridianRoom {
        serde_json::from_value(json!({"code": "DBL.ST", "name": "Double Standard", "rates": rates})).unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(Some(StatusCode::FORBIDDEN), None), ErrorClass::Quota);
        assert_eq!(classify(Some(StatusCode::BAD_REQUEST), Some("QUOTA_EXCEEDED")), ErrorClass::Quota);
        assert_eq!(classify(Some(StatusCode::BAD_REQUEST), Some("REQUEST_LIMIT")), ErrorClass::Quota);
        assert_eq!(classify(Some(StatusCode::GATEWAY_TIMEOUT), None), ErrorClass::Transient);
        assert_eq!(classify(Some(StatusCode::BAD_REQUEST), Some("INVALID_DATA")), ErrorClass::Fatal);
    }

    #[test]
    fn test_board_and_stars() {
        assert_eq!(board_type(Some("BB")), BoardType::BedAndBreakfast);
        assert_eq!(board_type(Some("ai")), BoardType::AllInclusive);
        assert_eq!(board_type(Some("SC")), BoardType::RoomOnly);
        assert_eq!(star_rating(Some("4EST"), None), 4.0);
        assert_eq!(star_rating(Some("HS"), Some("3 STARS")), 3.0);
        assert_eq!(star_rating(None, None), 0.0);
    }

    #[test]
    fn test_codes_accept_numbers_and_strings() {
        let numeric: MeridianHotel = serde_json::from_value(json!({"code": 1234})).unwrap();
        let text: MeridianHotel = serde_json::from_value(json!({"code": "1234"})).unwrap();
        assert_eq!(numeric.code.unwrap().to_string(), "1234");
        assert_eq!(text.code.unwrap().to_string(), "1234");
    }

    #[test]
    fn test_pay_at_property_taxes_become_fees() {
        let room = room(json!([{
            "rateKey": "rk-1", "rateClass": "NOR", "net": "220.00", "allotment": 4, "boardCode": "BB",
            "taxes": {"allIncluded": false, "taxes": [
                {"included": true, "amount": "20.00"},
                {"included": false, "amount": "6.00"}
            ]},
            "cancellationPolicies": [{"amount": "110.00", "from": "2026-11-08T23:59:00+01:00"}]
        }]));
        let plan = rate_plan(&room.rates[0], &room, &stay(2), "EUR", now()).unwrap();

        assert_eq!(plan.total_amount, Decimal::from(226));
        assert_eq!(plan.base_rate, Decimal::from(100));
        assert_eq!(plan.taxes, Decimal::from(10));
        assert_eq!(plan.fees, Decimal::from(6));
        assert!(plan.is_consistent());
        assert!(plan.is_refundable);
        assert_eq!(plan.cancellation_policy.unwrap().refundable_until_hours, Some(190));
        assert_eq!(plan.board_type, BoardType::BedAndBreakfast);
    }

    #[test]
    fn test_nrf_class_overrides_policies() {
        let room = room(json!([{
            "rateKey": "rk-2", "rateClass": "NRF", "net": 150,
            "cancellationPolicies": [{"amount": "150.00", "from": "2026-11-05T00:00:00Z"}]
        }]));
        let plan = rate_plan(&room.rates[0], &room, &stay(1), "EUR", now()).unwrap();
        assert_eq!(plan.rate_type, RateType::NonRefundable);
        assert!(!plan.has_free_cancellation());
    }

    #[test]
    fn test_missing_fields_default_safely() {
        let room = room(json!([{"rateKey": "rk-3", "net": "99.90"}]));
        let plan = rate_plan(&room.rates[0], &room, &stay(3), "EUR", now()).unwrap();
        assert_eq!(plan.available_rooms, 1);
        assert_eq!(plan.rate_type, RateType::NonRefundable);
        assert_eq!(plan.board_type, BoardType::RoomOnly);
        assert!(plan.is_consistent());

        let unpriced = room_without_price();
        assert!(rate_plan(&unpriced.rates[0], &unpriced, &stay(1), "EUR", now()).is_none());
    }

    #[test]
    fn test_out_of_range_daily_offsets_are_dropped() {
        let room = room(json!([{
            "rateKey": "rk-5", "net": "200.00",
            "dailyRates": [
                {"offset": 0, "dailyNet": "100"},
                {"offset": 4294967295u32, "dailyNet": "100"},
                {"offset": 1, "dailyNet": "100"}
            ]
        }]));
        let plan = rate_plan(&room.rates[0], &room, &stay(2), "EUR", now()).unwrap();
        let dates: Vec<_> = plan.nightly_breakdown.iter().map(|n| n.date).collect();
        assert_eq!(dates, vec![stay(2).check_in, stay(2).check_in + Duration::days(1)]);
    }

    #[test]
    fn test_summary_skips_sold_out_rates() {
        let hotel: MeridianHotel = serde_json::from_value(json!({
            "code": 77, "name": "Baixa Lofts",
            "rooms": [
                {"code": "DBL", "rates": [{"rateKey": "gone", "net": "90", "allotment": 0}]},
                {"code": "TWN", "rates": [{"rateKey": "open", "net": "130", "allotment": 3}]}
            ]
        }))
        .unwrap();
        let open = summary(&hotel, &stay(1)).unwrap();
        assert_eq!(open.cheapest_rate_plan_id.as_deref(), Some("open"));
        assert_eq!(open.starting_price, Decimal::from(130));
    }

    #[test]
    fn test_checked_rate_matches_key_across_rooms() {
        let hotel: MeridianHotel = serde_json::from_value(json!({"rooms": [
            {"code": "SGL", "rates": [{"rateKey": "rk-a", "net": "80"}]},
            {"code": "DBL", "rates": [{"rateKey": "rk-b", "net": "120"}, {"rateKey": "rk-c", "net": "140"}]}
        ]}))
        .unwrap();
        let (room, rate) = checked_rate(&hotel, "rk-c").unwrap();
        assert_eq!(room.code.as_deref(), Some("DBL"));
        assert_eq!(rate.rate_key.as_deref(), Some("rk-c"));
        assert!(checked_rate(&hotel, "rk-z").is_none());

        let rekeyed: MeridianHotel =
            serde_json::from_value(json!({"rooms": [{"rates": [{"rateKey": "rk-new", "net": "80"}]}]})).unwrap();
        assert_eq!(checked_rate(&rekeyed, "rk-old").unwrap().1.rate_key.as_deref(), Some("rk-new"));
    }

    #[test]
    fn test_checked_stay_at_calendar_end_does_not_overflow() {
        let hotel: MeridianHotel = serde_json::from_value(json!({"code": 1})).unwrap();
        let hotel = MeridianHotel { check_in: Some(NaiveDate::MAX), ..hotel };
        let rate: MeridianRate = serde_json::from_value(json!({"rateKey": "rk-6"})).unwrap();
        let checked = checked_stay(&hotel, &rate, NaiveDate::from_ymd_opt(2026, 11, 1).unwrap());
        assert_eq!(checked.check_in, NaiveDate::MAX);
        assert_eq!(checked.check_out, NaiveDate::MAX);
    }

    fn room_without_price() -> MeridianRoom {
        room(json!([{"rateKey": "rk-4"}]))
    }

    #[test]
    fn test_summary_picks_cheapest_rate() {
        let hotel: MeridianHotel = serde_json::from_value(json!({
            "code": 77, "name": "Chiado Suites", "categoryCode": "5EST", "destinationName": "Lisbon",
            "latitude": "38.71", "longitude": "-9.14", "currency": "EUR",
            "rooms": [
                {"code": "SUI", "rates": [{"rateKey": "a", "net": "500"}]},
                {"code": "DBL", "rates": [{"rateKey": "b", "net": "300"}]}
            ]
        }))
        .unwrap();
        let summary = summary(&hotel, &stay(2)).unwrap();
        assert_eq!(summary.id, "77");
        assert_eq!(summary.starting_price, Decimal::from(150));
        assert_eq!(summary.cheapest_rate_plan_id.as_deref(), Some("b"));
        assert_eq!(summary.star_rating, 5.0);
        assert!((summary.location.latitude.unwrap() - 38.71).abs() < 1e-9);
    }

    #[test]
    fn test_details_join_content_and_rates() {
        let content: HotelContent = serde_json::from_value(json!({
            "code": "77", "name": "Chiado Suites", "city": "Lisbon",
            "facilities": ["spa"],
            "rooms": [
                {"roomCode": "DBL", "description": "Double", "maxAdults": 2, "maxChildren": 1, "maxPax": 3},
                {"roomCode": "TRP", "description": "Triple", "maxAdults": 3}
            ]
        }))
        .unwrap();
        let live: MeridianHotel = serde_json::from_value(json!({
            "code": 77, "currency": "EUR",
            "rooms": [
                {"code": "DBL", "name": "DOUBLE", "rates": [{"rateKey": "b", "net": "300", "allotment": 2}]},
                {"code": "XTR", "name": "EXTRA", "rates": [{"rateKey": "c", "net": "280", "adults": 2, "children": 0, "allotment": 1}]}
            ]
        }))
        .unwrap();

        let details = details(&content, Some(&live), &stay(2), now()).unwrap();
        assert_eq!(details.room_types.len(), 3);
        assert_eq!(details.room_types[0].rate_plans.len(), 1);
        assert!(details.room_types[1].rate_plans.is_empty());
        assert_eq!(details.room_types[2].id, "XTR");
        assert_eq!(details.summary.cheapest_rate_plan_id.as_deref(), Some("c"));
        assert_eq!(details.summary.starting_price, Decimal::from(140));
    }

    #[test]
    fn test_checked_stay_uses_hotel_dates() {
        let hotel: MeridianHotel =
            serde_json::from_value(json!({"checkIn": "2026-12-01", "checkOut": "2026-12-04"})).unwrap();
        let rate: MeridianRate = serde_json::from_value(json!({"rooms": 2, "adults": 3})).unwrap();
        let stay = checked_stay(&hotel, &rate, NaiveDate::from_ymd_opt(2026, 11, 1).unwrap());
        assert_eq!(stay.nights(), 3);
        assert_eq!((stay.rooms, stay.adults), (2, 3));
    }
}
