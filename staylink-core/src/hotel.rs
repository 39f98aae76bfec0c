use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing;
use crate::supplier::SupplierCode;

// ============================================================================
// Rate plan enumerations
// ============================================================================

/// Meal arrangement included with a rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoardType {
    #[default]
    RoomOnly,
    BedAndBreakfast,
    HalfBoard,
    FullBoard,
    AllInclusive,
}

impl BoardType {
    /// Parses the canonical string form used by local inventory rows.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "ROOM_ONLY" => Some(BoardType::RoomOnly),
            "BED_AND_BREAKFAST" => Some(BoardType::BedAndBreakfast),
            "HALF_BOARD" => Some(BoardType::HalfBoard),
            "FULL_BOARD" => Some(BoardType::FullBoard),
            "ALL_INCLUSIVE" => Some(BoardType::AllInclusive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateType {
    Standard,
    #[default]
    NonRefundable,
    Promotional,
    Flexible,
    Corporate,
    Package,
}

impl RateType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "STANDARD" => Some(RateType::Standard),
            "NON_REFUNDABLE" => Some(RateType::NonRefundable),
            "PROMOTIONAL" => Some(RateType::Promotional),
            "FLEXIBLE" => Some(RateType::Flexible),
            "CORPORATE" => Some(RateType::Corporate),
            "PACKAGE" => Some(RateType::Package),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    #[default]
    Prepaid,
    PayAtHotel,
    Deposit,
    CreditLimit,
}

impl PaymentType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "PREPAID" => Some(PaymentType::Prepaid),
            "PAY_AT_HOTEL" => Some(PaymentType::PayAtHotel),
            "DEPOSIT" => Some(PaymentType::Deposit),
            "CREDIT_LIMIT" => Some(PaymentType::CreditLimit),
            _ => None,
        }
    }
}

// ============================================================================
// Add-ons and policies
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddOnPricing {
    #[default]
    PerStay,
    PerNight,
    PerGuest,
    PerGuestPerNight,
}

impl AddOnPricing {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "PER_STAY" => Some(AddOnPricing::PerStay),
            "PER_NIGHT" => Some(AddOnPricing::PerNight),
            "PER_GUEST" => Some(AddOnPricing::PerGuest),
            "PER_GUEST_PER_NIGHT" => Some(AddOnPricing::PerGuestPerNight),
            _ => None,
        }
    }
}

/// Optional or bundled extra (parking, breakfast upgrade, airport transfer).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddOn {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub pricing: AddOnPricing,
    /// Bundled with the rate at no extra cost.
    pub included: bool,
}

impl AddOn {
    /// Charge for `quantity` units of this add-on over a stay.
    pub fn total_for(&self, quantity: u32, nights: u32, guests: u32) -> Decimal {
        if self.included {
            return Decimal::ZERO;
        }
        let units = match self.pricing {
            AddOnPricing::PerStay => 1,
            AddOnPricing::PerNight => nights,
            AddOnPricing::PerGuest => guests,
            AddOnPricing::PerGuestPerNight => guests.saturating_mul(nights),
        };
        self.price * Decimal::from(units) * Decimal::from(quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CancellationPolicy {
    pub name: String,
    pub description: Option<String>,
    /// Whole hours from now until free cancellation ends; `None` when no deadline exists.
    pub refundable_until_hours: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NightlyPrice {
    pub date: NaiveDate,
    pub amount: Decimal,
}

// ============================================================================
// Rate plan
// ============================================================================

/// The canonical priced offer every supplier normalizes into.
///
/// `base_rate` and `taxes` are per room per night, `fees` per room per stay.
/// `total_amount` is the amount charged for `nights` x `rooms`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatePlan {
    pub id: String,
    pub supplier: SupplierCode,
    pub name: String,
    pub board_type: BoardType,
    pub rate_type: RateType,
    pub payment_type: PaymentType,
    pub is_refundable: bool,
    pub currency: String,
    pub base_rate: Decimal,
    pub taxes: Decimal,
    pub fees: Decimal,
    pub total_amount: Decimal,
    pub nights: u32,
    pub rooms: u32,
    #[serde(default)]
    pub nightly_breakdown: Vec<NightlyPrice>,
    pub available_rooms: u32,
    pub cancellation_policy: Option<CancellationPolicy>,
    #[serde(default)]
    pub add_ons: Vec<AddOn>,
    /// Supplier handle needed to re-confirm this rate (book hash, rate key).
    pub booking_ref: Option<String>,
}

impl RatePlan {
    /// `base*n*r + taxes*n*r + fees*r` for the stay this plan was priced for.
    pub fn component_total(&self) -> Decimal {
        pricing::stay_total(self.base_rate, self.taxes, self.fees, self.nights, self.rooms)
    }

    /// Components and total agree to the cent.
    pub fn is_consistent(&self) -> bool {
        pricing::round_money(self.component_total()) == pricing::round_money(self.total_amount)
    }

    /// All-in price for one room for one night.
    pub fn nightly_room_price(&self) -> Decimal {
        pricing::per_room_night(self.total_amount, self.nights, self.rooms)
    }

    pub fn has_free_cancellation(&self) -> bool {
        self.is_refundable
            && self
                .cancellation_policy
                .as_ref()
                .map(|policy| policy.refundable_until_hours.map_or(true, |hours| hours > 0))
                .unwrap_or(true)
    }
}

// ============================================================================
// Rooms and hotels
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomType {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub max_adults: u32,
    pub max_children: u32,
    pub max_occupancy: u32,
    pub size_sqm: Option<f32>,
    pub view: Option<String>,
    pub rate_plans: Vec<RatePlan>,
}

impl RoomType {
    pub fn fits(&self, adults: u32, children: u32, rooms: u32) -> bool {
        let rooms = rooms.max(1);
        adults <= self.max_adults.saturating_mul(rooms)
            && children <= self.max_children.saturating_mul(rooms)
            && adults.saturating_add(children) <= self.max_occupancy.saturating_mul(rooms)
    }

    pub fn cheapest_rate_plan(&self) -> Option<&RatePlan> {
        self.rate_plans
            .iter()
            .filter(|plan| plan.available_rooms > 0)
            .min_by(|a, b| a.nightly_room_price().cmp(&b.nightly_room_price()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub city: String,
    pub country: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HotelSummary {
    pub id: String,
    pub slug: String,
    pub supplier: SupplierCode,
    pub name: String,
    pub location: Location,
    pub star_rating: f32,
    pub review_score: Option<f32>,
    pub review_count: u32,
    pub currency: String,
    /// Cheapest all-in price per room per night for the searched stay.
    pub starting_price: Decimal,
    pub cheapest_rate_plan_id: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HotelDetails {
    #[serde(flatten)]
    pub summary: HotelSummary,
    pub description: Option<String>,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub add_ons: Vec<AddOn>,
    pub room_types: Vec<RoomType>,
}

impl HotelDetails {
    pub fn find_room(&self, room_type_id: &str) -> Option<&RoomType> {
        self.room_types.iter().find(|room| room.id == room_type_id)
    }

    pub fn find_rate_plan(&self, rate_plan_id: &str) -> Option<(&RoomType, &RatePlan)> {
        self.room_types.iter().find_map(|room| {
            room.rate_plans
                .iter()
                .find(|plan| plan.id == rate_plan_id)
                .map(|plan| (room, plan))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(total: i64, nights: u32, rooms: u32, available: u32) -> RatePlan {
        let total = Decimal::from(total);
        RatePlan {
            id: format!("rp-{}", total),
            supplier: SupplierCode::Local,
            name: "Standard".to_string(),
            board_type: BoardType::RoomOnly,
            rate_type: RateType::Standard,
            payment_type: PaymentType::Prepaid,
            is_refundable: true,
            currency: "EUR".to_string(),
            base_rate: total / Decimal::from(nights * rooms),
            taxes: Decimal::ZERO,
            fees: Decimal::ZERO,
            total_amount: total,
            nights,
            rooms,
            nightly_breakdown: vec![],
            available_rooms: available,
            cancellation_policy: None,
            add_ons: vec![],
            booking_ref: None,
        }
    }

    #[test]
    fn test_add_on_totals_by_pricing_mode() {
        let mut add_on = AddOn {
            id: "breakfast".to_string(),
            name: "Breakfast".to_string(),
            description: None,
            price: Decimal::new(1500, 2),
            currency: "EUR".to_string(),
            pricing: AddOnPricing::PerGuestPerNight,
            included: false,
        };
        assert_eq!(add_on.total_for(1, 3, 2), Decimal::new(9000, 2));

        add_on.pricing = AddOnPricing::PerStay;
        assert_eq!(add_on.total_for(2, 3, 2), Decimal::new(3000, 2));

        add_on.included = true;
        assert_eq!(add_on.total_for(2, 3, 2), Decimal::ZERO);
    }

    #[test]
    fn test_room_capacity_scales_with_rooms() {
        let room = RoomType {
            id: "dbl".to_string(),
            name: "Double".to_string(),
            description: None,
            max_adults: 2,
            max_children: 1,
            max_occupancy: 3,
            size_sqm: None,
            view: None,
            rate_plans: vec![],
        };
        assert!(room.fits(2, 1, 1));
        assert!(!room.fits(3, 0, 1));
        assert!(room.fits(4, 2, 2));
        assert!(!room.fits(u32::MAX, u32::MAX, u32::MAX));
    }

    #[test]
    fn test_cheapest_rate_plan_skips_sold_out() {
        let room = RoomType {
            id: "dbl".to_string(),
            name: "Double".to_string(),
            description: None,
            max_adults: 2,
            max_children: 0,
            max_occupancy: 2,
            size_sqm: None,
            view: None,
            rate_plans: vec![plan(100, 1, 1, 0), plan(150, 1, 1, 2), plan(120, 1, 1, 1)],
        };
        assert_eq!(room.cheapest_rate_plan().unwrap().total_amount, Decimal::from(120));
    }

    #[test]
    fn test_inclusive_total_is_consistent() {
        let plan = plan(100, 3, 1, 1);
        assert!(plan.is_consistent());
    }

    #[test]
    fn test_enum_codes_parse() {
        assert_eq!(BoardType::from_code("half_board"), Some(BoardType::HalfBoard));
        assert_eq!(RateType::from_code("FLEXIBLE"), Some(RateType::Flexible));
        assert_eq!(PaymentType::from_code("pay_at_hotel"), Some(PaymentType::PayAtHotel));
        assert_eq!(AddOnPricing::from_code("nope"), None);
    }
}
