//! Money arithmetic shared by every adapter.
//!
//! Rate components are per room per night (`base_rate`, `taxes`) and per
//! room per stay (`fees`). Suppliers usually report stay-level totals, so
//! adapters go through [`PriceComponents::from_stay_totals`] to split them.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `base*n*r + taxes*n*r + fees*r`
pub fn stay_total(base_rate: Decimal, taxes: Decimal, fees: Decimal, nights: u32, rooms: u32) -> Decimal {
    let room_nights = Decimal::from(nights) * Decimal::from(rooms);
    base_rate * room_nights + taxes * room_nights + fees * Decimal::from(rooms)
}

/// Average all-in price of one room for one night, rounded to cents.
pub fn per_room_night(total: Decimal, nights: u32, rooms: u32) -> Decimal {
    let units = Decimal::from(nights.max(1)) * Decimal::from(rooms.max(1));
    round_money(total / units)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceComponents {
    pub base_rate: Decimal,
    pub taxes: Decimal,
    pub fees: Decimal,
    pub total_amount: Decimal,
}

impl PriceComponents {
    /// Splits stay-level totals into per-unit components.
    ///
    /// `total_amount` is the exact sum of the three inputs; the per-unit
    /// components keep full decimal precision so they multiply back to it.
    pub fn from_stay_totals(
        base_total: Decimal,
        tax_total: Decimal,
        fee_total: Decimal,
        nights: u32,
        rooms: u32,
    ) -> Self {
        let nights = nights.max(1);
        let rooms = rooms.max(1);
        let room_nights = Decimal::from(nights) * Decimal::from(rooms);
        Self {
            base_rate: (base_total / room_nights).normalize(),
            taxes: (tax_total / room_nights).normalize(),
            fees: (fee_total / Decimal::from(rooms)).normalize(),
            total_amount: base_total + tax_total + fee_total,
        }
    }

    /// Supplier quoted a single inclusive figure: everything folds into the base rate.
    pub fn from_inclusive_total(total: Decimal, nights: u32, rooms: u32) -> Self {
        Self::from_stay_totals(total, Decimal::ZERO, Decimal::ZERO, nights, rooms)
    }

    /// Per-unit components are already known (local inventory).
    pub fn from_unit_rates(base_rate: Decimal, taxes: Decimal, fees: Decimal, nights: u32, rooms: u32) -> Self {
        Self {
            base_rate,
            taxes,
            fees,
            total_amount: stay_total(base_rate, taxes, fees, nights, rooms),
        }
    }
}

/// Whole hours until a free-cancellation deadline, clamped at zero.
pub fn refundable_until_hours(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    deadline.map(|deadline| (deadline - now).num_hours().max(0))
}

/// Relative difference `|current - quoted| / quoted`; `None` when quoted is not positive.
pub fn relative_drift(quoted: Decimal, current: Decimal) -> Option<Decimal> {
    if quoted <= Decimal::ZERO {
        return None;
    }
    Some((current - quoted).abs() / quoted)
}
