//! Time-tiered cancellation and refund rules.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use staylink_core::pricing::round_money;
use staylink_core::repository::BookingStatus;
use staylink_store::app_config::BusinessRules;

#[derive(Debug, Clone, PartialEq)]
pub struct RefundTiers {
    pub full_refund_hours: i64,
    pub partial_refund_hours: i64,
    pub partial_refund_percent: Decimal,
}

impl From<&BusinessRules> for RefundTiers {
    fn from(rules: &BusinessRules) -> Self {
        Self {
            full_refund_hours: rules.full_refund_hours,
            partial_refund_hours: rules.partial_refund_hours,
            partial_refund_percent: rules.partial_refund_percent,
        }
    }
}

impl Default for RefundTiers {
    fn default() -> Self {
        Self::from(&BusinessRules::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CancellationInput {
    pub status: BookingStatus,
    pub check_in: DateTime<Utc>,
    pub is_free_cancellation: bool,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CancellationEligibility {
    pub can_cancel: bool,
    pub reason: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub hours_until_check_in: i64,
    pub is_free_cancellation: bool,
    pub total_amount: Decimal,
}

/// Check-in date at the configured hour, UTC.
pub fn check_in_instant(date: NaiveDate, hour_utc: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour_utc.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time).and_utc()
}

/// Decides whether a booking can be cancelled at `now` and how much is refunded.
///
/// Pure: no I/O, the same inputs always give the same answer.
pub fn evaluate(input: &CancellationInput, now: DateTime<Utc>, tiers: &RefundTiers) -> CancellationEligibility {
    let remaining = input.check_in - now;
    let eligibility = |can_cancel: bool, reason: &str, refund: Option<Decimal>| CancellationEligibility {
        can_cancel,
        reason: Some(reason.to_string()),
        refund_amount: refund,
        hours_until_check_in: remaining.num_hours().max(0),
        is_free_cancellation: input.is_free_cancellation,
        total_amount: input.total_amount,
    };

    match input.status {
        BookingStatus::Cancelled => return eligibility(false, "Booking is already cancelled", None),
        BookingStatus::Completed => return eligibility(false, "Booking has already been completed", None),
        BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Failed => {}
    }

    if remaining <= Duration::zero() {
        return eligibility(false, "Cancellation is not possible after check-in", None);
    }

    if !input.is_free_cancellation {
        return eligibility(true, "Non-refundable rate: cancelling will not refund any amount", Some(Decimal::ZERO));
    }

    if remaining >= Duration::hours(tiers.full_refund_hours) {
        return eligibility(true, "Free cancellation: full refund", Some(round_money(input.total_amount)));
    }

    if remaining >= Duration::hours(tiers.partial_refund_hours) {
        let refund = round_money(input.total_amount * tiers.partial_refund_percent / Decimal::ONE_HUNDRED);
        let reason = format!("Late cancellation: {}% refund", tiers.partial_refund_percent.normalize());
        return eligibility(true, &reason, Some(refund));
    }

    eligibility(true, "Very late cancellation: no refund", Some(Decimal::ZERO))
}
