use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use staylink_core::payment::{RefundGateway, RefundReceipt, RefundRequest};
use staylink_core::repository::{ActivityEntry, BookingRecord, BookingRepository, BookingStatus};
use staylink_store::app_config::BusinessRules;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cancellation::{self, CancellationEligibility, CancellationInput, RefundTiers};

#[derive(Debug, thiserror::Error)]
pub enum CancellationError {
    #[error("Booking not found: {0}")]
    NotFound(Uuid),

    #[error("Booking cannot be cancelled: {0}")]
    NotCancellable(String),

    #[error("Refund failed: {0}")]
    RefundFailed(String),

    #[error("Booking store failed: {0}")]
    Persistence(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationOutcome {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub eligibility: CancellationEligibility,
    pub refund: Option<RefundReceipt>,
}

/// Runs a cancellation end to end: evaluate, refund, persist.
pub struct CancellationOrchestrator {
    bookings: Arc<dyn BookingRepository>,
    refunds: Arc<dyn RefundGateway>,
    tiers: RefundTiers,
    check_in_hour_utc: u32,
}

impl CancellationOrchestrator {
    pub fn new(bookings: Arc<dyn BookingRepository>, refunds: Arc<dyn RefundGateway>, rules: &BusinessRules) -> Self {
        Self {
            bookings,
            refunds,
            tiers: RefundTiers::from(rules),
            check_in_hour_utc: rules.check_in_hour_utc,
        }
    }

    /// Eligibility of a stored booking at `now`, without side effects
    pub async fn eligibility(&self, booking_id: Uuid, now: DateTime<Utc>) -> Result<CancellationEligibility, CancellationError> {
        let booking = self.load(booking_id).await?;
        Ok(self.evaluate(&booking, now))
    }

    /// Cancel a booking, refunding whatever the tiers allow.
    ///
    /// The booking is claimed as cancelled before any refund is requested, so only
    /// one of several concurrent cancels reaches the gateway. A failed refund puts
    /// the previous status back so the guest can retry.
    pub async fn cancel(
        &self,
        booking_id: Uuid,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<CancellationOutcome, CancellationError> {
        let booking = self.load(booking_id).await?;
        let eligibility = self.evaluate(&booking, now);

        if !eligibility.can_cancel {
            return Err(CancellationError::NotCancellable(
                eligibility.reason.unwrap_or_else(|| "not cancellable".to_string()),
            ));
        }

        let claimed = self
            .bookings
            .transition_booking_status(booking_id, booking.status, BookingStatus::Cancelled)
            .await
            .map_err(|e| CancellationError::Persistence(e.to_string()))?;
        if !claimed {
            return Err(CancellationError::NotCancellable(
                "booking status changed while cancelling".to_string(),
            ));
        }

        let refund_amount = eligibility.refund_amount.unwrap_or(Decimal::ZERO);
        let refund = if refund_amount > Decimal::ZERO {
            let request = RefundRequest {
                booking_id,
                payment_reference: booking.payment_reference.clone(),
                amount: refund_amount,
                currency: booking.currency.clone(),
                reason: eligibility.reason.clone().unwrap_or_default(),
            };
            match self.refunds.refund(&request).await {
                Ok(receipt) => Some(receipt),
                Err(e) => {
                    self.release(booking_id, booking.status).await;
                    return Err(CancellationError::RefundFailed(e.to_string()));
                }
            }
        } else {
            None
        };

        let entry = ActivityEntry {
            booking_id,
            action: "CANCELLED".to_string(),
            detail: serde_json::json!({
                "reason": reason,
                "policy": eligibility.reason,
                "refundAmount": refund_amount,
                "refundId": refund.as_ref().map(|r| r.id.clone()),
                "hoursUntilCheckIn": eligibility.hours_until_check_in,
            }),
            created_at: now,
        };
        // Best effort, the status change is already stored
        if let Err(e) = self.bookings.record_activity(&entry).await {
            warn!(booking_id = %booking_id, error = %e, "Failed to record cancellation activity");
        }

        info!(
            booking_id = %booking_id,
            reference = %booking.reference,
            refund_amount = %refund_amount,
            "Booking cancelled"
        );

        Ok(CancellationOutcome {
            booking_id,
            status: BookingStatus::Cancelled,
            eligibility,
            refund,
        })
    }

    async fn release(&self, booking_id: Uuid, previous: BookingStatus) {
        match self
            .bookings
            .transition_booking_status(booking_id, BookingStatus::Cancelled, previous)
            .await
        {
            Ok(true) => {}
            Ok(false) => error!(booking_id = %booking_id, "Booking left its cancelled claim before the refund failure was rolled back"),
            Err(e) => error!(booking_id = %booking_id, error = %e, "Failed to restore booking after refund failure"),
        }
    }

    async fn load(&self, booking_id: Uuid) -> Result<BookingRecord, CancellationError> {
        self.bookings
            .get_booking(booking_id)
            .await
            .map_err(|e| CancellationError::Persistence(e.to_string()))?
            .ok_or(CancellationError::NotFound(booking_id))
    }

    fn evaluate(&self, booking: &BookingRecord, now: DateTime<Utc>) -> CancellationEligibility {
        let input = CancellationInput {
            status: booking.status,
            check_in: cancellation::check_in_instant(booking.check_in, self.check_in_hour_utc),
            is_free_cancellation: booking.is_free_cancellation,
            total_amount: booking.total_amount,
        };
        cancellation::evaluate(&input, now, &self.tiers)
    }
}
