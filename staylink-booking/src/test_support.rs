//! In-memory booking store and refund gateway for tests.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use staylink_core::payment::{RefundGateway, RefundReceipt, RefundRequest, RefundStatus};
use staylink_core::repository::{ActivityEntry, BookingRecord, BookingRepository, BookingStatus};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

type RepoResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A confirmed booking for one night from `check_in`.
pub fn booking(check_in: NaiveDate, is_free_cancellation: bool, total_amount: Decimal) -> BookingRecord {
    let id = Uuid::new_v4();
    BookingRecord {
        id,
        reference: format!("SL-{}", &id.simple().to_string()[..8].to_ascii_uppercase()),
        status: BookingStatus::Confirmed,
        check_in,
        check_out: check_in + chrono::Duration::days(1),
        is_free_cancellation,
        total_amount,
        currency: "EUR".to_string(),
        payment_reference: Some(format!("pi_{}", id.simple())),
    }
}

#[derive(Default)]
pub struct InMemoryBookings {
    bookings: Mutex<HashMap<Uuid, BookingRecord>>,
    activity: Mutex<Vec<ActivityEntry>>,
}

impl InMemoryBookings {
    pub fn with(records: Vec<BookingRecord>) -> Self {
        Self {
            bookings: Mutex::new(records.into_iter().map(|b| (b.id, b)).collect()),
            activity: Mutex::new(Vec::new()),
        }
    }

    pub fn status_of(&self, id: Uuid) -> Option<BookingStatus> {
        self.bookings.lock().unwrap().get(&id).map(|b| b.status)
    }

    pub fn activity(&self) -> Vec<ActivityEntry> {
        self.activity.lock().unwrap().clone()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookings {
    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<BookingRecord>> {
        Ok(self.bookings.lock().unwrap().get(&id).cloned())
    }

    async fn transition_booking_status(&self, id: Uuid, from: BookingStatus, to: BookingStatus) -> RepoResult<bool> {
        let mut bookings = self.bookings.lock().unwrap();
        match bookings.get_mut(&id) {
            Some(booking) if booking.status == from => {
                booking.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_activity(&self, entry: &ActivityEntry) -> RepoResult<()> {
        self.activity.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// Refund gateway that records every request; `failing()` rejects them all.
#[derive(Default)]
pub struct RecordingRefundGateway {
    requests: Mutex<Vec<RefundRequest>>,
    fail: bool,
    delay: Option<Duration>,
}

impl RecordingRefundGateway {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Holds every refund for `delay` before answering.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<RefundRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RefundGateway for RecordingRefundGateway {
    async fn refund(&self, request: &RefundRequest) -> RepoResult<RefundReceipt> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err("payment processor unavailable".into());
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(RefundReceipt {
            id: format!("re_{}", self.requests.lock().unwrap().len()),
            booking_id: request.booking_id,
            amount: request.amount,
            currency: request.currency.clone(),
            status: RefundStatus::Succeeded,
            created_at: Utc::now(),
        })
    }
}
