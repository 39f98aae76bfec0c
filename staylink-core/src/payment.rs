use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub booking_id: Uuid,
    pub payment_reference: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundReceipt {
    pub id: String, // Provider's refund ID (e.g., re_123)
    pub booking_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub status: RefundStatus,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait RefundGateway: Send + Sync {
    /// Request a refund of a captured payment
    async fn refund(
        &self,
        request: &RefundRequest,
    ) -> Result<RefundReceipt, Box<dyn std::error::Error + Send + Sync>>;
}

/// Gateway used when no payment processor is wired in; records the request and reports it pending.
pub struct LoggingRefundGateway;

#[async_trait]
impl RefundGateway for LoggingRefundGateway {
    async fn refund(
        &self,
        request: &RefundRequest,
    ) -> Result<RefundReceipt, Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(
            booking_id = %request.booking_id,
            amount = %request.amount,
            currency = %request.currency,
            "Refund requested without a payment processor; leaving it pending"
        );

        Ok(RefundReceipt {
            id: format!("re_{}", Uuid::new_v4().simple()),
            booking_id: request.booking_id,
            amount: request.amount,
            currency: request.currency.clone(),
            status: RefundStatus::Pending,
            created_at: Utc::now(),
        })
    }
}
