use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::hotel::{HotelDetails, HotelSummary, RatePlan};
use crate::search::{StayQuery, SupplierSearchParams};
use crate::{CoreError, CoreResult};

/// Inventory source identifier.
///
/// `Atlas` signs every request with a keyed hash, `Meridian` uses HTTP
/// Basic credentials, `Local` reads the application's own database.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplierCode {
    Local,
    Atlas,
    Meridian,
}

impl SupplierCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplierCode::Local => "LOCAL",
            SupplierCode::Atlas => "ATLAS",
            SupplierCode::Meridian => "MERIDIAN",
        }
    }
}

impl fmt::Display for SupplierCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupplierCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOCAL" => Ok(SupplierCode::Local),
            "ATLAS" => Ok(SupplierCode::Atlas),
            "MERIDIAN" => Ok(SupplierCode::Meridian),
            other => Err(CoreError::ValidationError(format!("Unknown supplier code: {}", other))),
        }
    }
}

/// How an upstream failure should be handled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClass {
    /// Timeouts, connection resets, 5xx. Degrade to empty results.
    Transient,
    /// Authentication or quota exhaustion. Fall back to local inventory.
    Quota,
    /// Anything else (bad request, undecodable payload). Degrade to empty results.
    Fatal,
}

/// Capability contract implemented by every inventory source.
///
/// Implementations absorb upstream failures: `search` returns an empty list
/// and lookups return `None` rather than surfacing errors to the caller.
#[async_trait]
pub trait SupplierAdapter: Send + Sync {
    fn code(&self) -> SupplierCode;

    async fn search(&self, params: &SupplierSearchParams) -> Vec<HotelSummary>;

    /// Full hotel content with rates priced for `stay` (tomorrow, one night, when absent).
    async fn get_hotel_details(&self, hotel_id: &str, stay: Option<&StayQuery>) -> Option<HotelDetails>;

    /// Standalone rate lookup; suppliers that can only re-verify a rate inside a
    /// hotel lookup return `None` unconditionally.
    async fn get_rate_plan(&self, rate_plan_id: &str) -> Option<RatePlan>;
}

/// Result of re-confirming a quoted rate with its supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateCheck {
    pub available: bool,
    pub current_price: Option<Decimal>,
    pub currency: Option<String>,
    pub price_changed: bool,
}

/// Pre-payment rate confirmation offered by remote suppliers.
#[async_trait]
pub trait RateConfirmation: Send + Sync {
    /// `rate_ref` is the supplier's handle (book hash, rate key).
    async fn confirm_rate(&self, rate_ref: &str, quoted_amount: Decimal) -> CoreResult<RateCheck>;
}
