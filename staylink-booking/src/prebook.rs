//! Pre-payment rate confirmation.
//!
//! Re-checks a quoted rate with its supplier right before the guest pays and
//! decides whether the current supplier price is close enough to the quote.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use staylink_catalog::SupplierRegistry;
use staylink_core::pricing::{relative_drift, round_money};
use staylink_core::{CoreError, CoreResult, SupplierCode};
use staylink_store::app_config::BusinessRules;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrebookRequest {
    pub supplier_code: SupplierCode,
    #[serde(default)]
    pub rate_plan_id: Option<String>,
    #[serde(default)]
    pub book_hash: Option<String>,
    #[serde(default)]
    pub rate_key: Option<String>,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub hotel_id: String,
}

impl PrebookRequest {
    /// The identifier the supplier of record understands.
    pub fn rate_ref(&self) -> CoreResult<&str> {
        let (field, value) = match self.supplier_code {
            SupplierCode::Local => ("ratePlanId", &self.rate_plan_id),
            SupplierCode::Atlas => ("bookHash", &self.book_hash),
            SupplierCode::Meridian => ("rateKey", &self.rate_key),
        };
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CoreError::ValidationError(format!("{} is required for {} prebook", field, self.supplier_code)))
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.hotel_id.trim().is_empty() {
            return Err(CoreError::ValidationError("hotelId is required".to_string()));
        }
        if self.total_amount <= Decimal::ZERO {
            return Err(CoreError::ValidationError("totalAmount must be positive".to_string()));
        }
        if self.currency.trim().is_empty() {
            return Err(CoreError::ValidationError("currency is required".to_string()));
        }
        self.rate_ref().map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrebookOutcome {
    Confirmed {
        price: Decimal,
        currency: String,
        price_changed: bool,
    },
    /// Supplier price moved beyond tolerance; the guest must re-confirm.
    PriceDrift {
        quoted: Decimal,
        current: Decimal,
        currency: String,
    },
    Unavailable {
        reason: String,
    },
    SupplierFailure {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrebookResponse {
    pub success: bool,
    pub price_changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&PrebookOutcome> for PrebookResponse {
    fn from(outcome: &PrebookOutcome) -> Self {
        match outcome {
            PrebookOutcome::Confirmed { price, currency, price_changed } => Self {
                success: true,
                price_changed: *price_changed,
                confirmed_price: Some(*price),
                currency: Some(currency.clone()),
                error: None,
            },
            PrebookOutcome::PriceDrift { quoted, current, currency } => Self {
                success: false,
                price_changed: true,
                confirmed_price: Some(*current),
                currency: Some(currency.clone()),
                error: Some(format!(
                    "Price changed from {} to {} {}; please confirm the new price",
                    quoted, current, currency
                )),
            },
            PrebookOutcome::Unavailable { reason } | PrebookOutcome::SupplierFailure { reason } => Self {
                success: false,
                price_changed: false,
                confirmed_price: None,
                currency: None,
                error: Some(reason.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrebookPolicy {
    pub drift_tolerance: Decimal,
    pub test_hotel_prefix: String,
    pub test_hotel_ids: RangeInclusive<u64>,
}

impl PrebookPolicy {
    /// Synthetic inventory never reaches a supplier.
    pub fn is_test_hotel(&self, hotel_id: &str) -> bool {
        let hotel_id = hotel_id.trim();
        (!self.test_hotel_prefix.is_empty() && hotel_id.starts_with(&self.test_hotel_prefix))
            || hotel_id
                .parse::<u64>()
                .is_ok_and(|id| self.test_hotel_ids.contains(&id))
    }
}

impl From<&BusinessRules> for PrebookPolicy {
    fn from(rules: &BusinessRules) -> Self {
        Self {
            drift_tolerance: rules.price_drift_tolerance,
            test_hotel_prefix: rules.test_hotel_prefix.clone(),
            test_hotel_ids: rules.test_hotel_id_min..=rules.test_hotel_id_max,
        }
    }
}

impl Default for PrebookPolicy {
    fn default() -> Self {
        Self::from(&BusinessRules::default())
    }
}

pub struct PrebookValidator {
    registry: Arc<SupplierRegistry>,
    policy: PrebookPolicy,
}

impl PrebookValidator {
    pub fn new(registry: Arc<SupplierRegistry>, policy: PrebookPolicy) -> Self {
        Self { registry, policy }
    }

    /// Errors only for invalid input; supplier trouble is an outcome.
    pub async fn validate(&self, request: &PrebookRequest) -> CoreResult<PrebookOutcome> {
        request.validate()?;
        let rate_ref = request.rate_ref()?;
        let quoted = round_money(request.total_amount);

        if self.policy.is_test_hotel(&request.hotel_id) {
            info!(hotel_id = %request.hotel_id, "Synthetic hotel, confirming quoted price");
            return Ok(confirmed_as_quoted(quoted, &request.currency));
        }

        if request.supplier_code == SupplierCode::Local {
            return Ok(confirmed_as_quoted(quoted, &request.currency));
        }

        let Some(confirmation) = self.registry.rate_confirmation(request.supplier_code) else {
            warn!(supplier = %request.supplier_code, "Prebook requested for a supplier that is not configured");
            return Ok(PrebookOutcome::SupplierFailure {
                reason: format!("{} is not available for booking right now", request.supplier_code),
            });
        };

        let check = match confirmation.confirm_rate(rate_ref, quoted).await {
            Ok(check) => check,
            Err(e) => {
                warn!(supplier = %request.supplier_code, hotel_id = %request.hotel_id, error = %e, "Prebook supplier call failed");
                return Ok(PrebookOutcome::SupplierFailure {
                    reason: format!("Could not confirm the rate with {}: {}", request.supplier_code, e),
                });
            }
        };

        if !check.available {
            info!(supplier = %request.supplier_code, hotel_id = %request.hotel_id, "Rate no longer available");
            return Ok(PrebookOutcome::Unavailable {
                reason: "This rate is no longer available, please pick another option".to_string(),
            });
        }

        let currency = check.currency.clone().unwrap_or_else(|| request.currency.clone());
        if !check.price_changed {
            return Ok(PrebookOutcome::Confirmed {
                price: quoted,
                currency,
                price_changed: false,
            });
        }

        let Some(current) = check.current_price.map(round_money) else {
            return Ok(PrebookOutcome::SupplierFailure {
                reason: format!("{} reported a price change without a price", request.supplier_code),
            });
        };

        let drift = relative_drift(quoted, current).unwrap_or(Decimal::MAX);
        if drift > self.policy.drift_tolerance {
            info!(
                supplier = %request.supplier_code,
                quoted = %quoted,
                current = %current,
                "Price drift beyond tolerance"
            );
            return Ok(PrebookOutcome::PriceDrift { quoted, current, currency });
        }

        Ok(PrebookOutcome::Confirmed {
            price: current,
            currency,
            price_changed: current != quoted,
        })
    }
}

fn confirmed_as_quoted(quoted: Decimal, currency: &str) -> PrebookOutcome {
    PrebookOutcome::Confirmed {
        price: quoted,
        currency: currency.to_string(),
        price_changed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staylink_catalog::test_support::{ScriptedAdapter, ScriptedConfirmation};
    use staylink_core::{ErrorClass, RateCheck};

    fn request(supplier: SupplierCode, amount: Decimal) -> PrebookRequest {
        PrebookRequest {
            supplier_code: supplier,
            rate_plan_id: Some("rp-1".to_string()),
            book_hash: Some("bh-1".to_string()),
            rate_key: Some("rk-1".to_string()),
            total_amount: amount,
            currency: "EUR".to_string(),
            hotel_id: "hotel-1".to_string(),
        }
    }

    fn validator_with(code: SupplierCode, confirmation: Arc<ScriptedConfirmation>) -> PrebookValidator {
        let mut registry = SupplierRegistry::new(Arc::new(ScriptedAdapter::new(SupplierCode::Local)));
        registry.register_confirmation(code, confirmation);
        PrebookValidator::new(Arc::new(registry), PrebookPolicy::default())
    }

    #[tokio::test]
    async fn test_drift_within_tolerance_uses_supplier_price() {
        let validator = validator_with(SupplierCode::Atlas, ScriptedConfirmation::available_at(Decimal::new(10499, 2)));
        let outcome = validator.validate(&request(SupplierCode::Atlas, Decimal::from(100))).await.unwrap();
        assert_eq!(
            outcome,
            PrebookOutcome::Confirmed {
                price: Decimal::new(10499, 2),
                currency: "EUR".to_string(),
                price_changed: true,
            }
        );
    }

    #[tokio::test]
    async fn test_drift_beyond_tolerance_is_rejected() {
        let validator = validator_with(SupplierCode::Atlas, ScriptedConfirmation::available_at(Decimal::new(10501, 2)));
        let outcome = validator.validate(&request(SupplierCode::Atlas, Decimal::from(100))).await.unwrap();
        assert!(matches!(outcome, PrebookOutcome::PriceDrift { current, .. } if current == Decimal::new(10501, 2)));

        let response = PrebookResponse::from(&outcome);
        assert!(!response.success);
        assert!(response.price_changed);
        assert_eq!(response.confirmed_price, Some(Decimal::new(10501, 2)));
    }

    #[tokio::test]
    async fn test_exactly_five_percent_is_accepted() {
        let validator = validator_with(SupplierCode::Meridian, ScriptedConfirmation::available_at(Decimal::from(95)));
        let outcome = validator.validate(&request(SupplierCode::Meridian, Decimal::from(100))).await.unwrap();
        assert!(matches!(outcome, PrebookOutcome::Confirmed { price, .. } if price == Decimal::from(95)));
    }

    #[tokio::test]
    async fn test_unchanged_price_echoes_quote() {
        let confirmation = ScriptedConfirmation::new(Ok(RateCheck {
            available: true,
            current_price: Some(Decimal::from(100)),
            currency: None,
            price_changed: false,
        }));
        let validator = validator_with(SupplierCode::Meridian, confirmation.clone());
        let outcome = validator.validate(&request(SupplierCode::Meridian, Decimal::from(100))).await.unwrap();
        assert_eq!(
            outcome,
            PrebookOutcome::Confirmed {
                price: Decimal::from(100),
                currency: "EUR".to_string(),
                price_changed: false,
            }
        );
        assert_eq!(confirmation.calls(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_rate() {
        let confirmation = ScriptedConfirmation::new(Ok(RateCheck {
            available: false,
            current_price: None,
            currency: None,
            price_changed: false,
        }));
        let validator = validator_with(SupplierCode::Atlas, confirmation);
        let outcome = validator.validate(&request(SupplierCode::Atlas, Decimal::from(100))).await.unwrap();
        assert!(matches!(outcome, PrebookOutcome::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_supplier_error_is_never_success() {
        let confirmation = ScriptedConfirmation::new(Err(CoreError::supplier(
            SupplierCode::Atlas,
            ErrorClass::Quota,
            "invalid_auth",
        )));
        let validator = validator_with(SupplierCode::Atlas, confirmation);
        let outcome = validator.validate(&request(SupplierCode::Atlas, Decimal::from(100))).await.unwrap();
        assert!(matches!(outcome, PrebookOutcome::SupplierFailure { reason } if reason.contains("invalid_auth")));

        // Unconfigured supplier
        let validator = validator_with(SupplierCode::Atlas, ScriptedConfirmation::available_at(Decimal::from(100)));
        let outcome = validator.validate(&request(SupplierCode::Meridian, Decimal::from(100))).await.unwrap();
        assert!(matches!(outcome, PrebookOutcome::SupplierFailure { .. }));
    }

    #[tokio::test]
    async fn test_local_and_synthetic_hotels_skip_supplier() {
        let confirmation = ScriptedConfirmation::available_at(Decimal::from(500));
        let validator = validator_with(SupplierCode::Atlas, confirmation.clone());

        let outcome = validator.validate(&request(SupplierCode::Local, Decimal::new(12050, 2))).await.unwrap();
        assert!(matches!(outcome, PrebookOutcome::Confirmed { price, price_changed: false, .. } if price == Decimal::new(12050, 2)));

        for hotel_id in ["test_hotel_lisbon", "8000001", "8999999"] {
            let mut req = request(SupplierCode::Atlas, Decimal::from(100));
            req.hotel_id = hotel_id.to_string();
            let outcome = validator.validate(&req).await.unwrap();
            assert!(matches!(outcome, PrebookOutcome::Confirmed { price, .. } if price == Decimal::from(100)));
        }
        assert_eq!(confirmation.calls(), 0);

        let mut req = request(SupplierCode::Atlas, Decimal::from(100));
        req.hotel_id = "9000000".to_string();
        validator.validate(&req).await.unwrap();
        assert_eq!(confirmation.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let validator = validator_with(SupplierCode::Atlas, ScriptedConfirmation::available_at(Decimal::from(100)));

        let mut req = request(SupplierCode::Atlas, Decimal::from(100));
        req.book_hash = None;
        let err = validator.validate(&req).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(msg) if msg.contains("bookHash")));

        let mut req = request(SupplierCode::Meridian, Decimal::from(100));
        req.rate_key = Some("  ".to_string());
        assert!(validator.validate(&req).await.is_err());

        assert!(validator.validate(&request(SupplierCode::Atlas, Decimal::ZERO)).await.is_err());

        let mut req = request(SupplierCode::Local, Decimal::from(100));
        req.hotel_id = String::new();
        assert!(validator.validate(&req).await.is_err());
    }

    #[test]
    fn test_missing_fields_are_reported_by_validate() {
        let req: PrebookRequest = serde_json::from_value(serde_json::json!({
            "supplierCode": "ATLAS",
            "bookHash": "bh-1",
            "totalAmount": 100,
            "currency": "EUR"
        }))
        .unwrap();
        assert!(matches!(req.validate(), Err(CoreError::ValidationError(msg)) if msg.contains("hotelId")));

        let req: PrebookRequest = serde_json::from_value(serde_json::json!({
            "supplierCode": "ATLAS",
            "bookHash": "bh-1",
            "hotelId": "atl-77"
        }))
        .unwrap();
        assert!(matches!(req.validate(), Err(CoreError::ValidationError(msg)) if msg.contains("totalAmount")));
    }

    #[test]
    fn test_request_uses_camel_case() {
        let req: PrebookRequest = serde_json::from_value(serde_json::json!({
            "supplierCode": "MERIDIAN",
            "rateKey": "rk-1",
            "totalAmount": 210.5,
            "currency": "EUR",
            "hotelId": "10"
        }))
        .unwrap();
        assert_eq!(req.rate_ref().unwrap(), "rk-1");
        assert_eq!(req.total_amount, Decimal::new(2105, 1));
    }
}
