pub mod hotel;
pub mod search;
pub mod pricing;
pub mod supplier;
pub mod repository;
pub mod payment;

pub use hotel::{
    AddOn, AddOnPricing, BoardType, CancellationPolicy, HotelDetails, HotelSummary, Location,
    NightlyPrice, PaymentType, RatePlan, RateType, RoomType,
};
pub use search::{SortBy, StayQuery, SupplierSearchParams};
pub use supplier::{ErrorClass, RateCheck, RateConfirmation, SupplierAdapter, SupplierCode};

#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
    #[error("Supplier {supplier} request failed ({class:?}): {message}")]
    SupplierError {
        supplier: SupplierCode,
        class: ErrorClass,
        message: String,
    },
    #[error("Malformed supplier response: {0}")]
    DecodeError(String),
    #[error("Persistence error: {0}")]
    PersistenceError(String),
}

impl CoreError {
    pub fn supplier(supplier: SupplierCode, class: ErrorClass, message: impl Into<String>) -> Self {
        Self::SupplierError {
            supplier,
            class,
            message: message.into(),
        }
    }

    /// Classification of a supplier failure; non-supplier errors count as fatal.
    pub fn class(&self) -> ErrorClass {
        match self {
            CoreError::SupplierError { class, .. } => *class,
            _ => ErrorClass::Fatal,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
