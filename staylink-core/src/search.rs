use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

pub const DEFAULT_RESULT_LIMIT: usize = 20;

/// Upper bounds on a single stay request.
pub const MAX_ROOMS: u32 = 10;
pub const MAX_ADULTS: u32 = 40;
pub const MAX_CHILDREN: u32 = 20;
pub const MAX_NIGHTS: i64 = 365;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    #[default]
    PriceAsc,
    PriceDesc,
    Rating,
}

/// Dates and occupancy of a stay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct StayQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default = "default_adults")]
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default = "default_rooms")]
    pub rooms: u32,
}

fn default_adults() -> u32 {
    2
}

fn default_rooms() -> u32 {
    1
}

fn default_limit() -> usize {
    DEFAULT_RESULT_LIMIT
}

impl StayQuery {
    /// One night starting the day after `today`, two adults, one room.
    pub fn default_from(today: NaiveDate) -> Self {
        let check_in = today + Duration::days(1);
        Self {
            check_in,
            check_out: check_in + Duration::days(1),
            adults: default_adults(),
            children: 0,
            rooms: default_rooms(),
        }
    }

    /// Number of nights; zero or negative when the dates are inverted.
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn guests(&self) -> u32 {
        self.adults.saturating_add(self.children)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.nights() < 1 {
            return Err(CoreError::ValidationError(
                "check_out must be at least one night after check_in".to_string(),
            ));
        }
        if self.adults == 0 {
            return Err(CoreError::ValidationError("at least one adult is required".to_string()));
        }
        if self.rooms == 0 {
            return Err(CoreError::ValidationError("at least one room is required".to_string()));
        }
        if self.adults < self.rooms {
            return Err(CoreError::ValidationError(
                "each room needs at least one adult".to_string(),
            ));
        }
        if self.nights() > MAX_NIGHTS {
            return Err(CoreError::ValidationError(format!("stays are limited to {} nights", MAX_NIGHTS)));
        }
        if self.rooms > MAX_ROOMS || self.adults > MAX_ADULTS || self.children > MAX_CHILDREN {
            return Err(CoreError::ValidationError(format!(
                "at most {} rooms, {} adults and {} children per request",
                MAX_ROOMS, MAX_ADULTS, MAX_CHILDREN
            )));
        }
        Ok(())
    }

    /// Stable fragment for cache keys.
    pub fn cache_fragment(&self) -> String {
        format!(
            "{}:{}:{}a:{}c:{}r",
            self.check_in, self.check_out, self.adults, self.children, self.rooms
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupplierSearchParams {
    pub destination: String,
    #[serde(flatten)]
    pub stay: StayQuery,
    #[serde(default)]
    pub min_price: Option<Decimal>,
    #[serde(default)]
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub min_rating: Option<f32>,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl SupplierSearchParams {
    pub fn new(destination: impl Into<String>, stay: StayQuery) -> Self {
        Self {
            destination: destination.into(),
            stay,
            min_price: None,
            max_price: None,
            min_rating: None,
            sort_by: SortBy::default(),
            limit: DEFAULT_RESULT_LIMIT,
        }
    }

    pub fn nights(&self) -> u32 {
        self.stay.nights().max(1) as u32
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.destination.trim().is_empty() {
            return Err(CoreError::ValidationError("destination is required".to_string()));
        }
        self.stay.validate()?;
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(CoreError::ValidationError(
                    "min_price cannot exceed max_price".to_string(),
                ));
            }
        }
        Ok(())
    }
}
