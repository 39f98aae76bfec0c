//! Atlas: signed JSON API with region-based search.

pub mod auth;
pub mod mapping;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use staylink_core::pricing;
use staylink_core::{
    CoreError, CoreResult, ErrorClass, HotelDetails, HotelSummary, RateCheck, RateConfirmation, RatePlan, StayQuery,
    SupplierAdapter, SupplierCode, SupplierSearchParams,
};
use staylink_shared::text;
use staylink_store::app_config::RemoteSupplierConfig;
use staylink_store::SharedCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::filters;
use crate::http;
use auth::AtlasSigner;
use mapping::{AtlasRate, Envelope, HotelInfo, HotelsData, RegionsData};

const REGION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const STATIC_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const RATES_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct AtlasClient {
    http: reqwest::Client,
    base_url: String,
    signer: AtlasSigner,
}

impl AtlasClient {
    /// POSTs a signed request; body-level errors surface as classified supplier errors
    /// whose message is the supplier's error code.
    async fn post<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> CoreResult<T> {
        let headers = self.signer.headers(Utc::now().timestamp())?;
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| http::transport_error(SupplierCode::Atlas, &e))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| http::transport_error(SupplierCode::Atlas, &e))?;

        let envelope: Envelope<T> = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(CoreError::supplier(
                    SupplierCode::Atlas,
                    mapping::classify(Some(status), None),
                    format!("HTTP {}: {}", status.as_u16(), http::summarize_body(&raw)),
                ));
            }
            Err(e) => return Err(CoreError::DecodeError(format!("Atlas {}: {}", path, e))),
        };

        if !status.is_success() || !envelope.is_ok() {
            let code = envelope.error.unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(CoreError::supplier(
                SupplierCode::Atlas,
                mapping::classify(Some(status), Some(&code)),
                code,
            ));
        }

        envelope
            .data
            .ok_or_else(|| CoreError::DecodeError(format!("Atlas {} returned no data", path)))
    }
}

pub struct AtlasAdapter {
    client: AtlasClient,
    cache: SharedCache,
    fallback: Option<Arc<dyn SupplierAdapter>>,
    currency: String,
}

impl AtlasAdapter {
    pub fn new(config: &RemoteSupplierConfig, cache: SharedCache, request_timeout: Duration) -> CoreResult<Self> {
        let client = AtlasClient {
            http: http::build_client(request_timeout)?,
            base_url: http::normalize_base_url(&config.base_url),
            signer: AtlasSigner::new(config.key_id.clone(), config.secret.clone()),
        };
        info!(base_url = %client.base_url, "Atlas adapter configured");

        Ok(Self {
            client,
            cache,
            fallback: None,
            currency: "EUR".to_string(),
        })
    }

    /// Adapter consulted when Atlas rejects our credentials or quota.
    pub fn with_fallback(mut self, fallback: Arc<dyn SupplierAdapter>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    fn guests_body(stay: &StayQuery) -> Vec<serde_json::Value> {
        // Party is spread over rooms with the remainder in the first ones
        let rooms = stay.rooms.max(1);
        (0..rooms)
            .map(|i| {
                let adults = stay.adults / rooms + u32::from(i < stay.adults % rooms);
                let children = stay.children / rooms + u32::from(i < stay.children % rooms);
                json!({ "adults": adults, "children": vec![8; children as usize] })
            })
            .collect()
    }

    async fn resolve_region(&self, destination: &str) -> CoreResult<Option<i64>> {
        let key = format!("atlas:region:{}", text::normalize_key(destination));
        let client = self.client.clone();
        let query = destination.trim().to_string();

        self.cache
            .with_cache(&key, REGION_TTL, move || async move {
                let data: RegionsData = client
                    .post("/search/multicomplete", &json!({ "query": query, "language": "en" }))
                    .await?;
                Ok(mapping::pick_region(&data.regions))
            })
            .await
    }

    async fn try_search(&self, params: &SupplierSearchParams) -> CoreResult<Vec<HotelSummary>> {
        let Some(region_id) = self.resolve_region(&params.destination).await? else {
            debug!(destination = %params.destination, "Atlas has no region for destination");
            return Ok(Vec::new());
        };

        let key = format!("atlas:serp:{}:{}", region_id, params.stay.cache_fragment());
        let client = self.client.clone();
        let stay = params.stay.clone();
        let currency = self.currency.clone();

        self.cache
            .with_cache(&key, RATES_TTL, move || async move {
                let body = json!({
                    "region_id": region_id,
                    "checkin": stay.check_in,
                    "checkout": stay.check_out,
                    "guests": Self::guests_body(&stay),
                    "currency": currency,
                    "language": "en",
                });
                let data: HotelsData = client.post("/search/serp/region", &body).await?;
                Ok(data
                    .hotels
                    .iter()
                    .filter_map(|hotel| mapping::summary(hotel, &stay))
                    .collect::<Vec<_>>())
            })
            .await
    }

    async fn hotel_info(&self, hotel_id: &str) -> CoreResult<HotelInfo> {
        let key = format!("atlas:info:{}", hotel_id);
        let client = self.client.clone();
        let id = hotel_id.to_string();

        self.cache
            .with_cache(&key, STATIC_TTL, move || async move {
                client.post("/hotel/info", &json!({ "id": id, "language": "en" })).await
            })
            .await
    }

    async fn hotel_rates(&self, hotel_id: &str, stay: &StayQuery) -> CoreResult<Vec<AtlasRate>> {
        let key = format!("atlas:hp:{}:{}", hotel_id, stay.cache_fragment());
        let client = self.client.clone();
        let id = hotel_id.to_string();
        let stay = stay.clone();
        let currency = self.currency.clone();

        self.cache
            .with_cache(&key, RATES_TTL, move || async move {
                let body = json!({
                    "id": id,
                    "checkin": stay.check_in,
                    "checkout": stay.check_out,
                    "guests": Self::guests_body(&stay),
                    "currency": currency,
                    "language": "en",
                });
                let data: HotelsData = client.post("/search/hp", &body).await?;
                Ok(data.hotels.into_iter().flat_map(|hotel| hotel.rates).collect::<Vec<_>>())
            })
            .await
    }

    async fn try_get_hotel_details(&self, hotel_id: &str, stay: &StayQuery) -> CoreResult<Option<HotelDetails>> {
        let (info, rates) = tokio::try_join!(self.hotel_info(hotel_id), self.hotel_rates(hotel_id, stay))?;
        Ok(mapping::details(&info, &rates, stay, Utc::now()))
    }
}

#[async_trait]
impl SupplierAdapter for AtlasAdapter {
    fn code(&self) -> SupplierCode {
        SupplierCode::Atlas
    }

    async fn search(&self, params: &SupplierSearchParams) -> Vec<HotelSummary> {
        match self.try_search(params).await {
            Ok(hotels) => filters::apply(hotels, params),
            Err(e) if e.class() == ErrorClass::Quota => match &self.fallback {
                Some(fallback) => {
                    warn!(error = %e, "Atlas quota or credentials rejected, searching local inventory instead");
                    fallback.search(params).await
                }
                None => Vec::new(),
            },
            Err(e) => {
                warn!(destination = %params.destination, error = %e, "Atlas search failed");
                Vec::new()
            }
        }
    }

    async fn get_hotel_details(&self, hotel_id: &str, stay: Option<&StayQuery>) -> Option<HotelDetails> {
        let stay = stay.cloned().unwrap_or_else(|| StayQuery::default_from(Utc::now().date_naive()));
        match self.try_get_hotel_details(hotel_id, &stay).await {
            Ok(details) => details,
            Err(e) if e.class() == ErrorClass::Quota => match &self.fallback {
                Some(fallback) => {
                    warn!(hotel_id, error = %e, "Atlas quota or credentials rejected, using local inventory");
                    fallback.get_hotel_details(hotel_id, Some(&stay)).await
                }
                None => None,
            },
            Err(e) => {
                warn!(hotel_id, error = %e, "Atlas hotel lookup failed");
                None
            }
        }
    }

    /// Atlas can only re-verify a rate inside a hotel page or a prebook.
    async fn get_rate_plan(&self, _rate_plan_id: &str) -> Option<RatePlan> {
        None
    }
}

#[async_trait]
impl RateConfirmation for AtlasAdapter {
    async fn confirm_rate(&self, book_hash: &str, quoted_amount: Decimal) -> CoreResult<RateCheck> {
        let result: CoreResult<HotelsData> = self
            .client
            .post("/hotel/prebook", &json!({ "hash": book_hash, "price_increase_percent": 0 }))
            .await;

        let data = match result {
            Ok(data) => data,
            Err(CoreError::SupplierError { message, .. }) if mapping::is_unavailable(&message) => {
                return Ok(RateCheck {
                    available: false,
                    current_price: None,
                    currency: None,
                    price_changed: false,
                });
            }
            Err(e) => return Err(e),
        };

        let Some(rate) = data.hotels.iter().flat_map(|h| h.rates.iter()).next() else {
            return Ok(RateCheck {
                available: false,
                current_price: None,
                currency: None,
                price_changed: false,
            });
        };

        // Rounding is per cent; nights and rooms only affect the split, not the total
        let current = mapping::rate_price(rate, 1, 1).map(|parts| pricing::round_money(parts.total_amount));
        let currency = rate
            .payment_options
            .as_ref()
            .and_then(|p| p.payment_types.first())
            .and_then(|p| p.currency_code.clone());
        let reported_change = data.changes.and_then(|c| c.price_changed).unwrap_or(false);
        let price_changed = reported_change || current.is_some_and(|c| c != pricing::round_money(quoted_amount));

        Ok(RateCheck {
            available: true,
            current_price: current,
            currency,
            price_changed,
        })
    }
}
