//! Meridian: Basic-auth JSON API keyed by destination codes.

pub mod mapping;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::RequestBuilder;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::json;
use staylink_core::pricing;
use staylink_core::{
    CoreError, CoreResult, ErrorClass, HotelDetails, HotelSummary, RateCheck, RateConfirmation, RatePlan, StayQuery,
    SupplierAdapter, SupplierCode, SupplierSearchParams,
};
use staylink_shared::{text, Masked};
use staylink_store::app_config::RemoteSupplierConfig;
use staylink_store::SharedCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::filters;
use crate::http;
use mapping::{AvailabilityResponse, CheckRatesResponse, DestinationsResponse, ErrorBody, HotelContent, HotelContentResponse, MeridianHotel};

const DESTINATION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const CONTENT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const RATES_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct MeridianClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: Masked<String>,
}

impl MeridianClient {
    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{}", self.base_url, path))
            .basic_auth(&self.username, Some(self.password.expose()))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.username, Some(self.password.expose()))
    }

    /// Non-2xx responses become classified supplier errors carrying the supplier's error code.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder, endpoint: &str) -> CoreResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| http::transport_error(SupplierCode::Meridian, &e))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| http::transport_error(SupplierCode::Meridian, &e))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorBody>(&raw).ok().and_then(|body| body.error);
            let code = detail.as_ref().and_then(|d| d.code.clone());
            let class = mapping::classify(Some(status), code.as_deref());
            let message = code.unwrap_or_else(|| format!("HTTP {}: {}", status.as_u16(), http::summarize_body(&raw)));
            return Err(CoreError::supplier(SupplierCode::Meridian, class, message));
        }

        serde_json::from_str(&raw).map_err(|e| CoreError::DecodeError(format!("Meridian {}: {}", endpoint, e)))
    }
}

pub struct MeridianAdapter {
    client: MeridianClient,
    cache: SharedCache,
    fallback: Option<Arc<dyn SupplierAdapter>>,
}

impl MeridianAdapter {
    pub fn new(config: &RemoteSupplierConfig, cache: SharedCache, request_timeout: Duration) -> CoreResult<Self> {
        let client = MeridianClient {
            http: http::build_client(request_timeout)?,
            base_url: http::normalize_base_url(&config.base_url),
            username: config.key_id.clone(),
            password: config.secret.clone(),
        };
        info!(base_url = %client.base_url, "Meridian adapter configured");

        Ok(Self {
            client,
            cache,
            fallback: None,
        })
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn SupplierAdapter>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    fn availability_body(stay: &StayQuery) -> serde_json::Value {
        json!({
            "stay": { "checkIn": stay.check_in, "checkOut": stay.check_out },
            "occupancies": [{ "rooms": stay.rooms, "adults": stay.adults, "children": stay.children }],
        })
    }

    async fn resolve_destination(&self, destination: &str) -> CoreResult<Option<String>> {
        let key = format!("meridian:dest:{}", text::normalize_key(destination));
        let client = self.client.clone();
        let query = destination.trim().to_string();

        self.cache
            .with_cache(&key, DESTINATION_TTL, move || async move {
                let request = client.get("/destinations").query(&[("query", query.as_str())]);
                let response: DestinationsResponse = client.execute(request, "destinations").await?;
                Ok(response.destinations.into_iter().find_map(|d| d.code))
            })
            .await
    }

    async fn try_search(&self, params: &SupplierSearchParams) -> CoreResult<Vec<HotelSummary>> {
        let Some(code) = self.resolve_destination(&params.destination).await? else {
            debug!(destination = %params.destination, "Meridian has no destination code");
            return Ok(Vec::new());
        };

        let key = format!("meridian:avail:{}:{}", code, params.stay.cache_fragment());
        let client = self.client.clone();
        let stay = params.stay.clone();

        self.cache
            .with_cache(&key, RATES_TTL, move || async move {
                let mut body = Self::availability_body(&stay);
                body["destination"] = json!({ "code": code });
                let response: AvailabilityResponse =
                    client.execute(client.post("/availability").json(&body), "availability").await?;
                Ok(response
                    .hotels
                    .iter()
                    .filter_map(|hotel| mapping::summary(hotel, &stay))
                    .collect::<Vec<_>>())
            })
            .await
    }

    async fn hotel_content(&self, hotel_id: &str) -> CoreResult<Option<HotelContent>> {
        let key = format!("meridian:content:{}", hotel_id);
        let client = self.client.clone();
        let path = format!("/hotels/{}/details", hotel_id);

        self.cache
            .with_cache(&key, CONTENT_TTL, move || async move {
                let result: CoreResult<HotelContentResponse> = client.execute(client.get(&path), "hotel details").await;
                match result {
                    Ok(response) => Ok(response.hotel),
                    Err(CoreError::SupplierError { class: ErrorClass::Fatal, message, .. })
                        if message.to_ascii_uppercase().contains("NOT_FOUND") || message.contains("HTTP 404") =>
                    {
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            })
            .await
    }

    async fn hotel_rates(&self, hotel_id: &str, stay: &StayQuery) -> CoreResult<Option<MeridianHotel>> {
        let key = format!("meridian:rates:{}:{}", hotel_id, stay.cache_fragment());
        let client = self.client.clone();
        let stay = stay.clone();
        let hotel_id = hotel_id.to_string();

        self.cache
            .with_cache(&key, RATES_TTL, move || async move {
                let mut body = Self::availability_body(&stay);
                body["hotels"] = json!({ "hotel": [hotel_id] });
                let response: AvailabilityResponse =
                    client.execute(client.post("/availability").json(&body), "availability").await?;
                Ok(response.hotels.into_iter().next())
            })
            .await
    }

    async fn try_get_hotel_details(&self, hotel_id: &str, stay: &StayQuery) -> CoreResult<Option<HotelDetails>> {
        let (content, rates) = tokio::try_join!(self.hotel_content(hotel_id), self.hotel_rates(hotel_id, stay))?;
        Ok(content.and_then(|content| mapping::details(&content, rates.as_ref(), stay, Utc::now())))
    }

    async fn check_rate(&self, rate_key: &str) -> CoreResult<CheckRatesResponse> {
        let body = json!({ "rooms": [{ "rateKey": rate_key }] });
        self.client
            .execute(self.client.post("/checkrates").json(&body), "checkrates")
            .await
    }
}

#[async_trait]
impl SupplierAdapter for MeridianAdapter {
    fn code(&self) -> SupplierCode {
        SupplierCode::Meridian
    }

    async fn search(&self, params: &SupplierSearchParams) -> Vec<HotelSummary> {
        match self.try_search(params).await {
            Ok(hotels) => filters::apply(hotels, params),
            Err(e) if e.class() == ErrorClass::Quota => match &self.fallback {
                Some(fallback) => {
                    warn!(error = %e, "Meridian quota or credentials rejected, searching local inventory instead");
                    fallback.search(params).await
                }
                None => Vec::new(),
            },
            Err(e) => {
                warn!(destination = %params.destination, error = %e, "Meridian search failed");
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
                    warn!(hotel_id, error = %e, "Meridian quota or credentials rejected, using local inventory");
                    fallback.get_hotel_details(hotel_id, Some(&stay)).await
                }
                None => None,
            },
            Err(e) => {
                warn!(hotel_id, error = %e, "Meridian hotel lookup failed");
                None
            }
        }
    }

    /// Rate keys are re-priced through the rate check call.
    async fn get_rate_plan(&self, rate_key: &str) -> Option<RatePlan> {
        let response = match self.check_rate(rate_key).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Meridian rate lookup failed");
                return None;
            }
        };

        let hotel = response.hotel?;
        let currency = hotel.currency.clone().unwrap_or_else(|| "EUR".to_string());
        let (room, rate) = mapping::checked_rate(&hotel, rate_key)?;
        let stay = mapping::checked_stay(&hotel, rate, Utc::now().date_naive());
        mapping::rate_plan(rate, room, &stay, &currency, Utc::now())
    }
}

#[async_trait]
impl RateConfirmation for MeridianAdapter {
    async fn confirm_rate(&self, rate_key: &str, quoted_amount: Decimal) -> CoreResult<RateCheck> {
        let unavailable = RateCheck {
            available: false,
            current_price: None,
            currency: None,
            price_changed: false,
        };

        let response = match self.check_rate(rate_key).await {
            Ok(response) => response,
            Err(CoreError::SupplierError { message, .. }) if mapping::is_unavailable(&message) => return Ok(unavailable),
            Err(e) => return Err(e),
        };

        let Some(hotel) = response.hotel else {
            return Ok(unavailable);
        };
        let Some((_, rate)) = mapping::checked_rate(&hotel, rate_key) else {
            return Ok(unavailable);
        };
        if rate.allotment == Some(0) {
            return Ok(unavailable);
        }

        let current = mapping::rate_price(rate, 1, 1).map(|parts| pricing::round_money(parts.total_amount));
        Ok(RateCheck {
            available: true,
            current_price: current,
            currency: hotel.currency.clone(),
            price_changed: current.is_some_and(|c| c != pricing::round_money(quoted_amount)),
        })
    }
}
