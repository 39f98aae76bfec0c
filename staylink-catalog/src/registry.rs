//! Adapter selection and multi-supplier search.

use staylink_core::repository::InventoryRepository;
use staylink_core::{CoreResult, HotelSummary, RateConfirmation, SupplierAdapter, SupplierCode, SupplierSearchParams};
use staylink_shared::text;
use staylink_store::app_config::SuppliersConfig;
use staylink_store::SharedCache;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::atlas::AtlasAdapter;
use crate::filters;
use crate::local::LocalAdapter;
use crate::meridian::MeridianAdapter;

const DEFAULT_FAN_OUT_TIMEOUT: Duration = Duration::from_secs(20);

pub struct SupplierRegistry {
    local: Arc<dyn SupplierAdapter>,
    // Registration order, Local first
    adapters: Vec<Arc<dyn SupplierAdapter>>,
    confirmations: HashMap<SupplierCode, Arc<dyn RateConfirmation>>,
    default: Option<SupplierCode>,
    fan_out_timeout: Duration,
}

impl SupplierRegistry {
    pub fn new(local: Arc<dyn SupplierAdapter>) -> Self {
        Self {
            adapters: vec![local.clone()],
            local,
            confirmations: HashMap::new(),
            default: None,
            fan_out_timeout: DEFAULT_FAN_OUT_TIMEOUT,
        }
    }

    pub fn with_default(mut self, default: Option<SupplierCode>) -> Self {
        self.default = default;
        self
    }

    pub fn with_fan_out_timeout(mut self, timeout: Duration) -> Self {
        self.fan_out_timeout = timeout;
        self
    }

    /// Adds an adapter; a second registration for the same code replaces the first.
    pub fn register(&mut self, adapter: Arc<dyn SupplierAdapter>) {
        let code = adapter.code();
        match self.adapters.iter().position(|a| a.code() == code) {
            Some(index) => self.adapters[index] = adapter,
            None => self.adapters.push(adapter),
        }
    }

    pub fn register_confirmation(&mut self, code: SupplierCode, confirmation: Arc<dyn RateConfirmation>) {
        self.confirmations.insert(code, confirmation);
    }

    /// Local always; remote suppliers only when their credentials are present.
    pub fn from_config(
        config: &SuppliersConfig,
        repository: Arc<dyn InventoryRepository>,
        cache: SharedCache,
    ) -> CoreResult<Self> {
        let local: Arc<dyn SupplierAdapter> = Arc::new(LocalAdapter::new(repository));
        let request_timeout = Duration::from_secs(config.request_timeout_seconds.max(1));

        let default = config.default.as_deref().filter(|raw| !raw.trim().is_empty()).and_then(|raw| {
            raw.parse::<SupplierCode>()
                .map_err(|e| warn!(error = %e, "Ignoring unknown default supplier"))
                .ok()
        });

        let mut registry = Self::new(local.clone())
            .with_default(default)
            .with_fan_out_timeout(Duration::from_secs(config.fan_out_timeout_seconds.max(1)));

        if let Some(atlas) = config.atlas.as_ref().filter(|c| c.is_configured()) {
            let adapter = Arc::new(AtlasAdapter::new(atlas, cache.clone(), request_timeout)?.with_fallback(local.clone()));
            registry.register(adapter.clone());
            registry.register_confirmation(SupplierCode::Atlas, adapter);
        }

        if let Some(meridian) = config.meridian.as_ref().filter(|c| c.is_configured()) {
            let adapter =
                Arc::new(MeridianAdapter::new(meridian, cache.clone(), request_timeout)?.with_fallback(local.clone()));
            registry.register(adapter.clone());
            registry.register_confirmation(SupplierCode::Meridian, adapter);
        }

        info!(
            suppliers = ?registry.registered(),
            default = ?registry.default,
            "Supplier registry ready"
        );
        Ok(registry)
    }

    pub fn registered(&self) -> Vec<SupplierCode> {
        self.adapters.iter().map(|a| a.code()).collect()
    }

    /// Explicit code, else the configured default, else Local. Unregistered
    /// suppliers resolve to Local without error.
    pub fn get_adapter(&self, code: Option<SupplierCode>) -> Arc<dyn SupplierAdapter> {
        let Some(code) = code.or(self.default) else {
            return self.local.clone();
        };
        self.adapters
            .iter()
            .find(|a| a.code() == code)
            .cloned()
            .unwrap_or_else(|| {
                debug!(supplier = %code, "Supplier not configured, using local inventory");
                self.local.clone()
            })
    }

    pub fn rate_confirmation(&self, code: SupplierCode) -> Option<Arc<dyn RateConfirmation>> {
        self.confirmations.get(&code).cloned()
    }

    /// Fans out to every registered adapter in parallel; a branch that panics or
    /// outlives the fan-out timeout contributes nothing.
    pub async fn multi_supplier_search(&self, params: &SupplierSearchParams) -> Vec<HotelSummary> {
        let params = Arc::new(params.clone());

        let branches = self.adapters.iter().map(|adapter| {
            let adapter = adapter.clone();
            let params = params.clone();
            let timeout = self.fan_out_timeout;
            let code = adapter.code();
            let handle = tokio::spawn(async move { tokio::time::timeout(timeout, adapter.search(&params)).await });
            async move {
                match handle.await {
                    Ok(Ok(hotels)) => hotels,
                    Ok(Err(_)) => {
                        warn!(supplier = %code, timeout_secs = timeout.as_secs(), "Supplier search timed out");
                        Vec::new()
                    }
                    Err(e) => {
                        warn!(supplier = %code, error = %e, "Supplier search task failed");
                        Vec::new()
                    }
                }
            }
        });

        let per_supplier = futures::future::join_all(branches).await;
        let mut merged = dedupe(per_supplier.into_iter().flatten());
        filters::sort(&mut merged, params.sort_by);
        merged.truncate(params.limit);
        merged
    }
}

/// Keeps one entry per normalized hotel name: the cheaper one, or the first seen on equal prices.
fn dedupe(hotels: impl IntoIterator<Item = HotelSummary>) -> Vec<HotelSummary> {
    let mut kept: Vec<HotelSummary> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for hotel in hotels {
        let key = text::normalize_key(&hotel.name);
        match index.get(&key) {
            Some(&position) => {
                if hotel.starting_price < kept[position].starting_price {
                    kept[position] = hotel;
                }
            }
            None => {
                index.insert(key, kept.len());
                kept.push(hotel);
            }
        }
    }
    kept
}
