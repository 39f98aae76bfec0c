use std::sync::Arc;
use staylink_booking::{CancellationOrchestrator, PrebookPolicy, PrebookValidator, SelectionAssembler};
use staylink_catalog::SupplierRegistry;
use staylink_core::payment::RefundGateway;
use staylink_core::repository::BookingRepository;
use staylink_store::app_config::BusinessRules;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SupplierRegistry>,
    pub selections: Arc<SelectionAssembler>,
    pub prebook: Arc<PrebookValidator>,
    pub cancellations: Arc<CancellationOrchestrator>,
}

impl AppState {
    pub fn new(
        registry: Arc<SupplierRegistry>,
        bookings: Arc<dyn BookingRepository>,
        refunds: Arc<dyn RefundGateway>,
        business_rules: &BusinessRules,
    ) -> Self {
        Self {
            selections: Arc::new(SelectionAssembler::new(registry.clone())),
            prebook: Arc::new(PrebookValidator::new(registry.clone(), PrebookPolicy::from(business_rules))),
            cancellations: Arc::new(CancellationOrchestrator::new(bookings, refunds, business_rules)),
            registry,
        }
    }
}
