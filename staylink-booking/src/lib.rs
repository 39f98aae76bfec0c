pub mod selection;
pub mod prebook;
pub mod cancellation;
pub mod orchestrator;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use selection::{BookingSelection, SelectionAssembler, SelectionError, SelectionRequest};
pub use prebook::{PrebookOutcome, PrebookPolicy, PrebookRequest, PrebookResponse, PrebookValidator};
pub use cancellation::{CancellationEligibility, CancellationInput, RefundTiers};
pub use orchestrator::{CancellationError, CancellationOrchestrator, CancellationOutcome};
