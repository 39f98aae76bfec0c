//! Transport plumbing shared by the remote adapters.

use staylink_core::{CoreError, CoreResult, ErrorClass, SupplierCode};
use std::error::Error as StdError;
use std::time::Duration;

pub(crate) fn build_client(timeout: Duration) -> CoreResult<reqwest::Client> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(4)
        .tcp_keepalive(Duration::from_secs(30))
        .timeout(timeout)
        .build()
        .map_err(|e| CoreError::InternalError(format!("failed to build HTTP client: {}", e)))
}

pub(crate) fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Keeps chained causes so DNS, TLS and socket failures stay visible.
pub(crate) fn format_reqwest_error(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !cause_msg.is_empty() && !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }

    message
}

pub(crate) fn summarize_body(raw: &str) -> String {
    const MAX_CHARS: usize = 400;
    let compact = raw.replace(['\n', '\r'], " ");
    match compact.char_indices().nth(MAX_CHARS) {
        Some((cut, _)) => format!("{}…", &compact[..cut]),
        None => compact,
    }
}

/// Failure before any HTTP status was received.
pub(crate) fn transport_error(supplier: SupplierCode, err: &reqwest::Error) -> CoreError {
    let class = if err.is_timeout() || err.is_connect() || err.is_request() {
        ErrorClass::Transient
    } else {
        ErrorClass::Fatal
    };
    CoreError::supplier(supplier, class, format_reqwest_error(err))
}

/// Status-only classification both remote suppliers agree on.
pub(crate) fn status_class(status: reqwest::StatusCode) -> Option<ErrorClass> {
    match status.as_u16() {
        401 | 403 | 429 => Some(ErrorClass::Quota),
        500..=599 => Some(ErrorClass::Transient),
        _ => None,
    }
}
