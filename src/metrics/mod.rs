pub mod registry;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use prometheus::{Encoder, TextEncoder};

pub use registry::HTTP_ERRORS_RENDERED_TOTAL;

/// Longest domain kept as a label value
const MAX_DOMAIN_LABEL_LEN: usize = 32;

/// Label value for an error domain
///
/// Domains are free text, so anything that does not look like a short
/// identifier collapses into `"other"` to keep the label set bounded.
pub fn domain_label(domain: Option<&str>) -> &str {
    match domain {
        None => "",
        Some(domain)
            if domain.len() <= MAX_DOMAIN_LABEL_LEN
                && domain
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.')) =>
        {
            domain
        }
        Some(_) => "other",
    }
}

/// Count one rendered error; a no-op until [`registry::init_metrics`] ran
pub fn record_rendered_error(status: StatusCode, domain: Option<&str>) {
    if !registry::enabled() {
        return;
    }
    HTTP_ERRORS_RENDERED_TOTAL
        .with_label_values(&[status.as_str(), domain_label(domain)])
        .inc();
}

/// Handler for the /metrics endpoint
/// Returns metrics in Prometheus exposition format
pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => {
            let body = String::from_utf8(buffer).unwrap_or_default();
            (
                StatusCode::OK,
                [("Content-Type", encoder.format_type())],
                body,
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_rendered_error() {
        registry::init_metrics();
        let counter = HTTP_ERRORS_RENDERED_TOTAL.with_label_values(&["418", "metrics-test"]);
        let before = counter.get();

        record_rendered_error(StatusCode::IM_A_TEAPOT, Some("metrics-test"));

        assert_eq!(counter.get(), before + 1);
    }

    #[test]
    fn test_domain_label_is_bounded() {
        assert_eq!(domain_label(None), "");
        assert_eq!(domain_label(Some("users")), "users");
        assert_eq!(domain_label(Some("billing.v2_eu-west")), "billing.v2_eu-west");
        assert_eq!(domain_label(Some("user 42 from 10.0.0.1")), "other");
        assert_eq!(domain_label(Some(&"a".repeat(33))), "other");
    }
}
