use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};
use std::sync::atomic::{AtomicBool, Ordering};

lazy_static! {
    pub static ref HTTP_ERRORS_RENDERED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_errors_rendered_total",
        "Errors rendered as HTTP responses",
        &["status", "domain"]  // domain is empty for errors without one
    )
    .unwrap();
}

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Register every metric and start recording
///
/// Until a host calls this, the error renderer touches no global registry.
pub fn init_metrics() {
    lazy_static::initialize(&HTTP_ERRORS_RENDERED_TOTAL);
    ENABLED.store(true, Ordering::Relaxed);
}

pub fn enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}
