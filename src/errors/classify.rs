use axum::http::StatusCode;
use std::error::Error as StdError;
use std::io;
use tracing::Level;

use super::codes::{
    Sentinel, DEADLINE_EXCEEDED, EXISTS, INVALID_ARGUMENT, MISSING_ARGUMENT, NOT_FOUND,
    NOT_IMPLEMENTED, OUTDATED, OUT_OF_RANGE, PERMISSION_DENIED, RATE_LIMITED,
    REMOTE_SERVICE_ERROR, UNAUTHORIZED,
};
use super::value::Error;

/// Iterate over an error and its `source()` chain, outermost first
pub fn chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |&cause| cause.source())
}

/// Whether `err` is `sentinel`
///
/// Matches when the sentinel is the error itself, any cause in its chain,
/// or a marker on any [`Error`] in the chain.
pub fn is(err: &(dyn StdError + 'static), sentinel: &Sentinel) -> bool {
    chain(err).any(|cause| {
        if let Some(found) = cause.downcast_ref::<Sentinel>() {
            return found == sentinel;
        }
        if let Some(found) = cause.downcast_ref::<&'static Sentinel>() {
            return *found == sentinel;
        }
        cause
            .downcast_ref::<Error>()
            .is_some_and(|value| value.has_marker(sentinel))
    })
}

pub fn is_any(err: &(dyn StdError + 'static), sentinels: &[&Sentinel]) -> bool {
    sentinels.iter().any(|sentinel| is(err, sentinel))
}

/// First cause of type `E` in the chain
pub fn find<'a, E: StdError + 'static>(err: &'a (dyn StdError + 'static)) -> Option<&'a E> {
    chain(err).find_map(|cause| cause.downcast_ref::<E>())
}

/// Deadline sentinel, an elapsed tokio timeout, or a timed-out I/O call
fn is_deadline_exceeded(err: &(dyn StdError + 'static)) -> bool {
    is(err, &DEADLINE_EXCEEDED)
        || chain(err).any(|cause| {
            cause.is::<tokio::time::error::Elapsed>()
                || cause
                    .downcast_ref::<io::Error>()
                    .is_some_and(|io_err| io_err.kind() == io::ErrorKind::TimedOut)
        })
}

/// HTTP status for an error
///
/// Checked in priority order, first match wins; anything unclassified is a 500.
pub fn get_http_code(err: &(dyn StdError + 'static)) -> StatusCode {
    if is(err, &NOT_IMPLEMENTED) {
        StatusCode::NOT_IMPLEMENTED
    } else if is_deadline_exceeded(err) {
        StatusCode::GATEWAY_TIMEOUT
    } else if is(err, &REMOTE_SERVICE_ERROR) {
        StatusCode::BAD_GATEWAY
    } else if is(err, &RATE_LIMITED) {
        StatusCode::TOO_MANY_REQUESTS
    } else if is_any(err, &[&INVALID_ARGUMENT, &MISSING_ARGUMENT, &OUT_OF_RANGE]) {
        StatusCode::BAD_REQUEST
    } else if is(err, &PERMISSION_DENIED) {
        StatusCode::FORBIDDEN
    } else if is(err, &UNAUTHORIZED) {
        StatusCode::UNAUTHORIZED
    } else if is_any(err, &[&EXISTS, &OUTDATED]) {
        StatusCode::CONFLICT
    } else if is(err, &NOT_FOUND) {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Log severity for an error rendered with `status`
pub fn http_severity_for_status(status: StatusCode) -> Level {
    if status.as_u16() >= 500 {
        Level::ERROR
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Level::WARN
    } else {
        Level::DEBUG
    }
}
