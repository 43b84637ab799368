//! Layered error values
//!
//! An [`Error`] keeps its internal cause for logs and carries separately what
//! a client may see. Sentinels classify errors, [`get_http_code`] maps them to
//! a status and [`handle_http`] logs and renders them.

pub mod classify;
pub mod codes;
pub mod factory;
pub mod render;
pub mod response;
pub mod value;

pub use classify::{chain, find, get_http_code, http_severity_for_status, is, is_any};
pub use codes::{
    Sentinel, CANCELED, DEADLINE_EXCEEDED, EXISTS, INTERNAL, INVALID_ARGUMENT, MISSING_ARGUMENT,
    NOT_FOUND, NOT_IMPLEMENTED, OUTDATED, OUT_OF_MEMORY, OUT_OF_RANGE, PERMISSION_DENIED,
    RATE_LIMITED, REMOTE_SERVICE_ERROR, UNAUTHORIZED,
};
pub use factory::{f, Factory};
pub use render::{handle_http, into_response, status_text, RenderError, RequestInfo};
pub use response::{ErrorResponse, ResponseBuffer, ResponseWriter};
pub use value::{mark, new, wrap, Details, Error, LogField, Opt, ResultExt};
