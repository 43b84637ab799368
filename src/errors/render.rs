use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use std::error::Error as StdError;
use std::io;
use std::net::SocketAddr;
use tracing::Level;

use super::classify::{find, get_http_code, http_severity_for_status};
use super::response::{ErrorResponse, ResponseBuffer, ResponseWriter};
use super::value::{Error, LogField};
use crate::logging::{log_err, LogOptions};
use crate::metrics;

/// The parts of a request that end up in the error log
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
    pub remote_addr: Option<SocketAddr>,
}

impl RequestInfo {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            remote_addr: None,
        }
    }

    pub fn with_remote_addr(mut self, remote_addr: SocketAddr) -> Self {
        self.remote_addr = Some(remote_addr);
        self
    }

    fn log_fields(&self, status: StatusCode) -> Vec<LogField> {
        let remote_addr = self
            .remote_addr
            .map_or_else(|| "unknown".to_string(), |addr| addr.to_string());

        crate::fields![
            "method" => self.method.as_str(),
            "path" => self.path.as_str(),
            "status" => status.as_u16(),
            "remote_addr" => remote_addr,
        ]
    }
}

/// Failures while producing the response itself; these are logged, never returned
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to marshal error response: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write error response: {0}")]
    Write(#[source] io::Error),
}

/// Generic reason phrase for `status`
pub fn status_text(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown Status")
}

/// Message a client may see for `value`
fn public_message(value: &Error, status: StatusCode) -> String {
    if let Some(message) = value.safe_message() {
        message.to_owned()
    } else if value.expose_internal() {
        value.to_string()
    } else {
        status_text(status).to_owned()
    }
}

fn response_body(value: Option<&Error>, status: StatusCode) -> serde_json::Result<Vec<u8>> {
    let body = match value {
        Some(value) => ErrorResponse {
            error: public_message(value, status),
            details: value
                .user_details()
                .map(|details| details.to_json())
                .transpose()?,
        },
        None => ErrorResponse::new(status_text(status)),
    };
    serde_json::to_vec(&body)
}

fn log_failure(failure: RenderError, level: Level, options: &LogOptions, fields: Vec<LogField>) {
    let failure: &(dyn StdError + 'static) = &failure;
    log_err(
        Some(failure),
        &options.clone().with_level(level).with_fields(fields),
    );
}

/// Log `err` and write it as a JSON error response
///
/// The status comes from [`get_http_code`] and the log level from
/// [`http_severity_for_status`] unless `options` sets one. Only a safe
/// message, an exposed internal message or the generic status text ever
/// reaches the client; errors that are not an [`Error`] always get the
/// generic text. Returns `false` only when there is no error.
pub fn handle_http<W>(
    err: Option<&(dyn StdError + 'static)>,
    request: &RequestInfo,
    writer: &mut W,
    options: &LogOptions,
) -> bool
where
    W: ResponseWriter + ?Sized,
{
    let Some(err) = err else {
        return false;
    };

    let status = get_http_code(err);
    let http_fields = request.log_fields(status);
    let level = options
        .level()
        .unwrap_or_else(|| http_severity_for_status(status));

    log_err(
        Some(err),
        &options
            .clone()
            .with_level(level)
            .with_fields(http_fields.clone()),
    );

    let value = find::<Error>(err);
    metrics::record_rendered_error(status, value.and_then(Error::domain));

    let body = match response_body(value, status) {
        Ok(body) => body,
        Err(source) => {
            log_failure(RenderError::Serialize(source), Level::ERROR, options, http_fields);
            writer.write_head(StatusCode::INTERNAL_SERVER_ERROR);
            return true;
        }
    };

    writer.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    writer.write_head(status);
    if let Err(source) = writer.write_body(&body) {
        log_failure(RenderError::Write(source), Level::WARN, options, http_fields);
    }
    true
}

/// Render `err` into an axum response
pub fn into_response(
    err: &(dyn StdError + 'static),
    request: &RequestInfo,
    options: &LogOptions,
) -> Response {
    let mut buffer = ResponseBuffer::new();
    handle_http(Some(err), request, &mut buffer, options);
    buffer.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::codes::{DEADLINE_EXCEEDED, NOT_FOUND, RATE_LIMITED, UNAUTHORIZED};
    use crate::errors::{f, new, Opt};
    use crate::logging::MemorySink;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn memory_options() -> (Arc<MemorySink>, LogOptions) {
        let sink = Arc::new(MemorySink::new());
        let options = LogOptions::new().with_sink(sink.clone());
        (sink, options)
    }

    fn get(path: &str) -> RequestInfo {
        RequestInfo::new(Method::GET, path)
    }

    fn body_json(buffer: &ResponseBuffer) -> Value {
        serde_json::from_slice(buffer.body()).unwrap()
    }

    struct BrokenPipe {
        headers: axum::http::HeaderMap,
        status: Option<StatusCode>,
    }

    impl ResponseWriter for BrokenPipe {
        fn headers_mut(&mut self) -> &mut axum::http::HeaderMap {
            &mut self.headers
        }

        fn write_head(&mut self, status: StatusCode) {
            self.status = Some(status);
        }

        fn write_body(&mut self, _body: &[u8]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))
        }
    }

    #[test]
    fn test_none_is_not_handled() {
        let (sink, options) = memory_options();
        let mut buffer = ResponseBuffer::new();

        assert!(!handle_http(None, &get("/"), &mut buffer, &options));
        assert!(sink.records().is_empty());
        assert!(buffer.body().is_empty());
    }

    #[test]
    fn test_redacted_deadline_error() {
        let (sink, options) = memory_options();
        let mut buffer = ResponseBuffer::new();
        let err = Error::msg("db timeout").mark(&DEADLINE_EXCEEDED);

        assert!(handle_http(Some(&err), &get("/users/42"), &mut buffer, &options));

        assert_eq!(buffer.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(buffer.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(buffer.body(), br#"{"error":"Gateway Timeout"}"#);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Level::ERROR);
        assert_eq!(records[0].message, "db timeout");
        assert_eq!(records[0].field("method"), Some(&json!("GET")));
        assert_eq!(records[0].field("path"), Some(&json!("/users/42")));
        assert_eq!(records[0].field("status"), Some(&json!(504)));
        assert_eq!(records[0].field("remote_addr"), Some(&json!("unknown")));
    }

    #[test]
    fn test_foreign_error_never_leaks() {
        let (sink, options) = memory_options();
        let mut buffer = ResponseBuffer::new();
        let err = io::Error::new(io::ErrorKind::Other, "all good, nothing secret here");

        assert!(handle_http(Some(&err), &get("/"), &mut buffer, &options));

        assert_eq!(buffer.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(&buffer), json!({"error": "Internal Server Error"}));
        assert_eq!(sink.records()[0].message, "all good, nothing secret here");
    }

    #[test]
    fn test_safe_message_wins_over_internal() {
        let (_sink, options) = memory_options();
        let mut buffer = ResponseBuffer::new();
        let err = f()
            .message("SELECT failed on users_v2")
            .user_message("user not found")
            .mark(&NOT_FOUND)
            .err();

        handle_http(Some(&err), &get("/users/7"), &mut buffer, &options);

        assert_eq!(buffer.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(&buffer), json!({"error": "user not found"}));
    }

    #[test]
    fn test_exposed_internal_message_and_details() {
        let (sink, options) = memory_options();
        let mut buffer = ResponseBuffer::new();
        let err = new(
            "too many requests for key k-1",
            [
                Opt::expose_internal(true),
                Opt::user_details(json!({"retry_after": 30})),
            ],
        )
        .mark(&RATE_LIMITED)
        .wrap("quota check");

        handle_http(Some(&err), &get("/search"), &mut buffer, &options);

        assert_eq!(buffer.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            body_json(&buffer),
            json!({
                "error": "quota check: too many requests for key k-1",
                "details": {"retry_after": 30}
            })
        );
        assert_eq!(sink.records()[0].level, Level::DEBUG);
    }

    #[test]
    fn test_level_override_and_extra_fields() {
        let (sink, options) = memory_options();
        let options = options
            .with_level(Level::INFO)
            .with_fields(crate::fields!["tenant" => "acme"]);
        let mut buffer = ResponseBuffer::new();
        let err = Error::msg("token expired").mark(&UNAUTHORIZED);
        let request = get("/me").with_remote_addr("10.1.2.3:4000".parse().unwrap());

        handle_http(Some(&err), &request, &mut buffer, &options);

        let record = &sink.records()[0];
        assert_eq!(record.level, Level::INFO);
        assert_eq!(record.field("tenant"), Some(&json!("acme")));
        assert_eq!(record.field("status"), Some(&json!(401)));
        assert_eq!(record.field("remote_addr"), Some(&json!("10.1.2.3:4000")));
    }

    #[test]
    fn test_unauthorized_logs_at_warn() {
        let (sink, options) = memory_options();
        let mut buffer = ResponseBuffer::new();
        let err = Error::msg("bad signature").mark(&UNAUTHORIZED);

        handle_http(Some(&err), &get("/"), &mut buffer, &options);

        assert_eq!(sink.records()[0].level, Level::WARN);
        assert_eq!(body_json(&buffer), json!({"error": "Unauthorized"}));
    }

    #[test]
    fn test_unserializable_details_respond_500_without_body() {
        let (sink, options) = memory_options();
        let mut buffer = ResponseBuffer::new();
        let details: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);
        let err = new("bad cell", [Opt::user_details(details)]).mark(&NOT_FOUND);

        assert!(handle_http(Some(&err), &get("/grid"), &mut buffer, &options));

        assert_eq!(buffer.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(buffer.body().is_empty());
        assert!(buffer.headers().get(header::CONTENT_TYPE).is_none());

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(records[1]
            .message
            .starts_with("failed to marshal error response"));
        assert_eq!(records[1].level, Level::ERROR);
    }

    #[test]
    fn test_write_failure_is_logged_and_still_handled() {
        let (sink, options) = memory_options();
        let mut writer = BrokenPipe {
            headers: axum::http::HeaderMap::new(),
            status: None,
        };
        let err = Error::msg("gone").mark(&NOT_FOUND);

        assert!(handle_http(Some(&err), &get("/"), &mut writer, &options));

        assert_eq!(writer.status, Some(StatusCode::NOT_FOUND));
        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].level, Level::WARN);
        assert_eq!(
            records[1].message,
            "failed to write error response: client went away"
        );
    }

    #[test]
    fn test_into_response() {
        let (_sink, options) = memory_options();
        let err = Error::msg("missing").mark(&NOT_FOUND);

        let response = into_response(&err, &get("/x"), &options);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
