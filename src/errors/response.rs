use axum::{
    body::Body,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use utoipa::ToSchema;

/// JSON body of an error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Message safe to show to the client
    pub error: String,
    /// Additional context (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: Value) -> Self {
        Self {
            error: error.into(),
            details: Some(details),
        }
    }
}

/// Transport the HTTP renderer writes to
pub trait ResponseWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Status line; called once, before any body bytes
    fn write_head(&mut self, status: StatusCode);

    fn write_body(&mut self, body: &[u8]) -> io::Result<()>;
}

/// Writer that buffers the response in memory
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl ResponseWriter for ResponseBuffer {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_head(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn write_body(&mut self, body: &[u8]) -> io::Result<()> {
        self.body.extend_from_slice(body);
        Ok(())
    }
}

impl IntoResponse for ResponseBuffer {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use serde_json::json;

    #[test]
    fn test_error_response_serialization() {
        let body = ErrorResponse::new("Not Found");
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"error":"Not Found"}"#
        );
    }

    #[test]
    fn test_error_with_details() {
        let body = ErrorResponse::with_details("bad page", json!({"max": 100}));
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"error": "bad page", "details": {"max": 100}})
        );

        let parsed: ErrorResponse = serde_json::from_str(r#"{"error":"x"}"#).unwrap();
        assert_eq!(parsed, ErrorResponse::new("x"));
    }

    #[test]
    fn test_buffer_into_response() {
        let mut buffer = ResponseBuffer::new();
        buffer
            .headers_mut()
            .insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        buffer.write_head(StatusCode::CONFLICT);
        buffer.write_body(b"{}").unwrap();

        assert_eq!(buffer.status(), StatusCode::CONFLICT);
        assert_eq!(buffer.body(), b"{}");

        let response = buffer.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }
}
