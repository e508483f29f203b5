// Response envelope module
// Handlers produce envelopes; the dispatcher is the only writer of HTTP bytes

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::logger;

/// A (status, payload) pair produced by a handler and consumed exactly once
/// by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: StatusCode,
    data: Value,
}

impl ApiResponse {
    /// 200 with the given payload
    pub fn ok(data: impl Serialize) -> Self {
        Self::with(StatusCode::OK, data)
    }

    /// Arbitrary status with the given payload
    pub fn with(status: StatusCode, data: impl Serialize) -> Self {
        let data = serde_json::to_value(data).unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to serialize response payload: {e}"));
            Value::Null
        });

        Self { status, data }
    }

    /// Error status with a human-readable string payload
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::with(status, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

/// What a handler hands back to the dispatcher
#[derive(Debug, Clone)]
pub enum HandlerOutput {
    /// A typed envelope, serialized as JSON with its status code
    Response(ApiResponse),
    /// Already-rendered output, emitted verbatim with status 200
    Raw(String),
}

/// Build an HTTP response with the API headers applied before any branch:
/// JSON content type, permissive CORS, and a fixed cache window
pub fn api_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Cache-Control", "max-age=500")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build API response: {e}"));
            Response::new(Full::new(Bytes::from("Error")))
        })
}

/// Serialize a JSON value for the wire, logging on the (unreachable in
/// practice) encode failure
pub fn encode_json(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        logger::log_error(&format!("Failed to encode response body: {e}"));
        "null".to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope() {
        let resp = ApiResponse::ok("pong");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.data(), &Value::String("pong".to_string()));
    }

    #[test]
    fn test_error_envelope() {
        let resp = ApiResponse::error(StatusCode::FORBIDDEN, "nope");
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(encode_json(resp.data()), "\"nope\"");
    }

    #[test]
    fn test_api_response_headers() {
        let resp = api_response(StatusCode::NOT_FOUND, "\"Invalid URL\"".to_string());
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let headers = resp.headers();
        assert_eq!(headers["Content-Type"], "application/json");
        assert_eq!(headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(headers["Cache-Control"], "max-age=500");
    }
}
