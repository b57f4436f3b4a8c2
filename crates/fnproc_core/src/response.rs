//! Constructors for the common response shapes.

use serde_json::{json, Value};

use crate::contract::{Headers, Response};

pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal server error";
pub const NOT_FOUND_MESSAGE: &str = "Resource not found";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

/// Caller headers override the default content type on equal keys.
pub fn create(status_code: u16, body: Value, headers: Option<Headers>) -> Response {
    let mut merged = Headers::new();
    merged.insert(CONTENT_TYPE_HEADER.to_string(), JSON_CONTENT_TYPE.to_string());
    if let Some(headers) = headers {
        merged.extend(headers);
    }

    Response {
        status_code,
        headers: Some(merged),
        body,
    }
}

pub fn success(data: Value) -> Response {
    create(200, data, None)
}

pub fn success_with_headers(data: Value, headers: Headers) -> Response {
    create(200, data, Some(headers))
}

pub fn error(message: &str, status_code: u16) -> Response {
    create(status_code, json!({ "error": message }), None)
}

pub fn server_error() -> Response {
    error(INTERNAL_SERVER_ERROR_MESSAGE, 500)
}

pub fn bad_request(message: &str) -> Response {
    error(message, 400)
}

pub fn not_found(message: Option<&str>) -> Response {
    error(message.unwrap_or(NOT_FOUND_MESSAGE), 404)
}

pub fn unauthorized(message: Option<&str>) -> Response {
    error(message.unwrap_or(UNAUTHORIZED_MESSAGE), 401)
}
