use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProcessorError;

pub type Headers = BTreeMap<String, String>;
pub type QueryParams = BTreeMap<String, Value>;

/// Logging sink handed to a processor for the duration of one invocation.
///
/// Calls are best effort and synchronous into the host runtime. A sink must
/// never panic on delivery failure; the lifecycle does not observe results.
pub trait Context: Send + Sync {
    fn log(&self, message: &str);
    fn log_error(&self, error: &str);
    fn log_warning(&self, message: &str);
}

/// Runtime-neutral view of an inbound invocation.
///
/// Built once by a platform adapter and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    body: Option<Value>,
    query: QueryParams,
    headers: Headers,
    path_parameters: BTreeMap<String, String>,
    method: Option<String>,
    path: Option<String>,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn path_parameters(&self) -> &BTreeMap<String, String> {
        &self.path_parameters
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn query_param(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    /// Header lookup ignoring ASCII case, since runtimes disagree on casing.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn path_parameter(&self, name: &str) -> Option<&str> {
        self.path_parameters.get(name).map(String::as_str)
    }

    /// Deserializes the body, accepting either a JSON value or a JSON-encoded
    /// string as delivered by proxy integrations.
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T, ProcessorError> {
        let body = match &self.body {
            None | Some(Value::Null) => {
                return Err(ProcessorError::validation("Request body is required"))
            }
            Some(Value::String(text)) => serde_json::from_str::<Value>(text).map_err(|error| {
                ProcessorError::validation(format!("Request body is not valid JSON: {error}"))
            })?,
            Some(other) => other.clone(),
        };

        serde_json::from_value(body).map_err(|error| {
            ProcessorError::validation(format!("Malformed request body: {error}"))
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    pub fn body(mut self, body: Option<Value>) -> Self {
        self.request.body = body.filter(|value| !value.is_null());
        self
    }

    pub fn query(mut self, query: QueryParams) -> Self {
        self.request.query = query;
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.request.query.insert(name.into(), value);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.request.headers = headers;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.insert(name.into(), value.into());
        self
    }

    pub fn path_parameters(mut self, params: BTreeMap<String, String>) -> Self {
        self.request.path_parameters = params;
        self
    }

    pub fn method(mut self, method: Option<String>) -> Self {
        self.request.method = method;
        self
    }

    pub fn path(mut self, path: Option<String>) -> Self {
        self.request.path = path;
        self
    }

    pub fn build(self) -> Request {
        self.request
    }
}

/// Runtime-neutral result of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
    pub body: Value,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// The `error` field of an error body, if present.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Order {
        id: u32,
    }

    #[test]
    fn builder_drops_null_body() {
        let request = Request::builder().body(Some(Value::Null)).build();
        assert!(request.body().is_none());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let request = Request::builder()
            .header("Content-Type", "application/json")
            .build();
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("x-missing"), None);
    }

    #[test]
    fn json_body_accepts_encoded_string_and_object() {
        let encoded = Request::builder()
            .body(Some(json!("{\"id\": 7}")))
            .build();
        let object = Request::builder().body(Some(json!({"id": 8}))).build();

        assert_eq!(encoded.json_body::<Order>().unwrap(), Order { id: 7 });
        assert_eq!(object.json_body::<Order>().unwrap(), Order { id: 8 });
    }

    #[test]
    fn json_body_failures_are_validation_errors() {
        let missing = Request::builder().build();
        let garbage = Request::builder().body(Some(json!("{not json"))).build();

        let error = missing.json_body::<Order>().unwrap_err();
        assert_eq!(error.to_string(), "Request body is required");
        assert!(matches!(
            garbage.json_body::<Order>(),
            Err(ProcessorError::Validation { .. })
        ));
    }

    #[test]
    fn response_serializes_with_camel_case_fields() {
        let response = Response {
            status_code: 204,
            headers: None,
            body: Value::Null,
        };
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded, json!({"statusCode": 204, "body": null}));
    }
}
