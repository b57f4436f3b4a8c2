//! Outbound HTTP client with JSON, urlencoded and multipart bodies.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::mime::{mime_type_for_filename, DEFAULT_MIME_TYPE};

pub type HttpHeaders = BTreeMap<String, String>;
pub type HttpParams = BTreeMap<String, Value>;

const CONTENT_TYPE_HEADER: &str = "Content-Type";
const JSON_CONTENT_TYPE: &str = "application/json";
const URLENCODED_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid url for endpoint {endpoint}: {message}")]
    InvalidUrl { endpoint: String, message: String },
    #[error("{content_type} body cannot carry {message}")]
    UnsupportedBody {
        content_type: &'static str,
        message: String,
    },
    #[error("{method} request failed: {source}")]
    Request {
        method: Method,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode {method} response: {source}")]
    Decode {
        method: Method,
        #[source]
        source: serde_json::Error,
    },
}

impl HttpError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request { source, .. } if source.is_timeout())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentType {
    #[default]
    Json,
    FormData,
    FormUrlEncoded,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::FormData => "form-data",
            Self::FormUrlEncoded => "form-urlencoded",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub headers: HttpHeaders,
    pub params: HttpParams,
    /// Aborts the call once exceeded.
    pub timeout: Option<Duration>,
    pub content_type: ContentType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileField {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
}

impl FileField {
    pub fn new(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: Some(filename.into()),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    fn resolved_mime_type(&self) -> &str {
        match (&self.mime_type, &self.filename) {
            (Some(mime_type), _) => mime_type,
            (None, Some(filename)) => mime_type_for_filename(filename),
            (None, None) => DEFAULT_MIME_TYPE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    Value(Value),
    Values(Vec<Value>),
    File(FileField),
    Files(Vec<FileField>),
}

/// Arrays repeat the key. An object carrying a `value` key is the
/// `{value, filename}` field shape; JSON cannot hold binary, so only the
/// inner value is sent and the filename is dropped. Binary attachments go
/// through [`FormField::File`].
impl From<Value> for FormField {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::Values(items),
            Value::Object(mut object) if object.contains_key("value") => {
                Self::Value(object.remove("value").unwrap_or(Value::Null))
            }
            other => Self::Value(other),
        }
    }
}

/// Payload handed to `post`, `put` and `patch`. The encoding is chosen by
/// [`RequestConfig::content_type`].
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Fields(Vec<(String, FormField)>),
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub data: Value,
    pub status: u16,
    pub status_text: String,
    pub headers: HttpHeaders,
    pub success: bool,
}

impl HttpResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

#[derive(Debug)]
pub(crate) enum PreparedBody {
    Empty,
    Json(String),
    UrlEncoded(Vec<(String, String)>),
    Multipart(Vec<(String, PreparedPart)>),
}

#[derive(Debug, PartialEq)]
pub(crate) enum PreparedPart {
    Text(String),
    File(FileField),
}

#[derive(Debug, Clone)]
pub struct HttpService {
    client: reqwest::Client,
    base_url: Option<Url>,
    default_headers: HttpHeaders,
}

impl HttpService {
    /// An empty `base_url` means every endpoint must be absolute.
    pub fn new(base_url: &str, default_headers: HttpHeaders) -> Result<Self, HttpError> {
        Self::with_client(reqwest::Client::new(), base_url, default_headers)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        default_headers: HttpHeaders,
    ) -> Result<Self, HttpError> {
        let base_url = if base_url.is_empty() {
            None
        } else {
            Some(Url::parse(base_url).map_err(|error| HttpError::InvalidUrl {
                endpoint: base_url.to_string(),
                message: error.to_string(),
            })?)
        };

        let mut headers = HttpHeaders::new();
        headers.insert(CONTENT_TYPE_HEADER.to_string(), JSON_CONTENT_TYPE.to_string());
        merge_headers(&mut headers, &default_headers);

        Ok(Self {
            client,
            base_url,
            default_headers: headers,
        })
    }

    pub fn default_headers(&self) -> &HttpHeaders {
        &self.default_headers
    }

    pub fn set_default_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        set_header(&mut self.default_headers, key.into(), value.into());
    }

    pub fn remove_default_header(&mut self, key: &str) {
        self.default_headers.retain(|name, _| !name.eq_ignore_ascii_case(key));
    }

    pub async fn get(&self, endpoint: &str, config: &RequestConfig) -> Result<HttpResponse, HttpError> {
        self.send(Method::GET, endpoint, None, config).await
    }

    pub async fn post(
        &self,
        endpoint: &str,
        body: Option<RequestBody>,
        config: &RequestConfig,
    ) -> Result<HttpResponse, HttpError> {
        self.send(Method::POST, endpoint, body, config).await
    }

    pub async fn put(
        &self,
        endpoint: &str,
        body: Option<RequestBody>,
        config: &RequestConfig,
    ) -> Result<HttpResponse, HttpError> {
        self.send(Method::PUT, endpoint, body, config).await
    }

    pub async fn patch(
        &self,
        endpoint: &str,
        body: Option<RequestBody>,
        config: &RequestConfig,
    ) -> Result<HttpResponse, HttpError> {
        self.send(Method::PATCH, endpoint, body, config).await
    }

    pub async fn delete(&self, endpoint: &str, config: &RequestConfig) -> Result<HttpResponse, HttpError> {
        self.send(Method::DELETE, endpoint, None, config).await
    }

    pub async fn upload_file(
        &self,
        endpoint: &str,
        file: FileField,
        field_name: Option<&str>,
        additional_fields: BTreeMap<String, Value>,
        config: &RequestConfig,
    ) -> Result<HttpResponse, HttpError> {
        let mut fields = vec![(field_name.unwrap_or("file").to_string(), FormField::File(file))];
        fields.extend(additional_fields.into_iter().map(|(key, value)| (key, FormField::from(value))));
        self.post_form_data(endpoint, fields, config).await
    }

    pub async fn upload_files(
        &self,
        endpoint: &str,
        files: Vec<FileField>,
        field_name: Option<&str>,
        additional_fields: BTreeMap<String, Value>,
        config: &RequestConfig,
    ) -> Result<HttpResponse, HttpError> {
        let mut fields = vec![(field_name.unwrap_or("files").to_string(), FormField::Files(files))];
        fields.extend(additional_fields.into_iter().map(|(key, value)| (key, FormField::from(value))));
        self.post_form_data(endpoint, fields, config).await
    }

    async fn post_form_data(
        &self,
        endpoint: &str,
        fields: Vec<(String, FormField)>,
        config: &RequestConfig,
    ) -> Result<HttpResponse, HttpError> {
        let config = RequestConfig {
            content_type: ContentType::FormData,
            ..config.clone()
        };
        self.post(endpoint, Some(RequestBody::Fields(fields)), &config).await
    }

    pub(crate) fn build_url(&self, endpoint: &str, params: &HttpParams) -> Result<Url, HttpError> {
        let parsed = match &self.base_url {
            Some(base) => base.join(endpoint),
            None => Url::parse(endpoint),
        };
        let mut url = parsed.map_err(|error| HttpError::InvalidUrl {
            endpoint: endpoint.to_string(),
            message: error.to_string(),
        })?;

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, &value_text(value));
            }
        }
        Ok(url)
    }

    /// Defaults, then body-derived headers, then caller headers. Names
    /// compare case-insensitively, so each header is sent once. A body that
    /// sets no content type (multipart) also drops the default one.
    pub(crate) fn combine_headers(
        &self,
        custom: &HttpHeaders,
        content: Option<&HttpHeaders>,
    ) -> HttpHeaders {
        let mut combined = self.default_headers.clone();
        if let Some(content) = content {
            if !has_header(content, CONTENT_TYPE_HEADER) {
                combined.retain(|name, _| !name.eq_ignore_ascii_case(CONTENT_TYPE_HEADER));
            }
            merge_headers(&mut combined, content);
        }
        merge_headers(&mut combined, custom);
        combined
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<RequestBody>,
        config: &RequestConfig,
    ) -> Result<HttpResponse, HttpError> {
        let url = self.build_url(endpoint, &config.params)?;
        let has_body = method != Method::GET && method != Method::DELETE;

        let (prepared, headers) = if has_body {
            let (prepared, content_headers) = prepare_body(body, config.content_type)?;
            (prepared, self.combine_headers(&config.headers, Some(&content_headers)))
        } else {
            (PreparedBody::Empty, self.combine_headers(&config.headers, None))
        };

        tracing::debug!(%method, %url, content_type = config.content_type.as_str(), "outbound request");

        let mut builder = self.client.request(method.clone(), url);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match prepared {
            PreparedBody::Empty => builder,
            PreparedBody::Json(text) => builder.body(text),
            PreparedBody::UrlEncoded(pairs) => builder.form(&pairs),
            PreparedBody::Multipart(parts) => builder.multipart(multipart_form(parts).map_err(
                |source| HttpError::Request {
                    method: method.clone(),
                    source,
                },
            )?),
        };

        let response = builder.send().await.map_err(|source| HttpError::Request {
            method: method.clone(),
            source,
        })?;
        process_response(method, response).await
    }
}

pub(crate) fn prepare_body(
    body: Option<RequestBody>,
    content_type: ContentType,
) -> Result<(PreparedBody, HttpHeaders), HttpError> {
    let mut headers = HttpHeaders::new();

    let prepared = match content_type {
        ContentType::Json => {
            headers.insert(CONTENT_TYPE_HEADER.to_string(), JSON_CONTENT_TYPE.to_string());
            match body {
                None | Some(RequestBody::Json(Value::Null)) => PreparedBody::Empty,
                Some(RequestBody::Json(value)) => PreparedBody::Json(value.to_string()),
                Some(RequestBody::Fields(fields)) => {
                    let mut object = serde_json::Map::new();
                    for (key, field) in fields {
                        let value = match field {
                            FormField::Value(value) => value,
                            FormField::Values(values) => Value::Array(values),
                            FormField::File(_) | FormField::Files(_) => {
                                return Err(HttpError::UnsupportedBody {
                                    content_type: ContentType::Json.as_str(),
                                    message: format!("file field `{key}`"),
                                })
                            }
                        };
                        object.insert(key, value);
                    }
                    PreparedBody::Json(Value::Object(object).to_string())
                }
            }
        }
        ContentType::FormUrlEncoded => {
            headers.insert(
                CONTENT_TYPE_HEADER.to_string(),
                URLENCODED_CONTENT_TYPE.to_string(),
            );
            let mut pairs = Vec::new();
            for (key, field) in body_fields(body) {
                match field {
                    FormField::Value(value) => pairs.push((key, value_text(&value))),
                    FormField::Values(values) => {
                        pairs.extend(values.iter().map(|value| (key.clone(), value_text(value))))
                    }
                    FormField::File(_) | FormField::Files(_) => {
                        return Err(HttpError::UnsupportedBody {
                            content_type: ContentType::FormUrlEncoded.as_str(),
                            message: format!("file field `{key}`"),
                        })
                    }
                }
            }
            PreparedBody::UrlEncoded(pairs)
        }
        ContentType::FormData => {
            let mut parts = Vec::new();
            for (key, field) in body_fields(body) {
                match field {
                    FormField::Value(value) => parts.push((key, PreparedPart::Text(value_text(&value)))),
                    FormField::Values(values) => parts.extend(
                        values
                            .iter()
                            .map(|value| (key.clone(), PreparedPart::Text(value_text(value)))),
                    ),
                    FormField::File(file) => parts.push((key, PreparedPart::File(file))),
                    FormField::Files(files) => parts.extend(
                        files
                            .into_iter()
                            .map(|file| (key.clone(), PreparedPart::File(file))),
                    ),
                }
            }
            PreparedBody::Multipart(parts)
        }
    };

    Ok((prepared, headers))
}

/// Flattens a JSON object body into ordered form fields; other shapes carry
/// no fields.
fn body_fields(body: Option<RequestBody>) -> Vec<(String, FormField)> {
    match body {
        Some(RequestBody::Fields(fields)) => fields,
        Some(RequestBody::Json(Value::Object(object))) => object
            .into_iter()
            .map(|(key, value)| (key, FormField::from(value)))
            .collect(),
        Some(RequestBody::Json(_)) | None => Vec::new(),
    }
}

fn multipart_form(parts: Vec<(String, PreparedPart)>) -> Result<Form, reqwest::Error> {
    let mut form = Form::new();
    for (key, part) in parts {
        form = match part {
            PreparedPart::Text(text) => form.text(key, text),
            PreparedPart::File(file) => {
                let mime_type = file.resolved_mime_type().to_string();
                let mut part = Part::bytes(file.bytes);
                if let Some(filename) = file.filename {
                    part = part.file_name(filename);
                }
                form.part(key, part.mime_str(&mime_type)?)
            }
        };
    }
    Ok(form)
}

async fn process_response(method: Method, response: reqwest::Response) -> Result<HttpResponse, HttpError> {
    let status = response.status();
    let mut headers = HttpHeaders::new();
    for (name, value) in response.headers() {
        if let Ok(text) = value.to_str() {
            headers.insert(name.as_str().to_string(), text.to_string());
        }
    }
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains(JSON_CONTENT_TYPE))
        .unwrap_or(false);

    let text = response.text().await.map_err(|source| HttpError::Request {
        method: method.clone(),
        source,
    })?;
    let data = if is_json {
        serde_json::from_str(&text).map_err(|source| HttpError::Decode { method, source })?
    } else {
        Value::String(text)
    };

    Ok(HttpResponse {
        data,
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        headers,
        success: status.is_success(),
    })
}

fn has_header(headers: &HttpHeaders, name: &str) -> bool {
    headers.keys().any(|key| key.eq_ignore_ascii_case(name))
}

/// Replaces any header with the same name regardless of case.
fn set_header(headers: &mut HttpHeaders, name: String, value: String) {
    headers.retain(|key, _| !key.eq_ignore_ascii_case(&name));
    headers.insert(name, value);
}

fn merge_headers(headers: &mut HttpHeaders, overrides: &HttpHeaders) {
    for (name, value) in overrides {
        set_header(headers, name.clone(), value.clone());
    }
}

/// Text form of a scalar as it appears in query strings and form fields.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn service() -> HttpService {
        HttpService::new("https://api.example.com/v1/", HttpHeaders::new()).unwrap()
    }

    #[test]
    fn builds_url_relative_to_base_with_params() {
        let mut params = HttpParams::new();
        params.insert("page".to_string(), json!(2));
        params.insert("q".to_string(), json!("a b"));

        let url = service().build_url("orders", &params).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/orders?page=2&q=a+b");
    }

    #[test]
    fn relative_endpoint_without_base_is_rejected() {
        let service = HttpService::new("", HttpHeaders::new()).unwrap();
        assert!(matches!(
            service.build_url("orders", &HttpParams::new()),
            Err(HttpError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn urlencoded_repeats_array_keys() {
        let (prepared, headers) = prepare_body(
            Some(RequestBody::Json(json!({"tag": ["a", "b"], "n": 1}))),
            ContentType::FormUrlEncoded,
        )
        .unwrap();

        match prepared {
            PreparedBody::UrlEncoded(mut pairs) => {
                pairs.sort();
                assert_eq!(
                    pairs,
                    vec![
                        ("n".to_string(), "1".to_string()),
                        ("tag".to_string(), "a".to_string()),
                        ("tag".to_string(), "b".to_string()),
                    ]
                );
            }
            other => panic!("unexpected body: {other:?}"),
        }
        assert_eq!(
            headers.get(CONTENT_TYPE_HEADER).map(String::as_str),
            Some(URLENCODED_CONTENT_TYPE)
        );
    }

    #[test]
    fn form_data_keeps_files_and_drops_default_content_type() {
        let (prepared, content_headers) = prepare_body(
            Some(RequestBody::Fields(vec![
                ("note".to_string(), FormField::Value(json!(true))),
                ("doc".to_string(), FormField::File(FileField::new("x", "a.pdf"))),
            ])),
            ContentType::FormData,
        )
        .unwrap();

        match prepared {
            PreparedBody::Multipart(parts) => {
                assert_eq!(parts[0], ("note".to_string(), PreparedPart::Text("true".to_string())));
                assert!(matches!(&parts[1].1, PreparedPart::File(file) if file.resolved_mime_type() == "application/pdf"));
            }
            other => panic!("unexpected body: {other:?}"),
        }

        let combined = service().combine_headers(&HttpHeaders::new(), Some(&content_headers));
        assert!(!combined.contains_key(CONTENT_TYPE_HEADER));
    }

    #[test]
    fn form_data_value_objects_send_their_inner_value() {
        let (prepared, _) = prepare_body(
            Some(RequestBody::Json(json!({
                "name": {"value": "x", "filename": "n.txt"},
                "count": {"value": 3},
                "meta": {"kind": "plain"}
            }))),
            ContentType::FormData,
        )
        .unwrap();

        match prepared {
            PreparedBody::Multipart(mut parts) => {
                parts.sort_by(|a, b| a.0.cmp(&b.0));
                assert_eq!(
                    parts,
                    vec![
                        ("count".to_string(), PreparedPart::Text("3".to_string())),
                        (
                            "meta".to_string(),
                            PreparedPart::Text("{\"kind\":\"plain\"}".to_string())
                        ),
                        ("name".to_string(), PreparedPart::Text("x".to_string())),
                    ]
                );
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn header_overrides_ignore_case() {
        let mut service = service();
        service.set_default_header("x-client", "fnproc");
        service.set_default_header("X-Client", "fnproc-2");
        assert_eq!(service.default_headers().len(), 2);

        let mut custom = HttpHeaders::new();
        custom.insert("content-type".to_string(), "text/plain".to_string());
        let combined = service.combine_headers(&custom, None);

        assert_eq!(combined.len(), 2);
        assert_eq!(combined.get("content-type").map(String::as_str), Some("text/plain"));
        assert!(!combined.contains_key(CONTENT_TYPE_HEADER));
        assert_eq!(combined.get("X-Client").map(String::as_str), Some("fnproc-2"));

        service.remove_default_header("X-CLIENT");
        assert_eq!(service.default_headers().len(), 1);
    }

    #[test]
    fn json_rejects_file_fields() {
        let result = prepare_body(
            Some(RequestBody::Fields(vec![(
                "doc".to_string(),
                FormField::File(FileField::new("x", "a.txt")),
            )])),
            ContentType::Json,
        );
        assert!(matches!(result, Err(HttpError::UnsupportedBody { .. })));
    }

    #[test]
    fn caller_headers_override_defaults() {
        let mut service = service();
        service.set_default_header("X-Client", "fnproc");
        let mut custom = HttpHeaders::new();
        custom.insert("X-Client".to_string(), "override".to_string());

        let combined = service.combine_headers(&custom, None);
        assert_eq!(combined.get("X-Client").map(String::as_str), Some("override"));
        assert_eq!(
            combined.get(CONTENT_TYPE_HEADER).map(String::as_str),
            Some(JSON_CONTENT_TYPE)
        );

        service.remove_default_header("X-Client");
        assert!(!service.default_headers().contains_key("X-Client"));
    }
}
