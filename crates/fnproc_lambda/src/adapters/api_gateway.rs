use std::collections::BTreeMap;
use std::sync::Arc;

use fnproc_core::{AdapterError, Context, PlatformAdapter, QueryParams, Request};
use serde::Deserialize;
use serde_json::Value;

pub const PLATFORM_ID: &str = "aws-lambda";

/// API Gateway proxy event, payload format 1.0 or 2.0.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProxyEvent {
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    query_string_parameters: Option<QueryParams>,
    #[serde(default)]
    headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    path_parameters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    http_method: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    raw_path: Option<String>,
    #[serde(default)]
    request_context: Option<ProxyRequestContext>,
}

#[derive(Debug, Default, Deserialize)]
struct ProxyRequestContext {
    #[serde(default)]
    http: Option<ProxyHttp>,
}

#[derive(Debug, Default, Deserialize)]
struct ProxyHttp {
    #[serde(default)]
    method: Option<String>,
}

/// The parts of `lambda_runtime::Context` the log sink carries.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct InvocationMetadata {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub invoked_function_arn: Option<String>,
    #[serde(default)]
    pub xray_trace_id: Option<String>,
}

impl InvocationMetadata {
    pub fn from_lambda(context: &lambda_runtime::Context) -> Self {
        Self {
            request_id: Some(context.request_id.clone()),
            invoked_function_arn: Some(context.invoked_function_arn.clone()),
            xray_trace_id: context.xray_trace_id.clone(),
        }
    }

    pub fn to_native(&self) -> Value {
        serde_json::json!({
            "request_id": self.request_id,
            "invoked_function_arn": self.invoked_function_arn,
            "xray_trace_id": self.xray_trace_id,
        })
    }
}

/// Lambda's native log channel is the function's stdout, which `tracing`
/// writes to; every line carries the invocation's request id.
#[derive(Debug, Clone)]
pub struct LambdaContextAdapter {
    metadata: InvocationMetadata,
}

impl LambdaContextAdapter {
    pub fn new(metadata: InvocationMetadata) -> Self {
        Self { metadata }
    }

    pub fn metadata(&self) -> &InvocationMetadata {
        &self.metadata
    }

    fn request_id(&self) -> &str {
        self.metadata.request_id.as_deref().unwrap_or("-")
    }
}

impl Context for LambdaContextAdapter {
    fn log(&self, message: &str) {
        tracing::info!(request_id = self.request_id(), "{message}");
    }

    fn log_error(&self, error: &str) {
        tracing::error!(request_id = self.request_id(), "{error}");
    }

    fn log_warning(&self, message: &str) {
        tracing::warn!(request_id = self.request_id(), "{message}");
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApiGatewayAdapter;

impl PlatformAdapter for ApiGatewayAdapter {
    fn platform(&self) -> &str {
        PLATFORM_ID
    }

    fn create_context(&self, native_context: &Value) -> Result<Arc<dyn Context>, AdapterError> {
        let metadata = if native_context.is_null() {
            InvocationMetadata::default()
        } else {
            InvocationMetadata::deserialize(native_context).map_err(|error| {
                AdapterError::MalformedContext {
                    platform: PLATFORM_ID.to_string(),
                    message: error.to_string(),
                }
            })?
        };
        Ok(Arc::new(LambdaContextAdapter::new(metadata)))
    }

    fn create_request(&self, native_request: Value) -> Result<Request, AdapterError> {
        let event: ProxyEvent =
            serde_json::from_value(native_request).map_err(|error| AdapterError::MalformedRequest {
                platform: PLATFORM_ID.to_string(),
                message: error.to_string(),
            })?;

        let method = event.http_method.or_else(|| {
            event
                .request_context
                .and_then(|context| context.http)
                .and_then(|http| http.method)
        });

        Ok(Request::builder()
            .body(event.body)
            .query(event.query_string_parameters.unwrap_or_default())
            .headers(event.headers.unwrap_or_default())
            .path_parameters(event.path_parameters.unwrap_or_default())
            .method(method)
            .path(event.path.or(event.raw_path))
            .build())
    }
}
