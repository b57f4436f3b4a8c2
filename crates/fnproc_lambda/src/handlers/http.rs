use std::collections::BTreeMap;
use std::fmt::Display;

use fnproc_core::{response, AdapterFactory, ProcessorRegistry, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EntryConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    #[serde(rename = "isBase64Encoded")]
    pub is_base64_encoded: bool,
}

impl ApiGatewayResponse {
    /// String bodies pass through verbatim, anything else is sent as JSON text.
    pub fn from_response(response: Response) -> Self {
        let body = match response.body {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => other.to_string(),
        };

        Self {
            status_code: response.status_code,
            headers: response.headers.unwrap_or_default(),
            body,
            is_base64_encoded: false,
        }
    }
}

/// Everything a warm container reuses between invocations. None of it is
/// mutated after start-up.
#[derive(Debug, Clone)]
pub struct ProcessorRuntime {
    pub config: EntryConfig,
    pub adapters: AdapterFactory,
    pub registry: ProcessorRegistry,
}

impl ProcessorRuntime {
    pub fn new(config: EntryConfig, adapters: AdapterFactory, registry: ProcessorRegistry) -> Self {
        Self {
            config,
            adapters,
            registry,
        }
    }
}

/// Runtime entry point: native event in, native response out.
///
/// Adapter and loader failures are fatal for the invocation and surface as
/// a generic 500; processor errors are classified by the lifecycle.
pub async fn handle_http_event(
    runtime: &ProcessorRuntime,
    native_context: &Value,
    event: Value,
) -> ApiGatewayResponse {
    let response = dispatch(runtime, native_context, event).await;
    ApiGatewayResponse::from_response(response)
}

async fn dispatch(runtime: &ProcessorRuntime, native_context: &Value, event: Value) -> Response {
    let platform = runtime.config.platform.as_str();
    let processor_name = runtime.config.processor_name.as_str();

    let context = match runtime.adapters.create_context(platform, native_context) {
        Ok(value) => value,
        Err(error) => return fatal("context_adapter_failed", processor_name, error),
    };

    let request = match runtime.adapters.create_request(platform, event) {
        Ok(value) => value,
        Err(error) => return fatal("request_adapter_failed", processor_name, error),
    };

    let processor = match runtime.registry.instantiate(processor_name, context) {
        Ok(value) => value,
        Err(error) => return fatal("processor_load_failed", processor_name, error),
    };

    fnproc_core::execute(processor.as_ref(), &request).await
}

fn fatal(event: &str, processor_name: &str, error: impl Display) -> Response {
    tracing::error!(event, processor = processor_name, %error, "invocation aborted");
    response::server_error()
}
