use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fnproc_core::validation::require_body;
use fnproc_core::{response, Context, Processor, ProcessorBase, ProcessorError, Request, Response};
use serde_json::{json, Value};

pub const NAME: &str = "echo";

/// Returns the request body together with the routing it arrived on.
pub struct EchoProcessor {
    base: ProcessorBase,
}

impl EchoProcessor {
    pub fn new(context: Arc<dyn Context>) -> Self {
        Self {
            base: ProcessorBase::new("EchoProcessor", context),
        }
    }
}

#[async_trait]
impl Processor for EchoProcessor {
    fn base(&self) -> &ProcessorBase {
        &self.base
    }

    async fn validate_input(&self, request: &Request) -> Result<(), ProcessorError> {
        require_body(request)
    }

    async fn process(&self, request: &Request) -> Result<Response, ProcessorError> {
        // Proxy integrations deliver JSON as text; fall back to the raw value.
        let body = match request.body() {
            Some(Value::String(text)) => {
                serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
            }
            Some(other) => other.clone(),
            None => Value::Null,
        };

        Ok(response::success(json!({
            "method": request.method(),
            "path": request.path(),
            "query": request.query(),
            "body": body,
            "received_at": Utc::now().to_rfc3339(),
        })))
    }
}
