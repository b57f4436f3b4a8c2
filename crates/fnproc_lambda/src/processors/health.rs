use std::sync::Arc;

use async_trait::async_trait;
use fnproc_core::{response, Context, Processor, ProcessorBase, ProcessorError, Request, Response};
use serde_json::json;

pub const NAME: &str = "health";

pub struct HealthProcessor {
    base: ProcessorBase,
}

impl HealthProcessor {
    pub fn new(context: Arc<dyn Context>) -> Self {
        Self {
            base: ProcessorBase::new("HealthProcessor", context),
        }
    }
}

#[async_trait]
impl Processor for HealthProcessor {
    fn base(&self) -> &ProcessorBase {
        &self.base
    }

    async fn validate_input(&self, _request: &Request) -> Result<(), ProcessorError> {
        Ok(())
    }

    async fn process(&self, _request: &Request) -> Result<Response, ProcessorError> {
        Ok(response::success(json!({ "status": "ok" })))
    }
}
