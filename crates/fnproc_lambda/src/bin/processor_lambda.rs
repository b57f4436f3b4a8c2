use std::sync::Arc;

use fnproc_lambda::adapters::api_gateway::InvocationMetadata;
use fnproc_lambda::adapters::default_adapter_factory;
use fnproc_lambda::config::EntryConfig;
use fnproc_lambda::handlers::http::{handle_http_event, ApiGatewayResponse, ProcessorRuntime};
use fnproc_lambda::processors::builtin_registry;
use fnproc_lambda::telemetry::init_tracing;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(
    runtime: Arc<ProcessorRuntime>,
    event: LambdaEvent<Value>,
) -> Result<ApiGatewayResponse, Error> {
    let native_context = InvocationMetadata::from_lambda(&event.context).to_native();
    Ok(handle_http_event(&runtime, &native_context, event.payload).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = EntryConfig::from_env().map_err(|error| Error::from(error.to_string()))?;
    let adapters = default_adapter_factory().map_err(|error| Error::from(error.to_string()))?;
    let registry = builtin_registry().map_err(|error| Error::from(error.to_string()))?;
    tracing::info!(
        processor = %config.processor_name,
        platform = %config.platform,
        "processor runtime starting"
    );

    let runtime = Arc::new(ProcessorRuntime::new(config, adapters, registry));
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let runtime = Arc::clone(&runtime);
        async move { handle_request(runtime, event).await }
    }))
    .await
}
