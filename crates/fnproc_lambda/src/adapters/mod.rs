pub mod api_gateway;

use fnproc_core::{AdapterError, AdapterFactory};

/// Factory with every platform adapter this crate ships.
pub fn default_adapter_factory() -> Result<AdapterFactory, AdapterError> {
    let mut factory = AdapterFactory::new();
    factory.register(api_gateway::ApiGatewayAdapter)?;
    Ok(factory)
}
