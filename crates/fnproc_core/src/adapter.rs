//! Platform adapter seam and the registry that selects one by identifier.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::contract::{Context, Request};
use crate::error::AdapterError;

/// Translates one host runtime's native invocation into the neutral contract.
///
/// Request translation maps fields structurally and never rewrites values.
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> &str;

    fn create_context(&self, native_context: &Value) -> Result<Arc<dyn Context>, AdapterError>;

    fn create_request(&self, native_request: Value) -> Result<Request, AdapterError>;
}

#[derive(Clone, Default)]
pub struct AdapterFactory {
    adapters: BTreeMap<String, Arc<dyn PlatformAdapter>>,
}

impl AdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: impl PlatformAdapter + 'static) -> Result<(), AdapterError> {
        let platform = adapter.platform().to_string();
        if self.adapters.contains_key(&platform) {
            return Err(AdapterError::AlreadyRegistered { platform });
        }
        self.adapters.insert(platform, Arc::new(adapter));
        Ok(())
    }

    pub fn platforms(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn adapter(&self, platform: &str) -> Result<&Arc<dyn PlatformAdapter>, AdapterError> {
        self.adapters
            .get(platform)
            .ok_or_else(|| AdapterError::UnsupportedPlatform {
                platform: platform.to_string(),
            })
    }

    pub fn create_context(
        &self,
        platform: &str,
        native_context: &Value,
    ) -> Result<Arc<dyn Context>, AdapterError> {
        self.adapter(platform)?.create_context(native_context)
    }

    pub fn create_request(&self, platform: &str, native_request: Value) -> Result<Request, AdapterError> {
        self.adapter(platform)?.create_request(native_request)
    }
}

impl std::fmt::Debug for AdapterFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterFactory")
            .field("platforms", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::context::TracingContext;

    struct Passthrough;

    impl PlatformAdapter for Passthrough {
        fn platform(&self) -> &str {
            "passthrough"
        }

        fn create_context(&self, _native_context: &Value) -> Result<Arc<dyn Context>, AdapterError> {
            Ok(Arc::new(TracingContext::default()))
        }

        fn create_request(&self, native_request: Value) -> Result<Request, AdapterError> {
            Ok(Request::builder().body(Some(native_request)).build())
        }
    }

    #[test]
    fn dispatches_on_registered_platform() {
        let mut factory = AdapterFactory::new();
        factory.register(Passthrough).unwrap();

        let request = factory.create_request("passthrough", json!({"a": 1})).unwrap();
        assert_eq!(request.body(), Some(&json!({"a": 1})));
        assert!(factory.create_context("passthrough", &Value::Null).is_ok());
        assert_eq!(factory.platforms().collect::<Vec<_>>(), vec!["passthrough"]);
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let factory = AdapterFactory::new();

        let error = factory.create_request("gcp", json!({})).unwrap_err();
        assert_eq!(error.to_string(), "unsupported platform: gcp");
        assert!(matches!(
            factory.create_context("gcp", &Value::Null),
            Err(AdapterError::UnsupportedPlatform { .. })
        ));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut factory = AdapterFactory::new();
        factory.register(Passthrough).unwrap();
        assert!(matches!(
            factory.register(Passthrough),
            Err(AdapterError::AlreadyRegistered { .. })
        ));
    }
}
