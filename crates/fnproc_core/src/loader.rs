//! Name-keyed processor registry.
//!
//! The deployment assembling a binary registers every processor it ships at
//! start-up; invocations then pick one by name. The set of names is whatever
//! was registered, the core knows none of them.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::contract::Context;
use crate::error::{BoxError, LoaderError};
use crate::processor::Processor;

pub type ProcessorFactory =
    Arc<dyn Fn(Arc<dyn Context>) -> Result<Box<dyn Processor>, BoxError> + Send + Sync>;

/// Conventional module location reported when a name is not registered.
pub fn expected_module_path(name: &str) -> String {
    format!("processor/{name}/src/main")
}

/// Boxes a constructed processor into the shape factories return.
pub fn boxed<P>(processor: P) -> Result<Box<dyn Processor>, BoxError>
where
    P: Processor + 'static,
{
    Ok(Box::new(processor))
}

#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    factories: BTreeMap<String, ProcessorFactory>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), LoaderError>
    where
        F: Fn(Arc<dyn Context>) -> Result<Box<dyn Processor>, BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(LoaderError::AlreadyRegistered { name });
        }
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Chaining form of [`register`](Self::register) for start-up code.
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Result<Self, LoaderError>
    where
        F: Fn(Arc<dyn Context>) -> Result<Box<dyn Processor>, BoxError> + Send + Sync + 'static,
    {
        self.register(name, factory)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn resolve(&self, name: &str) -> Result<ProcessorFactory, LoaderError> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| LoaderError::NotFound {
                name: name.to_string(),
                expected_path: expected_module_path(name),
            })
    }

    pub fn instantiate(
        &self,
        name: &str,
        context: Arc<dyn Context>,
    ) -> Result<Box<dyn Processor>, LoaderError> {
        let result = self.resolve(name).and_then(|factory| {
            factory(context).map_err(|source| LoaderError::Load {
                name: name.to_string(),
                source,
            })
        });

        if let Err(error) = &result {
            tracing::error!(processor = name, %error, "error loading processor");
        }
        result
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
