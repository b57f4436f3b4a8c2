//! Processors bundled into the Lambda binary.

pub mod echo;
pub mod health;

use std::sync::Arc;

use fnproc_core::loader::boxed;
use fnproc_core::{Context, LoaderError, ProcessorRegistry};

pub fn builtin_registry() -> Result<ProcessorRegistry, LoaderError> {
    ProcessorRegistry::new()
        .with(echo::NAME, |context: Arc<dyn Context>| {
            boxed(echo::EchoProcessor::new(context))
        })?
        .with(health::NAME, |context: Arc<dyn Context>| {
            boxed(health::HealthProcessor::new(context))
        })
}
