//! Platform-agnostic execution core for serverless processors.
//!
//! This crate owns the neutral request/response/context contract, the
//! processor lifecycle and the name-keyed registries used to resolve
//! platform adapters and processors. It intentionally excludes any host
//! runtime SDK and any network client.
//! See `crates/fnproc_lambda` for the AWS Lambda integration.

pub mod adapter;
pub mod context;
pub mod contract;
pub mod error;
pub mod loader;
pub mod processor;
pub mod response;
pub mod validation;

pub use adapter::{AdapterFactory, PlatformAdapter};
pub use context::TracingContext;
pub use contract::{Context, Headers, QueryParams, Request, RequestBuilder, Response};
pub use error::{AdapterError, BoxError, ErrorClass, LoaderError, ProcessorError};
pub use loader::{ProcessorFactory, ProcessorRegistry};
pub use processor::{execute, run_lifecycle, LifecycleState, Processor, ProcessorBase};
