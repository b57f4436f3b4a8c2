//! AWS Lambda integration for the processor core.
//!
//! This crate owns runtime integration details (the API Gateway platform
//! adapter, the runtime entry handler, environment configuration and log
//! bootstrap) and ships the reference processors bundled into the
//! `processor_lambda` binary.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod processors;
pub mod telemetry;
