//! Processor lifecycle: validate, process, classify, respond.
//!
//! Concrete processors implement [`Processor`] and hand their
//! [`ProcessorBase`] to the lifecycle through `base()`. The sequencing lives in
//! [`run_lifecycle`] so every processor gets identical logging, timing and
//! error-to-status mapping regardless of the host runtime.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use tracing::Instrument;

use crate::contract::{Context, Request, Response};
use crate::error::{ErrorClass, ProcessorError};
use crate::response;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Validating,
    Processing,
    Completed,
    Failed,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Validating => "validating",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Per-invocation state every processor owns.
pub struct ProcessorBase {
    name: String,
    context: Arc<dyn Context>,
    started_at: Instant,
}

impl ProcessorBase {
    pub fn new(name: impl Into<String>, context: Arc<dyn Context>) -> Self {
        Self {
            name: name.into(),
            context,
            started_at: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &Arc<dyn Context> {
        &self.context
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Time since construction, not since `execute` began.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn log_info(&self, message: &str) {
        self.context.log(&format!("[{}] {message}", self.name));
    }

    pub fn log_warning(&self, message: &str) {
        self.context.log_warning(&format!("[{}] {message}", self.name));
    }

    pub fn log_error(&self, error: &str) {
        self.context.log_error(&format!("[{}] {error}", self.name));
    }
}

impl std::fmt::Debug for ProcessorBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorBase")
            .field("name", &self.name)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Processor: Send + Sync {
    fn base(&self) -> &ProcessorBase;

    fn name(&self) -> &str {
        self.base().name()
    }

    async fn validate_input(&self, request: &Request) -> Result<(), ProcessorError>;

    async fn process(&self, request: &Request) -> Result<Response, ProcessorError>;
}

/// Runs one invocation through the processor and always yields a response.
///
/// A panic inside `validate_input` or `process` is caught and answered like
/// any other server error.
pub async fn run_lifecycle<P>(processor: &P, request: &Request) -> Response
where
    P: Processor + ?Sized,
{
    let span = tracing::info_span!("processor_execute", processor = %processor.name());
    let (state, response) = drive(processor, request).instrument(span.clone()).await;
    span.in_scope(|| {
        tracing::debug!(
            state = state.as_str(),
            status_code = response.status_code,
            "lifecycle finished"
        );
    });
    response
}

/// Alias of [`run_lifecycle`].
pub async fn execute<P>(processor: &P, request: &Request) -> Response
where
    P: Processor + ?Sized,
{
    run_lifecycle(processor, request).await
}

async fn drive<P>(processor: &P, request: &Request) -> (LifecycleState, Response)
where
    P: Processor + ?Sized,
{
    let base = processor.base();

    base.log_info(&format!("Processing started for {}", processor.name()));
    base.log_info(&format!(
        "Request method: {}, path: {}",
        request.method().unwrap_or("unknown"),
        request.path().unwrap_or("unknown")
    ));

    let mut state = advance(LifecycleState::Created, LifecycleState::Validating);
    let outcome = match guarded(processor.validate_input(request)).await {
        Ok(()) => {
            state = advance(state, LifecycleState::Processing);
            guarded(processor.process(request)).await
        }
        Err(error) => Err(error),
    };

    match outcome {
        Ok(result) => {
            let duration_ms = base.elapsed().as_millis();
            base.log_info(&format!(
                "Processing completed successfully in {duration_ms}ms"
            ));
            (advance(state, LifecycleState::Completed), result)
        }
        Err(error) => {
            let response = handle_error(base, state, &error);
            (advance(state, LifecycleState::Failed), response)
        }
    }
}

#[must_use]
fn advance(from: LifecycleState, to: LifecycleState) -> LifecycleState {
    tracing::debug!(from = from.as_str(), to = to.as_str(), "lifecycle transition");
    to
}

/// Turns a panic in one lifecycle step into a server error.
async fn guarded<T, F>(step: F) -> Result<T, ProcessorError>
where
    F: Future<Output = Result<T, ProcessorError>>,
{
    match AssertUnwindSafe(step).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => Err(ProcessorError::server(format!(
            "panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn handle_error(base: &ProcessorBase, failed_in: LifecycleState, error: &ProcessorError) -> Response {
    let duration_ms = base.elapsed().as_millis();

    match error.classify() {
        ErrorClass::Validation => {
            base.log_warning(&format!(
                "Validation error after {duration_ms}ms: {}",
                error.message()
            ));
            response::bad_request(error.message())
        }
        ErrorClass::Client(status) => {
            base.log_warning(&format!(
                "Client error after {duration_ms}ms: {}",
                error.message()
            ));
            response::error(error.message(), status)
        }
        ErrorClass::Server => {
            base.log_error(&format!(
                "Server error after {duration_ms}ms while {}: {}",
                failed_in.as_str(),
                error.message()
            ));
            response::server_error()
        }
    }
}

#[cfg(all(test, feature = "test-helpers"))]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::context::{CapturingContext, LogLevel};

    struct Scripted {
        base: ProcessorBase,
        validation: Option<fn() -> ProcessorError>,
        result: fn() -> Result<Response, ProcessorError>,
    }

    #[async_trait]
    impl Processor for Scripted {
        fn base(&self) -> &ProcessorBase {
            &self.base
        }

        async fn validate_input(&self, _request: &Request) -> Result<(), ProcessorError> {
            match self.validation {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        }

        async fn process(&self, _request: &Request) -> Result<Response, ProcessorError> {
            (self.result)()
        }
    }

    fn scripted(
        context: Arc<CapturingContext>,
        validation: Option<fn() -> ProcessorError>,
        result: fn() -> Result<Response, ProcessorError>,
    ) -> Scripted {
        Scripted {
            base: ProcessorBase::new("Scripted", context),
            validation,
            result,
        }
    }

    fn request() -> Request {
        Request::builder()
            .method(Some("GET".to_string()))
            .path(Some("/orders".to_string()))
            .build()
    }

    #[tokio::test]
    async fn success_logs_entry_and_completion() {
        let context = Arc::new(CapturingContext::new());
        let processor = scripted(context.clone(), None, || Ok(response::success(json!({"ok": true}))));

        let response = run_lifecycle(&processor, &request()).await;

        assert_eq!(response.status_code, 200);
        let info = context.messages_at(LogLevel::Info);
        assert_eq!(info[0], "[Scripted] Processing started for Scripted");
        assert_eq!(info[1], "[Scripted] Request method: GET, path: /orders");
        assert!(info[2].starts_with("[Scripted] Processing completed successfully in "));
    }

    #[tokio::test]
    async fn validation_failure_skips_process() {
        let context = Arc::new(CapturingContext::new());
        let processor = scripted(
            context.clone(),
            Some(|| ProcessorError::validation("name is required")),
            || panic!("process must not run after failed validation"),
        );

        let response = run_lifecycle(&processor, &request()).await;

        assert_eq!(response.status_code, 400);
        assert_eq!(response.error_message(), Some("name is required"));
        let warnings = context.messages_at(LogLevel::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Validation error after"));
    }

    #[tokio::test]
    async fn server_errors_are_logged_with_stage() {
        let context = Arc::new(CapturingContext::new());
        let processor = scripted(context.clone(), None, || {
            Err(ProcessorError::server("connection string leaked"))
        });

        let response = run_lifecycle(&processor, &request()).await;

        assert_eq!(response.status_code, 500);
        assert_eq!(response.error_message(), Some(response::INTERNAL_SERVER_ERROR_MESSAGE));
        let errors = context.messages_at(LogLevel::Error);
        assert!(errors[0].contains("while processing: connection string leaked"));
    }

    #[tokio::test]
    async fn panic_in_process_becomes_generic_server_error() {
        let context = Arc::new(CapturingContext::new());
        let processor = scripted(context.clone(), None, || {
            let statuses: Vec<u16> = Vec::new();
            Ok(response::create(statuses[0], json!(null), None))
        });

        let (state, response) = drive(&processor, &request()).await;

        assert_eq!(state, LifecycleState::Failed);
        assert_eq!(response.status_code, 500);
        assert_eq!(response.error_message(), Some(response::INTERNAL_SERVER_ERROR_MESSAGE));
        let errors = context.messages_at(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("while processing: panicked: index out of bounds"));
    }

    #[tokio::test]
    async fn panic_in_validation_is_reported_at_that_stage() {
        let context = Arc::new(CapturingContext::new());
        let processor = scripted(
            context.clone(),
            Some(|| panic!("schema table missing")),
            || Ok(response::success(json!({"ok": true}))),
        );

        let response = run_lifecycle(&processor, &request()).await;

        assert_eq!(response.status_code, 500);
        let errors = context.messages_at(LogLevel::Error);
        assert!(errors[0].contains("while validating: panicked: schema table missing"));
    }

    #[tokio::test]
    async fn drive_reports_terminal_state() {
        let context = Arc::new(CapturingContext::new());
        let ok = scripted(context.clone(), None, || Ok(response::success(json!(null))));
        let rejected = scripted(context, Some(|| ProcessorError::validation("bad")), || {
            Ok(response::success(json!(null)))
        });

        assert_eq!(drive(&ok, &request()).await.0, LifecycleState::Completed);
        assert_eq!(drive(&rejected, &request()).await.0, LifecycleState::Failed);
    }

    #[tokio::test]
    async fn elapsed_time_counts_from_construction() {
        let context = Arc::new(CapturingContext::new());
        let processor = scripted(context.clone(), None, || Ok(response::success(json!(null))));

        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = run_lifecycle(&processor, &request()).await;

        let completion = context.messages_at(LogLevel::Info).pop().unwrap_or_default();
        let duration_ms: u128 = completion
            .trim_start_matches("[Scripted] Processing completed successfully in ")
            .trim_end_matches("ms")
            .parse()
            .expect("completion line should carry a duration");
        assert!(duration_ms >= 20);
    }
}
