//! Ready-made [`Context`] sinks.

use crate::contract::Context;

/// Forwards every call to `tracing` under a fixed component label.
#[derive(Debug, Clone)]
pub struct TracingContext {
    component: String,
}

impl TracingContext {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }
}

impl Default for TracingContext {
    fn default() -> Self {
        Self::new("processor")
    }
}

impl Context for TracingContext {
    fn log(&self, message: &str) {
        tracing::info!(component = %self.component, "{message}");
    }

    fn log_error(&self, error: &str) {
        tracing::error!(component = %self.component, "{error}");
    }

    fn log_warning(&self, message: &str) {
        tracing::warn!(component = %self.component, "{message}");
    }
}

#[cfg(feature = "test-helpers")]
pub use capture::{CapturingContext, LogLevel};

#[cfg(feature = "test-helpers")]
mod capture {
    use std::sync::Mutex;

    use crate::contract::Context;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LogLevel {
        Info,
        Warning,
        Error,
    }

    /// Records log lines in memory so tests can assert on them.
    #[derive(Debug, Default)]
    pub struct CapturingContext {
        lines: Mutex<Vec<(LogLevel, String)>>,
    }

    impl CapturingContext {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn lines(&self) -> Vec<(LogLevel, String)> {
            match self.lines.lock() {
                Ok(lines) => lines.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            }
        }

        pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
            self.lines()
                .into_iter()
                .filter(|(line_level, _)| *line_level == level)
                .map(|(_, message)| message)
                .collect()
        }

        fn push(&self, level: LogLevel, message: &str) {
            // A poisoned sink keeps recording; logging must not fail the caller.
            let mut lines = match self.lines.lock() {
                Ok(lines) => lines,
                Err(poisoned) => poisoned.into_inner(),
            };
            lines.push((level, message.to_string()));
        }
    }

    impl Context for CapturingContext {
        fn log(&self, message: &str) {
            self.push(LogLevel::Info, message);
        }

        fn log_error(&self, error: &str) {
            self.push(LogLevel::Error, error);
        }

        fn log_warning(&self, message: &str) {
            self.push(LogLevel::Warning, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[test]
    #[traced_test]
    fn tracing_context_forwards_each_channel() {
        let context = TracingContext::new("orders");
        context.log("started");
        context.log_warning("slow upstream");
        context.log_error("exploded");

        assert!(logs_contain("started"));
        assert!(logs_contain("slow upstream"));
        assert!(logs_contain("exploded"));
        assert!(logs_contain("orders"));
    }

    #[cfg(feature = "test-helpers")]
    #[test]
    fn capturing_context_keeps_levels() {
        let context = CapturingContext::new();
        context.log("one");
        context.log_warning("two");
        context.log_error("three");

        assert_eq!(
            context.lines(),
            vec![
                (LogLevel::Info, "one".to_string()),
                (LogLevel::Warning, "two".to_string()),
                (LogLevel::Error, "three".to_string()),
            ]
        );
        assert_eq!(context.messages_at(LogLevel::Warning), vec!["two".to_string()]);
    }
}
