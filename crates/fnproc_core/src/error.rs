use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error raised by a processor's `validate_input` or `process`.
///
/// The kind is fixed at the raise site; the lifecycle turns it into a
/// response with an exhaustive match on [`ErrorClass`].
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("{message}")]
    Validation { message: String },
    #[error("{message}")]
    Client { status: u16, message: String },
    #[error("{message}")]
    Server {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Client(u16),
    Server,
}

impl ProcessorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn client(status: u16, message: impl Into<String>) -> Self {
        Self::Client {
            status,
            message: message.into(),
        }
    }

    /// Builds an error from an explicit status, routing 5xx to `Server`.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        if is_client_status(status) {
            Self::client(status, message)
        } else {
            Self::server(message)
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self::Server {
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub fn classify(&self) -> ErrorClass {
        match self {
            Self::Validation { .. } => ErrorClass::Validation,
            Self::Client { status, .. } if is_client_status(*status) => ErrorClass::Client(*status),
            Self::Client { .. } | Self::Server { .. } => ErrorClass::Server,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message }
            | Self::Client { message, .. }
            | Self::Server { message, .. } => message,
        }
    }
}

impl From<serde_json::Error> for ProcessorError {
    fn from(error: serde_json::Error) -> Self {
        Self::internal(error)
    }
}

fn is_client_status(status: u16) -> bool {
    (1..500).contains(&status)
}

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("processor not found: {expected_path}")]
    NotFound { name: String, expected_path: String },
    #[error("failed to load processor {name}: {source}")]
    Load {
        name: String,
        #[source]
        source: BoxError,
    },
    #[error("processor {name} is already registered")]
    AlreadyRegistered { name: String },
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("unsupported platform: {platform}")]
    UnsupportedPlatform { platform: String },
    #[error("malformed {platform} request: {message}")]
    MalformedRequest { platform: String, message: String },
    #[error("malformed {platform} context: {message}")]
    MalformedContext { platform: String, message: String },
    #[error("platform {platform} is already registered")]
    AlreadyRegistered { platform: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_status_routes_server_codes() {
        assert_eq!(
            ProcessorError::with_status(403, "forbidden").classify(),
            ErrorClass::Client(403)
        );
        assert_eq!(
            ProcessorError::with_status(502, "upstream").classify(),
            ErrorClass::Server
        );
    }

    #[test]
    fn client_variant_outside_range_is_server() {
        assert_eq!(ProcessorError::client(0, "zero").classify(), ErrorClass::Server);
        assert_eq!(ProcessorError::client(503, "busy").classify(), ErrorClass::Server);
    }

    #[test]
    fn internal_keeps_source_message() {
        let error = ProcessorError::internal("disk on fire");
        assert_eq!(error.message(), "disk on fire");
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn loader_errors_name_path_and_cause() {
        let missing = LoaderError::NotFound {
            name: "orders".to_string(),
            expected_path: "processor/orders/src/main".to_string(),
        };
        assert_eq!(
            missing.to_string(),
            "processor not found: processor/orders/src/main"
        );

        let load = LoaderError::Load {
            name: "orders".to_string(),
            source: "bad table".into(),
        };
        assert_eq!(load.to_string(), "failed to load processor orders: bad table");
    }
}
