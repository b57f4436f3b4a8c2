//! Presence checks shared by processors.
//!
//! A value is missing when it is absent, JSON `null`, or the empty string.
//! `0` and `false` count as present.

use serde_json::Value;

use crate::contract::Request;
use crate::error::ProcessorError;

pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !text.is_empty(),
        Some(_) => true,
    }
}

pub fn require(value: Option<&Value>, field_name: &str) -> Result<(), ProcessorError> {
    if is_present(value) {
        Ok(())
    } else {
        Err(ProcessorError::validation(format!("{field_name} is required")))
    }
}

pub fn require_body(request: &Request) -> Result<(), ProcessorError> {
    if is_present(request.body()) {
        Ok(())
    } else {
        Err(ProcessorError::validation("Request body is required"))
    }
}

pub fn require_query_param(request: &Request, name: &str) -> Result<(), ProcessorError> {
    if is_present(request.query_param(name)) {
        Ok(())
    } else {
        Err(ProcessorError::validation(format!(
            "Request query param: {name} is required"
        )))
    }
}

pub fn require_header(request: &Request, name: &str) -> Result<(), ProcessorError> {
    match request.header(name) {
        Some(value) if !value.is_empty() => Ok(()),
        _ => Err(ProcessorError::validation(format!(
            "Request header: {name} is required"
        ))),
    }
}

pub fn require_path_parameter(request: &Request, name: &str) -> Result<(), ProcessorError> {
    match request.path_parameter(name) {
        Some(value) if !value.is_empty() => Ok(()),
        _ => Err(ProcessorError::validation(format!(
            "Request path parameter: {name} is required"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn zero_and_false_are_present() {
        assert!(is_present(Some(&json!(0))));
        assert!(is_present(Some(&json!(false))));
        assert!(is_present(Some(&json!([]))));
        assert!(!is_present(Some(&json!(""))));
        assert!(!is_present(Some(&Value::Null)));
        assert!(!is_present(None));
    }

    #[test]
    fn require_names_the_field() {
        let error = require(None, "customer_id").unwrap_err();
        assert_eq!(error.to_string(), "customer_id is required");
        assert!(require(Some(&json!("c-1")), "customer_id").is_ok());
    }

    #[test]
    fn query_param_check_uses_requested_name() {
        let request = Request::builder()
            .query_param("record_id", json!("r-9"))
            .build();

        assert!(require_query_param(&request, "record_id").is_ok());
        let error = require_query_param(&request, "page").unwrap_err();
        assert_eq!(error.to_string(), "Request query param: page is required");
    }

    #[test]
    fn header_and_path_checks() {
        let request = Request::builder()
            .header("X-Api-Key", "k")
            .path_parameters([("id".to_string(), String::new())].into_iter().collect())
            .build();

        assert!(require_header(&request, "x-api-key").is_ok());
        assert!(require_path_parameter(&request, "id").is_err());
        assert!(matches!(
            require_header(&request, "authorization"),
            Err(ProcessorError::Validation { .. })
        ));
    }
}
