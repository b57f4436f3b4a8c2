//! Lenient conversion of loosely typed input (query strings, form fields,
//! JSON bodies) into concrete values.
//!
//! Casting never fails loudly: every outcome is a [`CastResult`] whose
//! `error` explains a failed conversion. `Value::Null` stands for both a
//! null and an absent input.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

const TRUTHY_TOKENS: [&str; 5] = ["true", "1", "yes", "da", "on"];
const FALSY_TOKENS: [&str; 6] = ["false", "0", "no", "nu", "off", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastType {
    String,
    Number,
    Integer,
    Boolean,
    Date,
    Array,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CastOptions {
    pub strict: bool,
    pub default_value: Option<Value>,
    pub allow_null: bool,
}

impl CastOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn nullable() -> Self {
        Self {
            allow_null: true,
            ..Self::default()
        }
    }

    pub fn with_default(default_value: Value) -> Self {
        Self {
            default_value: Some(default_value),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CastResult<T> {
    pub success: bool,
    pub value: Option<T>,
    pub error: Option<String>,
}

impl<T> CastResult<T> {
    pub fn ok(value: Option<T>) -> Self {
        Self {
            success: true,
            value,
            error: None,
        }
    }

    pub fn failed(value: Option<T>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            value,
            error: Some(error.into()),
        }
    }

    fn map<U>(self, convert: impl FnOnce(T) -> U) -> CastResult<U> {
        CastResult {
            success: self.success,
            value: self.value.map(convert),
            error: self.error,
        }
    }
}

/// Null input: allowed null first, then the default, otherwise a failure.
fn null_input<T>(options: &CastOptions, convert: impl Fn(&Value) -> Option<T>) -> CastResult<T> {
    if options.allow_null {
        return CastResult::ok(None);
    }
    match &options.default_value {
        Some(default) => CastResult::ok(convert(default)),
        None => CastResult::failed(None, "Input is null or undefined"),
    }
}

fn fallback<T>(options: &CastOptions, convert: impl Fn(&Value) -> Option<T>) -> Option<T> {
    options.default_value.as_ref().and_then(convert)
}

pub fn to_string(input: &Value, options: &CastOptions) -> CastResult<String> {
    match input {
        Value::Null => null_input(options, |value| Some(text_of(value))),
        other => CastResult::ok(Some(text_of(other))),
    }
}

pub fn to_number(input: &Value, options: &CastOptions) -> CastResult<f64> {
    let lenient = |value: &Value| number_of(value);

    if input.is_null() {
        return null_input(options, lenient);
    }

    if let Value::String(text) = input {
        if text.trim().is_empty() {
            return match fallback(options, lenient) {
                Some(value) => CastResult::ok(Some(value)),
                None => CastResult::failed(None, "Empty string cannot be converted to number"),
            };
        }
    }

    let Some(number) = number_of(input) else {
        return CastResult::failed(
            fallback(options, lenient),
            "Value cannot be converted to valid number",
        );
    };

    if options.strict && !matches!(input, Value::Number(_) | Value::String(_)) {
        return CastResult::failed(
            fallback(options, lenient),
            "Strict mode: input must be number or string",
        );
    }

    CastResult::ok(Some(number))
}

pub fn to_integer(input: &Value, options: &CastOptions) -> CastResult<i64> {
    to_number(input, options).map(|value| value.trunc() as i64)
}

pub fn to_boolean(input: &Value, options: &CastOptions) -> CastResult<bool> {
    match input {
        Value::Null => null_input(options, |value| Some(truthy(value))),
        Value::String(text) => {
            let token = text.trim().to_lowercase();
            if TRUTHY_TOKENS.contains(&token.as_str()) {
                CastResult::ok(Some(true))
            } else if FALSY_TOKENS.contains(&token.as_str()) {
                CastResult::ok(Some(false))
            } else {
                CastResult::ok(Some(truthy(input)))
            }
        }
        other => CastResult::ok(Some(truthy(other))),
    }
}

pub fn to_date(input: &Value, options: &CastOptions) -> CastResult<DateTime<Utc>> {
    match input {
        Value::Null => null_input(options, date_of),
        Value::String(_) | Value::Number(_) => match date_of(input) {
            Some(date) => CastResult::ok(Some(date)),
            None => CastResult::failed(fallback(options, date_of), "Resulting date is not valid"),
        },
        _ => CastResult::failed(
            fallback(options, date_of),
            "Input cannot be converted to Date",
        ),
    }
}

pub fn to_array(input: &Value, options: &CastOptions) -> CastResult<Vec<Value>> {
    match input {
        Value::Null => null_input(options, |value| Some(array_of(value))),
        other => CastResult::ok(Some(array_of(other))),
    }
}

/// Casts every element; failing elements are skipped unless `strict`.
pub fn to_array_with<T>(
    input: &Value,
    item_caster: impl Fn(&Value) -> CastResult<T>,
    options: &CastOptions,
) -> CastResult<Vec<T>> {
    let items = match to_array(input, options) {
        CastResult {
            success: true,
            value: Some(items),
            ..
        } => items,
        CastResult { success, error, .. } => {
            return CastResult {
                success,
                value: None,
                error,
            }
        }
    };

    let mut cast = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let result = item_caster(item);
        match (result.success, result.value, result.error) {
            (true, Some(value), _) => cast.push(value),
            (_, _, Some(error)) => errors.push(format!("Element {index}: {error}")),
            _ => {}
        }
    }

    if !errors.is_empty() && options.strict {
        return CastResult::failed(None, format!("Casting errors: {}", errors.join(", ")));
    }
    CastResult::ok(Some(cast))
}

/// Dynamic entry point returning JSON values; dates render as RFC 3339.
pub fn cast(input: &Value, cast_type: CastType, options: &CastOptions) -> CastResult<Value> {
    match cast_type {
        CastType::String => to_string(input, options).map(Value::String),
        CastType::Number => {
            let result = to_number(input, options);
            match result.value.map(Number::from_f64) {
                Some(None) => CastResult::failed(None, "Value cannot be converted to valid number"),
                Some(Some(number)) => CastResult {
                    success: result.success,
                    value: Some(Value::Number(number)),
                    error: result.error,
                },
                None => CastResult {
                    success: result.success,
                    value: None,
                    error: result.error,
                },
            }
        }
        CastType::Integer => to_integer(input, options).map(Value::from),
        CastType::Boolean => to_boolean(input, options).map(Value::Bool),
        CastType::Date => to_date(input, options)
            .map(|date| Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true))),
        CastType::Array => to_array(input, options).map(Value::Array),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub cast_type: CastType,
    pub options: CastOptions,
}

impl FieldSchema {
    pub fn new(cast_type: CastType) -> Self {
        Self {
            cast_type,
            options: CastOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CastOptions) -> Self {
        self.options = options;
        self
    }
}

/// Casts the schema's fields out of an object. Without `strict` a failed
/// field keeps whatever fallback value its cast produced.
pub fn cast_object(
    input: &Value,
    schema: &BTreeMap<String, FieldSchema>,
    strict: bool,
) -> CastResult<Map<String, Value>> {
    let Value::Object(object) = input else {
        return CastResult::failed(None, "Input is not a valid object");
    };

    let mut output = Map::new();
    let mut errors = Vec::new();
    for (key, field) in schema {
        let source = object.get(key).unwrap_or(&Value::Null);
        let result = cast(source, field.cast_type, &field.options);
        if result.success || !strict {
            output.insert(key.clone(), result.value.unwrap_or(Value::Null));
        } else {
            errors.push(format!(
                "{key}: {}",
                result.error.unwrap_or_else(|| "unknown error".to_string())
            ));
        }
    }

    if !errors.is_empty() {
        return CastResult::failed(None, format!("Casting errors: {}", errors.join(", ")));
    }
    CastResult::ok(Some(output))
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number_text(number),
        Value::Array(items) => items.iter().map(text_of).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn number_text(number: &Number) -> String {
    if let Some(integer) = number.as_i64() {
        return integer.to_string();
    }
    if let Some(integer) = number.as_u64() {
        return integer.to_string();
    }
    // f64 Display drops a trailing ".0".
    number.as_f64().map(|float| float.to_string()).unwrap_or_default()
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::String(text) => parse_number_text(text),
        Value::Array(items) if items.is_empty() => Some(0.0),
        Value::Array(items) if items.len() == 1 => parse_number_text(&text_of(&items[0])),
        _ => None,
    }
}

fn parse_number_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let radix = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)]
        .iter()
        .find_map(|(prefix, radix)| unsigned.strip_prefix(prefix).map(|digits| (digits, *radix)));
    if let Some((digits, radix)) = radix {
        // Prefixed literals take no sign.
        if trimmed.starts_with(['-', '+']) {
            return None;
        }
        return u64::from_str_radix(digits, radix).ok().map(|value| value as f64);
    }

    let magnitude = if unsigned == "Infinity" {
        f64::INFINITY
    } else if unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        && unsigned.chars().any(|c| c.is_ascii_digit())
    {
        unsigned.parse::<f64>().ok()?
    } else {
        return None;
    };

    Some(if negative { -magnitude } else { magnitude })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0 && !n.is_nan()).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn date_of(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(number) => {
            let millis = number.as_f64()?;
            if !millis.is_finite() {
                return None;
            }
            DateTime::from_timestamp_millis(millis.trunc() as i64)
        }
        Value::String(text) => parse_date_text(text.trim()),
        _ => None,
    }
}

/// RFC 3339 / RFC 2822 with offsets, otherwise date or date-time read as UTC.
fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn array_of(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => items,
            _ => text
                .split(',')
                .map(|item| Value::String(item.trim().to_string()))
                .collect(),
        },
        other => vec![other.clone()],
    }
}
