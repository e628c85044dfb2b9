//! # Configuration Validation
//!
//! Validators convert a raw [`Value`] into a specific type, or fail with a
//! [`ValidationError`]. They are used by getters, readers and schemas.
//!
//! ## Usage
//! ```rust
//! use staticconf::validation;
//! use staticconf::Value;
//!
//! let port = validation::int().validate(&Value::from("8080")).unwrap();
//! assert_eq!(port, 8080);
//!
//! let hosts = validation::list_of(validation::string());
//! assert_eq!(hosts.name(), "list_of_string");
//! ```

use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use errors::ValidationError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

type ValidateFn<T> = dyn Fn(&Value) -> Result<T, ValidationError> + Send + Sync;
type RenderFn<T> = dyn Fn(&T) -> String + Send + Sync;

/// A named conversion from [`Value`] to `T`.
pub struct Validator<T> {
    name: String,
    func: Arc<ValidateFn<T>>,
    render: Arc<RenderFn<T>>,
}

impl<T> Clone for Validator<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: Arc::clone(&self.func),
            render: Arc::clone(&self.render),
        }
    }
}

impl<T> fmt::Debug for Validator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("name", &self.name).finish()
    }
}

impl<T: fmt::Debug + 'static> Validator<T> {
    /// Build a validator from a conversion function. Validated values are
    /// rendered with `Debug` in help output.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<T, ValidationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
            render: Arc::new(|value: &T| format!("{value:?}")),
        }
    }
}

impl<T> Validator<T> {
    #[must_use]
    pub fn with_render<R>(mut self, render: R) -> Self
    where
        R: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.render = Arc::new(render);
        self
    }

    /// Type name shown in help output, e.g. `int` or `list_of_string`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn validate(&self, value: &Value) -> Result<T, ValidationError> {
        (self.func)(value)
    }

    pub fn render(&self, value: &T) -> String {
        (self.render)(value)
    }
}

fn displayed<T: fmt::Display + fmt::Debug + 'static>(validator: Validator<T>) -> Validator<T> {
    validator.with_render(|value: &T| value.to_string())
}

pub fn validate_any(value: &Value) -> Result<Value, ValidationError> {
    Ok(value.clone())
}

pub fn validate_string(value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::Null => Err(ValidationError::new("string", value)),
        Value::String(s) => Ok(s.clone()),
        other => Ok(other.to_string()),
    }
}

pub fn validate_bool(value: &Value) -> Result<bool, ValidationError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(i) => Ok(*i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Ok(true),
            "false" | "f" | "no" | "n" | "off" | "0" | "" => Ok(false),
            _ => Err(ValidationError::new("bool", value)),
        },
        _ => Err(ValidationError::new("bool", value)),
    }
}

pub fn validate_int(value: &Value) -> Result<i64, ValidationError> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Bool(b) => Ok(i64::from(*b)),
        // i64::MAX rounds up to 2^63 as a float, hence the strict upper bound.
        Value::Float(x) if x.trunc() >= i64::MIN as f64 && x.trunc() < i64::MAX as f64 => {
            Ok(x.trunc() as i64)
        }
        Value::Float(_) => {
            Err(ValidationError::new("int", value).with_reason("out of range for a 64-bit integer"))
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| ValidationError::new("int", value).with_reason(e.to_string())),
        _ => Err(ValidationError::new("int", value)),
    }
}

pub fn validate_float(value: &Value) -> Result<f64, ValidationError> {
    match value {
        Value::Float(x) => Ok(*x),
        Value::Int(i) => Ok(*i as f64),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| ValidationError::new("float", value).with_reason(e.to_string())),
        _ => Err(ValidationError::new("float", value)),
    }
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %I:%M:%S %p"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];

const TIME_FORMATS: &[&str] = &["%H:%M", "%I:%M %p", "%H:%M:%S", "%I:%M:%S %p"];

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn validate_datetime(value: &Value) -> Result<NaiveDateTime, ValidationError> {
    match value {
        Value::DateTime(dt) => Ok(*dt),
        Value::Date(d) => d
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ValidationError::new("datetime", value)),
        Value::String(s) => {
            parse_datetime(s).ok_or_else(|| ValidationError::new("date format", value))
        }
        _ => Err(ValidationError::new("datetime", value)),
    }
}

pub fn validate_date(value: &Value) -> Result<NaiveDate, ValidationError> {
    match value {
        Value::Date(d) => Ok(*d),
        other => validate_datetime(other).map(|dt| dt.date()),
    }
}

// "5 PM" has no minutes, which chrono cannot parse on its own.
fn parse_hour_only(text: &str) -> Option<NaiveTime> {
    let mut parts = text.split_whitespace();
    let (hour, meridiem) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || !hour.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    NaiveTime::parse_from_str(&format!("{hour}:00 {meridiem}"), "%I:%M %p").ok()
}

pub fn validate_time(value: &Value) -> Result<NaiveTime, ValidationError> {
    match value {
        Value::Time(t) => Ok(*t),
        Value::DateTime(dt) => Ok(dt.time()),
        Value::String(s) => {
            let text = s.trim();
            parse_hour_only(text)
                .or_else(|| {
                    TIME_FORMATS
                        .iter()
                        .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
                })
                .ok_or_else(|| ValidationError::new("time format", value))
        }
        _ => Err(ValidationError::new("time", value)),
    }
}

fn validate_iterable(value: &Value) -> Result<Vec<Value>, ValidationError> {
    match value {
        Value::List(items) | Value::Set(items) | Value::Tuple(items) => Ok(items.clone()),
        Value::Map(map) => Ok(map.keys().map(|k| Value::String(k.clone())).collect()),
        Value::String(_) => Err(ValidationError::new("iterable", value)
            .with_reason("strings are not treated as iterables")),
        _ => Err(ValidationError::new("iterable", value)),
    }
}

pub fn validate_list(value: &Value) -> Result<Vec<Value>, ValidationError> {
    validate_iterable(value)
}

/// Deduplicates while keeping first-seen order.
pub fn validate_set(value: &Value) -> Result<Vec<Value>, ValidationError> {
    let mut unique: Vec<Value> = Vec::new();
    for item in validate_iterable(value)? {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    Ok(unique)
}

pub fn validate_tuple(value: &Value) -> Result<Vec<Value>, ValidationError> {
    validate_iterable(value)
}

pub fn validate_regex(value: &Value) -> Result<regex::Regex, ValidationError> {
    match value {
        Value::String(s) => regex::Regex::new(s)
            .map_err(|e| ValidationError::new("regex", value).with_reason(e.to_string())),
        _ => Err(ValidationError::new("regex", value)),
    }
}

/// Accepts the standard level names, including `WARNING` and `CRITICAL`.
pub fn validate_log_level(value: &Value) -> Result<tracing::Level, ValidationError> {
    let Value::String(s) = value else {
        return Err(ValidationError::new("log level", value));
    };
    match s.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Ok(tracing::Level::TRACE),
        "DEBUG" => Ok(tracing::Level::DEBUG),
        "INFO" => Ok(tracing::Level::INFO),
        "WARN" | "WARNING" => Ok(tracing::Level::WARN),
        "ERROR" | "CRITICAL" | "FATAL" => Ok(tracing::Level::ERROR),
        _ => Err(ValidationError::new("log level", value)),
    }
}

pub fn any() -> Validator<Value> {
    displayed(Validator::new("any", validate_any))
}

pub fn string() -> Validator<String> {
    displayed(Validator::new("string", validate_string))
}

pub fn bool() -> Validator<bool> {
    displayed(Validator::new("bool", validate_bool))
}

pub fn int() -> Validator<i64> {
    displayed(Validator::new("int", validate_int))
}

pub fn float() -> Validator<f64> {
    displayed(Validator::new("float", validate_float))
}

pub fn date() -> Validator<NaiveDate> {
    displayed(Validator::new("date", validate_date))
}

pub fn datetime() -> Validator<NaiveDateTime> {
    displayed(Validator::new("datetime", validate_datetime))
}

pub fn time() -> Validator<NaiveTime> {
    displayed(Validator::new("time", validate_time))
}

pub fn list() -> Validator<Vec<Value>> {
    Validator::new("list", validate_list).with_render(|items| Value::List(items.clone()).to_string())
}

pub fn set() -> Validator<Vec<Value>> {
    Validator::new("set", validate_set).with_render(|items| Value::Set(items.clone()).to_string())
}

pub fn tuple() -> Validator<Vec<Value>> {
    Validator::new("tuple", validate_tuple)
        .with_render(|items| Value::Tuple(items.clone()).to_string())
}

pub fn regex() -> Validator<regex::Regex> {
    displayed(Validator::new("regex", validate_regex))
}

pub fn log_level() -> Validator<tracing::Level> {
    displayed(Validator::new("log_level", validate_log_level))
}

/// Validate that the value is a list whose items all pass `item`.
pub fn list_of<T: fmt::Debug + 'static>(item: Validator<T>) -> Validator<Vec<T>> {
    let name = format!("list_of_{}", item.name());
    Validator::new(name, move |value: &Value| {
        validate_list(value)?
            .iter()
            .map(|v| item.validate(v))
            .collect()
    })
}

/// Validate a mapping. Each item is handed to `item` as a `(key, value)`
/// tuple when the raw value is a map, or as-is when it is a list of pairs.
pub fn map_of<V: fmt::Debug + 'static>(item: Validator<(String, V)>) -> Validator<BTreeMap<String, V>> {
    let name = format!("map_of_{}", item.name());
    Validator::new(name, move |value: &Value| {
        let entries: Vec<Value> = match value {
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| Value::Tuple(vec![Value::String(k.clone()), v.clone()]))
                .collect(),
            other => validate_list(other)?,
        };
        entries.iter().map(|entry| item.validate(entry)).collect()
    })
}

/// Pair validator for [`map_of`]: the first element becomes the key, the
/// second is passed through `value`.
pub fn pair<V: fmt::Debug + 'static>(value: Validator<V>) -> Validator<(String, V)> {
    let name = value.name().to_string();
    Validator::new(name, move |raw: &Value| {
        let items = validate_iterable(raw)?;
        match items.as_slice() {
            [k, v] => Ok((validate_string(k)?, value.validate(v)?)),
            _ => Err(ValidationError::new("pair", raw)),
        }
    })
}

/// All built-in validators by name, as accepted after `KEY:` in typed key
/// requirements.
pub fn validator_names() -> &'static [&'static str] {
    &[
        "any", "bool", "date", "datetime", "float", "int", "list", "set", "string", "time",
        "tuple", "regex", "log_level",
    ]
}
