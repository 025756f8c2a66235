//! Normalization of raw cells into canonical values, and back.
//!
//! The read path turns a cell handed over by an adapter into the value stored
//! in a [`TicDat`](crate::TicDat); the write path produces the value an adapter
//! should serialize. Both honor the schema's [`InfinityIoFlag`], so that for
//! every value `v` a field accepts, `write(read(write(v))) == write(v)`.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::schema::{DataType, Schema};
use crate::value::{DATETIME_FORMAT, Value};

/// How ±infinity is represented in formats that cannot store it natively.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum InfinityIoFlag {
    /// Infinity is written as the literal text `inf` / `-inf`.
    #[default]
    NotApplicable,
    /// Infinity is written as null; null cells of non-nullable fields that
    /// admit infinity read back as infinity.
    Null,
    /// Infinity is written as `±sentinel`; numbers at or beyond the sentinel
    /// magnitude read back as infinity.
    Sentinel(f64),
}

impl InfinityIoFlag {
    /// Validate the flag. Sentinels must be positive and finite.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            InfinityIoFlag::Sentinel(s) if !(s.is_finite() && *s > 0.0) => Err(format!(
                "infinity sentinel must be a positive finite number, got {}",
                s
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for InfinityIoFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfinityIoFlag::NotApplicable => write!(f, "N/A"),
            InfinityIoFlag::Null => write!(f, "null"),
            InfinityIoFlag::Sentinel(s) => write!(f, "{}", s),
        }
    }
}

impl TryFrom<serde_json::Value> for InfinityIoFlag {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let flag = match value {
            serde_json::Value::Null => InfinityIoFlag::Null,
            serde_json::Value::String(s) if s.eq_ignore_ascii_case("n/a") => {
                InfinityIoFlag::NotApplicable
            }
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(s) => InfinityIoFlag::Sentinel(s),
                None => return Err(format!("invalid infinity sentinel {}", n)),
            },
            other => {
                return Err(format!(
                    "infinity_io_flag must be \"N/A\", null or a number, got {}",
                    other
                ));
            }
        };
        flag.validate()?;
        Ok(flag)
    }
}

impl From<InfinityIoFlag> for serde_json::Value {
    fn from(flag: InfinityIoFlag) -> Self {
        match flag {
            InfinityIoFlag::NotApplicable => serde_json::Value::String("N/A".to_string()),
            InfinityIoFlag::Null => serde_json::Value::Null,
            InfinityIoFlag::Sentinel(s) => serde_json::json!(s),
        }
    }
}

/// Per-read options supplied by the caller of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Treat the text `inf` / `-inf` (case-insensitive) as infinity.
    pub treat_inf_as_infinity: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            treat_inf_as_infinity: true,
        }
    }
}

/// Maps raw cells to canonical values and canonical values to write values.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    schema: &'a Schema,
    options: ReadOptions,
}

impl<'a> Normalizer<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self::with_options(schema, ReadOptions::default())
    }

    pub fn with_options(schema: &'a Schema, options: ReadOptions) -> Self {
        Self { schema, options }
    }

    /// Canonical value for a raw cell of `table.field`.
    ///
    /// `textual` marks cells from formats that store everything as text, in
    /// which numeric-looking text is converted to a number first.
    pub fn read_cell(&self, table: &str, field: &str, raw: Value, textual: bool) -> Value {
        let data_type = self.schema.data_type(table, field);
        let mut value = raw;

        if textual {
            value = coerce_numeric_text(value, data_type);
        }

        if is_empty_text(&value) && self.schema.empty_string_as_null() {
            let null_default = self
                .schema
                .declared_default(table, field)
                .is_some_and(Value::is_null);
            if null_default || data_type.is_some_and(DataType::is_nullable) {
                return Value::Null;
            }
        }

        value = self.read_infinity(table, field, data_type, value);

        if let Some(dt) = data_type {
            if dt.must_be_int() {
                if let Value::Float(f) = value {
                    if let Some(i) = Value::Float(f).as_exact_i64() {
                        value = Value::Int(i);
                    }
                }
            }
            if dt.is_datetime() {
                value = read_datetime(value);
            }
        }
        value
    }

    fn read_infinity(
        &self,
        table: &str,
        field: &str,
        data_type: Option<&DataType>,
        value: Value,
    ) -> Value {
        if self.options.treat_inf_as_infinity {
            if let Some(inf) = value.as_str().and_then(parse_infinity_text) {
                return Value::Float(inf);
            }
        }
        match self.schema.infinity_io_flag() {
            InfinityIoFlag::NotApplicable => value,
            // Only fields whose domain holds that infinity read the sentinel
            // as infinity. Untyped data fields accept anything.
            InfinityIoFlag::Sentinel(sentinel) => match value.as_f64() {
                Some(x) if x.abs() >= sentinel => {
                    let admits = match data_type {
                        Some(dt) if x > 0.0 => dt.allows_positive_infinity(),
                        Some(dt) => dt.allows_negative_infinity(),
                        None => self
                            .schema
                            .table(table)
                            .is_some_and(|spec| spec.is_data_field(field)),
                    };
                    if admits {
                        Value::Float(f64::INFINITY.copysign(x))
                    } else {
                        value
                    }
                }
                _ => value,
            },
            InfinityIoFlag::Null => {
                let Some(dt) = data_type else {
                    return value;
                };
                if !(value.is_null() || is_empty_text(&value)) || dt.is_nullable() {
                    return value;
                }
                if dt.allows_positive_infinity() {
                    Value::Float(f64::INFINITY)
                } else if dt.allows_negative_infinity() {
                    Value::Float(f64::NEG_INFINITY)
                } else {
                    value
                }
            }
        }
    }

    /// Value an adapter should serialize for a canonical value.
    ///
    /// `Null` stands for the adapter's empty marker.
    pub fn write_cell(&self, value: &Value) -> Value {
        match value {
            Value::Float(f) if f.is_nan() => Value::Null,
            Value::Float(f) if f.is_infinite() => match self.schema.infinity_io_flag() {
                InfinityIoFlag::NotApplicable => {
                    Value::Text(if *f > 0.0 { "inf" } else { "-inf" }.to_string())
                }
                InfinityIoFlag::Null => Value::Null,
                InfinityIoFlag::Sentinel(s) => Value::Float(s.copysign(*f)),
            },
            Value::DateTime(dt) => Value::Text(dt.format(DATETIME_FORMAT).to_string()),
            other => other.clone(),
        }
    }
}

fn is_empty_text(value: &Value) -> bool {
    matches!(value, Value::Text(s) if s.is_empty())
}

fn parse_infinity_text(s: &str) -> Option<f64> {
    match s.trim().to_ascii_lowercase().as_str() {
        "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

/// Numeric-looking text becomes a number unless the field forbids numbers.
/// Non-finite spellings are left alone for the infinity step.
fn coerce_numeric_text(value: Value, data_type: Option<&DataType>) -> Value {
    let Value::Text(s) = &value else {
        return value;
    };
    if data_type.is_some_and(|dt| !dt.number_allowed()) {
        return value;
    }
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return value;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Int(i);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float(f),
        _ => value,
    }
}

fn read_datetime(value: Value) -> Value {
    let parsed = match &value {
        Value::Text(s) => parse_datetime(s),
        Value::Int(_) | Value::Float(_) => value.as_f64().and_then(from_serial_days),
        _ => None,
    };
    parsed.map(Value::DateTime).unwrap_or(value)
}

/// Parse the datetime spellings the adapters produce or commonly encounter.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Spreadsheet serial day number (days since 1899-12-30) to a datetime.
pub fn from_serial_days(days: f64) -> Option<NaiveDateTime> {
    if !days.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = days * 86_400.0;
    if seconds.abs() > 1e12 {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round() as i64;
    let delta = TimeDelta::try_seconds(whole as i64)? + TimeDelta::nanoseconds(nanos);
    epoch.checked_add_signed(delta)
}
