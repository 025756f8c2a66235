//! Field type descriptors.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TicDatError};
use crate::value::Value;

/// Strings a field accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringsAllowed {
    /// Wildcard: `"*"` accepts any string.
    Any(Wildcard),
    /// Exact allow-list (may be empty, meaning no strings).
    Set(BTreeSet<String>),
}

/// Marker for the `"*"` wildcard in serialized descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wildcard;

impl Serialize for Wildcard {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str("*")
    }
}

impl<'de> Deserialize<'de> for Wildcard {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        if s == "*" {
            Ok(Wildcard)
        } else {
            Err(serde::de::Error::custom(format!(
                "expected \"*\" or a list of strings, got \"{}\"",
                s
            )))
        }
    }
}

impl StringsAllowed {
    /// Accept every string.
    pub fn any() -> Self {
        StringsAllowed::Any(Wildcard)
    }

    /// Accept exactly the given strings.
    pub fn set<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StringsAllowed::Set(values.into_iter().map(Into::into).collect())
    }

    fn allows(&self, s: &str) -> bool {
        match self {
            StringsAllowed::Any(_) => true,
            StringsAllowed::Set(set) => set.contains(s),
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, StringsAllowed::Set(set) if set.is_empty())
    }
}

impl Default for StringsAllowed {
    fn default() -> Self {
        StringsAllowed::Set(BTreeSet::new())
    }
}

/// Declarative form of a [`DataType`], as written in schema documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataTypeSpec {
    pub number_allowed: bool,
    #[serde(with = "bound")]
    pub min: f64,
    #[serde(with = "bound")]
    pub max: f64,
    pub inclusive_min: bool,
    pub inclusive_max: bool,
    pub must_be_int: bool,
    pub strings_allowed: StringsAllowed,
    pub nullable: bool,
    pub datetime: bool,
}

impl Default for DataTypeSpec {
    fn default() -> Self {
        Self {
            number_allowed: true,
            min: 0.0,
            max: f64::INFINITY,
            inclusive_min: true,
            inclusive_max: false,
            must_be_int: false,
            strings_allowed: StringsAllowed::default(),
            nullable: false,
            datetime: false,
        }
    }
}

/// Bounds serialize as numbers, with infinities spelled "inf"/"-inf".
mod bound {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        if v.is_finite() {
            s.serialize_f64(*v)
        } else if *v > 0.0 {
            s.serialize_str("inf")
        } else {
            s.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match serde_json::Value::deserialize(d)? {
            serde_json::Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| serde::de::Error::custom("bound is not a number")),
            serde_json::Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "inf" | "+inf" | "infinity" => Ok(f64::INFINITY),
                "-inf" | "-infinity" => Ok(f64::NEG_INFINITY),
                other => other
                    .parse::<f64>()
                    .map_err(|_| serde::de::Error::custom(format!("invalid bound '{}'", s))),
            },
            other => Err(serde::de::Error::custom(format!("invalid bound {}", other))),
        }
    }
}

/// Immutable rule describing the legal domain of one scalar field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "DataTypeSpec")]
pub struct DataType {
    spec: DataTypeSpec,
}

impl DataType {
    /// Validate a declarative spec into a descriptor.
    pub fn new(spec: DataTypeSpec) -> Result<Self> {
        if spec.min.is_nan() || spec.max.is_nan() {
            return Err(TicDatError::config("data type bounds cannot be NaN"));
        }
        if spec.min > spec.max {
            return Err(TicDatError::config(format!(
                "data type min {} exceeds max {}",
                spec.min, spec.max
            )));
        }
        if spec.min == spec.max && !(spec.inclusive_min && spec.inclusive_max) {
            return Err(TicDatError::config(
                "min equals max, so both bounds must be inclusive",
            ));
        }
        if spec.min == f64::INFINITY {
            return Err(TicDatError::config("min cannot be positive infinity"));
        }
        if spec.max == f64::NEG_INFINITY {
            return Err(TicDatError::config("max cannot be negative infinity"));
        }
        if !spec.number_allowed && spec.strings_allowed.is_empty() && !spec.nullable && !spec.datetime
        {
            return Err(TicDatError::config(
                "data type forbids numbers, strings and null, so no value can match",
            ));
        }
        Ok(Self { spec })
    }

    /// Non-negative, finite numbers (the default field domain).
    pub fn number() -> Self {
        Self {
            spec: DataTypeSpec::default(),
        }
    }

    /// Non-negative, finite integers.
    pub fn integer() -> Self {
        Self {
            spec: DataTypeSpec {
                must_be_int: true,
                ..DataTypeSpec::default()
            },
        }
    }

    /// Only the listed strings.
    pub fn strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            spec: DataTypeSpec {
                number_allowed: false,
                strings_allowed: StringsAllowed::set(values),
                ..DataTypeSpec::default()
            },
        }
    }

    /// Any string, no numbers.
    pub fn any_string() -> Self {
        Self {
            spec: DataTypeSpec {
                number_allowed: false,
                strings_allowed: StringsAllowed::any(),
                ..DataTypeSpec::default()
            },
        }
    }

    /// Datetime values only.
    pub fn datetime() -> Self {
        Self {
            spec: DataTypeSpec {
                number_allowed: false,
                datetime: true,
                ..DataTypeSpec::default()
            },
        }
    }

    /// Anything: any number including infinities, any string, null.
    pub fn unconstrained() -> Self {
        Self {
            spec: DataTypeSpec {
                min: f64::NEG_INFINITY,
                max: f64::INFINITY,
                inclusive_max: true,
                strings_allowed: StringsAllowed::any(),
                nullable: true,
                ..DataTypeSpec::default()
            },
        }
    }

    /// Same descriptor, additionally accepting null.
    pub fn nullable(mut self) -> Self {
        self.spec.nullable = true;
        self
    }

    /// Same descriptor with a new lower bound.
    pub fn with_min(self, min: f64, inclusive: bool) -> Result<Self> {
        Self::new(DataTypeSpec {
            min,
            inclusive_min: inclusive,
            ..self.spec
        })
    }

    /// Same descriptor with a new upper bound.
    pub fn with_max(self, max: f64, inclusive: bool) -> Result<Self> {
        Self::new(DataTypeSpec {
            max,
            inclusive_max: inclusive,
            ..self.spec
        })
    }

    pub fn spec(&self) -> &DataTypeSpec {
        &self.spec
    }

    pub fn is_nullable(&self) -> bool {
        self.spec.nullable
    }

    pub fn must_be_int(&self) -> bool {
        self.spec.must_be_int
    }

    pub fn is_datetime(&self) -> bool {
        self.spec.datetime
    }

    pub fn number_allowed(&self) -> bool {
        self.spec.number_allowed
    }

    /// True if `+inf` lies within the numeric domain.
    pub fn allows_positive_infinity(&self) -> bool {
        self.spec.number_allowed && self.spec.max == f64::INFINITY && self.spec.inclusive_max
    }

    /// True if `-inf` lies within the numeric domain.
    pub fn allows_negative_infinity(&self) -> bool {
        self.spec.number_allowed && self.spec.min == f64::NEG_INFINITY && self.spec.inclusive_min
    }

    /// Check whether a canonical value lies in this field's domain.
    pub fn matches(&self, value: &Value) -> bool {
        match value {
            Value::Null => self.spec.nullable,
            Value::Text(s) => self.spec.strings_allowed.allows(s),
            Value::DateTime(_) => self.spec.datetime,
            Value::Int(i) => self.number_matches(*i as f64, true),
            Value::Float(f) => self.number_matches(*f, f.fract() == 0.0),
        }
    }

    fn number_matches(&self, x: f64, integral: bool) -> bool {
        if !self.spec.number_allowed || x.is_nan() {
            return false;
        }
        let spec = &self.spec;
        let above_min = if spec.inclusive_min { x >= spec.min } else { x > spec.min };
        let below_max = if spec.inclusive_max { x <= spec.max } else { x < spec.max };
        if !(above_min && below_max) {
            return false;
        }
        // Infinities already passed the range test, so they count as integral.
        !spec.must_be_int || integral || x.is_infinite()
    }
}

impl From<DataType> for DataTypeSpec {
    fn from(dt: DataType) -> Self {
        dt.spec
    }
}

impl Default for DataType {
    fn default() -> Self {
        Self::number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_non_negative_finite() {
        let dt = DataType::number();
        assert!(dt.matches(&Value::Float(0.0)));
        assert!(dt.matches(&Value::Int(65)));
        assert!(!dt.matches(&Value::Float(-5.0)));
        assert!(!dt.matches(&Value::Float(f64::INFINITY)));
        assert!(!dt.matches(&Value::Null));
        assert!(!dt.matches(&Value::from("65")));
    }

    #[test]
    fn test_infinity_when_max_inclusive() {
        let dt = DataType::number().with_max(f64::INFINITY, true).unwrap();
        assert!(dt.matches(&Value::Float(f64::INFINITY)));
        assert!(!dt.matches(&Value::Float(f64::NEG_INFINITY)));
        assert!(dt.allows_positive_infinity());
    }

    #[test]
    fn test_must_be_int() {
        let dt = DataType::integer();
        assert!(dt.matches(&Value::Float(3.0)));
        assert!(!dt.matches(&Value::Float(3.5)));
        let with_inf = DataType::integer().with_max(f64::INFINITY, true).unwrap();
        assert!(with_inf.matches(&Value::Float(f64::INFINITY)));
    }

    #[test]
    fn test_strings() {
        let dt = DataType::strings(["Can Be Center", "Pure Demand Point"]);
        assert!(dt.matches(&Value::from("Can Be Center")));
        assert!(!dt.matches(&Value::from("other")));
        assert!(!dt.matches(&Value::Int(1)));
        assert!(DataType::any_string().matches(&Value::from("anything")));
    }

    #[test]
    fn test_nan_never_matches() {
        assert!(!DataType::unconstrained().matches(&Value::Float(f64::NAN)));
    }

    #[test]
    fn test_invalid_specs() {
        let bad_bounds = DataTypeSpec {
            min: 5.0,
            max: 1.0,
            ..DataTypeSpec::default()
        };
        assert!(matches!(DataType::new(bad_bounds), Err(TicDatError::Config(_))));

        let empty = DataTypeSpec {
            number_allowed: false,
            ..DataTypeSpec::default()
        };
        assert!(DataType::new(empty).is_err());

        let point = DataTypeSpec {
            min: 1.0,
            max: 1.0,
            inclusive_max: true,
            ..DataTypeSpec::default()
        };
        assert!(DataType::new(point).is_ok());
    }

    #[test]
    fn test_spec_from_json() {
        let spec: DataTypeSpec = serde_json::from_value(serde_json::json!({
            "max": "inf",
            "inclusive_max": true,
            "strings_allowed": "*"
        }))
        .unwrap();
        let dt = DataType::new(spec).unwrap();
        assert!(dt.matches(&Value::Float(f64::INFINITY)));
        assert!(dt.matches(&Value::from("x")));
    }
}
