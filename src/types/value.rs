use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};

use super::error::ParseError;

/// A typed attribute value attached to a [`User`](super::User).
///
/// The variant decides which comparison semantics an operator applies.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// A UTF-8 string.
    String(String),
    /// A 64-bit floating-point number. Integers are widened on construction.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// A calendar date without a time of day.
    Date(NaiveDate),
    /// A UTC instant.
    DateTime(DateTime<Utc>),
    /// An unordered set of strings.
    Set(BTreeSet<String>),
}

/// The attribute type a condition declares for its configured values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    String,
    Number,
    Boolean,
    Date,
    DateTime,
    Set,
}

impl AttributeType {
    /// Wire name of this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Number => "number",
            AttributeType::Boolean => "boolean",
            AttributeType::Date => "date",
            AttributeType::DateTime => "datetime",
            AttributeType::Set => "set",
        }
    }
}

impl FromStr for AttributeType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(AttributeType::String),
            "number" => Ok(AttributeType::Number),
            "boolean" => Ok(AttributeType::Boolean),
            "date" => Ok(AttributeType::Date),
            "datetime" => Ok(AttributeType::DateTime),
            "set" => Ok(AttributeType::Set),
            other => Err(ParseError::UnknownAttributeType {
                name: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AttributeValue {
    /// The attribute type this value naturally carries.
    #[must_use]
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            AttributeValue::String(_) => AttributeType::String,
            AttributeValue::Number(_) => AttributeType::Number,
            AttributeValue::Boolean(_) => AttributeType::Boolean,
            AttributeValue::Date(_) => AttributeType::Date,
            AttributeValue::DateTime(_) => AttributeType::DateTime,
            AttributeValue::Set(_) => AttributeType::Set,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            AttributeValue::Set(s) => Some(s),
            _ => None,
        }
    }

    /// Truncate a date or date-time value to its UTC calendar date.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            AttributeValue::Date(d) => Some(*d),
            AttributeValue::DateTime(dt) => Some(dt.date_naive()),
            _ => None,
        }
    }

    /// A date-time instant. Plain dates are taken at midnight UTC.
    #[must_use]
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            AttributeValue::DateTime(dt) => Some(*dt),
            AttributeValue::Date(d) => d.and_hms_opt(0, 0, 0).map(|n| n.and_utc()),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Number(v)
    }
}

impl From<i64> for AttributeValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: i64) -> Self {
        AttributeValue::Number(v as f64)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::Number(f64::from(v))
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Boolean(v)
    }
}

impl From<NaiveDate> for AttributeValue {
    fn from(v: NaiveDate) -> Self {
        AttributeValue::Date(v)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(v: DateTime<Utc>) -> Self {
        AttributeValue::DateTime(v)
    }
}

impl From<HashSet<String>> for AttributeValue {
    fn from(v: HashSet<String>) -> Self {
        AttributeValue::Set(v.into_iter().collect())
    }
}

impl From<BTreeSet<String>> for AttributeValue {
    fn from(v: BTreeSet<String>) -> Self {
        AttributeValue::Set(v)
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(v: Vec<&str>) -> Self {
        AttributeValue::Set(v.into_iter().map(str::to_owned).collect())
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(v) => write!(f, "\"{v}\""),
            AttributeValue::Number(v) => write!(f, "{v}"),
            AttributeValue::Boolean(v) => write!(f, "{v}"),
            AttributeValue::Date(v) => write!(f, "{v}"),
            AttributeValue::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            AttributeValue::Set(v) => {
                let items: Vec<&str> = v.iter().map(String::as_str).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn from_str_slice() {
        assert_eq!(
            AttributeValue::from("java"),
            AttributeValue::String("java".to_owned())
        );
    }

    #[test]
    fn from_integers_widen_to_number() {
        assert_eq!(AttributeValue::from(42_i64), AttributeValue::Number(42.0));
        assert_eq!(AttributeValue::from(7_i32), AttributeValue::Number(7.0));
    }

    #[test]
    fn from_vec_builds_set() {
        let v = AttributeValue::from(vec!["b", "a", "b"]);
        let set = v.as_set().unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("a"));
    }

    #[test]
    fn datetime_truncates_to_date() {
        let dt = Utc.with_ymd_and_hms(2021, 2, 3, 23, 59, 0).unwrap();
        let v = AttributeValue::from(dt);
        assert_eq!(v.as_date(), NaiveDate::from_ymd_opt(2021, 2, 3));
    }

    #[test]
    fn date_widens_to_midnight() {
        let d = NaiveDate::from_ymd_opt(2021, 2, 3).unwrap();
        let v = AttributeValue::from(d);
        assert_eq!(
            v.as_datetime(),
            Some(Utc.with_ymd_and_hms(2021, 2, 3, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn scalar_accessors_reject_other_types() {
        assert_eq!(AttributeValue::Boolean(true).as_date(), None);
        assert_eq!(AttributeValue::Number(1.0).as_str(), None);
        assert!(AttributeValue::from("x").as_set().is_none());
    }

    #[test]
    fn attribute_type_round_trips_wire_names() {
        for name in ["string", "number", "boolean", "date", "datetime", "set"] {
            let ty: AttributeType = name.parse().unwrap();
            assert_eq!(ty.as_str(), name);
        }
    }

    #[test]
    fn unknown_attribute_type_is_rejected() {
        let err = "uuid".parse::<AttributeType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown attribute type 'uuid'");
    }

    #[test]
    fn display() {
        assert_eq!(AttributeValue::from("a").to_string(), "\"a\"");
        assert_eq!(AttributeValue::from(vec!["b", "a"]).to_string(), "{a, b}");
    }
}
