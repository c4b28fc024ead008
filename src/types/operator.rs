use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};

use super::error::ParseError;
use super::{AttributeType, AttributeValue};

/// Comparison operators a condition can apply to a user attribute.
///
/// Each negated operator matches only when its positive form is applicable to
/// the attribute's type and does not match; a type mismatch is a non-match in
/// both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    OneOf,
    NotOneOf,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
    Contains,
    NotContains,
    PartOf,
    NotPartOf,
    HasAnyOf,
    HasNoneOf,
    HasAllOf,
    NotHasAllOf,
}

/// A user value projected into the domain of a declared attribute type.
#[derive(Debug, Clone, Copy)]
enum Scalar<'a> {
    Text(&'a str),
    Number(f64),
    Flag(bool),
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

impl Operator {
    /// Wire code of this operator.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Operator::Equals => "EQ",
            Operator::NotEquals => "NEQ",
            Operator::GreaterThan => "GT",
            Operator::GreaterOrEqual => "GTE",
            Operator::LessThan => "LT",
            Operator::LessOrEqual => "LTE",
            Operator::OneOf => "IN",
            Operator::NotOneOf => "NIN",
            Operator::StartsWith => "SW",
            Operator::NotStartsWith => "NSW",
            Operator::EndsWith => "EW",
            Operator::NotEndsWith => "NEW",
            Operator::Contains => "CON",
            Operator::NotContains => "NCON",
            Operator::PartOf => "PO",
            Operator::NotPartOf => "NPO",
            Operator::HasAnyOf => "HA",
            Operator::HasNoneOf => "NHA",
            Operator::HasAllOf => "AO",
            Operator::NotHasAllOf => "NAO",
        }
    }

    /// Operators whose configured value is a comma-separated list rather than
    /// a single literal.
    #[must_use]
    pub fn takes_list(self) -> bool {
        matches!(
            self.positive(),
            Operator::OneOf | Operator::PartOf | Operator::HasAnyOf | Operator::HasAllOf
        )
    }

    /// The positive form of this operator and whether it is negated.
    fn split(self) -> (Operator, bool) {
        match self {
            Operator::NotEquals => (Operator::Equals, true),
            Operator::NotOneOf => (Operator::OneOf, true),
            Operator::NotStartsWith => (Operator::StartsWith, true),
            Operator::NotEndsWith => (Operator::EndsWith, true),
            Operator::NotContains => (Operator::Contains, true),
            Operator::NotPartOf => (Operator::PartOf, true),
            Operator::HasNoneOf => (Operator::HasAnyOf, true),
            Operator::NotHasAllOf => (Operator::HasAllOf, true),
            positive => (positive, false),
        }
    }

    fn positive(self) -> Operator {
        self.split().0
    }

    /// Apply this operator to a user's attribute value.
    ///
    /// `values` are the configured comparison values; scalar operators match
    /// if any of them matches. An absent user value never matches.
    #[must_use]
    pub fn apply(self, values: &[String], user: Option<&AttributeValue>, ty: AttributeType) -> bool {
        let Some(user) = user else {
            return false;
        };
        let (positive, negated) = self.split();
        positive
            .test(values, user, ty)
            .map(|matched| matched != negated)
            .unwrap_or(false)
    }

    /// Evaluate a positive operator. `None` means the operator does not apply
    /// to the value's type.
    fn test(self, values: &[String], user: &AttributeValue, ty: AttributeType) -> Option<bool> {
        match self {
            Operator::Equals | Operator::OneOf => {
                if ty == AttributeType::Set {
                    let user_set = user.as_set()?;
                    let configured: BTreeSet<&str> = values.iter().map(String::as_str).collect();
                    return Some(user_set.iter().map(String::as_str).eq(configured));
                }
                let scalar = Scalar::coerce(user, ty)?;
                Some(any_ordering(values, scalar, |o| o == Ordering::Equal))
            }
            Operator::GreaterThan => ordered(values, user, ty, |o| o == Ordering::Greater),
            Operator::GreaterOrEqual => ordered(values, user, ty, |o| o != Ordering::Less),
            Operator::LessThan => ordered(values, user, ty, |o| o == Ordering::Less),
            Operator::LessOrEqual => ordered(values, user, ty, |o| o != Ordering::Greater),
            Operator::StartsWith => {
                let s = user.as_str()?;
                Some(values.iter().any(|v| s.starts_with(v.as_str())))
            }
            Operator::EndsWith => {
                let s = user.as_str()?;
                Some(values.iter().any(|v| s.ends_with(v.as_str())))
            }
            Operator::Contains => {
                let s = user.as_str()?;
                Some(values.iter().any(|v| s.contains(v.as_str())))
            }
            Operator::PartOf => {
                let user_set = user.as_set()?;
                Some(
                    user_set
                        .iter()
                        .all(|item| values.iter().any(|v| v == item)),
                )
            }
            Operator::HasAnyOf => {
                let user_set = user.as_set()?;
                Some(values.iter().any(|v| user_set.contains(v)))
            }
            Operator::HasAllOf => {
                let user_set = user.as_set()?;
                Some(values.iter().all(|v| user_set.contains(v)))
            }
            _ => None,
        }
    }
}

fn ordered(
    values: &[String],
    user: &AttributeValue,
    ty: AttributeType,
    accept: impl Fn(Ordering) -> bool,
) -> Option<bool> {
    match Scalar::coerce(user, ty)? {
        Scalar::Text(_) | Scalar::Flag(_) => None,
        scalar => Some(any_ordering(values, scalar, accept)),
    }
}

fn any_ordering(values: &[String], scalar: Scalar<'_>, accept: impl Fn(Ordering) -> bool) -> bool {
    values
        .iter()
        .filter_map(|v| scalar.cmp_configured(v))
        .any(accept)
}

impl<'a> Scalar<'a> {
    fn coerce(user: &'a AttributeValue, ty: AttributeType) -> Option<Self> {
        match (ty, user) {
            (AttributeType::String, AttributeValue::String(s)) => Some(Scalar::Text(s)),
            (AttributeType::Number, AttributeValue::Number(n)) => Some(Scalar::Number(*n)),
            (AttributeType::Boolean, AttributeValue::Boolean(b)) => Some(Scalar::Flag(*b)),
            (AttributeType::Date, _) => user.as_date().map(Scalar::Day),
            (AttributeType::DateTime, _) => user.as_datetime().map(Scalar::Instant),
            _ => None,
        }
    }

    /// Order the user value against one configured value. `None` when the
    /// configured value cannot be read in this domain.
    fn cmp_configured(self, configured: &str) -> Option<Ordering> {
        match self {
            Scalar::Text(s) => Some(s.cmp(configured)),
            Scalar::Number(n) => n.partial_cmp(&configured.trim().parse::<f64>().ok()?),
            Scalar::Flag(b) => {
                let c = configured.trim();
                let c = if c.eq_ignore_ascii_case("true") {
                    true
                } else if c.eq_ignore_ascii_case("false") {
                    false
                } else {
                    return None;
                };
                Some(b.cmp(&c))
            }
            Scalar::Day(d) => Some(d.cmp(&configured_instant(configured)?.date_naive())),
            Scalar::Instant(t) => Some(t.cmp(&configured_instant(configured)?)),
        }
    }
}

/// Configured dates arrive as epoch milliseconds; RFC 3339 and plain
/// `YYYY-MM-DD` are accepted as well.
fn configured_instant(configured: &str) -> Option<DateTime<Utc>> {
    let c = configured.trim();
    if let Ok(millis) = c.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(c) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(c, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

impl FromStr for Operator {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "EQ" => Operator::Equals,
            "NEQ" => Operator::NotEquals,
            "GT" => Operator::GreaterThan,
            "GTE" => Operator::GreaterOrEqual,
            "LT" => Operator::LessThan,
            "LTE" => Operator::LessOrEqual,
            "IN" => Operator::OneOf,
            "NIN" => Operator::NotOneOf,
            "SW" => Operator::StartsWith,
            "NSW" => Operator::NotStartsWith,
            "EW" => Operator::EndsWith,
            "NEW" => Operator::NotEndsWith,
            "CON" => Operator::Contains,
            "NCON" => Operator::NotContains,
            "PO" => Operator::PartOf,
            "NPO" => Operator::NotPartOf,
            "HA" => Operator::HasAnyOf,
            "NHA" => Operator::HasNoneOf,
            "AO" => Operator::HasAllOf,
            "NAO" => Operator::NotHasAllOf,
            other => {
                return Err(ParseError::UnknownOperator {
                    code: other.to_owned(),
                })
            }
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
