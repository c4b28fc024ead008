use std::fmt;

use super::error::ParseError;
use super::{AttributeType, Operator, User};

/// One predicate of a targeting rule: `attribute <op> values` under a declared
/// attribute type.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    attribute: String,
    operator: Operator,
    attribute_type: AttributeType,
    values: Vec<String>,
}

impl Condition {
    /// # Errors
    ///
    /// Returns [`ParseError::EmptyCondition`] if `values` is empty.
    pub fn new(
        attribute: impl Into<String>,
        operator: Operator,
        attribute_type: AttributeType,
        values: Vec<String>,
    ) -> Result<Self, ParseError> {
        let attribute = attribute.into();
        if values.is_empty() {
            return Err(ParseError::EmptyCondition { attribute });
        }
        Ok(Self {
            attribute,
            operator,
            attribute_type,
            values,
        })
    }

    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    #[must_use]
    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Whether `user` satisfies this condition. A user without the attribute
    /// never does.
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        self.operator
            .apply(&self.values, user.attribute(&self.attribute), self.attribute_type)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}] ({})",
            self.attribute,
            self.operator,
            self.values.join(", "),
            self.attribute_type
        )
    }
}
