use std::collections::HashMap;

use super::error::UserError;
use super::AttributeValue;

/// The subject of an evaluation: a non-empty identity plus typed attributes.
///
/// Built per request by the caller; attribute names are unique and a later
/// insert replaces an earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: String,
    attributes: HashMap<String, AttributeValue>,
}

impl User {
    /// Create a user with no attributes.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::EmptyId`] if `id` is empty or whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, UserError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(UserError::EmptyId);
        }
        Ok(Self {
            id,
            attributes: HashMap::new(),
        })
    }

    /// Set an attribute, consuming and returning the user.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::EmptyAttributeName`] if `name` is empty.
    pub fn with_attribute(
        mut self,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<Self, UserError> {
        self.insert(name, value)?;
        Ok(self)
    }

    /// Insert or replace a single attribute.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::EmptyAttributeName`] if `name` is empty.
    pub fn insert(&mut self, name: &str, value: impl Into<AttributeValue>) -> Result<(), UserError> {
        if name.is_empty() {
            return Err(UserError::EmptyAttributeName);
        }
        self.attributes.insert(name.to_owned(), value.into());
        Ok(())
    }

    /// Replace all attributes at once.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::EmptyAttributeName`] if any name is empty; the
    /// existing attributes are left untouched in that case.
    pub fn set_attributes<I, K, V>(&mut self, attributes: I) -> Result<(), UserError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        let mut next = HashMap::new();
        for (name, value) in attributes {
            let name = name.into();
            if name.is_empty() {
                return Err(UserError::EmptyAttributeName);
            }
            next.insert(name, value.into());
        }
        self.attributes = next;
        Ok(())
    }

    pub fn clear_attributes(&mut self) {
        self.attributes.clear();
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    #[must_use]
    pub fn attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.attributes
    }
}
