use std::collections::HashMap;

/// One possible outcome of a flag.
///
/// Carries optional configuration properties and an optional allow-list of
/// user identities that always receive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variation {
    key: String,
    name: String,
    properties: HashMap<String, String>,
    allow_list: Vec<String>,
}

impl Variation {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            properties: HashMap::new(),
            allow_list: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: HashMap<String, String>) -> Self {
        self.properties = properties;
        self
    }

    /// Set the allow-list from its comma-separated form. Whitespace anywhere
    /// in the list is ignored, as are empty entries.
    #[must_use]
    pub fn with_allow_list(mut self, list: &str) -> Self {
        self.allow_list = list
            .split(',')
            .map(|id| id.chars().filter(|c| !c.is_whitespace()).collect::<String>())
            .filter(|id| !id.is_empty())
            .collect();
        self
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    #[must_use]
    pub fn allow_list(&self) -> &[String] {
        &self.allow_list
    }

    #[must_use]
    pub fn is_allow_listed(&self, user_id: &str) -> bool {
        self.allow_list.iter().any(|id| id == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_ignores_whitespace() {
        let v = Variation::new("on").with_allow_list(" alice , b ob,,carol ");
        assert_eq!(v.allow_list(), ["alice", "bob", "carol"]);
        assert!(v.is_allow_listed("bob"));
        assert!(!v.is_allow_listed("dave"));
    }

    #[test]
    fn empty_allow_list() {
        let v = Variation::new("on").with_allow_list("");
        assert!(v.allow_list().is_empty());
        assert!(!v.is_allow_listed(""));
    }

    #[test]
    fn name_defaults_to_key() {
        let v = Variation::new("on");
        assert_eq!(v.name(), "on");
        assert_eq!(v.with_name("Enabled").name(), "Enabled");
    }

    #[test]
    fn properties() {
        let v = Variation::new("on").with_property("color", "blue");
        assert_eq!(v.properties().get("color").map(String::as_str), Some("blue"));
    }
}
