use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::Variation;

/// Variation key served when no real variation can be chosen.
pub const CONTROL: &str = "control";

/// Why an evaluation produced its variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    FlagDisabled,
    PrerequisiteFailed,
    AllowListed,
    RuleMatched,
    DefaultRule,
    FlagNotFound,
    /// A rule's rollout weights did not reach the user's bucket.
    RolloutIncomplete,
    ClientClosed,
}

impl Reason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::FlagDisabled => "Flag disabled. Default Variation served",
            Reason::PrerequisiteFailed => "Prerequisite failed. Default Variation served",
            Reason::AllowListed => "User is in Target Individual Users List",
            Reason::RuleMatched => "Targeting Rule matched",
            Reason::DefaultRule => "Default Rule Served",
            Reason::FlagNotFound => "flag was not found in the in-memory cache",
            Reason::RolloutIncomplete => "rollout weights do not cover the user's bucket; control served",
            Reason::ClientClosed => "client is closed; control served",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of evaluating one flag for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Evaluation {
    flag_key: String,
    variation: Option<Arc<Variation>>,
    reason: Reason,
}

impl Evaluation {
    pub fn new(flag_key: impl Into<String>, variation: Arc<Variation>, reason: Reason) -> Self {
        Self {
            flag_key: flag_key.into(),
            variation: Some(variation),
            reason,
        }
    }

    /// An evaluation serving the [`CONTROL`] sentinel.
    pub fn control(flag_key: impl Into<String>, reason: Reason) -> Self {
        Self {
            flag_key: flag_key.into(),
            variation: None,
            reason,
        }
    }

    #[must_use]
    pub fn flag_key(&self) -> &str {
        &self.flag_key
    }

    /// Key of the served variation, or [`CONTROL`].
    #[must_use]
    pub fn variation_key(&self) -> &str {
        self.variation.as_deref().map_or(CONTROL, Variation::key)
    }

    #[must_use]
    pub fn variation(&self) -> Option<&Arc<Variation>> {
        self.variation.as_ref()
    }

    #[must_use]
    pub fn is_control(&self) -> bool {
        self.variation.is_none()
    }

    #[must_use]
    pub fn reason(&self) -> Reason {
        self.reason
    }

    /// Configuration properties of the served variation; empty for control.
    #[must_use]
    pub fn config(&self) -> VariationConfig<'_> {
        VariationConfig {
            properties: self.variation.as_deref().map(Variation::properties),
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {} ({})", self.flag_key, self.variation_key(), self.reason)
    }
}

/// Typed read access to a variation's configuration properties.
///
/// Values are stored as strings; typed getters return `None` when the key is
/// absent or the value does not parse.
#[derive(Debug, Clone, Copy)]
pub struct VariationConfig<'a> {
    properties: Option<&'a HashMap<String, String>>,
}

impl<'a> VariationConfig<'a> {
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        self.properties?.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn get_str_or(&self, key: &str, default: &'a str) -> &'a str {
        self.get_str(key).unwrap_or(default)
    }

    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_str(key)?.trim().parse().ok()
    }

    #[must_use]
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get_str(key)?.trim().parse().ok()
    }

    #[must_use]
    pub fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        self.get_i64(key).unwrap_or(default)
    }

    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get_str(key)?.trim().parse().ok()
    }

    #[must_use]
    pub fn get_f64_or(&self, key: &str, default: f64) -> f64 {
        self.get_f64(key).unwrap_or(default)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.is_some_and(|p| p.contains_key(key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.map_or(0, HashMap::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
