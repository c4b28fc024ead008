use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::error::ParseError;
use super::{Evaluation, Rule, User, Variation};

/// A flag that must evaluate to a given variation before the dependent flag
/// is eligible for anything but its off variation.
#[derive(Debug, Clone)]
pub struct Prerequisite {
    pub flag: Arc<FeatureFlag>,
    pub variation_key: String,
}

/// An immutable flag definition.
///
/// Constructed once per refresh from wire data (or directly through
/// [`FeatureFlag::builder`]) and never mutated afterwards. Targeting rules
/// are held in ascending priority order; the default rule is kept apart.
#[derive(Debug, Clone)]
pub struct FeatureFlag {
    key: String,
    name: String,
    kind: String,
    enabled: bool,
    rules: Vec<Rule>,
    default_rule: Rule,
    off_variation: Arc<Variation>,
    variations: Vec<Arc<Variation>>,
    prerequisites: Vec<Prerequisite>,
}

impl FeatureFlag {
    #[must_use]
    pub fn builder(key: impl Into<String>) -> FeatureFlagBuilder {
        FeatureFlagBuilder::new(key)
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form flag type as published by the server, e.g. `boolean`.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Non-default rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn default_rule(&self) -> &Rule {
        &self.default_rule
    }

    #[must_use]
    pub fn off_variation(&self) -> &Arc<Variation> {
        &self.off_variation
    }

    #[must_use]
    pub fn variations(&self) -> &[Arc<Variation>] {
        &self.variations
    }

    #[must_use]
    pub fn variation(&self, key: &str) -> Option<&Arc<Variation>> {
        self.variations.iter().find(|v| v.key() == key)
    }

    #[must_use]
    pub fn prerequisites(&self) -> &[Prerequisite] {
        &self.prerequisites
    }

    /// Evaluate this flag for `user`. See [`crate::evaluate::evaluate`].
    pub fn evaluate(&self, user: &User) -> Evaluation {
        crate::evaluate::evaluate(self, user)
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.enabled { "on" } else { "off" };
        write!(
            f,
            "{} [{state}] {} variations, {} rules, {} prerequisites",
            self.key,
            self.variations.len(),
            self.rules.len(),
            self.prerequisites.len()
        )
    }
}

/// Consuming builder for [`FeatureFlag`].
#[derive(Debug)]
pub struct FeatureFlagBuilder {
    key: String,
    name: Option<String>,
    kind: String,
    enabled: bool,
    rules: Vec<Rule>,
    off_variation: Option<String>,
    variations: Vec<Arc<Variation>>,
    prerequisites: Vec<Prerequisite>,
}

impl FeatureFlagBuilder {
    fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: None,
            kind: "string".to_owned(),
            enabled: true,
            rules: Vec::new(),
            off_variation: None,
            variations: Vec::new(),
            prerequisites: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn variation(mut self, variation: impl Into<Arc<Variation>>) -> Self {
        self.variations.push(variation.into());
        self
    }

    /// Add a rule. A rule built with [`Rule::default_rule`] becomes the
    /// flag's default rule.
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn off_variation(mut self, key: impl Into<String>) -> Self {
        self.off_variation = Some(key.into());
        self
    }

    #[must_use]
    pub fn prerequisite(mut self, flag: Arc<FeatureFlag>, variation_key: impl Into<String>) -> Self {
        self.prerequisites.push(Prerequisite {
            flag,
            variation_key: variation_key.into(),
        });
        self
    }

    /// Validate and freeze the flag.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if variation keys repeat, the off variation
    /// or a split names an unknown variation, a split weight or a rule's
    /// total weight exceeds 100, or
    /// the flag does not have exactly one default rule.
    pub fn build(self) -> Result<FeatureFlag, ParseError> {
        let flag = self.key;

        let mut seen = HashSet::new();
        for v in &self.variations {
            if !seen.insert(v.key()) {
                return Err(ParseError::DuplicateVariation {
                    flag,
                    key: v.key().to_owned(),
                });
            }
        }

        let off_key = self
            .off_variation
            .ok_or_else(|| ParseError::MissingOffVariation { flag: flag.clone() })?;
        let off_variation = self
            .variations
            .iter()
            .find(|v| v.key() == off_key)
            .cloned()
            .ok_or_else(|| ParseError::UnknownVariation {
                flag: flag.clone(),
                key: off_key,
            })?;

        for rule in &self.rules {
            if let Some(split) = rule.splits().iter().find(|s| s.weight > 100) {
                return Err(ParseError::WeightOutOfRange {
                    variation: split.variation.key().to_owned(),
                    weight: split.weight,
                    flag,
                });
            }
            let total = rule.total_weight();
            if total > 100 {
                return Err(ParseError::RolloutExceeded { flag, total });
            }
            if let Some(split) = rule.splits().iter().find(|s| !seen.contains(s.variation.key())) {
                return Err(ParseError::UnknownVariation {
                    key: split.variation.key().to_owned(),
                    flag,
                });
            }
        }

        let (defaults, mut rules): (Vec<Rule>, Vec<Rule>) =
            self.rules.into_iter().partition(Rule::is_default);
        let default_rule = match <[Rule; 1]>::try_from(defaults) {
            Ok([rule]) => rule,
            Err(defaults) if defaults.is_empty() => {
                return Err(ParseError::MissingDefaultRule { flag });
            }
            Err(defaults) => {
                return Err(ParseError::MultipleDefaultRules {
                    flag,
                    count: defaults.len(),
                });
            }
        };
        rules.sort_by_key(Rule::priority);

        Ok(FeatureFlag {
            name: self.name.unwrap_or_else(|| flag.clone()),
            key: flag,
            kind: self.kind,
            enabled: self.enabled,
            rules,
            default_rule,
            off_variation,
            variations: self.variations,
            prerequisites: self.prerequisites,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Split;

    fn on_off() -> (Arc<Variation>, Arc<Variation>) {
        (Arc::new(Variation::new("on")), Arc::new(Variation::new("off")))
    }

    #[test]
    fn build_sorts_rules_and_separates_default() {
        let (on, off) = on_off();
        let flag = FeatureFlag::builder("f")
            .variation(Arc::clone(&on))
            .variation(Arc::clone(&off))
            .rule(Rule::new(5, vec![], vec![Split::new(Arc::clone(&off), 100)]))
            .rule(Rule::default_rule(vec![Split::new(Arc::clone(&on), 100)]))
            .rule(Rule::new(1, vec![], vec![Split::new(Arc::clone(&on), 100)]))
            .off_variation("off")
            .build()
            .unwrap();
        let priorities: Vec<i64> = flag.rules().iter().map(Rule::priority).collect();
        assert_eq!(priorities, [1, 5]);
        assert!(flag.default_rule().is_default());
        assert_eq!(flag.off_variation().key(), "off");
        assert_eq!(flag.name(), "f");
    }

    #[test]
    fn missing_default_rule() {
        let (on, off) = on_off();
        let err = FeatureFlag::builder("f")
            .variation(on)
            .variation(off)
            .off_variation("off")
            .build()
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingDefaultRule { .. }));
    }

    #[test]
    fn multiple_default_rules() {
        let (on, off) = on_off();
        let err = FeatureFlag::builder("f")
            .variation(Arc::clone(&on))
            .variation(off)
            .rule(Rule::default_rule(vec![Split::new(Arc::clone(&on), 100)]))
            .rule(Rule::default_rule(vec![Split::new(on, 100)]))
            .off_variation("off")
            .build()
            .unwrap_err();
        assert!(matches!(err, ParseError::MultipleDefaultRules { count: 2, .. }));
    }

    #[test]
    fn unknown_off_variation() {
        let (on, _) = on_off();
        let err = FeatureFlag::builder("f")
            .variation(Arc::clone(&on))
            .rule(Rule::default_rule(vec![Split::new(on, 100)]))
            .off_variation("off")
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "flag 'f' references undefined variation 'off'");
    }

    #[test]
    fn missing_off_variation() {
        let (on, _) = on_off();
        let err = FeatureFlag::builder("f")
            .variation(Arc::clone(&on))
            .rule(Rule::default_rule(vec![Split::new(on, 100)]))
            .build()
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingOffVariation { .. }));
    }

    #[test]
    fn duplicate_variation_key() {
        let err = FeatureFlag::builder("f")
            .variation(Variation::new("on"))
            .variation(Variation::new("on"))
            .off_variation("on")
            .build()
            .unwrap_err();
        assert!(matches!(err, ParseError::DuplicateVariation { .. }));
    }

    #[test]
    fn rollout_over_100_rejected() {
        let (on, off) = on_off();
        let err = FeatureFlag::builder("f")
            .variation(Arc::clone(&on))
            .variation(Arc::clone(&off))
            .rule(Rule::default_rule(vec![
                Split::new(on, 60),
                Split::new(Arc::clone(&off), 60),
            ]))
            .off_variation("off")
            .build()
            .unwrap_err();
        assert!(matches!(err, ParseError::RolloutExceeded { total: 120, .. }));
    }

    #[test]
    fn oversized_split_weight_rejected() {
        let (on, off) = on_off();
        let err = FeatureFlag::builder("f")
            .variation(Arc::clone(&on))
            .variation(Arc::clone(&off))
            .rule(Rule::default_rule(vec![
                Split::new(on, u32::MAX),
                Split::new(Arc::clone(&off), 2),
            ]))
            .off_variation("off")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ParseError::WeightOutOfRange { weight: u32::MAX, .. }
        ));
    }

    #[test]
    fn split_must_reference_flag_variation() {
        let (on, off) = on_off();
        let stranger = Arc::new(Variation::new("blue"));
        let err = FeatureFlag::builder("f")
            .variation(on)
            .variation(off)
            .rule(Rule::default_rule(vec![Split::new(stranger, 100)]))
            .off_variation("off")
            .build()
            .unwrap_err();
        assert!(matches!(err, ParseError::UnknownVariation { ref key, .. } if key == "blue"));
    }

    #[test]
    fn display() {
        let (on, off) = on_off();
        let flag = FeatureFlag::builder("f")
            .enabled(false)
            .variation(Arc::clone(&on))
            .variation(off)
            .rule(Rule::default_rule(vec![Split::new(on, 100)]))
            .off_variation("off")
            .build()
            .unwrap();
        assert_eq!(flag.to_string(), "f [off] 2 variations, 0 rules, 0 prerequisites");
    }
}
