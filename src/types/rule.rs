use std::sync::Arc;

use super::{Condition, User, Variation};

/// A variation together with the share of buckets it receives within a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub variation: Arc<Variation>,
    /// Rollout percentage, 0 to 100.
    pub weight: u32,
}

impl Split {
    #[must_use]
    pub fn new(variation: Arc<Variation>, weight: u32) -> Self {
        Self { variation, weight }
    }
}

/// A targeting rule: an AND of conditions and a weighted choice among
/// variations.
///
/// Lower `priority` values are evaluated first. The default rule has no
/// conditions and is applied when no other rule matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    priority: i64,
    is_default: bool,
    conditions: Vec<Condition>,
    splits: Vec<Split>,
}

impl Rule {
    /// Build a targeting rule. Splits are normalized into ascending variation
    /// key order, which is the order rollout buckets are assigned in.
    #[must_use]
    pub fn new(priority: i64, conditions: Vec<Condition>, splits: Vec<Split>) -> Self {
        Self::build(priority, false, conditions, splits)
    }

    /// Build the unconditional fallback rule of a flag.
    #[must_use]
    pub fn default_rule(splits: Vec<Split>) -> Self {
        Self::build(i64::MAX, true, Vec::new(), splits)
    }

    fn build(priority: i64, is_default: bool, conditions: Vec<Condition>, mut splits: Vec<Split>) -> Self {
        splits.sort_by(|a, b| a.variation.key().cmp(b.variation.key()));
        Self {
            priority,
            is_default,
            conditions,
            splits,
        }
    }

    #[must_use]
    pub fn priority(&self) -> i64 {
        self.priority
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    #[must_use]
    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    /// Sum of the rollout weights of this rule. Widened so that arbitrary
    /// wire weights cannot overflow.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.splits.iter().map(|s| u64::from(s.weight)).sum()
    }

    /// Whether every condition holds for `user`. A rule with no conditions
    /// matches everyone.
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        self.conditions.iter().all(|c| c.matches(user))
    }

    /// Pick the variation owning `bucket`: the first split whose cumulative
    /// weight reaches it. `None` when the weights fall short of the bucket.
    #[must_use]
    pub fn select(&self, bucket: u32) -> Option<&Arc<Variation>> {
        let mut cumulative = 0u64;
        self.splits
            .iter()
            .find(|split| {
                cumulative = cumulative.saturating_add(u64::from(split.weight));
                cumulative >= u64::from(bucket)
            })
            .map(|split| &split.variation)
    }
}
