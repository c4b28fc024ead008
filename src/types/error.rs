use thiserror::Error;

/// Errors raised while turning wire data into flag definitions.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid flag payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("flag '{flag}' has no default rule")]
    MissingDefaultRule { flag: String },

    #[error("flag '{flag}' has {count} default rules; exactly one is required")]
    MultipleDefaultRules { flag: String, count: usize },

    #[error("unknown operator '{code}'")]
    UnknownOperator { code: String },

    #[error("unknown attribute type '{name}'")]
    UnknownAttributeType { name: String },

    #[error("flag '{flag}' references undefined variation id {id}")]
    UndefinedVariation { flag: String, id: i64 },

    #[error("flag '{flag}' references undefined variation '{key}'")]
    UnknownVariation { flag: String, key: String },

    #[error("flag '{flag}' has no off variation")]
    MissingOffVariation { flag: String },

    #[error("duplicate variation key '{key}' in flag '{flag}'")]
    DuplicateVariation { flag: String, key: String },

    #[error("rollout in flag '{flag}' sums to {total}%; at most 100% is allowed")]
    RolloutExceeded { flag: String, total: u64 },

    #[error("split for variation '{variation}' in flag '{flag}' has weight {weight}; at most 100 is allowed")]
    WeightOutOfRange {
        flag: String,
        variation: String,
        weight: u32,
    },

    #[error("condition on '{attribute}' has no values")]
    EmptyCondition { attribute: String },

    #[error("prerequisite nesting exceeds {limit} levels at flag '{flag}'")]
    PrerequisiteTooDeep { flag: String, limit: usize },
}

/// Errors raised while building a [`User`](super::User).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserError {
    #[error("user identity must not be empty")]
    EmptyId,

    #[error("attribute name must not be empty")]
    EmptyAttributeName,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_default_rule_message() {
        let err = ParseError::MissingDefaultRule {
            flag: "new-checkout".into(),
        };
        assert_eq!(err.to_string(), "flag 'new-checkout' has no default rule");
    }

    #[test]
    fn multiple_default_rules_message() {
        let err = ParseError::MultipleDefaultRules {
            flag: "f".into(),
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "flag 'f' has 2 default rules; exactly one is required"
        );
    }

    #[test]
    fn unknown_operator_message() {
        let err = ParseError::UnknownOperator { code: "XOR".into() };
        assert_eq!(err.to_string(), "unknown operator 'XOR'");
    }

    #[test]
    fn undefined_variation_message() {
        let err = ParseError::UndefinedVariation {
            flag: "f".into(),
            id: 9,
        };
        assert_eq!(err.to_string(), "flag 'f' references undefined variation id 9");
    }

    #[test]
    fn unknown_variation_message() {
        let err = ParseError::UnknownVariation {
            flag: "f".into(),
            key: "blue".into(),
        };
        assert_eq!(err.to_string(), "flag 'f' references undefined variation 'blue'");
    }

    #[test]
    fn duplicate_variation_message() {
        let err = ParseError::DuplicateVariation {
            flag: "f".into(),
            key: "on".into(),
        };
        assert_eq!(err.to_string(), "duplicate variation key 'on' in flag 'f'");
    }

    #[test]
    fn rollout_exceeded_message() {
        let err = ParseError::RolloutExceeded {
            flag: "f".into(),
            total: 110,
        };
        assert_eq!(
            err.to_string(),
            "rollout in flag 'f' sums to 110%; at most 100% is allowed"
        );
    }

    #[test]
    fn weight_out_of_range_message() {
        let err = ParseError::WeightOutOfRange {
            flag: "f".into(),
            variation: "on".into(),
            weight: 4_294_967_295,
        };
        assert_eq!(
            err.to_string(),
            "split for variation 'on' in flag 'f' has weight 4294967295; at most 100 is allowed"
        );
    }

    #[test]
    fn prerequisite_too_deep_message() {
        let err = ParseError::PrerequisiteTooDeep {
            flag: "f".into(),
            limit: 32,
        };
        assert_eq!(
            err.to_string(),
            "prerequisite nesting exceeds 32 levels at flag 'f'"
        );
    }

    #[test]
    fn user_error_messages() {
        assert_eq!(UserError::EmptyId.to_string(), "user identity must not be empty");
        assert_eq!(
            UserError::EmptyAttributeName.to_string(),
            "attribute name must not be empty"
        );
    }
}
