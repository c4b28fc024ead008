mod condition;
mod error;
mod evaluation;
mod flag;
mod operator;
mod rule;
mod user;
mod value;
mod variation;

pub use condition::Condition;
pub use error::{ParseError, UserError};
pub use evaluation::{Evaluation, Reason, VariationConfig, CONTROL};
pub use flag::{FeatureFlag, FeatureFlagBuilder, Prerequisite};
pub use operator::Operator;
pub use rule::{Rule, Split};
pub use user::User;
pub use value::{AttributeType, AttributeValue};
pub use variation::Variation;
