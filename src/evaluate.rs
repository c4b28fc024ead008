use tracing::{debug, info, warn};

use crate::bucket::bucket;
use crate::{Evaluation, FeatureFlag, Reason, Rule, User};

/// Deepest prerequisite chain the evaluator follows before failing closed.
pub const MAX_PREREQUISITE_DEPTH: usize = 32;

/// Decide which variation `user` receives for `flag`.
///
/// Branches are tried in order: disabled flag, failed prerequisite,
/// allow-list, targeting rules by priority, default rule. The result is a
/// pure function of the flag and the user.
pub fn evaluate(flag: &FeatureFlag, user: &User) -> Evaluation {
    let mut path = Vec::new();
    evaluate_on_path(flag, user, &mut path)
}

fn evaluate_on_path<'a>(flag: &'a FeatureFlag, user: &User, path: &mut Vec<&'a str>) -> Evaluation {
    if !flag.is_enabled() {
        debug!(flag = flag.key(), user = user.id(), "flag disabled, serving off variation");
        return Evaluation::new(flag.key(), flag.off_variation().clone(), Reason::FlagDisabled);
    }

    if !prerequisites_hold(flag, user, path) {
        return Evaluation::new(
            flag.key(),
            flag.off_variation().clone(),
            Reason::PrerequisiteFailed,
        );
    }

    if let Some(variation) = flag.variations().iter().find(|v| v.is_allow_listed(user.id())) {
        info!(
            flag = flag.key(),
            user = user.id(),
            variation = variation.key(),
            "user is allow-listed"
        );
        return Evaluation::new(flag.key(), variation.clone(), Reason::AllowListed);
    }

    let bucket = bucket(user.id(), flag.key());

    if let Some(rule) = flag.rules().iter().find(|rule| rule.matches(user)) {
        debug!(
            flag = flag.key(),
            user = user.id(),
            priority = rule.priority(),
            bucket,
            "targeting rule matched"
        );
        return serve(flag, rule, bucket, Reason::RuleMatched);
    }

    debug!(flag = flag.key(), user = user.id(), bucket, "serving default rule");
    serve(flag, flag.default_rule(), bucket, Reason::DefaultRule)
}

/// Evaluate every prerequisite for the same user. A prerequisite that is
/// already being evaluated further up the chain, or a chain longer than
/// [`MAX_PREREQUISITE_DEPTH`], counts as failed.
fn prerequisites_hold<'a>(flag: &'a FeatureFlag, user: &User, path: &mut Vec<&'a str>) -> bool {
    if flag.prerequisites().is_empty() {
        return true;
    }

    path.push(flag.key());
    let mut held = true;
    for prerequisite in flag.prerequisites() {
        let required = prerequisite.flag.key();
        if path.contains(&required) {
            warn!(flag = flag.key(), prerequisite = required, "prerequisite cycle detected");
            held = false;
            break;
        }
        if path.len() >= MAX_PREREQUISITE_DEPTH {
            warn!(
                flag = flag.key(),
                depth = path.len(),
                "prerequisite chain too deep"
            );
            held = false;
            break;
        }

        let outcome = evaluate_on_path(&prerequisite.flag, user, path);
        if outcome.variation_key() != prerequisite.variation_key {
            info!(
                flag = flag.key(),
                prerequisite = required,
                expected = prerequisite.variation_key.as_str(),
                actual = outcome.variation_key(),
                "prerequisite failed"
            );
            held = false;
            break;
        }
    }
    path.pop();
    held
}

fn serve(flag: &FeatureFlag, rule: &Rule, bucket: u32, reason: Reason) -> Evaluation {
    match rule.select(bucket) {
        Some(variation) => Evaluation::new(flag.key(), variation.clone(), reason),
        None => {
            warn!(
                flag = flag.key(),
                bucket,
                total_weight = rule.total_weight(),
                "rollout weights do not reach bucket"
            );
            Evaluation::control(flag.key(), Reason::RolloutIncomplete)
        }
    }
}
