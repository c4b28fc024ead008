
use std::sync::Arc;

use flagwise::{
    evaluate, AttributeType, FeatureFlag, Operator, Reason, Rule, Split, User, Variation, CONTROL,
};
use strategies::{condition, rollout_flag, targeted_flag};

fn user(id: &str) -> User {
    User::new(id).unwrap()
}

#[test]
fn even_split_stays_within_bounds() {
    let flag = rollout_flag("even-split", &[("a", 50), ("b", 50)]);
    let mut a = 0;
    let mut b = 0;
    for i in 0..1000 {
        match evaluate(&flag, &user(&format!("user-{i}"))).variation_key() {
            "a" => a += 1,
            "b" => b += 1,
            other => panic!("unexpected variation {other}"),
        }
    }
    assert!((400..=600).contains(&a), "a = {a}");
    assert!((400..=600).contains(&b), "b = {b}");
}

#[test]
fn one_percent_reaches_someone() {
    let flag = rollout_flag("new-checkout", &[("a", 1), ("b", 99)]);
    let hits = (0..100)
        .filter(|i| evaluate(&flag, &user(&i.to_string())).variation_key() == "a")
        .count();
    assert!(hits >= 1);
}

#[test]
fn zero_percent_reaches_nobody() {
    let flag = rollout_flag("new-checkout", &[("a", 0), ("b", 100)]);
    assert!((0..100).all(|i| evaluate(&flag, &user(&i.to_string())).variation_key() == "b"));
}

#[test]
fn splits_are_walked_in_key_order() {
    // Declared b-first, but "a" still owns the low buckets.
    let flag = rollout_flag("new-checkout", &[("b", 99), ("a", 1)]);
    let hits = (0..100)
        .filter(|i| evaluate(&flag, &user(&i.to_string())).variation_key() == "a")
        .count();
    assert!(hits >= 1);
}

#[test]
fn incomplete_rollout_serves_control() {
    let flag = rollout_flag("rollout", &[("a", 0), ("b", 0)]);
    let result = evaluate(&flag, &user("u1"));
    assert_eq!(result.variation_key(), CONTROL);
    assert_eq!(result.reason(), Reason::RolloutIncomplete);
}

#[test]
fn disabled_flag_ignores_rules_and_allow_list() {
    let on = Arc::new(Variation::new("on").with_allow_list("u1"));
    let off = Arc::new(Variation::new("off"));
    let flag = FeatureFlag::builder("checkout")
        .variation(Arc::clone(&on))
        .variation(Arc::clone(&off))
        .off_variation("off")
        .enabled(false)
        .rule(Rule::default_rule(vec![Split::new(on, 100)]))
        .build()
        .unwrap();

    for id in ["u1", "u2", "u3"] {
        let result = evaluate(&flag, &user(id));
        assert_eq!(result.variation_key(), "off");
        assert_eq!(result.reason(), Reason::FlagDisabled);
    }
}

#[test]
fn allow_list_beats_targeting() {
    let on = Arc::new(Variation::new("on"));
    let off = Arc::new(Variation::new("off").with_allow_list("vip-1, vip-2"));
    let flag = FeatureFlag::builder("checkout")
        .variation(Arc::clone(&on))
        .variation(Arc::clone(&off))
        .off_variation("off")
        .rule(Rule::new(
            1,
            vec![condition("country", Operator::Equals, AttributeType::String, &["us"])],
            vec![Split::new(Arc::clone(&on), 100)],
        ))
        .rule(Rule::default_rule(vec![Split::new(on, 100)]))
        .build()
        .unwrap();

    let vip = user("vip-2").with_attribute("country", "us").unwrap();
    let result = evaluate(&flag, &vip);
    assert_eq!(result.variation_key(), "off");
    assert_eq!(result.reason(), Reason::AllowListed);

    let regular = user("someone").with_attribute("country", "us").unwrap();
    let result = evaluate(&flag, &regular);
    assert_eq!(result.variation_key(), "on");
    assert_eq!(result.reason(), Reason::RuleMatched);
}

#[test]
fn two_level_prerequisite_chain() {
    let base = Arc::new(targeted_flag(
        "base",
        condition("country", Operator::Equals, AttributeType::String, &["us"]),
    ));

    let middle_on = Arc::new(Variation::new("on"));
    let middle = Arc::new(
        FeatureFlag::builder("middle")
            .variation(Arc::clone(&middle_on))
            .variation(Variation::new("off"))
            .off_variation("off")
            .prerequisite(Arc::clone(&base), "on")
            .rule(Rule::default_rule(vec![Split::new(middle_on, 100)]))
            .build()
            .unwrap(),
    );

    let top_on = Arc::new(Variation::new("on"));
    let top = FeatureFlag::builder("top")
        .variation(Arc::clone(&top_on))
        .variation(Variation::new("off"))
        .off_variation("off")
        .prerequisite(Arc::clone(&middle), "on")
        .rule(Rule::default_rule(vec![Split::new(top_on, 100)]))
        .build()
        .unwrap();

    let us = user("u1").with_attribute("country", "us").unwrap();
    let result = evaluate(&top, &us);
    assert_eq!(result.variation_key(), "on");
    assert_eq!(result.reason(), Reason::DefaultRule);

    let de = user("u1").with_attribute("country", "de").unwrap();
    let result = evaluate(&top, &de);
    assert_eq!(result.variation_key(), "off");
    assert_eq!(result.reason(), Reason::PrerequisiteFailed);

    let result = evaluate(&middle, &de);
    assert_eq!(result.reason(), Reason::PrerequisiteFailed);
}

#[test]
fn first_matching_rule_by_priority_wins() {
    let gold = Arc::new(Variation::new("gold"));
    let silver = Arc::new(Variation::new("silver"));
    let none = Arc::new(Variation::new("none"));
    let flag = FeatureFlag::builder("tier")
        .variation(Arc::clone(&gold))
        .variation(Arc::clone(&silver))
        .variation(Arc::clone(&none))
        .off_variation("none")
        .rule(Rule::new(
            20,
            vec![condition("age", Operator::GreaterOrEqual, AttributeType::Number, &["18"])],
            vec![Split::new(silver, 100)],
        ))
        .rule(Rule::new(
            10,
            vec![
                condition("age", Operator::GreaterOrEqual, AttributeType::Number, &["18"]),
                condition("groups", Operator::HasAnyOf, AttributeType::Set, &["vip", "staff"]),
            ],
            vec![Split::new(gold, 100)],
        ))
        .rule(Rule::default_rule(vec![Split::new(none, 100)]))
        .build()
        .unwrap();

    let adult_vip = user("a")
        .with_attribute("age", 30)
        .unwrap()
        .with_attribute("groups", vec!["vip"])
        .unwrap();
    assert_eq!(evaluate(&flag, &adult_vip).variation_key(), "gold");

    let adult = user("b").with_attribute("age", 30).unwrap();
    assert_eq!(evaluate(&flag, &adult).variation_key(), "silver");

    let minor = user("c").with_attribute("age", 12).unwrap();
    let result = evaluate(&flag, &minor);
    assert_eq!(result.variation_key(), "none");
    assert_eq!(result.reason(), Reason::DefaultRule);
}

#[test]
fn type_mismatch_is_a_silent_non_match() {
    let flag = targeted_flag(
        "checkout",
        condition("age", Operator::GreaterThan, AttributeType::Number, &["18"]),
    );
    let text_age = user("u1").with_attribute("age", "forty").unwrap();
    assert_eq!(evaluate(&flag, &text_age).variation_key(), "off");

    let missing = user("u1");
    assert_eq!(evaluate(&flag, &missing).variation_key(), "off");
}

#[test]
fn variation_properties_are_exposed() {
    let on = Arc::new(
        Variation::new("on")
            .with_property("color", "blue")
            .with_property("retries", "3"),
    );
    let flag = FeatureFlag::builder("theme")
        .variation(Arc::clone(&on))
        .variation(Variation::new("off"))
        .off_variation("off")
        .rule(Rule::default_rule(vec![Split::new(on, 100)]))
        .build()
        .unwrap();

    let result = evaluate(&flag, &user("u1"));
    let config = result.config();
    assert_eq!(config.get_str("color"), Some("blue"));
    assert_eq!(config.get_i64("retries"), Some(3));
    assert_eq!(config.len(), 2);
}
