//! Conversion of server payloads into immutable [`FeatureFlag`]s.

mod wire;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::evaluate::MAX_PREREQUISITE_DEPTH;
use crate::{AttributeType, Condition, FeatureFlag, Operator, ParseError, Rule, Split, Variation};
use wire::{WireCondition, WireConditionValue, WireData, WireFlag, WireRule, WireVariation};

/// Everything one payload carries: the flags plus the names of the project
/// and environment they belong to.
#[derive(Debug, Clone, Default)]
pub struct FlagPayload {
    pub project_name: String,
    pub environment_name: String,
    pub flags: Vec<FeatureFlag>,
}

/// Parse a flag payload.
///
/// The payload may be wrapped as `{"data": {...}}` (incremental API) or be
/// the data object itself (bulk snapshot). Individual flags that fail to
/// convert are logged and skipped.
///
/// # Errors
///
/// Returns [`ParseError::Json`] if the body is not JSON or the data object
/// does not have the expected shape.
pub fn parse_payload(body: &str) -> Result<FlagPayload, ParseError> {
    let root: serde_json::Value = serde_json::from_str(body)?;
    let data = match root {
        serde_json::Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    };
    let data: WireData = serde_json::from_value(data)?;

    let mut flags = Vec::with_capacity(data.flags.len());
    for raw in data.flags {
        let key = raw
            .get("key")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("<unknown>")
            .to_owned();
        match serde_json::from_value::<WireFlag>(raw)
            .map_err(ParseError::from)
            .and_then(|wire| convert_flag(wire, 0))
        {
            Ok(flag) => flags.push(flag),
            Err(e) => warn!(flag = key.as_str(), error = %e, "skipping malformed flag"),
        }
    }

    Ok(FlagPayload {
        project_name: data.project_name.unwrap_or_default(),
        environment_name: data.env_name.unwrap_or_default(),
        flags,
    })
}

/// Parse a single serialized flag.
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first problem found.
pub fn parse_flag(json: &str) -> Result<FeatureFlag, ParseError> {
    let wire: WireFlag = serde_json::from_str(json)?;
    convert_flag(wire, 0)
}

fn convert_flag(wire: WireFlag, depth: usize) -> Result<FeatureFlag, ParseError> {
    if depth > MAX_PREREQUISITE_DEPTH {
        return Err(ParseError::PrerequisiteTooDeep {
            flag: wire.key,
            limit: MAX_PREREQUISITE_DEPTH,
        });
    }

    let by_id: HashMap<i64, Arc<Variation>> = wire
        .variations
        .iter()
        .map(|v| (v.id, Arc::new(convert_variation(v))))
        .collect();
    let lookup = |id: i64| {
        by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| ParseError::UndefinedVariation {
                flag: wire.key.clone(),
                id,
            })
    };

    let off = lookup(wire.off_variation)?;
    let mut builder = FeatureFlag::builder(wire.key.as_str())
        .enabled(wire.state == "ACTIVE")
        .off_variation(off.key());
    if let Some(name) = &wire.name {
        builder = builder.name(name.as_str());
    }
    if let Some(kind) = &wire.kind {
        builder = builder.kind(kind.as_str());
    }
    // Declaration order is kept for allow-list scanning.
    for v in &wire.variations {
        if let Some(shared) = by_id.get(&v.id) {
            builder = builder.variation(Arc::clone(shared));
        }
    }
    for rule in &wire.rules {
        builder = builder.rule(convert_rule(rule, &lookup)?);
    }
    for (flag_json, variation_json) in wire.prerequisite_flags.iter().flatten() {
        let prerequisite: WireFlag = serde_json::from_str(flag_json)?;
        let required: WireVariation = serde_json::from_str(variation_json)?;
        let prerequisite = convert_flag(prerequisite, depth + 1)?;
        builder = builder.prerequisite(Arc::new(prerequisite), required.key);
    }

    builder.build()
}

fn convert_variation(wire: &WireVariation) -> Variation {
    let properties = wire
        .configs
        .iter()
        .flatten()
        .map(|(k, v)| {
            let value = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect();
    Variation::new(wire.key.as_str())
        .with_name(wire.name.as_deref().unwrap_or(&wire.key))
        .with_properties(properties)
        .with_allow_list(wire.allow_list.as_deref().unwrap_or_default())
}

fn convert_rule(
    wire: &WireRule,
    lookup: &impl Fn(i64) -> Result<Arc<Variation>, ParseError>,
) -> Result<Rule, ParseError> {
    let splits = wire
        .splits
        .iter()
        .map(|s| Ok(Split::new(lookup(s.variation_id)?, s.rollout_percentage)))
        .collect::<Result<Vec<_>, ParseError>>()?;
    if wire.is_default {
        return Ok(Rule::default_rule(splits));
    }
    let conditions = wire
        .conditions
        .iter()
        .map(convert_condition)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Rule::new(wire.priority, conditions, splits))
}

fn convert_condition(wire: &WireCondition) -> Result<Condition, ParseError> {
    let operator: Operator = wire.op.parse()?;
    let attribute_type: AttributeType = wire.kind.parse()?;
    let values = match &wire.value {
        WireConditionValue::Many(values) => values.clone(),
        WireConditionValue::One(value) if operator.takes_list() => value
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .collect(),
        WireConditionValue::One(value) => vec![value.clone()],
    };
    Condition::new(wire.attribute.as_str(), operator, attribute_type, values)
}
