//! Serde mirror of the flag payload published by the server.
//!
//! Only the fields the engine depends on are declared; everything else in
//! the payload is ignored.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireData {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub env_name: Option<String>,
    /// Kept raw so one malformed flag does not sink the whole payload.
    #[serde(default)]
    pub flags: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireFlag {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub state: String,
    pub variations: Vec<WireVariation>,
    #[serde(default)]
    pub rules: Vec<WireRule>,
    pub off_variation: i64,
    /// Serialized prerequisite flag mapped to the serialized variation it
    /// must evaluate to.
    #[serde(default)]
    pub prerequisite_flags: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireVariation {
    pub id: i64,
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub configs: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub allow_list: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireRule {
    pub is_default: bool,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub conditions: Vec<WireCondition>,
    pub splits: Vec<WireSplit>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCondition {
    pub attribute: String,
    pub op: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: WireConditionValue,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireConditionValue {
    Many(Vec<String>),
    One(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireSplit {
    pub variation_id: i64,
    pub rollout_percentage: u32,
}
