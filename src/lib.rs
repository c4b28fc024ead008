//! Feature-flag evaluation against a locally cached, background-refreshed
//! flag snapshot.
//!
//! Evaluation is synchronous and never touches the network: a [`Client`]
//! reads the currently installed [`store::Snapshot`] and runs [`evaluate`]
//! over it, while a Tokio task keeps the snapshot fresh.

mod bucket;
mod client;
pub mod config;
mod error;
pub mod evaluate;
pub mod events;
mod parse;
mod registry;
pub mod store;
pub mod transport;
mod types;

pub use bucket::{bucket, murmur3_x86_32};
pub use client::{AccountDetails, Client, ClientBuilder, NOT_READY};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ConfigError, FlagwiseError, ReadyError, TransportError};
pub use evaluate::evaluate;
pub use parse::{parse_flag, parse_payload, FlagPayload};
pub use registry::ClientRegistry;
pub use types::{
    AttributeType, AttributeValue, Condition, Evaluation, FeatureFlag, FeatureFlagBuilder,
    Operator, ParseError, Prerequisite, Reason, Rule, Split, User, UserError, Variation,
    VariationConfig, CONTROL,
};
