//! Selector addressing for ledger records.

use crate::identity::ControllerId;
use serde::{Deserialize, Serialize};

/// Reverse-domain prefix for all selector names written by this engine.
pub const SELECTOR_DOMAIN: &str = "com.ledgersync.controller";

/// A single level of a record's composite key.
///
/// Network records are addressed by one selector level; member records by
/// two (network then member).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    /// Selector namespace name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Numeric ordinal within the namespace.
    #[serde(rename = "Ordinal")]
    pub ordinal: u64,
}

impl Selector {
    /// Creates a selector.
    pub fn new(name: impl Into<String>, ordinal: u64) -> Self {
        Self {
            name: name.into(),
            ordinal,
        }
    }
}

/// An ordinal range over one selector namespace, used in queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRange {
    /// Selector namespace name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Inclusive ordinal bounds.
    #[serde(rename = "Range")]
    pub range: [u64; 2],
}

impl SelectorRange {
    /// Creates a range spanning the full ordinal domain of a namespace.
    pub fn full(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: [0, u64::MAX],
        }
    }
}

/// The pair of selector namespaces owned by one controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Namespace for network records.
    pub networks: String,
    /// Namespace for member records, nested under networks.
    pub members: String,
}

impl Namespace {
    /// Builds the selector namespaces for a controller.
    pub fn new(controller: ControllerId) -> Self {
        Self {
            networks: format!("{SELECTOR_DOMAIN}:{controller}/network"),
            members: format!("{SELECTOR_DOMAIN}:{controller}/network/member"),
        }
    }
}
