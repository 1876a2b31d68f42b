//! Helpers for the opaque network/member record envelopes.
//!
//! Records are JSON objects owned by the controller; this engine only reads
//! the kind discriminator, the hex identifiers, and the revision counter.

use serde_json::Value;

/// The kind of configuration object carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A network configuration record.
    Network,
    /// A member configuration record, nested under a network.
    Member,
}

/// Reads the `objtype` discriminator of a record.
pub fn record_kind(record: &Value) -> Option<RecordKind> {
    match record.get("objtype").and_then(Value::as_str) {
        Some("network") => Some(RecordKind::Network),
        Some("member") => Some(RecordKind::Member),
        _ => None,
    }
}

/// Parses a 64-bit identifier from its hex-string form.
pub fn parse_hex_id(text: &str) -> Option<u64> {
    u64::from_str_radix(text.trim(), 16).ok()
}

/// Reads an identifier field, accepting either the canonical hex-string form
/// or a raw JSON integer.
fn id_field(record: &Value, field: &str) -> Option<u64> {
    match record.get(field)? {
        Value::String(s) => parse_hex_id(s),
        other => other.as_u64(),
    }
}

/// Reads a record's own `id` field (network id for networks, member id for
/// members).
pub fn record_id(record: &Value) -> Option<u64> {
    id_field(record, "id")
}

/// Reads the owning network id of a member record (`nwid`).
pub fn network_id_of(record: &Value) -> Option<u64> {
    id_field(record, "nwid")
}

/// Reads the member id of a member record.
pub fn member_id_of(record: &Value) -> Option<u64> {
    record_id(record)
}

/// Reads a record's revision counter, defaulting to zero when absent or not
/// numeric.
pub fn revision_of(record: &Value) -> u64 {
    record.get("revision").and_then(Value::as_u64).unwrap_or(0)
}
