//! Request and response bodies for the ledger's two HTTP verbs.

use crate::error::{ProtocolError, ProtocolResult};
use crate::selector::{Namespace, Selector, SelectorRange};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a `POST /make` call creating or updating one record.
///
/// `value` carries the record's serialized form as an opaque string; the
/// ledger never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeRequest {
    /// Composite key: one selector level per addressing dimension.
    #[serde(rename = "Selectors")]
    pub selectors: Vec<Vec<Selector>>,
    /// Opaque pre-serialized record payload.
    #[serde(rename = "Value")]
    pub value: String,
    /// Credential proving write authority over the selectors.
    #[serde(rename = "OwnerPrivate")]
    pub owner_private: String,
    /// Key used by the ledger to obscure selector contents from non-owners.
    #[serde(rename = "MaskingKey")]
    pub masking_key: String,
}

impl MakeRequest {
    /// Builds a create/update request for a network record.
    pub fn network(
        namespace: &Namespace,
        network_id: u64,
        value: String,
        owner_private: impl Into<String>,
        masking_key: impl Into<String>,
    ) -> Self {
        Self {
            selectors: vec![vec![Selector::new(&namespace.networks, network_id)]],
            value,
            owner_private: owner_private.into(),
            masking_key: masking_key.into(),
        }
    }

    /// Builds a create/update request for a member record, addressed by its
    /// network and then the member itself.
    pub fn member(
        namespace: &Namespace,
        network_id: u64,
        member_id: u64,
        value: String,
        owner_private: impl Into<String>,
        masking_key: impl Into<String>,
    ) -> Self {
        Self {
            selectors: vec![vec![
                Selector::new(&namespace.networks, network_id),
                Selector::new(&namespace.members, member_id),
            ]],
            value,
            owner_private: owner_private.into(),
            masking_key: masking_key.into(),
        }
    }
}

/// Body of a `POST /query` call: a time-windowed range query over one or two
/// selector namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// One range per queried selector namespace.
    #[serde(rename = "Ranges")]
    pub ranges: Vec<SelectorRange>,
    /// Half-open time window `[watermark, infinity)` in unix seconds.
    #[serde(rename = "TimeRange")]
    pub time_range: [u64; 2],
    /// Masking key matching the one used on `/make`.
    #[serde(rename = "MaskingKey")]
    pub masking_key: String,
    /// Public credentials whose records are requested.
    #[serde(rename = "Owners")]
    pub owners: Vec<String>,
}

impl QueryRequest {
    /// Builds a query over the controller's network namespace.
    pub fn networks(
        namespace: &Namespace,
        since: u64,
        masking_key: impl Into<String>,
        owner_public: impl Into<String>,
    ) -> Self {
        Self {
            ranges: vec![SelectorRange::full(&namespace.networks)],
            time_range: [since, u64::MAX],
            masking_key: masking_key.into(),
            owners: vec![owner_public.into()],
        }
    }

    /// Builds a query over the network and member namespaces jointly.
    pub fn members(
        namespace: &Namespace,
        since: u64,
        masking_key: impl Into<String>,
        owner_public: impl Into<String>,
    ) -> Self {
        Self {
            ranges: vec![
                SelectorRange::full(&namespace.networks),
                SelectorRange::full(&namespace.members),
            ],
            time_range: [since, u64::MAX],
            masking_key: masking_key.into(),
            owners: vec![owner_public.into()],
        }
    }
}

/// One element of a query result set: the ledger's record envelope plus the
/// opaque payload string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    /// Ledger-side record metadata; must be an object for the match to be
    /// usable.
    #[serde(rename = "Record", default)]
    pub record: Value,
    /// Opaque serialized record payload.
    #[serde(rename = "Value", default)]
    pub value: String,
}

impl QueryMatch {
    /// Decodes the payload string back into a JSON object.
    ///
    /// Returns `None` for any malformed match (non-object envelope, invalid
    /// payload JSON, non-object payload); callers skip such records.
    pub fn payload(&self) -> Option<Value> {
        if !self.record.is_object() {
            return None;
        }
        let payload: Value = serde_json::from_str(&self.value).ok()?;
        payload.is_object().then_some(payload)
    }
}

/// Parsed body of a `/query` response: an array of result sets, newest
/// first within each set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryResults(pub Vec<Vec<QueryMatch>>);

impl QueryResults {
    /// Parses a response body.
    ///
    /// The body must be an array; inside it, result sets that are not arrays
    /// and entries that do not decode are skipped individually rather than
    /// failing the response.
    pub fn parse(body: &str) -> ProtocolResult<Self> {
        let root: Value = serde_json::from_str(body)?;
        let sets = root.as_array().ok_or_else(|| {
            ProtocolError::MalformedResponse("query response body is not an array".into())
        })?;

        let mut out = Vec::with_capacity(sets.len());
        for set in sets {
            let Some(items) = set.as_array() else {
                continue;
            };
            out.push(
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect(),
            );
        }
        Ok(Self(out))
    }

    /// Iterates over the first match of each non-empty result set, which is
    /// the newest version of each record.
    pub fn first_matches(&self) -> impl Iterator<Item = &QueryMatch> {
        self.0.iter().filter_map(|set| set.first())
    }

    /// Returns true if no result set contains any match.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Vec::is_empty)
    }
}

impl From<Vec<Vec<QueryMatch>>> for QueryResults {
    fn from(sets: Vec<Vec<QueryMatch>>) -> Self {
        Self(sets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ControllerId;
    use serde_json::json;

    fn namespace() -> Namespace {
        Namespace::new(ControllerId::new(0xaaaa_aaaa_aa))
    }

    #[test]
    fn make_request_network_wire_shape() {
        let request = MakeRequest::network(
            &namespace(),
            0xaaaa_aaaa_aa_000001,
            json!({"objtype": "network"}).to_string(),
            "priv",
            "aaaaaaaaaa",
        );
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "Selectors": [[
                    {"Name": "com.ledgersync.controller:aaaaaaaaaa/network",
                     "Ordinal": 0xaaaa_aaaa_aa_000001u64}
                ]],
                "Value": "{\"objtype\":\"network\"}",
                "OwnerPrivate": "priv",
                "MaskingKey": "aaaaaaaaaa"
            })
        );
    }

    #[test]
    fn make_request_member_has_two_selector_levels() {
        let request = MakeRequest::member(
            &namespace(),
            0xaaaa_aaaa_aa_000001,
            0x99,
            "{}".into(),
            "priv",
            "aaaaaaaaaa",
        );
        assert_eq!(request.selectors.len(), 1);
        assert_eq!(request.selectors[0].len(), 2);
        assert_eq!(request.selectors[0][0].ordinal, 0xaaaa_aaaa_aa_000001);
        assert_eq!(request.selectors[0][1].ordinal, 0x99);
        assert!(request.selectors[0][1].name.ends_with("/network/member"));
    }

    #[test]
    fn query_request_wire_shape() {
        let request = QueryRequest::networks(&namespace(), 1234, "aaaaaaaaaa", "pub");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "Ranges": [
                    {"Name": "com.ledgersync.controller:aaaaaaaaaa/network",
                     "Range": [0u64, u64::MAX]}
                ],
                "TimeRange": [1234u64, u64::MAX],
                "MaskingKey": "aaaaaaaaaa",
                "Owners": ["pub"]
            })
        );

        let joint = QueryRequest::members(&namespace(), 1234, "aaaaaaaaaa", "pub");
        assert_eq!(joint.ranges.len(), 2);
    }

    #[test]
    fn double_encoded_payload_survives_round_trip() {
        let network = json!({"objtype": "network", "id": "aaaaaaaaaa000001", "name": "lan"});
        let request = MakeRequest::network(
            &namespace(),
            1,
            network.to_string(),
            "priv",
            "aaaaaaaaaa",
        );

        let wire = serde_json::to_string(&request).unwrap();
        let decoded: MakeRequest = serde_json::from_str(&wire).unwrap();
        let inner: Value = serde_json::from_str(&decoded.value).unwrap();
        assert_eq!(inner, network);
    }

    #[test]
    fn query_results_parse_and_first_matches() {
        let body = json!([
            [{"Record": {"ts": 1}, "Value": "{\"id\":\"01\"}"},
             {"Record": {"ts": 0}, "Value": "{\"id\":\"00\"}"}],
            [],
            [{"Record": {"ts": 2}, "Value": "{\"id\":\"02\"}"}]
        ])
        .to_string();

        let results = QueryResults::parse(&body).unwrap();
        let newest: Vec<_> = results
            .first_matches()
            .filter_map(QueryMatch::payload)
            .collect();
        assert_eq!(newest.len(), 2);
        assert_eq!(newest[0]["id"], "01");
        assert_eq!(newest[1]["id"], "02");
    }

    #[test]
    fn query_results_skip_malformed_entries() {
        let body = json!([
            "not a result set",
            [{"Record": "not an object", "Value": "{}"}],
            [{"Record": {}, "Value": "not json"}],
            [{"Record": {}, "Value": "\"a string, not an object\""}],
            [{"Record": {}, "Value": "{\"ok\":true}"}]
        ])
        .to_string();

        let results = QueryResults::parse(&body).unwrap();
        let usable: Vec<_> = results
            .first_matches()
            .filter_map(QueryMatch::payload)
            .collect();
        assert_eq!(usable.len(), 1);
        assert_eq!(usable[0]["ok"], true);
    }

    #[test]
    fn query_results_reject_non_array_body() {
        assert!(QueryResults::parse("{}").is_err());
        assert!(QueryResults::parse("null").is_err());
        assert!(QueryResults::parse("not json at all").is_err());
        assert!(QueryResults::parse("[]").unwrap().is_empty());
    }
}
