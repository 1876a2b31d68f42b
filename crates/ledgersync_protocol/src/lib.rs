//! # LedgerSync Protocol
//!
//! Wire types and codecs for the remote record ledger's HTTP/JSON protocol.
//!
//! This crate provides:
//! - Selector and selector-range types (`/make` and `/query` addressing)
//! - Request bodies for the ledger's two verbs (`MakeRequest`, `QueryRequest`)
//! - A lenient parser for `/query` response bodies (`QueryResults`)
//! - Helpers for the opaque record envelopes (kind discriminator, hex ids)
//! - The controller identity type and identifier-space ownership check
//!
//! ## Key Invariants
//!
//! - Record payloads travel as opaque pre-serialized strings inside the JSON
//!   envelope (`Value` is a string, never a nested object)
//! - A network identifier belongs to exactly one controller, encoded in its
//!   high-order bits
//! - Malformed entries in a query response are skipped individually and never
//!   fail the surrounding result set

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod identity;
mod messages;
mod record;
mod selector;

pub use error::{ProtocolError, ProtocolResult};
pub use identity::{ControllerId, ADDRESS_BITS, NETWORK_NUMBER_BITS};
pub use messages::{MakeRequest, QueryMatch, QueryRequest, QueryResults};
pub use record::{
    member_id_of, network_id_of, parse_hex_id, record_id, record_kind, revision_of, RecordKind,
};
pub use selector::{Namespace, Selector, SelectorRange, SELECTOR_DOMAIN};
