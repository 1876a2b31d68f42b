//! Controller-facing store surface.
//!
//! The engine never owns configuration objects; it reads canonical values
//! from, and reports changes to, the controller through this trait.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

/// Callbacks the sync engine requires from the hosting controller.
///
/// `get_network`/`get_member` read canonical current values; the
/// `*_changed` notifications let the controller reconcile a change into its
/// own state. `local_origin` is true for changes originating from the local
/// write path and false for changes pulled from the remote ledger. A pulled
/// change may redundantly re-apply content the controller already holds;
/// implementations must treat that as harmless.
pub trait ControllerStore: Send + Sync {
    /// Reads the canonical current value of a network, if it exists.
    fn get_network(&self, network_id: u64) -> Option<Value>;

    /// Reads the canonical current value of a member, if it exists.
    fn get_member(&self, network_id: u64, member_id: u64) -> Option<Value>;

    /// Notifies that a network record changed.
    fn network_changed(&self, old: Option<Value>, new: Value, local_origin: bool);

    /// Notifies that a member record changed.
    fn member_changed(&self, old: Option<Value>, new: Value, local_origin: bool);
}

/// A change notification captured by [`MemoryControllerStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A network record changed.
    Network {
        /// Prior value, if any.
        old: Option<Value>,
        /// New value.
        new: Value,
        /// True when the change came from the local write path.
        local_origin: bool,
    },
    /// A member record changed.
    Member {
        /// Prior value, if any.
        old: Option<Value>,
        /// New value.
        new: Value,
        /// True when the change came from the local write path.
        local_origin: bool,
    },
}

/// An in-memory controller store for tests and embedding.
///
/// Change notifications are applied to the canonical maps (so subsequent
/// reads observe them) and captured in an event log.
#[derive(Debug, Default)]
pub struct MemoryControllerStore {
    networks: RwLock<HashMap<u64, Value>>,
    members: RwLock<HashMap<(u64, u64), Value>>,
    events: RwLock<Vec<ChangeEvent>>,
}

impl MemoryControllerStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a network value directly, without a change notification.
    pub fn insert_network(&self, network_id: u64, value: Value) {
        self.networks.write().insert(network_id, value);
    }

    /// Seeds a member value directly, without a change notification.
    pub fn insert_member(&self, network_id: u64, member_id: u64, value: Value) {
        self.members.write().insert((network_id, member_id), value);
    }

    /// Returns a copy of all captured change events.
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.read().clone()
    }

    /// Drains the captured change events.
    pub fn take_events(&self) -> Vec<ChangeEvent> {
        std::mem::take(&mut *self.events.write())
    }

    /// Number of networks currently held.
    pub fn network_count(&self) -> usize {
        self.networks.read().len()
    }
}

impl ControllerStore for MemoryControllerStore {
    fn get_network(&self, network_id: u64) -> Option<Value> {
        self.networks.read().get(&network_id).cloned()
    }

    fn get_member(&self, network_id: u64, member_id: u64) -> Option<Value> {
        self.members.read().get(&(network_id, member_id)).cloned()
    }

    fn network_changed(&self, old: Option<Value>, new: Value, local_origin: bool) {
        if let Some(id) = ledgersync_protocol::record_id(&new) {
            self.networks.write().insert(id, new.clone());
        }
        self.events.write().push(ChangeEvent::Network {
            old,
            new,
            local_origin,
        });
    }

    fn member_changed(&self, old: Option<Value>, new: Value, local_origin: bool) {
        if let (Some(nwid), Some(id)) = (
            ledgersync_protocol::network_id_of(&new),
            ledgersync_protocol::member_id_of(&new),
        ) {
            self.members.write().insert((nwid, id), new.clone());
        }
        self.events.write().push(ChangeEvent::Member {
            old,
            new,
            local_origin,
        });
    }
}
