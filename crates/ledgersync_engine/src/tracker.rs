//! Local state tracker: per-network and per-member dirty and liveness state.
//!
//! All state lives behind one mutex. Every operation holds the lock only for
//! a single map lookup or mutation, never across a network call; the sync
//! loop's push phase therefore re-takes the lock once per object, letting
//! caller writes interleave with a running push.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;

/// Sync-side state for one member of one network.
#[derive(Debug, Clone, Default)]
struct MemberSyncState {
    /// Local changes not yet confirmed pushed.
    dirty: bool,
    /// Most recent liveness observation, unix milliseconds; zero when never
    /// observed.
    last_online_time: i64,
    /// Physical address from the most recent liveness observation.
    last_online_address: Option<SocketAddr>,
    /// Liveness data not yet persisted remotely. Computed on every
    /// observation; consumed only once liveness persistence exists.
    last_online_dirty: bool,
}

/// Sync-side state for one network identifier.
#[derive(Debug, Clone, Default)]
struct NetworkSyncState {
    dirty: bool,
    members: HashMap<u64, MemberSyncState>,
}

/// A snapshot of one member's liveness fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberLiveness {
    /// Most recent liveness observation, unix milliseconds.
    pub last_online_time: i64,
    /// Physical address from that observation.
    pub last_online_address: Option<SocketAddr>,
    /// True if the observation has not been persisted remotely.
    pub last_online_dirty: bool,
}

/// Concurrency-safe registry of per-network and per-member sync state.
///
/// Entries are created lazily on first local write or first remote discovery
/// and live for the life of the process.
#[derive(Debug, Default)]
pub struct StateTracker {
    state: Mutex<HashMap<u64, NetworkSyncState>>,
}

impl StateTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a network as having unpushed local changes. Idempotent.
    pub fn mark_network_dirty(&self, network_id: u64) {
        self.state.lock().entry(network_id).or_default().dirty = true;
    }

    /// Marks a member as having unpushed local changes. Idempotent; creates
    /// the parent network entry if needed.
    pub fn mark_member_dirty(&self, network_id: u64, member_id: u64) {
        self.state
            .lock()
            .entry(network_id)
            .or_default()
            .members
            .entry(member_id)
            .or_default()
            .dirty = true;
    }

    /// Clears a network's dirty flag after a confirmed successful push.
    pub fn clear_network_dirty(&self, network_id: u64) {
        if let Some(ns) = self.state.lock().get_mut(&network_id) {
            ns.dirty = false;
        }
    }

    /// Clears a member's dirty flag after a confirmed successful push.
    pub fn clear_member_dirty(&self, network_id: u64, member_id: u64) {
        if let Some(ms) = self
            .state
            .lock()
            .get_mut(&network_id)
            .and_then(|ns| ns.members.get_mut(&member_id))
        {
            ms.dirty = false;
        }
    }

    /// Returns whether a network currently has unpushed changes.
    pub fn is_network_dirty(&self, network_id: u64) -> bool {
        self.state
            .lock()
            .get(&network_id)
            .is_some_and(|ns| ns.dirty)
    }

    /// Returns whether a member currently has unpushed changes.
    pub fn is_member_dirty(&self, network_id: u64, member_id: u64) -> bool {
        self.state
            .lock()
            .get(&network_id)
            .and_then(|ns| ns.members.get(&member_id))
            .is_some_and(|ms| ms.dirty)
    }

    /// Snapshots the ids of all currently dirty networks.
    pub fn dirty_networks(&self) -> Vec<u64> {
        self.state
            .lock()
            .iter()
            .filter(|(_, ns)| ns.dirty)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Snapshots the (network, member) id pairs of all currently dirty
    /// members.
    pub fn dirty_members(&self) -> Vec<(u64, u64)> {
        self.state
            .lock()
            .iter()
            .flat_map(|(nwid, ns)| {
                ns.members
                    .iter()
                    .filter(|(_, ms)| ms.dirty)
                    .map(|(mid, _)| (*nwid, *mid))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Records a liveness observation for a member.
    ///
    /// Only already-known (network, member) pairs are updated; observations
    /// for unknown members are silently dropped and create no entries.
    pub fn record_online(
        &self,
        network_id: u64,
        member_id: u64,
        observed_at_ms: i64,
        address: Option<SocketAddr>,
    ) {
        if let Some(ms) = self
            .state
            .lock()
            .get_mut(&network_id)
            .and_then(|ns| ns.members.get_mut(&member_id))
        {
            ms.last_online_time = observed_at_ms;
            if address.is_some() {
                ms.last_online_address = address;
            }
            ms.last_online_dirty = true;
        }
    }

    /// Registers a network discovered in a remote pull, creating its entry
    /// lazily, and returns its current dirty flag.
    pub fn observe_remote_network(&self, network_id: u64) -> bool {
        self.state.lock().entry(network_id).or_default().dirty
    }

    /// Registers a member discovered in a remote pull and returns its
    /// current dirty flag, or `None` when the parent network is not locally
    /// known (such members are not tracked until their network is).
    pub fn observe_remote_member(&self, network_id: u64, member_id: u64) -> Option<bool> {
        self.state
            .lock()
            .get_mut(&network_id)
            .map(|ns| ns.members.entry(member_id).or_default().dirty)
    }

    /// Returns whether a network identifier has a tracker entry.
    pub fn network_known(&self, network_id: u64) -> bool {
        self.state.lock().contains_key(&network_id)
    }

    /// Returns whether a (network, member) pair has a tracker entry.
    pub fn member_known(&self, network_id: u64, member_id: u64) -> bool {
        self.state
            .lock()
            .get(&network_id)
            .is_some_and(|ns| ns.members.contains_key(&member_id))
    }

    /// Reads a member's liveness snapshot, if the member is tracked.
    pub fn member_liveness(&self, network_id: u64, member_id: u64) -> Option<MemberLiveness> {
        self.state
            .lock()
            .get(&network_id)
            .and_then(|ns| ns.members.get(&member_id))
            .map(|ms| MemberLiveness {
                last_online_time: ms.last_online_time,
                last_online_address: ms.last_online_address,
                last_online_dirty: ms.last_online_dirty,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NWID: u64 = 0xaaaa_aaaa_aa_000001;
    const MID: u64 = 0x1122_3344_55;

    #[test]
    fn dirty_marks_are_idempotent() {
        let tracker = StateTracker::new();
        tracker.mark_network_dirty(NWID);
        tracker.mark_network_dirty(NWID);
        assert_eq!(tracker.dirty_networks(), vec![NWID]);

        tracker.mark_member_dirty(NWID, MID);
        tracker.mark_member_dirty(NWID, MID);
        assert_eq!(tracker.dirty_members(), vec![(NWID, MID)]);
    }

    #[test]
    fn clear_only_affects_the_named_object() {
        let tracker = StateTracker::new();
        tracker.mark_network_dirty(NWID);
        tracker.mark_member_dirty(NWID, MID);

        tracker.clear_network_dirty(NWID);
        assert!(!tracker.is_network_dirty(NWID));
        assert!(tracker.is_member_dirty(NWID, MID));

        tracker.clear_member_dirty(NWID, MID);
        assert!(!tracker.is_member_dirty(NWID, MID));

        // Clearing unknown ids is a no-op, not a panic.
        tracker.clear_network_dirty(0xdead);
        tracker.clear_member_dirty(0xdead, 0xbeef);
    }

    #[test]
    fn liveness_for_unknown_member_is_dropped() {
        let tracker = StateTracker::new();
        let addr: SocketAddr = "10.0.0.1:9993".parse().unwrap();

        tracker.record_online(NWID, MID, 1_000, Some(addr));
        assert!(!tracker.network_known(NWID));
        assert!(!tracker.member_known(NWID, MID));
        assert_eq!(tracker.member_liveness(NWID, MID), None);

        // A known network alone is not enough; the member must be tracked.
        tracker.mark_network_dirty(NWID);
        tracker.record_online(NWID, MID, 1_000, Some(addr));
        assert!(!tracker.member_known(NWID, MID));
    }

    #[test]
    fn liveness_for_known_member_is_recorded() {
        let tracker = StateTracker::new();
        let addr: SocketAddr = "10.0.0.1:9993".parse().unwrap();

        tracker.mark_member_dirty(NWID, MID);
        tracker.record_online(NWID, MID, 2_000, Some(addr));

        let liveness = tracker.member_liveness(NWID, MID).unwrap();
        assert_eq!(liveness.last_online_time, 2_000);
        assert_eq!(liveness.last_online_address, Some(addr));
        assert!(liveness.last_online_dirty);

        // An observation without an address keeps the previous address.
        tracker.record_online(NWID, MID, 3_000, None);
        let liveness = tracker.member_liveness(NWID, MID).unwrap();
        assert_eq!(liveness.last_online_time, 3_000);
        assert_eq!(liveness.last_online_address, Some(addr));
    }

    #[test]
    fn remote_observation_creates_entries_lazily() {
        let tracker = StateTracker::new();

        assert!(!tracker.observe_remote_network(NWID));
        assert!(tracker.network_known(NWID));

        // Dirty flag is reported, not modified.
        tracker.mark_network_dirty(NWID);
        assert!(tracker.observe_remote_network(NWID));
        assert!(tracker.is_network_dirty(NWID));
    }

    #[test]
    fn remote_member_requires_known_parent() {
        let tracker = StateTracker::new();
        assert_eq!(tracker.observe_remote_member(NWID, MID), None);

        tracker.mark_network_dirty(NWID);
        assert_eq!(tracker.observe_remote_member(NWID, MID), Some(false));
        assert!(tracker.member_known(NWID, MID));

        tracker.mark_member_dirty(NWID, MID);
        assert_eq!(tracker.observe_remote_member(NWID, MID), Some(true));
    }
}
