//! The sync loop and conflict-on-write detector.
//!
//! One cycle pushes every dirty local object, queries the ledger for
//! remotely modified networks and members since the watermark, applies pulls
//! that do not collide with locally dirty objects, and advances the
//! watermark. A dedicated background thread runs cycles until shutdown.

use crate::client::RemoteStore;
use crate::config::EngineConfig;
use crate::store::ControllerStore;
use crate::tracker::StateTracker;
use ledgersync_protocol::{
    network_id_of, record_id, record_kind, revision_of, MakeRequest, Namespace, QueryRequest,
    RecordKind,
};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Granularity of shutdown-checked sleeps.
const SLEEP_SLICE_MS: u64 = 100;

/// The sync loop's current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Waiting between cycles.
    Sleeping,
    /// Pushing dirty local objects to the ledger.
    Pushing,
    /// Querying the ledger for remotely modified networks.
    QueryingNetworks,
    /// Querying the ledger for remotely modified members.
    QueryingMembers,
    /// Moving the time watermark forward.
    AdvancingWatermark,
    /// Shut down; terminal.
    Stopped,
}

impl SyncPhase {
    /// Returns true if the loop is inside an active cycle.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncPhase::Pushing
                | SyncPhase::QueryingNetworks
                | SyncPhase::QueryingMembers
                | SyncPhase::AdvancingWatermark
        )
    }

    /// Returns true if the loop has exited for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncPhase::Stopped)
    }
}

/// Bidirectional sync engine between a controller store and a remote record
/// ledger.
///
/// Local writes go through [`SyncEngine::save`] on caller threads; one
/// background thread (see [`spawn`]) runs [`SyncEngine::sync_cycle`]
/// repeatedly. Remote failures never reach the write path.
pub struct SyncEngine<R: RemoteStore, S: ControllerStore> {
    config: EngineConfig,
    namespace: Namespace,
    masking_key: String,
    remote: R,
    store: S,
    tracker: StateTracker,
    phase: RwLock<SyncPhase>,
    /// Lower bound of the next pull query's time window, unix seconds.
    watermark: AtomicU64,
    running: Arc<AtomicBool>,
    ready: AtomicBool,
}

impl<R: RemoteStore, S: ControllerStore> SyncEngine<R, S> {
    /// Creates an engine. The sync loop does not run until [`spawn`]ed (or
    /// driven manually through [`SyncEngine::sync_cycle`]).
    pub fn new(config: EngineConfig, remote: R, store: S) -> Self {
        let namespace = Namespace::new(config.controller);
        let masking_key = config.controller.to_hex();
        Self {
            config,
            namespace,
            masking_key,
            remote,
            store,
            tracker: StateTracker::new(),
            phase: RwLock::new(SyncPhase::Sleeping),
            watermark: AtomicU64::new(0),
            running: Arc::new(AtomicBool::new(true)),
            ready: AtomicBool::new(false),
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The controller store the engine reconciles into.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The dirty/liveness state registry.
    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    /// The loop's current phase.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.read()
    }

    /// Lower bound of the next pull query's time window, unix seconds.
    pub fn watermark(&self) -> u64 {
        self.watermark.load(Ordering::SeqCst)
    }

    /// True once the first full sync cycle has completed against a reachable
    /// ledger.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// True until [`SyncEngine::shutdown`] is called.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Blocks until the engine is ready.
    ///
    /// Blocks indefinitely while the ledger is unreachable; impose external
    /// timeouts if needed. Returns false only if the engine is shut down
    /// before ever becoming ready.
    pub fn wait_until_ready(&self) -> bool {
        while !self.is_ready() {
            if !self.is_running() {
                return false;
            }
            thread::sleep(Duration::from_millis(SLEEP_SLICE_MS));
        }
        true
    }

    /// Signals the sync loop to exit at its next shutdown check.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn set_phase(&self, phase: SyncPhase) {
        *self.phase.write() = phase;
    }

    /// Intercepts a local write of a network or member record.
    ///
    /// Assigns the revision (1 on creation, `prior.revision + 1` on a
    /// material change), then re-reads the canonical value: if the freshly
    /// read value already equals `record` the write is a complete no-op;
    /// otherwise the controller is notified with `local_origin = true` and
    /// the object is marked dirty for the next push. The notification runs
    /// outside the tracker lock.
    pub fn save(&self, prior: Option<&Value>, record: &mut Value) {
        if record.is_object() {
            match prior {
                Some(p) => {
                    if p != record {
                        record["revision"] = json!(revision_of(p) + 1);
                    }
                }
                None => {
                    record["revision"] = json!(1);
                }
            }
        }

        match record_kind(record) {
            Some(RecordKind::Network) => {
                let Some(network_id) = record_id(record).filter(|id| *id != 0) else {
                    return;
                };
                let old = self.store.get_network(network_id);
                if old.as_ref() != Some(&*record) {
                    self.store.network_changed(old, record.clone(), true);
                    self.tracker.mark_network_dirty(network_id);
                }
            }
            Some(RecordKind::Member) => {
                let Some(network_id) = network_id_of(record).filter(|id| *id != 0) else {
                    return;
                };
                let Some(member_id) = record_id(record).filter(|id| *id != 0) else {
                    return;
                };
                let old = self.store.get_member(network_id, member_id);
                if old.as_ref() != Some(&*record) {
                    self.store.member_changed(old, record.clone(), true);
                    self.tracker.mark_member_dirty(network_id, member_id);
                }
            }
            None => {}
        }
    }

    /// Records a liveness observation for a member. Lock-bounded and
    /// non-blocking; observations for untracked members are dropped.
    pub fn record_online(
        &self,
        network_id: u64,
        member_id: u64,
        observed_at_ms: i64,
        address: Option<SocketAddr>,
    ) {
        self.tracker
            .record_online(network_id, member_id, observed_at_ms, address);
    }

    /// Erases a network from the ledger. **Unsupported**: logs and changes
    /// nothing; the record stays on the ledger.
    pub fn erase_network(&self, network_id: u64) {
        warn!("erase is not supported; network {network_id:016x} left on the ledger");
    }

    /// Erases a member from the ledger. **Unsupported**: logs and changes
    /// nothing; the record stays on the ledger.
    pub fn erase_member(&self, network_id: u64, member_id: u64) {
        warn!(
            "erase is not supported; member {member_id:010x} of network {network_id:016x} left on the ledger"
        );
    }

    /// Runs one full sync cycle: push, pull networks, pull members, advance
    /// the watermark. Readiness is latched once a cycle completes with both
    /// queries answered.
    pub fn sync_cycle(&self) {
        self.set_phase(SyncPhase::Pushing);
        self.push_dirty();

        self.set_phase(SyncPhase::QueryingNetworks);
        let networks_ok = self.pull_networks();

        self.set_phase(SyncPhase::QueryingMembers);
        let members_ok = self.pull_members();

        self.set_phase(SyncPhase::AdvancingWatermark);
        let since = unix_time_secs().saturating_sub(self.config.query_overlap.as_secs());
        self.watermark.store(since, Ordering::SeqCst);

        if networks_ok && members_ok {
            self.ready.store(true, Ordering::SeqCst);
        }
        self.set_phase(SyncPhase::Sleeping);
    }

    /// Pushes every dirty network, then every dirty member. The tracker
    /// lock is taken once per object; a failed push leaves the object dirty
    /// for the next cycle.
    fn push_dirty(&self) {
        for network_id in self.tracker.dirty_networks() {
            let Some(network) = self.store.get_network(network_id) else {
                continue;
            };
            let request = MakeRequest::network(
                &self.namespace,
                network_id,
                network.to_string(),
                &self.config.owner_private,
                &self.masking_key,
            );
            match self.remote.make_record(&request) {
                Ok(()) => {
                    self.tracker.clear_network_dirty(network_id);
                    debug!("pushed network record {network_id:016x}");
                }
                Err(e) => warn!("network record push failed for {network_id:016x}: {e}"),
            }
        }

        for (network_id, member_id) in self.tracker.dirty_members() {
            if self.store.get_network(network_id).is_none() {
                continue;
            }
            let Some(member) = self.store.get_member(network_id, member_id) else {
                continue;
            };
            let request = MakeRequest::member(
                &self.namespace,
                network_id,
                member_id,
                member.to_string(),
                &self.config.owner_private,
                &self.masking_key,
            );
            match self.remote.make_record(&request) {
                Ok(()) => {
                    self.tracker.clear_member_dirty(network_id, member_id);
                    debug!("pushed member record {member_id:010x} of network {network_id:016x}");
                }
                Err(e) => warn!(
                    "member record push failed for {member_id:010x} of network {network_id:016x}: {e}"
                ),
            }
        }
    }

    /// Queries for remotely modified networks and applies the ones this
    /// controller owns and has no pending local changes for. Returns whether
    /// the query itself succeeded.
    fn pull_networks(&self) -> bool {
        let request = QueryRequest::networks(
            &self.namespace,
            self.watermark(),
            &self.masking_key,
            &self.config.owner_public,
        );
        let results = match self.remote.query(&request) {
            Ok(results) => results,
            Err(e) => {
                warn!("network query failed: {e}");
                return false;
            }
        };

        for matched in results.first_matches() {
            let Some(network) = matched.payload() else {
                continue;
            };
            let Some(network_id) = record_id(&network) else {
                continue;
            };
            if !self.config.controller.owns(network_id) {
                continue;
            }
            if self.tracker.observe_remote_network(network_id) {
                debug!("skipping pulled network {network_id:016x}: local changes pending");
                continue;
            }
            self.store.network_changed(None, network, false);
        }
        true
    }

    /// Queries for remotely modified members and applies the ones with a
    /// locally known, owned parent network and no pending local changes.
    /// Returns whether the query itself succeeded.
    fn pull_members(&self) -> bool {
        let request = QueryRequest::members(
            &self.namespace,
            self.watermark(),
            &self.masking_key,
            &self.config.owner_public,
        );
        let results = match self.remote.query(&request) {
            Ok(results) => results,
            Err(e) => {
                warn!("member query failed: {e}");
                return false;
            }
        };

        for matched in results.first_matches() {
            let Some(member) = matched.payload() else {
                continue;
            };
            let (Some(network_id), Some(member_id)) =
                (network_id_of(&member), record_id(&member))
            else {
                continue;
            };
            if member_id == 0 || !self.config.controller.owns(network_id) {
                continue;
            }
            match self.tracker.observe_remote_member(network_id, member_id) {
                None => {
                    debug!(
                        "skipping pulled member {member_id:010x}: network {network_id:016x} not known locally"
                    );
                }
                Some(true) => {
                    debug!("skipping pulled member {member_id:010x}: local changes pending");
                }
                Some(false) => self.store.member_changed(None, member, false),
            }
        }
        true
    }

    /// The loop body run by the background thread: cycle, then sleep in
    /// shutdown-checked slices.
    fn run(&self) {
        info!("sync loop started");
        while self.is_running() {
            self.sync_cycle();

            let slices = (self.config.cycle_interval.as_millis() as u64 / SLEEP_SLICE_MS).max(1);
            for _ in 0..slices {
                if !self.is_running() {
                    break;
                }
                thread::sleep(Duration::from_millis(SLEEP_SLICE_MS));
            }
        }
        self.set_phase(SyncPhase::Stopped);
        info!("sync loop stopped");
    }
}

/// Starts the dedicated background thread running the sync loop.
///
/// The returned handle signals shutdown and joins the thread when dropped.
pub fn spawn<R, S>(engine: Arc<SyncEngine<R, S>>) -> SyncHandle
where
    R: RemoteStore + 'static,
    S: ControllerStore + 'static,
{
    let running = Arc::clone(&engine.running);
    let thread = thread::spawn(move || engine.run());
    SyncHandle {
        running,
        thread: Some(thread),
    }
}

/// Handle to a running sync loop thread.
pub struct SyncHandle {
    running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SyncHandle {
    /// Signals shutdown and waits for the loop thread to exit.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn unix_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
