//! # LedgerSync Engine
//!
//! Bidirectional sync engine between a controller's in-process configuration
//! store and a remote append-only record ledger reachable over HTTP.
//!
//! This crate provides:
//! - Local state tracker (per-network and per-member dirty/liveness state)
//! - Conflict-on-write detection and revision management
//! - Remote store client for the ledger's `/make` and `/query` verbs
//! - A background sync loop with readiness and shutdown signaling
//!
//! ## Architecture
//!
//! The engine implements a **push-then-pull** cycle:
//! 1. Push every dirty local object to the ledger
//! 2. Query the ledger for networks and members changed since a moving
//!    time watermark
//! 3. Apply pulled records that do not collide with locally dirty objects
//! 4. Advance the watermark with a deliberate overlap window
//!
//! ## Key Invariants
//!
//! - A dirty flag is cleared only after a confirmed successful push
//! - A locally dirty object is never overwritten by a pull in the same cycle
//! - Pulled records whose identifiers belong to another controller are ignored
//! - Remote failures never propagate to the write path; the only visible
//!   degradation is staleness

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod engine;
mod error;
mod store;
mod tracker;

pub use client::{HttpRemoteStore, MockRemoteStore, RemoteStore};
pub use config::EngineConfig;
pub use engine::{spawn, SyncEngine, SyncHandle, SyncPhase};
pub use error::{EngineError, EngineResult};
pub use store::{ChangeEvent, ControllerStore, MemoryControllerStore};
pub use tracker::{MemberLiveness, StateTracker};
