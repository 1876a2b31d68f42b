//! Remote store client: the ledger's `/make` and `/query` verbs over HTTP.
//!
//! The concrete HTTP client sits behind the [`RemoteStore`] trait so the
//! engine can run against a mock in tests or a different transport entirely.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use ledgersync_protocol::{MakeRequest, QueryRequest, QueryResults};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU16, Ordering};

/// Transport seam to the remote record ledger.
pub trait RemoteStore: Send + Sync {
    /// Creates or updates one record. Any non-success status is an error;
    /// the caller leaves the object dirty and retries next cycle.
    fn make_record(&self, request: &MakeRequest) -> EngineResult<()>;

    /// Runs a time-windowed range query.
    fn query(&self, request: &QueryRequest) -> EngineResult<QueryResults>;
}

/// Blocking HTTP implementation of [`RemoteStore`].
///
/// Stateless beyond connection reuse inside the underlying client.
pub struct HttpRemoteStore {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpRemoteStore {
    /// Builds a client for the ledger endpoint in `config`.
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| EngineError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url(),
        })
    }

    /// Returns the ledger base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post<B: Serialize>(&self, endpoint: &str, body: &B) -> EngineResult<String> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        if status != 200 {
            return Err(EngineError::RemoteStatus { status, body: text });
        }
        Ok(text)
    }
}

impl RemoteStore for HttpRemoteStore {
    fn make_record(&self, request: &MakeRequest) -> EngineResult<()> {
        self.post("/make", request)?;
        Ok(())
    }

    fn query(&self, request: &QueryRequest) -> EngineResult<QueryResults> {
        let body = self.post("/query", request)?;
        Ok(QueryResults::parse(&body)?)
    }
}

/// A scripted remote store for testing.
///
/// Records every `/make` body, answers network queries (one range) and
/// member queries (two ranges) from separately configured result slots, and
/// can be told to fail `/make` calls with a given status.
#[derive(Debug, Default)]
pub struct MockRemoteStore {
    make_status: AtomicU16,
    query_status: AtomicU16,
    made: Mutex<Vec<MakeRequest>>,
    network_results: Mutex<Option<QueryResults>>,
    member_results: Mutex<Option<QueryResults>>,
    queries: Mutex<Vec<QueryRequest>>,
}

impl MockRemoteStore {
    /// Creates a mock that accepts every `/make` and answers queries with
    /// empty results.
    pub fn new() -> Self {
        Self {
            make_status: AtomicU16::new(200),
            query_status: AtomicU16::new(200),
            ..Self::default()
        }
    }

    /// Sets the HTTP status returned for subsequent `/make` calls.
    pub fn set_make_status(&self, status: u16) {
        self.make_status.store(status, Ordering::SeqCst);
    }

    /// Sets the HTTP status returned for subsequent `/query` calls.
    pub fn set_query_status(&self, status: u16) {
        self.query_status.store(status, Ordering::SeqCst);
    }

    /// Sets the results served to network (single-range) queries.
    pub fn set_network_results(&self, results: QueryResults) {
        *self.network_results.lock() = Some(results);
    }

    /// Sets the results served to member (two-range) queries.
    pub fn set_member_results(&self, results: QueryResults) {
        *self.member_results.lock() = Some(results);
    }

    /// Returns every `/make` body received so far.
    pub fn make_requests(&self) -> Vec<MakeRequest> {
        self.made.lock().clone()
    }

    /// Returns every query received so far.
    pub fn query_requests(&self) -> Vec<QueryRequest> {
        self.queries.lock().clone()
    }
}

impl RemoteStore for MockRemoteStore {
    fn make_record(&self, request: &MakeRequest) -> EngineResult<()> {
        self.made.lock().push(request.clone());
        let status = self.make_status.load(Ordering::SeqCst);
        if status == 200 {
            Ok(())
        } else {
            Err(EngineError::RemoteStatus {
                status,
                body: "mock failure".into(),
            })
        }
    }

    fn query(&self, request: &QueryRequest) -> EngineResult<QueryResults> {
        self.queries.lock().push(request.clone());
        let status = self.query_status.load(Ordering::SeqCst);
        if status != 200 {
            return Err(EngineError::RemoteStatus {
                status,
                body: "mock failure".into(),
            });
        }
        let slot = if request.ranges.len() >= 2 {
            &self.member_results
        } else {
            &self.network_results
        };
        Ok(slot.lock().clone().unwrap_or_default())
    }
}
