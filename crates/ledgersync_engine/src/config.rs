//! Configuration for the sync engine.

use ledgersync_protocol::ControllerId;
use std::time::Duration;

/// Constructor-level configuration for a [`crate::SyncEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// This controller's address; scopes selector names, the masking key,
    /// and the identifier-space ownership filter.
    pub controller: ControllerId,
    /// Remote ledger host.
    pub host: String,
    /// Remote ledger port.
    pub port: u16,
    /// Private credential proving write authority over this controller's
    /// records.
    pub owner_private: String,
    /// Public credential used to scope queries.
    pub owner_public: String,
    /// Reserved: when set, member liveness observations are flagged for
    /// remote persistence. Liveness is currently tracked in memory only and
    /// never pushed, so the flag has no remote effect yet.
    pub store_online_state: bool,
    /// Pause between sync cycles.
    pub cycle_interval: Duration,
    /// How far behind "now" each cycle's query window starts, re-reading
    /// recent history to tolerate clock skew and in-flight remote writes.
    pub query_overlap: Duration,
    /// Connect/response timeout for ledger calls; generous on purpose, a
    /// slow cycle stalls only the sync loop itself.
    pub request_timeout: Duration,
}

impl EngineConfig {
    /// Creates a configuration with the default local ledger endpoint and
    /// cadence.
    pub fn new(
        controller: ControllerId,
        owner_private: impl Into<String>,
        owner_public: impl Into<String>,
    ) -> Self {
        Self {
            controller,
            host: "127.0.0.1".into(),
            port: 9980,
            owner_private: owner_private.into(),
            owner_public: owner_public.into(),
            store_online_state: false,
            cycle_interval: Duration::from_secs(2),
            query_overlap: Duration::from_secs(120),
            request_timeout: Duration::from_secs(600),
        }
    }

    /// Sets the ledger host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the ledger port. A zero port falls back to the default.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = if port == 0 { 9980 } else { port };
        self
    }

    /// Enables or disables the reserved liveness-persistence flag.
    pub fn with_store_online_state(mut self, store: bool) -> Self {
        self.store_online_state = store;
        self
    }

    /// Sets the pause between sync cycles.
    pub fn with_cycle_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = interval;
        self
    }

    /// Sets the query-overlap window.
    pub fn with_query_overlap(mut self, overlap: Duration) -> Self {
        self.query_overlap = overlap;
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Base URL of the ledger's HTTP endpoint.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::new(ControllerId::new(1), "priv", "pub");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9980);
        assert!(!config.store_online_state);
        assert_eq!(config.cycle_interval, Duration::from_secs(2));
        assert_eq!(config.query_overlap, Duration::from_secs(120));
        assert_eq!(config.request_timeout, Duration::from_secs(600));
        assert_eq!(config.base_url(), "http://127.0.0.1:9980");
    }

    #[test]
    fn builder() {
        let config = EngineConfig::new(ControllerId::new(1), "priv", "pub")
            .with_host("ledger.internal")
            .with_port(8443)
            .with_store_online_state(true)
            .with_cycle_interval(Duration::from_millis(500))
            .with_query_overlap(Duration::from_secs(60))
            .with_request_timeout(Duration::from_secs(30));

        assert_eq!(config.base_url(), "http://ledger.internal:8443");
        assert!(config.store_online_state);
        assert_eq!(config.cycle_interval, Duration::from_millis(500));
        assert_eq!(config.query_overlap, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn zero_port_falls_back_to_default() {
        let config = EngineConfig::new(ControllerId::new(1), "priv", "pub").with_port(0);
        assert_eq!(config.port, 9980);
    }
}
