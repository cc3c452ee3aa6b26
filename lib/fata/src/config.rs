//! Settings of the [`HyperClient`](crate::HyperClient) transport.
//!
//! Only connection-level concerns live here. The per-request timeout belongs
//! to [`Defaults`](fata_core::Defaults) and is raced by the pipeline, not by
//! the transport.

use std::time::Duration;

/// `User-Agent` sent when the request carries none.
pub const DEFAULT_USER_AGENT: &str = concat!("fata/", env!("CARGO_PKG_VERSION"));

/// Connection and pooling settings for [`HyperClient`](crate::HyperClient).
///
/// ```
/// use std::time::Duration;
/// use fata::TransportConfig;
///
/// let config = TransportConfig::default()
///     .with_connect_timeout(Duration::from_secs(2))
///     .with_https_only(true);
/// assert!(config.https_only);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// TCP connect timeout; `None` leaves it to the OS.
    pub connect_timeout: Option<Duration>,
    /// Idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// How long an idle pooled connection survives; `None` keeps it forever.
    pub pool_idle_timeout: Option<Duration>,
    /// Refuse plain `http://` targets.
    pub https_only: bool,
    /// Set `TCP_NODELAY` on new connections.
    pub tcp_nodelay: bool,
    /// `User-Agent` filled in when absent; `None` sends none.
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            https_only: false,
            tcp_nodelay: true,
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
        }
    }
}

impl TransportConfig {
    /// Set the TCP connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the idle connections kept per host.
    #[must_use]
    pub const fn with_pool_max_idle_per_host(mut self, count: usize) -> Self {
        self.pool_max_idle_per_host = count;
        self
    }

    /// `None` keeps idle connections until the server closes them.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Refuse plain `http://` targets.
    #[must_use]
    pub const fn with_https_only(mut self, https_only: bool) -> Self {
        self.https_only = https_only;
        self
    }

    /// Toggle `TCP_NODELAY`.
    #[must_use]
    pub const fn with_tcp_nodelay(mut self, nodelay: bool) -> Self {
        self.tcp_nodelay = nodelay;
        self
    }

    /// Replace the default `User-Agent`, or drop it with `None`.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: Option<impl Into<String>>) -> Self {
        self.user_agent = user_agent.map(Into::into);
        self
    }
}
