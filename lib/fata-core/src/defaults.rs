//! Client-wide request defaults.

use std::collections::HashMap;
use std::time::Duration;

use crate::{Headers, Method};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default `Accept` header sent with every request.
pub const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";

/// Default headers: a `common` table plus one table per [`Method`].
///
/// When a request is prepared the tables are merged with the caller's own
/// headers, highest precedence first: caller, method table, common table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDefaults {
    /// Headers sent with every method.
    pub common: Headers,
    methods: HashMap<Method, Headers>,
}

impl Default for HeaderDefaults {
    fn default() -> Self {
        let mut common = Headers::new();
        common.set("Accept", DEFAULT_ACCEPT);
        Self {
            common,
            methods: Method::ALL.into_iter().map(|m| (m, Headers::new())).collect(),
        }
    }
}

impl HeaderDefaults {
    /// Headers for one method.
    #[must_use]
    pub fn method(&self, method: Method) -> Option<&Headers> {
        self.methods.get(&method)
    }

    /// Mutable headers for one method.
    pub fn method_mut(&mut self, method: Method) -> &mut Headers {
        self.methods.entry(method).or_default()
    }

    /// Merge the defaults for `method` under the caller's headers.
    #[must_use]
    pub fn resolve(&self, method: Method, caller: &Headers) -> Headers {
        Headers::merged(&self.common, self.method(method), caller)
    }
}

/// Process-lifetime defaults held by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    /// Timeout used when a request does not set one. Zero disables it.
    pub timeout: Duration,
    /// Default header tables.
    pub headers: HeaderDefaults,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            headers: HeaderDefaults::default(),
        }
    }
}

impl Defaults {
    /// Timeout for a request: its own value when non-zero, else the default.
    #[must_use]
    pub fn effective_timeout(&self, requested: Option<Duration>) -> Duration {
        requested
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or(self.timeout)
    }
}
