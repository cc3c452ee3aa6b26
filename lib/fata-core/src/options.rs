//! Transport passthrough options.
//!
//! These options are not interpreted by the request pipeline. They travel
//! with the [`Request`](crate::Request) to the transport, which decides what
//! it can honour.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use derive_more::Display;
use tokio::sync::Notify;

/// Cache mode of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CacheMode {
    /// Use the transport's default caching.
    #[display("default")]
    Default,
    /// Bypass any cache and do not store the response.
    #[display("no-store")]
    NoStore,
    /// Bypass any cache, store the response.
    #[display("reload")]
    Reload,
    /// Revalidate with the server before using a cached response.
    #[display("no-cache")]
    NoCache,
    /// Use a cached response regardless of staleness.
    #[display("force-cache")]
    ForceCache,
    /// Only answer from cache.
    #[display("only-if-cached")]
    OnlyIfCached,
}

/// Whether credentials are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CredentialsMode {
    /// Never send credentials.
    #[display("omit")]
    Omit,
    /// Send credentials to the same origin only.
    #[display("same-origin")]
    SameOrigin,
    /// Always send credentials.
    #[display("include")]
    Include,
}

/// Request mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RequestMode {
    /// Cross-origin requests allowed.
    #[display("cors")]
    Cors,
    /// Opaque cross-origin requests.
    #[display("no-cors")]
    NoCors,
    /// Same-origin requests only.
    #[display("same-origin")]
    SameOrigin,
    /// Navigation request.
    #[display("navigate")]
    Navigate,
}

/// What a transport should do with a 3xx response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RedirectPolicy {
    /// Follow redirects, if the transport supports it.
    #[display("follow")]
    Follow,
    /// Treat a redirect as a transport failure.
    #[display("error")]
    Error,
    /// Hand the redirect response back untouched.
    #[display("manual")]
    Manual,
}

/// Referrer policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ReferrerPolicy {
    /// `no-referrer`
    #[display("no-referrer")]
    NoReferrer,
    /// `no-referrer-when-downgrade`
    #[display("no-referrer-when-downgrade")]
    NoReferrerWhenDowngrade,
    /// `origin`
    #[display("origin")]
    Origin,
    /// `origin-when-cross-origin`
    #[display("origin-when-cross-origin")]
    OriginWhenCrossOrigin,
    /// `same-origin`
    #[display("same-origin")]
    SameOrigin,
    /// `strict-origin`
    #[display("strict-origin")]
    StrictOrigin,
    /// `strict-origin-when-cross-origin`
    #[display("strict-origin-when-cross-origin")]
    StrictOriginWhenCrossOrigin,
    /// `unsafe-url`
    #[display("unsafe-url")]
    UnsafeUrl,
}

#[derive(Debug, Default)]
struct AbortState {
    aborted: AtomicBool,
    notify: Notify,
}

/// Cancellation signal observed by transports.
///
/// Cloning shares the signal. Obtain one from an [`AbortController`].
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    state: Arc<AbortState>,
}

impl AbortSignal {
    /// Returns `true` once the owning controller aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.state.aborted.load(Ordering::Acquire)
    }

    /// Completes when the signal is aborted.
    pub async fn aborted(&self) {
        loop {
            let notified = self.state.notify.notified();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}

/// Owner side of an [`AbortSignal`].
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    /// Creates a controller with a fresh signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The signal to pass to requests.
    #[must_use]
    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Abort every request observing this controller's signal.
    pub fn abort(&self) {
        self.signal.state.aborted.store(true, Ordering::Release);
        self.signal.state.notify.notify_waiters();
    }
}

/// Options forwarded verbatim to the transport.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Cache mode.
    pub cache: Option<CacheMode>,
    /// Credentials mode.
    pub credentials: Option<CredentialsMode>,
    /// Subresource integrity metadata.
    pub integrity: Option<String>,
    /// Keep the request alive beyond its initiator.
    pub keepalive: Option<bool>,
    /// Request mode.
    pub mode: Option<RequestMode>,
    /// Redirect policy.
    pub redirect: Option<RedirectPolicy>,
    /// Referrer URL.
    pub referrer: Option<String>,
    /// Referrer policy.
    pub referrer_policy: Option<ReferrerPolicy>,
    /// Cancellation signal.
    pub signal: Option<AbortSignal>,
}
