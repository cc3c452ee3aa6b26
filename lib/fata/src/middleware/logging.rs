//! Transport logging.
//!
//! One event when the request leaves, one when the transport settles, both
//! inside a `fata_transport` span. At [`LogLevel::Debug`] the outgoing headers
//! are included, with credentials redacted.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use http::HeaderMap;
use http::header::{AUTHORIZATION, COOKIE, HeaderName, PROXY_AUTHORIZATION, SET_COOKIE};
use tower::{Layer, Service};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{Error, Request, Response, Result, ServiceFuture};

const REDACTED: &str = "<redacted>";

/// How much a [`Logging`] service reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Method, URL, status and timing.
    #[default]
    Info,
    /// Also headers, body size and transport options.
    Debug,
}

/// Layer producing [`Logging`] services.
#[derive(Debug, Clone)]
pub struct LoggingLayer {
    level: LogLevel,
    redacted: Arc<[HeaderName]>,
}

impl Default for LoggingLayer {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            redacted: Arc::from([AUTHORIZATION, PROXY_AUTHORIZATION, COOKIE, SET_COOKIE]),
        }
    }
}

impl LoggingLayer {
    /// Info-level logging.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Debug-level logging, headers included.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
            ..Self::default()
        }
    }

    /// Also hide the value of `name` in debug output.
    #[must_use]
    pub fn redact(mut self, name: HeaderName) -> Self {
        let mut names = self.redacted.to_vec();
        if !names.contains(&name) {
            names.push(name);
        }
        self.redacted = Arc::from(names);
        self
    }

    /// Configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            reporter: Reporter {
                level: self.level,
                redacted: Arc::clone(&self.redacted),
            },
        }
    }
}

/// Service logging every transport call of its inner service.
#[derive(Debug, Clone)]
pub struct Logging<S> {
    inner: S,
    reporter: Reporter,
}

impl<S> Logging<S> {
    /// Wrap `inner` with the default info-level layer.
    pub fn new(inner: S) -> Self {
        LoggingLayer::new().layer(inner)
    }
}

#[derive(Debug, Clone)]
struct Reporter {
    level: LogLevel,
    redacted: Arc<[HeaderName]>,
}

impl Reporter {
    fn sanitized(&self, headers: &HeaderMap) -> Vec<(String, String)> {
        headers
            .iter()
            .map(|(name, value)| {
                let value = if self.redacted.contains(name) {
                    REDACTED.to_string()
                } else {
                    String::from_utf8_lossy(value.as_bytes()).into_owned()
                };
                (name.as_str().to_string(), value)
            })
            .collect()
    }

    fn log_outgoing(&self, request: &Request) {
        match self.level {
            LogLevel::Info => info!("sending request"),
            LogLevel::Debug => {
                let options = request.options();
                debug!(
                    headers = ?self.sanitized(request.headers()),
                    body_len = request.body().map_or(0, bytes::Bytes::len),
                    redirect = ?options.redirect,
                    cache = ?options.cache,
                    abortable = options.signal.is_some(),
                    "sending request"
                );
            }
        }
    }

    fn log_outcome(&self, result: &Result<Response>, started: Instant) {
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match result {
            Ok(response) if response.is_success() => {
                info!(status = response.status(), elapsed_ms, "transport settled");
                if self.level == LogLevel::Debug {
                    debug!(
                        content_type = response.header("content-type"),
                        body_len = response.peek_body().len(),
                        "response received"
                    );
                }
            }
            Ok(response) => warn!(
                status = response.status(),
                status_text = response.status_text(),
                elapsed_ms,
                "transport answered with a non-2xx status"
            ),
            Err(err) => warn!(error = %err, kind = %err.kind(), elapsed_ms, "transport failed"),
        }
    }
}

impl<S> Service<Request> for Logging<S>
where
    S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let span = info_span!(
            "fata_transport",
            method = %request.method(),
            url = %request.url(),
        );
        // the readied service answers this call; the clone is for the next one
        let inner = self.inner.clone();
        let mut ready = std::mem::replace(&mut self.inner, inner);
        let reporter = self.reporter.clone();

        Box::pin(
            async move {
                reporter.log_outgoing(&request);
                let started = Instant::now();
                let result = ready.call(request).await;
                reporter.log_outcome(&result, started);
                result
            }
            .instrument(span),
        )
    }
}
