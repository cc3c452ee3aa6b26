//! Request configuration.
//!
//! [`RequestConfig`] is the mutable configuration one request carries through
//! the pipeline. Callers usually build a [`RequestOptions`] and let the
//! per-method helpers fix the URL and method.
//!
//! URL resolution runs in a fixed order:
//!
//! 1. [`resolve_url`] joins the base URL and a relative target,
//! 2. [`apply_query`] appends query pairs,
//! 3. [`apply_path`] substitutes `{name}` placeholders in the path.

use std::time::Duration;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use url::Url;

use crate::{
    AbortSignal, Body, CacheMode, CredentialsMode, Headers, Method, RedirectPolicy,
    ReferrerPolicy, RequestMode, ResponseDecoder, Result, TransportOptions,
};

/// Characters a parsed URL path keeps percent-encoded, braces included.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Where a request goes: an absolute URL or a path relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Absolute URL, used as-is.
    Url(Url),
    /// Path joined onto the client's base URL.
    Path(String),
}

impl Target {
    /// The absolute URL, once resolved.
    #[must_use]
    pub const fn as_url(&self) -> Option<&Url> {
        match self {
            Self::Url(url) => Some(url),
            Self::Path(_) => None,
        }
    }
}

impl From<Url> for Target {
    fn from(value: Url) -> Self {
        Self::Url(value)
    }
}

impl From<&Url> for Target {
    fn from(value: &Url) -> Self {
        Self::Url(value.clone())
    }
}

impl From<String> for Target {
    fn from(value: String) -> Self {
        Self::Path(value)
    }
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        Self::Path(value.to_string())
    }
}

/// Configuration of a single request.
///
/// Owned by one in-flight request. Request interceptors receive it by value
/// and return the (possibly modified) configuration.
#[derive(Debug)]
pub struct RequestConfig {
    /// Target URL. Resolved to [`Target::Url`] before interceptors run.
    pub url: Target,
    /// HTTP method.
    pub method: Method,
    /// `{name}` placeholder values.
    pub path: Vec<(String, String)>,
    /// Query pairs; `None` values are skipped.
    pub query: Vec<(String, Option<String>)>,
    /// Caller headers, merged with the client defaults before interceptors run.
    pub header: Headers,
    /// Request body.
    pub body: Option<Body>,
    /// Timeout; `None` or zero falls back to the client default.
    pub timeout: Option<Duration>,
    /// Options forwarded to the transport.
    pub transport: TransportOptions,
    /// Replaces content-type based response decoding.
    pub decoder: Option<ResponseDecoder>,
}

impl RequestConfig {
    /// A bare configuration for `method` on `url`.
    #[must_use]
    pub fn new(method: Method, url: impl Into<Target>) -> Self {
        RequestOptions::new().into_config(method, url)
    }

    /// Mutable access to the URL, once resolved.
    pub const fn url_mut(&mut self) -> Option<&mut Url> {
        match &mut self.url {
            Target::Url(url) => Some(url),
            Target::Path(_) => None,
        }
    }

    /// Resolve the target against `base_url`, then apply query and path
    /// parameters. Both parameter lists are drained; the result is stored
    /// back as [`Target::Url`].
    ///
    /// # Errors
    ///
    /// Returns an invalid request error if the URL cannot be parsed.
    pub fn resolve_url(&mut self, base_url: &str) -> Result<Url> {
        let mut url = resolve_url(base_url, &self.url)?;
        apply_query(&mut url, &std::mem::take(&mut self.query));
        apply_path(&mut url, &std::mem::take(&mut self.path));
        self.url = Target::Url(url.clone());
        Ok(url)
    }
}

/// Join `base_url` and `target`.
///
/// Absolute targets are used unchanged. Otherwise trailing slashes of the
/// base and leading slashes of the path are dropped and the two are joined
/// with a single `/`. An empty base parses the path on its own.
///
/// # Errors
///
/// Returns an invalid request error if the joined string is not a URL.
///
/// ```
/// use fata_core::{Target, resolve_url};
///
/// let url = resolve_url("https://api.test/v1/", &Target::from("//users")).unwrap();
/// assert_eq!(url.as_str(), "https://api.test/v1/users");
/// ```
pub fn resolve_url(base_url: &str, target: &Target) -> Result<Url> {
    match target {
        Target::Url(url) => Ok(url.clone()),
        Target::Path(path) if base_url.is_empty() => Ok(Url::parse(path)?),
        Target::Path(path) => {
            let joined = format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            );
            Ok(Url::parse(&joined)?)
        }
    }
}

/// Append every query pair with a value; duplicates are kept.
pub fn apply_query(url: &mut Url, query: &[(String, Option<String>)]) {
    let mut pairs = query
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|value| (name, value)))
        .peekable();
    if pairs.peek().is_none() {
        return;
    }

    let mut serializer = url.query_pairs_mut();
    for (name, value) in pairs {
        serializer.append_pair(name, value);
    }
}

/// Replace every `{name}` token in the URL path with its value.
///
/// Only exact tokens are replaced; unknown placeholders stay in the path.
pub fn apply_path(url: &mut Url, path: &[(String, String)]) {
    if path.is_empty() {
        return;
    }

    let mut resolved = url.path().to_string();
    for (name, value) in path {
        let token = format!("%7B{}%7D", utf8_percent_encode(name, PATH_SEGMENT));
        resolved = resolved.replace(&token, value);
    }
    url.set_path(&resolved);
}

/// Per-request options, everything but the URL and method.
///
/// ```
/// use fata_core::{Method, RequestOptions};
///
/// let config = RequestOptions::new()
///     .path("id", 7)
///     .query("active", true)
///     .header("X-Trace", "abc")
///     .into_config(Method::Get, "/users/{id}");
///
/// assert_eq!(config.path, [("id".to_string(), "7".to_string())]);
/// ```
#[derive(Debug, Default)]
pub struct RequestOptions {
    path: Vec<(String, String)>,
    query: Vec<(String, Option<String>)>,
    header: Headers,
    body: Option<Body>,
    timeout: Option<Duration>,
    transport: TransportOptions,
    decoder: Option<ResponseDecoder>,
}

impl RequestOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a `{name}` placeholder value.
    #[must_use]
    pub fn path(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.path.push((name.into(), value.to_string()));
        self
    }

    /// Append a query pair.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), Some(value.to_string())));
        self
    }

    /// Append a query pair that is skipped when `value` is `None`.
    #[must_use]
    pub fn query_opt<V: ToString>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.query
            .push((name.into(), value.map(|value| value.to_string())));
        self
    }

    /// Append query pairs from a serializable struct.
    ///
    /// # Errors
    ///
    /// Returns an invalid request error if the value cannot be serialized.
    pub fn query_struct<T: serde::Serialize>(mut self, value: &T) -> Result<Self> {
        self.query.extend(
            crate::to_query_pairs(value)?
                .into_iter()
                .map(|(name, value)| (name, Some(value))),
        );
        Ok(self)
    }

    /// Set a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.header.set(name, value);
        self
    }

    /// Suppress a header, defaults included.
    #[must_use]
    pub fn unset_header(mut self, name: impl Into<String>) -> Self {
        self.header.unset(name);
        self
    }

    /// Overlay a whole header table.
    #[must_use]
    pub fn headers(mut self, headers: &Headers) -> Self {
        self.header.overlay(headers);
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a structured body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an invalid request error if serialization fails.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Result<Self> {
        self.body = Some(Body::json(value)?);
        Ok(self)
    }

    /// Set the timeout. Zero means the client default.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace content-type based response decoding.
    #[must_use]
    pub fn decoder(mut self, decoder: ResponseDecoder) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Replace all transport options.
    #[must_use]
    pub fn transport(mut self, transport: TransportOptions) -> Self {
        self.transport = transport;
        self
    }

    /// Cache mode.
    #[must_use]
    pub const fn cache(mut self, cache: CacheMode) -> Self {
        self.transport.cache = Some(cache);
        self
    }

    /// Credentials mode.
    #[must_use]
    pub const fn credentials(mut self, credentials: CredentialsMode) -> Self {
        self.transport.credentials = Some(credentials);
        self
    }

    /// Subresource integrity metadata.
    #[must_use]
    pub fn integrity(mut self, integrity: impl Into<String>) -> Self {
        self.transport.integrity = Some(integrity.into());
        self
    }

    /// Keepalive flag.
    #[must_use]
    pub const fn keepalive(mut self, keepalive: bool) -> Self {
        self.transport.keepalive = Some(keepalive);
        self
    }

    /// Request mode.
    #[must_use]
    pub const fn mode(mut self, mode: RequestMode) -> Self {
        self.transport.mode = Some(mode);
        self
    }

    /// Redirect policy.
    #[must_use]
    pub const fn redirect(mut self, redirect: RedirectPolicy) -> Self {
        self.transport.redirect = Some(redirect);
        self
    }

    /// Referrer.
    #[must_use]
    pub fn referrer(mut self, referrer: impl Into<String>) -> Self {
        self.transport.referrer = Some(referrer.into());
        self
    }

    /// Referrer policy.
    #[must_use]
    pub const fn referrer_policy(mut self, policy: ReferrerPolicy) -> Self {
        self.transport.referrer_policy = Some(policy);
        self
    }

    /// Cancellation signal.
    #[must_use]
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.transport.signal = Some(signal);
        self
    }

    /// Fix the method and URL.
    #[must_use]
    pub fn into_config(self, method: Method, url: impl Into<Target>) -> RequestConfig {
        RequestConfig {
            url: url.into(),
            method,
            path: self.path,
            query: self.query,
            header: self.header,
            body: self.body,
            timeout: self.timeout,
            transport: self.transport,
            decoder: self.decoder,
        }
    }
}
