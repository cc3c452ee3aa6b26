//! The request pipeline.
//!
//! [`Fata::request`] runs one request through a fixed sequence:
//!
//! 1. resolve the URL against the base URL, then query and path parameters,
//! 2. merge default headers under the caller's (caller > method > common),
//! 3. run the request interceptors,
//! 4. build the header set and negotiate the body and `Content-Type`,
//! 5. dispatch through the transport, raced against the timeout,
//! 6. reject non-2xx responses, otherwise decode the body and run the
//!    success interceptors,
//! 7. on any failure of step 5 or 6, run the error interceptors, which may
//!    recover with a value.
//!
//! Failures before dispatch (bad URL, request interceptor, header, body)
//! reject immediately without reaching the error interceptors.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use fata_core::{
    ContentTypeAction, Defaults, Headers, HttpClient, Method, Payload, RequestConfig,
    RequestOptions, ResponseHead, Target, decode, negotiate,
};
use http::header::CONTENT_TYPE;
use tracing::{Instrument, debug, field, info, info_span, warn};

use crate::{Error, HyperClient, Interceptors, Request, Response, Result, timeout_it};

struct Inner<C> {
    client: C,
    base_url: RwLock<Arc<str>>,
    defaults: RwLock<Arc<Defaults>>,
    interceptors: Interceptors,
}

/// HTTP client with a base URL, default headers, a default timeout and
/// interceptor chains.
///
/// Cloning is cheap and shares everything: defaults, base URL, interceptors
/// and transport.
///
/// ```ignore
/// use fata::{Fata, RequestOptions};
///
/// let api = Fata::new("https://api.example.com/");
/// let user = api
///     .get("/users/{id}", RequestOptions::new().path("id", 7))
///     .await?;
/// ```
pub struct Fata<C = HyperClient> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for Fata<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> std::fmt::Debug for Fata<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fata")
            .field("base_url", &self.base_url())
            .field("defaults", &self.defaults())
            .field("interceptors", &self.inner.interceptors)
            .finish_non_exhaustive()
    }
}

impl Fata<HyperClient> {
    /// Client on `base_url` with the default [`HyperClient`] transport.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::builder().base_url(base_url).build()
    }

    /// Builder with the default [`HyperClient`] transport.
    #[must_use]
    pub fn builder() -> FataBuilder<HyperClient> {
        FataBuilder::new(HyperClient::new())
    }
}

impl<C> Fata<C> {
    /// Interceptor chains.
    #[must_use]
    pub fn interceptors(&self) -> &Interceptors {
        &self.inner.interceptors
    }

    /// The transport.
    #[must_use]
    pub fn client(&self) -> &C {
        &self.inner.client
    }

    /// Snapshot of the current defaults.
    #[must_use]
    pub fn defaults(&self) -> Arc<Defaults> {
        Arc::clone(
            &self
                .inner
                .defaults
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Modify the defaults. Requests already running keep their snapshot.
    pub fn update_defaults(&self, update: impl FnOnce(&mut Defaults)) {
        let mut defaults = self
            .inner
            .defaults
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        update(Arc::make_mut(&mut *defaults));
    }

    /// Current base URL, empty when unset.
    #[must_use]
    pub fn base_url(&self) -> Arc<str> {
        Arc::clone(
            &self
                .inner
                .base_url
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Replace the base URL.
    pub fn set_base_url(&self, base_url: impl Into<String>) {
        let base_url: String = base_url.into();
        *self
            .inner
            .base_url
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::from(base_url);
    }
}

impl<C: HttpClient> Fata<C> {
    /// Run `config` through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the normalized error when the request fails and no error
    /// interceptor recovered it.
    pub async fn request(&self, config: RequestConfig) -> Result<Payload> {
        let span = info_span!("fata_request", method = %config.method, url = field::Empty);
        self.run(config).instrument(span).await
    }

    async fn run(&self, mut config: RequestConfig) -> Result<Payload> {
        let started = Instant::now();
        let defaults = self.defaults();
        let base_url = self.base_url();

        let url = config.resolve_url(&base_url).inspect_err(|err| {
            warn!(error = %err, "invalid request URL");
        })?;
        tracing::Span::current().record("url", url.as_str());
        debug!(%url, "resolved request URL");

        config.header = defaults.headers.resolve(config.method, &config.header);

        let interceptors = &self.inner.interceptors;
        if !interceptors.request.is_empty() {
            debug!(count = interceptors.request.len(), "running request interceptors");
        }
        let mut config = interceptors.request.exec(config).await.inspect_err(|err| {
            warn!(error = %err, "request interceptor failed");
        })?;

        let (request, timeout) = Self::prepare(&base_url, &defaults, &mut config).await?;
        let config = Arc::new(config);

        let outcome = self.dispatch(request, timeout, &config).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match outcome {
            Ok(data) => {
                info!(elapsed_ms, "request completed");
                Ok(data)
            }
            Err(err) => {
                warn!(
                    error = %err,
                    kind = %err.kind(),
                    status = err.status(),
                    elapsed_ms,
                    "request failed"
                );
                let recovered = interceptors.response.run_error(&config, err).await;
                if recovered.is_ok() {
                    info!("request recovered by error interceptor");
                }
                recovered
            }
        }
    }

    /// Build the wire request: final URL, header set, negotiated body.
    async fn prepare(
        base_url: &str,
        defaults: &Defaults,
        config: &mut RequestConfig,
    ) -> Result<(Request, Duration)> {
        // interceptors may have retargeted or added parameters
        let url = config.resolve_url(base_url)?;
        let timeout = defaults.effective_timeout(config.timeout);

        let negotiated = negotiate(config.method, config.body.take()).await?;
        apply_content_type(&mut config.header, negotiated.content_type);
        let headers = config.header.to_header_map()?;

        let request = Request::builder(config.method, url)
            .headers(headers)
            .maybe_body(negotiated.body)
            .options(config.transport.clone())
            .build();
        Ok((request, timeout))
    }

    async fn dispatch(
        &self,
        request: Request,
        timeout: Duration,
        config: &Arc<RequestConfig>,
    ) -> Result<Payload> {
        debug!(
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "dispatching request"
        );
        let response = timeout_it(timeout, self.inner.client.execute(request)).await?;
        if !response.is_success() {
            return Err(Error::from_response(response));
        }

        let (data, head) = Self::read_body(config, response).await?;
        self.inner
            .interceptors
            .response
            .run_success(config, &Arc::new(head), data)
            .await
    }

    async fn read_body(
        config: &RequestConfig,
        response: Response,
    ) -> Result<(Payload, ResponseHead)> {
        match &config.decoder {
            Some(decoder) => {
                let head = response.head().clone();
                let data = decoder.decode(response).await?;
                Ok((data, head))
            }
            None => decode(response),
        }
    }

    /// `GET` request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn get(&self, url: impl Into<Target>, options: RequestOptions) -> Result<Payload> {
        self.request(options.into_config(Method::Get, url)).await
    }

    /// `POST` request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn post(&self, url: impl Into<Target>, options: RequestOptions) -> Result<Payload> {
        self.request(options.into_config(Method::Post, url)).await
    }

    /// `PUT` request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn put(&self, url: impl Into<Target>, options: RequestOptions) -> Result<Payload> {
        self.request(options.into_config(Method::Put, url)).await
    }

    /// `DELETE` request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn delete(
        &self,
        url: impl Into<Target>,
        options: RequestOptions,
    ) -> Result<Payload> {
        self.request(options.into_config(Method::Delete, url)).await
    }

    /// `HEAD` request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn head(&self, url: impl Into<Target>, options: RequestOptions) -> Result<Payload> {
        self.request(options.into_config(Method::Head, url)).await
    }

    /// `OPTIONS` request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn options(
        &self,
        url: impl Into<Target>,
        options: RequestOptions,
    ) -> Result<Payload> {
        self.request(options.into_config(Method::Options, url)).await
    }

    /// `TRACE` request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn trace(&self, url: impl Into<Target>, options: RequestOptions) -> Result<Payload> {
        self.request(options.into_config(Method::Trace, url)).await
    }

    /// `PATCH` request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn patch(&self, url: impl Into<Target>, options: RequestOptions) -> Result<Payload> {
        self.request(options.into_config(Method::Patch, url)).await
    }
}

fn apply_content_type(headers: &mut Headers, action: ContentTypeAction) {
    let name = CONTENT_TYPE.as_str();
    match action {
        ContentTypeAction::Remove => {
            headers.remove(name);
        }
        ContentTypeAction::Set(value) => headers.set(name, value),
        ContentTypeAction::Keep(Some(fallback)) if !headers.contains(name) => {
            headers.set(name, fallback);
        }
        ContentTypeAction::Keep(_) => {}
    }
}

/// Builder for [`Fata`].
#[derive(Debug)]
pub struct FataBuilder<C = HyperClient> {
    client: C,
    base_url: String,
    defaults: Defaults,
}

impl<C> FataBuilder<C> {
    /// Builder on `client`, with default settings.
    #[must_use]
    pub fn new(client: C) -> Self {
        Self {
            client,
            base_url: String::new(),
            defaults: Defaults::default(),
        }
    }

    /// Swap the transport.
    #[must_use]
    pub fn client<D>(self, client: D) -> FataBuilder<D> {
        FataBuilder {
            client,
            base_url: self.base_url,
            defaults: self.defaults,
        }
    }

    /// Base URL relative targets are joined onto.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Default timeout. Zero disables it.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.defaults.timeout = timeout;
        self
    }

    /// Header sent with every request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.defaults.headers.common.set(name, value);
        self
    }

    /// Header sent with every request of `method`.
    #[must_use]
    pub fn method_header(
        mut self,
        method: Method,
        name: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        self.defaults.headers.method_mut(method).set(name, value);
        self
    }

    /// Replace all defaults.
    #[must_use]
    pub fn defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Build the client.
    #[must_use]
    pub fn build(self) -> Fata<C> {
        Fata {
            inner: Arc::new(Inner {
                client: self.client,
                base_url: RwLock::new(Arc::from(self.base_url)),
                defaults: RwLock::new(Arc::new(self.defaults)),
                interceptors: Interceptors::default(),
            }),
        }
    }
}
