//! HTTP transport using hyper-util.
//!
//! [`HyperClient`] is the default [`HttpClient`]: pooled connections, rustls
//! TLS, a fully buffered body, and optional tower layers. Redirects are never
//! followed; 3xx responses are handed back as-is unless the request asked for
//! [`RedirectPolicy::Error`].

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use fata_core::{CacheMode, HttpClient, RedirectPolicy, TransportOptions};
use http::header::{CACHE_CONTROL, REFERER, USER_AGENT};
use http::{HeaderValue, Uri};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tower::Layer;
use tower::util::BoxCloneService;
use tower_service::Service;

use crate::middleware::LoggingLayer;
use crate::{
    Error, Request, Response, Result,
    config::TransportConfig,
    connector::https_connector,
};

/// Type-erased service for middleware composition.
pub type BoxedService = BoxCloneService<Request, Response, Error>;

/// Future type for Tower Service implementation.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

/// Makes a [`BoxedService`] `Sync`, as [`HttpClient`] requires.
#[derive(Clone)]
struct SyncService {
    inner: Arc<Mutex<BoxedService>>,
}

impl SyncService {
    fn new(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    fn call(&self, request: Request) -> ServiceFuture {
        // hold the lock only for the clone
        let mut service = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        Box::pin(async move { service.call(request).await })
    }
}

/// Raw HTTP client using hyper-util.
#[derive(Clone)]
struct RawHyperClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    user_agent: Option<HeaderValue>,
}

impl RawHyperClient {
    fn new(config: &TransportConfig) -> Self {
        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build(https_connector(config));
        // invalid agent strings are skipped
        let user_agent = config
            .user_agent
            .as_deref()
            .and_then(|agent| HeaderValue::from_str(agent).ok());

        Self { inner, user_agent }
    }

    /// Headers derived from transport options, only where the caller set none.
    fn apply_options(headers: &mut http::HeaderMap, options: &TransportOptions) {
        if let Some(referrer) = &options.referrer
            && !headers.contains_key(REFERER)
            && let Ok(value) = HeaderValue::from_str(referrer)
        {
            headers.insert(REFERER, value);
        }

        let cache_control = match options.cache {
            Some(CacheMode::NoStore) => Some("no-store"),
            Some(CacheMode::NoCache | CacheMode::Reload) => Some("no-cache"),
            _ => None,
        };
        if let Some(cache_control) = cache_control
            && !headers.contains_key(CACHE_CONTROL)
        {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static(cache_control));
        }
    }

    fn build_hyper_request(
        &self,
        request: Request,
    ) -> Result<(http::Request<Full<Bytes>>, TransportOptions)> {
        let (method, url, mut headers, body, options) = request.into_parts();
        Self::apply_options(&mut headers, &options);
        if let Some(agent) = &self.user_agent
            && !headers.contains_key(USER_AGENT)
        {
            headers.insert(USER_AGENT, agent.clone());
        }

        let uri: Uri = url
            .as_str()
            .parse()
            .map_err(|err| Error::invalid_request(format!("invalid URI '{url}': {err}")))?;

        let mut http_request = http::Request::builder()
            .method(http::Method::from(method))
            .uri(uri)
            .body(body.map_or_else(Full::default, Full::new))
            .map_err(Error::invalid_request)?;
        *http_request.headers_mut() = headers;

        Ok((http_request, options))
    }

    async fn send(&self, request: Request) -> Result<Response> {
        let url = request.url().clone();
        let (hyper_request, options) = self.build_hyper_request(request)?;

        let response = self
            .inner
            .request(hyper_request)
            .await
            .map_err(Self::map_hyper_error)?;

        let status = response.status();
        if status.is_redirection() && options.redirect == Some(RedirectPolicy::Error) {
            return Err(Error::transport(format!(
                "redirect ({status}) refused by redirect mode 'error'"
            )));
        }
        let headers = response.headers().clone();

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|err| Error::transport(format!("failed to read body: {err}")))?
            .to_bytes();

        Ok(Response::new(status.as_u16(), headers, body).with_url(url))
    }

    async fn execute(&self, request: Request) -> Result<Response> {
        let Some(signal) = request.options().signal.clone() else {
            return self.send(request).await;
        };
        if signal.is_aborted() {
            return Err(Error::transport("request aborted"));
        }

        tokio::select! {
            result = self.send(request) => result,
            () = signal.aborted() => Err(Error::transport("request aborted")),
        }
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        if err.is_connect() {
            return Error::transport(format!("connection failed: {message}"));
        }
        Error::transport(message)
    }
}

impl Service<Request> for RawHyperClient {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let client = self.clone();
        Box::pin(async move { client.execute(request).await })
    }
}

/// HTTP transport using hyper-util with connection pooling, TLS, and
/// middleware support.
///
/// Honours these [`TransportOptions`]:
/// - `signal`: aborting fails the call with a transport error,
/// - `redirect`: [`RedirectPolicy::Error`] turns a 3xx into a transport error,
/// - `referrer`: sets `Referer` when absent,
/// - `cache`: `no-store`, `no-cache` and `reload` set `Cache-Control` when absent.
///
/// The other options have no meaning outside a browser and are ignored.
///
/// ```ignore
/// use fata::HyperClient;
///
/// let client = HyperClient::builder()
///     .connect_timeout(std::time::Duration::from_secs(5))
///     .with_logging()
///     .build();
/// ```
#[derive(Clone)]
pub struct HyperClient {
    service: SyncService,
    config: TransportConfig,
}

impl std::fmt::Debug for HyperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperClient {
    /// Create a new client with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    /// Create a new client with custom configuration (no middleware).
    #[must_use]
    pub fn with_config(config: TransportConfig) -> Self {
        let raw = RawHyperClient::new(&config);
        Self::with_service(BoxCloneService::new(raw), config)
    }

    fn with_service(service: BoxedService, config: TransportConfig) -> Self {
        Self {
            service: SyncService::new(service),
            config,
        }
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> HyperClientBuilder {
        HyperClientBuilder::default()
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for HyperClient {
    async fn execute(&self, request: Request) -> Result<Response> {
        self.service.call(request).await
    }
}

impl Service<Request> for HyperClient {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.service.call(request)
    }
}

type LayerFn = Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>;

/// Builder for [`HyperClient`].
#[derive(Default)]
pub struct HyperClientBuilder {
    config: TransportConfig,
    layers: Vec<LayerFn>,
    use_defaults: bool,
}

impl std::fmt::Debug for HyperClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClientBuilder")
            .field("config", &self.config)
            .field("layers_count", &self.layers.len())
            .field("use_defaults", &self.use_defaults)
            .finish()
    }
}

impl HyperClientBuilder {
    /// Use a whole connection configuration.
    #[must_use]
    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the TCP connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_connect_timeout(timeout);
        self
    }

    /// Refuse plain `http://` targets.
    #[must_use]
    pub fn https_only(mut self) -> Self {
        self.config = self.config.with_https_only(true);
        self
    }

    /// Replace the default `User-Agent`.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config = self.config.with_user_agent(Some(user_agent));
        self
    }

    /// Add a Tower layer to the client.
    ///
    /// Layers are applied in order: first added = innermost, last added =
    /// outermost (sees the request first).
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        <L::Service as Service<Request>>::Future: Send,
    {
        self.layers.push(Arc::new(move |service| {
            BoxCloneService::new(layer.layer(service))
        }));
        self
    }

    /// Alias for [`layer`](Self::layer).
    #[must_use]
    pub fn with<L>(self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        <L::Service as Service<Request>>::Future: Send,
    {
        self.layer(layer)
    }

    /// Enable default middleware: info-level logging, applied before any
    /// layer added with [`layer`](Self::layer).
    #[must_use]
    pub const fn with_defaults(mut self) -> Self {
        self.use_defaults = true;
        self
    }

    /// Disable default middleware.
    #[must_use]
    pub const fn without_defaults(mut self) -> Self {
        self.use_defaults = false;
        self
    }

    /// Add request/response logging.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.layer(LoggingLayer::new())
    }

    /// Add debug-level logging (includes headers).
    #[must_use]
    pub fn with_debug_logging(self) -> Self {
        self.layer(LoggingLayer::debug())
    }

    /// Build the client with all configured middleware.
    #[must_use]
    pub fn build(self) -> HyperClient {
        let config = self.config;
        let mut service: BoxedService = BoxCloneService::new(RawHyperClient::new(&config));

        if self.use_defaults {
            service = BoxCloneService::new(LoggingLayer::new().layer(service));
        }

        for layer_fn in self.layers {
            service = layer_fn(service);
        }

        HyperClient::with_service(service, config)
    }
}
