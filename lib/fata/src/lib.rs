//! Configurable HTTP client with interceptor chains.
//!
//! [`Fata`] gives a single entry point for HTTP requests with URL templating,
//! per-method default headers, request and response interceptors, a timeout
//! race, body/content-type negotiation and one normalized [`Error`].
//!
//! # Example
//!
//! ```ignore
//! use fata::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! let api = Fata::new("https://api.example.com/");
//!
//! api.interceptors().request.register(|mut config: RequestConfig| async move {
//!     config.header.set("Authorization", "Bearer secret");
//!     Ok(config)
//! });
//!
//! let user: User = api
//!     .get("/users/{id}", RequestOptions::new().path("id", 7))
//!     .await?
//!     .deserialize()?;
//! ```

mod client;
mod config;
mod connector;
mod fata;
mod interceptor;
pub mod middleware;
pub mod prelude;
mod timeout;

pub use client::{BoxedService, HyperClient, HyperClientBuilder, ServiceFuture};
pub use config::{DEFAULT_USER_AGENT, TransportConfig};
pub use fata::{Fata, FataBuilder};
pub use interceptor::{
    InterceptorHandle, Interceptors, RequestInterceptors, ResponseInterceptors,
};
pub use timeout::timeout_it;

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use fata_core::{
    AbortController, AbortSignal, Blob, Body, ByteStream, CacheMode, ContentType,
    CredentialsMode, DEFAULT_ACCEPT, DEFAULT_TIMEOUT, Defaults, Error, ErrorKind, Form,
    FormData, HeaderDefaults, Headers, HttpClient, Method, Part, Payload, RedirectPolicy,
    ReferrerPolicy, Request, RequestBuilder, RequestConfig, RequestMode, RequestOptions,
    Response, ResponseDecoder, ResponseHead, Result, SearchParams, Target, TransportOptions,
    UrlSearchParams, from_json, to_json,
};

// Re-export http types for status codes and headers
pub use fata_core::{StatusCode, header};

pub use url;
