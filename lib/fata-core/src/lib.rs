//! Core types for the fata HTTP client.
//!
//! This crate holds everything the request pipeline manipulates, independent
//! of any transport:
//! - [`Method`] - HTTP method enum
//! - [`RequestConfig`], [`RequestOptions`] and [`Target`] - per-request configuration
//! - [`Defaults`] and [`HeaderDefaults`] - client-wide timeout and header tables
//! - [`Headers`] - case-insensitive header table with unset entries
//! - [`Body`] and [`negotiate`] - outbound body shapes and content negotiation
//! - [`Payload`] and [`decode`] - inbound content negotiation
//! - [`FormData`] and [`UrlSearchParams`] - form-builder collaborators
//! - [`Request`] and [`Response`] - what crosses the transport boundary
//! - [`HttpClient`] - the transport boundary itself
//! - [`Error`] and [`Result`] - the normalized error

mod body;
mod client;
mod config;
mod defaults;
mod error;
mod headers;
mod method;
mod multipart;
mod options;
mod payload;
pub mod prelude;
mod request;
mod response;
mod urlencoded;

pub use body::{
    Blob, Body, ByteStream, ContentType, ContentTypeAction, Negotiated, from_json, negotiate,
    to_json, to_query_pairs,
};
pub use client::HttpClient;
pub use config::{RequestConfig, RequestOptions, Target, apply_path, apply_query, resolve_url};
pub use defaults::{DEFAULT_ACCEPT, DEFAULT_TIMEOUT, Defaults, HeaderDefaults};
pub use error::{Error, ErrorKind, Result};
pub use headers::Headers;
pub use method::Method;
pub use multipart::{Form, FormData, Part};
pub use options::{
    AbortController, AbortSignal, CacheMode, CredentialsMode, RedirectPolicy, ReferrerPolicy,
    RequestMode, TransportOptions,
};
pub use payload::{Payload, ResponseDecoder, decode};
pub use request::{Request, RequestBuilder};
pub use response::{Response, ResponseHead};
pub use urlencoded::{SearchParams, UrlSearchParams};

// Re-export http crate types for status codes and headers
pub use http::{HeaderMap, StatusCode, header};
