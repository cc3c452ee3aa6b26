//! Prelude module for convenient imports.
//!
//! ```ignore
//! use fata::prelude::*;
//! ```

pub use crate::{
    AbortController, Body, Error, ErrorKind, Fata, FormData, Headers, HttpClient, HyperClient,
    InterceptorHandle, Method, Payload, RequestConfig, RequestOptions, Response, ResponseHead,
    Result, StatusCode, UrlSearchParams, header,
};
pub use serde::{Deserialize, Serialize};
