//! Prelude module for convenient imports.
//!
//! ```ignore
//! use fata_core::prelude::*;
//! ```

pub use crate::{
    AbortController, Body, Error, ErrorKind, FormData, Headers, HttpClient, Method, Payload,
    Request, RequestConfig, RequestOptions, Response, ResponseHead, Result, Target,
    UrlSearchParams,
};
