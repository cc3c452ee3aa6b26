//! The transport boundary.
//!
//! [`HttpClient`] is the only thing the request pipeline needs from a
//! transport: take a fully resolved [`Request`] and hand back a buffered
//! [`Response`]. Implement it to plug in another HTTP stack or a test double.

use std::future::Future;
use std::sync::Arc;

use crate::{Request, Response, Result};

/// Executes resolved requests.
///
/// A non-success status is *not* an error at this level; the pipeline turns
/// it into one. Implementations fail only when no response was obtained
/// (connection failure, abort, protocol error).
pub trait HttpClient: Send + Sync {
    /// Execute `request` and return the buffered response.
    ///
    /// # Errors
    ///
    /// Returns a transport error when no response could be obtained.
    fn execute(&self, request: Request) -> impl Future<Output = Result<Response>> + Send;
}

impl<C: HttpClient> HttpClient for Arc<C> {
    fn execute(&self, request: Request) -> impl Future<Output = Result<Response>> + Send {
        self.as_ref().execute(request)
    }
}

impl<C: HttpClient> HttpClient for &C {
    fn execute(&self, request: Request) -> impl Future<Output = Result<Response>> + Send {
        (**self).execute(request)
    }
}
