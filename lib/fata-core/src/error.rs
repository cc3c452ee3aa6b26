//! Error types for fata.
//!
//! Every failure a caller can observe is an [`Error`]: transport failures,
//! non-2xx responses, timeouts, interceptor failures and body codec failures
//! all funnel into the same struct, optionally carrying the [`Response`]
//! that produced them.

use std::fmt;
use std::time::Duration;

use derive_more::{Display, Error};

use crate::Response;

/// Category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// The transport call itself failed (network error, abort).
    #[display("transport")]
    Transport,
    /// The transport answered with a non-2xx status.
    #[display("http")]
    Http,
    /// The timer fired before the transport settled.
    #[display("timeout")]
    Timeout,
    /// A request or response interceptor failed.
    #[display("interceptor")]
    Interceptor,
    /// The request could not be built (bad URL, header, or body).
    #[display("invalid request")]
    InvalidRequest,
    /// The response body could not be decoded.
    #[display("decode")]
    Decode,
}

/// Normalized error for fata operations.
///
/// The display form is the bare message, e.g. `Not Found` or
/// `timeout of 50ms`.
#[derive(Debug, Clone, Display, Error)]
#[display("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[error(not(source))]
    response: Option<Box<Response>>,
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error of the given kind without a response.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.is_empty() {
            format!("unknown {kind} error")
        } else {
            message
        };
        Self {
            kind,
            message,
            response: None,
        }
    }

    /// Create an HTTP error from a non-2xx response.
    ///
    /// The message is the status text; when the transport supplied none the
    /// numeric status is used instead.
    #[must_use]
    pub fn from_response(response: Response) -> Self {
        let message = if response.status_text().is_empty() {
            response.status().to_string()
        } else {
            response.status_text().to_string()
        };
        Self {
            kind: ErrorKind::Http,
            message,
            response: Some(Box::new(response)),
        }
    }

    /// Create a timeout error for the given duration.
    #[must_use]
    pub fn timeout(duration: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("timeout of {}ms", duration.as_millis()),
        )
    }

    /// Create a transport error.
    #[must_use]
    pub fn transport(message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Transport, message.to_string())
    }

    /// Create an interceptor error.
    #[must_use]
    pub fn interceptor(message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Interceptor, message.to_string())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::InvalidRequest, message.to_string())
    }

    /// Create a body decoding error.
    #[must_use]
    pub fn decode(message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Decode, message.to_string())
    }

    /// Create a JSON decoding error with path context.
    #[must_use]
    pub fn json_decode(path: impl fmt::Display, message: impl fmt::Display) -> Self {
        let path = path.to_string();
        if path.is_empty() || path == "." {
            Self::decode(format!("invalid JSON: {message}"))
        } else {
            Self::decode(format!("invalid JSON at '{path}': {message}"))
        }
    }

    /// Attach a response reference, keeping kind and message.
    #[must_use]
    pub fn with_response(mut self, response: Response) -> Self {
        self.response = Some(Box::new(response));
        self
    }

    /// Error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The response that produced this error, if any.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    /// Consume the error into its response, if any.
    #[must_use]
    pub fn into_response(self) -> Option<Response> {
        self.response.map(|response| *response)
    }

    /// HTTP status of the referenced response, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response().map(Response::status)
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// Returns `true` if this is an HTTP status error.
    #[must_use]
    pub const fn is_http(&self) -> bool {
        matches!(self.kind, ErrorKind::Http)
    }

    /// Returns `true` if this is a transport error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport)
    }

    /// Try to decode the referenced response body as JSON.
    ///
    /// Returns `None` when there is no response. The body is cloned, so the
    /// error keeps its response.
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T>> {
        self.response()
            .map(|response| crate::from_json(response.peek_body()))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::invalid_request(format!("invalid URL: {err}"))
    }
}
