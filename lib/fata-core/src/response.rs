//! HTTP response handling.
//!
//! [`Response`] is what a transport hands back: status, status text,
//! case-insensitive headers and a fully buffered body. The body readers
//! ([`Response::json`], [`Response::form`], [`Response::blob`],
//! [`Response::text`]) consume the response, so a body is read at most once.
//!
//! After a read, [`ResponseHead`] is what remains: everything except the body.

use bytes::Bytes;
use http::HeaderMap;

/// Status line and headers of a response.
#[derive(Debug, Clone, Default)]
pub struct ResponseHead {
    status: u16,
    status_text: String,
    headers: HeaderMap,
    url: Option<url::Url>,
}

impl ResponseHead {
    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase, possibly empty.
    #[must_use]
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Single header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// URL the response was fetched from, when the transport reports it.
    #[must_use]
    pub fn url(&self) -> Option<&url::Url> {
        self.url.as_ref()
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// HTTP response with status, headers, and a buffered body.
#[derive(Debug, Clone, Default)]
pub struct Response {
    head: ResponseHead,
    body: Bytes,
}

impl Response {
    /// Creates a new response.
    ///
    /// The status text defaults to the canonical reason phrase of `status`.
    #[must_use]
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        let status_text = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            head: ResponseHead {
                status,
                status_text,
                headers,
                url: None,
            },
            body: body.into(),
        }
    }

    /// Override the status text.
    #[must_use]
    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.head.status_text = status_text.into();
        self
    }

    /// Record the URL the response came from.
    #[must_use]
    pub fn with_url(mut self, url: url::Url) -> Self {
        self.head.url = Some(url);
        self
    }

    /// Status line and headers.
    #[must_use]
    pub const fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.head.status
    }

    /// Reason phrase, possibly empty.
    #[must_use]
    pub fn status_text(&self) -> &str {
        &self.head.status_text
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Single header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.head.is_success()
    }

    /// Status is 3xx.
    #[must_use]
    pub const fn is_redirection(&self) -> bool {
        self.head.status >= 300 && self.head.status < 400
    }

    /// Raw buffered body, without consuming the response.
    #[must_use]
    pub fn peek_body(&self) -> &Bytes {
        &self.body
    }

    /// Consume into (head, body).
    #[must_use]
    pub fn into_parts(self) -> (ResponseHead, Bytes) {
        (self.head, self.body)
    }

    /// Read the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns a decode error carrying the JSON path of the failure.
    pub fn json<T: serde::de::DeserializeOwned>(self) -> crate::Result<(T, ResponseHead)> {
        let value = crate::from_json(&self.body)?;
        Ok((value, self.head))
    }

    /// Read the body as URL-encoded form pairs.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the body is not valid form data.
    pub fn form(self) -> crate::Result<(Vec<(String, String)>, ResponseHead)> {
        let pairs = serde_urlencoded::from_bytes(&self.body)
            .map_err(|err| crate::Error::decode(format!("invalid form data: {err}")))?;
        Ok((pairs, self.head))
    }

    /// Read the body as raw bytes.
    #[must_use]
    pub fn blob(self) -> (Bytes, ResponseHead) {
        (self.body, self.head)
    }

    /// Read the body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the body is not valid UTF-8.
    pub fn text(self) -> crate::Result<(String, ResponseHead)> {
        let text = String::from_utf8(self.body.to_vec())
            .map_err(|err| crate::Error::decode(format!("invalid UTF-8 body: {err}")))?;
        Ok((text, self.head))
    }

    /// Read the body as text, replacing invalid UTF-8 sequences with `U+FFFD`.
    #[must_use]
    pub fn text_lossy(self) -> (String, ResponseHead) {
        let text = String::from_utf8_lossy(&self.body).into_owned();
        (text, self.head)
    }
}
