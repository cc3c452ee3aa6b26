//! Request bodies and outbound content negotiation.
//!
//! A request body is a [`Body`], an explicit tagged union over every shape a
//! caller can send. [`negotiate`] turns it into wire bytes plus a decision
//! about the `Content-Type` header, applying these rules in order:
//!
//! | Body                                   | Sent     | `Content-Type`              |
//! |----------------------------------------|----------|-----------------------------|
//! | absent, JSON `null`, or `GET`/`HEAD`   | nothing  | removed                     |
//! | [`Body::FormData`] / [`Body::Multipart`] | encoded | `multipart/form-data; boundary=..` |
//! | [`Body::UrlSearchParams`] / [`Body::SearchParams`] | encoded | `application/x-www-form-urlencoded` |
//! | [`Body::Stream`] / [`Body::Blob`] / [`Body::Buffer`] | as-is | caller's value kept |
//! | [`Body::Json`] object or array         | JSON text | `application/json; charset=utf-8` |
//! | text, boolean, number                  | string form | `text/plain; charset=utf-8` |
//!
//! With nothing to send, removing `Content-Type` is the neutral default: no
//! header beats a made-up media type for an empty body.

use std::fmt;
use std::pin::Pin;
use std::sync::Mutex;

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;

use crate::{Error, Form, FormData, Method, Result, SearchParams, UrlSearchParams};

/// Content type for request and response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// `application/json`
    Json,
    /// `application/x-www-form-urlencoded`
    FormUrlEncoded,
    /// `text/plain`
    PlainText,
    /// `application/octet-stream`
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain",
            Self::OctetStream => "application/octet-stream",
        }
    }

    /// Header value sent on requests, with charset where relevant.
    #[must_use]
    pub const fn header_value(&self) -> &'static str {
        match self {
            Self::Json => "application/json; charset=utf-8",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain; charset=utf-8",
            Self::OctetStream => "application/octet-stream",
        }
    }

    /// Match a `Content-Type` header value on its media type.
    ///
    /// Parameters and case are ignored.
    #[must_use]
    pub fn from_header(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or_default().trim();
        [
            Self::Json,
            Self::FormUrlEncoded,
            Self::PlainText,
            Self::OctetStream,
        ]
        .into_iter()
        .find(|content_type| content_type.as_str().eq_ignore_ascii_case(essence))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type BoxByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A streamed request body, drained before dispatch.
pub struct ByteStream {
    inner: Mutex<BoxByteStream>,
}

impl ByteStream {
    /// Wrap a stream of byte chunks.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: Mutex::new(Box::pin(stream)),
        }
    }

    /// Concatenate every chunk.
    ///
    /// # Errors
    ///
    /// Returns the first chunk error.
    pub async fn collect(self) -> Result<Bytes> {
        let mut stream = self
            .inner
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream").finish_non_exhaustive()
    }
}

/// Binary data with an optional media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    data: Bytes,
    mime: Option<String>,
}

impl Blob {
    /// Create a blob without a media type.
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            mime: None,
        }
    }

    /// Set the media type.
    #[must_use]
    pub fn with_type(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Media type, if known.
    #[must_use]
    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    /// Blob data.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// Request body.
#[derive(Debug)]
pub enum Body {
    /// Multipart builder, materialized through [`FormData::form_data`].
    FormData(FormData),
    /// Native multipart form, sent as-is.
    Multipart(Form),
    /// URL-encoded builder, materialized through [`UrlSearchParams::search_params`].
    UrlSearchParams(UrlSearchParams),
    /// Native URL-encoded pairs, sent as-is.
    SearchParams(SearchParams),
    /// Streamed bytes.
    Stream(ByteStream),
    /// Binary blob.
    Blob(Blob),
    /// Raw buffer.
    Buffer(Bytes),
    /// Structured value. `null` means no body; scalars are sent as text.
    Json(serde_json::Value),
    /// Text scalar.
    Text(String),
    /// Boolean scalar.
    Bool(bool),
    /// Number scalar.
    Number(serde_json::Number),
}

impl Body {
    /// Build a structured body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an invalid request error if serialization fails.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|err| Error::invalid_request(format!("JSON serialization error: {err}")))
    }

    /// Wrap a stream of byte chunks.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self::Stream(ByteStream::new(stream))
    }
}

impl From<FormData> for Body {
    fn from(value: FormData) -> Self {
        Self::FormData(value)
    }
}

impl From<Form> for Body {
    fn from(value: Form) -> Self {
        Self::Multipart(value)
    }
}

impl From<UrlSearchParams> for Body {
    fn from(value: UrlSearchParams) -> Self {
        Self::UrlSearchParams(value)
    }
}

impl From<SearchParams> for Body {
    fn from(value: SearchParams) -> Self {
        Self::SearchParams(value)
    }
}

impl From<Blob> for Body {
    fn from(value: Blob) -> Self {
        Self::Blob(value)
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Self::Buffer(value)
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Self::Buffer(Bytes::from(value))
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for Body {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! number_body {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Body {
                fn from(value: $ty) -> Self {
                    Self::Number(serde_json::Number::from(value))
                }
            }
        )*
    };
}

number_body!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

/// What negotiation decided for the `Content-Type` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentTypeAction {
    /// Drop any `Content-Type`.
    Remove,
    /// Overwrite `Content-Type` with this value.
    Set(String),
    /// Leave the caller's `Content-Type` untouched; use this value only when
    /// none is present.
    Keep(Option<String>),
}

/// Outcome of outbound negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    /// Wire body, `None` when nothing is sent.
    pub body: Option<Bytes>,
    /// `Content-Type` decision.
    pub content_type: ContentTypeAction,
}

impl Negotiated {
    fn none() -> Self {
        Self {
            body: None,
            content_type: ContentTypeAction::Remove,
        }
    }

    fn forced(content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            body: Some(body.into()),
            content_type: ContentTypeAction::Set(content_type.into()),
        }
    }

    fn kept(fallback: Option<String>, body: Bytes) -> Self {
        Self {
            body: Some(body),
            content_type: ContentTypeAction::Keep(fallback),
        }
    }
}

/// Decide the wire body and `Content-Type` for `body` sent with `method`.
///
/// # Errors
///
/// Returns an error if a stream chunk fails or serialization fails.
pub async fn negotiate(method: Method, body: Option<Body>) -> Result<Negotiated> {
    let Some(body) = body else {
        return Ok(Negotiated::none());
    };
    if method.forbids_body() {
        return Ok(Negotiated::none());
    }

    let negotiated = match body {
        Body::Json(serde_json::Value::Null) => Negotiated::none(),
        Body::FormData(data) => {
            let (content_type, bytes) = data.form_data().into_body();
            Negotiated::forced(content_type, bytes)
        }
        Body::Multipart(form) => {
            let (content_type, bytes) = form.into_body();
            Negotiated::forced(content_type, bytes)
        }
        Body::UrlSearchParams(params) => Negotiated::forced(
            ContentType::FormUrlEncoded.header_value(),
            params.search_params().encode()?,
        ),
        Body::SearchParams(params) => {
            Negotiated::forced(ContentType::FormUrlEncoded.header_value(), params.encode()?)
        }
        Body::Stream(stream) => Negotiated::kept(None, stream.collect().await?),
        Body::Blob(blob) => Negotiated::kept(blob.mime, blob.data),
        Body::Buffer(bytes) => Negotiated::kept(None, bytes),
        Body::Json(value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
            Negotiated::forced(ContentType::Json.header_value(), to_json(&value)?)
        }
        Body::Json(serde_json::Value::String(text)) | Body::Text(text) => {
            Negotiated::forced(ContentType::PlainText.header_value(), text)
        }
        Body::Json(serde_json::Value::Bool(flag)) | Body::Bool(flag) => {
            Negotiated::forced(ContentType::PlainText.header_value(), flag.to_string())
        }
        Body::Json(serde_json::Value::Number(number)) | Body::Number(number) => {
            Negotiated::forced(ContentType::PlainText.header_value(), number.to_string())
        }
    };
    Ok(negotiated)
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an invalid request error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use fata_core::to_json;
///
/// let bytes = to_json(&serde_json::json!({"name": "x"})).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"x"}"#);
/// ```
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|err| Error::invalid_request(format!("JSON serialization error: {err}")))
}

/// Serialize a value to query pairs.
///
/// Uses `serde_html_form`, so `Vec<T>` fields become repeated pairs and
/// `None` fields are skipped.
///
/// # Errors
///
/// Returns an invalid request error if query serialization fails.
pub fn to_query_pairs<T: serde::Serialize>(value: &T) -> Result<Vec<(String, String)>> {
    let query = serde_html_form::to_string(value)
        .map_err(|err| Error::invalid_request(format!("query serialization error: {err}")))?;
    Ok(url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect())
}

/// Deserialize JSON bytes with path-aware error messages.
///
/// # Errors
///
/// Returns a decode error naming the path of the failing field.
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|err| Error::json_decode(err.path(), err.inner()))
}

/// Flatten a serializable record into `(name, value)` fields.
///
/// `null` values become `None`; strings are kept verbatim and every other
/// value becomes its JSON text.
pub(crate) fn record_fields<T: serde::Serialize>(
    value: &T,
) -> Result<Vec<(String, Option<String>)>> {
    let value = serde_json::to_value(value)
        .map_err(|err| Error::invalid_request(format!("form serialization error: {err}")))?;
    let serde_json::Value::Object(map) = value else {
        return Err(Error::invalid_request(
            "form fields must come from a key/value record",
        ));
    };
    Ok(map
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(text) => Some(text),
                other => Some(other.to_string()),
            };
            (name, value)
        })
        .collect())
}
