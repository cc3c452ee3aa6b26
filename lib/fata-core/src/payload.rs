//! Response payloads and inbound content negotiation.
//!
//! [`decode`] reads a [`Response`] body once, choosing the reader from the
//! declared `Content-Type`:
//!
//! - `application/json` → [`Payload::Json`], `null` for an empty body
//! - `application/x-www-form-urlencoded` → [`Payload::Form`]
//! - `application/octet-stream` → [`Payload::Blob`]
//! - anything else, or no header → [`Payload::Text`], invalid UTF-8 replaced
//!
//! A per-request [`ResponseDecoder`] replaces this choice entirely.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::header::CONTENT_TYPE;

use crate::{ContentType, Error, Response, ResponseHead, Result};

/// Decoded response data, threaded through the response interceptors.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Structured data.
    Json(serde_json::Value),
    /// Form pairs, in body order.
    Form(Vec<(String, String)>),
    /// Raw bytes.
    Blob(Bytes),
    /// Text.
    Text(String),
}

impl Payload {
    /// Deserialize the payload into `T`.
    ///
    /// JSON payloads are deserialized directly; text payloads are parsed as
    /// JSON; form payloads are read as a record of their pairs.
    ///
    /// # Errors
    ///
    /// Returns a decode error naming the path of the failing field.
    pub fn deserialize<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        match self {
            Self::Json(value) => serde_path_to_error::deserialize(value)
                .map_err(|err| Error::json_decode(err.path(), err.inner())),
            Self::Text(text) => crate::from_json(text.as_bytes()),
            Self::Blob(bytes) => crate::from_json(&bytes),
            Self::Form(pairs) => {
                let record: serde_json::Map<String, serde_json::Value> = pairs
                    .into_iter()
                    .map(|(name, value)| (name, serde_json::Value::String(value)))
                    .collect();
                Self::Json(serde_json::Value::Object(record)).deserialize()
            }
        }
    }

    /// Text content, for text payloads.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// JSON content, for JSON payloads.
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Raw bytes of the payload; JSON is re-serialized and forms re-encoded.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Blob(bytes) => bytes,
            Self::Text(text) => Bytes::from(text),
            Self::Json(value) => Bytes::from(value.to_string()),
            Self::Form(pairs) => Bytes::from(
                url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs)
                    .finish(),
            ),
        }
    }

    /// Returns `true` for [`Payload::Json`].
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self, Self::Json(_))
    }

    /// Returns `true` for [`Payload::Text`].
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Self::Blob(value)
    }
}

/// Read `response` with the reader matching its `Content-Type`.
///
/// # Errors
///
/// Returns a decode error if the body does not match its declared type.
pub fn decode(response: Response) -> Result<(Payload, ResponseHead)> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(ContentType::from_header);

    match content_type {
        Some(ContentType::Json) if response.peek_body().is_empty() => {
            let (head, _) = response.into_parts();
            Ok((Payload::Json(serde_json::Value::Null), head))
        }
        Some(ContentType::Json) => response
            .json()
            .map(|(value, head)| (Payload::Json(value), head)),
        Some(ContentType::FormUrlEncoded) => response
            .form()
            .map(|(pairs, head)| (Payload::Form(pairs), head)),
        Some(ContentType::OctetStream) => {
            let (bytes, head) = response.blob();
            Ok((Payload::Blob(bytes), head))
        }
        Some(ContentType::PlainText) | None => {
            let (text, head) = response.text_lossy();
            Ok((Payload::Text(text), head))
        }
    }
}

type DecodeFn = dyn Fn(Response) -> BoxFuture<'static, Result<Payload>> + Send + Sync;

/// Per-request override of the inbound reader.
#[derive(Clone)]
pub struct ResponseDecoder {
    decode: Arc<DecodeFn>,
}

impl ResponseDecoder {
    /// Wrap an async decoding function.
    pub fn new<F, Fut>(decode: F) -> Self
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload>> + Send + 'static,
    {
        Self {
            decode: Arc::new(move |response| -> BoxFuture<'static, Result<Payload>> {
                Box::pin(decode(response))
            }),
        }
    }

    /// Always read the body as raw bytes.
    #[must_use]
    pub fn blob() -> Self {
        Self::new(|response: Response| async move { Ok(Payload::Blob(response.blob().0)) })
    }

    /// Always read the body as text.
    #[must_use]
    pub fn text() -> Self {
        Self::new(|response: Response| async move {
            response.text().map(|(text, _)| Payload::Text(text))
        })
    }

    /// Always read the body as JSON.
    #[must_use]
    pub fn json() -> Self {
        Self::new(|response: Response| async move {
            response.json().map(|(value, _)| Payload::Json(value))
        })
    }

    /// Run the decoder.
    ///
    /// # Errors
    ///
    /// Returns whatever the decoding function fails with.
    pub async fn decode(&self, response: Response) -> Result<Payload> {
        (self.decode)(response).await
    }
}

impl fmt::Debug for ResponseDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseDecoder").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderMap;
    use serde_json::json;

    use super::*;

    fn response(content_type: Option<&str>, body: &'static str) -> Response {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, content_type.parse().expect("header value"));
        }
        Response::new(200, headers, body)
    }

    #[test]
    fn decode_by_content_type() {
        let (payload, head) =
            decode(response(Some("application/json"), r#"{"a":1}"#)).expect("json");
        assert_eq!(payload, Payload::Json(json!({"a": 1})));
        assert_eq!(head.status(), 200);

        let (payload, _) =
            decode(response(Some("application/x-www-form-urlencoded"), "a=1&b=2")).expect("form");
        assert_eq!(
            payload,
            Payload::Form(vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string())
            ])
        );

        let (payload, _) = decode(response(Some("application/octet-stream"), "raw")).expect("blob");
        assert_eq!(payload, Payload::Blob(Bytes::from("raw")));

        let (payload, _) = decode(response(Some("text/html"), "<p>hi</p>")).expect("text");
        assert_eq!(payload, Payload::Text("<p>hi</p>".to_string()));

        let (payload, _) = decode(response(None, "plain")).expect("text");
        assert_eq!(payload, Payload::Text("plain".to_string()));
    }

    #[test]
    fn decode_json_with_charset() {
        let (payload, _) =
            decode(response(Some("application/json; charset=utf-8"), "[1,2]")).expect("json");
        assert!(payload.is_json());
    }

    #[test]
    fn decode_empty_json_body_is_null() {
        let (payload, _) = decode(response(Some("application/json"), "")).expect("empty");
        assert_eq!(payload, Payload::Json(serde_json::Value::Null));
    }

    #[test]
    fn decode_binary_under_unknown_type_is_lossy_text() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "image/png".parse().expect("header value"));
        let binary = Response::new(200, headers, vec![0x89, b'P', b'N', b'G', 0xff]);

        let (payload, head) = decode(binary).expect("never fails for text");
        assert_eq!(payload, Payload::Text("\u{FFFD}PNG\u{FFFD}".to_string()));
        assert_eq!(head.status(), 200);
    }

    #[test]
    fn decode_invalid_json_fails() {
        let err = decode(response(Some("application/json"), "{oops")).expect_err("invalid");
        assert_eq!(err.kind(), crate::ErrorKind::Decode);
    }

    #[test]
    fn payload_deserialize() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct User {
            id: u64,
        }

        let user: User = Payload::Json(json!({"id": 7})).deserialize().expect("json");
        assert_eq!(user, User { id: 7 });

        let user: User = Payload::Text(r#"{"id":8}"#.to_string())
            .deserialize()
            .expect("text");
        assert_eq!(user, User { id: 8 });

        let err = Payload::Json(json!({"id": "seven"}))
            .deserialize::<User>()
            .expect_err("wrong type");
        assert!(err.message().contains("id"), "{err}");
    }

    #[test]
    fn payload_into_bytes() {
        assert_eq!(Payload::from("hi").into_bytes(), Bytes::from("hi"));
        assert_eq!(Payload::from(json!({"a": 1})).into_bytes(), Bytes::from(r#"{"a":1}"#));
        assert_eq!(
            Payload::Form(vec![("q".to_string(), "a b".to_string())]).into_bytes(),
            Bytes::from("q=a+b")
        );
    }

    #[tokio::test]
    async fn response_decoder_override() {
        let decoder = ResponseDecoder::blob();
        let payload = decoder
            .decode(response(Some("application/json"), r#"{"a":1}"#))
            .await
            .expect("blob");
        assert_eq!(payload, Payload::Blob(Bytes::from(r#"{"a":1}"#)));
    }
}
