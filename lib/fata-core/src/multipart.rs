//! Multipart form data.
//!
//! [`Form`] is the transport-native multipart body: a list of [`Part`]s and a
//! boundary. [`FormData`] is the mapping-style builder most callers use; it
//! materializes a [`Form`] with [`FormData::form_data`], skipping fields whose
//! value is `None`.
//!
//! ```
//! use fata_core::FormData;
//!
//! let form = FormData::new()
//!     .field("name", "John Doe")
//!     .optional_field("nickname", None::<&str>)
//!     .file("avatar", "photo.jpg", vec![0xFF, 0xD8])
//!     .form_data();
//!
//! assert_eq!(form.parts().len(), 2);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// A single part in a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Part {
    /// Create a text part (`text/plain; charset=utf-8`).
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: Some("text/plain; charset=utf-8".to_string()),
            data: Bytes::from(value.into()),
        }
    }

    /// Create a file part; the content type is guessed from the extension.
    #[must_use]
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename).to_string();
        Self {
            name: name.into(),
            filename: Some(filename),
            content_type: Some(content_type),
            data: data.into(),
        }
    }

    /// Set the content type for this part.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Part name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filename, if set.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Content type, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Part data.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

fn guess_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        _ => "application/octet-stream",
    }
}

/// Transport-native multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    parts: Vec<Part>,
    boundary: String,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create an empty form with a generated boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Create an empty form with a custom boundary.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Add a part.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Parts in this form.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// `multipart/form-data; boundary=<boundary>`.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encode the form into (content-type header value, body bytes).
    #[must_use]
    pub fn into_body(self) -> (String, Bytes) {
        (self.content_type(), self.encode())
    }

    fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\nContent-Disposition: form-data; name=\"");
            buf.put_slice(part.name.as_bytes());
            buf.put_u8(b'"');
            if let Some(filename) = &part.filename {
                buf.put_slice(b"; filename=\"");
                buf.put_slice(filename.as_bytes());
                buf.put_u8(b'"');
            }
            buf.put_slice(b"\r\n");

            if let Some(content_type) = &part.content_type {
                buf.put_slice(b"Content-Type: ");
                buf.put_slice(content_type.as_bytes());
                buf.put_slice(b"\r\n");
            }

            buf.put_slice(b"\r\n");
            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        buf.freeze()
    }
}

fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let sequence = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("----FataBoundary{timestamp:x}{sequence:x}")
}

/// Value of a [`FormData`] field.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FormValue {
    Text(String),
    File { filename: String, data: Bytes },
}

/// Mapping-style multipart builder.
///
/// Fields keep insertion order; `None` values are recorded and skipped when
/// the form is materialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, Option<FormValue>)>,
    boundary: Option<String>,
}

impl FormData {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any serializable record.
    ///
    /// Top-level `null` fields are skipped, strings are sent as-is, other
    /// values as their JSON text.
    ///
    /// # Errors
    ///
    /// Returns an invalid request error unless `value` serializes to an object.
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> Result<Self> {
        let fields = crate::body::record_fields(value)?;
        Ok(Self {
            fields: fields
                .into_iter()
                .map(|(name, value)| (name, value.map(FormValue::Text)))
                .collect(),
            boundary: None,
        })
    }

    /// Add a text field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.fields
            .push((name.into(), Some(FormValue::Text(value.to_string()))));
        self
    }

    /// Add a field that is skipped when `value` is `None`.
    #[must_use]
    pub fn optional_field<V: ToString>(
        mut self,
        name: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        self.fields.push((
            name.into(),
            value.map(|value| FormValue::Text(value.to_string())),
        ));
        self
    }

    /// Add a file field.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.fields.push((
            name.into(),
            Some(FormValue::File {
                filename: filename.into(),
                data: data.into(),
            }),
        ));
        self
    }

    /// Use a fixed boundary instead of a generated one.
    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Materialize the transport-native [`Form`].
    #[must_use]
    pub fn form_data(&self) -> Form {
        let form = self
            .boundary
            .as_ref()
            .map_or_else(Form::new, Form::with_boundary);

        self.fields
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|value| (name, value)))
            .fold(form, |form, (name, value)| match value {
                FormValue::Text(text) => form.part(Part::text(name.clone(), text.clone())),
                FormValue::File { filename, data } => {
                    form.part(Part::file(name.clone(), filename.clone(), data.clone()))
                }
            })
    }
}

impl TryFrom<serde_json::Value> for FormData {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        Self::from_serialize(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_file_guesses_content_type() {
        let part = Part::file("upload", "PHOTO.JPG", vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(part.filename(), Some("PHOTO.JPG"));
        assert_eq!(part.content_type(), Some("image/jpeg"));

        let part = Part::file("upload", "archive.unknown", vec![]);
        assert_eq!(part.content_type(), Some("application/octet-stream"));

        let part = Part::file("upload", "README", vec![]);
        assert_eq!(part.content_type(), Some("application/octet-stream"));
    }

    #[test]
    fn generated_boundaries_differ() {
        assert_ne!(Form::new().boundary(), Form::new().boundary());
        assert!(Form::new().boundary().starts_with("----FataBoundary"));
    }

    #[test]
    fn form_encode() {
        let (content_type, body) = Form::with_boundary("boundary123")
            .part(Part::text("field", "value"))
            .into_body();

        assert_eq!(content_type, "multipart/form-data; boundary=boundary123");

        let body = String::from_utf8_lossy(&body);
        assert!(body.contains("--boundary123\r\n"));
        assert!(body.contains("Content-Disposition: form-data; name=\"field\"\r\n"));
        assert!(body.contains("\r\n\r\nvalue\r\n"));
        assert!(body.ends_with("--boundary123--\r\n"));
    }

    #[test]
    fn form_data_skips_none_fields() {
        let form = FormData::new()
            .field("a", 1)
            .optional_field("b", None::<String>)
            .optional_field("c", Some("three"))
            .boundary("fixed")
            .form_data();

        let names: Vec<_> = form.parts().iter().map(Part::name).collect();
        assert_eq!(names, ["a", "c"]);
        assert_eq!(form.boundary(), "fixed");
    }

    #[test]
    fn form_data_file_field() {
        let form = FormData::new()
            .file("doc", "notes.txt", "hello")
            .form_data();
        let (_, body) = form.into_body();
        let body = String::from_utf8_lossy(&body);

        assert!(body.contains("name=\"doc\"; filename=\"notes.txt\""));
        assert!(body.contains("Content-Type: text/plain\r\n"));
    }

    #[test]
    fn form_data_from_serialize() {
        #[derive(serde::Serialize)]
        struct Signup {
            name: String,
            age: u32,
            referrer: Option<String>,
        }

        let data = FormData::from_serialize(&Signup {
            name: "Ada".to_string(),
            age: 36,
            referrer: None,
        })
        .expect("record");
        let form = data.form_data();

        let parts: Vec<_> = form
            .parts()
            .iter()
            .map(|part| (part.name(), part.data().clone()))
            .collect();
        // record fields come out in key order
        assert_eq!(
            parts,
            vec![("age", Bytes::from("36")), ("name", Bytes::from("Ada"))]
        );
    }

    #[test]
    fn form_data_from_scalar_is_rejected() {
        let err = FormData::try_from(serde_json::json!(42)).expect_err("not a record");
        assert_eq!(err.kind(), crate::ErrorKind::InvalidRequest);
    }
}
