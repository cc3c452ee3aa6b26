//! URL-encoded form bodies.
//!
//! [`SearchParams`] is the transport-native value: an ordered list of pairs
//! encoded as `application/x-www-form-urlencoded`. [`UrlSearchParams`] is the
//! mapping-style builder that materializes one, skipping `None` fields.

use bytes::Bytes;

use crate::{Error, Result};

/// Ordered list of URL-encoded pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pairs: Vec<(String, String)>,
}

impl SearchParams {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair; repeated names are kept.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Pairs in insertion order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Encode the pairs.
    ///
    /// # Errors
    ///
    /// Returns an invalid request error if encoding fails.
    pub fn encode(&self) -> Result<Bytes> {
        serde_urlencoded::to_string(&self.pairs)
            .map(Bytes::from)
            .map_err(|err| Error::invalid_request(format!("form serialization error: {err}")))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SearchParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Mapping-style URL-encoded form builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlSearchParams {
    fields: Vec<(String, Option<String>)>,
}

impl UrlSearchParams {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any serializable record; `null` fields are skipped.
    ///
    /// # Errors
    ///
    /// Returns an invalid request error unless `value` serializes to an object.
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> Result<Self> {
        Ok(Self {
            fields: crate::body::record_fields(value)?,
        })
    }

    /// Add a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push((name.into(), Some(value.to_string())));
        self
    }

    /// Add a field that is skipped when `value` is `None`.
    #[must_use]
    pub fn optional_field<V: ToString>(
        mut self,
        name: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        self.fields
            .push((name.into(), value.map(|value| value.to_string())));
        self
    }

    /// Materialize the transport-native [`SearchParams`].
    #[must_use]
    pub fn search_params(&self) -> SearchParams {
        self.fields
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|value| (name.clone(), value.clone())))
            .collect()
    }
}
