//! Request header maps.
//!
//! [`Headers`] is the header table carried by a request configuration. Names
//! are matched case-insensitively and keep the casing of their latest write.
//! An entry may be *unset*: it is kept in the table (so it shadows lower
//! precedence defaults) but skipped when the final [`HeaderMap`] is built.

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::{Error, Result};

/// Ordered, case-insensitive header table with optional values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Option<String>)>,
}

impl Headers {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    fn write(&mut self, name: String, value: Option<String>) {
        match self.position(&name) {
            Some(index) => {
                if let Some(entry) = self.entries.get_mut(index) {
                    *entry = (name, value);
                }
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Set a header, replacing any entry with the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl ToString) {
        self.write(name.into(), Some(value.to_string()));
    }

    /// Mark a header as unset.
    ///
    /// The name still shadows defaults but no value is sent.
    pub fn unset(&mut self, name: impl Into<String>) {
        self.write(name.into(), None);
    }

    /// Remove a header entry entirely. Returns `true` if one was present.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Value of a header, `None` when absent or unset.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .and_then(|index| self.entries.get(index))
            .and_then(|(_, value)| value.as_deref())
    }

    /// Returns `true` if an entry (set or unset) exists for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    /// Number of entries, unset ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write every entry of `other` over this table, unset entries included.
    pub fn overlay(&mut self, other: &Self) {
        for (name, value) in &other.entries {
            self.write(name.clone(), value.clone());
        }
    }

    /// Three-tier merge: `caller` over `method` over `common`.
    #[must_use]
    pub fn merged(common: &Self, method: Option<&Self>, caller: &Self) -> Self {
        let mut merged = common.clone();
        if let Some(method) = method {
            merged.overlay(method);
        }
        merged.overlay(caller);
        merged
    }

    /// Build the header set sent on the wire, skipping unset entries.
    ///
    /// # Errors
    ///
    /// Returns an invalid request error for an illegal name or value.
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            let Some(value) = value else {
                continue;
            };
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| Error::invalid_request(format!("header name '{name}': {err}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|err| Error::invalid_request(format!("header '{name}' value: {err}")))?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}

impl<K, V> Extend<(K, V)> for Headers
where
    K: Into<String>,
    V: ToString,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.set(name, value);
        }
    }
}
