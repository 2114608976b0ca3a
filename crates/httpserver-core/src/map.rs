//! Name/value maps with an explicit key policy
//!
//! Header, footer and cookie names compare case-insensitively, argument
//! names compare exactly. Both are the same ordered map parameterized by a
//! [`KeyPolicy`] that normalizes names before they are used as keys; the name
//! as first inserted is kept for iteration and display.

use std::borrow::Cow;
use std::collections::btree_map::{self, BTreeMap};
use std::marker::PhantomData;

/// Normalization applied to names before comparison.
pub trait KeyPolicy {
    /// Map a name to its comparison form.
    fn normalize(key: &str) -> Cow<'_, str>;
}

/// ASCII case-insensitive names (HTTP header field names).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaseInsensitive;

impl KeyPolicy for CaseInsensitive {
    #[inline]
    fn normalize(key: &str) -> Cow<'_, str> {
        if key.bytes().any(|b| b.is_ascii_uppercase()) {
            Cow::Owned(key.to_ascii_lowercase())
        } else {
            Cow::Borrowed(key)
        }
    }
}

/// Exact, byte-wise names (query and form arguments).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaseSensitive;

impl KeyPolicy for CaseSensitive {
    #[inline]
    fn normalize(key: &str) -> Cow<'_, str> {
        Cow::Borrowed(key)
    }
}

/// Headers, footers and cookies.
pub type HeaderMap = FieldMap<CaseInsensitive>;

/// Request arguments.
pub type ArgMap = FieldMap<CaseSensitive>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    name: String,
    value: String,
}

/// An ordered map from unique names to values under the key policy `P`.
///
/// Inserting a name that already exists (under `P`) overwrites the value
/// and keeps the original spelling of the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap<P> {
    inner: BTreeMap<String, Field>,
    policy: PhantomData<P>,
}

impl<P: KeyPolicy> FieldMap<P> {
    /// Create an empty map.
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
            policy: PhantomData,
        }
    }

    /// Insert or overwrite a value, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();

        match self.inner.entry(P::normalize(&name).into_owned()) {
            btree_map::Entry::Occupied(mut entry) => {
                Some(std::mem::replace(&mut entry.get_mut().value, value))
            }
            btree_map::Entry::Vacant(entry) => {
                entry.insert(Field { name, value });
                None
            }
        }
    }

    /// Get a value by name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(P::normalize(name).as_ref())
            .map(|field| field.value.as_str())
    }

    /// Check if a name exists.
    #[inline]
    pub fn contains_key(&self, name: &str) -> bool {
        self.inner.contains_key(P::normalize(name).as_ref())
    }

    /// Remove a name, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.inner
            .remove(P::normalize(name).as_ref())
            .map(|field| field.value)
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the map is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate over `(name, value)` pairs in key order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.inner.values(),
        }
    }
}

impl<P: KeyPolicy> Default for FieldMap<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, K, V> Extend<(K, V)> for FieldMap<P>
where
    P: KeyPolicy,
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl<P, K, V> FromIterator<(K, V)> for FieldMap<P>
where
    P: KeyPolicy,
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<'a, P: KeyPolicy> IntoIterator for &'a FieldMap<P> {
    type Item = (&'a str, &'a str);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of a [`FieldMap`].
pub struct Iter<'a> {
    inner: btree_map::Values<'a, String, Field>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|field| (field.name.as_str(), field.value.as_str()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
