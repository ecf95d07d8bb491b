//! MIME header handling.

use std::fmt;

/// Raw header value: the bytes as stored, in the header charset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// A single value.
    Single(Vec<u8>),
    /// A repeated field, e.g. several `Received` lines.
    Multi(Vec<Vec<u8>>),
}

impl HeaderValue {
    /// Iterates over the values of this field.
    pub fn values(&self) -> impl Iterator<Item = &[u8]> {
        match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Multi(values) => values.as_slice(),
        }
        .iter()
        .map(Vec::as_slice)
    }

    /// Returns the value of a single-valued field.
    #[must_use]
    pub fn as_single(&self) -> Option<&[u8]> {
        match self {
            Self::Single(value) => Some(value),
            Self::Multi(_) => None,
        }
    }

    /// Returns the first value.
    #[must_use]
    pub fn first(&self) -> Option<&[u8]> {
        self.values().next()
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        Self::Single(value.as_bytes().to_vec())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        Self::Single(value.into_bytes())
    }
}

impl From<&[u8]> for HeaderValue {
    fn from(value: &[u8]) -> Self {
        Self::Single(value.to_vec())
    }
}

impl From<Vec<u8>> for HeaderValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<&str>> for HeaderValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multi(values.into_iter().map(|v| v.as_bytes().to_vec()).collect())
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values.into_iter().map(String::into_bytes).collect())
    }
}

impl PartialEq<&str> for HeaderValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_single() == Some(other.as_bytes())
    }
}

/// Header value after RFC 2047 encoding; always 7-bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedValue {
    /// A single value, possibly folded over several lines.
    Single(String),
    /// A repeated field, each value encoded on its own.
    Multi(Vec<String>),
}

impl EncodedValue {
    /// Iterates over the values of this field.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Multi(values) => values.as_slice(),
        }
        .iter()
        .map(String::as_str)
    }

    /// Returns the value of a single-valued field.
    #[must_use]
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Multi(_) => None,
        }
    }
}

impl PartialEq<&str> for EncodedValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_single() == Some(*other)
    }
}

/// Ordered collection of header fields.
///
/// Insertion order is kept and names are stored as given. Inserting a name
/// that is already present replaces its value in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap<V> {
    fields: Vec<(String, V)>,
}

/// Raw header fields.
pub type Headers = FieldMap<HeaderValue>;

/// Encoded header fields, ready for output.
pub type EncodedHeaders = FieldMap<EncodedValue>;

impl<V> Default for FieldMap<V> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<V> FieldMap<V> {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header value, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<V>) -> Option<V> {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    /// Sets a header value, matching an existing field by name regardless
    /// of ASCII case. The stored name is kept.
    pub(crate) fn insert_ignore_case(&mut self, name: &str, value: V) {
        match self
            .fields
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Gets the value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&V> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Gets the value for a header, ignoring ASCII case in the name.
    #[must_use]
    pub fn get_ignore_case(&self, name: &str) -> Option<&V> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Returns `true` if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes a header.
    pub fn remove(&mut self, name: &str) -> Option<V> {
        let index = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(index).1)
    }

    /// Returns an iterator over all headers in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Returns the header names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N, T, V> FromIterator<(N, T)> for FieldMap<V>
where
    N: Into<String>,
    T: Into<V>,
{
    fn from_iter<I: IntoIterator<Item = (N, T)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<N, T, V> Extend<(N, T)> for FieldMap<V>
where
    N: Into<String>,
    T: Into<V>,
{
    fn extend<I: IntoIterator<Item = (N, T)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl<V> IntoIterator for FieldMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl fmt::Display for EncodedHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            for line in value.values() {
                write!(f, "{name}: {line}\r\n")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_insert_get() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type").unwrap(), &"text/plain");
        assert!(headers.get("content-type").is_none()); // Case sensitive
        assert!(headers.get_ignore_case("content-type").is_some());
    }

    #[test]
    fn test_headers_keep_order() {
        let headers: Headers = [("To", "a@example.com"), ("Subject", "Hi"), ("From", "b@example.com")]
            .into_iter()
            .collect();
        let names: Vec<_> = headers.names().collect();
        assert_eq!(names, ["To", "Subject", "From"]);
    }

    #[test]
    fn test_headers_replace_in_place() {
        let mut headers = Headers::new();
        headers.insert("To", "alice@example.com");
        headers.insert("Subject", "Test");
        let old = headers.insert("To", vec!["bob@example.com", "carol@example.com"]);

        assert_eq!(old.unwrap(), "alice@example.com");
        assert_eq!(headers.names().next(), Some("To"));
        assert_eq!(headers.get("To").unwrap().values().count(), 2);
    }

    #[test]
    fn test_insert_ignore_case_keeps_name() {
        let mut headers = Headers::new();
        headers.insert("content-type", "text/html");
        headers.insert_ignore_case("Content-Type", HeaderValue::from("text/plain"));
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("content-type").unwrap(), &"text/plain");
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.insert("Subject", "Test");
        assert!(headers.contains("Subject"));

        headers.remove("Subject");
        assert!(headers.get("Subject").is_none());
        assert!(headers.remove("Subject").is_none());
    }

    #[test]
    fn test_header_value_first() {
        let value = HeaderValue::from(vec!["one", "two"]);
        assert_eq!(value.first(), Some(&b"one"[..]));
        assert!(value.as_single().is_none());
    }

    #[test]
    fn test_encoded_headers_display() {
        let mut headers = EncodedHeaders::new();
        headers.insert("Subject", EncodedValue::Single("Hello".to_string()));
        headers.insert(
            "Received",
            EncodedValue::Multi(vec!["from a".to_string(), "from b".to_string()]),
        );

        let s = headers.to_string();
        assert_eq!(
            s,
            "Subject: Hello\r\nReceived: from a\r\nReceived: from b\r\n"
        );
    }
}
