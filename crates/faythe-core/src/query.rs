//! Request path construction.
//!
//! Faythe paths are a collection name, zero or more identifiers and an
//! ordered list of filters. Values are inserted verbatim: nothing is
//! percent-encoded, so callers pass values the service accepts as-is.

use std::fmt::Display;

/// Builder for assembling ordered query parameter pairs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Append a required key/value pair.
    pub fn push<T>(&mut self, key: &'static str, value: T)
    where
        T: Display,
    {
        self.pairs.push((key, value.to_string()));
    }

    /// Borrow the collected pairs in insertion order.
    #[must_use]
    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Build a request path from a base, path segments and query pairs.
///
/// Trailing slashes are stripped from `base`, each segment is appended after
/// a `/`, and the first query pair is introduced with `?`, every later one
/// with `&`, in the order given.
///
/// ```
/// use faythe_core::query::generate_url;
///
/// let url = generate_url("/clouds", &["abc"], &[("tags", "x"), ("tags_any", "y")]);
/// assert_eq!(url, "/clouds/abc?tags=x&tags_any=y");
/// ```
#[must_use]
pub fn generate_url<S, K, V>(base: &str, segments: &[S], query: &[(K, V)]) -> String
where
    S: AsRef<str>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut url = base.trim_end_matches('/').to_string();

    for segment in segments {
        url.push('/');
        url.push_str(segment.as_ref());
    }

    for (index, (key, value)) in query.iter().enumerate() {
        url.push(if index == 0 { '?' } else { '&' });
        url.push_str(key.as_ref());
        url.push('=');
        url.push_str(value.as_ref());
    }

    url
}

/// Join an endpoint and a request path without doubling or dropping the `/`.
#[must_use]
pub fn join_path(endpoint: &str, path: &str) -> String {
    match (endpoint.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", endpoint.trim_end_matches('/'), path),
        (false, false) => format!("{endpoint}/{path}"),
        _ => format!("{endpoint}{path}"),
    }
}
