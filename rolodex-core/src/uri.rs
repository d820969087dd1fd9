//! Absolute and relative URI handling for the rolodex.
//!
//! Every file the rolodex indexes is identified by an [`AbsoluteUri`] — a
//! fully qualified [`Url`] for filesystem/HTTP-loaded documents, or a [`Urn`]
//! when a document is registered purely in-memory under a URN. JSON-pointer
//! fragments (`#/components/schemas/Pet`) are carried as the URI's fragment,
//! so a fully resolved reference is always a single `AbsoluteUri`.
//!
//! ```
//! use rolodex_core::uri::AbsoluteUri;
//!
//! let base = AbsoluteUri::parse("https://example.com/a/b.yaml").unwrap();
//! let resolved = base.resolve("../c.yaml#/components/schemas/Pet").unwrap();
//! assert_eq!(resolved.as_str(), "https://example.com/c.yaml#/components/schemas/Pet");
//! ```

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt, path::PathBuf, str::FromStr};

#[doc(no_inline)]
pub use url::Url;
#[doc(no_inline)]
pub use urn::Urn;

use crate::error::UriError;

/// A URI in the form of a fully qualified [`Url`] or [`Urn`].
///
/// Equality and hashing compare the normalized textual form, so two
/// `AbsoluteUri`s with a differently-cased host but identical meaning are
/// treated as equal (per `url`'s own normalization) while fragments are
/// compared verbatim (JSON pointers are case-sensitive).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AbsoluteUri {
    /// A fully qualified URL, e.g. `https://example.com/schema.yaml#/Pet`.
    Url(Url),
    /// A fully qualified URN, e.g. `urn:example:schema#/Pet`.
    Urn(Urn),
}

impl AbsoluteUri {
    /// Attempts to parse an `AbsoluteUri`.
    ///
    /// # Errors
    /// Returns [`UriError`] if `value` can not be parsed as a [`Url`] or
    /// [`Urn`].
    pub fn parse(value: &str) -> Result<Self, UriError> {
        if value.starts_with("urn:") {
            Ok(Urn::from_str(value)
                .map_err(|source| UriError::Urn { source })?
                .into())
        } else {
            Ok(Url::parse(value)
                .map_err(|source| UriError::Url { source })?
                .into())
        }
    }

    #[must_use]
    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }

    #[must_use]
    pub fn is_urn(&self) -> bool {
        matches!(self, Self::Urn(_))
    }

    /// Returns the fragment of the `AbsoluteUri`, if any, without the leading
    /// `#`.
    #[must_use]
    pub fn fragment(&self) -> Option<&str> {
        match self {
            Self::Url(url) => url.fragment(),
            Self::Urn(urn) => urn.q_component(),
        }
    }

    /// Returns this `AbsoluteUri` with its fragment replaced (or removed, if
    /// `fragment` is `None`).
    #[must_use]
    pub fn with_fragment(&self, fragment: Option<&str>) -> Self {
        let mut cloned = self.clone();
        cloned.set_fragment(fragment);
        cloned
    }

    /// Sets (or clears) the fragment in place.
    pub fn set_fragment(&mut self, fragment: Option<&str>) {
        match self {
            Self::Url(url) => url.set_fragment(fragment),
            Self::Urn(urn) => urn.set_q_component(fragment.map(ToString::to_string)),
        }
    }

    /// Returns this `AbsoluteUri` with its fragment removed — i.e. the URI of
    /// the document that owns whatever path the fragment pointed at.
    #[must_use]
    pub fn without_fragment(&self) -> Self {
        self.with_fragment(None)
    }

    /// Returns the path component (for `Url`s) or namespace-specific string
    /// (for `Urn`s), without the fragment.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Url(url) => url.path(),
            Self::Urn(urn) => urn.nss(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(url) => url.as_str(),
            Self::Urn(urn) => urn.as_str(),
        }
    }

    /// Resolves `reference` (absolute, scheme-relative, path-relative, or
    /// fragment-only) against this URI, per §4.3's "resolve relative to the
    /// current file's URI" ordering guarantee.
    ///
    /// # Errors
    /// Returns [`UriError`] if `reference` is not a valid URI and is not a
    /// recognizable relative path/fragment either.
    pub fn resolve(&self, reference: &str) -> Result<Self, UriError> {
        if reference.is_empty() {
            return Ok(self.clone());
        }
        if let Some(frag) = reference.strip_prefix('#') {
            return Ok(self.with_fragment(Some(frag)));
        }
        if let Ok(abs) = Self::parse(reference) {
            return Ok(abs);
        }
        match self {
            Self::Url(base) => {
                let joined = base
                    .join(reference)
                    .map_err(|source| UriError::Url { source })?;
                Ok(joined.into())
            }
            Self::Urn(_) => {
                // URNs have no notion of relative resolution; treat the
                // reference as a new NSS path merged against ours.
                let merged = resolve(self.path(), reference);
                Self::parse(&format!("urn:{merged}"))
            }
        }
    }
}

impl fmt::Debug for AbsoluteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
impl fmt::Display for AbsoluteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<Url> for AbsoluteUri {
    fn from(url: Url) -> Self {
        Self::Url(url)
    }
}
impl From<Urn> for AbsoluteUri {
    fn from(urn: Urn) -> Self {
        Self::Urn(urn)
    }
}
impl FromStr for AbsoluteUri {
    type Err = UriError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
impl TryFrom<String> for AbsoluteUri {
    type Error = UriError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
impl TryFrom<&str> for AbsoluteUri {
    type Error = UriError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
impl From<AbsoluteUri> for String {
    fn from(value: AbsoluteUri) -> Self {
        value.as_str().to_string()
    }
}
impl PartialEq<str> for AbsoluteUri {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}
impl PartialEq<&str> for AbsoluteUri {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Conversion into an [`AbsoluteUri`], implemented for the handful of types
/// callers pass at the public API boundary (`&str`, `String`, `AbsoluteUri`
/// itself).
pub trait TryIntoAbsoluteUri {
    /// Attempts the conversion.
    ///
    /// # Errors
    /// Returns [`UriError`] if the value is not a valid URI.
    fn try_into_absolute_uri(self) -> Result<AbsoluteUri, UriError>;
}
impl TryIntoAbsoluteUri for AbsoluteUri {
    fn try_into_absolute_uri(self) -> Result<AbsoluteUri, UriError> {
        Ok(self)
    }
}
impl TryIntoAbsoluteUri for &AbsoluteUri {
    fn try_into_absolute_uri(self) -> Result<AbsoluteUri, UriError> {
        Ok(self.clone())
    }
}
impl TryIntoAbsoluteUri for &str {
    fn try_into_absolute_uri(self) -> Result<AbsoluteUri, UriError> {
        AbsoluteUri::parse(self)
    }
}
impl TryIntoAbsoluteUri for String {
    fn try_into_absolute_uri(self) -> Result<AbsoluteUri, UriError> {
        AbsoluteUri::parse(&self)
    }
}
impl TryIntoAbsoluteUri for &String {
    fn try_into_absolute_uri(self) -> Result<AbsoluteUri, UriError> {
        AbsoluteUri::parse(self)
    }
}

/// Normalizes a path by removing dot segments, i.e. `.` and `..`.
#[must_use]
pub fn normalize(path: &str) -> Cow<'_, str> {
    let mut normalized = false;
    let mut buf = PathBuf::new();
    for segment in path.split('/') {
        match segment {
            "" | "." if !buf.as_os_str().is_empty() => normalized = true,
            ".." => {
                normalized = true;
                buf.pop();
            }
            seg => buf.push(seg),
        }
    }
    if normalized {
        // safety: path is already utf8
        buf.to_str().unwrap().to_string().into()
    } else {
        path.into()
    }
}

/// Merges two paths, analogous to [`PathBuf::push`] but over UTF-8 strings.
///
/// Does not normalize; see [`resolve`] for dot-segment removal.
#[must_use]
pub fn merge(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        return path.to_string();
    }
    let mut buf = PathBuf::from(base);
    buf.pop();
    buf.push(path);
    buf.to_str().unwrap().to_string()
}

/// Normalizes and merges `base` with `path`.
///
/// ```
/// use rolodex_core::uri::resolve;
/// assert_eq!(resolve("/path/to/other", "../file"), "/path/to/file");
/// ```
#[must_use]
pub fn resolve(base: &str, path: &str) -> String {
    let buf = merge(base, path);
    normalize(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_url_and_urn() {
        assert!(AbsoluteUri::parse("https://example.com/a.yaml").unwrap().is_url());
        assert!(AbsoluteUri::parse("urn:example:a").unwrap().is_urn());
    }

    #[test]
    fn resolves_relative_file_references() {
        let base = AbsoluteUri::parse("https://example.com/a/b.yaml").unwrap();
        let resolved = base.resolve("./c.yaml").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/a/c.yaml");
    }

    #[test]
    fn resolves_parent_relative_references() {
        let base = AbsoluteUri::parse("https://example.com/a/b/c.yaml").unwrap();
        let resolved = base.resolve("../d.yaml").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/a/d.yaml");
    }

    #[test]
    fn resolves_fragment_only_references() {
        let base = AbsoluteUri::parse("https://example.com/a.yaml#/old").unwrap();
        let resolved = base.resolve("#/components/schemas/Pet").unwrap();
        assert_eq!(
            resolved.as_str(),
            "https://example.com/a.yaml#/components/schemas/Pet"
        );
    }

    #[test]
    fn normalize_collapses_dot_segments() {
        assert_eq!(normalize("/a/b/../c"), "/a/c");
        assert_eq!(normalize("/a/./b"), "/a/b");
    }
}
