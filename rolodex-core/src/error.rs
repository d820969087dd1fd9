//! Error types surfaced by the node layer, low-model builder, rolodex index,
//! reference resolver, and schema subsystem.
//!
//! Parse and build errors are *accumulated*, not raised (§7): callers get a
//! possibly-partial document plus an error list. The [`Error`] enum here is
//! the union used for that list; individual components return their own
//! narrower error type (e.g. [`BuildError`], [`UnresolvedReference`]) and
//! convert into `Error` at the point they're recorded.

use jsonptr::PointerBuf;
use snafu::{Backtrace, Snafu};
use std::fmt;

use crate::uri::AbsoluteUri;

/// A location within a source document: byte offset plus 1-indexed line and
/// column, when known. Used by every error variant that can be pinned to a
/// spot in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Failure parsing a byte buffer into a [`Node`](crate::node::Node) tree
/// (§4.1).
#[derive(Debug, Snafu)]
#[snafu(display("failed to parse document at {location}: {message}"))]
pub struct ParseError {
    pub location: Location,
    pub message: String,
    pub backtrace: Backtrace,
}

/// Failure decoding a single field while building a low-tier entity (§4.2).
/// Recorded against the closest owning entity; siblings continue building.
#[derive(Debug, Snafu)]
#[snafu(display("at {path}: expected {expected}, found {got}"))]
pub struct BuildError {
    pub path: PointerBuf,
    pub expected: &'static str,
    pub got: String,
    pub backtrace: Backtrace,
}

/// A `$ref` whose target could not be found in the rolodex (§4.4).
#[derive(Debug, Snafu)]
#[snafu(display("unresolved reference \"{pointer}\" at {origin}"))]
pub struct UnresolvedReference {
    /// The absolute, normalized pointer the reference resolved to.
    pub pointer: AbsoluteUri,
    /// The URI of the document containing the `$ref`.
    pub origin: AbsoluteUri,
    pub backtrace: Backtrace,
}

/// A reference chain that returns to a pointer already on the visitation
/// stack (§4.4, §8 "Cycle tolerance").
#[derive(Debug, Clone, Snafu)]
#[snafu(display("circular reference detected: {}", chain_display(loop_point, chain)))]
pub struct CircularReference {
    /// The pointer the chain returns to.
    pub loop_point: AbsoluteUri,
    /// The full chain of pointers visited, in traversal order, ending with
    /// `loop_point` again.
    pub chain: Vec<AbsoluteUri>,
    /// `true` if the cycle lives strictly inside an `items`/array construct
    /// or strictly inside `oneOf`/`anyOf`/`allOf`, and the caller configured
    /// the corresponding `ignore_*_circular` flag.
    pub ignored: bool,
}

fn chain_display(loop_point: &AbsoluteUri, chain: &[AbsoluteUri]) -> String {
    let mut s = chain
        .iter()
        .map(AbsoluteUri::as_str)
        .collect::<Vec<_>>()
        .join(" -> ");
    s.push_str(" -> ");
    s.push_str(loop_point.as_str());
    s
}

/// Failure fetching a remote or relative-file document via a
/// [`Loader`](crate::loader::Loader) (§6).
#[derive(Debug, Snafu)]
#[snafu(display("failed to fetch \"{uri}\": {message}"))]
pub struct RemoteFetchError {
    pub uri: AbsoluteUri,
    pub message: String,
    pub backtrace: Backtrace,
}

/// An invalid combination of [`RolodexConfig`](crate::config::RolodexConfig)
/// fields.
#[derive(Debug, Snafu)]
#[snafu(display("invalid configuration: {message}"))]
pub struct InvalidConfiguration {
    pub message: String,
    pub backtrace: Backtrace,
}

/// Work was cancelled mid-flight via the caller's cancellation signal (§5).
#[derive(Debug, Snafu, Clone, Copy, Default)]
#[snafu(display("operation cancelled"))]
pub struct Cancelled;

/// Failure parsing or resolving an [`AbsoluteUri`](crate::uri::AbsoluteUri).
#[derive(Debug, Snafu)]
pub enum UriError {
    #[snafu(display("invalid URL: {source}"))]
    Url { source: url::ParseError },
    #[snafu(display("invalid URN: {source}"))]
    Urn { source: urn::Error },
}

/// The union of error kinds a rolodex session can accumulate (§7).
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(context(false))]
    Parse { source: ParseError },
    #[snafu(context(false))]
    Build { source: BuildError },
    #[snafu(context(false))]
    Unresolved { source: UnresolvedReference },
    #[snafu(context(false))]
    Circular { source: CircularReference },
    #[snafu(context(false))]
    RemoteFetch { source: RemoteFetchError },
    #[snafu(context(false))]
    InvalidConfiguration { source: InvalidConfiguration },
    #[snafu(context(false))]
    Cancelled { source: Cancelled },
}

impl Error {
    /// The JSON pointer or URI the error is anchored to, if any — every
    /// error kind carries one per §7's "all errors carry the offending JSON
    /// pointer" requirement.
    #[must_use]
    pub fn uri(&self) -> Option<&AbsoluteUri> {
        match self {
            Error::Unresolved { source } => Some(&source.pointer),
            Error::Circular { source } => Some(&source.loop_point),
            Error::RemoteFetch { source } => Some(&source.uri),
            Error::Parse { .. }
            | Error::Build { .. }
            | Error::InvalidConfiguration { .. }
            | Error::Cancelled { .. } => None,
        }
    }
}

/// Error equality ignores node identity (backtraces, interior pointers) so
/// tests can assert on error *content* (§7 "Error equality ignores node
/// identity").
impl PartialEq for CircularReference {
    fn eq(&self, other: &Self) -> bool {
        self.loop_point == other.loop_point && self.chain == other.chain
    }
}
