//! Facade-level errors. Re-exports the engine's error kinds (§7) and adds
//! the handful that only make sense once a [`Document`](crate::Document)
//! exists (build completed with errors, diff/render failures).

pub use rolodex_core::error::{
    BuildError, CircularReference, Error as EngineError, InvalidConfiguration, Location,
    ParseError, RemoteFetchError, UnresolvedReference, UriError,
};

use snafu::Snafu;

/// Errors a [`Document`](crate::Document) session can surface.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(context(false))]
    Engine { source: EngineError },
    #[snafu(context(false))]
    Uri { source: UriError },
    /// The document could not be rendered because a referenced proxy never
    /// materialized (its build error is attached).
    #[snafu(display("cannot render: {source}"))]
    Render { source: std::sync::Arc<BuildError> },
}
