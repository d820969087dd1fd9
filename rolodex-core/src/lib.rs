#![cfg_attr(all(doc, CHANNEL_NIGHTLY), feature(doc_auto_cfg))]
#![cfg_attr(doc_cfg, feature(doc_cfg))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::result_large_err,
    clippy::enum_glob_use,
    clippy::implicit_hasher,
    clippy::needless_pass_by_value,
    clippy::similar_names,
    clippy::missing_errors_doc,
    clippy::wildcard_imports,
    clippy::module_inception
)]
#![cfg_attr(test, allow(clippy::too_many_lines))]

//! The engine crate behind `rolodex`: parsing, cross-file indexing,
//! reference resolution, and schema materialization for OpenAPI/Swagger/
//! JSON-Schema documents.
//!
//! This crate has no notion of "document" semantics beyond what the index
//! needs to recognize well-known containers (`paths`, `components/schemas`,
//! ...) — the facade crate builds the ergonomic high tier on top of it.
//!
//! ```
//! use rolodex_core::{config::RolodexConfig, index::Rolodex, node, uri::AbsoluteUri};
//!
//! let root = node::parse(br#"{"components": {"schemas": {"Pet": {"type": "object"}}}}"#).unwrap();
//! let mut rolodex = Rolodex::new(RolodexConfig::default());
//! let uri = AbsoluteUri::parse("https://example.com/openapi.json").unwrap();
//! rolodex.index_file(uri.clone(), &root);
//! let pointer = "/components/schemas/Pet".parse().unwrap();
//! assert!(rolodex.file(&uri).unwrap().get(&pointer).is_some());
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod index;
pub mod loader;
pub mod low;
pub mod node;
pub mod resolver;
pub mod schema;
pub mod uri;

pub use config::RolodexConfig;
pub use error::Error;
pub use index::{IndexedEntry, Rolodex};
pub use node::Node;
pub use schema::{Schema, SchemaProxy};
pub use uri::AbsoluteUri;
