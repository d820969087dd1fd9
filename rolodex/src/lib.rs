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

//! Cross-document reference resolution, semantic diffing, and lossless
//! YAML/JSON rendering for OpenAPI, Swagger, and JSON-Schema documents.
//!
//! [`Document`] is the entry point: queue one or more sources onto a
//! [`DocumentBuilder`], `build()` them, then query the result through the
//! rolodex index, the lazily-materializing schema proxies, [`diff::compare`],
//! or [`render`].
//!
//! ```
//! use rolodex::Document;
//!
//! let document = Document::builder()
//!     .add_source("https://example.com/openapi.json", &br#"{
//!         "info": {"title": "Example", "version": "1.0.0"},
//!         "components": {"schemas": {"Pet": {"type": "object"}}}
//!     }"#[..])
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(document.info().unwrap().title(), "Example");
//! ```

pub mod diff;
pub mod document;
pub mod error;
pub mod high;
pub mod render;

pub use document::{Document, DocumentBuilder};
pub use error::Error;
pub use high::{Contact, Info};
