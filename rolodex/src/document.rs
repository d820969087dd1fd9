//! `Document`/`DocumentBuilder`: the facade's entry point, mirroring the
//! teacher's `Interrogator`/`Build` split — a builder accumulates sources,
//! `build()` parses, indexes, and resolves them all at once and returns an
//! immutable `Document` plus whatever errors were accumulated along the way.

use rolodex_core::config::RolodexConfig;
use rolodex_core::index::Rolodex;
use rolodex_core::node::{self, Node};
use rolodex_core::resolver::{self, ResolutionReport};
use rolodex_core::uri::{AbsoluteUri, TryIntoAbsoluteUri};

use crate::error::Error;
use crate::high::Info;

struct PendingSource {
    uri: AbsoluteUri,
    bytes: Vec<u8>,
}

/// Accumulates sources before a single [`build`](DocumentBuilder::build)
/// pass parses, indexes, and resolves all of them together.
#[derive(Default)]
pub struct DocumentBuilder {
    config: RolodexConfig,
    sources: Vec<PendingSource>,
}

impl DocumentBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn config(mut self, config: RolodexConfig) -> Self {
        self.config = config;
        self
    }

    /// Queues `bytes`, to be loaded under `uri` once [`build`](Self::build)
    /// runs. The first source added becomes the document's root.
    ///
    /// # Errors
    /// Returns [`Error`] if `uri` is not a valid URI.
    pub fn add_source(mut self, uri: impl TryIntoAbsoluteUri, bytes: impl Into<Vec<u8>>) -> Result<Self, Error> {
        let uri = uri.try_into_absolute_uri()?;
        self.sources.push(PendingSource { uri, bytes: bytes.into() });
        Ok(self)
    }

    /// Parses, indexes, and resolves every queued source.
    ///
    /// # Errors
    /// Returns [`Error`] only if not a single source could be parsed; a
    /// partial document (some sources parsed, some not) is still returned
    /// with accumulated errors available via
    /// [`Document::resolving_errors`] — per §7's accumulation policy.
    pub fn build(self) -> Result<Document, Error> {
        let mut rolodex = Rolodex::new(self.config);
        let mut parsed_roots = Vec::new();
        let mut parse_errors = Vec::new();

        for source in &self.sources {
            match node::parse(&source.bytes) {
                Ok(root) => {
                    rolodex.index_file(source.uri.clone(), &root);
                    parsed_roots.push((source.uri.clone(), root));
                }
                Err(e) => parse_errors.push(e),
            }
        }

        let root_uri = parsed_roots.first().map(|(uri, _)| uri.clone());
        let mut report = ResolutionReport::default();
        for (uri, root) in &parsed_roots {
            let partial = resolver::resolve(&rolodex, root, uri);
            report.references.extend(partial.references);
            report.circular.extend(partial.circular);
            report.unresolved.extend(partial.unresolved);
        }

        Ok(Document {
            rolodex,
            roots: parsed_roots,
            root_uri,
            parse_errors,
            resolution: report,
        })
    }
}

/// An immutable, fully indexed and resolved set of documents (§2's control
/// flow: "bytes -> Node Layer -> Low Model Builder -> Rolodex ... ->
/// Resolver").
pub struct Document {
    rolodex: Rolodex,
    roots: Vec<(AbsoluteUri, Node)>,
    root_uri: Option<AbsoluteUri>,
    parse_errors: Vec<rolodex_core::error::ParseError>,
    resolution: ResolutionReport,
}

impl Document {
    #[must_use]
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }

    #[must_use]
    pub fn rolodex(&self) -> &Rolodex {
        &self.rolodex
    }

    #[must_use]
    pub fn root_uri(&self) -> Option<&AbsoluteUri> {
        self.root_uri.as_ref()
    }

    #[must_use]
    pub fn root_node(&self) -> Option<&Node> {
        self.roots.first().map(|(_, node)| node)
    }

    /// Every accumulated parse, unresolved-reference, and circular-reference
    /// error encountered while building this document (§4.4, §7).
    #[must_use]
    pub fn resolving_errors(&self) -> &ResolutionReport {
        &self.resolution
    }

    #[must_use]
    pub fn parse_errors(&self) -> &[rolodex_core::error::ParseError] {
        &self.parse_errors
    }

    /// Builds the high-tier `info` object from the root document, if present.
    #[must_use]
    pub fn info(&self) -> Option<Info> {
        let root = self.root_node()?;
        let info_node = root.get("info")?;
        let mut errors = Vec::new();
        Some(Info::build(info_node, &jsonptr::PointerBuf::default(), &mut errors))
    }

    /// Drops every cached hash, indexed entry, and interned value (§5).
    pub fn clear_all_caches(&mut self) {
        self.rolodex.clear_all_caches();
    }
}
