//! The rolodex / index (§4.3): for every indexed file, enumerate every
//! definition under the configured well-known container paths, hash each,
//! and map normalized absolute JSON-pointers to [`IndexedEntry`] values.
//!
//! A [`Rolodex`] composes one [`FileIndex`] per loaded file and owns the
//! process-wide value cache, mirroring `grill-core`'s `Sources`/`Schemas`
//! split between per-source storage and a shared interning cache.

use ahash::AHashMap;
use jsonptr::PointerBuf;
use std::sync::Arc;

use crate::cache::Values;
use crate::config::RolodexConfig;
use crate::error::{BuildError, RemoteFetchError};
use crate::node::Node;
use crate::uri::AbsoluteUri;

/// Default set of top-level containers walked for indexable definitions,
/// per §4.3 ("paths, components/schemas, components/responses, ...").
pub const DEFAULT_CONTAINERS: &[&str] = &[
    "paths",
    "components/schemas",
    "components/responses",
    "components/parameters",
    "components/requestBodies",
    "components/headers",
    "components/examples",
    "components/links",
    "components/callbacks",
    "definitions",
    "parameters",
    "responses",
];

/// An entry in the index: the node at `pointer`, its content hash, where it
/// came from, and who points at it (§3.3).
#[derive(Debug, Clone)]
pub struct IndexedEntry {
    pub pointer: PointerBuf,
    pub node: Arc<Node>,
    pub content_hash: u64,
    pub origin: AbsoluteUri,
    pub back_references: Vec<PointerBuf>,
}

/// The set of indexed entries for a single loaded file, in source order.
#[derive(Debug, Default)]
pub struct FileIndex {
    pub uri: AbsoluteUri,
    entries: AHashMap<PointerBuf, IndexedEntry>,
    order: Vec<PointerBuf>,
}

impl FileIndex {
    #[must_use]
    pub fn new(uri: AbsoluteUri) -> Self {
        Self {
            uri,
            entries: AHashMap::new(),
            order: Vec::new(),
        }
    }

    /// Walks `root`, indexing every direct child of each container named in
    /// `containers` under a pointer rooted at that container.
    #[tracing::instrument(skip(self, root), fields(uri = %self.uri))]
    pub fn index(&mut self, root: &Node, containers: &[&str]) {
        for container in containers {
            let mut pointer = PointerBuf::default();
            for token in container.split('/') {
                pointer.push_back(jsonptr::Token::from(token));
            }
            let Some(node) = resolve_pointer(root, &pointer) else {
                continue;
            };
            if !node.is_mapping() {
                continue;
            }
            for (key, value) in node.entries() {
                let Some(name) = key.as_str() else { continue };
                let mut entry_pointer = pointer.clone();
                entry_pointer.push_back(jsonptr::Token::from(name));
                self.insert(entry_pointer, value.clone());
            }
        }
    }

    fn insert(&mut self, pointer: PointerBuf, node: Node) {
        let content_hash = hash_node(&node);
        let entry = IndexedEntry {
            pointer: pointer.clone(),
            node: Arc::new(node),
            content_hash,
            origin: self.uri.clone(),
            back_references: Vec::new(),
        };
        if !self.entries.contains_key(&pointer) {
            self.order.push(pointer.clone());
        }
        self.entries.insert(pointer, entry);
    }

    #[must_use]
    pub fn get(&self, pointer: &PointerBuf) -> Option<&IndexedEntry> {
        self.entries.get(pointer)
    }

    pub fn record_back_reference(&mut self, target: &PointerBuf, from: PointerBuf) {
        if let Some(entry) = self.entries.get_mut(target) {
            entry.back_references.push(from);
        }
    }

    /// Entries in source order (§4.3 "within one file, entries appear in
    /// source order").
    pub fn entries_in_order(&self) -> impl Iterator<Item = &IndexedEntry> {
        self.order.iter().filter_map(move |p| self.entries.get(p))
    }
}

/// Composes multiple [`FileIndex`]es and the shared value cache. The root
/// aggregate callers build documents against (§4.3).
#[derive(Debug, Default)]
pub struct Rolodex {
    config: RolodexConfig,
    files: AHashMap<AbsoluteUri, FileIndex>,
    /// Insertion order of files, by URI — across files, insertion order
    /// follows first-reference order (§4.3).
    file_order: Vec<AbsoluteUri>,
    values: Values,
    pub errors: Vec<BuildError>,
}

impl Rolodex {
    #[must_use]
    pub fn new(config: RolodexConfig) -> Self {
        Self {
            config,
            files: AHashMap::new(),
            file_order: Vec::new(),
            values: Values::default(),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RolodexConfig {
        &self.config
    }

    /// Indexes `root`, loaded from `uri`, against the default container set.
    #[tracing::instrument(skip(self, root), fields(uri = %uri))]
    pub fn index_file(&mut self, uri: AbsoluteUri, root: &Node) {
        self.index_file_with_containers(uri, root, DEFAULT_CONTAINERS);
    }

    pub fn index_file_with_containers(&mut self, uri: AbsoluteUri, root: &Node, containers: &[&str]) {
        let mut file_index = FileIndex::new(uri.clone());
        file_index.index(root, containers);
        if !self.files.contains_key(&uri) {
            self.file_order.push(uri.clone());
        }
        self.files.insert(uri, file_index);
    }

    #[must_use]
    pub fn file(&self, uri: &AbsoluteUri) -> Option<&FileIndex> {
        self.files.get(uri)
    }

    pub fn file_mut(&mut self, uri: &AbsoluteUri) -> Option<&mut FileIndex> {
        self.files.get_mut(uri)
    }

    #[must_use]
    pub fn contains_file(&self, uri: &AbsoluteUri) -> bool {
        self.files.contains_key(uri)
    }

    /// Looks up an entry by its fully resolved `AbsoluteUri` (file URI plus
    /// fragment pointer).
    #[must_use]
    pub fn get(&self, uri: &AbsoluteUri) -> Option<&IndexedEntry> {
        let file_uri = uri.without_fragment();
        let pointer = uri.fragment().unwrap_or_default();
        let pointer: PointerBuf = format!("/{}", pointer.trim_start_matches('/')).parse().ok()?;
        self.files.get(&file_uri)?.get(&pointer)
    }

    /// Interns `value`, returning a shared allocation for structurally
    /// identical values (backs the §5 process-wide value cache).
    pub fn intern(&mut self, value: &serde_json::Value) -> Arc<serde_json::Value> {
        self.values.get_or_insert(value)
    }

    /// Drops every cached hash, indexed entry, and interned value (§5
    /// `clear-all-caches()`).
    pub fn clear_all_caches(&mut self) {
        self.files.clear();
        self.file_order.clear();
        self.values.clear();
        self.errors.clear();
    }

    pub fn record_remote_fetch_failure(&mut self, _error: &RemoteFetchError) {
        tracing::warn!("remote fetch failed while expanding the rolodex");
    }
}

fn resolve_pointer<'n>(root: &'n Node, pointer: &PointerBuf) -> Option<&'n Node> {
    let mut current = root;
    for token in pointer.tokens() {
        current = current.get(token.decoded().as_ref())?;
    }
    Some(current)
}

/// A stable 64-bit content hash over a node subtree, order-stable over
/// mappings (insertion order participates in the hash, since two mappings
/// with the same keys in different orders are different source texts even
/// if semantically equivalent) — used for the diff engine's fast equality
/// short-circuit (§4.6).
#[must_use]
pub fn hash_node(node: &Node) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = ahash::AHasher::default();
    hash_node_into(node, &mut hasher);
    hasher.finish()
}

fn hash_node_into(node: &Node, hasher: &mut impl std::hash::Hasher) {
    use std::hash::Hash;
    node.kind.hash(&mut HasherWrapper(hasher));
    node.tag.hash(&mut HasherWrapper(hasher));
    node.value.hash(&mut HasherWrapper(hasher));
    for child in &node.content {
        hash_node_into(child, hasher);
    }
}

struct HasherWrapper<'h, H: ?Sized>(&'h mut H);
impl<H: std::hash::Hasher + ?Sized> std::hash::Hasher for HasherWrapper<'_, H> {
    fn finish(&self) -> u64 {
        self.0.finish()
    }
    fn write(&mut self, bytes: &[u8]) {
        self.0.write(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::parse;

    fn uri(s: &str) -> AbsoluteUri {
        AbsoluteUri::parse(s).unwrap()
    }

    #[test]
    fn indexes_schemas_under_components() {
        let root = parse(
            br#"{
                "components": {
                    "schemas": {
                        "Pet": { "type": "object" },
                        "Toy": { "type": "string" }
                    }
                }
            }"#,
        )
        .unwrap();
        let mut file_index = FileIndex::new(uri("https://example.com/a.json"));
        file_index.index(&root, DEFAULT_CONTAINERS);
        let names: Vec<_> = file_index
            .entries_in_order()
            .map(|e| e.pointer.to_string())
            .collect();
        assert_eq!(names, vec!["/components/schemas/Pet", "/components/schemas/Toy"]);
    }

    #[test]
    fn identical_subtrees_hash_equal() {
        let a = parse(br#"{"type": "string"}"#).unwrap();
        let b = parse(br#"{"type": "string"}"#).unwrap();
        assert_eq!(hash_node(&a), hash_node(&b));
    }

    #[test]
    fn clear_all_caches_drops_every_file() {
        let root = parse(br#"{"components": {"schemas": {"Pet": {"type": "object"}}}}"#).unwrap();
        let mut rolodex = Rolodex::new(RolodexConfig::default());
        rolodex.index_file(uri("https://example.com/a.json"), &root);
        assert!(rolodex.contains_file(&uri("https://example.com/a.json")));
        rolodex.clear_all_caches();
        assert!(!rolodex.contains_file(&uri("https://example.com/a.json")));
    }
}
