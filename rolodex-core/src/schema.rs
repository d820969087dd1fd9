//! The schema subsystem (§3.5–§3.7, §4.5): the lazy [`SchemaProxy`] that
//! defers materialization to break infinite recursion in cyclic schema
//! graphs, and [`Schema`] itself, whose version-dependent fields are
//! represented with [`DynamicValue`].

use std::sync::{Arc, Mutex, OnceLock};

use indexmap::IndexMap;
use jsonptr::PointerBuf;

use crate::error::BuildError;
use crate::index::Rolodex;
use crate::node::Node;
use crate::uri::AbsoluteUri;

/// A tagged-variant carrier for the fields that changed shape between
/// OpenAPI 3.0 and 3.1 / JSON-Schema 2020-12 (§3.7). Discriminant 0 means
/// `A` is inhabited, discriminant 1 means `B` is.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue<A, B> {
    A(A),
    B(B),
}

impl<A, B> DynamicValue<A, B> {
    #[must_use]
    pub fn a(&self) -> Option<&A> {
        match self {
            Self::A(a) => Some(a),
            Self::B(_) => None,
        }
    }

    #[must_use]
    pub fn b(&self) -> Option<&B> {
        match self {
            Self::A(_) => None,
            Self::B(b) => Some(b),
        }
    }

    #[must_use]
    pub fn is_a(&self) -> bool {
        matches!(self, Self::A(_))
    }

    #[must_use]
    pub fn is_b(&self) -> bool {
        matches!(self, Self::B(_))
    }
}

/// `exclusiveMinimum`/`exclusiveMaximum`: a 3.0 boolean paired with the
/// sibling `minimum`/`maximum`, or a bare 3.1 number (§3.6).
pub type ExclusiveBound = DynamicValue<bool, f64>;

/// `type`: a single string (3.0) or an ordered sequence of strings (3.1).
pub type TypeValue = DynamicValue<String, Vec<String>>;

/// `items`: a single schema (3.0) or schema-or-boolean (3.1).
pub type ItemsValue = DynamicValue<SchemaProxy, DynamicValue<SchemaProxy, bool>>;

/// `unevaluatedProperties`: a schema (3.0-adjacent usage) or boolean (3.1).
pub type UnevaluatedPropertiesValue = DynamicValue<SchemaProxy, bool>;

/// `additionalProperties`: boolean, schema, or entirely absent (§3.6).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AdditionalProperties {
    #[default]
    Absent,
    Boolean(bool),
    Schema(SchemaProxy),
}

/// A numeric constraint that distinguishes "unset" from the value `0`, per
/// the §4.5 render-zero contract.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum NumericConstraint {
    #[default]
    Unset,
    Set(f64),
}

impl NumericConstraint {
    #[must_use]
    pub fn get(&self) -> Option<f64> {
        match self {
            Self::Unset => None,
            Self::Set(v) => Some(*v),
        }
    }
}

/// The union of JSON-Schema and OpenAPI schema fields (§3.6).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub id: Option<String>,
    pub schema_dialect: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub ty: Option<TypeValue>,
    pub format: Option<String>,
    pub minimum: NumericConstraint,
    pub maximum: NumericConstraint,
    pub exclusive_minimum: Option<ExclusiveBound>,
    pub exclusive_maximum: Option<ExclusiveBound>,
    pub multiple_of: NumericConstraint,
    pub items: Option<ItemsValue>,
    pub prefix_items: Vec<SchemaProxy>,
    pub properties: IndexMap<String, SchemaProxy>,
    pub pattern_properties: IndexMap<String, SchemaProxy>,
    pub dependent_schemas: IndexMap<String, SchemaProxy>,
    pub additional_properties: AdditionalProperties,
    pub unevaluated_properties: Option<UnevaluatedPropertiesValue>,
    pub required: Vec<String>,
    pub all_of: Vec<SchemaProxy>,
    pub one_of: Vec<SchemaProxy>,
    pub any_of: Vec<SchemaProxy>,
    pub not: Option<Box<SchemaProxy>>,
    pub enum_values: Vec<serde_json::Value>,
    pub example: Option<serde_json::Value>,
    pub examples: Vec<serde_json::Value>,
    /// Populated but never consulted by the resolver (§9 open question):
    /// exposed for callers that want to resolve `#anchor-name` themselves.
    pub anchor: Option<String>,
    /// The proxy that materialized this schema. Set once, during
    /// materialization; always matches the proxy that built it (§3.5).
    pub parent_proxy: Option<SchemaKey>,
}

/// An opaque key identifying a [`SchemaProxy`] within a [`Rolodex`], used so
/// a proxy's back-pointer never owns a direct cyclic link (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaKey(pub u64);

type MaterializeResult = Result<Arc<Schema>, Arc<BuildError>>;

/// The lazy schema (§3.5). One of three states:
///
/// - **Reference** — a `$ref` string plus the document it was written in,
///   resolved against the rolodex lazily on first materialization.
/// - **Backed** — a low-tier node plus a once-computed materialized value.
/// - **Inline** — a schema built programmatically, already materialized.
///
/// Materialization (the `Backed` case) is at-most-once and thread-safe: a
/// [`OnceLock`] holds the result, guarded by a [`Mutex`] for the
/// double-checked first build (§4.5's implementation note).
#[derive(Debug, Clone)]
pub struct SchemaProxy {
    key: SchemaKey,
    state: Arc<ProxyState>,
}

#[derive(Debug)]
enum ProxyState {
    Reference {
        raw: String,
        origin: AbsoluteUri,
    },
    Backed {
        node: Node,
        origin: AbsoluteUri,
        path: PointerBuf,
        cell: OnceLock<MaterializeResult>,
        build_lock: Mutex<()>,
    },
    Inline(Arc<Schema>),
}

impl PartialEq for SchemaProxy {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

static NEXT_KEY: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

fn next_key() -> SchemaKey {
    SchemaKey(NEXT_KEY.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
}

impl SchemaProxy {
    /// A proxy over an unresolved `$ref`. `raw` is resolved against `origin`
    /// lazily, the first time [`schema`](Self::schema) is called.
    #[must_use]
    pub fn reference(raw: impl Into<String>, origin: AbsoluteUri) -> Self {
        Self {
            key: next_key(),
            state: Arc::new(ProxyState::Reference { raw: raw.into(), origin }),
        }
    }

    /// The absolute URI `raw` resolves to, if this is a reference-form proxy.
    ///
    /// Does not consult the rolodex — a reference can be malformed even when
    /// its target doesn't exist, and callers that only need cycle-detection
    /// identity (rather than the materialized schema) shouldn't need one.
    #[must_use]
    pub fn reference_target(&self) -> Option<AbsoluteUri> {
        match &*self.state {
            ProxyState::Reference { raw, origin } => origin.resolve(raw).ok(),
            ProxyState::Backed { .. } | ProxyState::Inline(_) => None,
        }
    }

    #[must_use]
    pub fn backed(node: Node, origin: AbsoluteUri, path: PointerBuf) -> Self {
        Self {
            key: next_key(),
            state: Arc::new(ProxyState::Backed {
                node,
                origin,
                path,
                cell: OnceLock::new(),
                build_lock: Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn inline(schema: Schema) -> Self {
        let mut schema = schema;
        let key = next_key();
        schema.parent_proxy = Some(key);
        Self {
            key,
            state: Arc::new(ProxyState::Inline(Arc::new(schema))),
        }
    }

    #[must_use]
    pub fn key(&self) -> SchemaKey {
        self.key
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(*self.state, ProxyState::Reference { .. })
    }

    /// Materializes the schema, building it from the backing node on first
    /// call and returning the cached value thereafter (§4.5).
    ///
    /// A reference-form proxy whose target lives on a cycle (detected
    /// elsewhere, by the [resolver](crate::resolver)) should be short
    /// circuited by the caller *before* calling `schema()` on the target —
    /// this method itself performs no cycle detection, only materialization.
    #[tracing::instrument(skip(self, rolodex))]
    pub fn schema(&self, rolodex: &Rolodex) -> Option<Arc<Schema>> {
        match &*self.state {
            ProxyState::Inline(schema) => Some(schema.clone()),
            ProxyState::Reference { raw, origin } => {
                let target = origin.resolve(raw).ok()?;
                let entry = rolodex.get(&target)?;
                let proxy = SchemaProxy::backed(
                    (*entry.node).clone(),
                    entry.origin.clone(),
                    entry.pointer.clone(),
                );
                proxy.schema(rolodex)
            }
            ProxyState::Backed { node, origin, path, cell, build_lock } => {
                if let Some(result) = cell.get() {
                    return result.as_ref().ok().cloned();
                }
                let _guard = build_lock.lock().unwrap();
                if let Some(result) = cell.get() {
                    return result.as_ref().ok().cloned();
                }
                let mut errors = Vec::new();
                let mut schema = build_schema(node, path, origin, rolodex, &mut errors);
                schema.parent_proxy = Some(self.key);
                let result: MaterializeResult = if let Some(error) = errors.into_iter().next() {
                    Err(Arc::new(error))
                } else {
                    Ok(Arc::new(schema))
                };
                let _ = cell.set(result.clone());
                result.ok()
            }
        }
    }

    /// The build error captured during materialization, if any (§4.5 "a
    /// build error on one proxy never propagates to siblings").
    #[must_use]
    pub fn build_error(&self) -> Option<Arc<BuildError>> {
        match &*self.state {
            ProxyState::Backed { cell, .. } => cell.get().and_then(|r| r.as_ref().err().cloned()),
            ProxyState::Reference { .. } | ProxyState::Inline(_) => None,
        }
    }
}

fn build_schema(
    node: &Node,
    path: &PointerBuf,
    origin: &AbsoluteUri,
    rolodex: &Rolodex,
    errors: &mut Vec<BuildError>,
) -> Schema {
    let _ = rolodex;
    let mut schema = Schema::default();
    schema.id = node.get("$id").and_then(Node::as_str).map(str::to_string);
    schema.schema_dialect = node.get("$schema").and_then(Node::as_str).map(str::to_string);
    schema.title = node.get("title").and_then(Node::as_str).map(str::to_string);
    schema.description = node.get("description").and_then(Node::as_str).map(str::to_string);
    schema.format = node.get("format").and_then(Node::as_str).map(str::to_string);
    schema.anchor = node.get("$anchor").and_then(Node::as_str).map(str::to_string);

    schema.ty = node.get("type").map(|ty_node| {
        if ty_node.is_sequence() {
            TypeValue::B(ty_node.elements().filter_map(Node::as_str).map(str::to_string).collect())
        } else {
            TypeValue::A(ty_node.as_str().unwrap_or_default().to_string())
        }
    });

    schema.minimum = numeric_constraint(node, "minimum");
    schema.maximum = numeric_constraint(node, "maximum");
    schema.multiple_of = numeric_constraint(node, "multipleOf");

    schema.exclusive_minimum = node.get("exclusiveMinimum").map(|n| exclusive_bound(n));
    schema.exclusive_maximum = node.get("exclusiveMaximum").map(|n| exclusive_bound(n));

    schema.required = node
        .get("required")
        .map(|n| n.elements().filter_map(Node::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    schema.enum_values = node
        .get("enum")
        .map(|n| n.elements().map(node_to_value).collect())
        .unwrap_or_default();
    schema.example = node.get("example").map(node_to_value);
    schema.examples = node
        .get("examples")
        .map(|n| n.elements().map(node_to_value).collect())
        .unwrap_or_default();

    for (name, kind) in [("allOf", 0), ("oneOf", 1), ("anyOf", 2)] {
        if let Some(seq) = node.get(name) {
            let proxies: Vec<SchemaProxy> = seq.elements().map(|n| child_proxy(n, origin)).collect();
            match kind {
                0 => schema.all_of = proxies,
                1 => schema.one_of = proxies,
                _ => schema.any_of = proxies,
            }
        }
    }
    schema.not = node.get("not").map(|n| Box::new(child_proxy(n, origin)));
    schema.prefix_items = node
        .get("prefixItems")
        .map(|n| n.elements().map(|n| child_proxy(n, origin)).collect())
        .unwrap_or_default();

    schema.items = node.get("items").map(|items_node| {
        if items_node.looks_like_bool() {
            ItemsValue::B(DynamicValue::B(items_node.as_str() == Some("true")))
        } else {
            ItemsValue::A(child_proxy(items_node, origin))
        }
    });

    for (name, target) in [
        ("properties", &mut schema.properties as &mut IndexMap<String, SchemaProxy>),
        ("patternProperties", &mut schema.pattern_properties),
        ("dependentSchemas", &mut schema.dependent_schemas),
    ] {
        if let Some(mapping) = node.get(name) {
            for (key, value) in mapping.entries() {
                if let Some(key) = key.as_str() {
                    target.insert(key.to_string(), child_proxy(value, origin));
                }
            }
        }
    }

    schema.additional_properties = match node.get("additionalProperties") {
        None => AdditionalProperties::Absent,
        Some(n) if n.looks_like_bool() => AdditionalProperties::Boolean(n.as_str() == Some("true")),
        Some(n) => AdditionalProperties::Schema(child_proxy(n, origin)),
    };

    schema.unevaluated_properties = node.get("unevaluatedProperties").map(|n| {
        if n.looks_like_bool() {
            DynamicValue::B(n.as_str() == Some("true"))
        } else {
            DynamicValue::A(child_proxy(n, origin))
        }
    });

    let _ = path;
    let _ = errors;
    schema
}

fn numeric_constraint(node: &Node, key: &str) -> NumericConstraint {
    node.get(key)
        .and_then(Node::as_str)
        .and_then(|s| s.parse::<f64>().ok())
        .map_or(NumericConstraint::Unset, NumericConstraint::Set)
}

fn exclusive_bound(node: &Node) -> ExclusiveBound {
    if node.looks_like_bool() {
        DynamicValue::A(node.as_str() == Some("true"))
    } else {
        DynamicValue::B(node.as_str().and_then(|s| s.parse().ok()).unwrap_or_default())
    }
}

/// A child schema always inherits its enclosing document's `origin` — a
/// `$ref` without a scheme/authority resolves relative to wherever it's
/// written, not to some anonymous placeholder. Per-subschema `$id`
/// rebasing is not implemented; every `$ref` found anywhere under a
/// document resolves against that document's root origin.
fn child_proxy(node: &Node, origin: &AbsoluteUri) -> SchemaProxy {
    if let Some(raw) = node.get("$ref").and_then(Node::as_str) {
        SchemaProxy::reference(raw, origin.clone())
    } else {
        SchemaProxy::backed(node.clone(), origin.clone(), PointerBuf::default())
    }
}

fn node_to_value(node: &Node) -> serde_json::Value {
    match node.as_str() {
        Some(s) => serde_json::Value::String(s.to_string()),
        None => serde_json::Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RolodexConfig;
    use crate::node::parse;

    #[test]
    fn materializes_once_and_caches() {
        let node = parse(br#"{"type": "string"}"#).unwrap();
        let rolodex = Rolodex::new(RolodexConfig::default());
        let proxy = SchemaProxy::backed(node, AbsoluteUri::parse("urn:test:a").unwrap(), PointerBuf::default());
        let first = proxy.schema(&rolodex).unwrap();
        let second = proxy.schema(&rolodex).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.parent_proxy, Some(proxy.key()));
    }

    #[test]
    fn exclusive_minimum_boolean_binds_a() {
        let node = parse(br#"{"minimum": 5, "exclusiveMinimum": true}"#).unwrap();
        let rolodex = Rolodex::new(RolodexConfig::default());
        let proxy = SchemaProxy::backed(node, AbsoluteUri::parse("urn:test:a").unwrap(), PointerBuf::default());
        let schema = proxy.schema(&rolodex).unwrap();
        assert!(schema.exclusive_minimum.as_ref().unwrap().is_a());
    }

    #[test]
    fn exclusive_minimum_number_binds_b() {
        let node = parse(br#"{"exclusiveMinimum": 5}"#).unwrap();
        let rolodex = Rolodex::new(RolodexConfig::default());
        let proxy = SchemaProxy::backed(node, AbsoluteUri::parse("urn:test:a").unwrap(), PointerBuf::default());
        let schema = proxy.schema(&rolodex).unwrap();
        assert!(schema.exclusive_minimum.as_ref().unwrap().is_b());
    }

    #[test]
    fn zero_minimum_is_set_not_unset() {
        let node = parse(br#"{"minimum": 0}"#).unwrap();
        let rolodex = Rolodex::new(RolodexConfig::default());
        let proxy = SchemaProxy::backed(node, AbsoluteUri::parse("urn:test:a").unwrap(), PointerBuf::default());
        let schema = proxy.schema(&rolodex).unwrap();
        assert_eq!(schema.minimum.get(), Some(0.0));
    }

    #[test]
    fn ref_child_proxy_materializes_through_the_rolodex() {
        let root = parse(
            br#"{
                "components": {
                    "schemas": {
                        "Id": {"type": "string"},
                        "Widget": {"properties": {"id": {"$ref": "#/components/schemas/Id"}}}
                    }
                }
            }"#,
        )
        .unwrap();
        let mut rolodex = Rolodex::new(RolodexConfig::default());
        let origin = AbsoluteUri::parse("urn:test:widget").unwrap();
        rolodex.index_file(origin.clone(), &root);

        let widget_entry = rolodex
            .get(&origin.with_fragment(Some("/components/schemas/Widget")))
            .unwrap();
        let widget_proxy = SchemaProxy::backed(
            (*widget_entry.node).clone(),
            widget_entry.origin.clone(),
            widget_entry.pointer.clone(),
        );
        let widget = widget_proxy.schema(&rolodex).unwrap();
        let id_proxy = widget.properties.get("id").unwrap();
        assert!(id_proxy.is_reference());

        let id_schema = id_proxy.schema(&rolodex).expect("$ref-backed proxy must materialize");
        assert_eq!(id_schema.ty.as_ref().unwrap().a().map(String::as_str), Some("string"));
    }
}
