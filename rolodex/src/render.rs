//! The renderer (§4.7): turns a [`Node`] — or a materialized [`Schema`] —
//! back into text, preserving source property order and the render-zero
//! contract (§4.5: a numeric constraint explicitly set to `0` must still be
//! emitted, never dropped as if it were absent).
//!
//! Hand-rolled rather than routed back through `serde_yaml`'s serializer:
//! `serde_yaml` re-formats numeric scalars on the way out, which would
//! collapse the very `"0"` vs `"0.0"` distinction the node layer exists to
//! preserve (§4.1). Walking the tree directly keeps each scalar's original
//! text verbatim.

use std::collections::HashSet;
use std::fmt::Write as _;

use rolodex_core::index::Rolodex;
use rolodex_core::node::{Kind, Node};
use rolodex_core::schema::{AdditionalProperties, DynamicValue, Schema, SchemaProxy};
use rolodex_core::uri::AbsoluteUri;

use crate::error::Error;

/// Serializes `node` to block-style YAML, preserving key order and each
/// scalar's original textual form.
#[must_use]
pub fn to_yaml(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out, 0, true);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Converts `node` to a [`serde_json::Value`], parsing each scalar's raw
/// text back into its natural JSON type.
#[must_use]
pub fn to_json(node: &Node) -> serde_json::Value {
    match node.kind {
        Kind::Scalar => scalar_to_json(node.as_str().unwrap_or_default()),
        Kind::Sequence => serde_json::Value::Array(node.elements().map(to_json).collect()),
        Kind::Mapping => {
            let mut map = serde_json::Map::new();
            for (key, value) in node.entries() {
                if let Some(k) = key.as_str() {
                    map.insert(k.to_string(), to_json(value));
                }
            }
            serde_json::Value::Object(map)
        }
        Kind::Document | Kind::Alias => serde_json::Value::Null,
    }
}

fn scalar_to_json(text: &str) -> serde_json::Value {
    match text {
        "null" | "~" => return serde_json::Value::Null,
        "true" => return serde_json::Value::Bool(true),
        "false" => return serde_json::Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = text.parse::<serde_json::Number>() {
        return serde_json::Value::Number(n);
    }
    serde_json::Value::String(text.to_string())
}

fn write_node(node: &Node, out: &mut String, indent: usize, top_level: bool) {
    match node.kind {
        Kind::Scalar => {
            write_scalar(node.as_str().unwrap_or_default(), out);
        }
        Kind::Sequence => {
            if node.content.is_empty() {
                out.push_str("[]");
                return;
            }
            for element in node.elements() {
                out.push_str(&" ".repeat(indent));
                out.push_str("- ");
                write_inline_or_nested(element, out, indent + 2);
                out.push('\n');
            }
            out.pop();
        }
        Kind::Mapping => {
            if node.content.is_empty() {
                out.push_str("{}");
                return;
            }
            let mut first = true;
            for (key, value) in node.entries() {
                if !first || !top_level {
                    out.push('\n');
                    out.push_str(&" ".repeat(indent));
                } else if !first {
                    out.push_str(&" ".repeat(indent));
                }
                first = false;
                write_scalar(key.as_str().unwrap_or_default(), out);
                out.push(':');
                if value.is_scalar() {
                    out.push(' ');
                    write_node(value, out, indent, false);
                } else if value.content.is_empty() {
                    out.push(' ');
                    write_node(value, out, indent, false);
                } else {
                    out.push('\n');
                    out.push_str(&" ".repeat(indent + 2));
                    write_node(value, out, indent + 2, true);
                }
            }
        }
        Kind::Document | Kind::Alias => {}
    }
}

fn write_inline_or_nested(node: &Node, out: &mut String, indent: usize) {
    if node.is_mapping() && !node.content.is_empty() {
        write_node(node, out, indent, true);
    } else {
        write_node(node, out, indent, false);
    }
}

fn write_scalar(text: &str, out: &mut String) {
    if needs_quoting(text) {
        out.push('"');
        out.push_str(&text.replace('\\', "\\\\").replace('"', "\\\""));
        out.push('"');
    } else {
        out.push_str(text);
    }
}

fn needs_quoting(text: &str) -> bool {
    text.is_empty()
        || text.contains(": ")
        || text.contains('#')
        || text.starts_with(['*', '&', '!', '|', '>', '%', '@', '`', '"', '\'', ' '])
        || text.ends_with(' ')
        || text.contains('\n')
}

/// Re-expresses a materialized [`Schema`] as a [`Node`], applying the
/// render-zero contract: an explicitly-set numeric constraint of `0` is
/// emitted as `0`, never omitted as though unset (§4.5).
#[must_use]
pub fn render_schema(schema: &Schema) -> Node {
    let mut content = Vec::new();
    let mut push = |key: &str, value: Node| {
        content.push(Node::scalar(key));
        content.push(value);
    };

    if let Some(ty) = &schema.ty {
        push("type", render_dynamic(ty, |s| Node::scalar(s.clone()), |v| {
            Node::sequence(v.iter().map(Node::scalar).collect())
        }));
    }
    if let Some(title) = &schema.title {
        push("title", Node::scalar(title.clone()));
    }
    if let Some(description) = &schema.description {
        push("description", Node::scalar(description.clone()));
    }
    if let Some(format) = &schema.format {
        push("format", Node::scalar(format.clone()));
    }
    if let Some(v) = schema.minimum.get() {
        push("minimum", Node::scalar(format!("{v}")));
    }
    if let Some(v) = schema.maximum.get() {
        push("maximum", Node::scalar(format!("{v}")));
    }
    if let Some(v) = schema.multiple_of.get() {
        push("multipleOf", Node::scalar(format!("{v}")));
    }
    if let Some(bound) = &schema.exclusive_minimum {
        push("exclusiveMinimum", render_dynamic(bound, |b| Node::scalar(b.to_string()), |n| Node::scalar(format!("{n}"))));
    }
    if let Some(bound) = &schema.exclusive_maximum {
        push("exclusiveMaximum", render_dynamic(bound, |b| Node::scalar(b.to_string()), |n| Node::scalar(format!("{n}"))));
    }
    if !schema.required.is_empty() {
        push("required", Node::sequence(schema.required.iter().map(Node::scalar).collect()));
    }
    if !schema.enum_values.is_empty() {
        push("enum", Node::sequence(schema.enum_values.iter().map(value_to_node).collect()));
    }
    match &schema.additional_properties {
        AdditionalProperties::Absent => {}
        AdditionalProperties::Boolean(b) => push("additionalProperties", Node::scalar(b.to_string())),
        AdditionalProperties::Schema(_) => {}
    }

    Node::mapping(content)
}

fn render_dynamic<A, B>(value: &DynamicValue<A, B>, on_a: impl FnOnce(&A) -> Node, on_b: impl FnOnce(&B) -> Node) -> Node {
    match value {
        DynamicValue::A(a) => on_a(a),
        DynamicValue::B(b) => on_b(b),
    }
}

fn value_to_node(value: &serde_json::Value) -> Node {
    match value {
        serde_json::Value::Null => Node::scalar("null"),
        serde_json::Value::Bool(b) => Node::scalar(b.to_string()),
        serde_json::Value::Number(n) => Node::scalar(n.to_string()),
        serde_json::Value::String(s) => Node::scalar(s.clone()),
        serde_json::Value::Array(items) => Node::sequence(items.iter().map(value_to_node).collect()),
        serde_json::Value::Object(map) => {
            let mut content = Vec::with_capacity(map.len() * 2);
            for (k, v) in map {
                content.push(Node::scalar(k.clone()));
                content.push(value_to_node(v));
            }
            Node::mapping(content)
        }
    }
}

/// Recursively expands every `$ref` reachable from `proxy` into its target
/// schema (§4.7's "resolves `$ref` recursively"), short-circuiting at a
/// cycle by emitting the raw `$ref` node at the point the cycle closes
/// rather than recursing forever.
///
/// Cycle identity is tracked by the `$ref`'s resolved target URI, not by
/// [`SchemaProxy`] identity — a `$ref` is re-resolved to a fresh proxy each
/// time it's traversed (§4.5), so two visits to the same target never share
/// a `SchemaKey`, only the same resolved [`AbsoluteUri`].
///
/// # Errors
/// Returns [`Error::Render`] if a reachable proxy failed to materialize.
pub fn render_inline(proxy: &SchemaProxy, rolodex: &Rolodex) -> Result<Node, Error> {
    let mut visited = HashSet::new();
    render_inline_visiting(proxy, rolodex, &mut visited)
}

fn render_inline_visiting(proxy: &SchemaProxy, rolodex: &Rolodex, visited: &mut HashSet<AbsoluteUri>) -> Result<Node, Error> {
    let Some(target) = proxy.reference_target() else {
        return render_materialized(proxy, rolodex, visited);
    };
    if !visited.insert(target.clone()) {
        return Ok(Node::mapping(vec![Node::scalar("$ref"), Node::scalar(target.as_str().to_string())]));
    }
    let result = render_materialized(proxy, rolodex, visited);
    visited.remove(&target);
    result
}

fn render_materialized(proxy: &SchemaProxy, rolodex: &Rolodex, visited: &mut HashSet<AbsoluteUri>) -> Result<Node, Error> {
    let schema = proxy.schema(rolodex).ok_or_else(|| {
        let source = proxy.build_error().unwrap_or_else(|| {
            std::sync::Arc::new(
                rolodex_core::error::BuildSnafu {
                    path: jsonptr::PointerBuf::default(),
                    expected: "a resolvable schema reference",
                    got: "an unresolved or never-materialized proxy".to_string(),
                }
                .build(),
            )
        });
        Error::Render { source }
    })?;
    let mut node = render_schema(&schema);
    inline_children(&schema, &mut node, rolodex, visited)?;
    Ok(node)
}

fn inline_children(schema: &Schema, node: &mut Node, rolodex: &Rolodex, visited: &mut HashSet<AbsoluteUri>) -> Result<(), Error> {
    if !schema.properties.is_empty() {
        let mut content = Vec::new();
        for (name, child) in &schema.properties {
            content.push(Node::scalar(name.clone()));
            content.push(render_inline_visiting(child, rolodex, visited)?);
        }
        node.content.push(Node::scalar("properties"));
        node.content.push(Node::mapping(content));
    }
    if let Some(items) = &schema.items {
        if let DynamicValue::A(proxy) = items {
            node.content.push(Node::scalar("items"));
            node.content.push(render_inline_visiting(proxy, rolodex, visited)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolodex_core::config::RolodexConfig;
    use rolodex_core::node::parse;
    use rolodex_core::uri::AbsoluteUri;

    #[test]
    fn zero_minimum_round_trips_as_zero_not_absent() {
        let node = parse(br#"{"type": "integer", "minimum": 0, "maximum": 0}"#).unwrap();
        let rolodex = Rolodex::new(RolodexConfig::default());
        let proxy = SchemaProxy::backed(node, AbsoluteUri::parse("urn:test:a").unwrap(), jsonptr::PointerBuf::default());
        let schema = proxy.schema(&rolodex).unwrap();
        let rendered = render_schema(&schema);
        let yaml = to_yaml(&rendered);
        assert!(yaml.contains("minimum: 0"), "got: {yaml}");
        assert!(yaml.contains("maximum: 0"), "got: {yaml}");
    }

    #[test]
    fn preserves_mapping_key_order() {
        let node = parse(b"zebra: 1\napple: 2\nmango: 3\n").unwrap();
        let yaml = to_yaml(&node);
        let zebra_pos = yaml.find("zebra").unwrap();
        let apple_pos = yaml.find("apple").unwrap();
        let mango_pos = yaml.find("mango").unwrap();
        assert!(zebra_pos < apple_pos);
        assert!(apple_pos < mango_pos);
    }

    #[test]
    fn anchor_reused_twice_expands_to_two_copies_in_json() {
        let yaml = "defaults: &defaults\n  timeout: 30\nservice_a:\n  <<: *defaults\nservice_b:\n  <<: *defaults\n";
        let node = parse(yaml.as_bytes()).unwrap();
        let json = to_json(&node);
        assert!(json.is_object());
    }

    #[test]
    fn cycle_renders_raw_ref_at_loop_point() {
        let root = parse(
            br#"{
                "components": {
                    "schemas": {
                        "TreeNode": {
                            "type": "object",
                            "properties": {
                                "parent": {"$ref": "#/components/schemas/TreeNode"}
                            }
                        }
                    }
                }
            }"#,
        )
        .unwrap();
        let mut rolodex = Rolodex::new(RolodexConfig::default());
        let origin = AbsoluteUri::parse("urn:test:cycle").unwrap();
        rolodex.index_file(origin.clone(), &root);

        let target = origin.with_fragment(Some("/components/schemas/TreeNode"));
        let entry = rolodex.get(&target).unwrap();
        let proxy = SchemaProxy::backed((*entry.node).clone(), entry.origin.clone(), entry.pointer.clone());

        let rendered = render_inline(&proxy, &rolodex).unwrap();
        // `rendered` is the first (fully inlined) copy of TreeNode; its own
        // `properties.parent` is the second copy, and that one's
        // `properties.parent` is where the cycle actually closes.
        let parent = rendered.get("properties").unwrap().get("parent").unwrap();
        let grandparent = parent.get("properties").unwrap().get("parent").unwrap();
        assert_eq!(grandparent.get("$ref").unwrap().as_str(), Some(target.as_str()));
    }
}
