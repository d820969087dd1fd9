//! The node layer (§4.1): parses a byte buffer into a uniform, annotated
//! tree that preserves everything the renderer and diff engine need to be
//! lossless — line, column, tag, anchor, flow/block style, and the original
//! textual form of scalars.
//!
//! YAML and JSON are both lowered into the same [`Node`] shape so every
//! downstream consumer (the low-model builder, the rolodex index, the
//! renderer) is format-independent, per §4.1.

use serde::Deserialize as _;
use serde_yaml::value::TaggedValue;
use snafu::OptionExt as _;
use std::fmt;

use crate::error::{Location, ParseError, ParseSnafu};

/// The shape of a [`Node`]'s content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Document,
    Mapping,
    Sequence,
    Scalar,
    Alias,
}

/// Block or flow layout, retained purely for faithful round-trip (§3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    #[default]
    Block,
    Flow,
}

/// A single atom of the parsed document (§3.1).
///
/// A mapping node's `content` is a flat, alternating key/value sequence —
/// insertion order is authoritative and is never re-sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: Kind,
    /// The YAML/JSON tag, e.g. `tag:yaml.org,2002:str`, or a custom tag.
    pub tag: Option<String>,
    /// Raw scalar text exactly as it appeared in the source, so `0`, `-0`,
    /// and `0.0` remain distinguishable on round-trip (§4.1).
    pub value: Option<String>,
    /// Ordered children: for a mapping, alternating key/value nodes; for a
    /// sequence, the elements; empty for scalars and aliases.
    pub content: Vec<Node>,
    pub line: usize,
    pub column: usize,
    pub anchor: Option<String>,
    pub style: Style,
}

impl Node {
    #[must_use]
    pub fn scalar(value: impl Into<String>) -> Self {
        Self {
            kind: Kind::Scalar,
            tag: None,
            value: Some(value.into()),
            content: Vec::new(),
            line: 0,
            column: 0,
            anchor: None,
            style: Style::Block,
        }
    }

    #[must_use]
    pub fn mapping(content: Vec<Node>) -> Self {
        Self {
            kind: Kind::Mapping,
            tag: None,
            value: None,
            content,
            line: 0,
            column: 0,
            anchor: None,
            style: Style::Block,
        }
    }

    #[must_use]
    pub fn sequence(content: Vec<Node>) -> Self {
        Self {
            kind: Kind::Sequence,
            tag: None,
            value: None,
            content,
            line: 0,
            column: 0,
            anchor: None,
            style: Style::Block,
        }
    }

    #[must_use]
    pub fn is_mapping(&self) -> bool {
        self.kind == Kind::Mapping
    }

    #[must_use]
    pub fn is_sequence(&self) -> bool {
        self.kind == Kind::Sequence
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.kind == Kind::Scalar
    }

    /// Iterates the `(key, value)` pairs of a mapping node. Empty for any
    /// other kind.
    pub fn entries(&self) -> impl Iterator<Item = (&Node, &Node)> {
        let pairs = if self.is_mapping() { self.content.chunks_exact(2) } else { [].chunks_exact(2) };
        pairs.map(|pair| (&pair[0], &pair[1]))
    }

    /// Looks up a mapping value by key name. `O(n)` — mappings in OpenAPI
    /// documents are small.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries()
            .find(|(k, _)| k.value.as_deref() == Some(key))
            .map(|(_, v)| v)
    }

    /// Iterates the elements of a sequence node. Empty for any other kind.
    pub fn elements(&self) -> impl Iterator<Item = &Node> {
        if self.is_sequence() {
            self.content.iter()
        } else {
            [].iter()
        }
    }

    /// The scalar text, if this node is a scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// `true` if the node's scalar text looks like a bare boolean
    /// (`exclusiveMinimum: true` vs `exclusiveMinimum: 5`, §4.5).
    #[must_use]
    pub fn looks_like_bool(&self) -> bool {
        matches!(self.value.as_deref(), Some("true" | "false"))
    }
}

/// Detects YAML vs JSON by the first non-whitespace byte (§4.1) and parses
/// `bytes` into a root [`Node`].
///
/// Multiple YAML documents concatenated in one stream are folded into the
/// first document only; a warning is logged (§4.1).
///
/// # Errors
/// Returns [`ParseError`] if `bytes` is not well-formed YAML or JSON.
pub fn parse(bytes: &[u8]) -> Result<Node, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        ParseSnafu {
            location: Location::default(),
            message: format!("input is not valid utf-8: {e}"),
        }
        .build()
    })?;
    if looks_like_json(text) {
        parse_json(text)
    } else {
        parse_yaml(text)
    }
}

fn looks_like_json(text: &str) -> bool {
    matches!(text.trim_start().as_bytes().first(), Some(b'{' | b'['))
}

fn parse_json(text: &str) -> Result<Node, ParseError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
        ParseSnafu {
            location: Location {
                offset: 0,
                line: e.line(),
                column: e.column(),
            },
            message: e.to_string(),
        }
        .build()
    })?;
    let mut cursor = Cursor::new(text);
    Ok(from_json(&value, &mut cursor))
}

fn from_json(value: &serde_json::Value, cursor: &mut Cursor<'_>) -> Node {
    match value {
        serde_json::Value::Null => scalar_at("null", cursor.locate("null")),
        serde_json::Value::Bool(b) => {
            let text = b.to_string();
            let pos = cursor.locate(&text);
            scalar_at(text, pos)
        }
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            let pos = cursor.locate(&text);
            scalar_at(text, pos)
        }
        serde_json::Value::String(s) => {
            let pos = cursor.locate(&format!("\"{s}\""));
            let mut node = scalar_at(s.clone(), pos);
            node.tag = Some("tag:yaml.org,2002:str".to_string());
            node
        }
        serde_json::Value::Array(items) => {
            let pos = cursor.current();
            let mut node = Node::sequence(items.iter().map(|v| from_json(v, cursor)).collect());
            (node.line, node.column) = pos;
            node
        }
        serde_json::Value::Object(map) => {
            let pos = cursor.current();
            let mut content = Vec::with_capacity(map.len() * 2);
            for (k, v) in map {
                let key_pos = cursor.locate(&format!("\"{k}\""));
                content.push(scalar_at(k.clone(), key_pos));
                content.push(from_json(v, cursor));
            }
            let mut node = Node::mapping(content);
            (node.line, node.column) = pos;
            node
        }
    }
}

fn parse_yaml(text: &str) -> Result<Node, ParseError> {
    let mut docs = serde_yaml::Deserializer::from_str(text);
    let first = docs.next().context(ParseSnafu {
        location: Location::default(),
        message: "empty YAML stream".to_string(),
    })?;
    let value = serde_yaml::Value::deserialize(first).map_err(|e| {
        ParseSnafu {
            location: e
                .location()
                .map(|l| Location {
                    offset: l.index(),
                    line: l.line(),
                    column: l.column(),
                })
                .unwrap_or_default(),
            message: e.to_string(),
        }
        .build()
    })?;
    if docs.next().is_some() {
        tracing::warn!("multiple YAML documents in one stream; only the first is used");
    }
    let mut cursor = Cursor::new(text);
    Ok(from_yaml(&value, &mut cursor))
}

fn from_yaml(value: &serde_yaml::Value, cursor: &mut Cursor<'_>) -> Node {
    match value {
        serde_yaml::Value::Null => scalar_at("null", cursor.locate("null")),
        serde_yaml::Value::Bool(b) => {
            let text = b.to_string();
            let pos = cursor.locate(&text);
            scalar_at(text, pos)
        }
        serde_yaml::Value::Number(n) => {
            let text = n.to_string();
            let pos = cursor.locate(&text);
            scalar_at(text, pos)
        }
        serde_yaml::Value::String(s) => {
            let pos = cursor.locate(s);
            scalar_at(s.clone(), pos)
        }
        serde_yaml::Value::Sequence(items) => {
            let pos = cursor.current();
            let mut node = Node::sequence(items.iter().map(|v| from_yaml(v, cursor)).collect());
            (node.line, node.column) = pos;
            node
        }
        serde_yaml::Value::Mapping(map) => {
            let pos = cursor.current();
            let mut content = Vec::with_capacity(map.len() * 2);
            for (k, v) in map {
                content.push(from_yaml(k, cursor));
                content.push(from_yaml(v, cursor));
            }
            let mut node = Node::mapping(content);
            (node.line, node.column) = pos;
            node
        }
        serde_yaml::Value::Tagged(tagged) => from_tagged(tagged, cursor),
    }
}

fn from_tagged(tagged: &TaggedValue, cursor: &mut Cursor<'_>) -> Node {
    let mut node = from_yaml(&tagged.value, cursor);
    node.tag = Some(tagged.tag.to_string());
    node
}

fn scalar_at(value: impl Into<String>, pos: (usize, usize)) -> Node {
    let mut node = Node::scalar(value);
    (node.line, node.column) = pos;
    node
}

/// A forward-only scan over the original source text, used to recover each
/// node's line/column as the `serde_json`/`serde_yaml` value tree (which
/// carries none) is lowered into [`Node`]s (§3.1).
///
/// Nodes are visited in source order, so the cursor only ever searches
/// ahead of where it last stopped — never before it. `locate` is
/// best-effort: if `needle` isn't found ahead of the cursor (e.g. a JSON
/// string containing a literal `"` or `\`, whose escaped source form isn't
/// the same as its decoded value), the cursor holds still and the node
/// keeps the position it would've had anyway, rather than erroring.
struct Cursor<'t> {
    text: &'t str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'t> Cursor<'t> {
    fn new(text: &'t str) -> Self {
        Self { text, offset: 0, line: 1, column: 1 }
    }

    fn current(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    fn advance_to(&mut self, pos: usize) {
        let pos = pos.min(self.text.len());
        for ch in self.text[self.offset..pos].chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset = pos;
    }

    /// Finds `needle` at or after the current offset, advances past it, and
    /// returns the (line, column) where it starts (1-indexed).
    fn locate(&mut self, needle: &str) -> (usize, usize) {
        if needle.is_empty() {
            return self.current();
        }
        let Some(rel) = self.text[self.offset..].find(needle) else {
            return self.current();
        };
        let start = self.offset + rel;
        self.advance_to(start);
        let at = self.current();
        self.advance_to(start + needle.len());
        at
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Scalar => write!(f, "{}", self.value.as_deref().unwrap_or_default()),
            Kind::Mapping => write!(f, "{{ {} entries }}", self.content.len() / 2),
            Kind::Sequence => write!(f, "[ {} elements ]", self.content.len()),
            Kind::Document | Kind::Alias => write!(f, "<{:?}>", self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_json_by_leading_brace() {
        let node = parse(br#"{"type": "string"}"#).unwrap();
        assert!(node.is_mapping());
        assert_eq!(node.get("type").unwrap().as_str(), Some("string"));
    }

    #[test]
    fn detects_yaml_by_default() {
        let node = parse(b"type: string\n").unwrap();
        assert!(node.is_mapping());
        assert_eq!(node.get("type").unwrap().as_str(), Some("string"));
    }

    #[test]
    fn preserves_original_scalar_form_of_zero() {
        let node = parse(b"minimum: 0\nmaximum: 0.0\n").unwrap();
        assert_eq!(node.get("minimum").unwrap().as_str(), Some("0"));
        assert_eq!(node.get("maximum").unwrap().as_str(), Some("0.0"));
    }

    #[test]
    fn rejects_malformed_input() {
        let err = parse(b"type: [unterminated").unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn yaml_scalars_get_their_own_line_and_column() {
        let node = parse(b"a: 1\nb:\n  type: string\n").unwrap();
        let a = node.get("a").unwrap();
        let b = node.get("b").unwrap();
        let ty = b.get("type").unwrap();
        assert_eq!((a.line, a.column), (1, 4));
        assert!(b.line >= 2);
        assert!(ty.line > b.line, "nested scalar should sit on a later line than its parent key");
    }

    #[test]
    fn json_keys_and_values_get_distinct_positions() {
        let node = parse(b"{\"a\": 1, \"b\": 2}").unwrap();
        let (key_a, val_a) = node.entries().next().unwrap();
        let (key_b, val_b) = node.entries().nth(1).unwrap();
        assert!(key_a.column < val_a.column);
        assert!(key_b.column > val_a.column);
    }
}
