//! The low tier (§3.2, §4.2): thin, lossless entities built directly from
//! [`Node`] trees. Every field keeps a back-pointer to the key node and the
//! value node it was decoded from, so the renderer can re-emit a field
//! exactly where (and how) it was written, and the diff engine can report a
//! precise location for a change.
//!
//! Unknown keys are never dropped — they are collected into `extensions` (if
//! prefixed `x-`) or `unknown_fields` (otherwise), per §4.2's "nothing is
//! silently discarded" invariant.

use indexmap::IndexMap;
use jsonptr::{PointerBuf, Token};

use crate::error::{BuildError, BuildSnafu};
use crate::node::Node;

/// A decoded field value paired with the two nodes it came from.
///
/// Cloning a `NodeReference` clones the decoded value cheaply (most low-tier
/// fields are small) and shares nothing with the source tree — the [`Node`]s
/// are cloned too, since the low tier owns its own copy of the parsed
/// document per §3.2.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReference<T> {
    pub value: T,
    pub key_node: Option<Node>,
    pub value_node: Node,
}

impl<T> NodeReference<T> {
    #[must_use]
    pub fn new(value: T, key_node: Option<Node>, value_node: Node) -> Self {
        Self {
            value,
            key_node,
            value_node,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> NodeReference<U> {
        NodeReference {
            value: f(self.value),
            key_node: self.key_node,
            value_node: self.value_node,
        }
    }
}

/// Keys under a mapping that aren't part of a known schema and don't start
/// with `x-`; kept so round-trip rendering never loses data (§4.2).
pub type UnknownFields = IndexMap<String, NodeReference<Node>>;

/// `x-`-prefixed keys, kept separately from [`UnknownFields`] since callers
/// frequently want to inspect extensions without wading through genuinely
/// unrecognized fields (§3.2 "extensions (`x-*`)").
pub type Extensions = IndexMap<String, NodeReference<Node>>;

/// Splits the entries of a mapping node into extensions and leftover unknown
/// fields, given the set of field names a caller has already consumed.
///
/// `consumed` must contain every key name the caller decoded into a typed
/// field; anything left over falls into one of the two output maps.
#[must_use]
pub fn collect_residue(node: &Node, consumed: &[&str]) -> (Extensions, UnknownFields) {
    let mut extensions = Extensions::new();
    let mut unknown = UnknownFields::new();
    for (key, value) in node.entries() {
        let Some(name) = key.as_str() else { continue };
        if consumed.contains(&name) {
            continue;
        }
        let reference = NodeReference::new(value.clone(), Some(key.clone()), value.clone());
        if let Some(ext_name) = name.strip_prefix("x-") {
            extensions.insert(ext_name.to_string(), reference);
        } else {
            unknown.insert(name.to_string(), reference);
        }
    }
    (extensions, unknown)
}

/// Decodes a required scalar string field, producing a [`BuildError`] at
/// `path` if the key is absent or the value isn't a scalar.
///
/// # Errors
/// Returns [`BuildError`] when `key` is missing from `node` or its value node
/// isn't a scalar.
pub fn require_str(node: &Node, key: &str, path: &PointerBuf) -> Result<NodeReference<String>, BuildError> {
    let (key_node, value_node) = node
        .entries()
        .find(|(k, _)| k.as_str() == Some(key))
        .ok_or_else(|| {
            BuildSnafu {
                path: path.clone(),
                expected: "a string field",
                got: "<missing>".to_string(),
            }
            .build()
        })?;
    let value = value_node.as_str().ok_or_else(|| {
        BuildSnafu {
            path: path.clone(),
            expected: "a string",
            got: format!("{value_node:?}"),
        }
        .build()
    })?;
    Ok(NodeReference::new(
        value.to_string(),
        Some(key_node.clone()),
        value_node.clone(),
    ))
}

/// Decodes an optional scalar string field; returns `Ok(None)` if the key is
/// absent, and a [`BuildError`] only if it's present but not a scalar.
///
/// # Errors
/// Returns [`BuildError`] if the field is present but isn't a scalar.
pub fn optional_str(
    node: &Node,
    key: &str,
    path: &PointerBuf,
) -> Result<Option<NodeReference<String>>, BuildError> {
    match node.entries().find(|(k, _)| k.as_str() == Some(key)) {
        None => Ok(None),
        Some((key_node, value_node)) => {
            let value = value_node.as_str().ok_or_else(|| {
                BuildSnafu {
                    path: path.clone(),
                    expected: "a string",
                    got: format!("{value_node:?}"),
                }
                .build()
            })?;
            Ok(Some(NodeReference::new(
                value.to_string(),
                Some(key_node.clone()),
                value_node.clone(),
            )))
        }
    }
}

/// Types that can be built directly from a mapping [`Node`], accumulating
/// [`BuildError`]s instead of failing the whole document (§4.2, §7).
///
/// Implemented by hand here for the worked entities ([`Info`], [`Contact`]);
/// `#[derive(rolodex_macros::LowEntity)]` generates the same shape for
/// straightforward structs (one field per mapping key, no cross-field
/// validation).
pub trait BuildModel: Sized {
    /// Decodes `Self` from `node`, appending any field-level failures to
    /// `errors` rather than aborting.
    fn build(node: &Node, path: &PointerBuf, errors: &mut Vec<BuildError>) -> Self;
}

/// `info` object (§4.2's worked example): contact/license/title/version.
#[derive(Debug, Clone, PartialEq)]
pub struct Info {
    pub title: NodeReference<String>,
    pub version: NodeReference<String>,
    pub description: Option<NodeReference<String>>,
    pub contact: Option<Contact>,
    pub extensions: Extensions,
    pub unknown_fields: UnknownFields,
}

impl BuildModel for Info {
    fn build(node: &Node, path: &PointerBuf, errors: &mut Vec<BuildError>) -> Self {
        let title = require_str(node, "title", path).unwrap_or_else(|e| {
            let fallback = NodeReference::new(String::new(), None, Node::scalar(""));
            errors.push(e);
            fallback
        });
        let version = require_str(node, "version", path).unwrap_or_else(|e| {
            let fallback = NodeReference::new(String::new(), None, Node::scalar(""));
            errors.push(e);
            fallback
        });
        let description = optional_str(node, "description", path).unwrap_or_else(|e| {
            errors.push(e);
            None
        });
        let contact = node.get("contact").map(|contact_node| {
            let mut contact_path = path.clone();
            contact_path.push_back(Token::from("contact"));
            Contact::build(contact_node, &contact_path, errors)
        });
        let (extensions, unknown_fields) =
            collect_residue(node, &["title", "version", "description", "contact", "license"]);
        Self {
            title,
            version,
            description,
            contact,
            extensions,
            unknown_fields,
        }
    }
}

/// `contact` object (§4.2's worked example): name/url/email.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub name: Option<NodeReference<String>>,
    pub url: Option<NodeReference<String>>,
    pub email: Option<NodeReference<String>>,
    pub extensions: Extensions,
    pub unknown_fields: UnknownFields,
}

impl BuildModel for Contact {
    fn build(node: &Node, path: &PointerBuf, errors: &mut Vec<BuildError>) -> Self {
        let name = optional_str(node, "name", path).unwrap_or_else(|e| {
            errors.push(e);
            None
        });
        let url = optional_str(node, "url", path).unwrap_or_else(|e| {
            errors.push(e);
            None
        });
        let email = optional_str(node, "email", path).unwrap_or_else(|e| {
            errors.push(e);
            None
        });
        let (extensions, unknown_fields) = collect_residue(node, &["name", "url", "email"]);
        Self {
            name,
            url,
            email,
            extensions,
            unknown_fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node;

    #[test]
    fn builds_info_with_nested_contact() {
        let root = node::parse(
            br#"{
                "title": "Pet Store",
                "version": "1.0.0",
                "contact": { "name": "Ada", "x-team": "platform" },
                "x-internal-id": "abc123"
            }"#,
        )
        .unwrap();
        let mut errors = Vec::new();
        let info = Info::build(&root, &PointerBuf::default(), &mut errors);
        assert!(errors.is_empty());
        assert_eq!(info.title.value, "Pet Store");
        let contact = info.contact.unwrap();
        assert_eq!(contact.name.unwrap().value, "Ada");
        assert_eq!(contact.extensions.get("team").unwrap().value.as_str(), Some("platform"));
        assert_eq!(info.extensions.get("internal-id").unwrap().value.as_str(), Some("abc123"));
    }

    #[test]
    fn missing_required_field_is_accumulated_not_raised() {
        let root = node::parse(br#"{"version": "1.0.0"}"#).unwrap();
        let mut errors = Vec::new();
        let info = Info::build(&root, &PointerBuf::default(), &mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(info.version.value, "1.0.0");
    }
}
