//! The reference resolver (§4.4): a depth-first walk over the rolodex that
//! follows every `$ref`, records a [`Reference`] for it, and detects cycles
//! by tracking the stack of pointers currently being visited.

use std::collections::HashSet;

use crate::config::RolodexConfig;
use crate::error::{CircularReference, UnresolvedReference, UnresolvedReferenceSnafu};
use crate::index::Rolodex;
use crate::node::Node;
use crate::uri::AbsoluteUri;

/// A single `$ref` occurrence, resolved or not (§3.4).
#[derive(Debug, Clone)]
pub struct Reference {
    pub raw: String,
    pub resolved: AbsoluteUri,
    pub origin: AbsoluteUri,
    pub target: Option<AbsoluteUri>,
    pub is_circular: bool,
}

/// In what kind of construct a cycle was discovered, used to decide whether
/// the `ignore_*_circular` flags suppress it (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleContext {
    Array,
    Polymorphic,
    Other,
}

/// Output of a resolver pass over one or more file roots.
#[derive(Debug, Default)]
pub struct ResolutionReport {
    pub references: Vec<Reference>,
    pub circular: Vec<CircularReference>,
    pub unresolved: Vec<UnresolvedReference>,
}

/// Walks `root` (whose entries are already indexed in `rolodex` under
/// `origin`), following every `$ref` reachable from it.
#[tracing::instrument(skip(rolodex, root), fields(origin = %origin))]
pub fn resolve(rolodex: &Rolodex, root: &Node, origin: &AbsoluteUri) -> ResolutionReport {
    let mut walker = Walker {
        rolodex,
        config: rolodex.config(),
        stack: Vec::new(),
        visiting: HashSet::new(),
        report: ResolutionReport::default(),
    };
    walker.walk(root, origin, CycleContext::Other);
    walker.report
}

struct Walker<'r> {
    rolodex: &'r Rolodex,
    config: &'r RolodexConfig,
    stack: Vec<AbsoluteUri>,
    visiting: HashSet<AbsoluteUri>,
    report: ResolutionReport,
}

impl Walker<'_> {
    fn walk(&mut self, node: &Node, origin: &AbsoluteUri, context: CycleContext) {
        if let Some(ref_node) = node.get("$ref") {
            if let Some(raw) = ref_node.as_str() {
                self.follow_ref(raw, origin, context);
                // `$ref` siblings are ignored per OpenAPI/JSON-Schema rules;
                // don't descend into the rest of this mapping.
                return;
            }
        }
        for (key, value) in node.entries() {
            let child_context = match key.as_str() {
                Some("items" | "prefixItems") => CycleContext::Array,
                Some("oneOf" | "anyOf" | "allOf") => CycleContext::Polymorphic,
                _ => context,
            };
            self.walk(value, origin, child_context);
        }
        for element in node.elements() {
            self.walk(element, origin, context);
        }
    }

    fn follow_ref(&mut self, raw: &str, origin: &AbsoluteUri, context: CycleContext) {
        let resolved = match origin.resolve(raw) {
            Ok(resolved) => resolved,
            Err(_) => {
                let error = UnresolvedReferenceSnafu {
                    pointer: origin.clone(),
                    origin: origin.clone(),
                }
                .build();
                self.report.unresolved.push(error);
                return;
            }
        };

        if self.visiting.contains(&resolved) {
            let ignored = match context {
                CycleContext::Array => self.config.ignore_array_circular,
                CycleContext::Polymorphic => self.config.ignore_polymorphic_circular,
                CycleContext::Other => false,
            };
            let mut chain = self.stack.clone();
            chain.push(resolved.clone());
            self.report.circular.push(CircularReference {
                loop_point: resolved.clone(),
                chain,
                ignored,
            });
            // A cycle the caller hasn't opted into tolerating (§4.4) can't be
            // followed further; surface it the same way any other
            // reference that can't be followed is surfaced, rather than
            // silently leaving it as mere bookkeeping in `circular`.
            if !ignored && !self.config.allow_circular_references {
                self.report.unresolved.push(
                    UnresolvedReferenceSnafu {
                        pointer: resolved.clone(),
                        origin: origin.clone(),
                    }
                    .build(),
                );
            }
            self.report.references.push(Reference {
                raw: raw.to_string(),
                resolved: resolved.clone(),
                origin: origin.clone(),
                target: Some(resolved),
                is_circular: true,
            });
            return;
        }

        let target_entry = self.rolodex.get(&resolved);
        if target_entry.is_none() {
            self.report.unresolved.push(
                UnresolvedReferenceSnafu {
                    pointer: resolved.clone(),
                    origin: origin.clone(),
                }
                .build(),
            );
            self.report.references.push(Reference {
                raw: raw.to_string(),
                resolved,
                origin: origin.clone(),
                target: None,
                is_circular: false,
            });
            return;
        }

        self.report.references.push(Reference {
            raw: raw.to_string(),
            resolved: resolved.clone(),
            origin: origin.clone(),
            target: Some(resolved.clone()),
            is_circular: false,
        });

        self.stack.push(resolved.clone());
        self.visiting.insert(resolved.clone());
        let target_node = target_entry.unwrap().node.clone();
        let target_file = resolved.without_fragment();
        self.walk(&target_node, &target_file, context);
        self.visiting.remove(&resolved);
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RolodexConfig;
    use crate::node::parse;

    fn uri(s: &str) -> AbsoluteUri {
        AbsoluteUri::parse(s).unwrap()
    }

    #[test]
    fn detects_self_referential_cycle() {
        let root = parse(
            br#"{
                "components": {
                    "schemas": {
                        "N": { "properties": { "rice": { "$ref": "#/components/schemas/N" } } }
                    }
                }
            }"#,
        )
        .unwrap();
        let mut rolodex = Rolodex::new(RolodexConfig::default());
        let origin = uri("https://example.com/a.json");
        rolodex.index_file(origin.clone(), &root);
        let report = resolve(&rolodex, &root, &origin);
        assert_eq!(report.circular.len(), 1);
        assert!(!report.circular[0].ignored);
    }

    #[test]
    fn ignores_array_cycles_when_configured() {
        let root = parse(
            br#"{
                "components": {
                    "schemas": {
                        "N": { "items": { "$ref": "#/components/schemas/N" } }
                    }
                }
            }"#,
        )
        .unwrap();
        let config = RolodexConfig::builder().ignore_array_circular(true).build().unwrap();
        let mut rolodex = Rolodex::new(config);
        let origin = uri("https://example.com/a.json");
        rolodex.index_file(origin.clone(), &root);
        let report = resolve(&rolodex, &root, &origin);
        assert_eq!(report.circular.len(), 1);
        assert!(report.circular[0].ignored);
    }

    #[test]
    fn disallowing_circular_references_surfaces_a_hard_error() {
        let root = parse(
            br#"{
                "components": {
                    "schemas": {
                        "N": { "properties": { "rice": { "$ref": "#/components/schemas/N" } } }
                    }
                }
            }"#,
        )
        .unwrap();
        let config = RolodexConfig::builder().allow_circular_references(false).build().unwrap();
        let mut rolodex = Rolodex::new(config);
        let origin = uri("https://example.com/a.json");
        rolodex.index_file(origin.clone(), &root);
        let report = resolve(&rolodex, &root, &origin);
        assert_eq!(report.circular.len(), 1);
        assert_eq!(report.unresolved.len(), 1);
    }

    #[test]
    fn allowing_circular_references_does_not_surface_a_hard_error() {
        let root = parse(
            br#"{
                "components": {
                    "schemas": {
                        "N": { "properties": { "rice": { "$ref": "#/components/schemas/N" } } }
                    }
                }
            }"#,
        )
        .unwrap();
        let mut rolodex = Rolodex::new(RolodexConfig::default());
        let origin = uri("https://example.com/a.json");
        rolodex.index_file(origin.clone(), &root);
        let report = resolve(&rolodex, &root, &origin);
        assert_eq!(report.circular.len(), 1);
        assert!(report.unresolved.is_empty());
    }

    #[test]
    fn reports_unresolved_reference() {
        let root = parse(br#"{"components": {"schemas": {"N": {"$ref": "#/components/schemas/Missing"}}}}"#).unwrap();
        let mut rolodex = Rolodex::new(RolodexConfig::default());
        let origin = uri("https://example.com/a.json");
        rolodex.index_file(origin.clone(), &root);
        let report = resolve(&rolodex, &root, &origin);
        assert_eq!(report.unresolved.len(), 1);
    }
}
