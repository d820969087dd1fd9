use rolodex::diff::{self, ChangeType};
use rolodex::render;
use rolodex_core::index::Rolodex;
use rolodex_core::config::RolodexConfig;
use rolodex_core::node::parse;
use rolodex_core::schema::SchemaProxy;
use rolodex_core::uri::AbsoluteUri;

#[test]
fn enum_addition_is_a_single_non_breaking_property_added() {
    let left = parse(br#"{"type": "string", "enum": ["draft", "published"]}"#).unwrap();
    let right = parse(br#"{"type": "string", "enum": ["draft", "published", "archived"]}"#).unwrap();
    let changes = diff::compare(&left, &right);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].change_type, ChangeType::PropertyAdded);
    assert_eq!(changes[0].property, "enum");
    assert!(!changes[0].breaking);
}

#[test]
fn required_addition_is_a_single_breaking_property_added() {
    let left = parse(br#"{"type": "object", "required": ["id"]}"#).unwrap();
    let right = parse(br#"{"type": "object", "required": ["id", "name"]}"#).unwrap();
    let changes = diff::compare(&left, &right);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].change_type, ChangeType::PropertyAdded);
    assert_eq!(changes[0].property, "required");
    assert!(changes[0].breaking);
}

#[test]
fn ref_replaced_by_inline_schema_is_one_modified_record() {
    let left = parse(br#"{"$ref": "#/components/schemas/Pet"}"#).unwrap();
    let right = parse(br#"{"type": "object", "properties": {"name": {"type": "string"}}}"#).unwrap();
    let changes = diff::compare(&left, &right);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].change_type, ChangeType::Modified);
    assert_eq!(changes[0].property, "$ref");
}

#[test]
fn self_referential_schema_renders_ref_at_the_cycle_point() {
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
    let uri = AbsoluteUri::parse("urn:test:tree").unwrap();
    rolodex.index_file(uri.clone(), &root);

    let target = uri.with_fragment(Some("/components/schemas/TreeNode"));
    let entry = rolodex.get(&target).unwrap();
    let proxy = SchemaProxy::backed((*entry.node).clone(), entry.origin.clone(), entry.pointer.clone());

    let rendered = render::render_inline(&proxy, &rolodex).unwrap();
    let parent = rendered.get("properties").unwrap().get("parent").unwrap();
    let grandparent = parent.get("properties").unwrap().get("parent").unwrap();
    assert_eq!(grandparent.get("$ref").unwrap().as_str(), Some(target.as_str()));
}

#[test]
fn zero_valued_minimum_and_maximum_round_trip_as_zero() {
    let node = parse(br#"{"type": "integer", "minimum": 0, "maximum": 0}"#).unwrap();
    let rolodex = Rolodex::new(RolodexConfig::default());
    let uri = AbsoluteUri::parse("urn:test:zero").unwrap();
    let proxy = SchemaProxy::backed(node, uri, jsonptr::PointerBuf::default());
    let schema = proxy.schema(&rolodex).unwrap();
    let rendered = render::render_schema(&schema);
    let yaml = render::to_yaml(&rendered);
    assert!(yaml.contains("minimum: 0"));
    assert!(yaml.contains("maximum: 0"));
    assert!(!yaml.contains("minimum: 0.0"));
}

#[test]
fn yaml_anchor_used_twice_expands_to_two_independent_json_copies() {
    let yaml = b"defaults: &defaults\n  retries: 3\nprimary:\n  <<: *defaults\nsecondary:\n  <<: *defaults\n";
    let node = parse(yaml).unwrap();
    let json = render::to_json(&node);
    assert!(json.get("primary").is_some());
    assert!(json.get("secondary").is_some());
}

#[test]
fn builds_document_with_info_and_indexed_schema() {
    let document = rolodex::Document::builder()
        .add_source(
            "https://example.com/openapi.json",
            &br#"{
                "info": {"title": "Pet Store", "version": "1.0.0"},
                "components": {"schemas": {"Pet": {"type": "object"}}}
            }"#[..],
        )
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(document.info().unwrap().title(), "Pet Store");
    let schema_uri = AbsoluteUri::parse("https://example.com/openapi.json#/components/schemas/Pet").unwrap();
    assert!(document.rolodex().get(&schema_uri).is_some());
}
