//! Property-based tests for the tree codecs and schema laws
//!
//! These tests use proptest to verify:
//! 1. XML and JSON round trips preserve the tree, and rendered XML is
//!    accepted by an independent parser
//! 2. Schema inference is deterministic
//! 3. A tree always satisfies its own schema, and unknown fields never do

use proptest::prelude::*;
use xfadata::{
    document_to_xml, infer_schema, is_subset_of_schema, json_to_tree, schema_from_json,
    schema_to_json, tree_to_json, xml_to_tree, Children, ErrorKind, TreeNode,
};

/// Element/key names that are valid XML names
fn arb_name() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_.-]{0,8}"
}

/// Leaf text drawn from every Unicode scalar value
fn arb_text() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>(), 0..16).prop_map(String::from_iter)
}

/// The XML 1.0 `Char` production, written out independently of the crate
fn xml_can_carry(ch: char) -> bool {
    matches!(u32::from(ch), 0x9 | 0xA | 0xD | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF)
}

fn leaves_are_writable(node: &TreeNode) -> bool {
    match node {
        TreeNode::Leaf(text) => text.chars().all(xml_can_carry),
        TreeNode::Object(children) => children.values().all(leaves_are_writable),
    }
}

/// Leaf text limited to characters XML can carry
fn arb_xml_text() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>().prop_filter("xml Char", |&ch| xml_can_carry(ch)), 0..16)
        .prop_map(String::from_iter)
}

fn arb_xml_tree() -> impl Strategy<Value = TreeNode> {
    arb_xml_tree_with(arb_text())
}

/// Trees as produced by the XML parser: objects always have children
fn arb_xml_tree_with<S>(text: S) -> impl Strategy<Value = TreeNode>
where
    S: Strategy<Value = String> + 'static,
{
    let leaf = text.prop_map(TreeNode::Leaf);
    leaf.prop_recursive(5, 64, 6, |inner| {
        prop::collection::hash_map(arb_name(), inner, 1..6)
            .prop_map(|m| TreeNode::Object(m.into_iter().collect::<Children>()))
    })
}

/// Any tree of the string/object model, empty objects included
fn arb_json_tree() -> impl Strategy<Value = TreeNode> {
    let leaf = arb_text().prop_map(TreeNode::Leaf);
    leaf.prop_recursive(5, 64, 6, |inner| {
        prop::collection::hash_map(arb_name(), inner, 0..6)
            .prop_map(|m| TreeNode::Object(m.into_iter().collect::<Children>()))
    })
}

fn arb_object_tree() -> impl Strategy<Value = TreeNode> {
    prop::collection::hash_map(arb_name(), arb_json_tree(), 0..6)
        .prop_map(|m| TreeNode::Object(m.into_iter().collect::<Children>()))
}

fn document(name: &str, root: TreeNode) -> TreeNode {
    TreeNode::object([(name, root)])
}

proptest! {
    #[test]
    fn xml_roundtrip(root in arb_xml_tree(), name in arb_name(), namespace in any::<bool>()) {
        let doc = document(&name, root);
        match document_to_xml(&doc, namespace) {
            Ok(xml) => {
                prop_assert!(leaves_are_writable(&doc));
                prop_assert!(roxmltree::Document::parse(&xml).is_ok(), "rejected: {:?}", xml);
                prop_assert_eq!(xml_to_tree(&xml).unwrap(), doc);
            }
            Err(err) => {
                prop_assert!(!leaves_are_writable(&doc));
                prop_assert_eq!(err.kind(), &ErrorKind::InvalidFormDataShape);
            }
        }
    }

    #[test]
    fn xml_roundtrip_of_writable_text(root in arb_xml_tree_with(arb_xml_text()), name in arb_name()) {
        let doc = document(&name, root);
        let xml = document_to_xml(&doc, false).unwrap();
        prop_assert!(roxmltree::Document::parse(&xml).is_ok(), "rejected: {:?}", xml);
        prop_assert_eq!(xml_to_tree(&xml).unwrap(), doc);
    }

    #[test]
    fn json_roundtrip(tree in arb_json_tree()) {
        let json = tree_to_json(&tree);
        prop_assert_eq!(json_to_tree(&json).unwrap(), tree);
    }

    #[test]
    fn json_output_is_accepted_by_serde_json(tree in arb_json_tree()) {
        let json = tree_to_json(&tree);
        prop_assert!(serde_json::from_str::<serde_json::Value>(&json).is_ok());
    }

    #[test]
    fn schema_inference_is_deterministic(tree in arb_json_tree()) {
        let copy = tree.clone();
        prop_assert_eq!(schema_to_json(&infer_schema(&tree)), schema_to_json(&infer_schema(&copy)));
    }

    #[test]
    fn schema_json_reads_back(tree in arb_json_tree()) {
        let schema = infer_schema(&tree);
        prop_assert_eq!(schema_from_json(&schema_to_json(&schema)).unwrap(), schema);
    }

    #[test]
    fn tree_satisfies_own_schema(tree in arb_object_tree()) {
        prop_assert!(is_subset_of_schema(&tree, &infer_schema(&tree)).unwrap());
    }

    #[test]
    fn unknown_field_breaks_containment(tree in arb_object_tree(), extra in arb_name(), value in arb_json_tree()) {
        let schema = infer_schema(&tree);
        let mut extended = tree.into_object().unwrap_or_default();
        prop_assume!(!extended.contains_key(&extra));

        extended.insert(extra, value);
        prop_assert!(!is_subset_of_schema(&TreeNode::Object(extended), &schema).unwrap());
    }
}

#[test]
fn arbitrary_text_never_panics_the_parsers() {
    let inputs = [
        "<", "</", "<a", "<a/", "<a>&", "<a>&#xZZ;</a>", "<![CDATA[", "<a><![CDATA[x</a>",
        "{\"", "{\"a\":", "\"\\u12", "\"\\ud83d\\u0041\"", "\u{0}",
    ];
    for input in inputs {
        let _ = xml_to_tree(input);
        let _ = json_to_tree(input);
    }
}
