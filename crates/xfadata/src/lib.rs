//! xfadata - XFA form data between XML and JSON
//!
//! Converts the datasets packet of an XFA form to JSON, infers a simple
//! `type`/`properties` schema from it, and turns submitted JSON back into a
//! datasets packet for refilling the form.
//!
//! # Quick Start
//!
//! ```
//! # fn main() -> Result<(), xfadata::Error> {
//! let json = xfadata::xml_to_json("<root><child>value</child></root>")?;
//! assert_eq!(json, "{\n  \"root\": {\n    \"child\": \"value\"\n  }\n}");
//!
//! let xml = xfadata::envelope_to_datasets_xml(r#"{"data":{"field1":"v1"}}"#)?;
//! assert!(xml.contains("<field1>v1</field1>"));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

use tracing::{debug, instrument, warn};

pub mod config;
pub use config::Config;

pub mod error;
pub use error::{Error, ErrorKind, Pos, Result, Span};

pub mod lexer;

pub mod tree;
pub use tree::{Children, TreeNode};

pub mod json;
pub mod xml;

pub mod schema;
pub use schema::SchemaNode;

pub mod envelope;
pub use envelope::{
    check_subset, is_subset_of_schema, unwrap_datasets, wrap_as_datasets, wrap_envelope, Mismatch,
    XFA_NAMESPACE,
};

/// Parse XML into a document tree `{root_name: root}`
pub fn xml_to_tree(xml: &str) -> Result<TreeNode> {
    xml_to_tree_with_config(xml, Config::default())
}

/// Parse XML with custom limits
#[instrument(skip_all, fields(len = xml.len()))]
pub fn xml_to_tree_with_config(xml: &str, config: Config) -> Result<TreeNode> {
    let tree = xml::Parser::with_config(xml.as_bytes(), config)
        .parse()
        .inspect_err(|err| warn!(%err, "rejected xml input"))?;
    debug!(nodes = tree.node_count(), "parsed xml");
    Ok(tree)
}

/// Render `node` as a pretty-printed element named `root_name`.
///
/// With `with_xfa_namespace` the root element declares the XFA data namespace.
pub fn tree_to_xml(node: &TreeNode, root_name: &str, with_xfa_namespace: bool) -> Result<String> {
    xml::Writer::pretty().write_element(node, root_name, with_xfa_namespace)
}

/// Render a document tree (an object with exactly one child) as pretty XML
pub fn document_to_xml(document: &TreeNode, with_xfa_namespace: bool) -> Result<String> {
    xml::Writer::pretty().write_document(document, with_xfa_namespace)
}

/// Parse JSON made only of objects and strings
pub fn json_to_tree(json: &str) -> Result<TreeNode> {
    json_to_tree_with_config(json, Config::default())
}

/// Parse JSON with custom limits
#[instrument(skip_all, fields(len = json.len()))]
pub fn json_to_tree_with_config(json: &str, config: Config) -> Result<TreeNode> {
    let tree = json::Parser::with_config(json.as_bytes(), config)
        .parse()
        .inspect_err(|err| warn!(%err, "rejected json input"))?;
    debug!(nodes = tree.node_count(), "parsed json");
    Ok(tree)
}

/// Render `node` as pretty JSON
pub fn tree_to_json(node: &TreeNode) -> String {
    json::to_pretty_string(node)
}

/// Infer the object/string schema of `node`
pub fn infer_schema(node: &TreeNode) -> SchemaNode {
    schema::infer(node)
}

/// Render a schema as pretty JSON with only `type` and `properties`
pub fn schema_to_json(schema: &SchemaNode) -> String {
    schema.to_json()
}

/// Read schema JSON produced by [`schema_to_json`]
pub fn schema_from_json(json: &str) -> Result<SchemaNode> {
    SchemaNode::from_tree(&json_to_tree(json)?)
}

/// Parse a form data envelope `{"data": {...}}` and return the data object
pub fn unwrap_envelope(json: &str) -> Result<TreeNode> {
    envelope::unwrap_envelope(json_to_tree(json)?)
        .inspect_err(|err| warn!(%err, "rejected form data envelope"))
}

/// XML to pretty JSON, keeping the root element as the top-level key
pub fn xml_to_json(xml: &str) -> Result<String> {
    Ok(tree_to_json(&xml_to_tree(xml)?))
}

/// XML to the pretty JSON schema of the whole document
pub fn xml_to_schema_json(xml: &str) -> Result<String> {
    Ok(schema_to_json(&infer_schema(&xml_to_tree(xml)?)))
}

/// Datasets XML to a fill-ready envelope `{"data": {...}}`
#[instrument(skip_all, fields(len = xml.len()))]
pub fn datasets_to_envelope_json(xml: &str) -> Result<String> {
    let data = unwrap_datasets(xml_to_tree(xml)?)?;
    debug!(fields = data.node_count().saturating_sub(1), "extracted form data");
    Ok(tree_to_json(&wrap_envelope(data)))
}

/// Envelope JSON to the datasets XML that replaces the form's data packet
#[instrument(skip_all, fields(len = json.len()))]
pub fn envelope_to_datasets_xml(json: &str) -> Result<String> {
    let data = unwrap_envelope(json)?;
    debug!(fields = data.node_count().saturating_sub(1), "filling form data");
    document_to_xml(&wrap_as_datasets(data), true)
}

/// Schema of the fill envelope accepted by the form whose datasets XML is `xml`
pub fn form_schema(xml: &str) -> Result<SchemaNode> {
    let data = unwrap_datasets(xml_to_tree(xml)?)?;
    Ok(infer_schema(&wrap_envelope(data)))
}
