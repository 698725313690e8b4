//! XFA form data conventions
//!
//! Form data travels as a JSON envelope `{"data": {...}}`. In the PDF it
//! lives in the datasets packet:
//!
//! ```xml
//! <xfa:datasets xmlns:xfa="http://www.xfa.org/schema/xfa-data/1.0/">
//!   <xfa:data>...</xfa:data>
//! </xfa:datasets>
//! ```

use crate::error::{Error, ErrorKind, Result};
use crate::schema::SchemaNode;
use crate::tree::{Children, TreeNode};

/// Namespace bound to the `xfa` prefix in the datasets packet
pub const XFA_NAMESPACE: &str = "http://www.xfa.org/schema/xfa-data/1.0/";
/// Attribute declaring [`XFA_NAMESPACE`]
pub const XFA_NAMESPACE_ATTR: &str = "xmlns:xfa";
/// Root element of the datasets packet
pub const DATASETS_ELEMENT: &str = "xfa:datasets";
/// Element holding the form data inside the datasets packet
pub const DATA_ELEMENT: &str = "xfa:data";
/// The only top-level key of a form data envelope
pub const ENVELOPE_KEY: &str = "data";

/// Extract the data object from a parsed envelope `{"data": {...}}`
pub fn unwrap_envelope(envelope: TreeNode) -> Result<TreeNode> {
    let Some(members) = envelope.into_object() else {
        return Err(shape("form data envelope must be a json object"));
    };
    if members.len() != 1 {
        return Err(shape(format!(
            "form data envelope must have exactly one key {ENVELOPE_KEY:?}, found {}",
            members.len()
        )));
    }

    match members.into_iter().next() {
        Some((key, data @ TreeNode::Object(_))) if key == ENVELOPE_KEY => Ok(data),
        Some((key, TreeNode::Leaf(_))) if key == ENVELOPE_KEY => Err(shape(format!(
            "{ENVELOPE_KEY:?} must be a json object, found a string"
        ))),
        Some((key, _)) => Err(shape(format!(
            "form data envelope key must be {ENVELOPE_KEY:?}, found {key:?}"
        ))),
        None => Err(shape("form data envelope is empty")),
    }
}

/// Wrap data in an envelope `{"data": data}`
pub fn wrap_envelope(data: TreeNode) -> TreeNode {
    let mut members = Children::with_capacity(1);
    members.insert(ENVELOPE_KEY, data);
    TreeNode::Object(members)
}

/// Wrap data as `xfa:datasets` / `xfa:data`, ready to render with the XFA namespace
pub fn wrap_as_datasets(data: TreeNode) -> TreeNode {
    let mut data_element = Children::with_capacity(1);
    data_element.insert(DATA_ELEMENT, data);
    let mut datasets = Children::with_capacity(1);
    datasets.insert(DATASETS_ELEMENT, data_element);
    TreeNode::Object(datasets)
}

/// Extract the data object from a parsed datasets document
pub fn unwrap_datasets(document: TreeNode) -> Result<TreeNode> {
    let datasets = single_child(document, DATASETS_ELEMENT)?;
    let data = single_child(datasets, DATA_ELEMENT)?;
    match data {
        TreeNode::Object(_) => Ok(data),
        // <xfa:data/> is a form without any fields yet
        TreeNode::Leaf(text) if text.trim().is_empty() => Ok(TreeNode::empty_object()),
        TreeNode::Leaf(_) => Err(Error::detached(
            ErrorKind::UnsupportedXmlShape,
            format!("<{DATA_ELEMENT}> must contain elements, found text"),
        )),
    }
}

fn single_child(node: TreeNode, name: &str) -> Result<TreeNode> {
    let children = match node {
        TreeNode::Object(children) if children.len() == 1 => children,
        // a bare <xfa:datasets/> is parsed as an empty leaf
        _ => {
            return Err(Error::detached(
                ErrorKind::UnsupportedXmlShape,
                format!("expected a single <{name}> element"),
            ));
        }
    };

    match children.into_iter().next() {
        Some((child_name, child)) if child_name == name => Ok(child),
        Some((child_name, _)) => Err(Error::detached(
            ErrorKind::UnsupportedXmlShape,
            format!("expected <{name}>, found <{child_name}>"),
        )),
        None => Err(Error::detached(
            ErrorKind::UnsupportedXmlShape,
            format!("expected a single <{name}> element"),
        )),
    }
}

/// Where and why submitted data left the form schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// `/`-separated path from the data root; `/` for the root itself
    pub path: String,
    pub reason: String,
}

/// Returns true if every path in `data` exists in `schema` with the same kind.
///
/// Fields declared by the schema may be missing from `data`. `data` itself
/// must be an object.
pub fn is_subset_of_schema(data: &TreeNode, schema: &SchemaNode) -> Result<bool> {
    ensure_object(data)?;
    Ok(find_mismatch(data, schema, "").is_none())
}

/// Like [`is_subset_of_schema`], but reports the first mismatching path
pub fn check_subset(data: &TreeNode, schema: &SchemaNode) -> Result<()> {
    ensure_object(data)?;
    match find_mismatch(data, schema, "") {
        None => Ok(()),
        Some(Mismatch { path, reason }) => Err(Error::detached(
            ErrorKind::SchemaMismatch { path },
            reason,
        )),
    }
}

fn ensure_object(data: &TreeNode) -> Result<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(shape("submitted form data must be an object"))
    }
}

/// Depth-first search for the first node of `data` the schema does not allow
pub fn find_mismatch(data: &TreeNode, schema: &SchemaNode, path: &str) -> Option<Mismatch> {
    match (data, schema) {
        (TreeNode::Leaf(_), SchemaNode::String) => None,
        (TreeNode::Object(children), SchemaNode::Object(properties)) => {
            children.iter().find_map(|(name, child)| {
                let child_path = format!("{path}/{name}");
                match properties.get(name) {
                    Some(child_schema) => find_mismatch(child, child_schema, &child_path),
                    None => Some(Mismatch {
                        path: child_path,
                        reason: format!("field {name:?} is not declared by the form"),
                    }),
                }
            })
        }
        (node, schema) => Some(Mismatch {
            path: if path.is_empty() { "/".to_owned() } else { path.to_owned() },
            reason: format!(
                "expected {}, found {}",
                schema.type_name(),
                node.kind_name()
            ),
        }),
    }
}

fn shape(message: impl Into<String>) -> Error {
    Error::detached(ErrorKind::InvalidFormDataShape, message)
}
