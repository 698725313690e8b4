//! Structural schema inference
//!
//! A [`SchemaNode`] records only whether each node is an object or a string
//! and the names of object members. It is rendered as a JSON schema limited
//! to the `type` and `properties` keywords, which is all the dynamic schema
//! consumers of form data need to enumerate fillable fields.

use indexmap::IndexMap;

use crate::error::{Error, ErrorKind, Result};
use crate::json;
use crate::tree::{Children, TreeNode};

const TYPE_KEY: &str = "type";
const PROPERTIES_KEY: &str = "properties";
const OBJECT_TYPE: &str = "object";
const STRING_TYPE: &str = "string";

/// Shape of a [`TreeNode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    /// `{"type": "string"}`
    String,
    /// `{"type": "object", "properties": {...}}`
    Object(IndexMap<String, SchemaNode>),
}

impl SchemaNode {
    /// The literal `type` value
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String => STRING_TYPE,
            Self::Object(_) => OBJECT_TYPE,
        }
    }

    /// Object properties, None for strings
    pub fn properties(&self) -> Option<&IndexMap<String, Self>> {
        match self {
            Self::Object(properties) => Some(properties),
            Self::String => None,
        }
    }

    /// Looks up a property by name
    pub fn get(&self, name: &str) -> Option<&Self> {
        self.properties().and_then(|properties| properties.get(name))
    }

    /// `/`-separated paths of every string field, in declaration order
    pub fn field_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        collect_paths(self, "", &mut paths);
        paths
    }

    /// Schema as a tree, ready for the JSON writer
    pub fn to_tree(&self) -> TreeNode {
        let mut node = Children::with_capacity(2);
        node.insert(TYPE_KEY, self.type_name());
        if let Self::Object(properties) = self {
            let children: Children = properties
                .iter()
                .map(|(name, schema)| (name.clone(), schema.to_tree()))
                .collect();
            node.insert(PROPERTIES_KEY, children);
        }
        TreeNode::Object(node)
    }

    /// Pretty JSON rendering using only `type` and `properties`
    pub fn to_json(&self) -> String {
        json::to_pretty_string(&self.to_tree())
    }

    /// Reads a schema previously rendered by [`SchemaNode::to_json`]
    pub fn from_tree(node: &TreeNode) -> Result<Self> {
        read_schema(node, "")
    }
}

fn collect_paths(schema: &SchemaNode, prefix: &str, paths: &mut Vec<String>) {
    match schema {
        SchemaNode::String => paths.push(prefix.to_owned()),
        SchemaNode::Object(properties) => {
            for (name, child) in properties {
                collect_paths(child, &format!("{prefix}/{name}"), paths);
            }
        }
    }
}

fn read_schema(node: &TreeNode, path: &str) -> Result<SchemaNode> {
    let Some(members) = node.as_object() else {
        return Err(invalid(path, "schema must be an object"));
    };

    if let Some(unknown) = members.keys().find(|k| *k != TYPE_KEY && *k != PROPERTIES_KEY) {
        return Err(invalid(path, &format!("unsupported schema keyword {unknown:?}")));
    }

    match members.get(TYPE_KEY).and_then(TreeNode::as_leaf) {
        Some(STRING_TYPE) => {
            if members.contains_key(PROPERTIES_KEY) {
                return Err(invalid(path, "string schema cannot declare properties"));
            }
            Ok(SchemaNode::String)
        }
        Some(OBJECT_TYPE) => {
            let properties = match members.get(PROPERTIES_KEY) {
                None => IndexMap::new(),
                Some(TreeNode::Object(children)) => children
                    .iter()
                    .map(|(name, child)| {
                        read_schema(child, &format!("{path}/{name}")).map(|s| (name.clone(), s))
                    })
                    .collect::<Result<IndexMap<_, _>>>()?,
                Some(TreeNode::Leaf(_)) => {
                    return Err(invalid(path, "properties must be an object"));
                }
            };
            Ok(SchemaNode::Object(properties))
        }
        Some(other) => Err(invalid(path, &format!("unsupported type {other:?}"))),
        None => Err(invalid(path, "missing string \"type\"")),
    }
}

fn invalid(path: &str, message: &str) -> Error {
    let at = if path.is_empty() { "/" } else { path };
    Error::detached(ErrorKind::InvalidFormDataShape, format!("{message} at {at}"))
}

/// Infer the schema of `node`: objects map to `object` with one property per
/// child, in order; leaves map to `string`.
pub fn infer(node: &TreeNode) -> SchemaNode {
    match node {
        TreeNode::Leaf(_) => SchemaNode::String,
        TreeNode::Object(children) => SchemaNode::Object(
            children
                .iter()
                .map(|(name, child)| (name.clone(), infer(child)))
                .collect(),
        ),
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SchemaNode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        match self {
            Self::String => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(TYPE_KEY, STRING_TYPE)?;
                map.end()
            }
            Self::Object(properties) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(TYPE_KEY, OBJECT_TYPE)?;
                map.serialize_entry(PROPERTIES_KEY, properties)?;
                map.end()
            }
        }
    }
}
