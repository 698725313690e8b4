//! Labeled, ordered tree shared by the XML and JSON codecs
//!
//! A node is either a [`TreeNode::Leaf`] holding text or a
//! [`TreeNode::Object`] holding named children. Child order follows the
//! source document; equality ignores it.

use indexmap::map::{IntoIter, Iter, Keys, Values};
use indexmap::IndexMap;

/// A form data node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    /// Text content (an XML element with only text, or a JSON string)
    Leaf(String),
    /// Named children (an XML element with only element children, or a JSON object)
    Object(Children),
}

impl TreeNode {
    /// Create a leaf node
    pub fn leaf(text: impl Into<String>) -> Self {
        Self::Leaf(text.into())
    }

    /// Create an object node from `(name, child)` pairs.
    ///
    /// A repeated name replaces the earlier child in place.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Object(
            entries
                .into_iter()
                .map(|(name, child)| (name.into(), child))
                .collect(),
        )
    }

    /// Create an object node without children
    pub fn empty_object() -> Self {
        Self::Object(Children::new())
    }

    /// Returns true if this node is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Returns true if this node is an object
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Returns the text if this is a leaf, None otherwise
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Self::Leaf(text) => Some(text),
            Self::Object(_) => None,
        }
    }

    /// Returns the children if this is an object, None otherwise
    pub fn as_object(&self) -> Option<&Children> {
        match self {
            Self::Object(children) => Some(children),
            Self::Leaf(_) => None,
        }
    }

    /// Consumes the node, returning its children if it is an object
    pub fn into_object(self) -> Option<Children> {
        match self {
            Self::Object(children) => Some(children),
            Self::Leaf(_) => None,
        }
    }

    /// Looks up a direct child by name
    pub fn get(&self, name: &str) -> Option<&Self> {
        self.as_object().and_then(|children| children.get(name))
    }

    /// Short name of the node kind, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Leaf(_) => "string",
            Self::Object(_) => "object",
        }
    }

    /// Total number of nodes in this subtree, including `self`
    pub fn node_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Object(children) => 1 + children.values().map(Self::node_count).sum::<usize>(),
        }
    }

    /// Nesting depth of this subtree; a leaf has depth 1
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Object(children) => 1 + children.values().map(Self::depth).max().unwrap_or(0),
        }
    }
}

impl From<String> for TreeNode {
    fn from(value: String) -> Self {
        Self::Leaf(value)
    }
}

impl From<&str> for TreeNode {
    fn from(value: &str) -> Self {
        Self::Leaf(value.to_owned())
    }
}

impl From<Children> for TreeNode {
    fn from(value: Children) -> Self {
        Self::Object(value)
    }
}

/// Order-preserving mapping from child names to nodes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Children(IndexMap<String, TreeNode>);

impl Children {
    /// Creates an empty mapping
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Creates an empty mapping with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self(IndexMap::with_capacity(capacity))
    }

    /// Returns the number of children
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no children
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the child with the given name
    pub fn get(&self, name: &str) -> Option<&TreeNode> {
        self.0.get(name)
    }

    /// Returns true if a child with the given name exists
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Appends a child, returning the previous child of that name
    pub fn insert(&mut self, name: impl Into<String>, node: impl Into<TreeNode>) -> Option<TreeNode> {
        self.0.insert(name.into(), node.into())
    }

    /// Returns the first child in encounter order
    pub fn first(&self) -> Option<(&String, &TreeNode)> {
        self.0.first()
    }

    /// Returns an iterator over child names
    pub fn keys(&self) -> Keys<'_, String, TreeNode> {
        self.0.keys()
    }

    /// Returns an iterator over child nodes
    pub fn values(&self) -> Values<'_, String, TreeNode> {
        self.0.values()
    }

    /// Returns an iterator over `(name, node)` pairs in encounter order
    pub fn iter(&self) -> Iter<'_, String, TreeNode> {
        self.0.iter()
    }
}

impl FromIterator<(String, TreeNode)> for Children {
    fn from_iter<T: IntoIterator<Item = (String, TreeNode)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Children {
    type Item = (String, TreeNode);
    type IntoIter = IntoIter<String, TreeNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Children {
    type Item = (&'a String, &'a TreeNode);
    type IntoIter = Iter<'a, String, TreeNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TreeNode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Leaf(text) => serializer.serialize_str(text),
            Self::Object(children) => children.serialize(serializer),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Children {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, node) in self.iter() {
            map.serialize_entry(name, node)?;
        }
        map.end()
    }
}
