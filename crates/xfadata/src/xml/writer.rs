//! XML serialization of [`TreeNode`]s

use crate::envelope::{XFA_NAMESPACE, XFA_NAMESPACE_ATTR};
use crate::error::{Error, ErrorKind, Result};
use crate::tree::TreeNode;
use crate::xml::parser::{is_valid_name, is_xml_char};

const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// XML writer settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Writer {
    /// Spaces per nesting level; `None` writes everything on one line
    pub indent: Option<usize>,
    /// Emit the `<?xml ...?>` declaration
    pub declaration: bool,
}

impl Default for Writer {
    fn default() -> Self {
        Self::pretty()
    }
}

impl Writer {
    /// Two-space indentation with a UTF-8 declaration
    pub const fn pretty() -> Self {
        Self {
            indent: Some(2),
            declaration: true,
        }
    }

    /// No declaration and no insignificant whitespace
    pub const fn compact() -> Self {
        Self {
            indent: None,
            declaration: false,
        }
    }

    /// Serialize `node` as an element called `root_name`
    pub fn write_element(
        &self,
        node: &TreeNode,
        root_name: &str,
        xfa_namespace: bool,
    ) -> Result<String> {
        let mut output = String::new();
        if self.declaration {
            output.push_str(DECLARATION);
            self.newline(&mut output);
        }
        self.write_node(root_name, node, xfa_namespace, 0, &mut output)?;
        Ok(output)
    }

    /// Serialize a document tree: an object whose single child is the root element
    pub fn write_document(&self, document: &TreeNode, xfa_namespace: bool) -> Result<String> {
        let root = match document {
            TreeNode::Object(children) if children.len() == 1 => children.first(),
            TreeNode::Object(children) => {
                return Err(Error::detached(
                    ErrorKind::InvalidFormDataShape,
                    format!(
                        "document must have exactly one root element, found {}",
                        children.len()
                    ),
                ));
            }
            TreeNode::Leaf(_) => None,
        };

        match root {
            Some((name, node)) => self.write_element(node, name, xfa_namespace),
            None => Err(Error::detached(
                ErrorKind::InvalidFormDataShape,
                "document root must be an object",
            )),
        }
    }

    fn write_node(
        &self,
        name: &str,
        node: &TreeNode,
        xfa_namespace: bool,
        level: usize,
        output: &mut String,
    ) -> Result<()> {
        if !is_valid_name(name) {
            return Err(Error::detached(
                ErrorKind::InvalidFormDataShape,
                format!("{name:?} is not a valid element name"),
            ));
        }

        self.pad(level, output);
        output.push('<');
        output.push_str(name);
        if xfa_namespace {
            output.push(' ');
            output.push_str(XFA_NAMESPACE_ATTR);
            output.push_str("=\"");
            output.push_str(XFA_NAMESPACE);
            output.push('"');
        }

        match node {
            TreeNode::Leaf(text) if text.is_empty() => output.push_str("/>"),
            TreeNode::Object(children) if children.is_empty() => output.push_str("/>"),
            TreeNode::Leaf(text) => {
                output.push('>');
                escape_xml(name, text, output)?;
                close_tag(name, output);
            }
            TreeNode::Object(children) => {
                output.push('>');
                self.newline(output);
                for (child_name, child) in children {
                    self.write_node(child_name, child, false, level + 1, output)?;
                }
                self.pad(level, output);
                close_tag(name, output);
            }
        }

        self.newline(output);
        Ok(())
    }

    fn pad(&self, level: usize, output: &mut String) {
        if let Some(width) = self.indent {
            output.extend(std::iter::repeat(' ').take(width * level));
        }
    }

    fn newline(&self, output: &mut String) {
        if self.indent.is_some() {
            output.push('\n');
        }
    }
}

fn close_tag(name: &str, output: &mut String) {
    output.push_str("</");
    output.push_str(name);
    output.push('>');
}

/// Escapes the text of element `name`; characters XML cannot carry are an error
fn escape_xml(name: &str, input: &str, output: &mut String) -> Result<()> {
    for ch in input.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&apos;"),
            '\r' => output.push_str("&#13;"),
            _ if is_xml_char(ch) => output.push(ch),
            _ => {
                return Err(Error::detached(
                    ErrorKind::InvalidFormDataShape,
                    format!(
                        "character U+{:04X} in <{name}> cannot be written to xml",
                        u32::from(ch)
                    ),
                ));
            }
        }
    }
    Ok(())
}
