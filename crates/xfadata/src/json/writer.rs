//! Pretty JSON serialization of [`TreeNode`]s

use std::fmt::Write as _;

use crate::tree::TreeNode;

/// Serialize `node` as JSON with two-space indentation, keys in insertion order
pub fn to_pretty_string(node: &TreeNode) -> String {
    let mut output = String::new();
    write_node(node, 0, &mut output);
    output
}

/// Serialize `node` as JSON without insignificant whitespace
pub fn to_compact_string(node: &TreeNode) -> String {
    match node {
        TreeNode::Leaf(text) => quote(text),
        TreeNode::Object(children) => {
            let pairs: Vec<String> = children
                .iter()
                .map(|(k, v)| format!("{}:{}", quote(k), to_compact_string(v)))
                .collect();
            format!("{{{}}}", pairs.join(","))
        }
    }
}

fn write_node(node: &TreeNode, level: usize, output: &mut String) {
    match node {
        TreeNode::Leaf(text) => output.push_str(&quote(text)),
        TreeNode::Object(children) if children.is_empty() => output.push_str("{}"),
        TreeNode::Object(children) => {
            output.push('{');
            for (index, (key, child)) in children.iter().enumerate() {
                if index > 0 {
                    output.push(',');
                }
                output.push('\n');
                indent(level + 1, output);
                output.push_str(&quote(key));
                output.push_str(": ");
                write_node(child, level + 1, output);
            }
            output.push('\n');
            indent(level, output);
            output.push('}');
        }
    }
}

fn indent(level: usize, output: &mut String) {
    output.extend(std::iter::repeat("  ").take(level));
}

fn quote(input: &str) -> String {
    let mut result = String::with_capacity(input.len() + 2);
    result.push('"');
    for ch in input.chars() {
        match ch {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\u{08}' => result.push_str("\\b"),
            '\u{0C}' => result.push_str("\\f"),
            c if u32::from(c) < 0x20 => {
                let _ = write!(result, "\\u{:04x}", u32::from(c));
            }
            c => result.push(c),
        }
    }
    result.push('"');
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_nested() {
        let node = TreeNode::object([(
            "root",
            TreeNode::object([("child", TreeNode::leaf("value"))]),
        )]);
        assert_eq!(
            to_pretty_string(&node),
            "{\n  \"root\": {\n    \"child\": \"value\"\n  }\n}"
        );
    }

    #[test]
    fn test_pretty_empty_object_and_siblings() {
        let node = TreeNode::object([
            ("a", TreeNode::empty_object()),
            ("b", TreeNode::leaf("")),
        ]);
        assert_eq!(to_pretty_string(&node), "{\n  \"a\": {},\n  \"b\": \"\"\n}");
    }

    #[test]
    fn test_compact() {
        let node = TreeNode::object([
            ("a", TreeNode::leaf("1")),
            ("b", TreeNode::object([("c", TreeNode::leaf("2"))])),
        ]);
        assert_eq!(to_compact_string(&node), r#"{"a":"1","b":{"c":"2"}}"#);
    }

    #[test]
    fn test_escaping() {
        let node = TreeNode::leaf("quote\" slash\\ nl\n tab\t bell\u{07}");
        assert_eq!(
            to_compact_string(&node),
            r#""quote\" slash\\ nl\n tab\t bell\u0007""#
        );
    }

    #[test]
    fn test_matches_serde_json_pretty_output() -> Result<(), serde_json::Error> {
        let node = TreeNode::object([
            ("form1", TreeNode::object([
                ("name", TreeNode::leaf("Jane \"JJ\" Doe")),
                ("notes", TreeNode::leaf("line1\nline2")),
                ("empty", TreeNode::empty_object()),
            ])),
        ]);
        let ours = to_pretty_string(&node);
        let value: serde_json::Value = serde_json::from_str(&ours)?;
        assert_eq!(serde_json::to_string_pretty(&value)?, ours);
        Ok(())
    }
}
