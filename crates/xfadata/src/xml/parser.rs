//! XML parser folding a document into a [`TreeNode`]
//!
//! The parser never loads a DTD and never resolves external entities: a
//! `<!DOCTYPE` anywhere in the input is rejected, and only the five
//! predefined entities plus numeric character references are decoded.

use crate::config::Config;
use crate::envelope::{XFA_NAMESPACE, XFA_NAMESPACE_ATTR};
use crate::error::{Error, ErrorKind, Pos, Result};
use crate::lexer::Cursor;
use crate::tree::{Children, TreeNode};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// XML parser
#[derive(Debug)]
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    config: Config,
}

impl<'a> Parser<'a> {
    /// Create a new XML parser with default limits
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, Config::default())
    }

    /// Create a new XML parser with custom limits
    pub fn with_config(input: &'a [u8], config: Config) -> Self {
        let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);
        Self {
            cursor: Cursor::new(input),
            config,
        }
    }

    /// Parse a whole document.
    ///
    /// The result is an object with a single child named after the root
    /// element.
    pub fn parse(&mut self) -> Result<TreeNode> {
        self.config.check_size(self.cursor.remaining().len())?;
        let Ok(text) = std::str::from_utf8(self.cursor.remaining()) else {
            return Err(self.malformed("invalid utf-8"));
        };
        if let Some((offset, ch)) = text.char_indices().find(|&(_, ch)| !is_xml_char(ch)) {
            let mut at = self.cursor.clone();
            at.advance_by(offset);
            return Err(Error::at(
                ErrorKind::MalformedXml,
                at.position(),
                format!("character U+{:04X} is not allowed in xml", u32::from(ch)),
            ));
        }

        self.skip_misc(true)?;
        if self.cursor.current() != Some(b'<') {
            return Err(self.malformed("expected root element"));
        }
        let (name, root) = self.parse_element(1)?;
        self.skip_misc(false)?;

        if !self.cursor.is_eof() {
            return Err(self.malformed("unexpected content after root element"));
        }

        let mut document = Children::with_capacity(1);
        document.insert(name, root);
        Ok(TreeNode::Object(document))
    }

    /// Skips whitespace, comments and processing instructions outside the root element
    fn skip_misc(&mut self, prolog: bool) -> Result<()> {
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.starts_with(b"<?") {
                self.cursor.advance_by(2);
                self.skip_until(b"?>")?;
            } else if self.cursor.starts_with(b"<!--") {
                self.cursor.advance_by(4);
                self.skip_until(b"-->")?;
            } else if self.cursor.starts_with(b"<!DOCTYPE") {
                return Err(Error::at(
                    ErrorKind::DtdNotAllowed,
                    self.cursor.position(),
                    "document type declarations are not allowed",
                ));
            } else if self.cursor.starts_with(b"<!") {
                let message = if prolog {
                    "unexpected markup before root element"
                } else {
                    "unexpected markup after root element"
                };
                return Err(self.malformed(message));
            } else {
                return Ok(());
            }
        }
    }

    fn parse_element(&mut self, depth: usize) -> Result<(String, TreeNode)> {
        let start = self.cursor.position();
        self.config.check_depth(depth, start)?;
        self.expect_byte(b'<')?;

        let name = self.parse_name()?;
        self.parse_attributes(&name)?;

        if self.cursor.consume(b'/') {
            self.expect_byte(b'>')?;
            return Ok((name, TreeNode::Leaf(String::new())));
        }
        self.expect_byte(b'>')?;

        let mut text = String::new();
        let mut text_pos: Option<Pos> = None;
        let mut text_runs: Vec<Pos> = Vec::new();
        let mut children = Children::new();

        loop {
            if self.cursor.starts_with(b"</") {
                self.cursor.advance_by(2);
                let close_name = self.parse_name()?;
                if close_name != name {
                    return Err(self.malformed(format!(
                        "mismatched closing tag: expected </{name}>, found </{close_name}>"
                    )));
                }
                self.cursor.skip_whitespace();
                self.expect_byte(b'>')?;
                break;
            }

            if self.cursor.starts_with(b"<![CDATA[") {
                let pos = self.cursor.position();
                self.cursor.advance_by(9);
                let begin = self.cursor.pos();
                self.skip_until(b"]]>")?;
                let raw = self.cursor.slice_from(begin);
                let content = raw.get(..raw.len().saturating_sub(3)).unwrap_or_default();
                text.push_str(&self.utf8(content)?);
                text_pos.get_or_insert(pos);
                text_runs.push(pos);
                continue;
            }

            if self.cursor.starts_with(b"<!--") {
                return Err(self.unsupported(format!(
                    "comments inside <{name}> are not supported"
                )));
            }

            if self.cursor.starts_with(b"<?") {
                return Err(self.unsupported(format!(
                    "processing instructions inside <{name}> are not supported"
                )));
            }

            if self.cursor.starts_with(b"<!DOCTYPE") {
                return Err(Error::at(
                    ErrorKind::DtdNotAllowed,
                    self.cursor.position(),
                    "document type declarations are not allowed",
                ));
            }

            if self.cursor.starts_with(b"<!") {
                return Err(self.malformed("unexpected markup declaration"));
            }

            if self.cursor.current() == Some(b'<') {
                let child_pos = self.cursor.position();
                let (child_name, child) = self.parse_element(depth + 1)?;
                if children.contains_key(&child_name) {
                    return Err(Error::at(
                        ErrorKind::UnsupportedXmlShape,
                        child_pos,
                        format!("repeated element <{child_name}> inside <{name}>"),
                    ));
                }
                children.insert(child_name, child);
                continue;
            }

            if self.cursor.is_eof() {
                return Err(self.malformed(format!("unterminated element <{name}>")));
            }

            let pos = self.cursor.position();
            let run = self.parse_text()?;
            if !run.trim().is_empty() {
                text_pos.get_or_insert(pos);
            }
            text.push_str(&run);
            text_runs.push(pos);
        }

        if children.is_empty() {
            if let Some(&pos) = text_runs.get(1) {
                return Err(Error::at(
                    ErrorKind::UnsupportedXmlShape,
                    pos,
                    format!("<{name}> holds more than one text node"),
                ));
            }
            return Ok((name, TreeNode::Leaf(text)));
        }

        if let Some(pos) = text_pos {
            return Err(Error::at(
                ErrorKind::UnsupportedXmlShape,
                pos,
                format!("mixed text and element content in <{name}>"),
            ));
        }

        Ok((name, TreeNode::Object(children)))
    }

    /// Reads the attribute list of `element`.
    ///
    /// Only the XFA data namespace declaration is accepted; it is dropped.
    fn parse_attributes(&mut self, element: &str) -> Result<()> {
        let mut seen: Vec<String> = Vec::new();

        loop {
            self.cursor.skip_whitespace();
            match self.cursor.current() {
                Some(b'/' | b'>') => return Ok(()),
                Some(_) => {}
                None => return Err(self.malformed("unexpected end of input")),
            }

            let pos = self.cursor.position();
            let name = self.parse_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=')?;
            self.cursor.skip_whitespace();
            let value = self.parse_attribute_value()?;

            if seen.contains(&name) {
                return Err(Error::at(
                    ErrorKind::MalformedXml,
                    pos,
                    format!("duplicate attribute {name}"),
                ));
            }

            if name != XFA_NAMESPACE_ATTR || value != XFA_NAMESPACE {
                return Err(Error::at(
                    ErrorKind::UnsupportedXmlShape,
                    pos,
                    format!("attribute {name} on <{element}> is not supported"),
                ));
            }
            seen.push(name);
        }
    }

    fn parse_attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(b'"') => b'"',
            Some(b'\'') => b'\'',
            _ => return Err(self.malformed("expected quoted attribute value")),
        };
        self.cursor.advance();

        let pos = self.cursor.position();
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == quote {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance();
                let text = self.utf8(raw)?;
                return decode_entities(&text, pos);
            }
            if b == b'<' {
                return Err(self.malformed("'<' in attribute value"));
            }
            self.cursor.advance();
        }

        Err(self.malformed("unterminated attribute value"))
    }

    fn parse_text(&mut self) -> Result<String> {
        let pos = self.cursor.position();
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == b'<' {
                break;
            }
            self.cursor.advance();
        }

        let raw = self.cursor.slice_from(start);
        let text = self.utf8(raw)?;
        decode_entities(&text, pos)
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.cursor.pos();

        match self.cursor.current() {
            Some(first) if is_name_start(first) => self.cursor.advance(),
            Some(_) => return Err(self.malformed("invalid name")),
            None => return Err(self.malformed("expected name")),
        }

        while let Some(b) = self.cursor.current() {
            if is_name_char(b) {
                self.cursor.advance();
            } else {
                break;
            }
        }

        let raw = self.cursor.slice_from(start);
        self.utf8(raw)
    }

    fn skip_until(&mut self, pattern: &[u8]) -> Result<()> {
        while !self.cursor.is_eof() {
            if self.cursor.starts_with(pattern) {
                self.cursor.advance_by(pattern.len());
                return Ok(());
            }
            self.cursor.advance();
        }
        Err(self.malformed("unterminated markup"))
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.cursor.consume(expected) {
            Ok(())
        } else {
            Err(self.malformed(format!("expected '{}'", char::from(expected))))
        }
    }

    fn utf8(&self, bytes: &[u8]) -> Result<String> {
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| self.malformed("invalid utf-8"))
    }

    fn malformed(&self, message: impl Into<String>) -> Error {
        Error::at(ErrorKind::MalformedXml, self.cursor.position(), message)
    }

    fn unsupported(&self, message: impl Into<String>) -> Error {
        Error::at(ErrorKind::UnsupportedXmlShape, self.cursor.position(), message)
    }
}

pub(crate) fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

pub(crate) fn is_name_char(b: u8) -> bool {
    is_name_start(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

/// Returns true if `name` can be written as an element name
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(first) if is_name_start(first) => {
            bytes.all(is_name_char) && name.chars().all(is_xml_char)
        }
        _ => false,
    }
}

/// The XML 1.0 `Char` production
pub(crate) fn is_xml_char(ch: char) -> bool {
    matches!(
        ch,
        '\u{9}' | '\u{A}' | '\u{D}' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

fn decode_entities(input: &str, pos: Pos) -> Result<String> {
    if !input.contains('&') {
        return Ok(input.to_owned());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        result.push_str(rest.get(..amp).unwrap_or_default());
        let after = rest.get(amp + 1..).unwrap_or_default();
        let Some(semi) = after.find(';') else {
            return Err(Error::at(ErrorKind::MalformedXml, pos, "unterminated entity reference"));
        };
        let entity = after.get(..semi).unwrap_or_default();

        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => decode_numeric_entity(entity),
        };

        match decoded {
            Some(ch) => result.push(ch),
            None if entity.starts_with('#') => {
                return Err(Error::at(
                    ErrorKind::MalformedXml,
                    pos,
                    format!("invalid character reference &{entity};"),
                ));
            }
            None => {
                return Err(Error::at(
                    ErrorKind::MalformedXml,
                    pos,
                    format!("undefined entity &{entity};"),
                ));
            }
        }
        rest = after.get(semi + 1..).unwrap_or_default();
    }
    result.push_str(rest);

    Ok(result)
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok()
    } else {
        None
    };
    code.and_then(char::from_u32).filter(|&ch| is_xml_char(ch))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<TreeNode> {
        Parser::new(input.as_bytes()).parse()
    }

    fn kind_of(input: &str) -> Option<ErrorKind> {
        parse(input).err().map(|e| e.kind().clone())
    }

    #[test]
    fn test_parse_nested() -> Result<()> {
        let tree = parse("<root><child>text</child></root>")?;
        let expected = TreeNode::object([(
            "root",
            TreeNode::object([("child", TreeNode::leaf("text"))]),
        )]);
        assert_eq!(tree, expected);
        Ok(())
    }

    #[test]
    fn test_parse_self_closing_is_empty_leaf() -> Result<()> {
        let tree = parse("<root><child /><other></other></root>")?;
        let root = tree.get("root");
        assert_eq!(root.and_then(|r| r.get("child")), Some(&TreeNode::leaf("")));
        assert_eq!(root.and_then(|r| r.get("other")), Some(&TreeNode::leaf("")));
        Ok(())
    }

    #[test]
    fn test_leaf_text_is_preserved_as_authored() -> Result<()> {
        let tree = parse("<root><a>  padded  </a><b>\n</b></root>")?;
        let root = tree.get("root");
        assert_eq!(root.and_then(|r| r.get("a")).and_then(TreeNode::as_leaf), Some("  padded  "));
        assert_eq!(root.and_then(|r| r.get("b")).and_then(TreeNode::as_leaf), Some("\n"));
        Ok(())
    }

    #[test]
    fn test_prolog_and_whitespace_between_elements() -> Result<()> {
        let input = "\u{FEFF}<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- form -->\n<root>\n  <a>1</a>\n  <b>2</b>\n</root>\n";
        let tree = parse(input)?;
        let root = tree.get("root").and_then(TreeNode::as_object);
        assert_eq!(root.map(|c| c.len()), Some(2));
        Ok(())
    }

    #[test]
    fn test_entities_and_cdata() -> Result<()> {
        let tree = parse("<root><a>&lt;x&gt; &amp; &#65;&#x42;</a><b><![CDATA[<raw> & text]]></b></root>")?;
        let root = tree.get("root");
        assert_eq!(root.and_then(|r| r.get("a")).and_then(TreeNode::as_leaf), Some("<x> & AB"));
        assert_eq!(root.and_then(|r| r.get("b")).and_then(TreeNode::as_leaf), Some("<raw> & text"));
        Ok(())
    }

    #[test]
    fn test_xfa_namespace_declaration_is_accepted() -> Result<()> {
        let input = format!(
            "<xfa:datasets xmlns:xfa=\"{XFA_NAMESPACE}\"><xfa:data><f>v</f></xfa:data></xfa:datasets>"
        );
        let tree = parse(&input)?;
        assert!(tree
            .get("xfa:datasets")
            .and_then(|d| d.get("xfa:data"))
            .and_then(|d| d.get("f"))
            .is_some());
        Ok(())
    }

    #[test]
    fn test_rejects_attributes() {
        assert_eq!(kind_of("<root id=\"1\"></root>"), Some(ErrorKind::UnsupportedXmlShape));
        assert_eq!(
            kind_of("<root xmlns:xfa=\"urn:other\"></root>"),
            Some(ErrorKind::UnsupportedXmlShape)
        );
    }

    #[test]
    fn test_rejects_mixed_content() {
        assert_eq!(kind_of("<root>text<a>1</a></root>"), Some(ErrorKind::UnsupportedXmlShape));
        assert_eq!(kind_of("<root><a>1</a>tail</root>"), Some(ErrorKind::UnsupportedXmlShape));
    }

    #[test]
    fn test_rejects_repeated_siblings() {
        let err = parse("<root><a>1</a><a>2</a></root>").err();
        assert_eq!(err.as_ref().map(Error::kind), Some(&ErrorKind::UnsupportedXmlShape));
        assert!(err.is_some_and(|e| e.message().contains("repeated element <a>")));
    }

    #[test]
    fn test_rejects_multiple_text_nodes() {
        for input in [
            "<root><a>x<![CDATA[y]]>z</a></root>",
            "<root><a><![CDATA[x]]><![CDATA[y]]></a></root>",
            "<root><a><![CDATA[x]]>tail</a></root>",
        ] {
            assert_eq!(kind_of(input), Some(ErrorKind::UnsupportedXmlShape), "input: {input}");
        }
        let err = parse("<root><a>x<![CDATA[y]]></a></root>").err();
        assert_eq!(err.map(|e| e.span().start.col), Some(11));
    }

    #[test]
    fn test_single_cdata_with_entities_is_one_text_node() -> Result<()> {
        let tree = parse("<a>x &amp; y</a>")?;
        assert_eq!(tree.get("a").and_then(TreeNode::as_leaf), Some("x & y"));
        Ok(())
    }

    #[test]
    fn test_rejects_characters_outside_xml() {
        for input in [
            "<a>\u{1}</a>",
            "<a>x\u{0}</a>",
            "<a>\u{FFFE}</a>",
            "<!-- \u{8} --><a/>",
            "<a>&#0;</a>",
            "<a>&#x1;</a>",
            "<a>&#xD800;</a>",
            "<a>&#xFFFF;</a>",
            "<a>&#x110000;</a>",
        ] {
            assert_eq!(kind_of(input), Some(ErrorKind::MalformedXml), "input: {input:?}");
        }
        let err = parse("<root>\n  <a>ok\u{1B}</a>\n</root>").err();
        assert_eq!(err.map(|e| (e.span().start.line, e.span().start.col)), Some((2, 8)));
    }

    #[test]
    fn test_accepts_xml_char_boundaries() -> Result<()> {
        let tree = parse("<a>&#x9;&#xD;&#x20;&#xD7FF;&#xE000;&#xFFFD;&#x10000;&#x10FFFF;</a>")?;
        assert_eq!(
            tree.get("a").and_then(TreeNode::as_leaf),
            Some("\t\r \u{D7FF}\u{E000}\u{FFFD}\u{10000}\u{10FFFF}")
        );
        Ok(())
    }

    #[test]
    fn test_rejects_comments_inside_elements() {
        assert_eq!(
            kind_of("<root><!-- note --><a>1</a></root>"),
            Some(ErrorKind::UnsupportedXmlShape)
        );
        assert_eq!(kind_of("<root><?pi x?></root>"), Some(ErrorKind::UnsupportedXmlShape));
    }

    #[test]
    fn test_malformed_documents() {
        for input in [
            "",
            "text",
            "<root>",
            "<root></other>",
            "<root><a></root>",
            "<root>&bogus;</root>",
            "<root>a & b</root>",
            "<root/><second/>",
            "<root attr></root>",
            "<1root/>",
        ] {
            assert_eq!(kind_of(input), Some(ErrorKind::MalformedXml), "input: {input:?}");
        }
    }

    #[test]
    fn test_rejects_doctype() {
        let input = "<?xml version=\"1.0\"?><!DOCTYPE r [<!ENTITY x SYSTEM \"file:///etc/passwd\">]><r>&x;</r>";
        assert_eq!(kind_of(input), Some(ErrorKind::DtdNotAllowed));
    }

    #[test]
    fn test_error_position() {
        let err = parse("<root>\n  <a>1</b>\n</root>").err();
        let pos = err.map(|e| e.span().start);
        assert_eq!(pos.map(|p| p.line), Some(2));
    }

    #[test]
    fn test_depth_limit() {
        let mut parser = Parser::with_config(b"<a><b><c>x</c></b></a>", Config::new(2, 0));
        let err = parser.parse().err();
        assert_eq!(
            err.map(|e| e.kind().clone()),
            Some(ErrorKind::MaxDepthExceeded { max: 2 })
        );
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("xfa:data"));
        assert!(is_valid_name("Field_1.a-b"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("1field"));
        assert!(!is_valid_name("my field"));
    }
}
