//! JSON parser for the string/object subset
//!
//! Objects become [`TreeNode::Object`] and strings become [`TreeNode::Leaf`].
//! Numbers, booleans, null and arrays are well-formed JSON but fall outside
//! form data, so they are reported as [`ErrorKind::InvalidFormDataShape`].

use crate::config::Config;
use crate::error::{Error, ErrorKind, Pos, Result};
use crate::lexer::Cursor;
use crate::tree::{Children, TreeNode};

/// JSON parser
#[derive(Debug)]
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    config: Config,
}

impl<'a> Parser<'a> {
    /// Create a new parser with default configuration
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, Config::default())
    }

    /// Create a new parser with custom configuration
    pub fn with_config(input: &'a [u8], config: Config) -> Self {
        Self {
            cursor: Cursor::new(input),
            config,
        }
    }

    /// Parse a complete JSON text
    pub fn parse(&mut self) -> Result<TreeNode> {
        self.config.check_size(self.cursor.remaining().len())?;

        self.cursor.skip_whitespace();
        if self.cursor.is_eof() {
            return Err(self.malformed("empty input"));
        }
        let value = self.parse_value(1)?;
        self.cursor.skip_whitespace();

        if !self.cursor.is_eof() {
            return Err(self.malformed("trailing characters after json value"));
        }
        Ok(value)
    }

    fn parse_value(&mut self, depth: usize) -> Result<TreeNode> {
        let pos = self.cursor.position();
        match self.cursor.current() {
            Some(b'{') => self.parse_object(depth),
            Some(b'"') => self.parse_string().map(TreeNode::Leaf),
            Some(b'[') => Err(shape(pos, "arrays are not supported in form data")),
            Some(b't') => self.reject_literal(b"true", "booleans"),
            Some(b'f') => self.reject_literal(b"false", "booleans"),
            Some(b'n') => self.reject_literal(b"null", "null values"),
            Some(b'-' | b'0'..=b'9') => self.reject_number(),
            Some(_) => Err(self.malformed("expected a json value")),
            None => Err(self.malformed("unexpected end of input")),
        }
    }

    fn parse_object(&mut self, depth: usize) -> Result<TreeNode> {
        self.config.check_depth(depth, self.cursor.position())?;
        self.cursor.advance(); // '{'

        let mut children = Children::new();
        self.cursor.skip_whitespace();
        if self.cursor.consume(b'}') {
            return Ok(TreeNode::Object(children));
        }

        loop {
            self.cursor.skip_whitespace();
            let key_pos = self.cursor.position();
            if self.cursor.current() != Some(b'"') {
                return Err(self.malformed("expected string key"));
            }
            let key = self.parse_string()?;
            if children.contains_key(&key) {
                return Err(shape(key_pos, format!("duplicate key {key:?}")));
            }

            self.cursor.skip_whitespace();
            if !self.cursor.consume(b':') {
                return Err(self.malformed("expected ':' after object key"));
            }
            self.cursor.skip_whitespace();
            let value = self.parse_value(depth + 1)?;
            children.insert(key, value);

            self.cursor.skip_whitespace();
            if self.cursor.consume(b',') {
                continue;
            }
            if self.cursor.consume(b'}') {
                return Ok(TreeNode::Object(children));
            }
            return Err(self.malformed("expected ',' or '}' in object"));
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        self.cursor.advance(); // opening quote
        let mut buf: Vec<u8> = Vec::new();

        loop {
            match self.cursor.current() {
                None => return Err(self.malformed("unterminated string")),
                Some(b'"') => {
                    self.cursor.advance();
                    break;
                }
                Some(b'\\') => {
                    self.cursor.advance();
                    let ch = self.parse_escape()?;
                    let mut tmp = [0u8; 4];
                    buf.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
                }
                Some(b) if b < 0x20 => {
                    return Err(self.malformed("control character in string"));
                }
                Some(b) => {
                    buf.push(b);
                    self.cursor.advance();
                }
            }
        }

        String::from_utf8(buf).map_err(|_| self.malformed("invalid utf-8 in string"))
    }

    fn parse_escape(&mut self) -> Result<char> {
        let Some(b) = self.cursor.current() else {
            return Err(self.malformed("unterminated escape sequence"));
        };
        self.cursor.advance();

        let ch = match b {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{08}',
            b'f' => '\u{0C}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => return self.parse_unicode_escape(),
            _ => return Err(self.malformed("invalid escape sequence")),
        };
        Ok(ch)
    }

    fn parse_unicode_escape(&mut self) -> Result<char> {
        let high = self.parse_hex4()?;
        if !(0xD800..0xDC00).contains(&high) {
            return char::from_u32(high).ok_or_else(|| self.malformed("invalid unicode escape"));
        }

        // surrogate pair: expect a trailing \uDC00..\uDFFF
        if !(self.cursor.consume(b'\\') && self.cursor.consume(b'u')) {
            return Err(self.malformed("unpaired surrogate in unicode escape"));
        }
        let low = self.parse_hex4()?;
        if !(0xDC00..0xE000).contains(&low) {
            return Err(self.malformed("invalid low surrogate in unicode escape"));
        }
        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        char::from_u32(code).ok_or_else(|| self.malformed("invalid unicode escape"))
    }

    fn parse_hex4(&mut self) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..4 {
            let digit = self
                .cursor
                .current()
                .and_then(|b| char::from(b).to_digit(16))
                .ok_or_else(|| self.malformed("invalid unicode escape"))?;
            value = value * 16 + digit;
            self.cursor.advance();
        }
        Ok(value)
    }

    /// Consumes a `true`/`false`/`null` literal, which is valid JSON but not form data
    fn reject_literal(&mut self, literal: &[u8], what: &str) -> Result<TreeNode> {
        let pos = self.cursor.position();
        if !self.cursor.starts_with(literal) {
            return Err(self.malformed("invalid literal"));
        }
        self.cursor.advance_by(literal.len());
        Err(shape(pos, format!("{what} are not supported in form data")))
    }

    /// Scans a JSON number so that only well-formed ones are reported as unsupported
    fn reject_number(&mut self) -> Result<TreeNode> {
        let pos = self.cursor.position();
        self.cursor.consume(b'-');

        match self.cursor.current() {
            Some(b'0') => self.cursor.advance(),
            Some(b'1'..=b'9') => self.skip_digits(),
            _ => return Err(self.malformed("invalid number")),
        }

        if self.cursor.consume(b'.') {
            if !matches!(self.cursor.current(), Some(b'0'..=b'9')) {
                return Err(self.malformed("expected digit after decimal point"));
            }
            self.skip_digits();
        }

        if matches!(self.cursor.current(), Some(b'e' | b'E')) {
            self.cursor.advance();
            if matches!(self.cursor.current(), Some(b'+' | b'-')) {
                self.cursor.advance();
            }
            if !matches!(self.cursor.current(), Some(b'0'..=b'9')) {
                return Err(self.malformed("expected digit in exponent"));
            }
            self.skip_digits();
        }

        match self.cursor.current() {
            None | Some(b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r') => {
                Err(shape(pos, "numbers are not supported in form data"))
            }
            Some(_) => Err(self.malformed("invalid number")),
        }
    }

    fn skip_digits(&mut self) {
        while let Some(b'0'..=b'9') = self.cursor.current() {
            self.cursor.advance();
        }
    }

    fn malformed(&self, message: impl Into<String>) -> Error {
        Error::at(ErrorKind::MalformedJson, self.cursor.position(), message)
    }
}

fn shape(pos: Pos, message: impl Into<String>) -> Error {
    Error::at(ErrorKind::InvalidFormDataShape, pos, message)
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
    fn test_parse_nested_objects() -> Result<()> {
        let tree = parse(r#"{ "root": { "child": "value" } }"#)?;
        let expected = TreeNode::object([(
            "root",
            TreeNode::object([("child", TreeNode::leaf("value"))]),
        )]);
        assert_eq!(tree, expected);
        Ok(())
    }

    #[test]
    fn test_preserves_key_order() -> Result<()> {
        let tree = parse(r#"{"z":"1","a":"2","m":{}}"#)?;
        let keys: Vec<&str> = tree
            .as_object()
            .map(|c| c.keys().map(String::as_str).collect())
            .unwrap_or_default();
        assert_eq!(keys, ["z", "a", "m"]);
        Ok(())
    }

    #[test]
    fn test_string_escapes() -> Result<()> {
        let tree = parse(r#""a\"b\\c\/d\n\té😀""#)?;
        assert_eq!(tree.as_leaf(), Some("a\"b\\c/d\n\té😀"));
        Ok(())
    }

    #[test]
    fn test_top_level_string_is_leaf() -> Result<()> {
        assert_eq!(parse("  \"x\"  ")?, TreeNode::leaf("x"));
        Ok(())
    }

    #[test]
    fn test_rejects_non_form_values() {
        for input in [
            r#"{"a": 1}"#,
            r#"{"a": -2.5}"#,
            r#"{"a": true}"#,
            r#"{"a": false}"#,
            r#"{"a": null}"#,
            r#"{"a": ["x"]}"#,
            r#"[]"#,
            "42",
        ] {
            assert_eq!(
                kind_of(input),
                Some(ErrorKind::InvalidFormDataShape),
                "input: {input}"
            );
        }
    }

    #[test]
    fn test_rejects_duplicate_keys() {
        assert_eq!(
            kind_of(r#"{"a": "1", "a": "2"}"#),
            Some(ErrorKind::InvalidFormDataShape)
        );
    }

    #[test]
    fn test_duplicate_key_reported_before_its_value() {
        // the repeated key's value is not even well-formed
        let err = parse(r#"{"a": "1", "a": {"b": tru}}"#).err();
        assert_eq!(err.as_ref().map(Error::kind), Some(&ErrorKind::InvalidFormDataShape));
        assert_eq!(err.map(|e| e.span().start.col), Some(12));
    }

    #[test]
    fn test_well_formed_numbers_are_unsupported() {
        for input in [r#"{"a": 0}"#, r#"{"a": -0.5e+3}"#, r#"{"a": 12E4 }"#, "1.25"] {
            assert_eq!(
                kind_of(input),
                Some(ErrorKind::InvalidFormDataShape),
                "input: {input}"
            );
        }
    }

    #[test]
    fn test_malformed_numbers() {
        for input in [
            r#"{"a": -}"#,
            r#"{"a": 1.}"#,
            r#"{"a": 1e}"#,
            r#"{"a": 01}"#,
            r#"{"a": 1x}"#,
            "-",
        ] {
            assert_eq!(kind_of(input), Some(ErrorKind::MalformedJson), "input: {input}");
        }
    }

    #[test]
    fn test_malformed_json() {
        for input in [
            "",
            "{",
            r#"{"a" "b"}"#,
            r#"{"a": "b",}"#,
            r#"{"a": "b"} x"#,
            r#"{a: "b"}"#,
            r#""unterminated"#,
            r#""bad \q escape""#,
            r#""\ud800""#,
            "{\"a\": \"line\nbreak\"}",
            "nul",
        ] {
            assert_eq!(kind_of(input), Some(ErrorKind::MalformedJson), "input: {input:?}");
        }
    }

    #[test]
    fn test_depth_limit() {
        let mut parser = Parser::with_config(br#"{"a":{"b":{"c":"x"}}}"#, Config::new(2, 0));
        assert_eq!(
            parser.parse().err().map(|e| e.kind().clone()),
            Some(ErrorKind::MaxDepthExceeded { max: 2 })
        );
    }

    #[test]
    fn test_size_limit() {
        let mut parser = Parser::with_config(br#"{"a":"0123456789"}"#, Config::new(0, 8));
        assert_eq!(
            parser.parse().err().map(|e| e.kind().clone()),
            Some(ErrorKind::MaxSizeExceeded { max: 8 })
        );
    }
}
