//! Error types for xfadata

use std::fmt;
use thiserror::Error;

/// Position in source text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl Pos {
    pub const fn new(offset: usize, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

/// Span representing a range in source text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    /// Span for errors that have no source position (tree-level checks)
    pub const fn empty() -> Self {
        Self {
            start: Pos::new(0, 0, 0),
            end: Pos::new(0, 0, 0),
        }
    }

    pub const fn at(pos: Pos) -> Self {
        Self::new(pos, pos)
    }

    pub const fn is_empty(&self) -> bool {
        self.start.line == 0 && self.end.line == 0
    }
}

/// Error kind for detailed categorization
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input is not well-formed XML
    MalformedXml,
    /// Well-formed XML that does not fit the leaf/object tree model
    UnsupportedXmlShape,
    /// Document type declarations are rejected outright
    DtdNotAllowed,
    /// Input is not well-formed JSON
    MalformedJson,
    /// JSON (or a tree) outside the string/object model or the envelope contract
    InvalidFormDataShape,
    /// Submitted data is not contained in the form schema
    SchemaMismatch { path: String },
    MaxDepthExceeded { max: u16 },
    MaxSizeExceeded { max: usize },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedXml => write!(f, "malformed xml"),
            Self::UnsupportedXmlShape => write!(f, "unsupported xml shape"),
            Self::DtdNotAllowed => write!(f, "document type declarations are not allowed"),
            Self::MalformedJson => write!(f, "malformed json"),
            Self::InvalidFormDataShape => write!(f, "invalid form data shape"),
            Self::SchemaMismatch { path } => write!(f, "schema mismatch at {path}"),
            Self::MaxDepthExceeded { max } => write!(f, "max depth exceeded: {max}"),
            Self::MaxSizeExceeded { max } => write!(f, "max size exceeded: {max}"),
        }
    }
}

/// Main error type for xfadata
#[derive(Error, Clone, Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    span: Span,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            span,
            message,
        }
    }

    pub fn with_message(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// Error without a source position
    pub fn detached(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::with_message(kind, Span::empty(), message)
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create error at specific position
    pub fn at(kind: ErrorKind, pos: Pos, message: impl Into<String>) -> Self {
        Self::with_message(kind, Span::at(pos), message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span.is_empty() {
            write!(f, "{}: {}", self.kind, self.message)
        } else {
            write!(
                f,
                "{} at {}: {}",
                self.kind, self.span.start, self.message
            )
        }
    }
}

/// Result type alias for xfadata
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_display() {
        let pos = Pos::new(42, 10, 5);
        assert_eq!(pos.to_string(), "10:5");
    }

    #[test]
    fn test_error_display_with_position() {
        let err = Error::at(ErrorKind::MalformedXml, Pos::new(3, 1, 4), "unexpected token");
        assert_eq!(err.to_string(), "malformed xml at 1:4: unexpected token");
    }

    #[test]
    fn test_detached_error_display() {
        let err = Error::detached(
            ErrorKind::SchemaMismatch {
                path: "/form1/name".to_string(),
            },
            "field is not declared by the form",
        );
        assert!(err.span().is_empty());
        assert_eq!(
            err.to_string(),
            "schema mismatch at /form1/name: field is not declared by the form"
        );
    }

    #[test]
    fn test_default_message_is_kind() {
        let err = Error::new(ErrorKind::MaxDepthExceeded { max: 4 }, Span::empty());
        assert_eq!(err.message(), "max depth exceeded: 4");
    }
}
