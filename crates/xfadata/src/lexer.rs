//! Lexing primitives shared by the XML and JSON parsers

pub mod cursor;

pub use cursor::Cursor;
