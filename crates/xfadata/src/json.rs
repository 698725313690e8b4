//! JSON codec for the string/object subset of JSON

pub mod parser;
pub mod writer;

pub use parser::Parser;
pub use writer::{to_compact_string, to_pretty_string};
