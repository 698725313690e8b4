//! XML codec: parse datasets XML into a [`TreeNode`](crate::TreeNode) and write it back

pub mod parser;
pub mod writer;

pub use parser::Parser;
pub use writer::Writer;
