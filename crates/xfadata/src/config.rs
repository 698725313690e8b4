//! Parser limits shared by the XML and JSON codecs

use crate::error::{Error, ErrorKind, Pos, Result};

/// Limits applied while parsing untrusted input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum element/object nesting depth (0 means unlimited)
    pub max_depth: u16,
    /// Maximum input size in bytes (0 means unlimited)
    pub max_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 128,
            max_size: 10 * 1024 * 1024, // 10 MB default
        }
    }
}

impl Config {
    /// Create a new config with unlimited depth and size
    pub const fn unlimited() -> Self {
        Self {
            max_depth: 0,
            max_size: 0,
        }
    }

    /// Create a new config with specific limits
    pub const fn new(max_depth: u16, max_size: usize) -> Self {
        Self {
            max_depth,
            max_size,
        }
    }

    pub(crate) fn check_size(&self, len: usize) -> Result<()> {
        if self.max_size > 0 && len > self.max_size {
            return Err(Error::at(
                ErrorKind::MaxSizeExceeded { max: self.max_size },
                Pos::new(0, 1, 1),
                format!("input is {len} bytes"),
            ));
        }
        Ok(())
    }

    pub(crate) fn check_depth(&self, depth: usize, pos: Pos) -> Result<()> {
        if self.max_depth > 0 && depth > usize::from(self.max_depth) {
            return Err(Error::at(
                ErrorKind::MaxDepthExceeded {
                    max: self.max_depth,
                },
                pos,
                format!("nesting depth {depth} exceeds {}", self.max_depth),
            ));
        }
        Ok(())
    }
}
