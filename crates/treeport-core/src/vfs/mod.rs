//! In-memory filesystem that holds a materialized source tree.

pub mod export;
mod memory;
pub mod tree_hash;

pub use export::write_to_dir;
pub use memory::{DirEntry, MemoryFs};
pub use tree_hash::hash_tree;

/// Errors raised by [`MemoryFs`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VfsError {
    #[error("no such file or directory: {0}")]
    NotFound(String),
    #[error("entry already exists: {0}")]
    AlreadyExists(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("is a directory: {0}")]
    IsADirectory(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("file is not valid UTF-8: {0}")]
    NotUtf8(String),
}
