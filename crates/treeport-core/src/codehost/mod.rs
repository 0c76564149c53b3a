//! Code host directory: maps registered code host ids to connection metadata.
//!
//! The directory itself is an external collaborator. This module defines the
//! seam ([`CodeHostDirectory`]) plus two stock implementations:
//! - [`StaticDirectory`] - in-memory, for embedding and tests
//! - [`FileDirectory`] - backed by the `[[codehost]]` tables of treeport.toml

mod directory;
mod schema;

pub use directory::{CodeHostDirectory, FileDirectory, StaticDirectory};
pub use schema::{CodeHost, ProviderCredential, ProviderKind};
