//! Source resolution from code hosts and public repository links.
//!
//! This module turns a [`SourceRequest`] into file bytes or an in-memory
//! tree. It handles:
//! - Provider selection (registered code host or public link)
//! - Concurrent tree materialization with size limits and cancellation
//! - Renaming the tree root to a canonical name

#[cfg(test)]
pub(crate) mod fake;
mod materializer;
mod rename;
mod request;
mod resolver;
mod selector;

pub use materializer::{MaterializeLimits, TreeMaterializer};
pub use rename::{apply_root_name, chart_name_deriver};
pub use request::{RepoLink, SourceRequest};
pub use resolver::{RootNameDeriver, SourceResolver};
pub use selector::{ProviderSelector, INVARIANT_TARGET};
