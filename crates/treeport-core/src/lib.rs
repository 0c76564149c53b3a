//! Treeport Core Library
//!
//! Fetches single files and whole directory subtrees from source code
//! hosting providers (GitHub, GitLab and anonymous public links) into an
//! in-memory filesystem.

pub mod codehost;
pub mod config;
pub mod error;
pub mod provider;
pub mod source;
pub mod vfs;

pub use error::{ErrorKind, Result, SourceError};

/// Re-exports of commonly used types
pub mod prelude {
    // Code hosts
    pub use crate::codehost::{
        CodeHost, CodeHostDirectory, FileDirectory, ProviderCredential, ProviderKind,
        StaticDirectory,
    };

    // Configuration
    pub use crate::config::{load_config, ResolverConfig};

    // Errors
    pub use crate::error::{ErrorKind, SourceError};

    // Providers
    pub use crate::provider::{
        ClientSettings, GitHubClient, GitLabClient, ProviderClient, PublicClient, TreeGetter,
        TreeNode,
    };

    // Source resolution
    pub use crate::source::{
        apply_root_name, chart_name_deriver, MaterializeLimits, ProviderSelector, RepoLink,
        SourceRequest, SourceResolver, TreeMaterializer,
    };

    // Filesystem
    pub use crate::vfs::{hash_tree, write_to_dir, MemoryFs};
}
