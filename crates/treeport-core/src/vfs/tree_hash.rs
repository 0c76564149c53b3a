//! Deterministic tree hashing for materialized trees
//!
//! Computes a stable hash of a [`MemoryFs`], useful for:
//! - Comparing two fetches of the same branch
//! - Reporting a content digest next to an exported tree

use super::MemoryFs;

/// Compute deterministic tree hash of an in-memory tree
///
/// # Algorithm
/// - Walk entries in lexicographic path order
/// - Directories: `blake3(relative_path || 0xFF)`
/// - Files: `blake3(relative_path || 0x00 || len_le_u64 || content)`
/// - Output: hex string
///
/// # Example
/// ```
/// use treeport_core::vfs::{MemoryFs, hash_tree};
///
/// let mut fs = MemoryFs::new();
/// fs.write_file("chart/Chart.yaml", "name: demo\n")?;
/// assert_eq!(hash_tree(&fs).len(), 64); // blake3 hex output
/// # Ok::<(), treeport_core::vfs::VfsError>(())
/// ```
pub fn hash_tree(fs: &MemoryFs) -> String {
    let mut hasher = blake3::Hasher::new();
    fs.walk(|path, contents| {
        hasher.update(path.as_bytes());
        match contents {
            Some(bytes) => {
                hasher.update(&[0x00]); // Path separator
                hasher.update(&(bytes.len() as u64).to_le_bytes());
                hasher.update(bytes);
            }
            None => {
                hasher.update(&[0xFF]); // Directory marker
            }
        }
    });
    hasher.finalize().to_hex().to_string()
}
