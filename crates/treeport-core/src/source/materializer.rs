//! Builds a [`MemoryFs`] from a provider tree listing.

use std::collections::HashSet;
use std::future::Future;

use futures::{StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Result, SourceError};
use crate::provider::http::normalize_repo_path;
use crate::provider::TreeGetter;
use crate::vfs::MemoryFs;

/// Size and concurrency bounds for one materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializeLimits {
    pub max_nodes: usize,
    pub max_total_bytes: u64,
    /// Concurrent file downloads
    pub concurrency: usize,
}

impl Default for MaterializeLimits {
    fn default() -> Self {
        Self {
            max_nodes: 10_000,
            max_total_bytes: 64 * 1024 * 1024,
            concurrency: 8,
        }
    }
}

/// Drives a [`TreeGetter`] to mirror a remote subtree in memory.
///
/// One `get_tree` call, then one `get_file_content` call per distinct file.
/// The first failure aborts the remaining downloads and no tree is returned.
#[derive(Debug, Clone, Default)]
pub struct TreeMaterializer {
    limits: MaterializeLimits,
    cancel: CancellationToken,
}

impl TreeMaterializer {
    pub fn new(limits: MaterializeLimits) -> Self {
        Self {
            limits,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight provider calls when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn limits(&self) -> MaterializeLimits {
        self.limits
    }

    /// Fetch the subtree below `path`; entries land at paths relative to it.
    pub async fn materialize<C>(
        &self,
        client: &C,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<MemoryFs>
    where
        C: TreeGetter + ?Sized,
    {
        let root = normalize_repo_path(path);
        let nodes = self
            .guard(client.get_tree(owner, repo, &root, branch))
            .await?;
        if nodes.len() > self.limits.max_nodes {
            return Err(SourceError::TooLarge(format!(
                "{}/{}:{} lists {} nodes, limit is {}",
                owner,
                repo,
                root,
                nodes.len(),
                self.limits.max_nodes
            )));
        }

        let mut fs = MemoryFs::new();
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for node in nodes {
            let Some(relative) = relative_path(&root, &node.path, node.is_dir) else {
                continue;
            };
            if !seen.insert(node.path.clone()) {
                continue;
            }
            if node.is_dir {
                fs.create_dir_all(&relative)?;
            } else {
                files.push((relative, node.path));
            }
        }
        debug!(
            owner,
            repo,
            path = root.as_str(),
            branch,
            files = files.len(),
            "fetching tree contents"
        );

        let fetches = futures::stream::iter(files)
            .map(|(relative, full)| async move {
                let bytes = client.get_file_content(owner, repo, &full, branch).await?;
                Ok::<_, SourceError>((relative, bytes))
            })
            .buffer_unordered(self.limits.concurrency.max(1));
        let mut fetches = std::pin::pin!(fetches);

        let mut total_bytes: u64 = 0;
        while let Some((relative, bytes)) = self.guard(fetches.try_next()).await? {
            total_bytes += bytes.len() as u64;
            if total_bytes > self.limits.max_total_bytes {
                return Err(SourceError::TooLarge(format!(
                    "{}/{}:{} exceeds {} bytes",
                    owner, repo, root, self.limits.max_total_bytes
                )));
            }
            fs.write_file(&relative, bytes)?;
        }

        info!(
            owner,
            repo,
            path = root.as_str(),
            branch,
            files = fs.file_count(),
            bytes = total_bytes,
            "materialized tree"
        );
        Ok(fs)
    }

    async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        cancellable(&self.cancel, fut).await
    }
}

/// Run `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(SourceError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SourceError::Cancelled),
        result = fut => result,
    }
}

/// Path of `node` relative to `root`, or `None` when it lies outside.
///
/// A file requested directly (`node == root`) keeps its own name.
fn relative_path(root: &str, node: &str, is_dir: bool) -> Option<String> {
    let node = normalize_repo_path(node);
    if root.is_empty() {
        return (!node.is_empty()).then_some(node);
    }
    if node == root {
        return match is_dir {
            true => None,
            false => node.rsplit('/').next().map(str::to_string),
        };
    }
    node.strip_prefix(root)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(str::to_string)
}
