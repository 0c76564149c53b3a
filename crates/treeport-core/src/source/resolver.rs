//! Source resolver facade.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::codehost::CodeHostDirectory;
use crate::config::ResolverConfig;
use crate::error::{Result, SourceError};
use crate::provider::{TreeGetter, TreeNode};
use crate::vfs::MemoryFs;

use super::materializer::{cancellable, MaterializeLimits, TreeMaterializer};
use super::rename::apply_root_name;
use super::{ProviderSelector, SourceRequest};

/// Computes the canonical root name of a materialized tree.
pub type RootNameDeriver = dyn Fn(&MemoryFs) -> Result<String> + Send + Sync;

/// Fetches single files and whole subtrees for [`SourceRequest`]s.
///
/// Every call selects a fresh provider client; nothing is cached between
/// calls.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    selector: ProviderSelector,
    limits: MaterializeLimits,
}

impl SourceResolver {
    pub fn new(selector: ProviderSelector, limits: MaterializeLimits) -> Self {
        Self { selector, limits }
    }

    pub fn from_config(directory: Arc<dyn CodeHostDirectory>, config: &ResolverConfig) -> Self {
        Self::new(
            ProviderSelector::from_config(directory, config),
            config.limits(),
        )
    }

    pub fn selector(&self) -> &ProviderSelector {
        &self.selector
    }

    /// Raw bytes of the single file named by the request.
    pub async fn fetch_file(
        &self,
        request: &SourceRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let result: Result<Vec<u8>> = async {
            let client = cancellable(cancel, self.selector.resolve(request)).await?;
            cancellable(
                cancel,
                client.get_file_content(&request.owner, &request.repo, &request.path, &request.branch),
            )
            .await
        }
        .await;

        let bytes = result.inspect_err(|e| log_failure("fetch_file", request, e))?;
        info!(
            owner = request.owner.as_str(),
            repo = request.repo.as_str(),
            path = request.path.as_str(),
            branch = request.branch.as_str(),
            bytes = bytes.len(),
            "fetched file"
        );
        Ok(bytes)
    }

    /// The subtree named by the request, its single root entry renamed to
    /// whatever `deriver` returns.
    ///
    /// A deriver failure is returned before anything is renamed.
    pub async fn fetch_tree<D>(
        &self,
        request: &SourceRequest,
        deriver: D,
        cancel: &CancellationToken,
    ) -> Result<MemoryFs>
    where
        D: Fn(&MemoryFs) -> Result<String>,
    {
        let result: Result<MemoryFs> = async {
            let client = cancellable(cancel, self.selector.resolve(request)).await?;
            let mut fs = TreeMaterializer::new(self.limits)
                .with_cancellation(cancel.clone())
                .materialize(&client, &request.owner, &request.repo, &request.path, &request.branch)
                .await?;
            let name = deriver(&fs)?;
            apply_root_name(&mut fs, &name)?;
            Ok(fs)
        }
        .await;

        result.inspect_err(|e| log_failure("fetch_tree", request, e))
    }

    /// Node listing below the request path, without contents.
    pub async fn list_tree(
        &self,
        request: &SourceRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<TreeNode>> {
        let result: Result<Vec<TreeNode>> = async {
            let client = cancellable(cancel, self.selector.resolve(request)).await?;
            cancellable(
                cancel,
                client.get_tree(&request.owner, &request.repo, &request.path, &request.branch),
            )
            .await
        }
        .await;

        result.inspect_err(|e| log_failure("list_tree", request, e))
    }
}

fn log_failure(operation: &str, request: &SourceRequest, err: &SourceError) {
    match err {
        SourceError::Cancelled => info!(
            operation,
            owner = request.owner.as_str(),
            repo = request.repo.as_str(),
            path = request.path.as_str(),
            branch = request.branch.as_str(),
            "source request cancelled"
        ),
        _ => error!(
            operation,
            owner = request.owner.as_str(),
            repo = request.repo.as_str(),
            path = request.path.as_str(),
            branch = request.branch.as_str(),
            kind = ?err.kind(),
            invariant = err.is_invariant_violation(),
            error = %err,
            "source request failed"
        ),
    }
}
