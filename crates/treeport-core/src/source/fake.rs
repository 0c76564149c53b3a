//! In-process provider used by the source tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, SourceError};
use crate::provider::{TreeGetter, TreeNode};

#[derive(Debug, Default)]
struct Calls {
    tree: usize,
    files: HashMap<String, usize>,
}

/// Serves a fixed tree and counts every call.
#[derive(Debug, Default)]
pub(crate) struct FakeGetter {
    dirs: Vec<String>,
    files: BTreeMap<String, Vec<u8>>,
    extra: Vec<TreeNode>,
    failing: HashSet<String>,
    file_delay: Option<Duration>,
    calls: Mutex<Calls>,
}

impl FakeGetter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_dir(mut self, path: &str) -> Self {
        self.dirs.push(path.to_string());
        self
    }

    pub(crate) fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.as_bytes().to_vec());
        self
    }

    /// Listed in addition to the dirs and files, without content of its own.
    pub(crate) fn with_extra_node(mut self, node: TreeNode) -> Self {
        self.extra.push(node);
        self
    }

    pub(crate) fn failing_on(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    pub(crate) fn with_file_delay(mut self, delay: Duration) -> Self {
        self.file_delay = Some(delay);
        self
    }

    pub(crate) fn tree_calls(&self) -> usize {
        self.calls.lock().unwrap().tree
    }

    pub(crate) fn file_calls(&self) -> usize {
        self.calls.lock().unwrap().files.values().sum()
    }

    pub(crate) fn fetches_of(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .files
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl TreeGetter for FakeGetter {
    async fn get_file_content(
        &self,
        _owner: &str,
        _repo: &str,
        path: &str,
        _branch: &str,
    ) -> Result<Vec<u8>> {
        *self
            .calls
            .lock()
            .unwrap()
            .files
            .entry(path.to_string())
            .or_default() += 1;
        if let Some(delay) = self.file_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(path) {
            return Err(SourceError::NotFound(path.to_string()));
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.to_string()))
    }

    async fn get_tree(
        &self,
        _owner: &str,
        _repo: &str,
        path: &str,
        _branch: &str,
    ) -> Result<Vec<TreeNode>> {
        self.calls.lock().unwrap().tree += 1;
        let under = |p: &str| path.is_empty() || p == path || p.starts_with(&format!("{}/", path));

        let mut nodes: Vec<TreeNode> = self
            .dirs
            .iter()
            .filter(|d| under(d.as_str()))
            .map(|d| TreeNode::dir(d.as_str(), "tree"))
            .collect();
        nodes.extend(
            self.files
                .keys()
                .filter(|f| under(f.as_str()))
                .map(|f| TreeNode::file(f.as_str(), "blob")),
        );
        nodes.extend(self.extra.iter().cloned());
        if nodes.is_empty() {
            return Err(SourceError::NotFound(path.to_string()));
        }
        Ok(nodes)
    }
}
