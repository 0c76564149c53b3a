//! Owned in-memory directory tree.

use std::collections::BTreeMap;

use super::VfsError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Dir(BTreeMap<String, Node>),
    File(Vec<u8>),
}

/// A single entry returned by [`MemoryFs::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// In-memory filesystem addressed by `/`-separated relative paths.
///
/// The empty path (or `"."`) names the root directory. Directories are
/// created lazily when a file is written beneath them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryFs {
    root: BTreeMap<String, Node>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a file, creating missing parent directories.
    ///
    /// Overwrites an existing file at the same path.
    pub fn write_file(&mut self, path: &str, contents: impl Into<Vec<u8>>) -> Result<(), VfsError> {
        let segments = split_path(path)?;
        let Some((name, parents)) = segments.split_last() else {
            return Err(VfsError::IsADirectory(path.to_string()));
        };
        let dir = Self::ensure_dir(&mut self.root, parents, path)?;
        if let Some(Node::Dir(_)) = dir.get(*name) {
            return Err(VfsError::IsADirectory(path.to_string()));
        }
        dir.insert((*name).to_string(), Node::File(contents.into()));
        Ok(())
    }

    /// Create a directory and all of its missing parents.
    pub fn create_dir_all(&mut self, path: &str) -> Result<(), VfsError> {
        let segments = split_path(path)?;
        Self::ensure_dir(&mut self.root, &segments, path)?;
        Ok(())
    }

    /// Read the bytes of a file.
    pub fn read(&self, path: &str) -> Result<&[u8], VfsError> {
        let segments = split_path(path)?;
        match self.lookup(&segments, path)? {
            Some(Node::File(bytes)) => Ok(bytes.as_slice()),
            Some(Node::Dir(_)) => Err(VfsError::IsADirectory(path.to_string())),
            None => Err(VfsError::NotFound(path.to_string())),
        }
    }

    /// Read a file as UTF-8 text.
    pub fn read_to_string(&self, path: &str) -> Result<String, VfsError> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| VfsError::NotUtf8(path.to_string()))
    }

    /// List the entries of a directory in name order.
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, VfsError> {
        let segments = split_path(path)?;
        let children = if segments.is_empty() {
            &self.root
        } else {
            match self.lookup(&segments, path)? {
                Some(Node::Dir(children)) => children,
                Some(Node::File(_)) => return Err(VfsError::NotADirectory(path.to_string())),
                None => return Err(VfsError::NotFound(path.to_string())),
            }
        };
        Ok(children
            .iter()
            .map(|(name, node)| DirEntry {
                name: name.clone(),
                is_dir: matches!(node, Node::Dir(_)),
            })
            .collect())
    }

    pub fn exists(&self, path: &str) -> bool {
        match split_path(path) {
            Ok(segments) if segments.is_empty() => true,
            Ok(segments) => matches!(self.lookup(&segments, path), Ok(Some(_))),
            Err(_) => false,
        }
    }

    pub fn is_dir(&self, path: &str) -> bool {
        match split_path(path) {
            Ok(segments) if segments.is_empty() => true,
            Ok(segments) => matches!(self.lookup(&segments, path), Ok(Some(Node::Dir(_)))),
            Err(_) => false,
        }
    }

    pub fn is_file(&self, path: &str) -> bool {
        match split_path(path) {
            Ok(segments) => matches!(self.lookup(&segments, path), Ok(Some(Node::File(_)))),
            Err(_) => false,
        }
    }

    /// Move a single entry (file or directory with all descendants).
    ///
    /// The destination's parent must already exist and the destination
    /// itself must not.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), VfsError> {
        let from_segments = split_path(from)?;
        let to_segments = split_path(to)?;
        if from_segments.is_empty() || to_segments.is_empty() {
            return Err(VfsError::InvalidPath("cannot rename the root".to_string()));
        }
        if to_segments.len() > from_segments.len()
            && to_segments[..from_segments.len()] == from_segments[..]
        {
            return Err(VfsError::InvalidPath(format!(
                "cannot move {} inside itself ({})",
                from, to
            )));
        }
        if self.lookup(&from_segments, from)?.is_none() {
            return Err(VfsError::NotFound(from.to_string()));
        }
        if from_segments == to_segments {
            return Ok(());
        }

        let (to_name, to_parents) = to_segments
            .split_last()
            .ok_or_else(|| VfsError::InvalidPath(to.to_string()))?;
        match self.lookup_dir(to_parents, to)? {
            Some(dir) if dir.contains_key(*to_name) => {
                return Err(VfsError::AlreadyExists(to.to_string()));
            }
            Some(_) => {}
            None => return Err(VfsError::NotFound(to_parents.join("/"))),
        }

        let (from_name, from_parents) = from_segments
            .split_last()
            .ok_or_else(|| VfsError::InvalidPath(from.to_string()))?;
        let node = Self::dir_mut(&mut self.root, from_parents)
            .and_then(|dir| dir.remove(*from_name))
            .ok_or_else(|| VfsError::NotFound(from.to_string()))?;
        let target = Self::dir_mut(&mut self.root, to_parents)
            .ok_or_else(|| VfsError::NotFound(to_parents.join("/")))?;
        target.insert((*to_name).to_string(), node);
        Ok(())
    }

    /// All files with their contents, sorted by path.
    pub fn files(&self) -> Vec<(String, &[u8])> {
        let mut out = Vec::new();
        collect_files(&self.root, "", &mut out);
        out
    }

    pub fn file_count(&self) -> usize {
        self.files().len()
    }

    pub fn total_bytes(&self) -> usize {
        self.files().iter().map(|(_, bytes)| bytes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub(crate) fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&str, Option<&[u8]>),
    {
        walk_dir(&self.root, "", &mut visit);
    }

    fn lookup(&self, segments: &[&str], path: &str) -> Result<Option<&Node>, VfsError> {
        let Some((name, parents)) = segments.split_last() else {
            return Ok(None);
        };
        Ok(self.lookup_dir(parents, path)?.and_then(|dir| dir.get(*name)))
    }

    fn lookup_dir(
        &self,
        segments: &[&str],
        path: &str,
    ) -> Result<Option<&BTreeMap<String, Node>>, VfsError> {
        let mut dir = &self.root;
        for segment in segments {
            match dir.get(*segment) {
                Some(Node::Dir(children)) => dir = children,
                Some(Node::File(_)) => return Err(VfsError::NotADirectory(path.to_string())),
                None => return Ok(None),
            }
        }
        Ok(Some(dir))
    }

    fn dir_mut<'a>(
        root: &'a mut BTreeMap<String, Node>,
        segments: &[&str],
    ) -> Option<&'a mut BTreeMap<String, Node>> {
        let mut dir = root;
        for segment in segments {
            match dir.get_mut(*segment) {
                Some(Node::Dir(children)) => dir = children,
                _ => return None,
            }
        }
        Some(dir)
    }

    fn ensure_dir<'a>(
        root: &'a mut BTreeMap<String, Node>,
        segments: &[&str],
        path: &str,
    ) -> Result<&'a mut BTreeMap<String, Node>, VfsError> {
        let mut dir = root;
        for segment in segments {
            let node = dir
                .entry((*segment).to_string())
                .or_insert_with(|| Node::Dir(BTreeMap::new()));
            match node {
                Node::Dir(children) => dir = children,
                Node::File(_) => return Err(VfsError::NotADirectory(path.to_string())),
            }
        }
        Ok(dir)
    }
}

/// Split a relative path into its segments, rejecting `..` and absolute paths.
pub(crate) fn split_path(path: &str) -> Result<Vec<&str>, VfsError> {
    if path.starts_with('/') {
        return Err(VfsError::InvalidPath(path.to_string()));
    }
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(VfsError::InvalidPath(path.to_string())),
            other => segments.push(other),
        }
    }
    Ok(segments)
}

fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}

fn collect_files<'a>(dir: &'a BTreeMap<String, Node>, base: &str, out: &mut Vec<(String, &'a [u8])>) {
    for (name, node) in dir {
        let path = join(base, name);
        match node {
            Node::File(bytes) => out.push((path, bytes.as_slice())),
            Node::Dir(children) => collect_files(children, &path, out),
        }
    }
}

fn walk_dir<F>(dir: &BTreeMap<String, Node>, base: &str, visit: &mut F)
where
    F: FnMut(&str, Option<&[u8]>),
{
    for (name, node) in dir {
        let path = join(base, name);
        match node {
            Node::File(bytes) => visit(&path, Some(bytes.as_slice())),
            Node::Dir(children) => {
                visit(&path, None);
                walk_dir(children, &path, visit);
            }
        }
    }
}
