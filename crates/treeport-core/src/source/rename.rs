//! Canonical naming of a materialized tree's root entry.

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, SourceError};
use crate::vfs::{MemoryFs, VfsError};

const CHART_MANIFEST: &str = "Chart.yaml";

/// Rename the single top-level entry of `fs` to `canonical_name`.
///
/// Does nothing when the name is empty, when the tree does not have exactly
/// one top-level entry, or when that entry already carries the name.
pub fn apply_root_name(fs: &mut MemoryFs, canonical_name: &str) -> Result<()> {
    if canonical_name.is_empty() {
        return Ok(());
    }
    let entries = fs.read_dir("")?;
    let [entry] = entries.as_slice() else {
        debug!(entries = entries.len(), "root rename skipped");
        return Ok(());
    };
    if entry.name == canonical_name {
        return Ok(());
    }

    let rename_error = |source: VfsError| SourceError::Rename {
        from: entry.name.clone(),
        to: canonical_name.to_string(),
        source,
    };
    if canonical_name.contains('/') || canonical_name == "." || canonical_name == ".." {
        return Err(rename_error(VfsError::InvalidPath(canonical_name.to_string())));
    }
    fs.rename(&entry.name, canonical_name).map_err(rename_error)?;
    debug!(from = entry.name.as_str(), to = canonical_name, "renamed root entry");
    Ok(())
}

/// Root name taken from the `name:` field of a Helm chart manifest.
///
/// The manifest is looked up at the tree root, then inside the single
/// top-level directory.
pub fn chart_name_deriver(fs: &MemoryFs) -> Result<String> {
    let manifest = manifest_path(fs)
        .ok_or_else(|| SourceError::Derive(format!("no {} in tree", CHART_MANIFEST)))?;
    let content = fs
        .read_to_string(&manifest)
        .map_err(|e| SourceError::Derive(format!("{}: {}", manifest, e)))?;
    chart_name(&content).map_err(|e| SourceError::Derive(format!("{}: {}", manifest, e)))
}

fn manifest_path(fs: &MemoryFs) -> Option<String> {
    if fs.is_file(CHART_MANIFEST) {
        return Some(CHART_MANIFEST.to_string());
    }
    let entries = fs.read_dir("").ok()?;
    match entries.as_slice() {
        [dir] if dir.is_dir => {
            let nested = format!("{}/{}", dir.name, CHART_MANIFEST);
            fs.is_file(&nested).then_some(nested)
        }
        _ => None,
    }
}

/// The fields of Chart.yaml read here; everything else is ignored.
#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    name: String,
}

/// Value of the top-level `name` key.
fn chart_name(content: &str) -> std::result::Result<String, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let meta: ChartMeta = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    let name = meta.name.trim();
    if name.is_empty() {
        return Err("no name field".to_string());
    }
    Ok(name.to_string())
}
