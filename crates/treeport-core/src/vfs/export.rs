//! Export a materialized tree to the local filesystem.

use std::path::Path;

use anyhow::Context;

use super::MemoryFs;

/// Write every directory and file of `fs` below `dest`.
///
/// `dest` is created if missing. Existing files with the same relative
/// path are overwritten.
pub fn write_to_dir(fs: &MemoryFs, dest: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create output directory: {}", dest.display()))?;

    let mut result = Ok(());
    fs.walk(|path, contents| {
        if result.is_err() {
            return;
        }
        let target = dest.join(path);
        result = match contents {
            None => std::fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create directory: {}", target.display())),
            Some(bytes) => std::fs::write(&target, bytes)
                .with_context(|| format!("Failed to write file: {}", target.display())),
        };
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_nested_files_and_empty_dirs() {
        let tmp = TempDir::new().expect("tempdir should succeed");
        let mut fs = MemoryFs::new();
        fs.write_file("my-service/Chart.yaml", "name: my-service\n")
            .unwrap();
        fs.write_file("my-service/templates/svc.yaml", "kind: Service\n")
            .unwrap();
        fs.create_dir_all("my-service/crds").unwrap();

        write_to_dir(&fs, tmp.path()).expect("export should succeed");

        let chart = std::fs::read_to_string(tmp.path().join("my-service/Chart.yaml")).unwrap();
        assert_eq!(chart, "name: my-service\n");
        assert!(tmp.path().join("my-service/templates/svc.yaml").is_file());
        assert!(tmp.path().join("my-service/crds").is_dir());
    }
}
