use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::debug;
use walkdir::WalkDir;

/// Copy the C++ runtime support tree at `root` into `destination`.
///
/// Returns the number of files copied.
pub fn copy_runtime(root: &Path, destination: &Path) -> Result<usize> {
    if !root.is_dir() {
        bail!("missing runtime support tree at {}", root.display());
    }
    let mut copied = 0;
    for entry in WalkDir::new(root) {
        let entry =
            entry.with_context(|| format!("failed to walk runtime tree {}", root.display()))?;
        let relative = entry.path().strip_prefix(root)?;
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("failed to create directory {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
            debug!(file = %relative.display(), "copied runtime file");
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn copies_nested_files() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path().join("src");
        fs::create_dir_all(root.join("core")).expect("create runtime");
        fs::write(root.join("core/core.hpp"), "#pragma once\n").expect("write header");
        fs::write(root.join("README"), "runtime").expect("write readme");

        let destination = dir.path().join("build/src");
        let copied = copy_runtime(&root, &destination).expect("copy");

        assert_eq!(copied, 2);
        assert_eq!(
            fs::read_to_string(destination.join("core/core.hpp")).expect("read header"),
            "#pragma once\n"
        );
    }

    #[test]
    fn rejects_missing_root() {
        let dir = tempdir().expect("tempdir");
        let err = copy_runtime(&dir.path().join("absent"), &dir.path().join("out")).unwrap_err();
        assert!(err.to_string().starts_with("missing runtime support tree at"));
    }
}
