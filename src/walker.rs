use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A discovered document file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path relative to the walk root.
    pub relative_path: PathBuf,
    /// The walk root joined with `relative_path`.
    pub absolute_path: PathBuf,
}

/// Supported file extensions for document discovery.
const SUPPORTED_EXTENSIONS: &[&str] = &["md", "txt"];

/// Recursively walk a directory and discover eligible document files.
///
/// Only files with supported extensions (.md, .txt) are returned, sorted by
/// relative path. Symlinked files are included; symlinked directories are
/// not entered, so the walk never leaves `root`. Subdirectories that cannot
/// be listed are logged and skipped.
pub fn discover_files(root: &Path) -> Result<Vec<DiscoveredFile>> {
    if !root.is_dir() {
        return Err(Error::not_found(
            "directory",
            root.display().to_string(),
        ));
    }

    let mut results = Vec::new();
    walk_dir(root, root, &mut results)?;
    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(results)
}

fn walk_dir(
    root: &Path,
    current: &Path,
    results: &mut Vec<DiscoveredFile>,
) -> Result<()> {
    let entries = std::fs::read_dir(current)?;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %current.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if let Err(e) = walk_dir(root, &path, results) {
                warn!(dir = %path.display(), error = %e, "skipping unreadable directory");
            }
        } else if file_type.is_symlink() {
            // Linked directories are never entered; linked files are read.
            if path.is_file() && is_supported(&path) {
                results.push(make_discovered(root, &path));
            } else if path.is_dir() {
                debug!(dir = %path.display(), "not following directory symlink");
            }
        } else if file_type.is_file() && is_supported(&path) {
            results.push(make_discovered(root, &path));
        }
    }

    Ok(())
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext))
}

fn make_discovered(root: &Path, path: &Path) -> DiscoveredFile {
    let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();

    DiscoveredFile {
        absolute_path: root.join(&relative_path),
        relative_path,
    }
}
