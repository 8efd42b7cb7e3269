use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Working subdirectories kept next to the snapshot.
const SUBDIRECTORIES: &[&str] = &["uploads", "saved_chats", "indexes", "images"];

const SNAPSHOT_FILE: &str = "indexes.json";

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The RAGSHELF_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/ragshelf/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var("RAGSHELF_DATA_DIR") {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("ragshelf")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?
        };

        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(root)
        };

        let dir = Self { root };
        dir.ensure_layout()?;
        Ok(dir)
    }

    /// Create the root and every working subdirectory if missing.
    pub fn ensure_layout(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .map_err(|_| Error::DataDir(self.root.clone()))?;
        for sub in SUBDIRECTORIES {
            let path = self.root.join(sub);
            std::fs::create_dir_all(&path)
                .map_err(|_| Error::DataDir(path.clone()))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(SNAPSHOT_FILE)
    }

    pub fn saved_chats_dir(&self) -> PathBuf {
        self.root.join("saved_chats")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_with_explicit_path() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::resolve(Some(tmp.path())).unwrap();

        assert_eq!(dir.root(), tmp.path());
        assert_eq!(dir.snapshot_path(), tmp.path().join("indexes.json"));
        assert_eq!(dir.images_dir(), tmp.path().join("images"));
    }

    #[test]
    fn working_subdirectories_are_created() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("nested").join("data");
        let dir = DataDir::resolve(Some(&root)).unwrap();

        for sub in SUBDIRECTORIES {
            assert!(dir.root().join(sub).is_dir(), "{sub} should exist");
        }
    }

    #[test]
    fn ensure_layout_recreates_removed_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::resolve(Some(tmp.path())).unwrap();
        std::fs::remove_dir(dir.saved_chats_dir()).unwrap();

        dir.ensure_layout().unwrap();
        assert!(dir.saved_chats_dir().is_dir());
    }
}
