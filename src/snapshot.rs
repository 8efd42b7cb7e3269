//! Whole-store persistence in a single JSON snapshot file.
//!
//! Saves write a sibling `.tmp` file, sync it, and rename it over the
//! snapshot, so a reader only ever sees the previous or the new version.

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use tracing::{debug, error, info, warn};

use crate::{data_dir::DataDir, error::Result, store::Collections};

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    data_dir: DataDir,
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(data_dir: &DataDir) -> Self {
        Self {
            path: data_dir.snapshot_path(),
            data_dir: data_dir.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Atomically replace the snapshot with `collections`.
    pub fn try_save(&self, collections: &Collections) -> Result<()> {
        self.data_dir.ensure_layout()?;
        let bytes = serde_json::to_vec(collections)?;
        let tmp_path = self.tmp_path();

        let written = (|| -> Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            std::fs::rename(&tmp_path, &self.path)?;
            Ok(())
        })();

        if written.is_err() && tmp_path.exists() {
            let _ = std::fs::remove_file(&tmp_path);
        }
        written?;

        info!(
            path = %self.path.display(),
            collections = collections.len(),
            "saved snapshot"
        );
        Ok(())
    }

    /// Save, logging instead of returning failures. Returns whether the
    /// snapshot was written.
    pub fn save(&self, collections: &Collections) -> bool {
        match self.try_save(collections) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to save snapshot"
                );
                false
            }
        }
    }

    /// Read the snapshot. A missing file is an empty set.
    pub fn try_load(&self) -> Result<Collections> {
        self.data_dir.ensure_layout()?;

        let tmp_path = self.tmp_path();
        if tmp_path.exists() {
            debug!(path = %tmp_path.display(), "removing interrupted save");
            let _ = std::fs::remove_file(&tmp_path);
        }

        if !self.path.exists() {
            info!(
                path = %self.path.display(),
                "no snapshot found, starting empty"
            );
            return Ok(Collections::new());
        }

        let bytes = std::fs::read(&self.path)?;
        let collections: Collections = serde_json::from_slice(&bytes)?;
        info!(
            path = %self.path.display(),
            collections = ?collections.keys().collect::<Vec<_>>(),
            "loaded snapshot"
        );
        Ok(collections)
    }

    /// Load, falling back to an empty set on any failure.
    pub fn load(&self) -> Collections {
        self.try_load().unwrap_or_else(|e| {
            warn!(
                path = %self.path.display(),
                error = %e,
                "failed to load snapshot, starting empty"
            );
            Collections::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chunking::ChunkingConfig,
        ingestion,
        store::IndexStore,
    };

    fn snapshot_in(tmp: &tempfile::TempDir) -> SnapshotStore {
        SnapshotStore::new(&DataDir::resolve(Some(tmp.path())).unwrap())
    }

    #[test]
    fn missing_snapshot_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = snapshot_in(&tmp);
        assert!(snapshot.try_load().unwrap().is_empty());
    }

    #[test]
    fn build_save_reload_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let docs = tmp.path().join("docs");
        std::fs::create_dir_all(docs.join("sub")).unwrap();
        std::fs::write(
            docs.join("notes.md"),
            "#tags: alpha, beta\nHello world foo bar",
        )
        .unwrap();
        std::fs::write(docs.join("sub/long.txt"), "word ".repeat(1200))
            .unwrap();

        let outcome =
            ingestion::build_collection(&docs, &ChunkingConfig::default())
                .unwrap();
        let mut store = IndexStore::new();
        store.replace("docs", outcome.fragments.clone());

        let snapshot = snapshot_in(&tmp);
        snapshot.try_save(store.collections()).unwrap();
        assert!(!snapshot.tmp_path().exists());

        let mut reloaded = IndexStore::from_collections(snapshot.load());
        assert_eq!(reloaded.names(), vec!["docs"]);
        assert_eq!(reloaded.get("docs").unwrap(), outcome.fragments.as_slice());
    }

    #[test]
    fn save_preserves_collection_order() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = snapshot_in(&tmp);
        let mut store = IndexStore::new();
        for name in ["zulu", "alpha", "mike"] {
            store.replace(name, vec![]);
        }

        snapshot.try_save(store.collections()).unwrap();
        let reloaded = IndexStore::from_collections(snapshot.load());
        assert_eq!(reloaded.names(), vec!["zulu", "alpha", "mike"]);
    }

    #[test]
    fn corrupt_snapshot_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = snapshot_in(&tmp);
        std::fs::write(snapshot.path(), b"{ not json").unwrap();

        assert!(snapshot.try_load().is_err());
        assert!(snapshot.load().is_empty());
    }

    #[test]
    fn failed_save_is_logged_and_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = snapshot_in(&tmp);
        // A directory in the snapshot's place makes the rename fail.
        std::fs::create_dir_all(snapshot.path().join("blocker")).unwrap();

        let mut store = IndexStore::new();
        store.replace("docs", vec![]);
        assert!(!snapshot.save(store.collections()));
        assert!(!snapshot.tmp_path().exists());
    }

    #[test]
    fn failed_save_keeps_previous_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = snapshot_in(&tmp);
        let mut store = IndexStore::new();
        store.replace("first", vec![]);
        snapshot.try_save(store.collections()).unwrap();
        let before = std::fs::read(snapshot.path()).unwrap();

        // Occupy the temp path with a directory so the write fails.
        std::fs::create_dir(snapshot.tmp_path()).unwrap();
        store.replace("second", vec![]);
        assert!(!snapshot.save(store.collections()));

        assert_eq!(std::fs::read(snapshot.path()).unwrap(), before);
    }

    #[test]
    fn stale_temp_file_is_removed_on_load() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = snapshot_in(&tmp);
        std::fs::write(snapshot.tmp_path(), b"partial").unwrap();

        assert!(snapshot.load().is_empty());
        assert!(!snapshot.tmp_path().exists());
    }

    #[test]
    fn legacy_snapshot_migrates_and_saves_new_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = snapshot_in(&tmp);
        std::fs::write(
            snapshot.path(),
            r#"{"old": {"/d/a.txt": "legacy alpha", "/d/b.txt": "legacy beta"}}"#,
        )
        .unwrap();

        let mut store = IndexStore::from_collections(snapshot.load());
        assert_eq!(store.get("old").unwrap().len(), 2);
        snapshot.try_save(store.collections()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(snapshot.path()).unwrap())
                .unwrap();
        let old = raw.get("old").and_then(|v| v.as_array()).unwrap();
        assert_eq!(old.len(), 2);
        assert_eq!(old[0]["file"], "/d/a.txt");
        assert_eq!(old[0]["chunk_id"], 1);
        assert_eq!(old[0]["mtime"], 0.0);
    }
}
