use std::{fmt, path::Path, time::SystemTime};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::{
    chunking::ChunkingConfig,
    error::Result,
    fragment::FragmentRecord,
    tags,
    walker::{self, DiscoveredFile},
};

/// Fragments produced by one build, plus what was skipped.
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub fragments: Vec<FragmentRecord>,
    pub files_indexed: usize,
    pub skipped: usize,
}

impl BuildOutcome {
    pub fn summary(&self, name: &str) -> BuildSummary {
        BuildSummary {
            name: name.to_string(),
            files_indexed: self.files_indexed,
            chunks: self.fragments.len(),
            skipped: self.skipped,
        }
    }
}

/// Human-readable result of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub name: String,
    pub files_indexed: usize,
    pub chunks: usize,
    pub skipped: usize,
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Successfully created index '{}'. {} files indexed, {} chunks.",
            self.name, self.files_indexed, self.chunks
        )?;
        if self.skipped > 0 {
            write!(
                f,
                "\nWarning: {} files could not be read and were skipped \
                 (check server logs for details).",
                self.skipped
            )?;
        }
        Ok(())
    }
}

fn modified_secs(path: &Path) -> std::io::Result<f64> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64())
}

/// Read one file into its fragments.
fn load_file(
    file: &DiscoveredFile,
    config: &ChunkingConfig,
) -> std::io::Result<Vec<FragmentRecord>> {
    let mtime = modified_secs(&file.absolute_path)?;
    let content = std::fs::read_to_string(&file.absolute_path)?;
    let tags = tags::extract_tags(&content);
    let body = tags::strip_tag_line(&content);
    let path = file.absolute_path.to_string_lossy().to_string();

    Ok(config
        .chunk(&body)
        .into_iter()
        .zip(1u32..)
        .map(|(text, chunk_id)| FragmentRecord {
            file: path.clone(),
            chunk_id,
            text,
            mtime,
            tags: tags.clone(),
        })
        .collect())
}

/// Walk `root` and chunk every eligible file.
///
/// Files are read in parallel; fragment order follows the sorted walk.
/// A file that cannot be read is logged and counted in `skipped`.
pub fn build_collection(
    root: &Path,
    config: &ChunkingConfig,
) -> Result<BuildOutcome> {
    let files = walker::discover_files(root)?;

    let loaded: Vec<_> = files
        .par_iter()
        .map(|file| (file, load_file(file, config)))
        .collect();

    let mut outcome = BuildOutcome::default();
    for (file, result) in loaded {
        match result {
            Ok(fragments) => {
                outcome.files_indexed += 1;
                outcome.fragments.extend(fragments);
            }
            Err(e) => {
                warn!(
                    file = %file.absolute_path.display(),
                    error = %e,
                    "skipping unreadable file"
                );
                outcome.skipped += 1;
            }
        }
    }

    info!(
        root = %root.display(),
        files = outcome.files_indexed,
        chunks = outcome.fragments.len(),
        skipped = outcome.skipped,
        "built collection"
    );
    Ok(outcome)
}
