//! Plain file operations exposed next to the index tools.

use std::{
    fmt::Write as _,
    fs::OpenOptions,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{Error, Result};

/// Sorted listing of `dir` with `[D]`/`[F]` markers.
pub fn list_directory(dir: &Path) -> Result<String> {
    if !dir.is_dir() {
        return Err(Error::not_found("directory", dir.display().to_string()));
    }

    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().to_string()))
        .collect::<std::io::Result<Vec<_>>>()?;
    if entries.is_empty() {
        return Ok(format!("The directory '{}' is empty.", dir.display()));
    }
    entries.sort();

    let mut out = format!("Contents of '{}':", dir.display());
    for name in entries {
        let marker = if dir.join(&name).is_dir() { 'D' } else { 'F' };
        let _ = write!(out, "\n[{marker}] {name}");
    }
    Ok(out)
}

pub fn read_text_file(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(Error::not_found("file", path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Create `path` and write `bytes`, failing with `Conflict` if it exists.
fn write_new(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => Error::Conflict(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
    file.write_all(bytes)?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct SaveChatRequest {
    pub transcript: String,
    pub model: String,
    pub summarize: bool,
    pub summary: String,
    pub session_id: String,
}

fn slug(value: &str) -> String {
    value.replace(' ', "_")
}

/// Write a transcript (and optionally its summary) as new files in `dir`.
///
/// Names are `<YYYY-MM-DD_HH-MM>_<model>[_<session>]_{raw,summary}.txt`.
/// Nothing is written if any target name is already taken.
pub fn save_chat(
    dir: &Path,
    request: &SaveChatRequest,
    now: DateTime<Utc>,
) -> Result<String> {
    std::fs::create_dir_all(dir)?;

    let timestamp = now.format("%Y-%m-%d_%H-%M").to_string();
    let model = if request.model.is_empty() {
        "unknown".to_string()
    } else {
        slug(&request.model)
    };
    let session = slug(&request.session_id);

    let mut stem = format!("{timestamp}_{model}");
    if !session.is_empty() {
        stem.push('_');
        stem.push_str(&session);
    }

    let mut pending: Vec<(PathBuf, &str)> = Vec::new();
    if !request.transcript.is_empty() {
        pending.push((
            dir.join(format!("{stem}_raw.txt")),
            request.transcript.as_str(),
        ));
    }
    if request.summarize && !request.summary.is_empty() {
        pending.push((
            dir.join(format!("{stem}_summary.txt")),
            request.summary.as_str(),
        ));
    }

    if let Some((taken, _)) = pending.iter().find(|(path, _)| path.exists()) {
        return Err(Error::Conflict(taken.clone()));
    }
    for (path, content) in &pending {
        write_new(path, content.as_bytes())?;
        info!(path = %path.display(), "saved chat");
    }

    let mut details = format!("Saved {} file(s):", pending.len());
    for (path, _) in &pending {
        let _ = write!(details, "\n- {}", path.display());
    }
    let _ = write!(details, "\ntimestamp_utc: {timestamp}\nmodel: {model}");
    if !session.is_empty() {
        let _ = write!(details, "\nsession_id: {session}");
    }
    Ok(details)
}

/// Decode base64 (optionally a `data:` URL) into a new file in `dir`.
///
/// Only the last component of `filename` is used.
pub fn save_image(dir: &Path, content: &str, filename: &str) -> Result<PathBuf> {
    if content.is_empty() || filename.is_empty() {
        return Err(Error::Validation(
            "base64_content and filename are required".into(),
        ));
    }
    let name = Path::new(filename)
        .file_name()
        .ok_or_else(|| Error::Validation(format!("invalid filename: {filename}")))?;

    std::fs::create_dir_all(dir)?;
    let target = dir.join(name);
    if target.exists() {
        return Err(Error::Conflict(target));
    }

    let payload = match content.split_once(',') {
        Some((prefix, data))
            if prefix.to_ascii_lowercase().starts_with("data:") =>
        {
            data
        }
        _ => content,
    };
    let compact: String =
        payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::Validation(format!("invalid base64 content: {e}")))?;

    write_new(&target, &bytes)?;
    info!(path = %target.display(), bytes = bytes.len(), "saved image");
    Ok(target)
}
