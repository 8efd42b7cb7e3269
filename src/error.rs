use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("file '{0}' already exists")]
    Conflict(PathBuf),

    #[error("access to path '{0}' is not allowed")]
    AccessDenied(PathBuf),

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}

impl Error {
    pub(crate) fn not_found(
        kind: &'static str,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}
