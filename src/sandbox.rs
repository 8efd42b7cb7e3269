//! Confinement of tool path arguments to one directory tree.

use std::path::{Component, Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct PathSandbox {
    base: PathBuf,
    allowed_root: PathBuf,
}

impl PathSandbox {
    /// `base` anchors relative arguments; `allowed_root` bounds every
    /// resolved path. Both are normalized up front.
    pub fn new(base: &Path, allowed_root: &Path) -> Self {
        let allowed_root = if allowed_root.is_absolute() {
            normalize(allowed_root)
        } else {
            normalize(&base.join(allowed_root))
        };
        Self {
            base: normalize(base),
            allowed_root,
        }
    }

    pub fn allowed_root(&self) -> &Path {
        &self.allowed_root
    }

    /// Absolute, lexically normalized form of `raw`, or `AccessDenied` if
    /// it falls outside the allowed root.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf> {
        let path = Path::new(raw);
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        };
        let resolved = normalize(&joined);

        if resolved.starts_with(&self.allowed_root) {
            Ok(resolved)
        } else {
            Err(Error::AccessDenied(resolved))
        }
    }

    /// Reject the call if any path-like argument escapes the allowed root.
    ///
    /// Only string values under keys containing `path` are inspected; empty
    /// strings are ignored.
    pub fn check_arguments(&self, arguments: &Map<String, Value>) -> Result<()> {
        for (key, value) in arguments {
            if !key.contains("path") {
                continue;
            }
            let Some(raw) = value.as_str().filter(|s| !s.is_empty()) else {
                continue;
            };
            if let Err(e) = self.resolve(raw) {
                warn!(argument = %key, value = raw, "path outside allowed root");
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Fold `.` and `..` without touching the filesystem. `..` at the root
/// stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir | Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sandbox() -> PathSandbox {
        PathSandbox::new(Path::new("/srv/data"), Path::new("/srv/data"))
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), Path::new("/a/c"));
        assert_eq!(normalize(Path::new("/../../x")), Path::new("/x"));
        assert_eq!(normalize(Path::new("/a/b/")), Path::new("/a/b"));
    }

    #[test]
    fn relative_paths_join_base() {
        let resolved = sandbox().resolve("docs/./notes").unwrap();
        assert_eq!(resolved, Path::new("/srv/data/docs/notes"));
    }

    #[test]
    fn root_itself_is_allowed() {
        assert_eq!(sandbox().resolve("/srv/data").unwrap(), Path::new("/srv/data"));
        assert_eq!(sandbox().resolve(".").unwrap(), Path::new("/srv/data"));
    }

    #[test]
    fn traversal_is_denied() {
        let err = sandbox().resolve("../../etc/passwd").unwrap_err();
        assert!(matches!(err, Error::AccessDenied(p) if p == Path::new("/etc/passwd")));
    }

    #[test]
    fn sibling_prefix_is_denied() {
        assert!(sandbox().resolve("/srv/data-other/x").is_err());
    }

    #[test]
    fn relative_allowed_root_is_anchored_at_base() {
        let sandbox =
            PathSandbox::new(Path::new("/srv/data"), Path::new("uploads"));
        assert_eq!(sandbox.allowed_root(), Path::new("/srv/data/uploads"));
        assert!(sandbox.resolve("uploads/a.md").is_ok());
        assert!(sandbox.resolve("images/a.png").is_err());
    }

    #[test]
    fn check_arguments_inspects_path_keys_only() {
        let sandbox = sandbox();
        sandbox
            .check_arguments(&args(json!({
                "index_name": "../../etc",
                "directory_path": "docs",
                "query": "/etc/passwd",
            })))
            .unwrap();

        let err = sandbox
            .check_arguments(&args(json!({
                "index_name": "docs",
                "directory_path": "/etc",
            })))
            .unwrap_err();
        assert!(matches!(err, Error::AccessDenied(_)));
    }

    #[test]
    fn check_arguments_skips_empty_and_non_strings() {
        sandbox()
            .check_arguments(&args(json!({
                "path_contains": "",
                "file_path": 42,
            })))
            .unwrap();
    }

    #[test]
    fn path_contains_is_checked_too() {
        assert!(
            sandbox()
                .check_arguments(&args(json!({ "path_contains": "/tmp" })))
                .is_err()
        );
    }
}
