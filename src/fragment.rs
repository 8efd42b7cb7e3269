//! Fragment records and the persisted shapes of a collection.

use serde::{Deserialize, Deserializer, Serialize};

use indexmap::IndexMap;

/// One chunk of one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentRecord {
    /// Source file path.
    pub file: String,
    /// 1-based chunk number, contiguous within a file.
    pub chunk_id: u32,
    pub text: String,
    /// Source modification time in epoch seconds; 0 when unknown.
    #[serde(default, deserialize_with = "epoch_seconds")]
    pub mtime: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Accept integer or fractional epoch seconds; null or negative reads as 0.
fn epoch_seconds<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<f64, D::Error> {
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0))
}

/// A collection as it sits in the store or the snapshot file.
///
/// Older snapshots stored each collection as a flat `path -> whole text`
/// object. Those are upgraded by [`StoredCollection::migrate`] the first
/// time the collection is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredCollection {
    Fragments(Vec<FragmentRecord>),
    Legacy(IndexMap<String, String>),
}

impl StoredCollection {
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }

    /// Upgrade a legacy collection in place. Returns `true` if anything
    /// changed; a second call is a no-op.
    pub fn migrate(&mut self) -> bool {
        let Self::Legacy(entries) = self else {
            return false;
        };
        let entries = std::mem::take(entries);
        *self = Self::Fragments(migrate_legacy(entries));
        true
    }

    /// Migrate if needed and borrow the fragments.
    pub fn migrated(&mut self) -> &[FragmentRecord] {
        self.migrate();
        match self {
            Self::Fragments(fragments) => fragments.as_slice(),
            Self::Legacy(_) => &[],
        }
    }

    #[cfg(test)]
    fn fragments(&self) -> Option<&[FragmentRecord]> {
        match self {
            Self::Fragments(fragments) => Some(fragments.as_slice()),
            Self::Legacy(_) => None,
        }
    }
}

/// One fragment per legacy entry, in entry order.
pub fn migrate_legacy(entries: IndexMap<String, String>) -> Vec<FragmentRecord> {
    entries
        .into_iter()
        .map(|(file, text)| FragmentRecord {
            file,
            chunk_id: 1,
            text,
            mtime: 0.0,
            tags: Vec::new(),
        })
        .collect()
}
