use indexmap::IndexMap;
use tracing::info;

use crate::{
    error::{Error, Result},
    fragment::{FragmentRecord, StoredCollection},
};

/// Every collection, keyed by name, in creation order.
pub type Collections = IndexMap<String, StoredCollection>;

/// In-memory collection store.
///
/// Owned by whoever serves requests; callers that share it across threads
/// wrap it in a single mutex so replace and get never interleave.
#[derive(Debug, Default)]
pub struct IndexStore {
    collections: Collections,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_collections(collections: Collections) -> Self {
        Self { collections }
    }

    /// Install `fragments` under `name`, dropping whatever was there.
    pub fn replace(&mut self, name: &str, fragments: Vec<FragmentRecord>) {
        self.collections
            .insert(name.to_string(), StoredCollection::Fragments(fragments));
    }

    /// Fragments of `name`, upgrading a legacy collection on first access.
    pub fn get(&mut self, name: &str) -> Result<&[FragmentRecord]> {
        let collection = self
            .collections
            .get_mut(name)
            .ok_or_else(|| Error::not_found("index", name))?;

        if collection.is_legacy() {
            info!(collection = name, "migrating legacy collection");
        }
        Ok(collection.migrated())
    }

    pub fn names(&self) -> Vec<String> {
        self.collections.keys().cloned().collect()
    }

    pub fn collections(&self) -> &Collections {
        &self.collections
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
