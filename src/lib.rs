//! ragshelf - named, fuzzy-searchable collections of local text documents.
//!
//! A directory of `.md` and `.txt` files is split into overlapping word
//! chunks, tagged from an optional `#tags:` line, and stored under a name.
//! Collections are persisted as one JSON snapshot and searched by substring
//! or approximate match, optionally filtered by path, tag and mtime. The
//! same operations are served to AI agents over MCP.
//!
//! # Quick start
//!
//! ```no_run
//! use ragshelf::{ChunkingConfig, DataDir, IndexStore, SnapshotStore};
//! use ragshelf::search::{self, SearchParams};
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let snapshot = SnapshotStore::new(&data_dir);
//! let mut store = IndexStore::from_collections(snapshot.load());
//!
//! let outcome = ragshelf::ingestion::build_collection(
//!     std::path::Path::new("./notes"),
//!     &ChunkingConfig::default(),
//! )
//! .unwrap();
//! store.replace("notes", outcome.fragments);
//! snapshot.save(store.collections());
//!
//! let params = SearchParams {
//!     collection: "notes".to_string(),
//!     query: "ownership".to_string(),
//!     fuzzy: true,
//!     ..Default::default()
//! };
//! let hits = search::execute_search(&mut store, &params).unwrap();
//! println!("{}", search::format_hits(&hits, &params.query, "notes"));
//! ```

pub mod chunking;
pub mod cli;
pub mod data_dir;
pub mod error;
pub mod files;
pub mod fragment;
pub mod fuzzy;
pub mod ingestion;
pub mod mcp;
pub mod sandbox;
pub mod search;
pub mod snapshot;
pub mod store;
pub mod tags;
pub mod walker;

pub use chunking::ChunkingConfig;
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use fragment::FragmentRecord;
pub use sandbox::PathSandbox;
pub use snapshot::SnapshotStore;
pub use store::IndexStore;
