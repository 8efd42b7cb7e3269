use serde::Serialize;

use crate::{
    error::Result,
    fragment::FragmentRecord,
    fuzzy,
    store::IndexStore,
};

/// Default fuzzy threshold when none (or a non-positive one) is given.
pub const DEFAULT_FUZZY_THRESHOLD: f32 = 0.6;

/// Maximum characters of fragment text shown per hit.
pub const SNIPPET_MAX_CHARS: usize = 300;

/// One search request against a single collection.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub collection: String,
    pub query: String,
    pub fuzzy: bool,
    pub threshold: Option<f32>,
    pub filters: SearchFilters,
}

/// Metadata filters applied before any text matching.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Case-insensitive substring of the source path.
    pub path_contains: Option<String>,
    /// Case-insensitive exact tag.
    pub tag: Option<String>,
    /// Inclusive lower bound on mtime. Fragments with unknown mtime pass.
    pub min_mtime: Option<f64>,
    /// Inclusive upper bound on mtime. Fragments with unknown mtime pass.
    pub max_mtime: Option<f64>,
}

impl SearchFilters {
    fn compile(&self) -> CompiledFilters {
        let lower = |s: &Option<String>| {
            s.as_deref()
                .map(str::to_lowercase)
                .filter(|s| !s.is_empty())
        };
        CompiledFilters {
            path_contains: lower(&self.path_contains),
            tag: lower(&self.tag),
            min_mtime: self.min_mtime,
            max_mtime: self.max_mtime,
        }
    }
}

struct CompiledFilters {
    path_contains: Option<String>,
    tag: Option<String>,
    min_mtime: Option<f64>,
    max_mtime: Option<f64>,
}

impl CompiledFilters {
    fn accepts(&self, fragment: &FragmentRecord) -> bool {
        if let Some(ref needle) = self.path_contains
            && !fragment.file.to_lowercase().contains(needle)
        {
            return false;
        }
        if let Some(ref tag) = self.tag
            && !fragment.tags.iter().any(|t| t.to_lowercase() == *tag)
        {
            return false;
        }
        if fragment.mtime > 0.0 {
            let mtime = fragment.mtime;
            if self.min_mtime.is_some_and(|min| mtime < min) {
                return false;
            }
            if self.max_mtime.is_some_and(|max| mtime > max) {
                return false;
            }
        }
        true
    }
}

/// A matching fragment, ready to print.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub file: String,
    pub chunk_id: u32,
    pub snippet: String,
    pub mtime: f64,
    pub tags: Vec<String>,
}

impl SearchHit {
    fn from_fragment(fragment: &FragmentRecord) -> Self {
        Self {
            file: fragment.file.clone(),
            chunk_id: fragment.chunk_id,
            snippet: fragment.text.chars().take(SNIPPET_MAX_CHARS).collect(),
            mtime: fragment.mtime,
            tags: fragment.tags.clone(),
        }
    }

    pub fn render(&self) -> String {
        format!("[{}] chunk {}\n{}\n", self.file, self.chunk_id, self.snippet)
    }
}

fn effective_threshold(threshold: Option<f32>) -> f32 {
    threshold
        .filter(|t| *t > 0.0)
        .unwrap_or(DEFAULT_FUZZY_THRESHOLD)
}

/// Scan one collection in order and return every matching fragment.
///
/// 1. Drop fragments rejected by the metadata filters
/// 2. Keep fragments containing the query (case-insensitive)
/// 3. With `fuzzy`, also keep fragments the fuzzy matcher accepts
///
/// Order is collection order; there is no scoring.
pub fn execute_search(
    store: &mut IndexStore,
    params: &SearchParams,
) -> Result<Vec<SearchHit>> {
    let fragments = store.get(&params.collection)?;
    let query = params.query.to_lowercase();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let filters = params.filters.compile();
    let threshold = effective_threshold(params.threshold);

    Ok(fragments
        .iter()
        .filter(|fragment| filters.accepts(fragment))
        .filter(|fragment| {
            fragment.text.to_lowercase().contains(&query)
                || (params.fuzzy
                    && fuzzy::fuzzy_matches(
                        &params.query,
                        &fragment.text,
                        threshold,
                    ))
        })
        .map(SearchHit::from_fragment)
        .collect())
}

/// Render hits as text blocks separated by blank lines.
pub fn format_hits(hits: &[SearchHit], query: &str, collection: &str) -> String {
    if hits.is_empty() {
        return format!(
            "No results found for query: '{query}' in index '{collection}'"
        );
    }

    hits.iter()
        .map(SearchHit::render)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render hits as a JSON document.
pub fn format_json(
    hits: &[SearchHit],
    query: &str,
    collection: &str,
) -> Result<String> {
    #[derive(Serialize)]
    struct JsonResults<'a> {
        query: &'a str,
        collection: &'a str,
        result_count: usize,
        results: &'a [SearchHit],
    }

    Ok(serde_json::to_string_pretty(&JsonResults {
        query,
        collection,
        result_count: hits.len(),
        results: hits,
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn fragment(
        file: &str,
        chunk_id: u32,
        text: &str,
        mtime: f64,
        tags: &[&str],
    ) -> FragmentRecord {
        FragmentRecord {
            file: file.to_string(),
            chunk_id,
            text: text.to_string(),
            mtime,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// A store with one collection of sample fragments.
    fn setup_store() -> IndexStore {
        let mut store = IndexStore::new();
        store.replace(
            "notes",
            vec![
                fragment(
                    "/docs/rust/guide.md",
                    1,
                    "Rust is a systems programming language focused on \
                     safety, concurrency, and performance.",
                    1_000.0,
                    &["rust", "lang"],
                ),
                fragment(
                    "/docs/rust/guide.md",
                    2,
                    "Ownership rules keep memory safe without a garbage \
                     collector.",
                    1_000.0,
                    &["rust", "lang"],
                ),
                fragment(
                    "/docs/python/intro.md",
                    1,
                    "Python is a high-level interpreted programming language.",
                    2_000.0,
                    &["python"],
                ),
                fragment(
                    "/docs/legacy/old.txt",
                    1,
                    "An old programming note with unknown timestamp.",
                    0.0,
                    &[],
                ),
            ],
        );
        store
    }

    fn params(query: &str) -> SearchParams {
        SearchParams {
            collection: "notes".to_string(),
            query: query.to_string(),
            ..Default::default()
        }
    }

    fn files(hits: &[SearchHit]) -> Vec<(&str, u32)> {
        hits.iter().map(|h| (h.file.as_str(), h.chunk_id)).collect()
    }

    #[test]
    fn substring_search_keeps_collection_order() {
        let mut store = setup_store();
        let hits = execute_search(&mut store, &params("PROGRAMMING")).unwrap();
        assert_eq!(
            files(&hits),
            vec![
                ("/docs/rust/guide.md", 1),
                ("/docs/python/intro.md", 1),
                ("/docs/legacy/old.txt", 1),
            ]
        );
    }

    #[test]
    fn missing_collection_is_not_found() {
        let mut store = setup_store();
        let mut p = params("rust");
        p.collection = "ghost".to_string();
        assert!(matches!(
            execute_search(&mut store, &p),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn empty_query_matches_nothing() {
        let mut store = setup_store();
        assert!(execute_search(&mut store, &params("")).unwrap().is_empty());
    }

    #[test]
    fn path_filter_is_case_insensitive() {
        let mut store = setup_store();
        let mut p = params("language");
        p.filters.path_contains = Some("PYTHON".to_string());
        let hits = execute_search(&mut store, &p).unwrap();
        assert_eq!(files(&hits), vec![("/docs/python/intro.md", 1)]);
    }

    #[test]
    fn tag_filter_is_exact_membership() {
        let mut store = setup_store();
        let mut p = params("a");
        p.filters.tag = Some("Rust".to_string());
        let hits = execute_search(&mut store, &p).unwrap();
        assert_eq!(hits.len(), 2);

        p.filters.tag = Some("rus".to_string());
        assert!(execute_search(&mut store, &p).unwrap().is_empty());
    }

    #[test]
    fn mtime_bounds_are_inclusive_and_skip_unknown() {
        let mut store = setup_store();
        let mut p = params("programming");
        p.filters.min_mtime = Some(2_000.0);
        let hits = execute_search(&mut store, &p).unwrap();
        assert_eq!(
            files(&hits),
            vec![("/docs/python/intro.md", 1), ("/docs/legacy/old.txt", 1)]
        );

        p.filters.min_mtime = None;
        p.filters.max_mtime = Some(1_000.0);
        let hits = execute_search(&mut store, &p).unwrap();
        assert_eq!(
            files(&hits),
            vec![("/docs/rust/guide.md", 1), ("/docs/legacy/old.txt", 1)]
        );
    }

    #[test]
    fn fractional_mtime_meets_bound_exactly() {
        let mut store = IndexStore::new();
        store.replace(
            "frac",
            vec![fragment("/a.md", 1, "needle", 1_700_000_000.75, &[])],
        );

        let mut p = params("needle");
        p.collection = "frac".to_string();
        p.filters.min_mtime = Some(1_700_000_000.75);
        assert_eq!(execute_search(&mut store, &p).unwrap().len(), 1);

        p.filters.min_mtime = Some(1_700_000_000.8);
        assert!(execute_search(&mut store, &p).unwrap().is_empty());

        p.filters.min_mtime = None;
        p.filters.max_mtime = Some(1_700_000_000.5);
        assert!(execute_search(&mut store, &p).unwrap().is_empty());
    }

    #[test]
    fn empty_filter_strings_are_ignored() {
        let mut store = setup_store();
        let mut p = params("programming");
        p.filters.path_contains = Some(String::new());
        p.filters.tag = Some(String::new());
        assert_eq!(execute_search(&mut store, &p).unwrap().len(), 3);
    }

    #[test]
    fn fuzzy_is_opt_in() {
        let mut store = setup_store();
        let mut p = params("garbage colector");
        assert!(execute_search(&mut store, &p).unwrap().is_empty());

        p.fuzzy = true;
        let hits = execute_search(&mut store, &p).unwrap();
        assert_eq!(files(&hits), vec![("/docs/rust/guide.md", 2)]);
    }

    #[test]
    fn fuzzy_threshold_one_accepts_only_substrings() {
        let mut store = setup_store();
        let mut p = params("garbage colector");
        p.fuzzy = true;
        p.threshold = Some(1.0);
        assert!(execute_search(&mut store, &p).unwrap().is_empty());

        p.query = "garbage collector".to_string();
        assert_eq!(execute_search(&mut store, &p).unwrap().len(), 1);
    }

    #[test]
    fn non_positive_threshold_uses_default() {
        assert_eq!(effective_threshold(Some(0.0)), DEFAULT_FUZZY_THRESHOLD);
        assert_eq!(effective_threshold(None), DEFAULT_FUZZY_THRESHOLD);
        assert_eq!(effective_threshold(Some(0.9)), 0.9);
    }

    #[test]
    fn snippet_is_capped_at_300_chars() {
        let mut store = IndexStore::new();
        let text = format!("needle {}", "é".repeat(400));
        store.replace("big", vec![fragment("/a.md", 3, &text, 5.0, &[])]);

        let mut p = params("needle");
        p.collection = "big".to_string();
        let hits = execute_search(&mut store, &p).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, 3);
        assert_eq!(hits[0].snippet.chars().count(), SNIPPET_MAX_CHARS);
    }

    #[test]
    fn format_hits_renders_blocks() {
        let hits = vec![
            SearchHit {
                file: "/d/a.md".to_string(),
                chunk_id: 1,
                snippet: "first".to_string(),
                mtime: 0.0,
                tags: vec![],
            },
            SearchHit {
                file: "/d/b.md".to_string(),
                chunk_id: 4,
                snippet: "second".to_string(),
                mtime: 0.0,
                tags: vec![],
            },
        ];
        assert_eq!(
            format_hits(&hits, "q", "docs"),
            "[/d/a.md] chunk 1\nfirst\n\n\n[/d/b.md] chunk 4\nsecond\n"
        );
    }

    #[test]
    fn format_hits_empty_message() {
        assert_eq!(
            format_hits(&[], "zebra", "docs"),
            "No results found for query: 'zebra' in index 'docs'"
        );
    }

    #[test]
    fn format_json_counts_results() {
        let mut store = setup_store();
        let hits = execute_search(&mut store, &params("ownership")).unwrap();
        let json = format_json(&hits, "ownership", "notes").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["result_count"], 1);
        assert_eq!(value["results"][0]["chunk_id"], 2);
    }
}
