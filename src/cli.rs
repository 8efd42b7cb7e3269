use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::{
    chunking::{ChunkingConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_WORDS},
    search::{SearchFilters, SearchParams},
};

#[derive(Debug, Parser)]
#[command(
    name = "ragshelf",
    about = "Named, fuzzy-searchable collections of local text documents"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Index a directory of .md/.txt files as a named collection
    Build(BuildArgs),
    /// Search one collection
    Query(QueryArgs),
    /// List collection names
    List,
    /// Start MCP server for AI agent integration
    Mcp(McpArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Build --

#[derive(Debug, Parser)]
pub struct BuildArgs {
    /// Collection name; an existing collection is replaced
    pub name: String,

    /// Directory to index
    pub directory: PathBuf,

    /// Maximum words per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_WORDS)]
    pub max_words: usize,

    /// Words shared between consecutive chunks
    #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
    pub overlap: usize,
}

impl BuildArgs {
    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig {
            max_words: self.max_words,
            overlap: self.overlap,
        }
    }
}

// -- Query --

#[derive(Debug, Parser)]
pub struct QueryArgs {
    /// Collection to search
    pub name: String,

    /// The search query
    pub query: String,

    /// Also accept approximate matches
    #[arg(long)]
    pub fuzzy: bool,

    /// Fuzzy similarity threshold between 0 and 1
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Only fragments whose path contains this (case-insensitive)
    #[arg(long)]
    pub path_contains: Option<String>,

    /// Only fragments carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Only fragments modified at or after this epoch second
    #[arg(long)]
    pub min_mtime: Option<f64>,

    /// Only fragments modified at or before this epoch second
    #[arg(long)]
    pub max_mtime: Option<f64>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryArgs {
    pub fn params(&self) -> SearchParams {
        SearchParams {
            collection: self.name.clone(),
            query: self.query.clone(),
            fuzzy: self.fuzzy,
            threshold: self.threshold,
            filters: SearchFilters {
                path_contains: self.path_contains.clone(),
                tag: self.tag.clone(),
                min_mtime: self.min_mtime,
                max_mtime: self.max_mtime,
            },
        }
    }
}

// -- MCP --

#[derive(Debug, Parser)]
pub struct McpArgs {
    /// Directory tree path arguments are confined to (default: data dir)
    #[arg(long)]
    pub allowed_root: Option<PathBuf>,
}

impl McpArgs {
    /// The flag, then RAGSHELF_ALLOWED_ROOT.
    pub fn allowed_root(&self) -> Option<PathBuf> {
        self.allowed_root.clone().or_else(|| {
            std::env::var_os("RAGSHELF_ALLOWED_ROOT")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
    }
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "ragshelf",
            &mut std::io::stdout(),
        );
    }
}
