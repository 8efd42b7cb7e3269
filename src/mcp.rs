use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use rmcp::{
    ErrorData,
    ServerHandler,
    ServiceExt,
    handler::server::{
        router::tool::ToolRouter,
        tool::ToolCallContext,
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParams,
        CallToolResult,
        Content,
        ErrorCode,
        Implementation,
        ListToolsResult,
        PaginatedRequestParams,
        ServerCapabilities,
        ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool,
    tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    chunking::ChunkingConfig,
    data_dir::DataDir,
    error::{self, Error},
    files,
    ingestion,
    sandbox::PathSandbox,
    search::{self, SearchFilters, SearchHit},
    snapshot::SnapshotStore,
    store::IndexStore,
};

/// JSON-RPC code for a path argument outside the allowed root.
const ACCESS_DENIED: ErrorCode = ErrorCode(-32001);
/// JSON-RPC code for any failure inside a tool.
const EXECUTION_ERROR: ErrorCode = ErrorCode(-32000);

struct RagshelfState {
    data_dir: DataDir,
    snapshot: SnapshotStore,
    sandbox: PathSandbox,
    chunking: ChunkingConfig,
    store: Mutex<IndexStore>,
}

impl RagshelfState {
    fn store(&self) -> Result<MutexGuard<'_, IndexStore>, ErrorData> {
        self.store.lock().map_err(|_| {
            ErrorData::internal_error("index store lock poisoned", None)
        })
    }

    fn resolve(&self, raw: &str) -> Result<PathBuf, ErrorData> {
        self.sandbox.resolve(raw).map_err(tool_error)
    }
}

#[derive(Clone)]
pub struct RagshelfMcpServer {
    state: Arc<RagshelfState>,
    tool_router: ToolRouter<Self>,
}

impl RagshelfMcpServer {
    fn new(state: RagshelfState) -> Self {
        Self {
            state: Arc::new(state),
            tool_router: Self::tool_router(),
        }
    }

    /// Load the snapshot under `data_dir` and confine path arguments to
    /// `allowed_root` (the data directory when `None`).
    pub fn open(data_dir: DataDir, allowed_root: Option<&Path>) -> Self {
        let snapshot = SnapshotStore::new(&data_dir);
        let store = IndexStore::from_collections(snapshot.load());
        let sandbox = PathSandbox::new(
            data_dir.root(),
            allowed_root.unwrap_or(data_dir.root()),
        );
        info!(
            allowed_root = %sandbox.allowed_root().display(),
            collections = store.len(),
            "path arguments restricted"
        );

        Self::new(RagshelfState {
            data_dir,
            snapshot,
            sandbox,
            chunking: ChunkingConfig::default(),
            store: Mutex::new(store),
        })
    }
}

#[tool_router(router = tool_router)]
impl RagshelfMcpServer {
    #[tool(
        name = "create_index",
        description = "Scans a directory and builds a named, in-memory search index of its text files."
    )]
    pub async fn create_index(
        &self,
        params: Parameters<CreateIndexParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let params = params.0;
        require("index_name", &params.index_name)?;
        require("directory_path", &params.directory_path)?;
        let root = self.state.resolve(&params.directory_path)?;

        let outcome = ingestion::build_collection(&root, &self.state.chunking)
            .map_err(tool_error)?;
        let summary = outcome.summary(&params.index_name);

        let mut store = self.state.store()?;
        store.replace(&params.index_name, outcome.fragments);
        self.state.snapshot.save(store.collections());

        Ok(text_result(summary.to_string()))
    }

    #[tool(
        name = "search_index",
        description = "Searches a named in-memory index (chunked) for a keyword; supports fuzzy and filters."
    )]
    pub async fn search_index(
        &self,
        params: Parameters<SearchIndexParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let params = params.0;
        let search_params = search::SearchParams {
            collection: params.index_name,
            query: params.query,
            fuzzy: params.fuzzy.unwrap_or(false),
            threshold: params.threshold,
            filters: SearchFilters {
                path_contains: params.path_contains,
                tag: params.tag,
                min_mtime: params.min_mtime,
                max_mtime: params.max_mtime,
            },
        };

        let mut store = self.state.store()?;
        let was_legacy = store
            .collections()
            .get(&search_params.collection)
            .is_some_and(|c| c.is_legacy());

        let hits =
            search::execute_search(&mut store, &search_params).map_err(tool_error)?;
        if was_legacy {
            self.state.snapshot.save(store.collections());
        }
        drop(store);

        let text = search::format_hits(
            &hits,
            &search_params.query,
            &search_params.collection,
        );
        let structured = serde_json::to_value(SearchResponse {
            index_name: &search_params.collection,
            query: &search_params.query,
            result_count: hits.len(),
            results: &hits,
        })
        .map_err(|e| tool_error(Error::Json(e)))?;

        let mut result = CallToolResult::success(vec![Content::text(text)]);
        result.structured_content = Some(structured);
        Ok(result)
    }

    #[tool(
        name = "list_indexes",
        description = "Lists all available in-memory search indexes."
    )]
    pub async fn list_indexes(&self) -> Result<CallToolResult, ErrorData> {
        let names = self.state.store()?.names();
        Ok(text_result(format_index_list(&names)))
    }

    #[tool(
        name = "list_files",
        description = "Lists all files and subdirectories in a given directory."
    )]
    pub async fn list_files(
        &self,
        params: Parameters<ListFilesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        require("directory_path", &params.0.directory_path)?;
        let dir = self.state.resolve(&params.0.directory_path)?;
        let listing = files::list_directory(&dir).map_err(tool_error)?;
        Ok(text_result(listing))
    }

    #[tool(
        name = "read_file",
        description = "Reads the content of a specific file from the filesystem."
    )]
    pub async fn read_file(
        &self,
        params: Parameters<ReadFileParams>,
    ) -> Result<CallToolResult, ErrorData> {
        require("file_path", &params.0.file_path)?;
        let path = self.state.resolve(&params.0.file_path)?;
        let content = files::read_text_file(&path).map_err(tool_error)?;
        Ok(text_result(content))
    }

    #[tool(
        name = "save_chat",
        description = "Saves a chat transcript (and an optional summary) as new files in saved_chats. Never overwrites."
    )]
    pub async fn save_chat(
        &self,
        params: Parameters<SaveChatParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let params = params.0;
        let request = files::SaveChatRequest {
            transcript: params.transcript,
            model: params.model,
            summarize: params.summarize.unwrap_or(false),
            summary: params.summary.unwrap_or_default(),
            session_id: params.session_id.unwrap_or_default(),
        };

        let details = files::save_chat(
            &self.state.data_dir.saved_chats_dir(),
            &request,
            chrono::Utc::now(),
        )
        .map_err(tool_error)?;
        Ok(text_result(details))
    }

    #[tool(
        name = "save_image",
        description = "Saves a base64-encoded image into the images directory. Does not overwrite existing files."
    )]
    pub async fn save_image(
        &self,
        params: Parameters<SaveImageParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let params = params.0;
        let path = files::save_image(
            &self.state.data_dir.images_dir(),
            &params.base64_content,
            &params.filename,
        )
        .map_err(tool_error)?;
        Ok(text_result(format!("Saved image to {}", path.display())))
    }
}

impl ServerHandler for RagshelfMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_server_info(
                Implementation::new("ragshelf", env!("CARGO_PKG_VERSION"))
                    .with_title("ragshelf MCP"),
            )
            .with_instructions(
                "Use create_index to index a directory, then search_index to find passages by keyword. Paths are relative to the data directory.",
            )
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>>
    + Send
    + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(
            self.tool_router.list_all(),
        )))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        if let Some(arguments) = request.arguments.as_ref() {
            self.state
                .sandbox
                .check_arguments(arguments)
                .map_err(tool_error)?;
        }

        debug!(tool = %request.name, "calling tool");
        let ctx = ToolCallContext::new(self, request, context);
        self.tool_router.call(ctx).await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateIndexParams {
    /// A unique name for this index collection.
    pub index_name: String,
    /// The directory to index.
    pub directory_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchIndexParams {
    /// The name of the index collection to search.
    pub index_name: String,
    /// The keyword to search for.
    pub query: String,
    /// Enable fuzzy match (default: false).
    pub fuzzy: Option<bool>,
    /// Fuzzy match threshold between 0 and 1 (default: 0.6).
    pub threshold: Option<f32>,
    /// Filter: path contains substring.
    pub path_contains: Option<String>,
    /// Filter: tag must match (from the #tags line).
    pub tag: Option<String>,
    /// Filter: minimum modification time (epoch seconds).
    pub min_mtime: Option<f64>,
    /// Filter: maximum modification time (epoch seconds).
    pub max_mtime: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListFilesParams {
    /// The directory to list.
    pub directory_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReadFileParams {
    /// The file to read.
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SaveChatParams {
    /// Full chat transcript text.
    pub transcript: String,
    /// Model name used in the file name.
    pub model: String,
    /// Also save the provided summary.
    pub summarize: Option<bool>,
    /// Summary text, saved when summarize is true.
    pub summary: Option<String>,
    /// Optional session identifier used in the file name.
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SaveImageParams {
    /// Base64 image data, optionally as a data: URL.
    pub base64_content: String,
    /// Target file name; only the last path component is used.
    pub filename: String,
}

#[derive(Debug, Serialize)]
struct SearchResponse<'a> {
    index_name: &'a str,
    query: &'a str,
    result_count: usize,
    results: &'a [SearchHit],
}

fn text_result(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

fn require(name: &str, value: &str) -> Result<(), ErrorData> {
    if value.trim().is_empty() {
        return Err(tool_error(Error::Validation(format!("{name} is required"))));
    }
    Ok(())
}

fn format_index_list(names: &[String]) -> String {
    if names.is_empty() {
        return "No indexes available. Create one with create_index."
            .to_string();
    }
    let mut text = "Indexes:".to_string();
    for name in names {
        text.push_str("\n- ");
        text.push_str(name);
    }
    text
}

fn tool_error(error: Error) -> ErrorData {
    match error {
        Error::AccessDenied(path) => ErrorData::new(
            ACCESS_DENIED,
            format!(
                "Security Error: Access to path '{}' is not allowed.",
                path.display()
            ),
            None,
        ),
        Error::Validation(message) => ErrorData::invalid_params(message, None),
        other => ErrorData::new(
            EXECUTION_ERROR,
            format!("Error executing tool: {other}"),
            None,
        ),
    }
}

pub fn run_mcp(
    data_dir: DataDir,
    allowed_root: Option<PathBuf>,
) -> error::Result<()> {
    let server = RagshelfMcpServer::open(data_dir, allowed_root.as_deref());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;

    runtime.block_on(async move {
        let transport = rmcp::transport::stdio();
        let running = server.serve(transport).await.map_err(|e| {
            Error::Config(format!("MCP server initialization failed: {e}"))
        })?;
        running
            .waiting()
            .await
            .map_err(|e| Error::Config(format!("MCP server error: {e}")))?;
        Ok(())
    })
}
