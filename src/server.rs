//! MCP `ServerHandler` exposing the `get_hatena_bookmarks` tool over stdio.
//!
//! Classified failures (validation, network, API, parsing) are returned as
//! tool results with `is_error = true` and the text `"[CODE] message"`, so the
//! calling agent can read them. Only failures of the server itself become
//! protocol-level `ErrorData`.

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router, RoleServer, ServerHandler,
};
use tokio_util::sync::CancellationToken;

use crate::service::BookmarkService;
use crate::types::FeedQuery;

pub const TOOL_NAME: &str = "get_hatena_bookmarks";

#[derive(Debug, Default, serde::Deserialize, schemars::JsonSchema)]
pub struct GetBookmarksParams {
    /// Hatena user id (alphanumeric characters and hyphens, at most 50)
    pub username: String,
    /// Only return bookmarks carrying this tag
    pub tag: Option<String>,
    /// Only return bookmarks made on this day, formatted YYYYMMDD
    pub date: Option<String>,
    /// Only return bookmarks of this http(s) URL
    pub url: Option<String>,
    /// Page number, starting at 1
    pub page: Option<i64>,
}

impl From<GetBookmarksParams> for FeedQuery {
    fn from(params: GetBookmarksParams) -> Self {
        FeedQuery::new(
            params.username,
            params.tag,
            params.date,
            params.url,
            params.page,
        )
    }
}

#[derive(Clone)]
pub struct BookmarkServer {
    service: Arc<BookmarkService>,
    tool_router: ToolRouter<BookmarkServer>,
}

impl BookmarkServer {
    pub fn new(service: Arc<BookmarkService>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    /// Runs the tool against `cancel`; errors become `is_error` results.
    pub async fn get_hatena_bookmarks_impl(
        &self,
        params: GetBookmarksParams,
        cancel: &CancellationToken,
    ) -> Result<CallToolResult, ErrorData> {
        match self.service.get_bookmarks(params.into(), cancel).await {
            Ok(response) => {
                let json = serde_json::to_string_pretty(&response)
                    .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
                Ok(CallToolResult::success(vec![Content::text(json)]))
            }
            Err(e) => {
                tracing::warn!(code = e.code(), details = %e.details(), error = %e, "Tool call failed");
                Ok(CallToolResult::error(vec![Content::text(e.to_tool_message())]))
            }
        }
    }
}

#[tool_router]
impl BookmarkServer {
    #[tool(
        name = "get_hatena_bookmarks",
        description = "Retrieve a Hatena Bookmark user's public bookmarks, optionally filtered by tag, date (YYYYMMDD) or URL, with pagination"
    )]
    pub async fn get_hatena_bookmarks(
        &self,
        Parameters(params): Parameters<GetBookmarksParams>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        self.get_hatena_bookmarks_impl(params, &context.ct).await
    }
}

#[tool_handler]
impl ServerHandler for BookmarkServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_protocol_version(ProtocolVersion::V_2024_11_05)
            .with_server_info(Implementation::new(
                "hatena-bookmark-mcp",
                env!("CARGO_PKG_VERSION"),
            ))
            .with_instructions(
                "Fetches public Hatena Bookmark feeds. Call get_hatena_bookmarks with a username and optional tag, date, url and page filters.",
            )
    }
}
