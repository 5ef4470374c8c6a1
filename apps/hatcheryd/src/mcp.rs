//! MCP server adapter over the rmcp SDK.
//!
//! [`HatcheryServer`] implements rmcp's [`ServerHandler`] by delegating to the
//! core [`Handler`] and converting between its types and the rmcp model.

use hatchery::{CREATE_AGENT, CallResult, Content, Generator, Handler, ToolInfo};
use rmcp::{
    ErrorData, RoleServer, ServerHandler,
    model::{
        CallToolRequestParams, CallToolResult, Implementation, ListToolsResult,
        PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};
use std::sync::Arc;

const INSTRUCTIONS: &str = "Call create_agent with a specialty, goal and task to mint a new \
                            specialized agent. New agents appear in tools/list immediately.";

/// The MCP-facing server. Cheap to clone; every clone shares one handler.
pub struct HatcheryServer<G> {
    handler: Arc<Handler<G>>,
}

impl<G> Clone for HatcheryServer<G> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<G: Generator + 'static> HatcheryServer<G> {
    /// Wrap a protocol handler.
    pub fn new(handler: Handler<G>) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// The wrapped handler.
    pub fn handler(&self) -> &Handler<G> {
        &self.handler
    }
}

impl<G: Generator + 'static> ServerHandler for HatcheryServer<G> {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.capabilities = ServerCapabilities::builder()
            .enable_tools()
            .enable_tool_list_changed()
            .build();
        info.server_info = Implementation::from_build_env();
        info.instructions = Some(INSTRUCTIONS.into());
        info
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = self.handler.list_tools().into_iter().map(to_tool).collect();
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = request.arguments.unwrap_or_default();
        let result = self.handler.call_tool(&request.name, arguments).await;

        if request.name == CREATE_AGENT
            && !result.is_error
            && let Err(e) = context.peer.notify_tool_list_changed().await
        {
            tracing::warn!("failed to notify tool list change: {e}");
        }
        Ok(to_call_result(result))
    }
}

/// Convert a listing entry to an rmcp tool.
pub fn to_tool(info: ToolInfo) -> Tool {
    Tool::new(info.name, info.description, Arc::new(info.input_schema))
}

/// Convert a handler result to an rmcp call result.
pub fn to_call_result(result: CallResult) -> CallToolResult {
    let content = result
        .content
        .into_iter()
        .map(|Content::Text { text }| rmcp::model::Content::text(text))
        .collect();
    if result.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}
