//! MCP server: request dispatch and the read loop.
//!
//! [`Dispatcher`] turns one decoded request into one response. It owns the
//! tool and resource registries and the context handlers run with.
//! [`McpServer`] drives a [`LineTransport`]: one line in, at most one line
//! out, strictly in order.
//!
//! # Routing
//!
//! | method           | result                                   |
//! |------------------|------------------------------------------|
//! | `initialize`     | protocol version, capabilities, identity |
//! | `ping`           | `{}`                                     |
//! | `tools/list`     | registered tools                         |
//! | `tools/call`     | handler output as pretty JSON text       |
//! | `resources/list` | registered resources                     |
//! | `resources/read` | producer output as `application/json`    |
//!
//! Every fault (unknown method/tool/resource, bad params, argument binding)
//! becomes an error response with code `-32603`. Handler failures never stop
//! the loop; only EOF, a signal, or a write error does.

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::error::DispatchError;
use crate::mcp::protocol::{
    parse_message, IncomingMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    ParseFailure, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::{LineTransport, StdioTransport};
use crate::tools::{self, ResourceRegistry, ToolContext, ToolRegistry};

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
    /// Resource-related capabilities.
    pub resources: ResourceCapabilities,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: ToolCapabilities { list_changed: true },
            resources: ResourceCapabilities {
                subscribe: true,
                list_changed: true,
            },
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    pub list_changed: bool,
}

/// Resource-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCapabilities {
    /// Whether clients may subscribe to resource updates.
    pub subscribe: bool,
    /// Whether the resource list can change during the session.
    pub list_changed: bool,
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition<'a> {
    /// Unique tool name.
    pub name: &'a str,
    /// Human-readable description.
    pub description: &'a str,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: &'a Value,
}

/// A resource definition for resources/list response.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDefinition<'a> {
    /// Unique resource URI.
    pub uri: &'a str,
    /// Display name.
    pub name: &'a str,
    /// Human-readable description.
    pub description: &'a str,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// Parameters for resources/read request.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceReadParams {
    /// URI of the resource to read.
    pub uri: String,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
}

impl ToolCallResult {
    /// Creates a text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }
}

/// One item of a resources/read response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    /// URI that was read.
    pub uri: String,
    /// Always `application/json`.
    pub mime_type: &'static str,
    /// The producer's output.
    pub text: String,
}

/// Routes decoded requests to handlers.
pub struct Dispatcher {
    context: ToolContext,
    tools: ToolRegistry,
    resources: ResourceRegistry,
}

impl Dispatcher {
    /// Creates a dispatcher with this server's tools and resources.
    #[must_use]
    pub fn new(context: ToolContext) -> Self {
        Self::with_registries(context, tools::default_tools(), tools::default_resources())
    }

    /// Creates a dispatcher with explicit registries.
    #[must_use]
    pub const fn with_registries(
        context: ToolContext,
        tools: ToolRegistry,
        resources: ResourceRegistry,
    ) -> Self {
        Self {
            context,
            tools,
            resources,
        }
    }

    /// Handles one input line.
    ///
    /// Returns `None` when nothing should be written: blank lines, lines
    /// that are not JSON, and notifications.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        if line.trim().is_empty() {
            return None;
        }

        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => Some(self.handle_request(&req).await),
            Ok(IncomingMessage::Notification(notif)) => {
                Self::handle_notification(&notif);
                None
            }
            Err(ParseFailure::Malformed(e)) => {
                tracing::debug!(error = %e, "Dropping undecodable input line");
                None
            }
            Err(ParseFailure::Invalid { id, reason }) => {
                let error = DispatchError::InvalidRequest(reason);
                tracing::warn!(%id, error = %error, "Rejecting request");
                Some(JsonRpcResponse::error(id, error.to_string()))
            }
        }
    }

    /// Handles a request, always producing a response that echoes its ID.
    pub async fn handle_request(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!(id = %req.id, method = %req.method, "Handling request");

        match self.route(req).await {
            Ok(result) => JsonRpcResponse::success(req.id.clone(), result),
            Err(error) => {
                tracing::warn!(id = %req.id, method = %req.method, error = %error, "Request failed");
                JsonRpcResponse::error(req.id.clone(), error.to_string())
            }
        }
    }

    fn handle_notification(notif: &JsonRpcNotification) {
        tracing::debug!(method = %notif.method, "Received notification");
    }

    async fn route(&self, req: &JsonRpcRequest) -> Result<Value, DispatchError> {
        match req.method.as_str() {
            "initialize" => Ok(Self::handle_initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.handle_tools_list()),
            "tools/call" => self.handle_tools_call(&req.params).await,
            "resources/list" => Ok(self.handle_resources_list()),
            "resources/read" => self.handle_resources_read(&req.params).await,
            other => Err(DispatchError::MethodNotFound(other.to_string())),
        }
    }

    fn handle_initialize() -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        })
    }

    fn handle_tools_list(&self) -> Value {
        let tools: Vec<ToolDefinition<'_>> = self
            .tools
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.name,
                description: tool.description,
                input_schema: &tool.input_schema,
            })
            .collect();

        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, params: &Value) -> Result<Value, DispatchError> {
        let params: ToolCallParams =
            serde_json::from_value(params.clone()).map_err(|e| DispatchError::InvalidParams {
                method: "tools/call",
                message: e.to_string(),
            })?;

        let tool = self
            .tools
            .get(&params.name)
            .ok_or_else(|| DispatchError::ToolNotFound(params.name.clone()))?;

        tracing::info!(tool = tool.name, "Calling tool");
        let output = (tool.handler)(&self.context, params.arguments).await?;
        let text = serde_json::to_string_pretty(&output)?;

        Ok(serde_json::to_value(ToolCallResult::text(text))?)
    }

    fn handle_resources_list(&self) -> Value {
        let resources: Vec<ResourceDefinition<'_>> = self
            .resources
            .iter()
            .map(|resource| ResourceDefinition {
                uri: resource.uri,
                name: resource.name,
                description: resource.description,
            })
            .collect();

        json!({ "resources": resources })
    }

    async fn handle_resources_read(&self, params: &Value) -> Result<Value, DispatchError> {
        let params: ResourceReadParams =
            serde_json::from_value(params.clone()).map_err(|e| DispatchError::InvalidParams {
                method: "resources/read",
                message: e.to_string(),
            })?;

        let resource = self
            .resources
            .get(&params.uri)
            .ok_or_else(|| DispatchError::ResourceNotFound(params.uri.clone()))?;

        tracing::info!(uri = resource.uri, "Reading resource");
        let text = (resource.producer)(&self.context).await;

        Ok(json!({
            "contents": [ResourceContents {
                uri: params.uri,
                mime_type: "application/json",
                text,
            }]
        }))
    }
}

/// The MCP server: a dispatcher bound to a line transport.
pub struct McpServer<R, W> {
    dispatcher: Dispatcher,
    transport: LineTransport<R, W>,
}

impl McpServer<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Creates a server on stdin/stdout.
    #[must_use]
    pub fn stdio(dispatcher: Dispatcher) -> Self {
        Self::new(dispatcher, StdioTransport::stdio())
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a server on the given transport.
    #[must_use]
    pub const fn new(dispatcher: Dispatcher, transport: LineTransport<R, W>) -> Self {
        Self {
            dispatcher,
            transport,
        }
    }

    /// Consumes the server, returning its transport.
    pub fn into_transport(self) -> LineTransport<R, W> {
        self.transport
    }

    /// Runs the MCP server main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> io::Result<()> {
        self.run_with_shutdown().await
    }

    /// Serves requests until the input is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve(&mut self) -> io::Result<()> {
        loop {
            let line_result = self.transport.read_line().await;
            if self.handle_transport_result(line_result).await? {
                return Ok(());
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    #[cfg(not(any(unix, windows)))]
    async fn run_with_shutdown(&mut self) -> io::Result<()> {
        self.serve().await
    }

    /// Handles the result from transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        line_result: io::Result<Option<String>>,
    ) -> io::Result<bool> {
        let Some(line) = line_result? else {
            tracing::info!("Input closed");
            return Ok(true);
        };

        if let Some(response) = self.dispatcher.handle_line(&line).await {
            self.transport.write_response(&response).await?;
        }

        Ok(false)
    }
}
