//! MCP server lifecycle for the secure note tools.
//!
//! 1. **Initialisation**: version negotiation and capability exchange
//! 2. **Operation**: `tools/list` and `tools/call` routed to the [`Catalog`]
//! 3. **Shutdown**: stdin EOF, SIGINT or SIGTERM
//!
//! Requests are served strictly one at a time; a tool call runs to
//! completion before the next line is read.

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::catalog::Catalog;
use crate::mcp::protocol::{
    negotiate_protocol_version, parse_message, IncomingMessage, JsonRpcError,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId, SERVER_NAME,
};
use crate::mcp::transport::LineTransport;

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session. It never does.
    #[serde(rename = "listChanged")]
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

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
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

/// The MCP server.
pub struct McpServer {
    /// Current server state.
    state: ServerState,
    /// The registered tools.
    catalog: Catalog,
    /// Negotiated protocol version (set after initialisation).
    protocol_version: Option<&'static str>,
}

impl McpServer {
    /// Creates a server serving `catalog`.
    #[must_use]
    pub const fn new(catalog: Catalog) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            catalog,
            protocol_version: None,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Returns the negotiated protocol version, once initialised.
    #[must_use]
    pub const fn protocol_version(&self) -> Option<&'static str> {
        self.protocol_version
    }

    /// Serves `transport` until it closes or a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run<R, W>(&mut self, transport: LineTransport<R, W>) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.run_with_shutdown(transport).await
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown<R, W>(&mut self, mut transport: LineTransport<R, W>) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
                self.state = ServerState::ShuttingDown;
                Ok(())
            }

            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
                self.state = ServerState::ShuttingDown;
                Ok(())
            }

            result = self.serve(&mut transport) => result,
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown<R, W>(&mut self, mut transport: LineTransport<R, W>) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                self.state = ServerState::ShuttingDown;
                Ok(())
            }

            result = self.serve(&mut transport) => result,
        }
    }

    /// Reads and answers messages until the transport reaches EOF.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve<R, W>(&mut self, transport: &mut LineTransport<R, W>) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while let Some(line) = transport.read_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            match self.handle_line(&line) {
                Some(Ok(response)) => transport.write_response(&response).await?,
                Some(Err(error)) => transport.write_error(&error).await?,
                None => {}
            }
        }

        tracing::info!("Transport closed");
        self.state = ServerState::ShuttingDown;
        Ok(())
    }

    /// Handles one line of input, returning the reply to write, if any.
    ///
    /// Notifications produce no reply.
    pub fn handle_line(&mut self, line: &str) -> Option<Result<JsonRpcResponse, JsonRpcError>> {
        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => Some(self.handle_request(&req)),
            Ok(IncomingMessage::Notification(notif)) => {
                self.handle_notification(&notif);
                None
            }
            Err(error) => {
                tracing::debug!(code = error.error.code, "Rejected malformed message");
                Some(Err(error))
            }
        }
    }

    fn handle_request(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        tracing::debug!(id = %req.id, method = %req.method, "Request");

        match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "tools/list" => self.handle_tools_list(req),
            "tools/call" => self.handle_tools_call(req),
            "ping" => Ok(JsonRpcResponse::success(req.id.clone(), json!({}))),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        }
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        if notif.method == "notifications/initialized" && self.state == ServerState::Initialising {
            tracing::info!("Client initialised, serving tools");
            self.state = ServerState::Running;
        }
    }

    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::invalid_request_with(
                req.id.clone(),
                "Server already initialised",
            ));
        }

        let params: InitializeParams = parse_params(req, "initialize")?;
        let negotiated = negotiate_protocol_version(&params.protocol_version);

        tracing::info!(
            client = params.client_info.as_ref().map_or("unknown", |c| c.name.as_str()),
            requested = %params.protocol_version,
            negotiated,
            "Initialising session"
        );

        self.protocol_version = Some(negotiated);
        self.state = ServerState::Initialising;

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "protocolVersion": negotiated,
                "capabilities": ServerCapabilities::default(),
                "serverInfo": ServerInfo::default(),
            }),
        ))
    }

    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "tools": self.catalog.definitions() }),
        ))
    }

    fn handle_tools_call(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ToolCallParams = parse_params(req, "tool call")?;
        tracing::info!(tool = %params.name, "Tool call");

        let result = self
            .catalog
            .dispatch(&params.name, &params.arguments)
            .map_err(|e| {
                tracing::warn!(tool = %params.name, "Unknown tool requested");
                JsonRpcError::invalid_params(req.id.clone(), e.to_string())
            })?;

        let result_value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(
                req.id.clone(),
                "Internal error: failed to serialise result",
            )
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), result_value))
    }

    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::invalid_request_with(
                id.clone(),
                "Server not initialised",
            ));
        }
        Ok(())
    }
}

/// Deserialises the request's params, which must be present.
fn parse_params<T>(req: &JsonRpcRequest, what: &str) -> Result<T, JsonRpcError>
where
    T: for<'de> Deserialize<'de>,
{
    let params = req.params.as_ref().ok_or_else(|| {
        JsonRpcError::invalid_params(req.id.clone(), format!("Missing {what} params"))
    })?;

    T::deserialize(params).map_err(|e| {
        JsonRpcError::invalid_params(req.id.clone(), format!("Invalid {what} params: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{ErrorCode, MCP_PROTOCOL_VERSION};
    use crate::vault::OpCli;

    fn server() -> McpServer {
        let catalog = Catalog::with_secure_note_tools(None, OpCli::new("op", None)).unwrap();
        McpServer::new(catalog)
    }

    fn initialise(server: &mut McpServer) {
        let init = r#"{"jsonrpc":"2.0","id":1,"method":"initialize",
            "params":{"protocolVersion":"2024-11-05","capabilities":{},
            "clientInfo":{"name":"test","version":"1"}}}"#;
        server.handle_line(init).unwrap().unwrap();
        assert!(server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .is_none());
    }

    #[test]
    fn server_initial_state() {
        assert_eq!(server().state(), ServerState::AwaitingInit);
    }

    #[test]
    fn initialise_negotiates_and_runs() {
        let mut server = server();
        initialise(&mut server);
        assert_eq!(server.state(), ServerState::Running);
        assert_eq!(server.protocol_version(), Some("2024-11-05"));
    }

    #[test]
    fn initialise_answers_latest_for_unknown_version() {
        let mut server = server();
        let init = r#"{"jsonrpc":"2.0","id":1,"method":"initialize",
            "params":{"protocolVersion":"1999-01-01"}}"#;
        let response = server.handle_line(init).unwrap().unwrap();
        assert_eq!(response.result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(response.result["serverInfo"]["name"], SERVER_NAME);
    }

    #[test]
    fn second_initialise_is_rejected() {
        let mut server = server();
        initialise(&mut server);
        let again = r#"{"jsonrpc":"2.0","id":2,"method":"initialize",
            "params":{"protocolVersion":"2024-11-05"}}"#;
        let err = server.handle_line(again).unwrap().unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn tools_require_initialisation() {
        let mut server = server();
        let err = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
            .unwrap()
            .unwrap_err();
        assert_eq!(err.error.message, "Server not initialised");
    }

    #[test]
    fn lists_seven_tools() {
        let mut server = server();
        initialise(&mut server);
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(response.result["tools"].as_array().map(Vec::len), Some(7));
    }

    #[test]
    fn unknown_tool_is_protocol_error() {
        let mut server = server();
        initialise(&mut server);
        let call = r#"{"jsonrpc":"2.0","id":3,"method":"tools/call",
            "params":{"name":"drop-vault","arguments":{}}}"#;
        let err = server.handle_line(call).unwrap().unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidParams.code());
        assert_eq!(err.error.message, "Unknown tool: drop-vault");
    }

    #[test]
    fn missing_call_params_is_invalid() {
        let mut server = server();
        initialise(&mut server);
        let err = server
            .handle_line(r#"{"jsonrpc":"2.0","id":4,"method":"tools/call"}"#)
            .unwrap()
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidParams.code());
    }

    #[test]
    fn unknown_method_is_not_found() {
        let mut server = server();
        let err = server
            .handle_line(r#"{"jsonrpc":"2.0","id":5,"method":"resources/list"}"#)
            .unwrap()
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::MethodNotFound.code());
    }

    #[test]
    fn ping_works_before_initialise() {
        let mut server = server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(response.result, json!({}));
    }

    #[tokio::test]
    async fn serve_stops_at_eof() {
        let mut server = server();
        let input = b"\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n";
        let mut transport = LineTransport::new(&input[..], Vec::new());

        server.serve(&mut transport).await.unwrap();

        assert_eq!(server.state(), ServerState::ShuttingDown);
        let written = String::from_utf8(transport.into_writer()).unwrap();
        assert_eq!(written.lines().count(), 1);
    }
}
