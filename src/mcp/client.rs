//! Client side of the tool server protocol.
//!
//! [`ToolServerClient`] owns one connection (normally the stdio pipes of a
//! child `pubtator-agents tools` process) and issues one request at a time.
//! Responses are matched by id; anything else on the stream (the ready line,
//! stray output, late replies to cancelled requests) is skipped.

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::transport::ToolServerCommand;
use crate::agent::cancel::cancellable;
use crate::agent::tool::ToolBackend;
use crate::error::AgentError;

type Reader = Box<dyn AsyncBufRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// A JSON-RPC error object returned by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcFailure {
    /// JSON-RPC error code.
    pub code: i64,
    /// Error message.
    pub message: String,
}

struct Connection {
    reader: Reader,
    writer: Writer,
    next_id: u64,
}

impl Connection {
    async fn send(&mut self, message: &Value) -> Result<(), AgentError> {
        let mut line = message.to_string();
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(io_error)?;
        self.writer.flush().await.map_err(io_error)
    }

    async fn read_message(&mut self) -> Result<Value, AgentError> {
        loop {
            let mut line = String::new();
            let read = self.reader.read_line(&mut line).await.map_err(io_error)?;
            if read == 0 {
                return Err(AgentError::ToolServer {
                    message: "tool server closed the connection".to_string(),
                });
            }
            match serde_json::from_str::<Value>(line.trim()) {
                Ok(value) if value.is_object() => return Ok(value),
                _ => debug!(line = line.trim(), "skipping non-protocol output"),
            }
        }
    }

    async fn wait_ready(&mut self) -> Result<(), AgentError> {
        loop {
            let message = self.read_message().await?;
            if message.get("type").and_then(Value::as_str) == Some("ready") {
                return Ok(());
            }
        }
    }

    async fn request(
        &mut self,
        method: &str,
        params: Value,
    ) -> Result<Result<Value, RpcFailure>, AgentError> {
        self.next_id += 1;
        let id = self.next_id;
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .await?;

        loop {
            let message = self.read_message().await?;
            if message.get("id").and_then(Value::as_u64) != Some(id) {
                continue;
            }
            if let Some(error) = message.get("error") {
                return Ok(Err(RpcFailure {
                    code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                    message: error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string(),
                }));
            }
            return Ok(Ok(message.get("result").cloned().unwrap_or(Value::Null)));
        }
    }
}

fn io_error(err: std::io::Error) -> AgentError {
    AgentError::ToolServer {
        message: err.to_string(),
    }
}

/// Joins the text items of a `tools/call` result.
fn content_text(result: &Value) -> String {
    result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

/// Serialized connection to a tool server.
pub struct ToolServerClient {
    conn: Mutex<Connection>,
    child: Option<Child>,
}

impl std::fmt::Debug for ToolServerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolServerClient")
            .field("child", &self.child.as_ref().and_then(Child::id))
            .finish_non_exhaustive()
    }
}

impl ToolServerClient {
    /// Connects over existing streams: waits for the ready line, then
    /// performs the `initialize` handshake.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ToolServer`] if the stream closes or the
    /// handshake is rejected, or [`AgentError::Cancelled`].
    pub async fn connect<R, W>(
        reader: R,
        writer: W,
        cancel: &CancellationToken,
    ) -> Result<Self, AgentError>
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let mut conn = Connection {
            reader: Box::new(reader),
            writer: Box::new(writer),
            next_id: 0,
        };
        cancellable(cancel, handshake(&mut conn)).await?;
        Ok(Self {
            conn: Mutex::new(conn),
            child: None,
        })
    }

    /// Spawns the tool server process described by `command` and connects
    /// to its stdio.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ToolServer`] if the process cannot be started or
    /// the handshake fails.
    pub async fn spawn(
        command: &ToolServerCommand,
        cancel: &CancellationToken,
    ) -> Result<Self, AgentError> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AgentError::ToolServer {
                message: format!("failed to start {}: {e}", command.program.display()),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| AgentError::ToolServer {
            message: "failed to capture tool server stdin".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| AgentError::ToolServer {
            message: "failed to capture tool server stdout".to_string(),
        })?;

        let mut client = Self::connect(BufReader::new(stdout), stdin, cancel).await?;
        info!(pid = ?child.id(), "tool server started");
        client.child = Some(child);
        Ok(client)
    }

    /// Sends one request and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ToolServer`] on I/O failure,
    /// [`AgentError::Cancelled`] if `cancel` fires first. A JSON-RPC error
    /// response is returned as the inner `Err`.
    pub async fn request(
        &self,
        method: &str,
        params: Value,
        cancel: &CancellationToken,
    ) -> Result<Result<Value, RpcFailure>, AgentError> {
        cancellable(cancel, async {
            let mut conn = self.conn.lock().await;
            conn.request(method, params).await
        })
        .await
    }

    /// Returns the server's tool catalog.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ToolServer`] if the request fails.
    pub async fn list_tools(&self, cancel: &CancellationToken) -> Result<Vec<Value>, AgentError> {
        let result = self
            .request("tools/list", json!({}), cancel)
            .await?
            .map_err(|e| AgentError::ToolServer { message: e.message })?;
        Ok(result
            .get("tools")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

async fn handshake(conn: &mut Connection) -> Result<(), AgentError> {
    conn.wait_ready().await?;
    let init = conn
        .request(
            "initialize",
            json!({
                "protocolVersion": super::server::PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": "pubtator-agents",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
        .await?;
    if let Err(e) = init {
        return Err(AgentError::ToolServer {
            message: format!("initialize rejected: {}", e.message),
        });
    }
    conn.send(&json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
        .await
}

#[async_trait]
impl ToolBackend for ToolServerClient {
    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        let reply = self
            .request(
                "tools/call",
                json!({ "name": name, "arguments": arguments }),
                cancel,
            )
            .await?;
        match reply {
            Ok(result) => Ok(content_text(&result)),
            Err(e) => Err(AgentError::ToolExecution {
                name: name.to_string(),
                message: e.message,
            }),
        }
    }
}
