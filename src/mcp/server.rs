//! Line-delimited JSON-RPC tool server.
//!
//! Reads one JSON message per line, answers `initialize`, `tools/list` and
//! `tools/call`, and writes one response line per request. A
//! `{"type":"ready"}` line is written once before the first request is read.
//! Lines that are not valid JSON are logged and dropped without a response,
//! since there is no request id to answer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::catalog::{
    FIND_ENTITY, FIND_RELATED_ENTITIES, GET_PAPER_TEXT, SEARCH_PUBTATOR, tools_list_payload,
};
use super::params::{FindEntityParams, FindRelatedParams, GetTextParams, SearchParams};
use crate::agent::cancel::cancellable;
use crate::agent::tool::ToolBackend;
use crate::error::{AgentError, ToolError};
use crate::pubtator::LiteratureApi;

/// Protocol version advertised by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";
/// Application error code used for every failed `tools/call`.
pub const TOOL_ERROR_CODE: i64 = -32000;
const SERVER_NAME: &str = "pubtator-agents";

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }

    fn tool(err: &ToolError) -> Self {
        Self {
            code: TOOL_ERROR_CODE,
            message: err.to_string(),
        }
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    })
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArgument(e.to_string()))
}

/// Stateless tool server over a [`LiteratureApi`].
#[derive(Clone)]
pub struct ToolServer {
    api: Arc<dyn LiteratureApi>,
}

impl std::fmt::Debug for ToolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolServer").finish_non_exhaustive()
    }
}

impl ToolServer {
    /// Creates a server backed by `api`.
    #[must_use]
    pub fn new(api: Arc<dyn LiteratureApi>) -> Self {
        Self { api }
    }

    /// Runs one tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] for names outside the catalog,
    /// [`ToolError::InvalidArgument`] when `arguments` do not match the
    /// tool's parameters, and whatever the literature API reports otherwise.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        match name {
            FIND_ENTITY => {
                let p: FindEntityParams = parse_args(arguments)?;
                self.api
                    .find_entity(&p.query, p.concept.as_deref(), p.limit)
                    .await
            }
            SEARCH_PUBTATOR => {
                let p: SearchParams = parse_args(arguments)?;
                self.api.search(&p.query, p.limit).await
            }
            GET_PAPER_TEXT => {
                let p: GetTextParams = parse_args(arguments)?;
                self.api.get_text(&p.pmids, &p.pmcids, p.format, p.full).await
            }
            FIND_RELATED_ENTITIES => {
                let p: FindRelatedParams = parse_args(arguments)?;
                self.api
                    .find_related(
                        &p.entity_id,
                        p.relation_type.as_deref(),
                        p.target_type.as_deref(),
                    )
                    .await
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// Handles one raw input line. Returns `None` when no response is due.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => {
                warn!(error = %e, "dropping unparseable tool server input");
                None
            }
        }
    }

    /// Handles one parsed message. Returns `None` for notifications and
    /// messages without a method.
    pub async fn handle_message(&self, message: Value) -> Option<Value> {
        let Some(obj) = message.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        let method = obj.get("method").and_then(Value::as_str)?;
        if method.starts_with("notifications/") {
            debug!(method, "ignoring notification");
            return None;
        }

        let id = obj.get("id").cloned().unwrap_or(Value::Null);
        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        Some(match self.handle_request(method, params).await {
            Ok(payload) => success_response(id, payload),
            Err(err) => error_response(id, err),
        })
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        debug!(tool = name, "tools/call");
        let value = self
            .dispatch(name, arguments)
            .await
            .map_err(|e| RpcError::tool(&e))?;
        let text = serde_json::to_string(&value)
            .map_err(|e| RpcError::tool(&ToolError::Transport(e.to_string())))?;
        Ok(json!({
            "content": [{ "type": "text", "text": text }]
        }))
    }

    /// Serves requests from `reader` until EOF or cancellation.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading or writing the streams fails.
    pub async fn serve<R, W>(
        &self,
        reader: R,
        mut writer: W,
        cancel: &CancellationToken,
    ) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        write_line(&mut writer, &json!({ "type": "ready" })).await?;

        let mut lines = reader.lines();
        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => break,
                next = lines.next_line() => next?,
            };
            let Some(line) = next else {
                break;
            };
            if let Some(response) = self.handle_line(&line).await {
                write_line(&mut writer, &response).await?;
            }
        }
        debug!("tool server input closed");
        Ok(())
    }
}

fn initialize_payload() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, value: &Value) -> std::io::Result<()> {
    let mut line = value.to_string();
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

#[async_trait]
impl ToolBackend for ToolServer {
    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        cancellable(cancel, async {
            let value = self
                .dispatch(name, arguments)
                .await
                .map_err(|e| AgentError::ToolExecution {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
            serde_json::to_string(&value).map_err(|e| AgentError::ToolExecution {
                name: name.to_string(),
                message: e.to_string(),
            })
        })
        .await
    }
}
