//! Tool server adapter for the PubTator literature tools.
//!
//! Speaks line-delimited JSON-RPC 2.0 over stdio. The server side wraps a
//! [`crate::pubtator::LiteratureApi`]; the client side is what specialists
//! call through.
//!
//! # Architecture
//!
//! ```text
//! Specialist (agentic loop)
//!   ↓ ToolBackend::call_tool
//! ToolServerClient ── stdio ──> `pubtator-agents tools`
//!                                 ToolServer::serve
//!                                   ↓ dispatch
//!                                 PubTatorClient (rate limited HTTP)
//! ```
//!
//! `ToolServer` also implements `ToolBackend` directly for in-process use.

pub mod catalog;
pub mod client;
pub mod params;
pub mod server;
pub mod transport;

pub use catalog::{tool_catalog, tools_list_payload};
pub use client::{RpcFailure, ToolServerClient};
pub use server::{PROTOCOL_VERSION, TOOL_ERROR_CODE, ToolServer};
pub use transport::{ToolServerCommand, pubtator_server, serve_stdio};
