//! Stdio transport for MCP protocol.
//!
//! Handles newline-delimited JSON-RPC 2.0 over stdin/stdout. The local
//! process owner is trusted, so no bearer check applies here.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::transport::{JsonRpcRequest, JsonRpcResponse, dispatch};
use crate::tools::{McpTool, ToolContext};

/// Handle MCP protocol over stdio.
pub async fn run_stdio(tools: Vec<Box<dyn McpTool>>, ctx: ToolContext) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    tracing::info!("MCP stdio server ready, waiting for requests...");

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            tracing::info!("Stdin closed, shutting down");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(request) => {
                tracing::debug!(method = %request.method, "Received request");
                dispatch(&request, &tools, &ctx).await
            }
            Err(e) => Some(JsonRpcResponse::error(None, -32700, format!("Parse error: {e}"))),
        };

        // Notifications get no reply.
        let Some(response) = response else {
            continue;
        };

        let response_json = serde_json::to_string(&response)?;
        stdout.write_all(response_json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}
