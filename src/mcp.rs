// GSD MCP Server - MCP Server (JSON-RPC 2.0 over stdio)
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// One JSON object per line on stdin, one response per line on stdout.
// stdout carries protocol traffic only; diagnostics go to stderr.
// Requests are answered in arrival order.

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Result, ServerError, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR};
use crate::paths::InstallPaths;
use crate::prompts;
use crate::protocol::{Request, Response, PROTOCOL_VERSION};
use crate::resources::ResourceCatalog;
use crate::runner::ToolRunner;
use crate::tools::ToolContext;
use chrono::Local;
use serde_json::{json, Value};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub const SERVER_NAME: &str = "gsd-mcp-server";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const LOG_SNIPPET_CHARS: usize = 200;

pub struct McpServer {
    dispatcher: Dispatcher,
    resources: ResourceCatalog,
    call_log: Option<PathBuf>,
}

impl McpServer {
    pub fn new(config: &ServerConfig, paths: InstallPaths) -> Self {
        let runner = ToolRunner::new(config, paths.tool_entry.clone());
        let resources = ResourceCatalog::new(&paths);
        Self {
            dispatcher: Dispatcher::new(ToolContext::new(paths, runner)),
            resources,
            call_log: config.call_log.clone(),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn resources(&self) -> &ResourceCatalog {
        &self.resources
    }

    /// Handle one raw input line. `None` means nothing is written back.
    pub async fn handle_line(&self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let msg: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("JSON parse error: {}", e);
                return Some(Response::err(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        // Unreadable requests are answered even without an id
        let id = msg.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<Request>(msg) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                log::warn!("Invalid request: {}", e);
                Some(Response::err(id, INVALID_REQUEST, format!("Invalid request: {}", e)))
            }
        }
    }

    pub async fn handle_request(&self, request: Request) -> Option<Response> {
        log::debug!("Received: {}", request.method);

        if request.is_notification() {
            log::debug!("Notification {} acknowledged", request.method);
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        let params = &request.params;
        let result = match request.method.as_str() {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.dispatcher.list_tools() })),
            "tools/call" => self.call_tool(params).await,
            "resources/list" => self.list_resources().await,
            "resources/read" => self.read_resource(params).await,
            "prompts/list" => Ok(json!({ "prompts": prompts::list() })),
            "prompts/get" => self.get_prompt(params),
            other => {
                return Some(Response::err(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Unknown method: {}", other),
                ));
            }
        };

        Some(match result {
            Ok(value) => Response::ok(id, value),
            Err(e) => {
                log::warn!("{} failed: {}", request.method, e);
                Response::err(id, e.code(), e.to_string())
            }
        })
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {}, "resources": {}, "prompts": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION,
            }
        })
    }

    async fn call_tool(&self, params: &Value) -> Result<Value> {
        let name = required_str(params, "name")?;
        let args = params.get("arguments").cloned().unwrap_or(Value::Null);

        self.cmd_log(&format!("CALL {} | {}", name, param_summary(&args)));
        let result = self.dispatcher.invoke(name, args).await?;
        if result.is_error() {
            let snippet: String = result.joined_text().chars().take(LOG_SNIPPET_CHARS).collect();
            self.cmd_log(&format!("FAIL {} | {}", name, snippet));
        }
        Ok(json!(result))
    }

    async fn list_resources(&self) -> Result<Value> {
        let resources = self.resources.list_async().await?;
        Ok(json!({ "resources": resources }))
    }

    async fn read_resource(&self, params: &Value) -> Result<Value> {
        let uri = required_str(params, "uri")?;
        let contents = self.resources.read(uri).await?;
        Ok(json!({ "contents": [contents] }))
    }

    fn get_prompt(&self, params: &Value) -> Result<Value> {
        let name = required_str(params, "name")?;
        let args = params.get("arguments").unwrap_or(&Value::Null);
        let prompt = prompts::get(name, args)?;
        Ok(json!(prompt))
    }

    /// Append a timestamped line to the call log, if one is configured.
    fn cmd_log(&self, msg: &str) {
        let Some(path) = &self.call_log else {
            return;
        };
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(mut f) => {
                let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
                if let Err(e) = writeln!(f, "[{}] {}", ts, msg) {
                    log::debug!("call log write failed: {}", e);
                }
            }
            Err(e) => log::debug!("call log {:?} unavailable: {}", path, e),
        }
    }
}

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ServerError::InvalidRequest(format!("missing '{}' parameter", key)))
}

/// Compact one-line rendering of tool arguments for the call log.
fn param_summary(args: &Value) -> String {
    let Some(map) = args.as_object() else {
        return "-".to_string();
    };
    if map.is_empty() {
        return "-".to_string();
    }
    map.iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if v.chars().count() > LOG_SNIPPET_CHARS {
                let head: String = v.chars().take(LOG_SNIPPET_CHARS).collect();
                format!("{}={}…", k, head)
            } else {
                format!("{}={}", k, v)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received SIGINT"),
        _ = terminate => log::info!("Received SIGTERM"),
    }
}

/// Serve stdio until EOF or a termination signal.
pub async fn run(server: McpServer) -> std::io::Result<()> {
    log::info!("Starting {} v{}", SERVER_NAME, SERVER_VERSION);
    log::info!(
        "{} tools, {} resources available",
        server.dispatcher.len(),
        server.resources.list().len()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(l)) => l,
            Ok(None) => {
                log::info!("stdin closed");
                break;
            }
            Err(e) => {
                log::error!("stdin read error: {}", e);
                break;
            }
        };

        if let Some(response) = server.handle_line(&line).await {
            let mut msg = serde_json::to_string(&response)?;
            msg.push('\n');
            stdout.write_all(msg.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    stdout.flush().await?;
    log::info!("Server stopped");
    Ok(())
}
