// GSD MCP Server - Protocol Session Tests
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Drives a full MCP session line by line against a temporary installation.

use gsd_mcp_server::config::ServerConfig;
use gsd_mcp_server::mcp::McpServer;
use gsd_mcp_server::paths::InstallPaths;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn installation() -> TempDir {
    let root = tempdir().unwrap();
    let gsd = root.path().join("get-shit-done");
    for dir in ["workflows", "templates/codebase", "references", "bin"] {
        std::fs::create_dir_all(gsd.join(dir)).unwrap();
    }
    std::fs::create_dir_all(root.path().join("agents")).unwrap();

    std::fs::write(gsd.join("workflows/execute-phase.md"), "Run every plan in order.").unwrap();
    std::fs::write(gsd.join("workflows/progress.md"), "Report progress.").unwrap();
    std::fs::write(gsd.join("templates/codebase/stack.md"), "# Stack").unwrap();
    std::fs::write(gsd.join("references/questioning.md"), "# Questioning").unwrap();
    std::fs::write(root.path().join("agents/gsd-planner.md"), "# Planner").unwrap();
    std::fs::write(root.path().join("agents/other-agent.md"), "# Not ours").unwrap();
    root
}

fn server(root: &Path, node: &str) -> McpServer {
    let config = ServerConfig {
        config_dir: Some(root.to_path_buf()),
        node_binary: PathBuf::from(node),
        ..ServerConfig::default()
    };
    let paths = InstallPaths::resolve(&config).unwrap();
    McpServer::new(&config, paths)
}

async fn send(server: &McpServer, id: u64, method: &str, params: Value) -> Value {
    let line = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string();
    let response = server.handle_line(&line).await.expect("request gets a response");
    let value = serde_json::to_value(response).unwrap();
    assert_eq!(value["jsonrpc"], json!("2.0"));
    assert_eq!(value["id"], json!(id));
    value
}

#[tokio::test]
async fn full_session() {
    let root = installation();
    let project = tempdir().unwrap();
    let cwd = project.path().to_str().unwrap();
    let server = server(root.path(), "/nonexistent/bin/node");

    let init = send(&server, 1, "initialize", json!({"protocolVersion": "2024-11-05"})).await;
    assert_eq!(init["result"]["serverInfo"]["version"], json!(env!("CARGO_PKG_VERSION")));
    assert!(server
        .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await
        .is_none());

    let tools = send(&server, 2, "tools/list", json!({})).await;
    let tools = tools["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 31);
    let run_cli = tools.iter().find(|t| t["name"] == "gsd_run_cli").unwrap();
    assert_eq!(run_cli["inputSchema"]["required"], json!(["command"]));
    assert_eq!(run_cli["inputSchema"]["properties"]["args"]["type"], json!("array"));

    let page = send(
        &server,
        3,
        "tools/call",
        json!({"name": "gsd_execute_phase", "arguments": {"phase": 2, "cwd": cwd}}),
    )
    .await;
    let text = page["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("## Executing Phase 2\n\n### Workflow Instructions\n\nRun every plan in order."));
    assert!(text.ends_with(&format!("- Project: {}", cwd)));
    assert!(page["result"].get("isError").is_none());

    let progress = send(
        &server,
        4,
        "tools/call",
        json!({"name": "gsd_progress", "arguments": {"cwd": cwd}}),
    )
    .await;
    let text = progress["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("Report progress."));
    assert!(progress["result"].get("isError").is_none());

    let invalid = send(
        &server,
        5,
        "tools/call",
        json!({"name": "gsd_progress", "arguments": {"format": "pie"}}),
    )
    .await;
    assert_eq!(invalid["result"]["isError"], json!(true));
}

#[tokio::test]
async fn resources_listing_and_reading() {
    let root = installation();
    let server = server(root.path(), "/nonexistent/bin/node");

    let listed = send(&server, 1, "resources/list", json!({})).await;
    let uris: Vec<&str> = listed["result"]["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["uri"].as_str().unwrap())
        .collect();
    assert!(uris.contains(&"gsd://templates/codebase/stack"));
    assert!(uris.contains(&"gsd://workflows/execute-phase"));
    assert!(uris.contains(&"gsd://references/questioning"));
    assert!(uris.contains(&"gsd://agents/gsd-planner"));
    assert!(!uris.iter().any(|u| u.contains("other-agent")));

    for uri in &uris {
        let read = send(&server, 2, "resources/read", json!({ "uri": uri })).await;
        assert_eq!(read["result"]["contents"][0]["uri"], json!(uri));
    }

    let denied = send(
        &server,
        3,
        "resources/read",
        json!({"uri": "gsd://agents/../get-shit-done/workflows/progress"}),
    )
    .await;
    assert!(denied.get("error").is_some());
}

#[tokio::test]
async fn prompts_listing_and_rendering() {
    let root = installation();
    let server = server(root.path(), "/nonexistent/bin/node");

    let listed = send(&server, 1, "prompts/list", json!({})).await;
    assert_eq!(listed["result"]["prompts"].as_array().unwrap().len(), 4);

    let prompt = send(
        &server,
        2,
        "prompts/get",
        json!({"name": "gsd_quick", "arguments": {"task": "bump deps"}}),
    )
    .await;
    assert_eq!(prompt["result"]["messages"][0]["role"], json!("user"));
    assert!(prompt["result"]["messages"][0]["content"]["text"]
        .as_str()
        .unwrap()
        .starts_with("Quick task: bump deps"));
}

/// Installation whose gsd-tools is a shell script, run through `sh`.
#[cfg(unix)]
#[tokio::test]
async fn run_cli_and_progress_delegate_to_gsd_tools() {
    let root = installation();
    let script = root.path().join("get-shit-done/bin/gsd-tools.js");
    std::fs::write(&script, "echo \"ran $*\"\necho note >&2\n").unwrap();
    let project = tempdir().unwrap();
    std::fs::create_dir_all(project.path().join(".planning")).unwrap();
    std::fs::write(project.path().join(".planning/STATE.md"), "# State").unwrap();
    let cwd = project.path().to_str().unwrap();
    let server = server(root.path(), "sh");

    let cli = send(
        &server,
        1,
        "tools/call",
        json!({"name": "gsd_run_cli", "arguments": {"command": "state load", "args": ["--raw"], "cwd": cwd}}),
    )
    .await;
    assert_eq!(
        cli["result"]["content"][0]["text"],
        json!("## gsd-tools state load\n\n**stdout:**\n```\nran state load --raw\n\n```\n\n**stderr:**\n```\nnote\n\n```")
    );

    let progress = send(
        &server,
        2,
        "tools/call",
        json!({"name": "gsd_progress", "arguments": {"format": "bar", "cwd": cwd}}),
    )
    .await;
    assert_eq!(
        progress["result"]["content"][0]["text"],
        json!("## Project Progress (bar)\n\nran progress bar\n")
    );
}
