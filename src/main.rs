// GSD MCP Server - Main Entry Point
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// CLI and MCP stdio server.
// Usage:
//   gsd-mcp-server                      # Run MCP server (stdio), same as `serve`
//   gsd-mcp-server serve                # Run MCP server (stdio)
//   gsd-mcp-server status               # Show resolved paths and catalog sizes
//   gsd-mcp-server tools                # Print advertised tool schemas (JSON)
//   gsd-mcp-server resources            # Print discoverable resources (JSON)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gsd_mcp_server::{
    config::{ServerConfig, CONFIG_DIR_ENV},
    mcp::{self, McpServer, SERVER_VERSION},
    paths::InstallPaths,
    prompts,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "gsd-mcp-server")]
#[command(author = "Joseph Stone")]
#[command(version)]
#[command(about = "GSD MCP Server - exposes the GSD workflow toolkit over the Model Context Protocol")]
struct Cli {
    /// Installation root override (contains get-shit-done/ and agents/)
    #[arg(long, global = true, env = CONFIG_DIR_ENV)]
    config_dir: Option<PathBuf>,

    /// Interpreter used to run gsd-tools.js
    #[arg(long, global = true, env = "GSD_NODE", default_value = "node")]
    node: PathBuf,

    /// Wall-clock limit for one gsd-tools run, in seconds
    #[arg(long, global = true, default_value_t = 60)]
    timeout_secs: u64,

    /// Combined stdout+stderr limit for one gsd-tools run, in bytes
    #[arg(long, global = true, default_value_t = 10 * 1024 * 1024)]
    max_output_bytes: usize,

    /// Append a timestamped line per tool call to this file
    #[arg(long, global = true)]
    call_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run MCP server (stdio JSON-RPC)
    Serve,

    /// Show resolved installation paths and catalog sizes
    Status,

    /// Print advertised tool schemas as JSON
    Tools,

    /// Print discoverable resources as JSON
    Resources,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::from_env();
        if let Some(dir) = self.config_dir.as_ref().filter(|d| !d.as_os_str().is_empty()) {
            config.config_dir = Some(dir.clone());
        }
        config.node_binary = self.node.clone();
        config.tool_timeout = Duration::from_secs(self.timeout_secs);
        config.max_output_bytes = self.max_output_bytes;
        config.call_log = self.call_log.clone();
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout is reserved for protocol traffic
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();

    let cli = Cli::parse();
    let config = cli.server_config();
    let paths = InstallPaths::resolve(&config).context("Failed to resolve GSD installation")?;
    log::info!("Installation root: {:?}", paths.root);
    log::info!("gsd-tools entry point: {:?}", paths.tool_entry);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let server = McpServer::new(&config, paths);
            mcp::run(server).await.context("MCP server I/O failure")?;
        }

        Commands::Status => {
            let server = McpServer::new(&config, paths.clone());
            println!("GSD MCP Server v{}", SERVER_VERSION);
            println!("Root:        {}", paths.root.display());
            println!("gsd-tools:   {} ({})", paths.tool_entry.display(), presence(&paths.tool_entry));
            println!("Node:        {}", config.node_binary.display());
            println!("Timeout:     {}s", config.tool_timeout.as_secs());
            println!("Output cap:  {} bytes", config.max_output_bytes);
            println!();
            println!("Tools:       {}", server.dispatcher().len());
            println!("Resources:   {}", server.resources().list().len());
            println!("Prompts:     {}", prompts::list().len());
            println!();
            println!("Workflow search order:");
            for dir in &paths.workflow_dirs {
                println!("  {} ({})", dir.display(), presence(dir));
            }
        }

        Commands::Tools => {
            let server = McpServer::new(&config, paths);
            let tools = server.dispatcher().list_tools();
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }

        Commands::Resources => {
            let server = McpServer::new(&config, paths);
            let resources = server.resources().list();
            println!("{}", serde_json::to_string_pretty(&resources)?);
        }
    }

    Ok(())
}

fn presence(path: &std::path::Path) -> &'static str {
    if path.exists() {
        "found"
    } else {
        "missing"
    }
}
