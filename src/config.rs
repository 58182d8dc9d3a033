// GSD MCP Server - Configuration
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// All process-wide settings, resolved once at startup and passed down
// explicitly. Nothing else in the crate reads the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that pins the installation root.
pub const CONFIG_DIR_ENV: &str = "GSD_CONFIG_DIR";
/// Subdirectory that marks a directory as a GSD installation root.
pub const MARKER_DIR: &str = "get-shit-done";

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Master server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// User home directory (HOME, else USERPROFILE)
    pub home_dir: Option<PathBuf>,
    /// Explicit installation root override (GSD_CONFIG_DIR)
    pub config_dir: Option<PathBuf>,
    /// Root used when no home candidate matches (development checkout)
    pub dev_root: PathBuf,
    /// Interpreter used to run gsd-tools.js
    pub node_binary: PathBuf,
    pub tool_timeout: Duration,
    pub max_output_bytes: usize,
    /// Append-only log of tool calls, if enabled
    pub call_log: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            home_dir: None,
            config_dir: None,
            dev_root: dev_root(),
            node_binary: PathBuf::from("node"),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            call_log: None,
        }
    }
}

impl ServerConfig {
    /// Defaults plus home directory and override taken from the process environment.
    pub fn from_env() -> Self {
        Self {
            home_dir: home_from_env(),
            config_dir: non_empty_env(CONFIG_DIR_ENV).map(PathBuf::from),
            ..Self::default()
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn home_from_env() -> Option<PathBuf> {
    non_empty_env("HOME")
        .or_else(|| non_empty_env("USERPROFILE"))
        .map(PathBuf::from)
}

/// Development fallback root.
///
/// Resolution order:
///   1. Nearest ancestor of the running binary containing get-shit-done/
///   2. Parent of this crate's manifest directory (source checkout layout)
fn dev_root() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Ok(canonical) = exe.canonicalize() {
            if let Some(found) = find_marker_ancestor(&canonical) {
                return found;
            }
        }
    }
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest.to_path_buf())
}

fn find_marker_ancestor(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .skip(1)
        .find(|dir| dir.join(MARKER_DIR).is_dir())
        .map(Path::to_path_buf)
}
