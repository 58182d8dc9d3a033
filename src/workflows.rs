// GSD MCP Server - Workflow Documents
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Loads get-shit-done/workflows/<name>.md from the first search
// directory that has it. Content is opaque markdown.

use crate::error::{Result, ServerError};
use std::path::PathBuf;

pub async fn load_workflow(dirs: &[PathBuf], name: &str) -> Result<String> {
    for dir in dirs {
        let path = dir.join(format!("{}.md", name));
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                log::debug!("Loaded workflow {} from {:?}", name, path);
                return Ok(content);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                log::warn!("Skipping unreadable workflow {:?}: {}", path, e);
                continue;
            }
        }
    }
    Err(ServerError::WorkflowNotFound(name.to_string()))
}
