// GSD MCP Server - Tool Dispatcher
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Lists tools and routes calls: name lookup, argument validation, handler
// invocation. Only an unknown name is a protocol error; validation
// failures, handler errors and handler panics all come back as error
// envelopes so the client sees them as tool output.

use crate::error::{Result, ServerError};
use crate::protocol::{CallToolResult, ToolInfo};
use crate::schema::FieldError;
use crate::tools::{self, Tool, ToolContext};
use futures::FutureExt;
use serde_json::{json, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;

pub struct Dispatcher {
    tools: Vec<Tool>,
    ctx: ToolContext,
}

impl Dispatcher {
    pub fn new(ctx: ToolContext) -> Self {
        Self::with_tools(tools::registry(), ctx)
    }

    pub fn with_tools(tools: Vec<Tool>, ctx: ToolContext) -> Self {
        debug_assert!(
            tools
                .iter()
                .enumerate()
                .all(|(i, t)| tools[..i].iter().all(|o| o.name != t.name)),
            "duplicate tool name"
        );
        Self { tools, ctx }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name,
                description: t.description,
                input_schema: t.schema.to_json_schema(),
            })
            .collect()
    }

    /// Run one tool. `Err` only for an unknown name.
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
        let tool = self
            .find(name)
            .ok_or_else(|| ServerError::UnknownTool(name.to_string()))?;

        let arguments = if arguments.is_null() { json!({}) } else { arguments };
        let arguments = match tool.schema.validate(&arguments) {
            Ok(valid) => valid,
            Err(errors) => {
                log::info!("{} rejected: {} invalid field(s)", name, errors.len());
                return Ok(validation_failure(name, &errors));
            }
        };

        let outcome = AssertUnwindSafe((tool.handler)(&self.ctx, arguments))
            .catch_unwind()
            .await;
        Ok(match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                log::warn!("{} failed: {}", name, e);
                CallToolResult::error(format!("Error executing tool {}: {}", name, e))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::error!("{} panicked: {}", name, message);
                CallToolResult::error(format!("Error executing tool {}: {}", name, message))
            }
        })
    }
}

fn validation_failure(name: &str, errors: &[FieldError]) -> CallToolResult {
    let details: Vec<String> = errors.iter().map(|e| format!("- {}", e)).collect();
    CallToolResult::error(format!(
        "Validation error in tool {}:\n{}",
        name,
        details.join("\n")
    ))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
