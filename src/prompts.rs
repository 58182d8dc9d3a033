// GSD MCP Server - Prompt Catalog
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Static prompt templates. Each renders to one user message; optional
// arguments that were not supplied leave no trace in the text.

use crate::error::{Result, ServerError};
use crate::protocol::{Content, GetPromptResult, PromptArgument, PromptInfo, PromptMessage};
use serde_json::{Map, Value};

struct PromptDef {
    name: &'static str,
    description: &'static str,
    /// (name, description, required)
    arguments: &'static [(&'static str, &'static str, bool)],
}

const PROMPTS: &[PromptDef] = &[
    PromptDef {
        name: "gsd_new_project",
        description: "Configure a new GSD project",
        arguments: &[
            ("name", "Project name", true),
            ("description", "What do you want to build?", true),
            ("auto", "Auto mode (skip interactive questioning)", false),
        ],
    },
    PromptDef {
        name: "gsd_discuss_phase",
        description: "Discuss phase implementation details",
        arguments: &[
            ("phase", "Phase number", true),
            ("focus", "Focus area (ui, api, content, organization)", false),
        ],
    },
    PromptDef {
        name: "gsd_plan_phase",
        description: "Plan a phase with options",
        arguments: &[
            ("phase", "Phase number", true),
            ("skip_research", "Skip research step", false),
            ("skip_verify", "Skip plan verification", false),
        ],
    },
    PromptDef {
        name: "gsd_quick",
        description: "Quick ad-hoc task",
        arguments: &[("task", "What do you want to do?", true)],
    },
];

pub fn list() -> Vec<PromptInfo> {
    PROMPTS
        .iter()
        .map(|p| PromptInfo {
            name: p.name,
            description: p.description,
            arguments: p
                .arguments
                .iter()
                .map(|&(name, description, required)| PromptArgument {
                    name,
                    description,
                    required,
                })
                .collect(),
        })
        .collect()
}

/// Prompt arguments arrive as a string map; non-string values are stringified.
struct Args<'a>(Option<&'a Map<String, Value>>);

impl Args<'_> {
    fn get(&self, key: &str) -> Option<String> {
        let value = self.0?.get(key)?;
        let text = match value {
            Value::Null => return None,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        (!text.trim().is_empty()).then_some(text)
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key).as_deref() == Some("true")
    }
}

pub fn get(name: &str, arguments: &Value) -> Result<GetPromptResult> {
    let def = PROMPTS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| ServerError::UnknownPrompt(name.to_string()))?;
    let args = Args(arguments.as_object());

    for &(arg, _, required) in def.arguments {
        if required && args.get(arg).is_none() {
            return Err(ServerError::MissingPromptArgument {
                prompt: name.to_string(),
                argument: arg.to_string(),
            });
        }
    }

    Ok(GetPromptResult {
        description: def.description,
        messages: vec![PromptMessage {
            role: "user",
            content: Content::text(render(def.name, &args)),
        }],
    })
}

fn render(name: &str, args: &Args<'_>) -> String {
    let mut text = String::new();
    match name {
        "gsd_new_project" => {
            text.push_str("Initialize a new GSD project.\n\n");
            if let Some(project) = args.get("name") {
                text.push_str(&format!("Project name: {}\n", project));
            }
            if let Some(description) = args.get("description") {
                text.push_str(&format!("Description: {}\n", description));
            }
            if args.flag("auto") {
                text.push_str("\nAuto mode enabled - will run without interactive questioning.\n");
            }
            text.push_str(
                "\nThis will create:\n- .planning/PROJECT.md\n- .planning/REQUIREMENTS.md\n- .planning/ROADMAP.md\n- .planning/STATE.md",
            );
        }
        "gsd_discuss_phase" => {
            let phase = args.get("phase").unwrap_or_default();
            text.push_str(&format!("Discuss phase {} implementation details.\n\n", phase));
            if let Some(focus) = args.get("focus") {
                text.push_str(&format!("Focus area: {}\n\n", focus));
            }
            text.push_str("This will help capture your implementation preferences before planning.");
        }
        "gsd_plan_phase" => {
            let phase = args.get("phase").unwrap_or_default();
            text.push_str(&format!("Plan phase {}.\n\n", phase));
            if args.flag("skip_research") {
                text.push_str("- Skip research: Yes\n");
            }
            if args.flag("skip_verify") {
                text.push_str("- Skip verification: Yes\n");
            }
            text.push_str("\nThis will research, create plans, and verify them.");
        }
        "gsd_quick" => {
            let task = args.get("task").unwrap_or_default();
            text.push_str(&format!(
                "Quick task: {}\n\nThis will create an atomic plan and execute it immediately.",
                task
            ));
        }
        other => text.push_str(&format!("GSD prompt: {}", other)),
    }
    text
}
