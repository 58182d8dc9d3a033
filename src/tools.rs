// GSD MCP Server - Tool Registry
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Every tool exposed over MCP: name, description, input schema, handler.
// Built once at startup, never mutated. Handlers receive arguments that
// already passed schema validation (defaults filled in).
//
// Most tools load a workflow document and wrap it with the call's context.
// gsd_progress, gsd_read_state, gsd_run_cli and gsd_health inspect the
// project directory or delegate to gsd-tools.

use crate::error::Result;
use crate::paths::InstallPaths;
use crate::protocol::CallToolResult;
use crate::runner::ToolRunner;
use crate::schema::{Field, ObjectSchema};
use crate::workflows::load_workflow;
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub type HandlerFuture<'a> = BoxFuture<'a, Result<CallToolResult>>;
pub type Handler = for<'a> fn(&'a ToolContext, Value) -> HandlerFuture<'a>;

pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: ObjectSchema,
    pub handler: Handler,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Shared, read-only state handed to every handler.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub paths: InstallPaths,
    pub runner: ToolRunner,
}

impl ToolContext {
    pub fn new(paths: InstallPaths, runner: ToolRunner) -> Self {
        Self { paths, runner }
    }

    /// Absolute `cwd` argument, else the server's working directory.
    pub fn project_dir(&self, cwd: Option<&str>) -> PathBuf {
        match cwd.filter(|c| Path::new(c).is_absolute()) {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub async fn workflow(&self, name: &str) -> Result<String> {
        load_workflow(&self.paths.workflow_dirs, name).await
    }
}

// ============================================================================
// PAGE LAYOUT
// ============================================================================

/// Markdown page: title, optional preamble, workflow text, trailing sections.
struct Page {
    title: String,
    preamble: Vec<String>,
    sections: Vec<(&'static str, Vec<String>)>,
}

impl Page {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            preamble: Vec::new(),
            sections: Vec::new(),
        }
    }

    fn preamble(mut self, line: impl Into<String>) -> Self {
        self.preamble.push(line.into());
        self
    }

    fn preamble_if(self, cond: bool, line: impl Into<String>) -> Self {
        if cond {
            self.preamble(line)
        } else {
            self
        }
    }

    fn section(mut self, heading: &'static str, lines: Vec<String>) -> Self {
        self.sections.push((heading, lines));
        self
    }

    fn render(&self, workflow: &str) -> String {
        let mut text = format!("## {}\n\n", self.title);
        if !self.preamble.is_empty() {
            text.push_str(&self.preamble.join("\n"));
            text.push_str("\n\n");
        }
        text.push_str("### Workflow Instructions\n\n");
        text.push_str(workflow);
        text.push_str("\n\n---");
        for (heading, lines) in &self.sections {
            text.push_str(&format!("\n\n### {}\n{}", heading, lines.join("\n")));
        }
        text
    }
}

/// Bulleted context list ending with the project directory.
struct Context(Vec<String>);

impl Context {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn item(mut self, label: &str, value: impl std::fmt::Display) -> Self {
        self.0.push(format!("- {}: {}", label, value));
        self
    }

    fn item_opt(self, label: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.item(label, v),
            None => self,
        }
    }

    fn project(mut self, dir: &Path) -> Vec<String> {
        self.0.push(format!("- Project: {}", dir.display()));
        self.0
    }
}

/// Phase numbers may be decimal (2.1); whole numbers print without ".0".
fn num(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

async fn workflow_page(
    ctx: &ToolContext,
    workflow: &str,
    page: Page,
) -> Result<CallToolResult> {
    let text = ctx.workflow(workflow).await?;
    Ok(CallToolResult::text(page.render(&text)))
}

// ============================================================================
// ARGUMENT SHAPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct CwdArgs {
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhaseArgs {
    phase: f64,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DescriptionArgs {
    description: String,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewProjectArgs {
    name: String,
    description: String,
    auto: Option<bool>,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanPhaseArgs {
    phase: f64,
    skip_research: Option<bool>,
    skip_verify: Option<bool>,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProgressArgs {
    format: String,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MapCodebaseArgs {
    deep: Option<bool>,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewMilestoneArgs {
    name: Option<String>,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompleteMilestoneArgs {
    version: Option<String>,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadStateArgs {
    section: Option<String>,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunCliArgs {
    command: String,
    args: Option<Vec<String>>,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InsertPhaseArgs {
    after: f64,
    description: String,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemovePhaseArgs {
    phase: f64,
    force: Option<bool>,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddTodoArgs {
    description: String,
    area: Option<String>,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AreaArgs {
    area: Option<String>,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PauseWorkArgs {
    notes: Option<String>,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExecutePlanArgs {
    phase: f64,
    plan: f64,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SetProfileArgs {
    profile: String,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SettingsArgs {
    key: Option<String>,
    value: Option<String>,
    list: Option<bool>,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransitionArgs {
    from: Option<String>,
    to: Option<String>,
    cwd: Option<String>,
}

// ============================================================================
// SCHEMAS
// ============================================================================

const PROJECT_DIR: &str = "Project directory (absolute path)";

fn cwd_field() -> Field {
    Field::string().optional().describe(PROJECT_DIR)
}

fn cwd_only() -> ObjectSchema {
    ObjectSchema::new().field("cwd", cwd_field())
}

fn phase_schema(description: &'static str) -> ObjectSchema {
    ObjectSchema::new()
        .field("phase", Field::number().describe(description))
        .field("cwd", cwd_field())
}

fn description_schema(description: &'static str) -> ObjectSchema {
    ObjectSchema::new()
        .field("description", Field::string().describe(description))
        .field("cwd", cwd_field())
}

fn tool(
    name: &'static str,
    description: &'static str,
    schema: ObjectSchema,
    handler: Handler,
) -> Tool {
    Tool {
        name,
        description,
        schema,
        handler,
    }
}

/// The full tool catalog, in advertised order.
pub fn registry() -> Vec<Tool> {
    vec![
        tool(
            "gsd_new_project",
            "Initialize a new project with GSD workflow",
            ObjectSchema::new()
                .field("name", Field::string().describe("Project name"))
                .field("description", Field::string().describe("Project description"))
                .field(
                    "auto",
                    Field::boolean()
                        .optional()
                        .describe("Auto mode - skip interactive questioning"),
                )
                .field(
                    "cwd",
                    Field::string().optional().describe(
                        "Project directory (absolute path). If not provided, uses current working directory",
                    ),
                ),
            new_project,
        ),
        tool(
            "gsd_plan_phase",
            "Research and create plans for a phase",
            ObjectSchema::new()
                .field("phase", Field::number().describe("Phase number to plan"))
                .field("skipResearch", Field::boolean().optional().describe("Skip research step"))
                .field("skipVerify", Field::boolean().optional().describe("Skip plan verification"))
                .field("cwd", cwd_field()),
            plan_phase,
        ),
        tool(
            "gsd_execute_phase",
            "Execute all plans in a phase",
            phase_schema("Phase number to execute"),
            execute_phase,
        ),
        tool(
            "gsd_verify_work",
            "Verify phase completion with user acceptance testing",
            phase_schema("Phase number to verify"),
            verify_work,
        ),
        tool(
            "gsd_discuss_phase",
            "Discuss phase implementation details before planning",
            phase_schema("Phase number to discuss"),
            discuss_phase,
        ),
        tool(
            "gsd_progress",
            "Show current project progress and status",
            ObjectSchema::new()
                .field(
                    "format",
                    Field::one_of(&["json", "table", "bar"])
                        .default_value("table")
                        .describe("Output format"),
                )
                .field("cwd", cwd_field()),
            progress,
        ),
        tool(
            "gsd_quick",
            "Execute a quick ad-hoc task",
            description_schema("Quick task description"),
            quick,
        ),
        tool(
            "gsd_map_codebase",
            "Analyze existing codebase",
            ObjectSchema::new()
                .field("deep", Field::boolean().optional().describe("Deep analysis mode"))
                .field("cwd", cwd_field()),
            map_codebase,
        ),
        tool(
            "gsd_new_milestone",
            "Start a new milestone",
            ObjectSchema::new()
                .field("name", Field::string().optional().describe("Milestone name"))
                .field("cwd", cwd_field()),
            new_milestone,
        ),
        tool(
            "gsd_complete_milestone",
            "Complete current milestone",
            ObjectSchema::new()
                .field("version", Field::string().optional().describe("Version tag"))
                .field("cwd", cwd_field()),
            complete_milestone,
        ),
        tool(
            "gsd_read_state",
            "Read project STATE.md file",
            ObjectSchema::new()
                .field(
                    "section",
                    Field::string().optional().describe(
                        "Specific section to read (e.g., 'current', 'progress', 'metrics')",
                    ),
                )
                .field("cwd", cwd_field()),
            read_state,
        ),
        tool(
            "gsd_run_cli",
            "Run any gsd-tools.js command directly",
            ObjectSchema::new()
                .field(
                    "command",
                    Field::string().describe(
                        "Command to run (e.g., 'state load', 'progress json', 'todo complete my-todo')",
                    ),
                )
                .field(
                    "args",
                    Field::array(Field::string())
                        .optional()
                        .describe("Additional arguments"),
                )
                .field("cwd", cwd_field()),
            run_cli,
        ),
        tool(
            "gsd_health",
            "Check GSD installation and project health",
            ObjectSchema::new().field(
                "cwd",
                Field::string().optional().describe(
                    "Project directory to check (absolute path). If not provided, uses current working directory",
                ),
            ),
            health,
        ),
        tool(
            "gsd_add_phase",
            "Add a new phase to the project roadmap",
            description_schema("Phase description"),
            add_phase,
        ),
        tool(
            "gsd_insert_phase",
            "Insert a new decimal phase after an existing phase",
            ObjectSchema::new()
                .field("after", Field::number().describe("Phase number to insert after"))
                .field("description", Field::string().describe("New phase description"))
                .field("cwd", cwd_field()),
            insert_phase,
        ),
        tool(
            "gsd_remove_phase",
            "Remove a phase from the roadmap and renumber subsequent phases",
            ObjectSchema::new()
                .field("phase", Field::number().describe("Phase number to remove"))
                .field(
                    "force",
                    Field::boolean()
                        .optional()
                        .describe("Force removal without confirmation"),
                )
                .field("cwd", cwd_field()),
            remove_phase,
        ),
        tool(
            "gsd_research_phase",
            "Research a phase before planning to gather context and requirements",
            phase_schema("Phase number to research"),
            research_phase,
        ),
        tool(
            "gsd_add_todo",
            "Add a new todo to the project",
            ObjectSchema::new()
                .field("description", Field::string().describe("Todo description"))
                .field("area", Field::string().optional().describe("Todo area/category"))
                .field("cwd", cwd_field()),
            add_todo,
        ),
        tool(
            "gsd_check_todos",
            "Check status of todos across the project",
            ObjectSchema::new()
                .field("area", Field::string().optional().describe("Filter by area/category"))
                .field("cwd", cwd_field()),
            check_todos,
        ),
        tool(
            "gsd_resume_work",
            "Resume work on a paused project",
            cwd_only(),
            resume_work,
        ),
        tool(
            "gsd_pause_work",
            "Pause current work session and save context",
            ObjectSchema::new()
                .field(
                    "notes",
                    Field::string()
                        .optional()
                        .describe("Notes about where work was paused"),
                )
                .field("cwd", cwd_field()),
            pause_work,
        ),
        tool(
            "gsd_audit_milestone",
            "Audit milestone completeness and readiness",
            cwd_only(),
            audit_milestone,
        ),
        tool(
            "gsd_verify_phase",
            "Verify a phase before considering it complete",
            phase_schema("Phase number to verify"),
            verify_phase,
        ),
        tool(
            "gsd_execute_plan",
            "Execute a specific plan within a phase",
            ObjectSchema::new()
                .field("phase", Field::number().describe("Phase number"))
                .field("plan", Field::number().describe("Plan number to execute"))
                .field("cwd", cwd_field()),
            execute_plan,
        ),
        tool(
            "gsd_diagnose_issues",
            "Diagnose project issues and inconsistencies",
            cwd_only(),
            diagnose_issues,
        ),
        tool(
            "gsd_set_profile",
            "Set the model profile (quality/balanced/budget)",
            ObjectSchema::new()
                .field(
                    "profile",
                    Field::one_of(&["quality", "balanced", "budget"])
                        .describe("Model profile to use"),
                )
                .field("cwd", cwd_field()),
            set_profile,
        ),
        tool(
            "gsd_settings",
            "Configure GSD settings",
            ObjectSchema::new()
                .field("key", Field::string().optional().describe("Setting key to get/set"))
                .field(
                    "value",
                    Field::string()
                        .optional()
                        .describe("Setting value (if setting a key)"),
                )
                .field("list", Field::boolean().optional().describe("List all settings"))
                .field("cwd", cwd_field()),
            settings,
        ),
        tool(
            "gsd_list_phase_assumptions",
            "List assumptions for a specific phase",
            phase_schema("Phase number to list assumptions for"),
            list_phase_assumptions,
        ),
        tool(
            "gsd_plan_milestone_gaps",
            "Identify gaps in the current milestone plan",
            cwd_only(),
            plan_milestone_gaps,
        ),
        tool(
            "gsd_discovery_phase",
            "Initial project discovery and analysis",
            cwd_only(),
            discovery_phase,
        ),
        tool(
            "gsd_transition",
            "Transition between work sessions or contexts",
            ObjectSchema::new()
                .field(
                    "from",
                    Field::string()
                        .optional()
                        .describe("What you're transitioning from"),
                )
                .field(
                    "to",
                    Field::string()
                        .optional()
                        .describe("What you're transitioning to"),
                )
                .field("cwd", cwd_field()),
            transition,
        ),
    ]
}

// ============================================================================
// WORKFLOW HANDLERS
// ============================================================================

fn new_project(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: NewProjectArgs = serde_json::from_value(args)?;
        let auto = if args.auto.unwrap_or(false) {
            "✓ Auto mode enabled - skip deep questioning"
        } else {
            "Auto mode disabled - will ask clarifying questions"
        };
        let location = match &args.cwd {
            Some(dir) => format!("Directory: {}", dir),
            None => format!("Current directory: {}", ctx.project_dir(None).display()),
        };
        let page = Page::new(format!("Initializing new project: {}", args.name))
            .preamble(args.description)
            .section("Auto Mode", vec![auto.to_string()])
            .section("Project Location", vec![location]);
        workflow_page(ctx, "new-project", page).await
    })
}

fn plan_phase(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: PlanPhaseArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let page = Page::new(format!("Planning Phase {}", num(args.phase)))
            .preamble_if(args.skip_research.unwrap_or(false), "⚠ Skip research enabled")
            .preamble_if(args.skip_verify.unwrap_or(false), "⚠ Skip verification enabled")
            .section(
                "Execution Context",
                Context::new().item("Phase", num(args.phase)).project(&project),
            );
        workflow_page(ctx, "plan-phase", page).await
    })
}

/// Shared body for tools whose only argument is a phase number.
async fn phase_page(
    ctx: &ToolContext,
    args: Value,
    workflow: &str,
    title: &str,
) -> Result<CallToolResult> {
    let args: PhaseArgs = serde_json::from_value(args)?;
    let project = ctx.project_dir(args.cwd.as_deref());
    let page = Page::new(format!("{} {}", title, num(args.phase))).section(
        "Execution Context",
        Context::new().item("Phase", num(args.phase)).project(&project),
    );
    workflow_page(ctx, workflow, page).await
}

/// Shared body for tools that take nothing but the project directory.
async fn project_page(
    ctx: &ToolContext,
    args: Value,
    workflow: &str,
    title: &str,
) -> Result<CallToolResult> {
    let args: CwdArgs = serde_json::from_value(args)?;
    let project = ctx.project_dir(args.cwd.as_deref());
    let page = Page::new(title).section("Execution Context", Context::new().project(&project));
    workflow_page(ctx, workflow, page).await
}

fn execute_phase(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(phase_page(ctx, args, "execute-phase", "Executing Phase"))
}

fn verify_work(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(phase_page(ctx, args, "verify-work", "Verifying Phase"))
}

fn discuss_phase(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(phase_page(ctx, args, "discuss-phase", "Discussing Phase"))
}

fn research_phase(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(phase_page(ctx, args, "research-phase", "Researching Phase"))
}

fn verify_phase(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(phase_page(ctx, args, "verify-phase", "Verifying Phase"))
}

fn list_phase_assumptions(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(phase_page(
        ctx,
        args,
        "list-phase-assumptions",
        "Listing Assumptions for Phase",
    ))
}

fn resume_work(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(project_page(ctx, args, "resume-project", "Resuming Work"))
}

fn audit_milestone(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(project_page(ctx, args, "audit-milestone", "Auditing Milestone"))
}

fn diagnose_issues(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(project_page(ctx, args, "diagnose-issues", "Diagnosing Project Issues"))
}

fn plan_milestone_gaps(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(project_page(ctx, args, "plan-milestone-gaps", "Planning Milestone Gaps"))
}

fn discovery_phase(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(project_page(ctx, args, "discovery-phase", "Project Discovery Phase"))
}

fn quick(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: DescriptionArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let page = Page::new(format!("Quick Task: {}", args.description)).section(
            "Task Details",
            Context::new()
                .item("Description", &args.description)
                .project(&project),
        );
        workflow_page(ctx, "quick", page).await
    })
}

fn map_codebase(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: MapCodebaseArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let deep = args.deep.unwrap_or(false);
        let title = if deep { "Mapping Codebase (Deep Mode)" } else { "Mapping Codebase" };
        let mode = if deep { "Deep analysis" } else { "Standard analysis" };
        let page = Page::new(title).section(
            "Execution Context",
            Context::new().item("Mode", mode).project(&project),
        );
        workflow_page(ctx, "map-codebase", page).await
    })
}

fn new_milestone(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: NewMilestoneArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let title = match &args.name {
            Some(name) => format!("Starting New Milestone: {}", name),
            None => "Starting New Milestone".to_string(),
        };
        let page = Page::new(title).section(
            "Execution Context",
            Context::new()
                .item_opt("Name", args.name.as_deref())
                .project(&project),
        );
        workflow_page(ctx, "new-milestone", page).await
    })
}

fn complete_milestone(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: CompleteMilestoneArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let title = match &args.version {
            Some(version) => format!("Completing Milestone v{}", version),
            None => "Completing Milestone".to_string(),
        };
        let page = Page::new(title).section(
            "Execution Context",
            Context::new()
                .item_opt("Version", args.version.as_deref())
                .project(&project),
        );
        workflow_page(ctx, "complete-milestone", page).await
    })
}

fn add_phase(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: DescriptionArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let page = Page::new("Adding New Phase")
            .preamble(format!("**Description:** {}", args.description))
            .section(
                "Execution Context",
                Context::new()
                    .item("Description", &args.description)
                    .project(&project),
            );
        workflow_page(ctx, "add-phase", page).await
    })
}

fn insert_phase(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: InsertPhaseArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let page = Page::new(format!("Inserting Phase After {}", num(args.after)))
            .preamble(format!("**Description:** {}", args.description))
            .section(
                "Execution Context",
                Context::new()
                    .item("Insert After", format!("Phase {}", num(args.after)))
                    .item("Description", &args.description)
                    .project(&project),
            );
        workflow_page(ctx, "insert-phase", page).await
    })
}

fn remove_phase(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: RemovePhaseArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let force = args.force.unwrap_or(false);
        let page = Page::new(format!("Removing Phase {}", num(args.phase)))
            .preamble_if(force, "⚠️ **FORCE MODE ENABLED** - Will skip confirmations")
            .section(
                "Execution Context",
                Context::new()
                    .item("Phase to Remove", num(args.phase))
                    .item("Force", force)
                    .project(&project),
            );
        workflow_page(ctx, "remove-phase", page).await
    })
}

fn add_todo(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: AddTodoArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let mut page = Page::new("Adding Todo").preamble(format!("**Description:** {}", args.description));
        if let Some(area) = &args.area {
            page = page.preamble(format!("**Area:** {}", area));
        }
        let page = page.section(
            "Execution Context",
            Context::new()
                .item("Description", &args.description)
                .item_opt("Area", args.area.as_deref())
                .project(&project),
        );
        workflow_page(ctx, "add-todo", page).await
    })
}

fn check_todos(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: AreaArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let title = match &args.area {
            Some(area) => format!("Checking Todos (Area: {})", area),
            None => "Checking Todos".to_string(),
        };
        let page = Page::new(title).section(
            "Execution Context",
            Context::new()
                .item_opt("Area Filter", args.area.as_deref())
                .project(&project),
        );
        workflow_page(ctx, "check-todos", page).await
    })
}

fn pause_work(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: PauseWorkArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let mut page = Page::new("Pausing Work");
        if let Some(notes) = &args.notes {
            page = page.preamble(format!("**Notes:** {}", notes));
        }
        let page = page.section(
            "Execution Context",
            Context::new()
                .item_opt("Notes", args.notes.as_deref())
                .project(&project),
        );
        workflow_page(ctx, "pause-work", page).await
    })
}

fn execute_plan(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: ExecutePlanArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let page = Page::new(format!(
            "Executing Plan {} in Phase {}",
            num(args.plan),
            num(args.phase)
        ))
        .section(
            "Execution Context",
            Context::new()
                .item("Phase", num(args.phase))
                .item("Plan", num(args.plan))
                .project(&project),
        );
        workflow_page(ctx, "execute-plan", page).await
    })
}

fn set_profile(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: SetProfileArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let page = Page::new("Setting Model Profile")
            .preamble(format!("**Profile:** {}", args.profile))
            .section(
                "Execution Context",
                Context::new().item("Profile", &args.profile).project(&project),
            );
        workflow_page(ctx, "set-profile", page).await
    })
}

fn settings(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: SettingsArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let list = args.list.unwrap_or(false);
        let mut page = Page::new("GSD Settings").preamble_if(list, "**Listing all settings**");
        if let Some(key) = &args.key {
            page = page.preamble(format!("**Key:** {}", key));
        }
        if let Some(value) = &args.value {
            page = page.preamble(format!("**Value:** {}", value));
        }
        let mut context = Context::new()
            .item_opt("Key", args.key.as_deref())
            .item_opt("Value", args.value.as_deref());
        if list {
            context = context.item("Action", "List all settings");
        }
        let page = page.section("Execution Context", context.project(&project));
        workflow_page(ctx, "settings", page).await
    })
}

fn transition(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: TransitionArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let mut page = Page::new("Transitioning Work");
        if let Some(from) = &args.from {
            page = page.preamble(format!("**From:** {}", from));
        }
        if let Some(to) = &args.to {
            page = page.preamble(format!("**To:** {}", to));
        }
        let page = page.section(
            "Execution Context",
            Context::new()
                .item_opt("From", args.from.as_deref())
                .item_opt("To", args.to.as_deref())
                .project(&project),
        );
        workflow_page(ctx, "transition", page).await
    })
}

// ============================================================================
// PROJECT-STATE HANDLERS
// ============================================================================

const STATE_EXCERPT_CHARS: usize = 2000;

fn state_path(project: &Path) -> PathBuf {
    project.join(".planning").join("STATE.md")
}

fn progress(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: ProgressArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let state_file = state_path(&project);

        let state = match tokio::fs::read_to_string(&state_file).await {
            Ok(state) => state,
            Err(_) => {
                // No project yet: guidance, not an error
                let mut text = format!(
                    "## Project Progress ({})\n\nNo STATE.md found at {}.\n\n",
                    args.format,
                    state_file.display()
                );
                match ctx.workflow("progress").await {
                    Ok(workflow) => {
                        text.push_str(&format!(
                            "### Workflow Instructions\n\n{}\n\n---\n\n",
                            workflow
                        ));
                    }
                    Err(e) => log::debug!("progress fallback without workflow: {}", e),
                }
                text.push_str(
                    "To see progress, ensure you have initialized a project with `gsd_new_project` first.",
                );
                return Ok(CallToolResult::text(text));
            }
        };

        let body = match ctx
            .runner
            .run("progress", &[args.format.clone()], &project)
            .await
        {
            Ok(out) if !out.stdout.trim().is_empty() => out.stdout,
            Ok(out) if !out.stderr.trim().is_empty() => out.stderr,
            Ok(_) => state.chars().take(STATE_EXCERPT_CHARS).collect(),
            Err(e) => {
                log::warn!("gsd-tools progress failed, showing STATE.md: {}", e);
                state.chars().take(STATE_EXCERPT_CHARS).collect()
            }
        };
        Ok(CallToolResult::text(format!(
            "## Project Progress ({})\n\n{}",
            args.format, body
        )))
    })
}

/// Body of the first `## <section>` heading (case-insensitive), up to the next `## `.
fn extract_section<'a>(content: &'a str, section: &str) -> Option<&'a str> {
    let haystack = content.to_ascii_lowercase();
    let needle = format!("## {}", section.to_ascii_lowercase());
    let start = haystack.find(&needle)? + needle.len();
    let rest = &content[start..];
    let end = rest.find("## ").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn read_state(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: ReadStateArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());
        let state_file = state_path(&project);

        let Ok(content) = tokio::fs::read_to_string(&state_file).await else {
            return Ok(CallToolResult::error(format!(
                "## Error Reading State\n\nNo STATE.md found at {}.\n\nHave you initialized a project with `gsd_new_project`?",
                state_file.display()
            )));
        };

        if let Some(section) = &args.section {
            if let Some(body) = extract_section(&content, section) {
                return Ok(CallToolResult::text(format!(
                    "## State Section: {}\n\n{}",
                    section, body
                )));
            }
        }
        Ok(CallToolResult::text(format!(
            "## Project State\n\nLocation: {}\n\n{}",
            state_file.display(),
            content
        )))
    })
}

fn or_no_output(s: &str) -> &str {
    if s.is_empty() {
        "(no output)"
    } else {
        s
    }
}

fn run_cli(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: RunCliArgs = serde_json::from_value(args)?;
        let project = ctx.project_dir(args.cwd.as_deref());

        // "state load" -> command "state", args ["load", ..extra]
        let mut words = args.command.split_whitespace().map(str::to_string);
        let Some(command) = words.next() else {
            return Ok(CallToolResult::error("gsd_run_cli: command must not be empty"));
        };
        let mut argv: Vec<String> = words.collect();
        argv.extend(args.args.unwrap_or_default());

        let out = ctx.runner.run(&command, &argv, &project).await?;
        Ok(CallToolResult::text(format!(
            "## gsd-tools {}\n\n**stdout:**\n```\n{}\n```\n\n**stderr:**\n```\n{}\n```",
            args.command,
            or_no_output(&out.stdout),
            or_no_output(&out.stderr)
        )))
    })
}

const KEY_PLANNING_FILES: [&str; 4] = ["PROJECT.md", "REQUIREMENTS.md", "ROADMAP.md", "STATE.md"];

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("- {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

async fn exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

async fn count_entries(dir: &Path) -> std::io::Result<usize> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut count = 0;
    while entries.next_entry().await?.is_some() {
        count += 1;
    }
    Ok(count)
}

fn health(ctx: &ToolContext, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: CwdArgs = serde_json::from_value(args)?;
        let mut checks: Vec<String> = Vec::new();
        let mut issues: Vec<String> = Vec::new();

        checks.push(format!(
            "✓ gsd-tools.js path resolved: {}",
            ctx.runner.entry_point().display()
        ));
        let project = ctx.project_dir(args.cwd.as_deref());
        checks.push(format!("✓ Project path: {}", project.display()));

        let planning = project.join(".planning");
        if exists(&planning).await {
            checks.push("✓ .planning/ directory exists".to_string());
            for file in KEY_PLANNING_FILES {
                if exists(&planning.join(file)).await {
                    checks.push(format!("✓ {} exists", file));
                } else {
                    issues.push(format!("✗ {} missing", file));
                }
            }
            match count_entries(&planning.join("phases")).await {
                Ok(n) => checks.push(format!("✓ {} phase directories found", n)),
                Err(_) => issues.push("✗ No phases directory (project not planned yet?)".to_string()),
            }
        } else {
            issues.push("✗ .planning/ directory not found - project not initialized".to_string());
        }

        if exists(&project.join(".git")).await {
            checks.push("✓ Git repository initialized".to_string());
        } else {
            issues.push("✗ No git repository".to_string());
        }

        let issue_list = if issues.is_empty() {
            "None!".to_string()
        } else {
            bullets(&issues)
        };
        let recommendation = if issues.is_empty() {
            "Project looks healthy! Ready to work."
        } else {
            "Run `gsd_new_project` to initialize or check the project path."
        };
        Ok(CallToolResult::text(format!(
            "## GSD Health Check\n\n### Passed ({})\n{}\n\n### Issues ({})\n{}\n\n---\n\n**Recommendation:** {}",
            checks.len(),
            bullets(&checks),
            issues.len(),
            issue_list,
            recommendation
        )))
    })
}
