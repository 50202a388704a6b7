//! Agile tools: boards, sprints and burndown.
//!
//! These use the Jira Software API under `/rest/agile/1.0`.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::common::{
    STORY_POINTS_FIELD, array_of, assignee_name, ensure_numeric_id, fields, get_or, get_or_null,
    is_issue_key, name_of, round2,
};
use super::core::NoParams;
use crate::domains::tools::error::{ToolError, ToolResult};
use crate::domains::tools::registry::{ToolContext, ToolDefinition};
use crate::domains::tools::schema::{ParamKind, ParameterSpec};

/// Parameters for tools that take a single sprint id.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SprintParams {
    pub sprint_id: String,
}

fn sprint_parameter() -> Vec<ParameterSpec> {
    vec![ParameterSpec::required("sprint_id", ParamKind::String, "Sprint id")]
}

// ============================================================================
// get_boards
// ============================================================================

pub struct GetBoardsTool;

impl ToolDefinition for GetBoardsTool {
    const NAME: &'static str = "get_boards";
    const DESCRIPTION: &'static str = "List agile (Scrum and Kanban) boards.";
    type Params = NoParams;

    fn parameters() -> Vec<ParameterSpec> {
        Vec::new()
    }

    fn execute(_params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        let data = ctx.client.get("/rest/agile/1.0/board")?;
        let boards: Vec<Value> = array_of(&data, "values")
            .iter()
            .map(|b| {
                let location = b
                    .get("location")
                    .map(|l| get_or(l, "name", json!("Unknown")))
                    .unwrap_or_else(|| json!("Unknown"));
                json!({
                    "id": get_or_null(b, "id"),
                    "name": get_or_null(b, "name"),
                    "type": get_or_null(b, "type"),
                    "location": location,
                })
            })
            .collect();

        Ok(json!({
            "total": get_or(&data, "total", json!(boards.len())),
            "boards": boards,
        }))
    }
}

// ============================================================================
// get_sprints
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetSprintsParams {
    pub board_id: String,
}

pub struct GetSprintsTool;

impl ToolDefinition for GetSprintsTool {
    const NAME: &'static str = "get_sprints";
    const DESCRIPTION: &'static str =
        "List the sprints of a board. An unknown board yields an empty list with an error note.";
    type Params = GetSprintsParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![ParameterSpec::required("board_id", ParamKind::String, "Board id")]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_numeric_id("board_id", &params.board_id)?;

        let data = match ctx
            .client
            .get(&format!("/rest/agile/1.0/board/{}/sprint", params.board_id))
        {
            Ok(data) => data,
            Err(e) if e.is_not_found() => {
                return Ok(json!({
                    "board_id": params.board_id,
                    "sprint_count": 0,
                    "sprints": [],
                    "error": format!("Board {} not found or not accessible", params.board_id),
                }));
            }
            Err(e) => return Err(e.into()),
        };

        let sprints: Vec<Value> = array_of(&data, "values")
            .iter()
            .map(|s| {
                json!({
                    "id": get_or_null(s, "id"),
                    "name": get_or_null(s, "name"),
                    "state": get_or_null(s, "state"),
                    "startDate": get_or(s, "startDate", json!("Not set")),
                    "endDate": get_or(s, "endDate", json!("Not set")),
                    "goal": get_or(s, "goal", json!("")),
                })
            })
            .collect();

        Ok(json!({
            "board_id": params.board_id,
            "sprint_count": sprints.len(),
            "sprints": sprints,
        }))
    }
}

// ============================================================================
// get_sprint_issues
// ============================================================================

pub struct GetSprintIssuesTool;

impl ToolDefinition for GetSprintIssuesTool {
    const NAME: &'static str = "get_sprint_issues";
    const DESCRIPTION: &'static str =
        "List the issues in a sprint with story points. An unknown sprint yields an empty list with an error note.";
    type Params = SprintParams;

    fn parameters() -> Vec<ParameterSpec> {
        sprint_parameter()
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_numeric_id("sprint_id", &params.sprint_id)?;

        let data = match ctx
            .client
            .get(&format!("/rest/agile/1.0/sprint/{}/issue", params.sprint_id))
        {
            Ok(data) => data,
            Err(e) if e.is_not_found() => {
                return Ok(json!({
                    "sprint_id": params.sprint_id,
                    "issue_count": 0,
                    "issues": [],
                    "error": format!("Sprint {} not found or not accessible", params.sprint_id),
                }));
            }
            Err(e) => return Err(e.into()),
        };

        let issues: Vec<Value> = array_of(&data, "issues")
            .iter()
            .map(|issue| {
                let f = fields(issue);
                json!({
                    "key": get_or_null(issue, "key"),
                    "summary": get_or_null(f, "summary"),
                    "status": name_of(f, "status"),
                    "assignee": assignee_name(f),
                    "storyPoints": get_or_null(f, STORY_POINTS_FIELD),
                    "issuetype": name_of(f, "issuetype"),
                })
            })
            .collect();

        Ok(json!({
            "sprint_id": params.sprint_id,
            "issue_count": issues.len(),
            "issues": issues,
        }))
    }
}

// ============================================================================
// add_to_sprint
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddToSprintParams {
    pub sprint_id: String,
    pub keys: Vec<String>,
}

pub struct AddToSprintTool;

impl ToolDefinition for AddToSprintTool {
    const NAME: &'static str = "add_to_sprint";
    const DESCRIPTION: &'static str = "Move issues into a sprint.";
    type Params = AddToSprintParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("sprint_id", ParamKind::String, "Sprint id"),
            ParameterSpec::required("keys", ParamKind::StringList, "Issue keys to add"),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_numeric_id("sprint_id", &params.sprint_id)?;
        if params.keys.is_empty() || !params.keys.iter().all(|k| is_issue_key(k)) {
            return Err(ToolError::invalid("keys", "non-empty list of issue keys"));
        }

        ctx.client.post(
            &format!("/rest/agile/1.0/sprint/{}/issue", params.sprint_id),
            &json!({ "issues": params.keys }),
        )?;
        info!("Added {} issues to sprint {}", params.keys.len(), params.sprint_id);

        Ok(json!({
            "success": true,
            "message": format!("Added {} issues to sprint {}", params.keys.len(), params.sprint_id),
            "sprint_id": params.sprint_id,
            "added_issues": params.keys,
        }))
    }
}

// ============================================================================
// get_burndown_data
// ============================================================================

/// Story points split by status category.
#[derive(Debug, Default, PartialEq)]
struct PointTotals {
    total: f64,
    completed: f64,
    in_progress: f64,
    todo: f64,
}

impl PointTotals {
    fn add(&mut self, status: &str, points: f64) {
        self.total += points;
        match status.to_lowercase().as_str() {
            "done" | "closed" | "resolved" => self.completed += points,
            "in progress" | "in review" => self.in_progress += points,
            _ => self.todo += points,
        }
    }

    fn completion_percentage(&self) -> f64 {
        if self.total > 0.0 {
            round2(self.completed / self.total * 100.0)
        } else {
            0.0
        }
    }
}

pub struct GetBurndownDataTool;

impl ToolDefinition for GetBurndownDataTool {
    const NAME: &'static str = "get_burndown_data";
    const DESCRIPTION: &'static str =
        "Story point totals for a sprint: completed, in progress, to do and completion percentage.";
    type Params = SprintParams;

    fn parameters() -> Vec<ParameterSpec> {
        sprint_parameter()
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_numeric_id("sprint_id", &params.sprint_id)?;

        let sprint = ctx
            .client
            .get(&format!("/rest/agile/1.0/sprint/{}", params.sprint_id))?;
        let issues = ctx.client.get_with(
            &format!("/rest/agile/1.0/sprint/{}/issue", params.sprint_id),
            &[("fields", format!("summary,status,{STORY_POINTS_FIELD}"))],
        )?;

        let mut totals = PointTotals::default();
        for issue in array_of(&issues, "issues") {
            let f = fields(issue);
            let points = f.get(STORY_POINTS_FIELD).and_then(Value::as_f64).unwrap_or(0.0);
            let status = f
                .get("status")
                .and_then(|s| s.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("");
            totals.add(status, points);
        }

        Ok(json!({
            "sprint_id": params.sprint_id,
            "sprint_name": get_or_null(&sprint, "name"),
            "sprint_state": get_or_null(&sprint, "state"),
            "total_story_points": totals.total,
            "completed_points": totals.completed,
            "in_progress_points": totals.in_progress,
            "todo_points": totals.todo,
            "completion_percentage": totals.completion_percentage(),
        }))
    }
}
