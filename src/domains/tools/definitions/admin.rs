//! Administration tools: versions, permissions, workflows and instance statistics.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::common::{
    array_of, as_slice, ensure_numeric_id, ensure_project_key, get_or, get_or_null, round2,
};
use super::core::NoParams;
use crate::domains::jira::{JiraClient, JiraResult};
use crate::domains::tools::error::{ToolError, ToolResult};
use crate::domains::tools::registry::{ToolContext, ToolDefinition};
use crate::domains::tools::schema::{ParamKind, ParameterSpec};

// ============================================================================
// create_version
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateVersionParams {
    pub project: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub struct CreateVersionTool;

impl ToolDefinition for CreateVersionTool {
    const NAME: &'static str = "create_version";
    const DESCRIPTION: &'static str = "Create an unreleased version in a project.";
    type Params = CreateVersionParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("project", ParamKind::String, "Project key"),
            ParameterSpec::required("name", ParamKind::String, "Version name"),
            ParameterSpec::optional("description", ParamKind::String, "Version description")
                .default_str(""),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_project_key("project", &params.project)?;

        let created = ctx.client.post(
            "/rest/api/3/version",
            &json!({
                "name": params.name,
                "description": params.description,
                "project": params.project,
                "released": false,
            }),
        )?;

        Ok(json!({
            "success": true,
            "message": format!("Version {} created for project {}", params.name, params.project),
            "version_id": get_or_null(&created, "id"),
            "name": params.name,
        }))
    }
}

// ============================================================================
// release_version
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReleaseVersionParams {
    pub version_id: String,
    pub release_date: Option<String>,
}

pub struct ReleaseVersionTool;

impl ToolDefinition for ReleaseVersionTool {
    const NAME: &'static str = "release_version";
    const DESCRIPTION: &'static str =
        "Mark a version as released, on the given date (YYYY-MM-DD) or today.";
    type Params = ReleaseVersionParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("version_id", ParamKind::String, "Numeric version id"),
            ParameterSpec::optional("release_date", ParamKind::String, "Release date, YYYY-MM-DD"),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_numeric_id("version_id", &params.version_id)?;

        let release_date = match params.release_date.filter(|d| !d.is_empty()) {
            Some(date) => {
                chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .map_err(|_| ToolError::invalid("release_date", "date as YYYY-MM-DD"))?;
                date
            }
            None => chrono::Local::now().format("%Y-%m-%d").to_string(),
        };

        ctx.client.put(
            &format!("/rest/api/3/version/{}", params.version_id),
            &json!({ "released": true, "releaseDate": release_date }),
        )?;

        Ok(json!({
            "success": true,
            "message": format!("Version {} marked as released", params.version_id),
            "release_date": release_date,
        }))
    }
}

// ============================================================================
// get_user_permissions
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UserPermissionsParams {
    pub project: String,
    pub username: String,
}

pub struct GetUserPermissionsTool;

impl ToolDefinition for GetUserPermissionsTool {
    const NAME: &'static str = "get_user_permissions";
    const DESCRIPTION: &'static str = "List the permissions a user holds in a project.";
    type Params = UserPermissionsParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("project", ParamKind::String, "Project key"),
            ParameterSpec::required("username", ParamKind::String, "User name or account id"),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_project_key("project", &params.project)?;

        let data = ctx.client.get_with(
            "/rest/api/3/mypermissions",
            &[
                ("projectKey", params.project.clone()),
                ("username", params.username.clone()),
            ],
        )?;

        let empty = Map::new();
        let permissions: Vec<Value> = data
            .get("permissions")
            .and_then(Value::as_object)
            .unwrap_or(&empty)
            .iter()
            .map(|(key, p)| {
                json!({
                    "key": key,
                    "name": get_or_null(p, "name"),
                    "type": get_or_null(p, "type"),
                    "description": get_or(p, "description", json!("")),
                    "havePermission": get_or(p, "havePermission", json!(false)),
                })
            })
            .collect();

        Ok(json!({
            "project": params.project,
            "username": params.username,
            "permission_count": permissions.len(),
            "permissions": permissions,
        }))
    }
}

// ============================================================================
// get_workflows
// ============================================================================

pub struct GetWorkflowsTool;

impl ToolDefinition for GetWorkflowsTool {
    const NAME: &'static str = "get_workflows";
    const DESCRIPTION: &'static str = "List the workflows defined on the instance.";
    type Params = NoParams;

    fn parameters() -> Vec<ParameterSpec> {
        Vec::new()
    }

    fn execute(_params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        let data = ctx.client.get("/rest/api/3/workflow")?;
        let workflows: Vec<Value> = as_slice(&data)
            .iter()
            .map(|w| {
                json!({
                    "id": get_or_null(w, "id"),
                    "name": get_or_null(w, "name"),
                    "description": get_or(w, "description", json!("")),
                    "isActive": get_or(w, "isActive", json!(false)),
                    "isDraft": get_or(w, "isDraft", json!(false)),
                })
            })
            .collect();

        Ok(json!({
            "workflow_count": workflows.len(),
            "workflows": workflows,
        }))
    }
}

// ============================================================================
// get_jira_statistics
// ============================================================================

const METRIC_ERROR: &str = "Error: Unable to fetch";
const BREAKDOWN_ERROR: &str = "Error";
const STAT_ISSUE_TYPES: [&str; 5] = ["Story", "Task", "Bug", "Sub-task", "Epic"];
const STAT_STATUSES: [&str; 5] = ["To Do", "In Progress", "Done", "Open", "Closed"];

pub struct GetJiraStatisticsTool;

impl GetJiraStatisticsTool {
    /// A metric value, or the error marker when the request failed.
    fn metric(name: &str, result: JiraResult<Value>, marker: &str) -> Value {
        result.unwrap_or_else(|e| {
            warn!("Statistic {} unavailable: {}", name, e);
            json!(marker)
        })
    }

    fn count_array(client: &JiraClient, path: &str, query: &[(&str, String)]) -> JiraResult<Value> {
        let data = client.get_with(path, query)?;
        Ok(json!(as_slice(&data).len()))
    }

    fn total_boards(client: &JiraClient) -> JiraResult<Value> {
        let data = client.get("/rest/agile/1.0/board")?;
        Ok(data
            .get("total")
            .filter(|t| t.is_u64())
            .cloned()
            .unwrap_or_else(|| json!(array_of(&data, "values").len())))
    }

    fn breakdown(client: &JiraClient, field: &str, values: &[&str]) -> Value {
        let mut counts = Map::new();
        for value in values {
            let label = value.to_lowercase().replace(' ', "_");
            let total = client
                .search_total(&format!("{field} = '{value}'"))
                .map(Value::from);
            counts.insert(label, Self::metric(value, total, BREAKDOWN_ERROR));
        }
        Value::Object(counts)
    }
}

impl ToolDefinition for GetJiraStatisticsTool {
    const NAME: &'static str = "get_jira_statistics";
    const DESCRIPTION: &'static str =
        "Collect instance-wide counts: projects, issues, users, boards, fields, workflows and issue breakdowns. Metrics that cannot be fetched are reported as errors.";
    type Params = NoParams;

    fn parameters() -> Vec<ParameterSpec> {
        Vec::new()
    }

    fn execute(_params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        let client = &ctx.client;
        let mut stats = Map::new();
        stats.insert("instance_url".into(), json!(client.base_url()));
        stats.insert(
            "collected_at".into(),
            json!(chrono::Local::now().to_rfc3339()),
        );

        let projects = Self::metric(
            "total_projects",
            Self::count_array(client, "/rest/api/3/project", &[]),
            METRIC_ERROR,
        );
        let issues = Self::metric(
            "total_issues",
            client.search_total("order by created DESC").map(Value::from),
            METRIC_ERROR,
        );

        stats.insert("total_projects".into(), projects.clone());
        stats.insert("total_issues".into(), issues.clone());
        stats.insert(
            "total_users".into(),
            Self::metric(
                "total_users",
                Self::count_array(
                    client,
                    "/rest/api/3/users/search",
                    &[("maxResults", "1000".to_string())],
                ),
                METRIC_ERROR,
            ),
        );
        stats.insert(
            "total_boards".into(),
            Self::metric("total_boards", Self::total_boards(client), METRIC_ERROR),
        );

        match client.get("/rest/api/3/field") {
            Ok(fields) => {
                let all = as_slice(&fields);
                let custom = all
                    .iter()
                    .filter(|f| f.get("custom").and_then(Value::as_bool).unwrap_or(false))
                    .count();
                stats.insert("total_custom_fields".into(), json!(custom));
                stats.insert("total_system_fields".into(), json!(all.len() - custom));
            }
            Err(e) => {
                warn!("Statistic fields unavailable: {}", e);
                stats.insert("total_custom_fields".into(), json!(METRIC_ERROR));
                stats.insert("total_system_fields".into(), json!(METRIC_ERROR));
            }
        }

        stats.insert(
            "total_workflows".into(),
            Self::metric(
                "total_workflows",
                Self::count_array(client, "/rest/api/3/workflow", &[]),
                METRIC_ERROR,
            ),
        );
        stats.insert(
            "issues_by_type".into(),
            Self::breakdown(client, "issuetype", &STAT_ISSUE_TYPES),
        );
        stats.insert(
            "issues_by_status".into(),
            Self::breakdown(client, "status", &STAT_STATUSES),
        );

        if let (Some(issues), Some(projects)) = (issues.as_u64(), projects.as_u64()) {
            let average = if projects > 0 {
                round2(issues as f64 / projects as f64)
            } else {
                0.0
            };
            stats.insert("avg_issues_per_project".into(), json!(average));
        }

        debug!("Collected {} statistics", stats.len());
        Ok(Value::Object(stats))
    }
}
