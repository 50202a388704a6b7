//! Core issue tools: reading, searching, creating and updating issues.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{info, instrument};

use super::common::{
    DESCRIPTION_PREVIEW_CHARS, adf_paragraph, array_of, as_slice, assignee_name, clamp_limit,
    default_limit, description_text, display_name_of, ensure_issue_key, ensure_project_key,
    fields, get_or_null, is_null_token, name_of, truncate,
};
use crate::domains::tools::error::{ToolError, ToolResult};
use crate::domains::tools::registry::{ToolContext, ToolDefinition};
use crate::domains::tools::schema::{ParamKind, ParameterSpec};

/// Parameters for tools that take none.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoParams {}

// ============================================================================
// get_user_stories
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetUserStoriesParams {
    /// Project key; empty for all projects.
    #[serde(default)]
    pub project: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub struct GetUserStoriesTool;

impl ToolDefinition for GetUserStoriesTool {
    const NAME: &'static str = "get_user_stories";
    const DESCRIPTION: &'static str = "Get user stories, newest first, optionally restricted to one project.";
    type Params = GetUserStoriesParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::optional("project", ParamKind::String, "Project key (empty for all projects)")
                .default_str(""),
            ParameterSpec::optional("limit", ParamKind::Integer, "Maximum number of stories (1-100)")
                .default_int(10),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        let jql = if params.project.is_empty() {
            "issuetype = Story ORDER BY created DESC".to_string()
        } else {
            ensure_project_key("project", &params.project)?;
            format!(
                "project = {} AND issuetype = Story ORDER BY created DESC",
                params.project
            )
        };

        let data = ctx.client.search(&jql, clamp_limit(params.limit), &[])?;
        let stories: Vec<Value> = array_of(&data, "issues")
            .iter()
            .map(|issue| {
                let f = fields(issue);
                json!({
                    "key": get_or_null(issue, "key"),
                    "summary": get_or_null(f, "summary"),
                    "status": name_of(f, "status"),
                    "description": description_text(f),
                })
            })
            .collect();

        Ok(json!({ "stories": stories }))
    }
}

// ============================================================================
// get_issue
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetIssueParams {
    pub key: String,
}

pub struct GetIssueTool;

impl ToolDefinition for GetIssueTool {
    const NAME: &'static str = "get_issue";
    const DESCRIPTION: &'static str = "Get a single issue by key (e.g. PROJ-123).";
    type Params = GetIssueParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![ParameterSpec::required("key", ParamKind::String, "Issue key, e.g. PROJ-123")]
    }

    #[instrument(skip_all, fields(key = %params.key))]
    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("key", &params.key)?;

        let issue = ctx.client.get(&format!("/rest/api/3/issue/{}", params.key))?;
        let f = fields(&issue);

        Ok(json!({
            "key": get_or_null(&issue, "key"),
            "summary": get_or_null(f, "summary"),
            "status": name_of(f, "status"),
            "assignee": assignee_name(f),
            "reporter": display_name_of(f, "reporter"),
            "priority": name_of(f, "priority"),
            "issuetype": name_of(f, "issuetype"),
            "created": get_or_null(f, "created"),
            "updated": get_or_null(f, "updated"),
            "description": description_text(f),
        }))
    }
}

// ============================================================================
// get_projects
// ============================================================================

pub struct GetProjectsTool;

impl ToolDefinition for GetProjectsTool {
    const NAME: &'static str = "get_projects";
    const DESCRIPTION: &'static str = "List all projects visible to the configured account.";
    type Params = NoParams;

    fn parameters() -> Vec<ParameterSpec> {
        Vec::new()
    }

    fn execute(_params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        let data = ctx.client.get("/rest/api/3/project")?;
        let projects: Vec<Value> = as_slice(&data)
            .iter()
            .map(|project| {
                json!({
                    "key": get_or_null(project, "key"),
                    "name": get_or_null(project, "name"),
                    "projectTypeKey": get_or_null(project, "projectTypeKey"),
                    "lead": display_name_of(project, "lead"),
                })
            })
            .collect();

        Ok(json!({ "projects": projects }))
    }
}

// ============================================================================
// search_issues
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchIssuesParams {
    pub jql: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub struct SearchIssuesTool;

impl ToolDefinition for SearchIssuesTool {
    const NAME: &'static str = "search_issues";
    const DESCRIPTION: &'static str = "Search issues with a JQL query.";
    type Params = SearchIssuesParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("jql", ParamKind::String, "JQL query"),
            ParameterSpec::optional("limit", ParamKind::Integer, "Maximum number of issues (1-100)")
                .default_int(10),
        ]
    }

    #[instrument(skip_all, fields(jql = %params.jql))]
    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        let data = ctx
            .client
            .search(&params.jql, clamp_limit(params.limit), &[])?;

        let issues: Vec<Value> = array_of(&data, "issues")
            .iter()
            .map(|issue| {
                let f = fields(issue);
                json!({
                    "key": get_or_null(issue, "key"),
                    "summary": get_or_null(f, "summary"),
                    "status": name_of(f, "status"),
                    "assignee": assignee_name(f),
                    "priority": name_of(f, "priority"),
                    "issuetype": name_of(f, "issuetype"),
                    "created": get_or_null(f, "created"),
                    "description": truncate(&description_text(f), DESCRIPTION_PREVIEW_CHARS),
                })
            })
            .collect();

        Ok(json!({
            "total": data.get("total").cloned().unwrap_or(json!(0)),
            "returned": issues.len(),
            "issues": issues,
        }))
    }
}

// ============================================================================
// get_project_stats
// ============================================================================

const STAT_STATUSES: [&str; 3] = ["To Do", "In Progress", "Done"];
const STAT_TYPES: [&str; 4] = ["Story", "Task", "Bug", "Sub-task"];

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetProjectStatsParams {
    pub project: String,
}

pub struct GetProjectStatsTool;

impl ToolDefinition for GetProjectStatsTool {
    const NAME: &'static str = "get_project_stats";
    const DESCRIPTION: &'static str = "Issue counts for a project: total, by status and by issue type.";
    type Params = GetProjectStatsParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![ParameterSpec::required("project", ParamKind::String, "Project key")]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_project_key("project", &params.project)?;
        let project = &params.project;

        let total = ctx.client.search_total(&format!("project = {project}"))?;

        // Individual breakdown queries may fail (e.g. unknown status names);
        // those buckets are left out.
        let mut by_status = Map::new();
        for status in STAT_STATUSES {
            if let Ok(count) = ctx
                .client
                .search_total(&format!("project = {project} AND status = '{status}'"))
            {
                by_status.insert(status.to_string(), json!(count));
            }
        }

        let mut by_type = Map::new();
        for issue_type in STAT_TYPES {
            if let Ok(count) = ctx
                .client
                .search_total(&format!("project = {project} AND issuetype = '{issue_type}'"))
            {
                by_type.insert(issue_type.to_string(), json!(count));
            }
        }

        Ok(json!({
            "project": project,
            "total_issues": total,
            "by_status": by_status,
            "by_type": by_type,
        }))
    }
}

// ============================================================================
// get_recent_issues
// ============================================================================

fn default_days() -> i64 {
    7
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetRecentIssuesParams {
    #[serde(default = "default_days")]
    pub days: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub struct GetRecentIssuesTool;

impl ToolDefinition for GetRecentIssuesTool {
    const NAME: &'static str = "get_recent_issues";
    const DESCRIPTION: &'static str = "Issues updated within the last N days, most recent first.";
    type Params = GetRecentIssuesParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::optional("days", ParamKind::Integer, "Look-back window in days (1-365)")
                .default_int(7),
            ParameterSpec::optional("limit", ParamKind::Integer, "Maximum number of issues (1-100)")
                .default_int(10),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        if !(1..=365).contains(&params.days) {
            return Err(ToolError::invalid("days", "integer between 1 and 365"));
        }

        let jql = format!("updated >= -{}d ORDER BY updated DESC", params.days);
        let data = ctx.client.search(&jql, clamp_limit(params.limit), &[])?;

        let issues: Vec<Value> = array_of(&data, "issues")
            .iter()
            .map(|issue| {
                let f = fields(issue);
                json!({
                    "key": get_or_null(issue, "key"),
                    "summary": get_or_null(f, "summary"),
                    "status": name_of(f, "status"),
                    "assignee": assignee_name(f),
                    "updated": get_or_null(f, "updated"),
                    "issuetype": name_of(f, "issuetype"),
                })
            })
            .collect();

        Ok(json!({
            "days_back": params.days,
            "total_found": get_or_null(&data, "total"),
            "returned": issues.len(),
            "issues": issues,
        }))
    }
}

// ============================================================================
// get_issues_by_assignee
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetIssuesByAssigneeParams {
    pub assignee: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub struct GetIssuesByAssigneeTool;

impl ToolDefinition for GetIssuesByAssigneeTool {
    const NAME: &'static str = "get_issues_by_assignee";
    const DESCRIPTION: &'static str = "Issues assigned to a user, most recently updated first.";
    type Params = GetIssuesByAssigneeParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required(
                "assignee",
                ParamKind::String,
                "Assignee as understood by JQL (account id, name or currentUser())",
            ),
            ParameterSpec::optional("limit", ParamKind::Integer, "Maximum number of issues (1-100)")
                .default_int(10),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        let jql = format!("assignee = {} ORDER BY updated DESC", params.assignee);
        let data = ctx.client.search(&jql, clamp_limit(params.limit), &[])?;

        let issues: Vec<Value> = array_of(&data, "issues")
            .iter()
            .map(|issue| {
                let f = fields(issue);
                json!({
                    "key": get_or_null(issue, "key"),
                    "summary": get_or_null(f, "summary"),
                    "status": name_of(f, "status"),
                    "priority": name_of(f, "priority"),
                    "issuetype": name_of(f, "issuetype"),
                    "updated": get_or_null(f, "updated"),
                })
            })
            .collect();

        Ok(json!({
            "assignee": params.assignee,
            "total_found": get_or_null(&data, "total"),
            "returned": issues.len(),
            "issues": issues,
        }))
    }
}

// ============================================================================
// create_issue
// ============================================================================

fn default_issue_type() -> String {
    "Task".to_string()
}

fn default_priority() -> String {
    "Medium".to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateIssueParams {
    pub project: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_issue_type")]
    pub issue_type: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    pub assignee: Option<String>,
}

pub struct CreateIssueTool;

impl ToolDefinition for CreateIssueTool {
    const NAME: &'static str = "create_issue";
    const DESCRIPTION: &'static str = "Create a new issue in a project.";
    type Params = CreateIssueParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("project", ParamKind::String, "Project key"),
            ParameterSpec::required("summary", ParamKind::String, "Issue summary"),
            ParameterSpec::optional("description", ParamKind::String, "Plain-text description")
                .default_str(""),
            ParameterSpec::optional("issue_type", ParamKind::String, "Issue type name")
                .default_str("Task"),
            ParameterSpec::optional("priority", ParamKind::String, "Priority name")
                .default_str("Medium"),
            ParameterSpec::optional("assignee", ParamKind::String, "Assignee user name"),
        ]
    }

    #[instrument(skip_all, fields(project = %params.project))]
    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_project_key("project", &params.project)?;

        let mut issue_fields = Map::new();
        issue_fields.insert("project".into(), json!({ "key": params.project }));
        issue_fields.insert("summary".into(), json!(params.summary));
        issue_fields.insert("issuetype".into(), json!({ "name": params.issue_type }));
        if !params.description.is_empty() {
            issue_fields.insert("description".into(), adf_paragraph(&params.description));
        }
        if !params.priority.is_empty() {
            issue_fields.insert("priority".into(), json!({ "name": params.priority }));
        }
        if let Some(assignee) = params.assignee.filter(|a| !a.is_empty()) {
            issue_fields.insert("assignee".into(), json!({ "name": assignee }));
        }

        let created = ctx
            .client
            .post("/rest/api/3/issue", &json!({ "fields": issue_fields }))?;
        info!("Created issue {}", get_or_null(&created, "key"));

        Ok(json!({
            "success": true,
            "message": "Issue created successfully",
            "key": get_or_null(&created, "key"),
            "id": get_or_null(&created, "id"),
        }))
    }
}

// ============================================================================
// update_issue
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateIssueParams {
    pub key: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
}

pub struct UpdateIssueTool;

impl ToolDefinition for UpdateIssueTool {
    const NAME: &'static str = "update_issue";
    const DESCRIPTION: &'static str = "Update fields of an existing issue. Pass assignee \"null\" to unassign.";
    type Params = UpdateIssueParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("key", ParamKind::String, "Issue key"),
            ParameterSpec::optional("summary", ParamKind::String, "New summary"),
            ParameterSpec::optional("description", ParamKind::String, "New plain-text description"),
            ParameterSpec::optional("priority", ParamKind::String, "New priority name"),
            ParameterSpec::optional("assignee", ParamKind::String, "New assignee, or \"null\" to unassign"),
        ]
    }

    #[instrument(skip_all, fields(key = %params.key))]
    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("key", &params.key)?;

        let mut updates = Map::new();
        let mut updated_fields = Vec::new();

        if let Some(summary) = params.summary.filter(|s| !s.is_empty()) {
            updates.insert("summary".into(), json!(summary));
            updated_fields.push("summary");
        }
        if let Some(description) = params.description.filter(|s| !s.is_empty()) {
            updates.insert("description".into(), adf_paragraph(&description));
            updated_fields.push("description");
        }
        if let Some(priority) = params.priority.filter(|s| !s.is_empty()) {
            updates.insert("priority".into(), json!({ "name": priority }));
            updated_fields.push("priority");
        }
        if let Some(assignee) = params.assignee.filter(|s| !s.is_empty()) {
            let value = if is_null_token(&assignee) {
                Value::Null
            } else {
                json!({ "name": assignee })
            };
            updates.insert("assignee".into(), value);
            updated_fields.push("assignee");
        }

        if updates.is_empty() {
            return Err(ToolError::invalid(
                "summary",
                "at least one of summary, description, priority, assignee",
            ));
        }

        ctx.client.put(
            &format!("/rest/api/3/issue/{}", params.key),
            &json!({ "fields": updates }),
        )?;

        Ok(json!({
            "success": true,
            "message": format!("Issue {} updated successfully", params.key),
            "updated_fields": updated_fields,
        }))
    }
}

// ============================================================================
// advanced_jql_search
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AdvancedJqlSearchParams {
    pub jql: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub expand: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub struct AdvancedJqlSearchTool;

impl ToolDefinition for AdvancedJqlSearchTool {
    const NAME: &'static str = "advanced_jql_search";
    const DESCRIPTION: &'static str =
        "JQL search returning raw issues, with an explicit field list and expand options.";
    type Params = AdvancedJqlSearchParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("jql", ParamKind::String, "JQL query"),
            ParameterSpec::optional("fields", ParamKind::StringList, "Fields to return (empty for all)")
                .default_empty_list(),
            ParameterSpec::optional("expand", ParamKind::StringList, "Entities to expand, e.g. changelog")
                .default_empty_list(),
            ParameterSpec::optional("limit", ParamKind::Integer, "Maximum number of issues (1-100)")
                .default_int(10),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        let mut extra = Vec::new();
        if !params.fields.is_empty() {
            extra.push(("fields", params.fields.join(",")));
        }
        if !params.expand.is_empty() {
            extra.push(("expand", params.expand.join(",")));
        }

        let data = ctx
            .client
            .search(&params.jql, clamp_limit(params.limit), &extra)?;
        let issues = array_of(&data, "issues");

        Ok(json!({
            "jql": params.jql,
            "total": get_or_null(&data, "total"),
            "returned": issues.len(),
            "fields_requested": if params.fields.is_empty() { json!("all") } else { json!(params.fields) },
            "expand_requested": if params.expand.is_empty() { json!("none") } else { json!(params.expand) },
            "issues": issues,
        }))
    }
}
