//! Issue relationship tools: links and subtasks.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::common::{
    adf_paragraph, array_of, assignee_name, ensure_issue_key, fields, get_or, get_or_null,
};
use crate::domains::tools::error::{ToolError, ToolResult};
use crate::domains::tools::registry::{ToolContext, ToolDefinition};
use crate::domains::tools::schema::{ParamKind, ParameterSpec};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct IssueKeyParams {
    pub key: String,
}

// ============================================================================
// get_issue_links
// ============================================================================

pub struct GetIssueLinksTool;

impl GetIssueLinksTool {
    fn reshape(link: &Value) -> Option<Value> {
        let (linked, direction) = if let Some(issue) = link.get("outwardIssue") {
            (issue, "outward")
        } else if let Some(issue) = link.get("inwardIssue") {
            (issue, "inward")
        } else {
            return None;
        };

        let link_type = link
            .get("type")
            .map(|t| get_or(t, "name", json!("Unknown")))
            .unwrap_or_else(|| json!("Unknown"));
        let linked_fields = fields(linked);
        let status = linked_fields
            .get("status")
            .map(|s| get_or(s, "name", json!("Unknown")))
            .unwrap_or_else(|| json!("Unknown"));

        Some(json!({
            "link_type": link_type,
            "direction": direction,
            "linked_issue_key": get_or_null(linked, "key"),
            "linked_issue_summary": get_or(linked_fields, "summary", json!("No summary")),
            "linked_issue_status": status,
        }))
    }
}

impl ToolDefinition for GetIssueLinksTool {
    const NAME: &'static str = "get_issue_links";
    const DESCRIPTION: &'static str = "List the issues linked to an issue, with link type and direction.";
    type Params = IssueKeyParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![ParameterSpec::required("key", ParamKind::String, "Issue key")]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("key", &params.key)?;

        let issue = ctx.client.get_with(
            &format!("/rest/api/3/issue/{}", params.key),
            &[("fields", "issuelinks".to_string())],
        )?;
        let links: Vec<Value> = array_of(fields(&issue), "issuelinks")
            .iter()
            .filter_map(Self::reshape)
            .collect();

        Ok(json!({
            "issue": params.key,
            "link_count": links.len(),
            "links": links,
        }))
    }
}

// ============================================================================
// get_subtasks
// ============================================================================

pub struct GetSubtasksTool;

impl ToolDefinition for GetSubtasksTool {
    const NAME: &'static str = "get_subtasks";
    const DESCRIPTION: &'static str = "List the subtasks of an issue.";
    type Params = IssueKeyParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![ParameterSpec::required("key", ParamKind::String, "Parent issue key")]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("key", &params.key)?;

        let issue = ctx.client.get_with(
            &format!("/rest/api/3/issue/{}", params.key),
            &[("fields", "subtasks".to_string())],
        )?;
        let subtasks: Vec<Value> = array_of(fields(&issue), "subtasks")
            .iter()
            .map(|subtask| {
                let f = fields(subtask);
                let status = f
                    .get("status")
                    .map(|s| get_or(s, "name", json!("Unknown")))
                    .unwrap_or_else(|| json!("Unknown"));
                json!({
                    "key": get_or_null(subtask, "key"),
                    "summary": get_or(f, "summary", json!("No summary")),
                    "status": status,
                    "assignee": assignee_name(f),
                })
            })
            .collect();

        Ok(json!({
            "parent_issue": params.key,
            "subtask_count": subtasks.len(),
            "subtasks": subtasks,
        }))
    }
}

// ============================================================================
// create_subtask
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateSubtaskParams {
    pub parent_key: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
}

pub struct CreateSubtaskTool;

impl ToolDefinition for CreateSubtaskTool {
    const NAME: &'static str = "create_subtask";
    const DESCRIPTION: &'static str = "Create a Sub-task under a parent issue, in the parent's project.";
    type Params = CreateSubtaskParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("parent_key", ParamKind::String, "Parent issue key"),
            ParameterSpec::required("summary", ParamKind::String, "Subtask summary"),
            ParameterSpec::optional("description", ParamKind::String, "Plain-text description")
                .default_str(""),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("parent_key", &params.parent_key)?;

        let parent = ctx.client.get_with(
            &format!("/rest/api/3/issue/{}", params.parent_key),
            &[("fields", "project".to_string())],
        )?;
        let project_key = fields(&parent)
            .get("project")
            .and_then(|p| p.get("key"))
            .cloned()
            .ok_or_else(|| ToolError::unknown("Parent issue has no project"))?;

        let mut subtask_fields = Map::new();
        subtask_fields.insert("project".into(), json!({ "key": project_key }));
        subtask_fields.insert("parent".into(), json!({ "key": params.parent_key }));
        subtask_fields.insert("summary".into(), json!(params.summary));
        subtask_fields.insert("issuetype".into(), json!({ "name": "Sub-task" }));
        if !params.description.is_empty() {
            subtask_fields.insert("description".into(), adf_paragraph(&params.description));
        }

        let created = ctx
            .client
            .post("/rest/api/3/issue", &json!({ "fields": subtask_fields }))?;

        Ok(json!({
            "success": true,
            "message": "Subtask created successfully",
            "subtask_key": get_or_null(&created, "key"),
            "parent_key": params.parent_key,
        }))
    }
}

// ============================================================================
// link_issues
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LinkIssuesParams {
    pub inward_key: String,
    pub outward_key: String,
    pub link_type: String,
}

pub struct LinkIssuesTool;

impl ToolDefinition for LinkIssuesTool {
    const NAME: &'static str = "link_issues";
    const DESCRIPTION: &'static str = "Link two issues with a link type such as \"Blocks\" or \"Relates\".";
    type Params = LinkIssuesParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("inward_key", ParamKind::String, "Inward issue key"),
            ParameterSpec::required("outward_key", ParamKind::String, "Outward issue key"),
            ParameterSpec::required("link_type", ParamKind::String, "Link type name"),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("inward_key", &params.inward_key)?;
        ensure_issue_key("outward_key", &params.outward_key)?;

        ctx.client.post(
            "/rest/api/3/issueLink",
            &json!({
                "type": { "name": params.link_type },
                "inwardIssue": { "key": params.inward_key },
                "outwardIssue": { "key": params.outward_key },
            }),
        )?;

        Ok(json!({
            "success": true,
            "message": format!(
                "Linked {} to {} with type {}",
                params.inward_key, params.outward_key, params.link_type
            ),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::testing::{call, context};
    use httpmock::prelude::*;

    #[test]
    fn test_get_issue_links_directions() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/rest/api/3/issue/KW-1")
                .query_param("fields", "issuelinks");
            then.status(200).json_body(json!({
                "fields": { "issuelinks": [
                    { "type": { "name": "Blocks" },
                      "outwardIssue": { "key": "KW-2", "fields": { "summary": "b", "status": { "name": "Done" } } } },
                    { "type": { "name": "Relates" }, "inwardIssue": { "key": "KW-3" } },
                    { "type": { "name": "Broken" } }
                ]}
            }));
        });

        let ctx = context(&server);
        let result = call::<GetIssueLinksTool>(&ctx, json!({ "key": "KW-1" })).unwrap();
        assert_eq!(result["link_count"], 2);
        assert_eq!(result["links"][0]["direction"], "outward");
        assert_eq!(result["links"][0]["linked_issue_status"], "Done");
        assert_eq!(result["links"][1]["direction"], "inward");
        assert_eq!(result["links"][1]["linked_issue_summary"], "No summary");
    }

    #[test]
    fn test_get_subtasks() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/rest/api/3/issue/KW-1")
                .query_param("fields", "subtasks");
            then.status(200).json_body(json!({
                "fields": { "subtasks": [
                    { "key": "KW-4", "fields": { "summary": "child", "status": { "name": "To Do" } } }
                ]}
            }));
        });

        let ctx = context(&server);
        let result = call::<GetSubtasksTool>(&ctx, json!({ "key": "KW-1" })).unwrap();
        assert_eq!(result["subtask_count"], 1);
        assert_eq!(result["subtasks"][0]["assignee"], "Unassigned");
    }

    #[test]
    fn test_create_subtask_uses_parent_project() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/rest/api/3/issue/KW-1")
                .query_param("fields", "project");
            then.status(200)
                .json_body(json!({ "fields": { "project": { "key": "KW" } } }));
        });
        let post = server.mock(|when, then| {
            when.method(POST).path("/rest/api/3/issue").json_body(json!({
                "fields": {
                    "project": { "key": "KW" },
                    "parent": { "key": "KW-1" },
                    "summary": "child",
                    "issuetype": { "name": "Sub-task" }
                }
            }));
            then.status(201).json_body(json!({ "key": "KW-9" }));
        });

        let ctx = context(&server);
        let result =
            call::<CreateSubtaskTool>(&ctx, json!({ "parent_key": "KW-1", "summary": "child" })).unwrap();
        post.assert();
        assert_eq!(result["subtask_key"], "KW-9");
    }

    #[test]
    fn test_link_issues_validates_both_keys() {
        let server = MockServer::start();
        let ctx = context(&server);
        let err = call::<LinkIssuesTool>(
            &ctx,
            json!({ "inward_key": "KW-1", "outward_key": "nope", "link_type": "Blocks" }),
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { ref parameter, .. } if parameter == "outward_key"));
    }

    #[test]
    fn test_link_issues() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST).path("/rest/api/3/issueLink").json_body(json!({
                "type": { "name": "Blocks" },
                "inwardIssue": { "key": "KW-1" },
                "outwardIssue": { "key": "KW-2" }
            }));
            then.status(201);
        });

        let ctx = context(&server);
        let result = call::<LinkIssuesTool>(
            &ctx,
            json!({ "inward_key": "KW-1", "outward_key": "KW-2", "link_type": "Blocks" }),
        )
        .unwrap();
        post.assert();
        assert_eq!(result["message"], "Linked KW-1 to KW-2 with type Blocks");
    }
}
