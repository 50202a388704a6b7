//! Workflow tools: transitions, comments, assignment and worklogs.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use super::common::{
    adf_paragraph, array_of, batch_summary, ensure_issue_key, get_or_null, is_issue_key,
    is_null_token,
};
use crate::domains::jira::JiraClient;
use crate::domains::tools::error::{ToolError, ToolResult};
use crate::domains::tools::registry::{ToolContext, ToolDefinition};
use crate::domains::tools::schema::{ParamKind, ParameterSpec};

/// Transitions currently available for an issue.
fn fetch_transitions(client: &JiraClient, key: &str) -> ToolResult<Vec<Value>> {
    let data = client.get(&format!("/rest/api/3/issue/{key}/transitions"))?;
    Ok(array_of(&data, "transitions").to_vec())
}

/// Find a transition by name (case-insensitive) or by id.
fn find_transition(transitions: &[Value], wanted: &str) -> Option<String> {
    transitions.iter().find_map(|t| {
        let name_matches = t
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|name| name.eq_ignore_ascii_case(wanted));
        let id = t.get("id").and_then(Value::as_str)?;
        (name_matches || id == wanted).then(|| id.to_string())
    })
}

fn transition_names(transitions: &[Value]) -> Vec<&str> {
    transitions
        .iter()
        .filter_map(|t| t.get("name").and_then(Value::as_str))
        .collect()
}

fn post_transition(client: &JiraClient, key: &str, transition_id: &str) -> ToolResult<()> {
    client.post(
        &format!("/rest/api/3/issue/{key}/transitions"),
        &json!({ "transition": { "id": transition_id } }),
    )?;
    Ok(())
}

// ============================================================================
// transition_issue
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TransitionIssueParams {
    pub key: String,
    pub transition: String,
}

pub struct TransitionIssueTool;

impl ToolDefinition for TransitionIssueTool {
    const NAME: &'static str = "transition_issue";
    const DESCRIPTION: &'static str =
        "Move an issue through its workflow. The transition is matched by name (case-insensitive) or id.";
    type Params = TransitionIssueParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("key", ParamKind::String, "Issue key"),
            ParameterSpec::required("transition", ParamKind::String, "Transition name or id"),
        ]
    }

    #[instrument(skip_all, fields(key = %params.key, transition = %params.transition))]
    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("key", &params.key)?;

        let transitions = fetch_transitions(&ctx.client, &params.key)?;
        let Some(transition_id) = find_transition(&transitions, &params.transition) else {
            return Err(ToolError::invalid(
                "transition",
                format!("one of {:?}", transition_names(&transitions)),
            ));
        };

        post_transition(&ctx.client, &params.key, &transition_id)?;
        info!("Transitioned {} via {}", params.key, transition_id);

        Ok(json!({
            "success": true,
            "message": format!("Issue {} transitioned to {}", params.key, params.transition),
        }))
    }
}

// ============================================================================
// get_transitions
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetTransitionsParams {
    pub key: String,
}

pub struct GetTransitionsTool;

impl ToolDefinition for GetTransitionsTool {
    const NAME: &'static str = "get_transitions";
    const DESCRIPTION: &'static str = "List the workflow transitions currently available for an issue.";
    type Params = GetTransitionsParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![ParameterSpec::required("key", ParamKind::String, "Issue key")]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("key", &params.key)?;

        let transitions: Vec<Value> = fetch_transitions(&ctx.client, &params.key)?
            .iter()
            .map(|t| {
                json!({
                    "id": get_or_null(t, "id"),
                    "name": get_or_null(t, "name"),
                    "to_status": t.get("to").map(|to| get_or_null(to, "name")).unwrap_or(Value::Null),
                })
            })
            .collect();

        Ok(json!({ "issue": params.key, "available_transitions": transitions }))
    }
}

// ============================================================================
// add_comment
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddCommentParams {
    pub key: String,
    pub comment: String,
}

pub struct AddCommentTool;

impl ToolDefinition for AddCommentTool {
    const NAME: &'static str = "add_comment";
    const DESCRIPTION: &'static str = "Add a plain-text comment to an issue.";
    type Params = AddCommentParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("key", ParamKind::String, "Issue key"),
            ParameterSpec::required("comment", ParamKind::String, "Comment text"),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("key", &params.key)?;

        let created = ctx.client.post(
            &format!("/rest/api/3/issue/{}/comment", params.key),
            &json!({ "body": adf_paragraph(&params.comment) }),
        )?;

        Ok(json!({
            "success": true,
            "message": format!("Comment added to {}", params.key),
            "comment_id": get_or_null(&created, "id"),
            "created": get_or_null(&created, "created"),
        }))
    }
}

// ============================================================================
// bulk_transition_issues
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BulkTransitionIssuesParams {
    pub keys: Vec<String>,
    pub transition: String,
}

pub struct BulkTransitionIssuesTool;

impl BulkTransitionIssuesTool {
    fn transition_one(client: &JiraClient, key: &str, transition: &str) -> Result<String, String> {
        if !is_issue_key(key) {
            return Err("Invalid key format".to_string());
        }
        let transitions = fetch_transitions(client, key).map_err(|e| {
            warn!("Cannot get transitions for {}: {}", key, e);
            "Cannot get transitions".to_string()
        })?;
        let transition_id = find_transition(&transitions, transition)
            .ok_or_else(|| format!("Transition '{transition}' not available"))?;
        post_transition(client, key, &transition_id).map_err(|e| e.wire_message())?;
        Ok(format!("Transitioned to {transition}"))
    }
}

impl ToolDefinition for BulkTransitionIssuesTool {
    const NAME: &'static str = "bulk_transition_issues";
    const DESCRIPTION: &'static str =
        "Apply the same transition to several issues. Each issue is reported separately.";
    type Params = BulkTransitionIssuesParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("keys", ParamKind::StringList, "Issue keys"),
            ParameterSpec::required("transition", ParamKind::String, "Transition name or id"),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        let results: Vec<Value> = params
            .keys
            .iter()
            .map(|key| match Self::transition_one(&ctx.client, key, &params.transition) {
                Ok(message) => json!({ "key": key, "status": "success", "message": message }),
                Err(message) => json!({ "key": key, "status": "error", "message": message }),
            })
            .collect();

        Ok(batch_summary(params.keys.len(), results))
    }
}

// ============================================================================
// assign_issue
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AssignIssueParams {
    pub key: String,
    pub assignee: String,
}

pub struct AssignIssueTool;

impl ToolDefinition for AssignIssueTool {
    const NAME: &'static str = "assign_issue";
    const DESCRIPTION: &'static str =
        "Assign an issue to a user found by name or email. Pass \"null\" or an empty string to unassign.";
    type Params = AssignIssueParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("key", ParamKind::String, "Issue key"),
            ParameterSpec::required("assignee", ParamKind::String, "User query, or \"null\" to unassign"),
        ]
    }

    #[instrument(skip_all, fields(key = %params.key))]
    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("key", &params.key)?;

        let unassign = is_null_token(&params.assignee);
        let body = if unassign {
            json!({ "accountId": null })
        } else {
            let query = [("query", params.assignee.clone())];
            match ctx.client.get_with("/rest/api/3/user/search", &query) {
                Ok(users) => {
                    let account_id = users
                        .as_array()
                        .and_then(|list| list.first())
                        .and_then(|user| user.get("accountId"))
                        .cloned()
                        .ok_or_else(|| ToolError::invalid("assignee", "name of an existing user"))?;
                    json!({ "accountId": account_id })
                }
                Err(e) => {
                    // Server/DC instances without user search accept names.
                    warn!("User search failed, assigning by name: {}", e);
                    json!({ "name": params.assignee })
                }
            }
        };

        ctx.client
            .put(&format!("/rest/api/3/issue/{}/assignee", params.key), &body)?;

        let action = if unassign {
            "unassigned".to_string()
        } else {
            format!("assigned to {}", params.assignee)
        };
        Ok(json!({
            "success": true,
            "message": format!("Issue {} {}", params.key, action),
        }))
    }
}

// ============================================================================
// add_worklog
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddWorklogParams {
    pub key: String,
    pub time_spent: String,
    #[serde(default)]
    pub comment: String,
}

pub struct AddWorklogTool;

impl ToolDefinition for AddWorklogTool {
    const NAME: &'static str = "add_worklog";
    const DESCRIPTION: &'static str = "Log time spent on an issue, e.g. \"2h 30m\".";
    type Params = AddWorklogParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("key", ParamKind::String, "Issue key"),
            ParameterSpec::required("time_spent", ParamKind::String, "Time in Jira notation, e.g. 1d 2h"),
            ParameterSpec::optional("comment", ParamKind::String, "Worklog comment").default_str(""),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("key", &params.key)?;

        let mut body = json!({ "timeSpent": params.time_spent });
        if !params.comment.is_empty() {
            body["comment"] = adf_paragraph(&params.comment);
        }

        let created = ctx
            .client
            .post(&format!("/rest/api/3/issue/{}/worklog", params.key), &body)?;

        Ok(json!({
            "success": true,
            "message": format!("Worklog added to {}", params.key),
            "time_spent": params.time_spent,
            "worklog_id": get_or_null(&created, "id"),
        }))
    }
}
