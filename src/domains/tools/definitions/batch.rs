//! Batch tools: bulk update and clone.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::info;

use super::common::{
    batch_summary, ensure_issue_key, fields, get_or_null, is_issue_key, is_null_token,
};
use crate::domains::tools::error::{ToolError, ToolResult};
use crate::domains::tools::registry::{ToolContext, ToolDefinition};
use crate::domains::tools::schema::{ParamKind, ParameterSpec};

// ============================================================================
// bulk_update_issues
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BulkUpdateIssuesParams {
    pub keys: Vec<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub summary: Option<String>,
}

impl BulkUpdateIssuesParams {
    /// The `fields` object applied to every issue.
    fn update_fields(&self) -> Map<String, Value> {
        let mut updates = Map::new();
        if let Some(priority) = self.priority.as_deref().filter(|p| !p.is_empty()) {
            updates.insert("priority".into(), json!({ "name": priority }));
        }
        if let Some(assignee) = self.assignee.as_deref() {
            let value = if is_null_token(assignee) {
                Value::Null
            } else {
                json!({ "name": assignee })
            };
            updates.insert("assignee".into(), value);
        }
        if let Some(summary) = self.summary.as_deref().filter(|s| !s.is_empty()) {
            updates.insert("summary".into(), json!(summary));
        }
        updates
    }
}

pub struct BulkUpdateIssuesTool;

impl ToolDefinition for BulkUpdateIssuesTool {
    const NAME: &'static str = "bulk_update_issues";
    const DESCRIPTION: &'static str =
        "Apply the same priority, assignee and/or summary to several issues. Each issue is reported separately.";
    type Params = BulkUpdateIssuesParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("keys", ParamKind::StringList, "Issue keys"),
            ParameterSpec::optional("priority", ParamKind::String, "New priority name"),
            ParameterSpec::optional("assignee", ParamKind::String, "New assignee, or \"null\" to unassign"),
            ParameterSpec::optional("summary", ParamKind::String, "New summary"),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        let updates = params.update_fields();
        if updates.is_empty() {
            return Err(ToolError::invalid(
                "priority",
                "at least one of priority, assignee, summary",
            ));
        }
        let body = json!({ "fields": updates });

        let results: Vec<Value> = params
            .keys
            .iter()
            .map(|key| {
                if !is_issue_key(key) {
                    return json!({ "key": key, "status": "error", "message": "Invalid key format" });
                }
                match ctx.client.put(&format!("/rest/api/3/issue/{key}"), &body) {
                    Ok(_) => json!({ "key": key, "status": "success", "message": "Updated successfully" }),
                    Err(e) => {
                        let err = ToolError::from(e);
                        json!({ "key": key, "status": "error", "message": err.wire_message() })
                    }
                }
            })
            .collect();

        Ok(batch_summary(params.keys.len(), results))
    }
}

// ============================================================================
// clone_issue
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CloneIssueParams {
    pub key: String,
    pub summary: String,
}

pub struct CloneIssueTool;

impl ToolDefinition for CloneIssueTool {
    const NAME: &'static str = "clone_issue";
    const DESCRIPTION: &'static str =
        "Create a copy of an issue (project, type, description, priority) with a new summary.";
    type Params = CloneIssueParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("key", ParamKind::String, "Issue key to clone"),
            ParameterSpec::required("summary", ParamKind::String, "Summary of the new issue"),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("key", &params.key)?;

        let source = ctx.client.get(&format!("/rest/api/3/issue/{}", params.key))?;
        let source_fields = fields(&source);

        let mut clone_fields = Map::new();
        clone_fields.insert("project".into(), get_or_null(source_fields, "project"));
        clone_fields.insert("summary".into(), json!(params.summary));
        clone_fields.insert("issuetype".into(), get_or_null(source_fields, "issuetype"));
        clone_fields.insert("description".into(), get_or_null(source_fields, "description"));
        if let Some(priority) = source_fields.get("priority").filter(|p| !p.is_null()) {
            clone_fields.insert("priority".into(), priority.clone());
        }

        let created = ctx
            .client
            .post("/rest/api/3/issue", &json!({ "fields": clone_fields }))?;
        info!("Cloned {} as {}", params.key, get_or_null(&created, "key"));

        Ok(json!({
            "success": true,
            "message": "Issue cloned successfully",
            "source_key": params.key,
            "cloned_key": get_or_null(&created, "key"),
            "cloned_id": get_or_null(&created, "id"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::testing::{call, context};
    use httpmock::prelude::*;

    #[test]
    fn test_bulk_update_per_key_results() {
        let server = MockServer::start();
        let ok = server.mock(|when, then| {
            when.method(PUT)
                .path("/rest/api/3/issue/KW-1")
                .json_body(json!({ "fields": { "priority": { "name": "High" }, "assignee": null } }));
            then.status(204);
        });
        server.mock(|when, then| {
            when.method(PUT).path("/rest/api/3/issue/KW-2");
            then.status(403)
                .json_body(json!({ "errorMessages": ["You do not have permission"] }));
        });

        let ctx = context(&server);
        let result = call::<BulkUpdateIssuesTool>(
            &ctx,
            json!({ "keys": ["KW-1", "KW-2", "x"], "priority": "High", "assignee": "null" }),
        )
        .unwrap();

        ok.assert();
        assert_eq!(result["successful"], 1);
        assert_eq!(result["failed"], 2);
        assert_eq!(result["results"][1]["message"], "You do not have permission");
        assert_eq!(result["results"][2]["message"], "Invalid key format");
    }

    #[test]
    fn test_bulk_update_needs_a_field() {
        let server = MockServer::start();
        let ctx = context(&server);
        let err = call::<BulkUpdateIssuesTool>(&ctx, json!({ "keys": ["KW-1"] })).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { .. }));
    }

    #[test]
    fn test_clone_issue_copies_fields() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/issue/KW-1");
            then.status(200).json_body(json!({
                "key": "KW-1",
                "fields": {
                    "project": { "key": "KW" },
                    "issuetype": { "name": "Bug" },
                    "description": null,
                    "priority": { "name": "High" },
                    "summary": "Original"
                }
            }));
        });
        let post = server.mock(|when, then| {
            when.method(POST).path("/rest/api/3/issue").json_body(json!({
                "fields": {
                    "project": { "key": "KW" },
                    "summary": "Copy",
                    "issuetype": { "name": "Bug" },
                    "description": null,
                    "priority": { "name": "High" }
                }
            }));
            then.status(201).json_body(json!({ "id": "2", "key": "KW-2" }));
        });

        let ctx = context(&server);
        let result = call::<CloneIssueTool>(&ctx, json!({ "key": "KW-1", "summary": "Copy" })).unwrap();
        post.assert();
        assert_eq!(result["cloned_key"], "KW-2");
        assert_eq!(result["source_key"], "KW-1");
    }
}
