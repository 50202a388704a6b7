//! Project and user metadata tools.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

use super::common::{array_of, as_slice, ensure_project_key, get_or, get_or_null};
use super::core::NoParams;
use crate::domains::tools::error::ToolResult;
use crate::domains::tools::registry::{ToolContext, ToolDefinition};
use crate::domains::tools::schema::{ParamKind, ParameterSpec};

/// Parameters for tools that take a single project key.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProjectParams {
    pub project: String,
}

fn project_parameter() -> Vec<ParameterSpec> {
    vec![ParameterSpec::required("project", ParamKind::String, "Project key")]
}

// ============================================================================
// get_issue_types
// ============================================================================

pub struct GetIssueTypesTool;

impl ToolDefinition for GetIssueTypesTool {
    const NAME: &'static str = "get_issue_types";
    const DESCRIPTION: &'static str = "List the issue types available in a project.";
    type Params = ProjectParams;

    fn parameters() -> Vec<ParameterSpec> {
        project_parameter()
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_project_key("project", &params.project)?;

        let project = ctx
            .client
            .get(&format!("/rest/api/3/project/{}", params.project))?;
        let issue_types: Vec<Value> = array_of(&project, "issueTypes")
            .iter()
            .map(|t| {
                json!({
                    "id": get_or_null(t, "id"),
                    "name": get_or_null(t, "name"),
                    "description": get_or(t, "description", json!("")),
                    "subtask": get_or(t, "subtask", json!(false)),
                })
            })
            .collect();

        Ok(json!({ "project": params.project, "issue_types": issue_types }))
    }
}

// ============================================================================
// get_project_components
// ============================================================================

pub struct GetProjectComponentsTool;

impl ToolDefinition for GetProjectComponentsTool {
    const NAME: &'static str = "get_project_components";
    const DESCRIPTION: &'static str = "List the components of a project.";
    type Params = ProjectParams;

    fn parameters() -> Vec<ParameterSpec> {
        project_parameter()
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_project_key("project", &params.project)?;

        let data = ctx
            .client
            .get(&format!("/rest/api/3/project/{}/components", params.project))?;
        let components: Vec<Value> = as_slice(&data)
            .iter()
            .map(|c| {
                let lead = c
                    .get("lead")
                    .filter(|lead| !lead.is_null())
                    .map(|lead| get_or_null(lead, "displayName"))
                    .unwrap_or_else(|| json!("No lead"));
                json!({
                    "id": get_or_null(c, "id"),
                    "name": get_or_null(c, "name"),
                    "description": get_or(c, "description", json!("")),
                    "lead": lead,
                })
            })
            .collect();

        Ok(json!({
            "project": params.project,
            "component_count": components.len(),
            "components": components,
        }))
    }
}

// ============================================================================
// get_project_versions
// ============================================================================

pub struct GetProjectVersionsTool;

impl ToolDefinition for GetProjectVersionsTool {
    const NAME: &'static str = "get_project_versions";
    const DESCRIPTION: &'static str = "List the versions (releases) of a project.";
    type Params = ProjectParams;

    fn parameters() -> Vec<ParameterSpec> {
        project_parameter()
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_project_key("project", &params.project)?;

        let data = ctx
            .client
            .get(&format!("/rest/api/3/project/{}/versions", params.project))?;
        let versions: Vec<Value> = as_slice(&data)
            .iter()
            .map(|v| {
                json!({
                    "id": get_or_null(v, "id"),
                    "name": get_or_null(v, "name"),
                    "description": get_or(v, "description", json!("")),
                    "released": get_or(v, "released", json!(false)),
                    "releaseDate": get_or(v, "releaseDate", json!("Not set")),
                    "archived": get_or(v, "archived", json!(false)),
                })
            })
            .collect();

        Ok(json!({
            "project": params.project,
            "version_count": versions.len(),
            "versions": versions,
        }))
    }
}

// ============================================================================
// get_custom_fields
// ============================================================================

pub struct GetCustomFieldsTool;

impl ToolDefinition for GetCustomFieldsTool {
    const NAME: &'static str = "get_custom_fields";
    const DESCRIPTION: &'static str = "List the custom fields defined on the instance.";
    type Params = NoParams;

    fn parameters() -> Vec<ParameterSpec> {
        Vec::new()
    }

    fn execute(_params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        let data = ctx.client.get("/rest/api/3/field")?;
        let custom_fields: Vec<Value> = as_slice(&data)
            .iter()
            .filter(|f| f.get("custom").and_then(Value::as_bool).unwrap_or(false))
            .map(|f| {
                let field_type = f
                    .get("schema")
                    .map(|schema| get_or(schema, "type", json!("Unknown")))
                    .unwrap_or_else(|| json!("Unknown"));
                json!({
                    "id": get_or_null(f, "id"),
                    "name": get_or_null(f, "name"),
                    "description": get_or(f, "description", json!("")),
                    "type": field_type,
                })
            })
            .collect();

        Ok(json!({
            "custom_field_count": custom_fields.len(),
            "custom_fields": custom_fields,
        }))
    }
}

// ============================================================================
// get_users
// ============================================================================

pub struct GetUsersTool;

impl ToolDefinition for GetUsersTool {
    const NAME: &'static str = "get_users";
    const DESCRIPTION: &'static str = "List the users that can be assigned issues in a project.";
    type Params = ProjectParams;

    fn parameters() -> Vec<ParameterSpec> {
        project_parameter()
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_project_key("project", &params.project)?;

        let data = ctx.client.get_with(
            "/rest/api/3/user/assignable/search",
            &[("project", params.project.clone())],
        )?;
        let users: Vec<Value> = as_slice(&data)
            .iter()
            .map(|u| {
                json!({
                    "accountId": get_or_null(u, "accountId"),
                    "displayName": get_or_null(u, "displayName"),
                    "emailAddress": get_or(u, "emailAddress", json!("Not available")),
                    "active": get_or(u, "active", json!(true)),
                })
            })
            .collect();

        Ok(json!({
            "project": params.project,
            "user_count": users.len(),
            "users": users,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::testing::{call, context};
    use crate::domains::tools::error::ToolError;
    use httpmock::prelude::*;

    #[test]
    fn test_get_issue_types() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/project/KW");
            then.status(200).json_body(json!({
                "issueTypes": [
                    { "id": "1", "name": "Bug" },
                    { "id": "5", "name": "Sub-task", "subtask": true, "description": "child" }
                ]
            }));
        });

        let ctx = context(&server);
        let result = call::<GetIssueTypesTool>(&ctx, json!({ "project": "KW" })).unwrap();
        assert_eq!(result["issue_types"][0]["subtask"], false);
        assert_eq!(result["issue_types"][0]["description"], "");
        assert_eq!(result["issue_types"][1]["subtask"], true);
    }

    #[test]
    fn test_project_key_validated() {
        let server = MockServer::start();
        let ctx = context(&server);
        let err = call::<GetProjectVersionsTool>(&ctx, json!({ "project": "kw" })).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { ref parameter, .. } if parameter == "project"));
    }

    #[test]
    fn test_components_without_lead() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/project/KW/components");
            then.status(200).json_body(json!([
                { "id": "1", "name": "API", "lead": { "displayName": "Ada" } },
                { "id": "2", "name": "UI" }
            ]));
        });

        let ctx = context(&server);
        let result = call::<GetProjectComponentsTool>(&ctx, json!({ "project": "KW" })).unwrap();
        assert_eq!(result["component_count"], 2);
        assert_eq!(result["components"][0]["lead"], "Ada");
        assert_eq!(result["components"][1]["lead"], "No lead");
    }

    #[test]
    fn test_versions_defaults() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/project/KW/versions");
            then.status(200).json_body(json!([{ "id": "100", "name": "1.0" }]));
        });

        let ctx = context(&server);
        let result = call::<GetProjectVersionsTool>(&ctx, json!({ "project": "KW" })).unwrap();
        assert_eq!(result["versions"][0]["releaseDate"], "Not set");
        assert_eq!(result["versions"][0]["released"], false);
    }

    #[test]
    fn test_custom_fields_filtered() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/field");
            then.status(200).json_body(json!([
                { "id": "summary", "name": "Summary", "custom": false },
                { "id": "customfield_10016", "name": "Story Points", "custom": true,
                  "schema": { "type": "number" } }
            ]));
        });

        let ctx = context(&server);
        let result = call::<GetCustomFieldsTool>(&ctx, json!({})).unwrap();
        assert_eq!(result["custom_field_count"], 1);
        assert_eq!(result["custom_fields"][0]["type"], "number");
    }

    #[test]
    fn test_get_users() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/api/3/user/assignable/search")
                .query_param("project", "KW");
            then.status(200)
                .json_body(json!([{ "accountId": "a1", "displayName": "Ada" }]));
        });

        let ctx = context(&server);
        let result = call::<GetUsersTool>(&ctx, json!({ "project": "KW" })).unwrap();
        mock.assert();
        assert_eq!(result["users"][0]["emailAddress"], "Not available");
        assert_eq!(result["users"][0]["active"], true);
    }
}
