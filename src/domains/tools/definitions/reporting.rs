//! Reporting tools: time tracking, project roles and issue export.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use super::common::{
    array_of, assignee_name, display_name_of, ensure_project_key, fields, get_or, get_or_null,
    name_of, seconds_to_hours,
};
use super::projects::ProjectParams;
use crate::domains::tools::error::{ToolError, ToolResult};
use crate::domains::tools::registry::{ToolContext, ToolDefinition};
use crate::domains::tools::schema::{ParamKind, ParameterSpec};

/// Maximum number of issues pulled by `export_issues`.
const EXPORT_MAX_RESULTS: i64 = 1000;

/// Columns of an exported issue, in output order.
const EXPORT_COLUMNS: [&str; 9] = [
    "key",
    "summary",
    "status",
    "assignee",
    "reporter",
    "priority",
    "issuetype",
    "created",
    "updated",
];

// ============================================================================
// get_time_tracking_report
// ============================================================================

pub struct GetTimeTrackingReportTool;

impl ToolDefinition for GetTimeTrackingReportTool {
    const NAME: &'static str = "get_time_tracking_report";
    const DESCRIPTION: &'static str =
        "Summarise logged and estimated time for the issues of a project that have work logged.";
    type Params = ProjectParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![ParameterSpec::required("project", ParamKind::String, "Project key")]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_project_key("project", &params.project)?;

        let jql = format!("project = {} AND timespent > 0", params.project);
        let data = ctx.client.search(
            &jql,
            100,
            &[("fields", "summary,timespent,timeoriginalestimate,assignee".to_string())],
        )?;

        let mut total_logged = 0i64;
        let mut total_estimated = 0i64;
        let issues: Vec<Value> = array_of(&data, "issues")
            .iter()
            .map(|issue| {
                let f = fields(issue);
                let spent = f.get("timespent").and_then(Value::as_i64).unwrap_or(0);
                let estimated = f
                    .get("timeoriginalestimate")
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                total_logged += spent;
                total_estimated += estimated;

                json!({
                    "key": get_or_null(issue, "key"),
                    "summary": get_or_null(f, "summary"),
                    "time_spent_seconds": spent,
                    "time_spent_hours": seconds_to_hours(spent),
                    "time_estimated_seconds": estimated,
                    "time_estimated_hours": seconds_to_hours(estimated),
                    "assignee": assignee_name(f),
                })
            })
            .collect();

        Ok(json!({
            "project": params.project,
            "total_logged_hours": seconds_to_hours(total_logged),
            "total_estimated_hours": seconds_to_hours(total_estimated),
            "issues_with_time_tracking": issues.len(),
            "issues": issues,
        }))
    }
}

// ============================================================================
// get_project_roles
// ============================================================================

pub struct GetProjectRolesTool;

impl ToolDefinition for GetProjectRolesTool {
    const NAME: &'static str = "get_project_roles";
    const DESCRIPTION: &'static str = "List the roles of a project and the users and groups in each.";
    type Params = ProjectParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![ParameterSpec::required("project", ParamKind::String, "Project key")]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_project_key("project", &params.project)?;

        // Maps role name to the role's REST URL.
        let role_urls = ctx
            .client
            .get(&format!("/rest/api/3/project/{}/role", params.project))?;

        let mut roles = Vec::new();
        for url in role_urls.as_object().into_iter().flat_map(|m| m.values()) {
            let Some(url) = url.as_str() else { continue };
            let role = match ctx.client.get_absolute(url) {
                Ok(role) => role,
                Err(e) => {
                    warn!("Skipping role {}: {}", url, e);
                    continue;
                }
            };
            let actors: Vec<Value> = array_of(&role, "actors")
                .iter()
                .map(|a| {
                    json!({
                        "type": get_or_null(a, "type"),
                        "name": get_or_null(a, "name"),
                        "displayName": get_or_null(a, "displayName"),
                    })
                })
                .collect();
            roles.push(json!({
                "id": get_or_null(&role, "id"),
                "name": get_or_null(&role, "name"),
                "description": get_or(&role, "description", json!("")),
                "actors": actors,
            }));
        }

        Ok(json!({
            "project": params.project,
            "role_count": roles.len(),
            "roles": roles,
        }))
    }
}

// ============================================================================
// export_issues
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExportIssuesParams {
    pub jql: String,
    pub format: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    fn parse(value: &str) -> ToolResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(ToolError::invalid("format", "json or csv")),
        }
    }
}

pub struct ExportIssuesTool;

impl ExportIssuesTool {
    fn row(issue: &Value) -> Value {
        let f = fields(issue);
        json!({
            "key": get_or_null(issue, "key"),
            "summary": get_or_null(f, "summary"),
            "status": name_of(f, "status"),
            "assignee": assignee_name(f),
            "reporter": display_name_of(f, "reporter"),
            "priority": name_of(f, "priority"),
            "issuetype": name_of(f, "issuetype"),
            "created": get_or_null(f, "created"),
            "updated": get_or_null(f, "updated"),
        })
    }

    fn cell(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn to_csv(rows: &[Value]) -> ToolResult<String> {
        if rows.is_empty() {
            return Ok(String::new());
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        let write_err = |e: csv::Error| ToolError::unknown(format!("CSV export failed: {e}"));
        writer.write_record(EXPORT_COLUMNS).map_err(write_err)?;
        for row in rows {
            writer
                .write_record(EXPORT_COLUMNS.iter().map(|c| Self::cell(&row[*c])))
                .map_err(write_err)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ToolError::unknown(format!("CSV export failed: {e}")))?;
        String::from_utf8(bytes).map_err(|e| ToolError::unknown(format!("CSV export failed: {e}")))
    }
}

impl ToolDefinition for ExportIssuesTool {
    const NAME: &'static str = "export_issues";
    const DESCRIPTION: &'static str =
        "Export up to 1000 issues matching a JQL query as JSON records or CSV text.";
    type Params = ExportIssuesParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("jql", ParamKind::String, "JQL query"),
            ParameterSpec::required("format", ParamKind::String, "Output format: json or csv"),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        let format = ExportFormat::parse(&params.format)?;

        let data = ctx.client.search(&params.jql, EXPORT_MAX_RESULTS, &[])?;
        let rows: Vec<Value> = array_of(&data, "issues").iter().map(Self::row).collect();

        match format {
            ExportFormat::Json => Ok(json!({
                "format": "json",
                "total_issues": rows.len(),
                "issues": rows,
            })),
            ExportFormat::Csv => Ok(json!({
                "format": "csv",
                "total_issues": rows.len(),
                "csv_data": Self::to_csv(&rows)?,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::testing::{call, context};
    use httpmock::prelude::*;

    #[test]
    fn test_time_tracking_totals() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/rest/api/3/search")
                .query_param("jql", "project = KW AND timespent > 0")
                .query_param("maxResults", "100");
            then.status(200).json_body(json!({
                "issues": [
                    { "key": "KW-1", "fields": { "summary": "a", "timespent": 5400, "timeoriginalestimate": 7200 } },
                    { "key": "KW-2", "fields": { "summary": "b", "timespent": 1800, "timeoriginalestimate": null,
                      "assignee": { "displayName": "Ada" } } }
                ]
            }));
        });

        let ctx = context(&server);
        let result = call::<GetTimeTrackingReportTool>(&ctx, json!({ "project": "KW" })).unwrap();
        assert_eq!(result["total_logged_hours"], 2.0);
        assert_eq!(result["total_estimated_hours"], 2.0);
        assert_eq!(result["issues_with_time_tracking"], 2);
        assert_eq!(result["issues"][0]["time_spent_hours"], 1.5);
        assert_eq!(result["issues"][0]["assignee"], "Unassigned");
        assert_eq!(result["issues"][1]["time_estimated_seconds"], 0);
    }

    #[test]
    fn test_project_roles_skips_failed_roles() {
        let server = MockServer::start();
        let base = server.base_url();
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/project/KW/role");
            then.status(200).json_body(json!({
                "Developers": format!("{base}/rest/api/3/project/KW/role/10001"),
                "Admins": format!("{base}/rest/api/3/project/KW/role/10002")
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/project/KW/role/10001");
            then.status(200).json_body(json!({
                "id": 10001,
                "name": "Developers",
                "actors": [{ "type": "atlassian-user-role-actor", "name": "ada", "displayName": "Ada" }]
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/project/KW/role/10002");
            then.status(403);
        });

        let ctx = context(&server);
        let result = call::<GetProjectRolesTool>(&ctx, json!({ "project": "KW" })).unwrap();
        assert_eq!(result["role_count"], 1);
        assert_eq!(result["roles"][0]["name"], "Developers");
        assert_eq!(result["roles"][0]["description"], "");
        assert_eq!(result["roles"][0]["actors"][0]["displayName"], "Ada");
    }

    #[test]
    fn test_project_roles_ignores_foreign_urls() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/project/KW/role");
            then.status(200)
                .json_body(json!({ "Evil": "https://elsewhere.example.com/role/1" }));
        });

        let ctx = context(&server);
        let result = call::<GetProjectRolesTool>(&ctx, json!({ "project": "KW" })).unwrap();
        assert_eq!(result["role_count"], 0);
    }

    fn export_mock(server: &MockServer, issues: Value) {
        server.mock(|when, then| {
            when.method(GET)
                .path("/rest/api/3/search")
                .query_param("maxResults", "1000");
            then.status(200).json_body(json!({ "issues": issues }));
        });
    }

    #[test]
    fn test_export_json() {
        let server = MockServer::start();
        export_mock(
            &server,
            json!([{ "key": "KW-1", "fields": {
                "summary": "Login", "status": { "name": "Done" },
                "reporter": { "displayName": "Bob" }, "priority": { "name": "High" },
                "issuetype": { "name": "Bug" }, "created": "2024-01-01", "updated": "2024-01-02"
            }}]),
        );

        let ctx = context(&server);
        let result =
            call::<ExportIssuesTool>(&ctx, json!({ "jql": "project = KW", "format": "JSON" })).unwrap();
        assert_eq!(result["format"], "json");
        assert_eq!(result["total_issues"], 1);
        assert_eq!(result["issues"][0]["assignee"], "Unassigned");
        assert_eq!(result["issues"][0]["reporter"], "Bob");
    }

    #[test]
    fn test_export_csv() {
        let server = MockServer::start();
        export_mock(
            &server,
            json!([{ "key": "KW-1", "fields": {
                "summary": "Login, then logout", "status": { "name": "Done" },
                "assignee": { "displayName": "Ada" }
            }}]),
        );

        let ctx = context(&server);
        let result =
            call::<ExportIssuesTool>(&ctx, json!({ "jql": "project = KW", "format": "csv" })).unwrap();
        let csv_data = result["csv_data"].as_str().unwrap();
        let mut lines = csv_data.lines();
        assert_eq!(
            lines.next(),
            Some("key,summary,status,assignee,reporter,priority,issuetype,created,updated")
        );
        assert_eq!(lines.next(), Some("KW-1,\"Login, then logout\",Done,Ada,,,,,"));
    }

    #[test]
    fn test_export_csv_empty() {
        let server = MockServer::start();
        export_mock(&server, json!([]));

        let ctx = context(&server);
        let result =
            call::<ExportIssuesTool>(&ctx, json!({ "jql": "project = KW", "format": "csv" })).unwrap();
        assert_eq!(result["total_issues"], 0);
        assert_eq!(result["csv_data"], "");
    }

    #[test]
    fn test_export_rejects_unknown_format() {
        let server = MockServer::start();
        let ctx = context(&server);
        let err =
            call::<ExportIssuesTool>(&ctx, json!({ "jql": "project = KW", "format": "xml" })).unwrap_err();
        assert_eq!(err.wire_message(), "format: expected json or csv");
    }
}
