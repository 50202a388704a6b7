//! Webhook and watcher tools.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

use super::common::{as_slice, array_of, ensure_issue_key, get_or, get_or_null};
use super::core::NoParams;
use super::relations::IssueKeyParams;
use crate::domains::tools::error::{ToolError, ToolResult};
use crate::domains::tools::registry::{ToolContext, ToolDefinition};
use crate::domains::tools::schema::{ParamKind, ParameterSpec};

const WEBHOOK_PATH: &str = "/rest/webhooks/1.0/webhook";

// ============================================================================
// list_webhooks
// ============================================================================

pub struct ListWebhooksTool;

impl ToolDefinition for ListWebhooksTool {
    const NAME: &'static str = "list_webhooks";
    const DESCRIPTION: &'static str = "List the webhooks registered on the instance (admin only).";
    type Params = NoParams;

    fn parameters() -> Vec<ParameterSpec> {
        Vec::new()
    }

    fn execute(_params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        let data = ctx.client.get(WEBHOOK_PATH)?;
        let webhooks: Vec<Value> = as_slice(&data)
            .iter()
            .map(|w| {
                json!({
                    "id": get_or_null(w, "id"),
                    "name": get_or_null(w, "name"),
                    "url": get_or_null(w, "url"),
                    "events": get_or(w, "events", json!([])),
                    "enabled": get_or(w, "enabled", json!(true)),
                })
            })
            .collect();

        Ok(json!({
            "webhook_count": webhooks.len(),
            "webhooks": webhooks,
        }))
    }
}

// ============================================================================
// create_webhook
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateWebhookParams {
    pub name: String,
    pub url: String,
    pub events: Vec<String>,
}

pub struct CreateWebhookTool;

impl ToolDefinition for CreateWebhookTool {
    const NAME: &'static str = "create_webhook";
    const DESCRIPTION: &'static str =
        "Register a webhook for events such as jira:issue_created (admin only).";
    type Params = CreateWebhookParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("name", ParamKind::String, "Webhook name"),
            ParameterSpec::required("url", ParamKind::String, "Callback URL"),
            ParameterSpec::required("events", ParamKind::StringList, "Event identifiers"),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        if !(params.url.starts_with("http://") || params.url.starts_with("https://")) {
            return Err(ToolError::invalid("url", "http(s) URL"));
        }

        let created = ctx.client.post(
            WEBHOOK_PATH,
            &json!({
                "name": params.name,
                "url": params.url,
                "events": params.events,
                "enabled": true,
            }),
        )?;

        Ok(json!({
            "success": true,
            "message": "Webhook created successfully",
            "webhook_id": get_or_null(&created, "id"),
            "name": params.name,
        }))
    }
}

// ============================================================================
// add_watcher
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddWatcherParams {
    pub key: String,
    pub username: String,
}

pub struct AddWatcherTool;

impl ToolDefinition for AddWatcherTool {
    const NAME: &'static str = "add_watcher";
    const DESCRIPTION: &'static str = "Add a user (account id) as a watcher of an issue.";
    type Params = AddWatcherParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("key", ParamKind::String, "Issue key"),
            ParameterSpec::required("username", ParamKind::String, "Account id of the watcher"),
        ]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("key", &params.key)?;

        // The endpoint takes a bare JSON string as its body.
        ctx.client.post(
            &format!("/rest/api/3/issue/{}/watchers", params.key),
            &json!(params.username),
        )?;

        Ok(json!({
            "success": true,
            "message": format!("Added {} as watcher to {}", params.username, params.key),
        }))
    }
}

// ============================================================================
// get_watchers
// ============================================================================

pub struct GetWatchersTool;

impl ToolDefinition for GetWatchersTool {
    const NAME: &'static str = "get_watchers";
    const DESCRIPTION: &'static str = "List the watchers of an issue.";
    type Params = IssueKeyParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![ParameterSpec::required("key", ParamKind::String, "Issue key")]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("key", &params.key)?;

        let data = ctx
            .client
            .get(&format!("/rest/api/3/issue/{}/watchers", params.key))?;
        let watchers: Vec<Value> = array_of(&data, "watchers")
            .iter()
            .map(|w| {
                json!({
                    "accountId": get_or_null(w, "accountId"),
                    "displayName": get_or_null(w, "displayName"),
                    "emailAddress": get_or(w, "emailAddress", json!("Not available")),
                })
            })
            .collect();

        Ok(json!({
            "issue": params.key,
            "watcher_count": watchers.len(),
            "watchers": watchers,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::testing::{call, context};
    use httpmock::prelude::*;

    #[test]
    fn test_list_webhooks() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(WEBHOOK_PATH);
            then.status(200).json_body(json!([
                { "id": 1, "name": "ci", "url": "https://ci.example.com/hook", "events": ["jira:issue_updated"] }
            ]));
        });

        let ctx = context(&server);
        let result = call::<ListWebhooksTool>(&ctx, json!({})).unwrap();
        assert_eq!(result["webhook_count"], 1);
        assert_eq!(result["webhooks"][0]["enabled"], true);
    }

    #[test]
    fn test_create_webhook() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST).path(WEBHOOK_PATH).json_body(json!({
                "name": "ci",
                "url": "https://ci.example.com/hook",
                "events": ["jira:issue_created"],
                "enabled": true
            }));
            then.status(201).json_body(json!({ "id": 42 }));
        });

        let ctx = context(&server);
        let result = call::<CreateWebhookTool>(
            &ctx,
            json!({ "name": "ci", "url": "https://ci.example.com/hook", "events": ["jira:issue_created"] }),
        )
        .unwrap();
        post.assert();
        assert_eq!(result["webhook_id"], 42);
    }

    #[test]
    fn test_create_webhook_rejects_non_http_url() {
        let server = MockServer::start();
        let ctx = context(&server);
        let err = call::<CreateWebhookTool>(
            &ctx,
            json!({ "name": "x", "url": "ftp://example.com", "events": [] }),
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { ref parameter, .. } if parameter == "url"));
    }

    #[test]
    fn test_add_watcher_sends_bare_string() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/api/3/issue/KW-1/watchers")
                .json_body(json!("abc-123"));
            then.status(204);
        });

        let ctx = context(&server);
        call::<AddWatcherTool>(&ctx, json!({ "key": "KW-1", "username": "abc-123" })).unwrap();
        post.assert();
    }

    #[test]
    fn test_get_watchers() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/api/3/issue/KW-1/watchers");
            then.status(200).json_body(json!({
                "watchers": [{ "accountId": "a1", "displayName": "Ada" }]
            }));
        });

        let ctx = context(&server);
        let result = call::<GetWatchersTool>(&ctx, json!({ "key": "KW-1" })).unwrap();
        assert_eq!(result["watcher_count"], 1);
        assert_eq!(result["watchers"][0]["emailAddress"], "Not available");
    }
}
