//! Dispatcher - turns one `tools/call` request into exactly one response.
//!
//! Lookup, argument coercion and handler invocation each either move the
//! call forward or end it with a [`ToolError`]; every exit produces a
//! [`ResponseEnvelope`]. Handlers do blocking I/O, so they run on the
//! blocking pool and the call is awaited to completion before returning.

use std::sync::Arc;

use rmcp::model::{CallToolResult, Content, JsonObject};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use super::coercion::coerce;
use super::error::{ToolError, ToolResult};
use super::registry::{ToolContext, ToolRegistry};
use crate::core::protocol::{ErrorBody, RequestEnvelope, ResponseEnvelope};

/// Routes tool calls to their handlers.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    context: Arc<ToolContext>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, context: Arc<ToolContext>) -> Self {
        Self { registry, context }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one call. Never fails: errors become error envelopes.
    #[instrument(skip_all, fields(tool = %request.tool_name))]
    pub async fn dispatch(&self, request: RequestEnvelope) -> ResponseEnvelope {
        let RequestEnvelope {
            id,
            tool_name,
            arguments,
        } = request;

        match self.run(&tool_name, arguments).await {
            Ok(result) => {
                info!("Tool {} succeeded", tool_name);
                ResponseEnvelope::success(id, result)
            }
            Err(err) => {
                warn!("Tool {} failed: {} ({})", tool_name, err, err.kind());
                ResponseEnvelope::failure(id, ErrorBody::from(&err))
            }
        }
    }

    async fn run(&self, tool_name: &str, arguments: JsonObject) -> ToolResult<Value> {
        let tool = self.registry.lookup(tool_name)?;
        let coerced = coerce(&tool.descriptor.parameters, &arguments)?;
        debug!("Calling {} with {} argument(s)", tool_name, coerced.len());

        let handler = tool.handler.clone();
        let context = self.context.clone();
        let value = tokio::task::spawn_blocking(move || handler(coerced, context.as_ref()))
            .await
            .map_err(|e| {
                error!("Handler for {} did not complete: {}", tool_name, e);
                ToolError::unknown(format!("Tool {tool_name} failed unexpectedly"))
            })??;

        wrap_result(tool_name, &value)
    }
}

/// Wrap a handler value as an MCP tool result.
///
/// The value is carried both as pretty-printed text and as structured content.
/// A value that cannot be encoded fails the call; any remote mutation the
/// handler made has already happened by then.
fn wrap_result<T: Serialize>(tool_name: &str, value: &T) -> ToolResult<Value> {
    let encode = || -> serde_json::Result<Value> {
        let structured = serde_json::to_value(value)?;
        let text = serde_json::to_string_pretty(&structured)?;
        let result = CallToolResult {
            content: vec![Content::text(text)],
            structured_content: Some(structured),
            is_error: Some(false),
            meta: None,
        };
        serde_json::to_value(&result)
    };

    encode().map_err(|e| {
        error!("Failed to encode result of {}: {}", tool_name, e);
        ToolError::unknown(format!("Tool {tool_name} produced a result that could not be encoded"))
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::config::Config;
    use crate::domains::jira::{JiraAuth, JiraClient};
    use crate::domains::tools::coercion::CoercedArguments;
    use crate::domains::tools::router::build_tool_registry;
    use crate::domains::tools::schema::{ArgValue, ParamKind, ParameterSpec};
    use httpmock::prelude::*;
    use serde_json::json;

    fn context(base_url: &str) -> Arc<ToolContext> {
        let client = JiraClient::new(
            base_url,
            JiraAuth::Bearer("token".into()),
            Duration::from_secs(5),
        );
        Arc::new(ToolContext::new(client, Arc::new(Config::default())))
    }

    fn stub_dispatcher() -> Dispatcher {
        let mut builder = ToolRegistry::builder();
        builder
            .register(
                "echo",
                "Echo arguments",
                vec![
                    ParameterSpec::required("key", ParamKind::String, ""),
                    ParameterSpec::optional("limit", ParamKind::Integer, "").default_int(10),
                ],
                Arc::new(|args: CoercedArguments, _: &ToolContext| -> ToolResult<Value> {
                    Ok(Value::Object(args.to_json()))
                }),
            )
            .unwrap()
            .register(
                "remote_fail",
                "",
                vec![],
                Arc::new(|_: CoercedArguments, _: &ToolContext| -> ToolResult<Value> {
                    Err(ToolError::RemoteCall {
                        status: 404,
                        message: "Issue does not exist".into(),
                    })
                }),
            )
            .unwrap()
            .register(
                "panics",
                "",
                vec![],
                Arc::new(|args: CoercedArguments, _: &ToolContext| -> ToolResult<Value> {
                    if let Some(ArgValue::String(_)) = args.get("never") {
                        return Ok(Value::Null);
                    }
                    panic!("handler bug")
                }),
            )
            .unwrap();
        Dispatcher::new(Arc::new(builder.build()), context("http://127.0.0.1:1"))
    }

    fn request(id: Value, tool: &str, arguments: Value) -> RequestEnvelope {
        RequestEnvelope {
            id,
            tool_name: tool.to_string(),
            arguments: arguments.as_object().cloned().unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn test_success_wraps_result() {
        let dispatcher = stub_dispatcher();
        let response = dispatcher
            .dispatch(request(json!(1), "echo", json!({ "key": "KW-1", "extra": true })))
            .await;

        assert_eq!(response.id, json!(1));
        let result = response.result().unwrap();
        assert_eq!(result["isError"], false);
        assert_eq!(result["structuredContent"], json!({ "key": "KW-1", "limit": 10 }));
        assert_eq!(result["content"][0]["type"], "text");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let dispatcher = stub_dispatcher();
        let response = dispatcher
            .dispatch(request(json!("x"), "nonexistent_tool", json!({})))
            .await;

        let error = response.error().unwrap();
        assert_eq!(error.kind, "ToolNotFound");
        assert_eq!(error.message, "nonexistent_tool");
        assert_eq!(response.id, json!("x"));
    }

    #[tokio::test]
    async fn test_missing_and_invalid_arguments() {
        let dispatcher = stub_dispatcher();

        let response = dispatcher.dispatch(request(json!(2), "echo", json!({}))).await;
        let error = response.error().unwrap();
        assert_eq!(error.kind, "MissingArgument");
        assert_eq!(error.message, "key");

        let response = dispatcher
            .dispatch(request(json!(3), "echo", json!({ "key": "KW-1", "limit": "ten" })))
            .await;
        let error = response.error().unwrap();
        assert_eq!(error.kind, "InvalidArgument");
        assert_eq!(error.data, Some(json!({ "parameter": "limit", "expected": "integer" })));
    }

    #[tokio::test]
    async fn test_remote_error_surfaces_status() {
        let dispatcher = stub_dispatcher();
        let response = dispatcher.dispatch(request(json!(4), "remote_fail", json!({}))).await;
        let error = response.error().unwrap();
        assert_eq!(error.kind, "RemoteCallError");
        assert_eq!(error.message, "Issue does not exist");
        assert_eq!(error.data, Some(json!({ "status": 404 })));
    }

    #[tokio::test]
    async fn test_panicking_handler_becomes_unknown_error() {
        let dispatcher = stub_dispatcher();
        let response = dispatcher.dispatch(request(json!(5), "panics", json!({}))).await;
        assert_eq!(response.error().unwrap().kind, "UnknownError");

        // The dispatcher keeps working afterwards.
        let response = dispatcher
            .dispatch(request(json!(6), "echo", json!({ "key": "KW-1" })))
            .await;
        assert!(!response.is_error());
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("cannot encode"))
        }
    }

    #[test]
    fn test_unencodable_result_is_a_failure() {
        let err = wrap_result("create_issue", &Unencodable).unwrap_err();
        assert_eq!(err.kind(), "UnknownError");

        let body = ErrorBody::from(&err);
        assert_eq!(body.code, crate::core::protocol::codes::INTERNAL_ERROR);
    }

    #[test]
    fn test_wrap_result_carries_text_and_structure() {
        let wrapped = wrap_result("get_issue", &json!({ "key": "KW-1" })).unwrap();
        assert_eq!(wrapped["structuredContent"], json!({ "key": "KW-1" }));
        assert_eq!(wrapped["content"][0]["text"], "{\n  \"key\": \"KW-1\"\n}");
        assert_eq!(wrapped["isError"], false);
    }

    #[tokio::test]
    async fn test_get_issue_end_to_end() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rest/api/3/issue/KW-123");
                then.status(200).json_body(json!({
                    "key": "KW-123",
                    "fields": {
                        "summary": "Login fails",
                        "status": { "name": "Open" },
                        "priority": { "name": "High" },
                        "issuetype": { "name": "Bug" },
                        "assignee": null,
                        "description": null
                    }
                }));
            })
            .await;

        let registry = Arc::new(build_tool_registry().unwrap());
        let dispatcher = Dispatcher::new(registry, context(&server.base_url()));
        let response = dispatcher
            .dispatch(request(json!(7), "get_issue", json!({ "key": "KW-123" })))
            .await;

        let result = response.result().unwrap();
        assert_eq!(result["structuredContent"]["key"], "KW-123");
        assert_eq!(result["structuredContent"]["summary"], "Login fails");
    }

    #[tokio::test]
    async fn test_connection_failure_is_unknown_error() {
        let registry = Arc::new(build_tool_registry().unwrap());
        let dispatcher = Dispatcher::new(registry, context("http://127.0.0.1:1"));
        let response = dispatcher
            .dispatch(request(json!(8), "get_issue", json!({ "key": "KW-1" })))
            .await;
        assert_eq!(response.error().unwrap().kind, "UnknownError");
    }
}
