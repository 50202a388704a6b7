//! Helpers for tool tests against a mock Jira.

use std::sync::Arc;
use std::time::Duration;

use httpmock::MockServer;
use serde_json::Value;

use crate::core::config::Config;
use crate::domains::jira::{JiraAuth, JiraClient};
use crate::domains::tools::coercion::coerce;
use crate::domains::tools::error::ToolResult;
use crate::domains::tools::registry::{ToolContext, ToolDefinition};

/// Tool context pointing at the mock server.
pub fn context(server: &MockServer) -> ToolContext {
    let client = JiraClient::new(
        server.base_url(),
        JiraAuth::Basic {
            username: "user".into(),
            token: "token".into(),
        },
        Duration::from_secs(5),
    );
    let mut config = Config::default();
    config.jira.base_url = Some(server.base_url());
    config.jira.api_token = Some("token".into());
    ToolContext::new(client, Arc::new(config))
}

/// Coerce raw arguments the way the dispatcher does, then run the tool.
pub fn call<T: ToolDefinition>(ctx: &ToolContext, args: Value) -> ToolResult<Value> {
    let raw = args.as_object().cloned().unwrap_or_default();
    let coerced = coerce(&T::parameters(), &raw)?;
    T::execute(coerced.into_params::<T::Params>()?, ctx)
}
