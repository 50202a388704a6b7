//! Tool Router - builds the registry with every Jira tool.
//!
//! Registration order is the order clients see in `tools/list`.

use super::definitions::*;
use super::error::RegistryError;
use super::registry::ToolRegistry;

/// Build the tool registry with all tools.
///
/// An error here is a programming mistake in a tool definition and is fatal
/// at startup.
pub fn build_tool_registry() -> Result<ToolRegistry, RegistryError> {
    let mut builder = ToolRegistry::builder();
    builder
        // Core
        .register_tool::<GetUserStoriesTool>()?
        .register_tool::<GetIssueTool>()?
        .register_tool::<GetProjectsTool>()?
        .register_tool::<SearchIssuesTool>()?
        .register_tool::<GetProjectStatsTool>()?
        .register_tool::<GetRecentIssuesTool>()?
        .register_tool::<GetIssuesByAssigneeTool>()?
        .register_tool::<CreateIssueTool>()?
        .register_tool::<UpdateIssueTool>()?
        .register_tool::<AdvancedJqlSearchTool>()?
        // Workflow
        .register_tool::<TransitionIssueTool>()?
        .register_tool::<GetTransitionsTool>()?
        .register_tool::<AddCommentTool>()?
        .register_tool::<BulkTransitionIssuesTool>()?
        .register_tool::<AssignIssueTool>()?
        .register_tool::<AddWorklogTool>()?
        // Attachments
        .register_tool::<ListAttachmentsTool>()?
        .register_tool::<UploadAttachmentTool>()?
        .register_tool::<DownloadAttachmentTool>()?
        // Projects and users
        .register_tool::<GetIssueTypesTool>()?
        .register_tool::<GetProjectComponentsTool>()?
        .register_tool::<GetProjectVersionsTool>()?
        .register_tool::<GetCustomFieldsTool>()?
        .register_tool::<GetUsersTool>()?
        // Agile
        .register_tool::<GetBoardsTool>()?
        .register_tool::<GetSprintsTool>()?
        .register_tool::<GetSprintIssuesTool>()?
        .register_tool::<AddToSprintTool>()?
        .register_tool::<GetBurndownDataTool>()?
        // Relations
        .register_tool::<GetIssueLinksTool>()?
        .register_tool::<GetSubtasksTool>()?
        .register_tool::<CreateSubtaskTool>()?
        .register_tool::<LinkIssuesTool>()?
        // Batch
        .register_tool::<BulkUpdateIssuesTool>()?
        .register_tool::<CloneIssueTool>()?
        // Webhooks and watchers
        .register_tool::<ListWebhooksTool>()?
        .register_tool::<CreateWebhookTool>()?
        .register_tool::<AddWatcherTool>()?
        .register_tool::<GetWatchersTool>()?
        // Reporting
        .register_tool::<GetTimeTrackingReportTool>()?
        .register_tool::<GetProjectRolesTool>()?
        .register_tool::<ExportIssuesTool>()?
        // Admin
        .register_tool::<CreateVersionTool>()?
        .register_tool::<ReleaseVersionTool>()?
        .register_tool::<GetUserPermissionsTool>()?
        .register_tool::<GetWorkflowsTool>()?
        .register_tool::<GetJiraStatisticsTool>()?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use serde_json::Value;

    #[test]
    fn test_build_registry() {
        let registry = build_tool_registry().unwrap();
        assert_eq!(registry.len(), 47);

        let names = registry.tool_names();
        assert_eq!(names.first(), Some(&"get_user_stories"));
        assert_eq!(names.last(), Some(&"get_jira_statistics"));
        assert!(names.contains(&"get_issue"));
        assert!(names.contains(&"bulk_update_issues"));
        assert!(names.contains(&"export_issues"));
    }

    #[test]
    fn test_names_are_unique() {
        let registry = build_tool_registry().unwrap();
        let unique: HashSet<&str> = registry.tool_names().into_iter().collect();
        assert_eq!(unique.len(), registry.len());
    }

    #[test]
    fn test_catalog_required_sets_match_parameters() {
        let registry = build_tool_registry().unwrap();
        for descriptor in registry.list_all() {
            let expected: HashSet<&str> = descriptor.required_parameters().collect();
            let schema = Value::Object(descriptor.input_schema());
            let listed: HashSet<&str> = schema["required"]
                .as_array()
                .map(|r| r.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            assert_eq!(listed, expected, "required set of {}", descriptor.name);
        }
    }

    #[test]
    fn test_known_signatures() {
        let registry = build_tool_registry().unwrap();

        let get_issue = &registry.lookup("get_issue").unwrap().descriptor;
        assert_eq!(get_issue.required_parameters().collect::<Vec<_>>(), vec!["key"]);

        let create = &registry.lookup("create_issue").unwrap().descriptor;
        assert_eq!(
            create.required_parameters().collect::<Vec<_>>(),
            vec!["project", "summary"]
        );

        let stats = &registry.lookup("get_jira_statistics").unwrap().descriptor;
        assert!(stats.parameters.is_empty());
    }
}
