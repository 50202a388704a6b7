//! Tool definitions module.
//!
//! One file per category of Jira operations. Every tool is a unit struct
//! implementing [`ToolDefinition`](super::registry::ToolDefinition).

pub mod admin;
pub mod agile;
pub mod attachments;
pub mod batch;
pub mod common;
pub mod core;
pub mod projects;
pub mod relations;
pub mod reporting;
pub mod webhooks;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use admin::{
    CreateVersionTool, GetJiraStatisticsTool, GetUserPermissionsTool, GetWorkflowsTool,
    ReleaseVersionTool,
};
pub use agile::{
    AddToSprintTool, GetBoardsTool, GetBurndownDataTool, GetSprintIssuesTool, GetSprintsTool,
};
pub use attachments::{DownloadAttachmentTool, ListAttachmentsTool, UploadAttachmentTool};
pub use batch::{BulkUpdateIssuesTool, CloneIssueTool};
pub use core::{
    AdvancedJqlSearchTool, CreateIssueTool, GetIssueTool, GetIssuesByAssigneeTool,
    GetProjectStatsTool, GetProjectsTool, GetRecentIssuesTool, GetUserStoriesTool, NoParams,
    SearchIssuesTool, UpdateIssueTool,
};
pub use projects::{
    GetCustomFieldsTool, GetIssueTypesTool, GetProjectComponentsTool, GetProjectVersionsTool,
    GetUsersTool,
};
pub use relations::{CreateSubtaskTool, GetIssueLinksTool, GetSubtasksTool, LinkIssuesTool};
pub use reporting::{ExportIssuesTool, GetProjectRolesTool, GetTimeTrackingReportTool};
pub use webhooks::{AddWatcherTool, CreateWebhookTool, GetWatchersTool, ListWebhooksTool};
pub use workflow::{
    AddCommentTool, AddWorklogTool, AssignIssueTool, BulkTransitionIssuesTool, GetTransitionsTool,
    TransitionIssueTool,
};
