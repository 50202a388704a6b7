//! Attachment tools.
//!
//! Upload reads a local file and download writes one, so both go through
//! the path validator before touching the filesystem.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use super::common::{array_of, display_name_of, ensure_issue_key, fields, get_or_null};
use crate::core::security::{PathSecurityError, validate_input_path, validate_output_path};
use crate::domains::tools::error::{ToolError, ToolResult};
use crate::domains::tools::registry::{ToolContext, ToolDefinition};
use crate::domains::tools::schema::{ParamKind, ParameterSpec};

fn path_error(parameter: &str, err: PathSecurityError) -> ToolError {
    warn!("Path validation failed for {}: {}", parameter, err);
    let expected = match err {
        PathSecurityError::PathNotFound { .. } => "existing path",
        PathSecurityError::OutsideRootDirectory { .. } => "path inside the allowed root directory",
        PathSecurityError::SymlinkNotAllowed { .. } => "path that is not a symlink",
        PathSecurityError::NotAFile { .. } => "path to a regular file",
        PathSecurityError::CannotCanonicalize { .. } | PathSecurityError::IoError { .. } => {
            "accessible path"
        }
    };
    ToolError::invalid(parameter, expected)
}

// ============================================================================
// list_attachments
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListAttachmentsParams {
    pub key: String,
}

pub struct ListAttachmentsTool;

impl ToolDefinition for ListAttachmentsTool {
    const NAME: &'static str = "list_attachments";
    const DESCRIPTION: &'static str = "List the attachments of an issue with their download URLs.";
    type Params = ListAttachmentsParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![ParameterSpec::required("key", ParamKind::String, "Issue key")]
    }

    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("key", &params.key)?;

        let issue = ctx.client.get_with(
            &format!("/rest/api/3/issue/{}", params.key),
            &[("fields", "attachment".to_string())],
        )?;

        let attachments: Vec<Value> = array_of(fields(&issue), "attachment")
            .iter()
            .map(|a| {
                json!({
                    "id": get_or_null(a, "id"),
                    "filename": get_or_null(a, "filename"),
                    "size": get_or_null(a, "size"),
                    "mimeType": get_or_null(a, "mimeType"),
                    "created": get_or_null(a, "created"),
                    "author": display_name_of(a, "author"),
                    "content": get_or_null(a, "content"),
                })
            })
            .collect();

        Ok(json!({
            "issue": params.key,
            "attachment_count": attachments.len(),
            "attachments": attachments,
        }))
    }
}

// ============================================================================
// upload_attachment
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UploadAttachmentParams {
    pub key: String,
    pub file_path: String,
}

pub struct UploadAttachmentTool;

impl ToolDefinition for UploadAttachmentTool {
    const NAME: &'static str = "upload_attachment";
    const DESCRIPTION: &'static str = "Upload a local file as an attachment to an issue.";
    type Params = UploadAttachmentParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("key", ParamKind::String, "Issue key"),
            ParameterSpec::required("file_path", ParamKind::String, "Path of the local file to upload"),
        ]
    }

    #[instrument(skip_all, fields(key = %params.key, file = %params.file_path))]
    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        ensure_issue_key("key", &params.key)?;
        let file = validate_input_path(&params.file_path, &ctx.config)
            .map_err(|e| path_error("file_path", e))?;

        let uploaded = ctx.client.upload(
            &format!("/rest/api/3/issue/{}/attachments", params.key),
            &file,
        )?;
        let first = uploaded
            .as_array()
            .and_then(|list| list.first())
            .ok_or_else(|| ToolError::unknown("Jira returned no attachment for the upload"))?;

        info!("Uploaded {:?} to {}", file, params.key);
        Ok(json!({
            "success": true,
            "message": format!("File uploaded to {}", params.key),
            "attachment_id": get_or_null(first, "id"),
            "filename": get_or_null(first, "filename"),
        }))
    }
}

// ============================================================================
// download_attachment
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DownloadAttachmentParams {
    pub attachment_url: String,
    pub save_path: String,
}

pub struct DownloadAttachmentTool;

impl ToolDefinition for DownloadAttachmentTool {
    const NAME: &'static str = "download_attachment";
    const DESCRIPTION: &'static str =
        "Download attachment content (the `content` URL from list_attachments) to a local file.";
    type Params = DownloadAttachmentParams;

    fn parameters() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("attachment_url", ParamKind::String, "Attachment content URL"),
            ParameterSpec::required("save_path", ParamKind::String, "Local destination file"),
        ]
    }

    #[instrument(skip_all, fields(save_path = %params.save_path))]
    fn execute(params: Self::Params, ctx: &ToolContext) -> ToolResult<Value> {
        let url = &params.attachment_url;
        let is_absolute = url.starts_with("http://") || url.starts_with("https://");
        if (is_absolute && !ctx.client.is_own_url(url)) || (!is_absolute && !url.starts_with('/')) {
            return Err(ToolError::invalid(
                "attachment_url",
                "URL of the configured Jira instance",
            ));
        }

        let target = validate_output_path(&params.save_path, &ctx.config)
            .map_err(|e| path_error("save_path", e))?;

        let bytes = ctx.client.download(url)?;
        std::fs::write(&target, &bytes)
            .map_err(|e| ToolError::unknown(format!("Failed to write {}: {e}", target.display())))?;

        info!("Downloaded {} bytes to {:?}", bytes.len(), target);
        Ok(json!({
            "success": true,
            "message": format!("Attachment downloaded to {}", params.save_path),
            "file_size": bytes.len(),
        }))
    }
}
