//! Common utilities shared across Jira tools.
//!
//! Key validation, Atlassian Document Format conversion and the small
//! reshaping helpers every tool uses to turn Jira's verbose JSON into
//! compact summaries.

use serde_json::{Value, json};

use crate::domains::tools::error::{ToolError, ToolResult};

/// Upper bound for `limit` parameters.
pub const MAX_LIMIT: i64 = 100;

/// Length at which long descriptions are cut in list results.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 200;

/// Field commonly holding story points on Jira Cloud.
pub const STORY_POINTS_FIELD: &str = "customfield_10016";

/// Default limit for search results.
pub fn default_limit() -> i64 {
    10
}

/// Clamp a limit to the allowed range (1-100).
pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_LIMIT)
}

// ============================================================================
// Validation
// ============================================================================

/// Check if a string is a project key: an uppercase letter followed by
/// uppercase letters, digits or underscores. Example: `KW`, `OPS_2`.
pub fn is_project_key(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Check if a string is an issue key: a project key, a dash and a number.
/// Example: `KW-123`.
pub fn is_issue_key(value: &str) -> bool {
    match value.rsplit_once('-') {
        Some((project, number)) => {
            is_project_key(project)
                && !number.is_empty()
                && number.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

pub fn ensure_issue_key(parameter: &str, value: &str) -> ToolResult<()> {
    if is_issue_key(value) {
        Ok(())
    } else {
        Err(ToolError::invalid(parameter, "issue key like PROJ-123"))
    }
}

pub fn ensure_project_key(parameter: &str, value: &str) -> ToolResult<()> {
    if is_project_key(value) {
        Ok(())
    } else {
        Err(ToolError::invalid(parameter, "project key like PROJ"))
    }
}

/// Board, sprint and version ids are numeric and end up in URL paths.
pub fn ensure_numeric_id(parameter: &str, value: &str) -> ToolResult<()> {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ToolError::invalid(parameter, "numeric id"))
    }
}

/// `"null"` (any case) or an empty string means "clear the field".
pub fn is_null_token(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("null")
}

// ============================================================================
// Atlassian Document Format
// ============================================================================

/// Wrap plain text in a single-paragraph ADF document.
pub fn adf_paragraph(text: &str) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [{
            "type": "paragraph",
            "content": [{ "type": "text", "text": text }]
        }]
    })
}

/// Flatten an ADF document (or a legacy plain string) to text.
///
/// Top-level blocks are separated by newlines.
pub fn adf_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) => value
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .map(|block| {
                        let mut text = String::new();
                        collect_inline_text(block, &mut text);
                        text
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn collect_inline_text(node: &Value, out: &mut String) {
    if let Some(text) = node.get("text").and_then(Value::as_str) {
        out.push_str(text);
    }
    if node.get("type").and_then(Value::as_str) == Some("hardBreak") {
        out.push('\n');
    }
    if let Some(children) = node.get("content").and_then(Value::as_array) {
        for child in children {
            collect_inline_text(child, out);
        }
    }
}

/// Cut text to `max_chars` characters, appending `...` when shortened.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

// ============================================================================
// Reshaping
// ============================================================================

/// `issue.fields`, or `null` when absent.
pub fn fields(issue: &Value) -> &Value {
    issue.get("fields").unwrap_or(&Value::Null)
}

/// `object.<field>.name`, or `null`.
pub fn name_of(object: &Value, field: &str) -> Value {
    object
        .get(field)
        .and_then(|f| f.get("name"))
        .cloned()
        .unwrap_or(Value::Null)
}

/// `object.<field>.displayName`, or `null`.
pub fn display_name_of(object: &Value, field: &str) -> Value {
    object
        .get(field)
        .and_then(|f| f.get("displayName"))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Assignee display name, `"Unassigned"` when nobody is assigned.
pub fn assignee_name(fields: &Value) -> Value {
    match fields.get("assignee") {
        Some(assignee) if !assignee.is_null() => assignee
            .get("displayName")
            .cloned()
            .unwrap_or_else(|| Value::from("Unassigned")),
        _ => Value::from("Unassigned"),
    }
}

/// Copy a field, or `null`.
pub fn get_or_null(object: &Value, field: &str) -> Value {
    object.get(field).cloned().unwrap_or(Value::Null)
}

/// Copy a field, or the given fallback when absent or `null`.
pub fn get_or(object: &Value, field: &str, fallback: Value) -> Value {
    match object.get(field) {
        Some(value) if !value.is_null() => value.clone(),
        _ => fallback,
    }
}

/// Description as plain text, empty when absent.
pub fn description_text(fields: &Value) -> String {
    fields.get("description").map(adf_to_text).unwrap_or_default()
}

/// Elements of a JSON array field, empty when absent.
pub fn array_of<'a>(object: &'a Value, field: &str) -> &'a [Value] {
    object
        .get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// A top-level JSON array, empty for any other shape.
pub fn as_slice(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or(&[])
}

/// Summary for tools that act on several issues and report each one.
///
/// Each result carries a `status` of `"success"` or `"error"`.
pub fn batch_summary(total: usize, results: Vec<Value>) -> Value {
    let successful = results
        .iter()
        .filter(|r| r.get("status").and_then(Value::as_str) == Some("success"))
        .count();
    json!({
        "total_issues": total,
        "successful": successful,
        "failed": total - successful,
        "results": results,
    })
}

/// Round to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Seconds to hours, rounded to two decimals.
pub fn seconds_to_hours(seconds: i64) -> f64 {
    round2(seconds as f64 / 3600.0)
}
