//! Domains module containing business logic organized by bounded contexts.
//!
//! - **jira**: the remote client for the Jira REST API
//! - **tools**: the tool catalog, argument coercion and dispatch

pub mod jira;
pub mod tools;
