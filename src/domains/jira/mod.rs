//! Jira REST API client.
//!
//! Every tool talks to the remote tracker through [`JiraClient`].

pub mod client;
pub mod error;

pub use client::{JiraAuth, JiraClient};
pub use error::{JiraError, JiraResult};
