//! Jira issue widget plumbing.
//!
//! Issue searches are scoped by account id, not username. `AccountIds`
//! turns configured usernames into account ids through the JQL conversion
//! endpoint and keeps each answer in an `ExpiringCache`.

mod accounts;
mod converter;
mod query;

pub use accounts::AccountIds;
pub use converter::{HttpConverter, JiraAuth, JqlConverter};
pub use query::search_jql;
