//! JQL composition for the issues widget.

use super::accounts::AccountIds;
use super::converter::JqlConverter;
use crate::cache::Clock;
use crate::error::{ResolveError, Result};

/// `key = "value"`.
pub fn build_jql(key: &str, value: &str) -> String {
    format!("{key} = \"{value}\"")
}

/// Clause restricting a search to `projects`, if any are configured.
pub fn project_clause(projects: &[String]) -> Option<String> {
    match projects {
        [] => None,
        [project] if project.is_empty() => None,
        [project] => Some(build_jql("project", project)),
        _ => {
            let quoted: Vec<String> = projects.iter().map(|p| format!("\"{p}\"")).collect();
            Some(format!("project in ({})", quoted.join(", ")))
        }
    }
}

/// Full search JQL: project clause, the user's assignee clause, then `jql`,
/// joined with `AND`. Empty parts are left out.
pub async fn search_jql<T, C>(
    accounts: &AccountIds<T, C>,
    username: &str,
    projects: &[String],
    jql: &str,
) -> Result<String>
where
    T: JqlConverter,
    C: Clock,
{
    let mut query = Vec::new();

    if let Some(clause) = project_clause(projects) {
        query.push(clause);
    }
    if !username.is_empty() {
        let clause = accounts
            .assignee_clause(username)
            .await
            .map_err(|source| ResolveError::Username {
                username: username.to_string(),
                source: Box::new(source),
            })?;
        query.push(clause);
    }
    if !jql.is_empty() {
        query.push(jql.to_string());
    }

    Ok(query.join(" AND "))
}
