//! Configuration module for dashcache.
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, bail};

use crate::azure::{AzureEndpoints, ClientSecretCredential, QueryTarget};
use crate::jira::JiraAuth;

/// Jira widget settings.
#[derive(Debug, Clone)]
pub struct JiraConfig {
    /// Base URL, e.g. `https://acme.atlassian.net`.
    pub domain: String,
    pub auth: JiraAuth,
    pub verify_ssl: bool,

    /// Usernames whose issues are shown (comma-separated).
    pub usernames: Vec<String>,
    pub projects: Vec<String>,
    /// Extra JQL appended to every search.
    pub jql: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub jira: JiraConfig,

    // Azure
    pub azure_credential: Option<ClientSecretCredential>,
    pub azure_target: Option<QueryTarget>,
    pub azure_endpoints: AzureEndpoints,

    /// How often widgets refresh.
    pub refresh_interval: Duration,
    /// How often expired cache entries are swept.
    pub sweep_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns error if `JIRA_DOMAIN` is unset, no Jira auth is configured,
    /// or a numeric/boolean variable does not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup<L>(lookup: L) -> anyhow::Result<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let domain = non_empty(&lookup, "JIRA_DOMAIN").context("JIRA_DOMAIN must be set")?;

        // Personal access token wins over email + API key
        let auth = match (
            non_empty(&lookup, "JIRA_PERSONAL_ACCESS_TOKEN"),
            non_empty(&lookup, "JIRA_EMAIL"),
            non_empty(&lookup, "JIRA_API_KEY"),
        ) {
            (Some(token), _, _) => JiraAuth::Bearer(token),
            (None, Some(email), Some(api_key)) => JiraAuth::Basic { email, api_key },
            _ => bail!("set JIRA_PERSONAL_ACCESS_TOKEN or both JIRA_EMAIL and JIRA_API_KEY"),
        };

        let verify_ssl = match non_empty(&lookup, "JIRA_VERIFY_SSL") {
            Some(v) => v
                .parse::<bool>()
                .with_context(|| format!("JIRA_VERIFY_SSL must be true or false, got {v}"))?,
            None => true,
        };

        let azure_target =
            non_empty(&lookup, "AZURE_SUBSCRIPTION_ID").map(|subscription_id| QueryTarget {
                subscription_id,
                workspace_id: lookup("AZURE_WORKSPACE_ID").unwrap_or_default(),
                query: lookup("AZURE_QUERY").unwrap_or_default(),
                columns: list(&lookup, "AZURE_COLUMNS"),
            });

        let defaults = AzureEndpoints::default();
        let azure_endpoints = AzureEndpoints {
            logs: non_empty(&lookup, "AZURE_LOGS_ENDPOINT").unwrap_or(defaults.logs),
            login: non_empty(&lookup, "AZURE_AUTHORITY_HOST").unwrap_or(defaults.login),
        };

        Ok(Self {
            jira: JiraConfig {
                domain,
                auth,
                verify_ssl,
                usernames: list(&lookup, "JIRA_USERNAMES"),
                projects: list(&lookup, "JIRA_PROJECTS"),
                jql: lookup("JIRA_JQL").unwrap_or_default(),
            },
            azure_credential: ClientSecretCredential::from_parts(
                lookup("AZURE_TENANT_ID"),
                lookup("AZURE_CLIENT_ID"),
                lookup("AZURE_CLIENT_SECRET"),
            ),
            azure_target,
            azure_endpoints,
            refresh_interval: seconds(&lookup, "REFRESH_INTERVAL_SECS", 60)?,
            sweep_interval: seconds(&lookup, "CACHE_SWEEP_SECS", 60)?,
        })
    }
}

fn non_empty<L: Fn(&str) -> Option<String>>(lookup: &L, key: &str) -> Option<String> {
    lookup(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn list<L: Fn(&str) -> Option<String>>(lookup: &L, key: &str) -> Vec<String> {
    split_list(&lookup(key).unwrap_or_default())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn seconds<L: Fn(&str) -> Option<String>>(
    lookup: &L,
    key: &str,
    default: u64,
) -> anyhow::Result<Duration> {
    let secs = match non_empty(lookup, key) {
        Some(v) => v
            .parse::<u64>()
            .with_context(|| format!("{key} must be a whole number of seconds, got {v}"))?,
        None => default,
    };
    if secs == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}
