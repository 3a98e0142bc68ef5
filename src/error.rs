//! Error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure to turn a username into an account id.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JIRA API POST error - {status}: {body} (URL: {url})")]
    Status {
        status: StatusCode,
        body: String,
        url: String,
    },

    #[error("failed to decode conversion response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid JIRA domain: {0}")]
    InvalidDomain(#[from] url::ParseError),

    #[error("no conversion result for username: {username}")]
    NoResult { username: String },

    #[error("failed to extract account ID from converted query: {raw}")]
    Extraction { raw: String },

    #[error("failed to convert username {username} to account ID: {source}")]
    Username {
        username: String,
        #[source]
        source: Box<ResolveError>,
    },
}

/// Failure to build or address a Log Analytics client.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(
        "azure credentials not initialized for subscription {subscription_id}: please set up authentication first"
    )]
    MissingCredentials { subscription_id: String },

    #[error("azure {0} is required but not configured")]
    MissingField(&'static str),

    #[error("failed to create Azure Logs client for subscription {subscription_id}: {source}")]
    Build {
        subscription_id: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid logs endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("azure API error - {status}: {body} (URL: {url})")]
    Status {
        status: StatusCode,
        body: String,
        url: String,
    },

    #[error("{code}: {message}")]
    Service { code: String, message: String },

    #[error("query returned no data tables: {query}")]
    NoTables { query: String },

    #[error("query returned {count} tables, expected 1: {query}")]
    TooManyTables { count: usize, query: String },

    #[error("query returned table with no columns: {query}")]
    NoColumns { query: String },

    #[error("failed to execute query on workspace {workspace_id}: {source}")]
    Query {
        workspace_id: String,
        #[source]
        source: Box<ClientError>,
    },
}

pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
