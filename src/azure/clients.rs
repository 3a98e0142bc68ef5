//! Per-subscription Log Analytics clients.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::credentials::ClientSecretCredential;
use super::query::{QueryRequest, QueryResponse, TableResp, normalize};
use crate::cache::{ExpiringCache, LazyPool};
use crate::error::ClientError;

const LOGS_ENDPOINT: &str = "https://api.loganalytics.io/v1/";
const LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com/";

const LOGS_SCOPE: &str = "https://api.loganalytics.io/.default";

/// Cached tokens are dropped this long before the service expires them.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Base URLs for the token and query services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureEndpoints {
    /// Log Analytics API root, ending in `/`.
    pub logs: String,
    /// Identity authority; the tenant id is appended to it.
    pub login: String,
}

impl Default for AzureEndpoints {
    fn default() -> Self {
        Self {
            logs: LOGS_ENDPOINT.to_string(),
            login: LOGIN_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Authenticated client for one subscription's Log Analytics workspaces.
#[derive(Debug)]
pub struct LogsClient {
    subscription_id: String,
    credential: ClientSecretCredential,
    endpoint: Url,
    token_url: Url,
    http: Client,
    tokens: ExpiringCache<String>,
}

impl LogsClient {
    /// Query endpoint for `workspace_id`.
    pub fn query_url(&self, workspace_id: &str) -> Result<Url, ClientError> {
        Ok(self
            .endpoint
            .join(&format!("workspaces/{workspace_id}/query"))?)
    }

    /// Run `target`'s query and flatten the single result table.
    pub async fn query(&self, target: &QueryTarget) -> Result<TableResp, ClientError> {
        let response = self
            .send_query(target)
            .await
            .map_err(|source| ClientError::Query {
                workspace_id: target.workspace_id.clone(),
                source: Box::new(source),
            })?;

        normalize(response, &target.columns, &target.query)
    }

    async fn send_query(&self, target: &QueryTarget) -> Result<QueryResponse, ClientError> {
        let token = self.access_token().await?;
        let url = self.query_url(&target.workspace_id)?;

        let response = self
            .http
            .post(url.clone())
            .bearer_auth(token)
            .json(&QueryRequest {
                query: &target.query,
            })
            .send()
            .await?;

        Ok(ensure_success(response, &url).await?.json().await?)
    }

    /// Bearer token for the logs API, reused until shortly before expiry.
    async fn access_token(&self) -> Result<String, ClientError> {
        if let Some(token) = self.tokens.get(LOGS_SCOPE) {
            return Ok(token);
        }

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credential.client_id.as_str()),
            ("client_secret", self.credential.client_secret()),
            ("scope", LOGS_SCOPE),
        ];
        let response = self
            .http
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await?;
        let token: TokenResponse = ensure_success(response, &self.token_url)
            .await?
            .json()
            .await?;

        let ttl = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        self.tokens
            .insert(LOGS_SCOPE, token.access_token.clone(), ttl);
        debug!(subscription = %self.subscription_id, ?ttl, "fetched access token");

        Ok(token.access_token)
    }
}

async fn ensure_success(response: Response, url: &Url) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status,
        body,
        url: url.to_string(),
    })
}

/// Build a client for `subscription_id`.
///
/// Fails without credentials; nothing is retained on failure.
pub fn create_logs_client(
    credential: Option<&ClientSecretCredential>,
    subscription_id: &str,
    endpoints: &AzureEndpoints,
) -> Result<LogsClient, ClientError> {
    let credential = credential.ok_or_else(|| ClientError::MissingCredentials {
        subscription_id: subscription_id.to_string(),
    })?;

    let endpoint = Url::parse(&endpoints.logs)?;
    let token_url = Url::parse(&endpoints.login)?
        .join(&format!("{}/oauth2/v2.0/token", credential.tenant_id))?;

    let http = Client::builder()
        .user_agent(concat!("dashcache/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|source| ClientError::Build {
            subscription_id: subscription_id.to_string(),
            source,
        })?;

    Ok(LogsClient {
        subscription_id: subscription_id.to_string(),
        credential: credential.clone(),
        endpoint,
        token_url,
        http,
        tokens: ExpiringCache::new(format!("tokens:{subscription_id}")),
    })
}

/// What a widget queries and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTarget {
    pub subscription_id: String,
    pub workspace_id: String,
    /// KQL text.
    pub query: String,
    /// Header shown above the rows; empty uses the result's column names.
    pub columns: Vec<String>,
}

impl QueryTarget {
    /// Both ids must be configured before any client is requested.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.workspace_id.is_empty() {
            return Err(ClientError::MissingField("workspace ID"));
        }
        if self.subscription_id.is_empty() {
            return Err(ClientError::MissingField("subscription ID"));
        }
        Ok(())
    }
}

/// Logs clients shared by every widget, keyed by subscription id.
#[derive(Debug)]
pub struct LogsClients {
    credential: Option<ClientSecretCredential>,
    endpoints: AzureEndpoints,
    pool: LazyPool<LogsClient>,
}

impl LogsClients {
    pub fn new(credential: Option<ClientSecretCredential>, endpoints: AzureEndpoints) -> Self {
        if credential.is_none() {
            info!("No Azure client secret credential configured");
        }
        Self {
            credential,
            endpoints,
            pool: LazyPool::new("logs_clients"),
        }
    }

    /// Client for `target`'s subscription, built on first use.
    pub fn client_for(&self, target: &QueryTarget) -> Result<Arc<LogsClient>, ClientError> {
        target.validate()?;
        self.pool.get_or_create(&target.subscription_id, || {
            create_logs_client(
                self.credential.as_ref(),
                &target.subscription_id,
                &self.endpoints,
            )
        })
    }

    /// Run `target`'s query on its subscription's shared client.
    pub async fn run_query(&self, target: &QueryTarget) -> Result<TableResp, ClientError> {
        let client = self.client_for(target)?;
        client.query(target).await
    }

    /// Number of clients built so far.
    pub fn len(&self) -> usize {
        self.pool.len()
    }
}
