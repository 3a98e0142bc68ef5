//! JQL conversion client.
//!
//! Jira Cloud rewrites username references in JQL to account ids through
//! `POST /rest/api/3/jql/pdcleaner`. Sending `assignee = "alice"` comes back
//! as `assignee = "account:5b10..."`.

use std::collections::HashMap;
use std::future::Future;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::query::build_jql;
use crate::error::{ResolveError, Result};

const CONVERSION_PATH: &str = "/rest/api/3/jql/pdcleaner";

/// Resolves a username to the raw JQL text that carries its account id.
pub trait JqlConverter: Send + Sync + 'static {
    fn convert(&self, username: &str) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JqlConversionRequest {
    pub query_strings: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JqlConversionResponse {
    pub query_strings: Vec<ConvertedQuery>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedQuery {
    pub query: String,
    pub converted_query: String,
    #[serde(default)]
    pub user_messages: Vec<UserMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessage {
    pub message_key: String,
    #[serde(default)]
    pub message_args: HashMap<String, String>,
}

/// How requests authenticate against Jira.
#[derive(Clone)]
pub enum JiraAuth {
    Bearer(String),
    Basic { email: String, api_key: String },
}

impl std::fmt::Debug for JiraAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::Basic { email, .. } => f
                .debug_struct("Basic")
                .field("email", email)
                .field("api_key", &"<redacted>")
                .finish(),
        }
    }
}

/// [`JqlConverter`] backed by the Jira REST API.
#[derive(Debug, Clone)]
pub struct HttpConverter {
    http: Client,
    endpoint: Url,
    auth: JiraAuth,
}

impl HttpConverter {
    /// Build a converter for `domain`, e.g. `https://acme.atlassian.net`.
    pub fn new(domain: &str, auth: JiraAuth, verify_ssl: bool) -> Result<Self> {
        let endpoint = Url::parse(&format!(
            "{}{}",
            domain.trim_end_matches('/'),
            CONVERSION_PATH
        ))?;

        let http = Client::builder()
            .danger_accept_invalid_certs(!verify_ssl)
            .build()?;

        Ok(Self {
            http,
            endpoint,
            auth,
        })
    }
}

impl JqlConverter for HttpConverter {
    async fn convert(&self, username: &str) -> Result<String> {
        let body = JqlConversionRequest {
            query_strings: vec![build_jql("assignee", username)],
        };

        let request = self.http.post(self.endpoint.clone()).json(&body);
        let request = match &self.auth {
            JiraAuth::Bearer(token) => request.bearer_auth(token),
            JiraAuth::Basic { email, api_key } => request.basic_auth(email, Some(api_key)),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ResolveError::Status {
                status,
                body,
                url: self.endpoint.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        let converted: JqlConversionResponse = serde_json::from_slice(&bytes)?;
        debug!(
            username,
            results = converted.query_strings.len(),
            "jql conversion response"
        );

        converted
            .query_strings
            .into_iter()
            .next()
            .map(|q| q.converted_query)
            .ok_or_else(|| ResolveError::NoResult {
                username: username.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};

    use super::*;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn converted(query: &str, converted_query: &str) -> JqlConversionResponse {
        JqlConversionResponse {
            query_strings: vec![ConvertedQuery {
                query: query.to_string(),
                converted_query: converted_query.to_string(),
                user_messages: vec![],
            }],
        }
    }

    async fn pdcleaner(
        headers: HeaderMap,
        Json(request): Json<JqlConversionRequest>,
    ) -> axum::response::Response {
        let authorized = headers
            .get(header::AUTHORIZATION)
            .is_some_and(|v| v == "Bearer secret-token");
        if !authorized || request.query_strings != [r#"assignee = "testuser""#] {
            return StatusCode::BAD_REQUEST.into_response();
        }

        Json(converted(
            &request.query_strings[0],
            r#"assignee = "account:5b10ac8d82e05b22cc7d4ef5""#,
        ))
        .into_response()
    }

    #[tokio::test]
    async fn test_convert_posts_assignee_query() {
        let domain = serve(Router::new().route(CONVERSION_PATH, post(pdcleaner))).await;
        let converter =
            HttpConverter::new(&domain, JiraAuth::Bearer("secret-token".into()), true).unwrap();

        let raw = converter.convert("testuser").await.unwrap();
        assert_eq!(raw, r#"assignee = "account:5b10ac8d82e05b22cc7d4ef5""#);
    }

    #[tokio::test]
    async fn test_convert_reports_status_errors() {
        let app = Router::new().route(
            CONVERSION_PATH,
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error") }),
        );
        let domain = serve(app).await;
        let auth = JiraAuth::Basic {
            email: "me@example.com".into(),
            api_key: "key".into(),
        };
        let converter = HttpConverter::new(&domain, auth, true).unwrap();

        let err = converter.convert("testuser").await.unwrap_err();
        assert!(matches!(err, ResolveError::Status { .. }));
        let message = err.to_string();
        assert!(message.starts_with("JIRA API POST error - 500 Internal Server Error"));
        assert!(message.contains(CONVERSION_PATH));
    }

    #[tokio::test]
    async fn test_convert_empty_result_is_an_error() {
        let app = Router::new().route(
            CONVERSION_PATH,
            post(|| async {
                Json(JqlConversionResponse {
                    query_strings: vec![],
                })
            }),
        );
        let domain = serve(app).await;
        let converter =
            HttpConverter::new(&domain, JiraAuth::Bearer("t".into()), true).unwrap();

        let err = converter.convert("testuser").await.unwrap_err();
        assert_eq!(err.to_string(), "no conversion result for username: testuser");
    }

    #[test]
    fn test_domain_must_be_a_url() {
        let err = HttpConverter::new("not a url", JiraAuth::Bearer("t".into()), true).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidDomain(_)));
    }
}
