//! GitHub REST API access.
//!
//! [`GithubApi`] issues authenticated GET requests built from path segments
//! and classifies the answer: 200 yields the decoded body, 403 becomes
//! [`ApiError::Auth`], anything else [`ApiError::Http`]. Failures are
//! returned immediately, there are no retries.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Request, StatusCode};
use serde_json::Value;

use crate::error::ApiError;
use crate::record::{TrafficKind, TrafficRecord};
use crate::token::TokenProvider;

/// Public GitHub REST endpoint.
pub const GITHUB_API_BASE: &str = "https://api.github.com/";

const USER_AGENT: &str = concat!("github-traffic/", env!("CARGO_PKG_VERSION"));

/// Decoded body and headers of a successful request.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub body: Value,
    pub headers: HashMap<String, String>,
}

/// Fetches JSON documents addressed by path segments.
pub trait Fetch {
    fn fetch_json(
        &self,
        segments: &[&str],
    ) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send;
}

/// Builds the HTTP client used for GitHub requests.
///
/// The timeout is the only bound on how long a request may block.
pub fn build_client(timeout: Duration) -> Result<Client, ApiError> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

/// GitHub API accessor.
#[derive(Debug, Clone)]
pub struct GithubApi<T> {
    client: Client,
    base_url: String,
    token: T,
}

impl<T: TokenProvider> GithubApi<T> {
    pub fn new(client: Client, token: T) -> Self {
        Self {
            client,
            base_url: GITHUB_API_BASE.to_string(),
            token,
        }
    }

    /// Points the accessor at another endpoint, e.g. a GitHub Enterprise host.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        self.base_url = base;
        self
    }

    pub fn url(&self, segments: &[&str]) -> String {
        format!("{}{}", self.base_url, segments.join("/"))
    }

    /// Builds the GET request for `segments`, authorized when a token is
    /// available.
    pub fn request(&self, segments: &[&str]) -> Result<Request, ApiError> {
        let mut request = self.client.get(self.url(segments));

        if let Some(token) = self.token.token() {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }

        Ok(request.build()?)
    }
}

impl<T: TokenProvider> Fetch for GithubApi<T> {
    async fn fetch_json(&self, segments: &[&str]) -> Result<ApiResponse, ApiError> {
        let request = self.request(segments)?;
        let url = request.url().to_string();

        tracing::debug!(url = %url, "GET");
        let response = self.client.execute(request).await?;
        check_status(response.status(), &url)?;

        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|val| (k.as_str().to_string(), val.to_string()))
            })
            .collect();

        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes)?;

        Ok(ApiResponse { body, headers })
    }
}

fn check_status(status: StatusCode, url: &str) -> Result<(), ApiError> {
    match status {
        StatusCode::OK => Ok(()),
        StatusCode::FORBIDDEN => Err(ApiError::Auth),
        other => Err(ApiError::Http {
            status: other.as_u16(),
            reason: other.canonical_reason().unwrap_or("Unknown").to_string(),
            url: url.to_string(),
        }),
    }
}

/// Fetches one kind of daily traffic for `org/repo`.
pub async fn get_traffic<F: Fetch>(
    api: &F,
    kind: TrafficKind,
    org: &str,
    repo: &str,
) -> Result<Vec<TrafficRecord>, ApiError> {
    let response = api
        .fetch_json(&["repos", org, repo, "traffic", kind.as_str()])
        .await?;
    records_from_body(response.body, kind)
}

/// Daily page views of `org/repo`.
pub async fn get_views<F: Fetch>(
    api: &F,
    org: &str,
    repo: &str,
) -> Result<Vec<TrafficRecord>, ApiError> {
    get_traffic(api, TrafficKind::Views, org, repo).await
}

/// Daily clones of `org/repo`.
pub async fn get_clones<F: Fetch>(
    api: &F,
    org: &str,
    repo: &str,
) -> Result<Vec<TrafficRecord>, ApiError> {
    get_traffic(api, TrafficKind::Clones, org, repo).await
}

fn records_from_body(mut body: Value, kind: TrafficKind) -> Result<Vec<TrafficRecord>, ApiError> {
    let records = body
        .get_mut(kind.as_str())
        .map(Value::take)
        .ok_or(ApiError::MissingField(kind.as_str()))?;

    Ok(serde_json::from_value(records)?)
}
