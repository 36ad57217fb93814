use cas_client::{build_http_client, RetryConfig};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::info;
use url::Url;
use xet_config::xet_config;

use crate::errors::{DataClientError, Result};

pub const DEFAULT_HUB_ENDPOINT: &str = "https://huggingface.co";

/// A repository coordinate on the hub.
#[derive(Debug, Clone)]
pub struct HubRepo {
    /// `model`, `dataset` or `space`; pluralized into the API path.
    pub repo_type: String,
    pub repo_id: String,
    pub revision: String,
}

impl HubRepo {
    pub fn model(repo_id: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            repo_type: "model".to_owned(),
            repo_id: repo_id.into(),
            revision: revision.into(),
        }
    }
}

/// Short-lived read credentials for a repo's CAS data.
#[derive(Debug, Clone, Deserialize)]
pub struct XetReadToken {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "casUrl")]
    pub cas_url: String,
    /// Unix timestamp (seconds) when the access token expires.
    pub exp: u64,
}

/// Exchanges a hub token for CAS read credentials.
///
/// `GET {hub}/api/{repo_type}s/{repo_id}/xet-read-token/{revision}` with the
/// hub token as bearer auth; public repos work without one.
pub async fn fetch_xet_read_token(
    hub_endpoint: &str,
    repo: &HubRepo,
    hub_token: Option<&str>,
) -> Result<XetReadToken> {
    let url = Url::parse(&format!(
        "{}/api/{}s/{}/xet-read-token/{}",
        hub_endpoint.trim_end_matches('/'),
        repo.repo_type,
        repo.repo_id,
        repo.revision
    ))
    .map_err(|e| DataClientError::ParameterError(format!("invalid hub endpoint: {e}")))?;

    let user_agent = xet_config().client.http_user_agent.clone();
    let client = build_http_client(RetryConfig::default(), &user_agent).map_err(DataClientError::from)?;

    let mut request = client.get(url);
    if let Some(token) = hub_token {
        request = request.header(AUTHORIZATION, format!("Bearer {token}"));
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DataClientError::TokenExchangeError(format!(
            "hub returned status {status} for {}/{}",
            repo.repo_type, repo.repo_id
        )));
    }

    let token: XetReadToken = response
        .json()
        .await
        .map_err(|e| DataClientError::TokenExchangeError(format!("malformed token response: {e}")))?;

    info!(repo_id = %repo.repo_id, cas_url = %token.cas_url, exp = token.exp, "Obtained xet read token");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use httpmock::Method::GET;
    use httpmock::MockServer;

    use super::*;

    #[tokio::test]
    async fn test_token_exchange_parses_response() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/models/org/repo/xet-read-token/main")
                .header("authorization", "Bearer hub-token");
            then.status(200).json_body(serde_json::json!({
                "accessToken": "cas-token",
                "casUrl": "https://cas.example.invalid",
                "exp": 1_750_000_000u64,
            }));
        });

        let repo = HubRepo::model("org/repo", "main");
        let token = fetch_xet_read_token(&server.base_url(), &repo, Some("hub-token")).await.unwrap();

        assert_eq!(token.access_token, "cas-token");
        assert_eq!(token.cas_url, "https://cas.example.invalid");
        assert_eq!(token.exp, 1_750_000_000);
        mock.assert();
    }

    #[tokio::test]
    async fn test_token_exchange_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path_contains("xet-read-token");
            then.status(401);
        });

        let repo = HubRepo::model("org/private", "main");
        let err = fetch_xet_read_token(&server.base_url(), &repo, None).await.unwrap_err();
        assert!(matches!(err, DataClientError::TokenExchangeError(_)));
    }
}
