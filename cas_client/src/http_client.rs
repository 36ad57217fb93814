use std::time::Duration;

use http::header::AUTHORIZATION;
use http::{Extensions, HeaderValue};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use utils::AuthConfig;
use xet_config::xet_config;

use crate::error::{CasClientError, Result};

/// Retry policy for metadata API calls. `no_retries` is used on the term
/// download path, where the error classification is surfaced to the caller
/// instead of retried internally.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let config = &xet_config().client;
        Self {
            max_retries: config.retry_max_attempts,
            min_backoff: Duration::from_millis(config.retry_base_delay_ms),
            max_backoff: Duration::from_millis(config.retry_max_delay_ms),
        }
    }
}

impl RetryConfig {
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Injects a bearer token on every request.
struct AuthMiddleware {
    auth_header: HeaderValue,
}

impl AuthMiddleware {
    fn new(auth: &AuthConfig) -> Result<Self> {
        let mut auth_header = HeaderValue::from_str(&format!("Bearer {}", auth.token))
            .map_err(|e| CasClientError::InvalidArguments(format!("invalid auth token: {e}")))?;
        auth_header.set_sensitive(true);
        Ok(Self { auth_header })
    }
}

#[async_trait::async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: reqwest::Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        req.headers_mut().insert(AUTHORIZATION, self.auth_header.clone());
        next.run(req, extensions).await
    }
}

fn base_client(user_agent: &str) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if !user_agent.is_empty() {
        builder = builder.user_agent(user_agent);
    }
    builder.build().map_err(CasClientError::from)
}

/// Builds an HTTP client with transient-error retries per `retry_config`.
pub fn build_http_client(retry_config: RetryConfig, user_agent: &str) -> Result<ClientWithMiddleware> {
    build_auth_http_client(&None, retry_config, user_agent)
}

/// Builds an HTTP client with optional bearer auth and transient-error
/// retries per `retry_config`.
pub fn build_auth_http_client(
    auth: &Option<AuthConfig>,
    retry_config: RetryConfig,
    user_agent: &str,
) -> Result<ClientWithMiddleware> {
    let mut builder = ClientBuilder::new(base_client(user_agent)?);

    if retry_config.max_retries > 0 {
        let policy = ExponentialBackoff::builder()
            .retry_bounds(retry_config.min_backoff, retry_config.max_backoff)
            .build_with_max_retries(retry_config.max_retries);
        builder = builder.with(RetryTransientMiddleware::new_with_policy(policy));
    }

    if let Some(auth) = auth {
        builder = builder.with(AuthMiddleware::new(auth)?);
    }

    Ok(builder.build())
}
