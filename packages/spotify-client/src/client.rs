//! Spotify accounts-service client implementation

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::error::{SpotifyError, SpotifyResult};
use crate::models::{ErrorResponse, TokenGrant};

/// Spotify accounts-service token endpoint
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default number of retry attempts for transient failures
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds)
const RETRY_BASE_DELAY_MS: u64 = 100;

/// Spotify accounts-service token client
#[derive(Clone)]
pub struct SpotifyClient {
    http_client: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    max_retries: u32,
}

impl fmt::Debug for SpotifyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl SpotifyClient {
    /// Create a new client with the given application credentials
    ///
    /// # Errors
    /// Returns `SpotifyError::MissingCredentials` if either credential is empty
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> SpotifyResult<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(SpotifyError::MissingCredentials);
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .user_agent("radiolink/1.0")
            .build()?;

        Ok(Self {
            http_client,
            client_id,
            client_secret,
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Create a client from environment variables
    ///
    /// Reads `SPOTIFY_CLIENT_ID` and `SPOTIFY_CLIENT_SECRET`.
    ///
    /// # Errors
    /// Returns `SpotifyError::MissingCredentials` if either variable is
    /// unset or empty
    pub fn from_env() -> SpotifyResult<Self> {
        let client_id = std::env::var("SPOTIFY_CLIENT_ID").unwrap_or_default();
        let client_secret = std::env::var("SPOTIFY_CLIENT_SECRET").unwrap_or_default();
        Self::new(client_id, client_secret)
    }

    /// Override the token endpoint URL (tests point this at a mock server)
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Execute an operation with retry logic for transient failures
    async fn with_retry<T, F, Fut>(&self, operation: F) -> SpotifyResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = SpotifyResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay_ms = RETRY_BASE_DELAY_MS * 2u64.pow(attempt);
                    warn!(
                        attempt = attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay_ms,
                        error = %e,
                        "Spotify token request failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// POST the refresh grant and return the raw response body
    async fn request_refresh(&self, refresh_token: &str) -> SpotifyResult<String> {
        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SpotifyError::Timeout
                } else {
                    SpotifyError::Http(e)
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Spotify accounts service rate limited");
            return Err(SpotifyError::RateLimited);
        }
        if status.is_server_error() {
            warn!(status = status.as_u16(), "Spotify accounts service server error");
            return Err(SpotifyError::Server(status.as_u16()));
        }

        response.text().await.map_err(SpotifyError::Http)
    }

    /// Exchange a refresh token for a fresh access token
    ///
    /// # Errors
    /// - `SpotifyError::MissingRefreshToken` - if the refresh token is empty
    /// - `SpotifyError::Refused` - if the accounts service rejected the grant
    ///   (e.g. the token was revoked); not retried
    /// - `SpotifyError::Http` / `Timeout` / `RateLimited` - transport
    ///   failures, retried with backoff before surfacing
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> SpotifyResult<TokenGrant> {
        if refresh_token.is_empty() {
            return Err(SpotifyError::MissingRefreshToken);
        }

        debug!("Requesting access-token refresh");

        let text = self
            .with_retry(|| async { self.request_refresh(refresh_token).await })
            .await?;

        // Error bodies carry an "error" field the success shape lacks
        if let Ok(refused) = serde_json::from_str::<ErrorResponse>(&text) {
            warn!(error = %refused.error, "Spotify refused the refresh grant");
            return Err(SpotifyError::Refused {
                error: refused.error,
                description: refused.error_description,
            });
        }

        let grant: TokenGrant = serde_json::from_str(&text)?;

        debug!(
            expires_in = grant.expires_in,
            rotated_refresh_token = grant.refresh_token.is_some(),
            "Token refresh succeeded"
        );

        Ok(grant)
    }
}
