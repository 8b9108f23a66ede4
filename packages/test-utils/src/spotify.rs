//! Mock Spotify accounts service for token-refresh tests
//!
//! Provides a [`MockSpotifyServer`] that simulates the accounts-service
//! token endpoint, including a call counter so tests can assert how many
//! refresh grants actually reached the provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Responder that counts how many requests it has served
struct CountingResponder {
    count: Arc<AtomicUsize>,
    template: ResponseTemplate,
}

impl Respond for CountingResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.template.clone()
    }
}

/// Mock Spotify accounts service
///
/// Wraps a [`wiremock::MockServer`] with convenience methods for the token
/// endpoint responses the relay exercises.
///
/// # Example
///
/// ```rust,ignore
/// use radiolink_test_utils::MockSpotifyServer;
///
/// #[tokio::test]
/// async fn test_refresh() {
///     let spotify = MockSpotifyServer::start().await;
///     spotify.mock_refresh_success("at-new", 3600).await;
///
///     // Configure your SpotifyClient with spotify.token_url()
///     assert_eq!(spotify.refresh_call_count(), 0);
/// }
/// ```
pub struct MockSpotifyServer {
    server: MockServer,
    refresh_call_count: Arc<AtomicUsize>,
}

impl MockSpotifyServer {
    /// Start a new mock accounts service
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            refresh_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the server base URL
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Get the token endpoint URL
    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.server.uri())
    }

    /// Number of refresh grants that reached the provider
    pub fn refresh_call_count(&self) -> usize {
        self.refresh_call_count.load(Ordering::SeqCst)
    }

    /// Mount a mock for a successful refresh grant
    ///
    /// The response omits `refresh_token`, matching Spotify's usual
    /// non-rotating behavior.
    pub async fn mock_refresh_success(&self, access_token: &str, expires_in: u64) {
        self.mount_counting(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "scope": "streaming user-read-playback-state",
            "expires_in": expires_in
        })))
        .await;
    }

    /// Mount a mock for a successful refresh grant that also rotates the
    /// refresh token
    pub async fn mock_refresh_rotating(
        &self,
        access_token: &str,
        expires_in: u64,
        new_refresh_token: &str,
    ) {
        self.mount_counting(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": expires_in,
            "refresh_token": new_refresh_token
        })))
        .await;
    }

    /// Mount a mock for a refused grant (revoked refresh token)
    pub async fn mock_refresh_refused(&self) {
        self.mount_counting(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Refresh token revoked"
        })))
        .await;
    }

    /// Mount a mock for a refused grant that responds after a delay
    pub async fn mock_refresh_refused_delayed(&self, delay: Duration) {
        self.mount_counting(
            ResponseTemplate::new(400)
                .set_delay(delay)
                .set_body_json(json!({
                    "error": "invalid_grant",
                    "error_description": "Refresh token revoked"
                })),
        )
        .await;
    }

    /// Mount a mock for a successful refresh that responds after a delay
    ///
    /// Used to hold a refresh in flight while concurrent requests pile up.
    pub async fn mock_refresh_success_delayed(
        &self,
        access_token: &str,
        expires_in: u64,
        delay: Duration,
    ) {
        self.mount_counting(
            ResponseTemplate::new(200)
                .set_delay(delay)
                .set_body_json(json!({
                    "access_token": access_token,
                    "token_type": "Bearer",
                    "expires_in": expires_in
                })),
        )
        .await;
    }

    async fn mount_counting(&self, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(CountingResponder {
                count: Arc::clone(&self.refresh_call_count),
                template,
            })
            .mount(&self.server)
            .await;
    }
}
