//! Shared test utilities for the radiolink workspace
//!
//! This crate provides mock implementations of external services for testing
//! without network dependencies.
//!
//! # Mock Services
//!
//! - [`MockSpotifyServer`] - Mock Spotify accounts service for token-refresh
//!   tests
//!
//! # Example
//!
//! ```rust,ignore
//! use radiolink_test_utils::MockSpotifyServer;
//!
//! #[tokio::test]
//! async fn test_with_mock_provider() {
//!     let spotify = MockSpotifyServer::start().await;
//!     spotify.mock_refresh_success("fresh-token", 3600).await;
//!
//!     // Point your SpotifyClient at spotify.token_url()
//! }
//! ```

mod spotify;

pub use spotify::MockSpotifyServer;
