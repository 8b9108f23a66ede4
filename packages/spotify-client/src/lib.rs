//! Spotify accounts-service client for radiolink
//!
//! This crate wraps the single accounts-service operation the relay
//! consumes: exchanging a refresh token for a fresh access token.
//!
//! # Example
//!
//! ```rust,no_run
//! use radiolink_spotify_client::SpotifyClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SpotifyClient::new("client_id", "client_secret")?;
//!
//! let grant = client.refresh("stored_refresh_token").await?;
//! println!("access token valid for {}s", grant.expires_in);
//! # Ok(())
//! # }
//! ```
//!
//! # Environment Variables
//!
//! - `SPOTIFY_CLIENT_ID`: application client id (required)
//! - `SPOTIFY_CLIENT_SECRET`: application client secret (required)

mod client;
mod error;
mod models;

pub use client::SpotifyClient;
pub use error::{SpotifyError, SpotifyResult};
pub use models::TokenGrant;
