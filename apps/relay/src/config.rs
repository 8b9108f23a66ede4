//! Relay server configuration

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Default settling delay before a joining remote gets the player roster
const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;

/// Application environment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "staging" | "stage" => Self::Staging,
            _ => Self::Development,
        })
    }
}

impl Environment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Spotify application credentials
#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Relay configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment mode (development, staging, production)
    pub environment: Environment,

    /// Server port (default: 8080)
    pub port: u16,

    /// Directory holding the persisted token document (default: ./data)
    pub data_dir: PathBuf,

    /// Spotify application credentials
    ///
    /// Required in production. In development the relay runs without them;
    /// token refreshes then degrade to Unauthorized broadcasts.
    pub spotify: Option<SpotifyCredentials>,

    /// Override for the accounts-service token endpoint (tests)
    pub spotify_token_url: Option<String>,

    /// Settling delay before a joining remote gets the player roster
    pub settle_delay: Duration,

    /// CORS allowed origins (optional)
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// In production mode `SPOTIFY_CLIENT_ID` and `SPOTIFY_CLIENT_SECRET`
    /// must be set; in development they may be omitted.
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_str(
            &env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        )
        .unwrap_or_default();

        let spotify = Self::load_spotify_credentials(environment.is_production())?;

        Ok(Self {
            environment,

            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid PORT value")?,

            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string())),

            spotify,

            spotify_token_url: env::var("SPOTIFY_TOKEN_URL").ok().filter(|s| !s.is_empty()),

            settle_delay: Duration::from_millis(
                env::var("SETTLE_DELAY_MS")
                    .unwrap_or_else(|_| DEFAULT_SETTLE_DELAY_MS.to_string())
                    .parse()
                    .context("Invalid SETTLE_DELAY_MS value")?,
            ),

            cors_allowed_origins: env::var("CORS_ORIGINS").ok().map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
        })
    }

    /// Load and validate the Spotify application credentials
    ///
    /// In production both variables must be set. In development missing
    /// credentials log a warning and the relay starts without a refresher.
    fn load_spotify_credentials(is_production: bool) -> Result<Option<SpotifyCredentials>> {
        let client_id = env::var("SPOTIFY_CLIENT_ID").unwrap_or_default();
        let client_secret = env::var("SPOTIFY_CLIENT_SECRET").unwrap_or_default();

        match (client_id.is_empty(), client_secret.is_empty()) {
            (false, false) => Ok(Some(SpotifyCredentials {
                client_id,
                client_secret,
            })),
            _ if is_production => {
                bail!(
                    "SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET are required in production. \
                     Without them token refreshes cannot succeed."
                );
            }
            _ => {
                tracing::warn!(
                    "Spotify credentials not set; token refreshes will fail. \
                     This is only acceptable in development mode."
                );
                Ok(None)
            }
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}
