use std::net::SocketAddr;

use axum::{routing::get, Extension, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use radiolink_relay::config::Config;
use radiolink_relay::routes::health_router;
use radiolink_relay::state::RelayState;
use radiolink_relay::storage::TokenStore;
use radiolink_relay::websocket::handler::ws_handler;
use radiolink_spotify_client::SpotifyClient;

/// Build the CORS layer based on configuration.
///
/// With `CORS_ORIGINS` set, only those origins are allowed. Without it,
/// production rejects cross-origin requests while development stays
/// permissive for convenience.
fn build_cors_layer(config: &Config) -> CorsLayer {
    match &config.cors_allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let allowed_origins: Vec<axum::http::HeaderValue> = origins
                .iter()
                .filter_map(|origin| {
                    origin.parse().ok().or_else(|| {
                        tracing::warn!("Invalid CORS origin '{}', skipping", origin);
                        None
                    })
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::error!("No valid CORS origins configured, CORS requests will be rejected");
                CorsLayer::new()
            } else {
                tracing::info!(
                    "CORS configured with {} allowed origin(s)",
                    allowed_origins.len()
                );
                CorsLayer::new().allow_origin(allowed_origins)
            }
        }
        _ if config.is_production() => {
            tracing::warn!(
                "CORS_ORIGINS not configured in production mode. \
                 CORS requests will be rejected."
            );
            CorsLayer::new()
        }
        _ => {
            tracing::warn!(
                "Using permissive CORS in development mode. \
                 Set CORS_ORIGINS for production-like behavior."
            );
            CorsLayer::permissive()
        }
    }
}

/// Build the provider client from configuration
fn build_spotify_client(config: &Config) -> anyhow::Result<Option<SpotifyClient>> {
    let Some(credentials) = &config.spotify else {
        return Ok(None);
    };

    let mut client = SpotifyClient::new(
        credentials.client_id.clone(),
        credentials.client_secret.clone(),
    )?;
    if let Some(token_url) = &config.spotify_token_url {
        client = client.with_token_url(token_url.clone());
    }
    Ok(Some(client))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "radiolink_relay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!(
        environment = %config.environment,
        "Starting radiolink relay on port {}",
        config.port
    );

    let store = TokenStore::new(&config.data_dir);
    let spotify = build_spotify_client(&config)?;
    let state = RelayState::new(spotify, store, config.settle_delay);

    // Load any previously persisted token set
    state.load_tokens().await;

    let cors_layer = build_cors_layer(&config);

    // Build the router
    let app = Router::new()
        .route("/", get(root))
        .route("/ws", get(ws_handler))
        .nest("/health", health_router(state.clone()))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn root() -> &'static str {
    "radiolink - remote control relay for a shared audio player"
}
