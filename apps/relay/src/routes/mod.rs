//! HTTP route handlers for the relay
//!
//! The relay's HTTP surface is deliberately small: the WebSocket upgrade
//! lives in `websocket::handler`, leaving only health checks here.

pub mod health;

pub use health::health_router;
