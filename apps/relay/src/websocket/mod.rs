//! WebSocket relay between players and remotes
//!
//! This module handles:
//! - The wire protocol shared by players and remotes
//! - Connection tracking and role membership
//! - Message routing and state/connectivity fan-out

pub mod handler;
pub mod messages;
pub mod registry;
pub mod relay;
