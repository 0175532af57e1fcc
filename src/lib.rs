//! Town Server Library
//!
//! This library provides the authoritative state core of the town server:
//! players, their locations, conversation areas, and pet follower chains.
//!
//! ## Modules
//!
//! - `config` - Server configuration management
//! - `error` - Error types and result definitions
//! - `game` - Towns, entities, areas and follower chains
//! - `state` - Application state shared by the server

pub mod config;
pub mod error;
pub mod game;
pub mod state;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{Result, TownServerError};
pub use game::followers::FollowerOutcome;
pub use state::AppState;

/// Server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
