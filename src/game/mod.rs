//! Game module
//!
//! This module contains the core state logic for the town server:
//! - Entity model (players and pet followers)
//! - Entity registry (per-town arena)
//! - Conversation and pet areas
//! - Follower chain management
//! - Town controllers and the towns store

pub mod area;
pub mod entity;
pub mod followers;
pub mod registry;
pub mod store;
pub mod town;
