//! Quizlive - a real-time multiplayer quiz session engine.
//!
//! Players gather in token-addressed lobbies, answer time-scored
//! questions in lockstep and earn XP when the game finalizes. Each live
//! session is owned by a dedicated actor task; clients talk to it over
//! a single WebSocket endpoint.

// ============================================================================
// Core Infrastructure
// ============================================================================

pub mod build_info;
pub mod config;
pub mod stores;

// ============================================================================
// Server & HTTP
// ============================================================================

pub mod api;
pub mod handlers;
pub mod server;

// ============================================================================
// Domain
// ============================================================================

pub mod finalize;
pub mod quiz;
pub mod router;
pub mod score;
pub mod session;
