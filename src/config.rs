//! Server configuration.
//!
//! Loaded from a TOML file; a missing file yields the defaults so the
//! server can run with zero setup. The optional `[seed]` sections feed
//! the in-memory stores, which is how the standalone server gets demo
//! quizzes and identities without an external backend.

use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tokio::fs;

use crate::quiz::QuizRecord;

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Ok(toml::from_str(&contents)?)
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

// ============================================================================
// Seed Data
// ============================================================================

/// Demo data loaded into the in-memory stores at startup.
#[derive(Debug, Default, Deserialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub quizzes: Vec<QuizRecord>,
    /// XP thresholds: the amount needed to reach `level` from the one
    /// below it.
    #[serde(default)]
    pub levels: Vec<SeedLevel>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub id: i64,
    pub username: String,
    /// Identity token accepted by the credential verifier.
    pub token: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SeedLevel {
    pub level: u32,
    pub xp: u32,
}

// ============================================================================
// Private Helpers (Serde Defaults)
// ============================================================================

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}
