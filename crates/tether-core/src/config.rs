//! Configuration system for tether.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $TETHER_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/tether/config.toml
//!   3. ~/.config/tether/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::NodeRole;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    pub node: NodeConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Role this node plays: "css" (hub) or "ess" (edge agent).
    pub role: NodeRole,
    /// Whether notification records survive a restart. Edge agents often
    /// run purely in memory; registration replay accounts for that.
    pub persistent_storage: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Chunk requests kept in flight per MQTT destination. HTTP
    /// destinations are always limited to 1.
    pub max_inflight_chunks: usize,
    /// Largest payload served for a single chunk request, in bytes.
    pub max_data_chunk_size: usize,
    /// Base resend interval in seconds. A chunk request is considered lost
    /// once 6× this interval has elapsed without a reply.
    pub resend_interval_secs: i64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for TetherConfig {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            role: NodeRole::Ess,
            persistent_storage: true,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_inflight_chunks: 64,
            max_data_chunk_size: 120 * 1024,
            resend_interval_secs: 5,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("tether")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl TetherConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            TetherConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("TETHER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&TetherConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply TETHER_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TETHER_NODE__ROLE") {
            match v.as_str() {
                "css" => self.node.role = NodeRole::Css,
                "ess" => self.node.role = NodeRole::Ess,
                _ => {}
            }
        }
        if let Ok(v) = std::env::var("TETHER_NODE__PERSISTENT_STORAGE") {
            self.node.persistent_storage = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("TETHER_SYNC__MAX_INFLIGHT_CHUNKS") {
            if let Ok(n) = v.parse() {
                self.sync.max_inflight_chunks = n;
            }
        }
        if let Ok(v) = std::env::var("TETHER_SYNC__MAX_DATA_CHUNK_SIZE") {
            if let Ok(n) = v.parse() {
                self.sync.max_data_chunk_size = n;
            }
        }
        if let Ok(v) = std::env::var("TETHER_SYNC__RESEND_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                self.sync.resend_interval_secs = n;
            }
        }
    }
}
