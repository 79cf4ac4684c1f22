//! Configuration management for Deskpilot
//!
//! Configuration is loaded from `~/.deskpilot/config.json` with environment
//! variable overrides (`DESKPILOT_SECTION_KEY` pattern). Provider selection,
//! the remote tool host endpoint, and every timeout the engine uses live here
//! so no call site carries a hard-coded duration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// LLM provider settings
    pub provider: ProviderConfig,
    /// Planner loop settings
    pub agent: AgentConfig,
    /// Remote tool host settings
    pub remote: RemoteConfig,
}

/// LLM provider settings (OpenAI-compatible chat completions API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key; usually supplied via DESKPILOT_PROVIDER_API_KEY
    pub api_key: Option<String>,
    /// Base URL for OpenAI-compatible backends (Azure, local models, proxies)
    pub api_base: Option<String>,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token cap
    pub max_tokens: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: 1024,
        }
    }
}

/// Planner loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum PLAN/DISPATCH round-trips per turn before the answer degrades
    pub max_tool_rounds: u32,
    /// Timeout for one planner completion call, in seconds
    pub planner_timeout_secs: u64,
    /// Timeout for one tool dispatch (local or remote), in seconds
    pub tool_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 5,
            planner_timeout_secs: 60,
            tool_timeout_secs: 20,
        }
    }
}

/// Remote tool host settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// JSON-RPC endpoint of the tool host; None disables remote tools
    pub endpoint: Option<String>,
    /// Timeout for the startup handshake and catalog fetch, in seconds
    pub connect_timeout_secs: u64,
    /// Backoff before the single transparent retry, in milliseconds
    pub retry_backoff_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            connect_timeout_secs: 10,
            retry_backoff_ms: 250,
        }
    }
}

impl Config {
    /// Returns the Deskpilot configuration directory path (~/.deskpilot)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".deskpilot")
    }

    /// Returns the path to the config file (~/.deskpilot/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DESKPILOT_PROVIDER_API_KEY") {
            self.provider.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("DESKPILOT_PROVIDER_API_BASE") {
            self.provider.api_base = Some(val);
        }
        if let Ok(val) = std::env::var("DESKPILOT_PROVIDER_MODEL") {
            self.provider.model = val;
        }
        if let Ok(val) = std::env::var("DESKPILOT_PROVIDER_TEMPERATURE") {
            if let Ok(v) = val.parse() {
                self.provider.temperature = v;
            }
        }
        if let Ok(val) = std::env::var("DESKPILOT_PROVIDER_MAX_TOKENS") {
            if let Ok(v) = val.parse() {
                self.provider.max_tokens = v;
            }
        }

        if let Ok(val) = std::env::var("DESKPILOT_AGENT_MAX_TOOL_ROUNDS") {
            if let Ok(v) = val.parse() {
                self.agent.max_tool_rounds = v;
            }
        }
        if let Ok(val) = std::env::var("DESKPILOT_AGENT_PLANNER_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                self.agent.planner_timeout_secs = v;
            }
        }
        if let Ok(val) = std::env::var("DESKPILOT_AGENT_TOOL_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                self.agent.tool_timeout_secs = v;
            }
        }

        if let Ok(val) = std::env::var("DESKPILOT_REMOTE_ENDPOINT") {
            self.remote.endpoint = if val.is_empty() { None } else { Some(val) };
        }
        if let Ok(val) = std::env::var("DESKPILOT_REMOTE_CONNECT_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                self.remote.connect_timeout_secs = v;
            }
        }
        if let Ok(val) = std::env::var("DESKPILOT_REMOTE_RETRY_BACKOFF_MS") {
            if let Ok(v) = val.parse() {
                self.remote.retry_backoff_ms = v;
            }
        }
    }

    /// Per-call planner timeout as a `Duration`.
    pub fn planner_timeout(&self) -> Duration {
        Duration::from_secs(self.agent.planner_timeout_secs)
    }

    /// Per-call tool dispatch timeout as a `Duration`.
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.agent.tool_timeout_secs)
    }

    /// Remote handshake timeout as a `Duration`.
    pub fn remote_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.connect_timeout_secs)
    }

    /// Backoff before the single remote retry.
    pub fn remote_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.remote.retry_backoff_ms)
    }
}
