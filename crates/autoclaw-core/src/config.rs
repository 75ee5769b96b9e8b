//! AutoClaw configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AutoClawError, Result};
use crate::types::ActionType;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoClawConfig {
    #[serde(default)]
    pub autonomous: AutonomousConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

impl AutoClawConfig {
    /// Load config from the default path (~/.autoclaw/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AutoClawError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| AutoClawError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        tracing::debug!("📄 Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save config to the given path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AutoClawError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.autonomous.validate()?;
        if self.events.capacity == 0 {
            return Err(AutoClawError::Config(
                "events.capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the AutoClaw home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".autoclaw")
    }
}

/// Settings for one session's autonomous loop. Fixed for the lifetime of a
/// running loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomousConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Pause between ticks, in seconds. Zero means tick back-to-back.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_max_actions_per_hour")]
    pub max_actions_per_hour: u32,
    /// Tools the executor may use. Empty means unrestricted.
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    /// Adopt the goal source's suggestion as the session's focus goal.
    #[serde(default = "bool_true")]
    pub auto_goals: bool,
    /// Action types that must not run without external approval.
    #[serde(default)]
    pub require_approval: Vec<ActionType>,
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
    /// Max actions retained in memory per session.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

fn bool_true() -> bool { true }
fn default_interval_secs() -> u64 { 60 }
fn default_max_actions_per_hour() -> u32 { 20 }
fn default_max_consecutive_errors() -> u32 { 5 }
fn default_history_limit() -> usize { 500 }
fn default_stop_timeout_secs() -> u64 { 5 }

impl Default for AutonomousConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            max_actions_per_hour: default_max_actions_per_hour(),
            allowed_tools: Vec::new(),
            auto_goals: true,
            require_approval: Vec::new(),
            max_consecutive_errors: default_max_consecutive_errors(),
            history_limit: default_history_limit(),
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

impl AutonomousConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_consecutive_errors == 0 {
            return Err(AutoClawError::Config(
                "autonomous.max_consecutive_errors must be at least 1".into(),
            ));
        }
        if self.history_limit == 0 {
            return Err(AutoClawError::Config(
                "autonomous.history_limit must be at least 1".into(),
            ));
        }
        // Queued user messages are always answered; only self-prompts can be gated.
        if self.require_approval.contains(&ActionType::UserResponse) {
            return Err(AutoClawError::Config(
                "autonomous.require_approval only accepts \"autonomous_action\"".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn requires_approval(&self, action_type: ActionType) -> bool {
        self.require_approval.contains(&action_type)
    }

    /// Whether `tool` passes the whitelist.
    pub fn allows_tool(&self, tool: &str) -> bool {
        self.allowed_tools.is_empty() || self.allowed_tools.iter().any(|t| t == tool)
    }

    /// Compact view for status reports.
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            enabled: self.enabled,
            interval_secs: self.interval_secs,
            max_actions_per_hour: self.max_actions_per_hour,
            max_consecutive_errors: self.max_consecutive_errors,
            allowed_tools: self.allowed_tools.len(),
            auto_goals: self.auto_goals,
            require_approval: self.require_approval.clone(),
        }
    }
}

/// Status-report view of an [`AutonomousConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub enabled: bool,
    pub interval_secs: u64,
    pub max_actions_per_hour: u32,
    pub max_consecutive_errors: u32,
    /// Number of whitelisted tools (0 = unrestricted).
    pub allowed_tools: usize,
    pub auto_goals: bool,
    pub require_approval: Vec<ActionType>,
}

/// Event channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Buffered events per session before new ones are dropped.
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

fn default_event_capacity() -> usize { 1000 }

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: default_event_capacity() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AutoClawConfig::default();
        assert!(config.autonomous.enabled);
        assert_eq!(config.autonomous.interval_secs, 60);
        assert_eq!(config.autonomous.max_actions_per_hour, 20);
        assert_eq!(config.autonomous.max_consecutive_errors, 5);
        assert_eq!(config.events.capacity, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [autonomous]
            interval_secs = 10
            max_actions_per_hour = 3
            allowed_tools = ["web_search", "memory_recall"]
            require_approval = ["autonomous_action"]
            auto_goals = false

            [events]
            capacity = 50
        "#;

        let config: AutoClawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.autonomous.interval_secs, 10);
        assert_eq!(config.autonomous.max_actions_per_hour, 3);
        assert!(!config.autonomous.auto_goals);
        assert!(config.autonomous.requires_approval(ActionType::AutonomousAction));
        assert!(!config.autonomous.requires_approval(ActionType::UserResponse));
        assert_eq!(config.events.capacity, 50);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: AutoClawConfig = toml::from_str("").unwrap();
        assert_eq!(config.autonomous.history_limit, 500);
        assert_eq!(config.autonomous.stop_timeout_secs, 5);
        assert!(config.autonomous.allowed_tools.is_empty());
    }

    #[test]
    fn test_tool_whitelist() {
        let mut config = AutonomousConfig::default();
        assert!(config.allows_tool("anything"));
        config.allowed_tools = vec!["web_search".into()];
        assert!(config.allows_tool("web_search"));
        assert!(!config.allows_tool("shell"));
        assert_eq!(config.summary().allowed_tools, 1);
    }

    #[test]
    fn test_validate_rejects_zero_error_budget() {
        let config = AutoClawConfig {
            autonomous: AutonomousConfig {
                max_consecutive_errors: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AutoClawError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_gating_user_messages() {
        let toml_str = r#"
[autonomous]
require_approval = ["user_response"]
"#;
        let config: AutoClawConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(config.validate(), Err(AutoClawError::Config(_))));

        let gated: AutoClawConfig = toml::from_str(
            "[autonomous]\nrequire_approval = [\"autonomous_action\"]\n",
        )
        .unwrap();
        assert!(gated.validate().is_ok());
        assert!(gated.autonomous.requires_approval(ActionType::AutonomousAction));
    }

    #[test]
    fn test_save_and_load_roundtrip_file() {
        let dir = std::env::temp_dir().join("autoclaw-test-config");
        let path = dir.join("config.toml");
        let mut config = AutoClawConfig::default();
        config.autonomous.interval_secs = 7;
        config.save_to(&path).unwrap();

        let loaded = AutoClawConfig::load_from(&path).unwrap();
        assert_eq!(loaded.autonomous.interval_secs, 7);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_home_dir() {
        let home = AutoClawConfig::home_dir();
        assert!(home.to_string_lossy().contains("autoclaw"));
    }
}
