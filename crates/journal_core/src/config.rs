//! Configuration types for the staking journal.

use crate::error::{JournalError, Result};
use crate::types::Strategy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Capital used when both the runtime state and the configuration carry an
/// unusable starting balance.
pub const FALLBACK_CAPITAL: f64 = 15_000.0;

/// Comprehensive configuration for a journal directory.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Storage-related configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session defaults.
    #[serde(default)]
    pub session: SessionConfig,

    /// Gain/loss threshold configuration consumed by goal evaluators.
    #[serde(default)]
    pub goals: GoalConfig,
}

impl Config {
    /// Load configuration from `config.toml` in the journal root.
    ///
    /// A missing file yields the defaults.
    pub fn load(journal_root: &Path) -> Result<Self> {
        let path = journal_root.join("config.toml");
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| JournalError::Config(format!("failed to read config: {}", e)))?;
            toml::from_str(&content)
                .map_err(|e| JournalError::Config(format!("failed to parse config: {}", e)))
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to `config.toml` in the journal root.
    pub fn save(&self, journal_root: &Path) -> Result<()> {
        let path = journal_root.join("config.toml");
        let content = toml::to_string_pretty(self)
            .map_err(|e| JournalError::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| JournalError::Config(format!("failed to write config: {}", e)))?;
        Ok(())
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file name inside the journal root (default: "journal.redb").
    pub db_file: String,

    /// Days a soft-deleted record stays in the trash partition (default: 30).
    pub trash_ttl_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_file: "journal.redb".to_string(),
            trash_ttl_days: 30,
        }
    }
}

/// Session defaults consumed by the operation ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Starting capital for a new session.
    pub initial_capital: f64,

    /// Payout percentage assumed when an operation carries none.
    pub payout_percent: f64,

    /// Active staking strategy.
    pub strategy: Strategy,

    /// Mode stamped onto new sessions (default: "official").
    pub default_mode: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_capital: FALLBACK_CAPITAL,
            payout_percent: 90.0,
            strategy: Strategy::Cycles,
            default_mode: "official".to_string(),
        }
    }
}

/// Gain/loss thresholds, expressed as percentages of starting capital.
///
/// The core never evaluates these itself; they are handed to whatever
/// [`GoalEvaluator`](crate::GoalEvaluator) the embedding application wires in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalConfig {
    /// Stop-win threshold (default: 10%).
    pub stop_win_percent: f64,

    /// Stop-loss threshold (default: 5%).
    pub stop_loss_percent: f64,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            stop_win_percent: 10.0,
            stop_loss_percent: 5.0,
        }
    }
}
