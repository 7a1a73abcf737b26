use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

// ── Storage ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the embedded database file.  Overridden at runtime by the
    /// `PLANTCARE_DB_PATH` environment variable when set.
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: ".plantcare/plantcare.redb".to_string(),
        }
    }
}

// ── Scheduler ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// IANA timezone that stored dates and reminder stamps are read in.
    /// Falls back to `America/New_York` when the name is unrecognised.
    pub timezone: String,
    /// Days added on top of the care interval before a reminder goes out,
    /// so an owner who is on time is not pestered.
    pub grace_days: u32,
    /// Hours after a "soil is moist" report before the plant is re-checked.
    pub moist_recheck_hours: u32,
    /// How often (in minutes) the daemon sweeps all plants for due reminders.
    /// `0` (the default) disables the background sweep; `plantcare sweep
    /// --once` still works.
    pub sweep_interval_minutes: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            grace_days: 3,
            moist_recheck_hours: 24,
            sweep_interval_minutes: 0,
        }
    }
}

// ── Retention ────────────────────────────────────────────────────────────────

/// Record ceilings enforced by oldest-first eviction before each insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub max_plants: usize,
    pub max_comments: usize,
    /// Audit log entries kept per plant.
    pub max_log_entries: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_plants: 500,
            max_comments: 50,
            max_log_entries: 10,
        }
    }
}

// ── Email ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// External sender program.  Empty (the default) logs reminders instead
    /// of sending them.
    pub command: String,
    /// Arguments placed before the reminder flags, e.g. a driver script path.
    pub args: Vec<String>,
    pub timeout_secs: u64,
    /// When non-empty, reminders to any other address are suppressed.
    /// Can also be set via `DEBUG_EMAIL` env var (env takes precedence).
    pub debug_recipient: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: vec![],
            timeout_secs: 30,
            debug_recipient: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub scheduler: SchedulerConfig,
    pub retention: RetentionConfig,
    pub email: EmailConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        if let Ok(value) = env::var("PLANTCARE_DB_PATH") {
            if !value.is_empty() {
                config.storage.path = value;
            }
        }

        if let Ok(recipient) = env::var("DEBUG_EMAIL") {
            if !recipient.is_empty() {
                config.email.debug_recipient = recipient;
            }
        }

        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    pub fn sweep_enabled(&self) -> bool {
        self.scheduler.sweep_interval_minutes > 0
    }

    pub fn debug_recipient(&self) -> Option<&str> {
        let recipient = self.email.debug_recipient.trim();
        if recipient.is_empty() { None } else { Some(recipient) }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
