//! Configuration loading
//!
//! Embedded defaults, then the user config file, then `--config`, then
//! `JYUTCARD_*` environment variables. CLI flags are applied last by the caller.

use crate::cli::opts::StoreKind;
use anyhow::{bail, Context, Result};
use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File, FileFormat};
use jyutcard_core::Scheduler;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Longest accepted review interval, one hundred years in minutes.
pub const MAX_REVIEW_INTERVAL_MINUTES: i64 = 60 * 24 * 365 * 100;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreKind,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    pub json: JsonConfig,
    pub scheduler: SchedulerConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonConfig {
    pub max_backups: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub review_interval_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub addr: String,
}

impl AppConfig {
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::with_interval_minutes(self.scheduler.review_interval_minutes)
    }

    fn validate(self) -> Result<Self> {
        let minutes = self.scheduler.review_interval_minutes;
        if minutes <= 0 {
            bail!("scheduler.review_interval_minutes must be positive, got {minutes}");
        }
        if minutes > MAX_REVIEW_INTERVAL_MINUTES {
            bail!(
                "scheduler.review_interval_minutes must be at most {MAX_REVIEW_INTERVAL_MINUTES}, got {minutes}"
            );
        }
        Ok(self)
    }
}

/// Load configuration from files and environment
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let mut builder = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

    // 2. Per-user file (optional)
    if let Some(dir) = jyutcard_json::paths::config_root() {
        builder = builder.add_source(File::from(dir.join("config.toml")).required(false));
    }

    // 3. Explicit file (must exist when given)
    if let Some(p) = explicit {
        builder = builder.add_source(File::from(p.to_path_buf()).required(true));
    }

    // 4. Environment variables (highest priority)
    builder = builder.add_source(
        Environment::with_prefix("JYUTCARD")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    build(builder)
}

fn build(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig> {
    let config = builder.build().context("Failed to build configuration")?;
    config
        .try_deserialize::<AppConfig>()
        .context("Failed to deserialize configuration")?
        .validate()
}
