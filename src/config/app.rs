//! Main application configuration
//!
//! This module defines the primary configuration structures for the bracket
//! progression engine, including environment variable loading, TOML files
//! and validation.

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use super::rating::RatingConfig;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub tournament: TournamentDefaults,
    pub rating: RatingConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Tournament-wide constants the engine falls back to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentDefaults {
    /// Minimum checked-in teams for a bracket to be startable
    pub enough_teams_to_start: usize,
    pub default_teams_per_group: u32,
    pub swiss_default_group_count: u32,
    pub swiss_default_round_count: u32,
    /// Elimination brackets smaller than this skip replay avoidance
    pub replay_avoidance_min_teams: usize,
    pub replay_avoidance_max_iterations: usize,
    /// Regular check-in opens this many minutes before the tournament starts
    pub check_in_window_minutes: i64,
    pub default_min_members_per_team: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "bracket-progression".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for TournamentDefaults {
    fn default() -> Self {
        Self {
            enough_teams_to_start: 2,
            default_teams_per_group: 4,
            swiss_default_group_count: 1,
            swiss_default_round_count: 5,
            replay_avoidance_min_teams: 8,
            replay_avoidance_max_iterations: 100,
            check_in_window_minutes: 60,
            default_min_members_per_team: 4,
        }
    }
}

impl TournamentDefaults {
    /// Get check-in window as Duration
    pub fn check_in_window(&self) -> Duration {
        Duration::minutes(self.check_in_window_minutes)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("Invalid {} value: {}", key, value)),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still win
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }

        // Tournament defaults
        if let Some(teams) = parse_env("ENOUGH_TEAMS_TO_START")? {
            self.tournament.enough_teams_to_start = teams;
        }
        if let Some(teams) = parse_env("DEFAULT_TEAMS_PER_GROUP")? {
            self.tournament.default_teams_per_group = teams;
        }
        if let Some(groups) = parse_env("SWISS_DEFAULT_GROUP_COUNT")? {
            self.tournament.swiss_default_group_count = groups;
        }
        if let Some(rounds) = parse_env("SWISS_DEFAULT_ROUND_COUNT")? {
            self.tournament.swiss_default_round_count = rounds;
        }
        if let Some(iterations) = parse_env("REPLAY_AVOIDANCE_MAX_ITERATIONS")? {
            self.tournament.replay_avoidance_max_iterations = iterations;
        }
        if let Some(minutes) = parse_env("CHECK_IN_WINDOW_MINUTES")? {
            self.tournament.check_in_window_minutes = minutes;
        }

        // Rating settings
        if let Some(beta) = parse_env("RATING_BETA")? {
            self.rating.beta = beta;
        }
        if let Some(tau) = parse_env("RATING_TAU")? {
            self.rating.tau = tau;
        }

        Ok(())
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }

    // Validate tournament defaults
    let tournament = &config.tournament;
    if tournament.enough_teams_to_start < 2 {
        return Err(anyhow!("A bracket needs at least 2 teams to start"));
    }
    if tournament.default_teams_per_group < 2 {
        return Err(anyhow!("Default teams per group must be at least 2"));
    }
    if tournament.swiss_default_group_count == 0 || tournament.swiss_default_round_count == 0 {
        return Err(anyhow!("Swiss defaults must be greater than 0"));
    }
    if tournament.check_in_window_minutes < 0 {
        return Err(anyhow!("Check-in window cannot be negative"));
    }

    config.rating.validate()?;

    Ok(())
}
