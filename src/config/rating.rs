//! Rating system configuration

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use skillratings::weng_lin::WengLinConfig;

use crate::types::Rating;

/// Bayesian rating parameters (OpenSkill defaults)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Prior mean for unseen players and teams
    pub mu: f64,
    /// Prior standard deviation
    pub sigma: f64,
    /// Performance variance of a single game
    pub beta: f64,
    /// Additive dynamics factor applied before every update
    pub tau: f64,
    pub uncertainty_tolerance: f64,
    /// Multiplier of sigma subtracted from mu for the ordinal
    pub ordinal_z: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            mu: 25.0,
            sigma: 25.0 / 3.0,
            beta: 25.0 / 6.0,
            tau: 25.0 / 300.0,
            uncertainty_tolerance: 0.000_001,
            ordinal_z: 3.0,
        }
    }
}

impl RatingConfig {
    pub fn default_rating(&self) -> Rating {
        Rating {
            mu: self.mu,
            sigma: self.sigma,
        }
    }

    pub fn weng_lin_config(&self) -> WengLinConfig {
        WengLinConfig {
            beta: self.beta,
            uncertainty_tolerance: self.uncertainty_tolerance,
        }
    }

    /// Conservative single-scalar skill estimate
    pub fn ordinal(&self, rating: &Rating) -> f64 {
        rating.mu - self.ordinal_z * rating.sigma
    }

    pub fn validate(&self) -> Result<()> {
        if self.sigma <= 0.0 {
            return Err(anyhow!("Rating sigma must be positive"));
        }
        if self.beta <= 0.0 {
            return Err(anyhow!("Rating beta must be positive"));
        }
        if self.tau < 0.0 {
            return Err(anyhow!("Rating tau cannot be negative"));
        }
        if self.uncertainty_tolerance <= 0.0 {
            return Err(anyhow!("Uncertainty tolerance must be positive"));
        }
        if self.ordinal_z < 0.0 {
            return Err(anyhow!("Ordinal z cannot be negative"));
        }
        Ok(())
    }
}
