//! Weng-Lin (OpenSkill) team-vs-team updates
//!
//! Thin layer over the skillratings crate: applies the dynamics factor
//! before every update and provides the conservative variant used for team
//! ratings.

use skillratings::weng_lin::{weng_lin_multi_team, WengLinRating};
use skillratings::MultiTeamOutcome;

use crate::config::RatingConfig;
use crate::error::{EngineError, Result};
use crate::types::Rating;

/// Rates finished sets between two rosters
#[derive(Debug, Clone)]
pub struct WengLinRater {
    config: RatingConfig,
}

impl WengLinRater {
    pub fn new(config: RatingConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| EngineError::ConfigurationError {
                message: e.to_string(),
            })?;

        Ok(Self { config })
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Rating for players and teams never rated before
    pub fn default_rating(&self) -> Rating {
        self.config.default_rating()
    }

    pub fn ordinal(&self, rating: &Rating) -> f64 {
        self.config.ordinal(rating)
    }

    /// Sigma grows by tau before each update so ratings never freeze
    fn with_dynamics(&self, rating: &Rating) -> WengLinRating {
        WengLinRating {
            rating: rating.mu,
            uncertainty: (rating.sigma.powi(2) + self.config.tau.powi(2)).sqrt(),
        }
    }

    /// New ratings of both rosters after `winners` beat `losers`.
    /// Output order matches input order.
    pub fn rate(&self, winners: &[Rating], losers: &[Rating]) -> Result<(Vec<Rating>, Vec<Rating>)> {
        if winners.is_empty() || losers.is_empty() {
            return Err(EngineError::RatingCalculationFailed {
                reason: format!(
                    "Both sides need players (winners: {}, losers: {})",
                    winners.len(),
                    losers.len()
                ),
            }
            .into());
        }

        let winning_team: Vec<WengLinRating> =
            winners.iter().map(|r| self.with_dynamics(r)).collect();
        let losing_team: Vec<WengLinRating> =
            losers.iter().map(|r| self.with_dynamics(r)).collect();

        let teams_and_ranks = [
            (winning_team.as_slice(), MultiTeamOutcome::new(1)),
            (losing_team.as_slice(), MultiTeamOutcome::new(2)),
        ];
        let mut rated = weng_lin_multi_team(&teams_and_ranks, &self.config.weng_lin_config());

        if rated.len() != 2 {
            return Err(EngineError::RatingCalculationFailed {
                reason: format!("Expected 2 rated teams, got {}", rated.len()),
            }
            .into());
        }

        let losers = rated.pop().unwrap_or_default();
        let winners = rated.pop().unwrap_or_default();

        Ok((
            winners.into_iter().map(Rating::from).collect(),
            losers.into_iter().map(Rating::from).collect(),
        ))
    }

    /// Rate two teams, each also judged against the opponent's player average.
    ///
    /// The winner keeps the smaller of the two gains and the loser the smaller
    /// of the two losses, so a team of strong players beating a weak team
    /// rating does not inflate.
    pub fn rate_conservative(
        &self,
        winner: Rating,
        loser: Rating,
        winner_players_average: Rating,
        loser_players_average: Rating,
    ) -> Result<(Rating, Rating)> {
        let (ordinary_winner, ordinary_loser) = self.rate_one_vs_one(winner, loser)?;
        let (conservative_winner, _) = self.rate_one_vs_one(winner, loser_players_average)?;
        let (_, conservative_loser) = self.rate_one_vs_one(winner_players_average, loser)?;

        let winner = if self.ordinal(&conservative_winner) < self.ordinal(&ordinary_winner) {
            conservative_winner
        } else {
            ordinary_winner
        };
        let loser = if self.ordinal(&conservative_loser) > self.ordinal(&ordinary_loser) {
            conservative_loser
        } else {
            ordinary_loser
        };

        Ok((winner, loser))
    }

    fn rate_one_vs_one(&self, winner: Rating, loser: Rating) -> Result<(Rating, Rating)> {
        let (winners, losers) = self.rate(&[winner], &[loser])?;

        match (winners.first(), losers.first()) {
            (Some(winner), Some(loser)) => Ok((*winner, *loser)),
            _ => Err(EngineError::RatingCalculationFailed {
                reason: "Rating update returned no players".to_string(),
            }
            .into()),
        }
    }
}

/// Mean mu and mean sigma of `ratings`
pub fn average_rating(ratings: &[Rating]) -> Option<Rating> {
    if ratings.is_empty() {
        return None;
    }

    let count = ratings.len() as f64;
    Some(Rating {
        mu: ratings.iter().map(|r| r.mu).sum::<f64>() / count,
        sigma: ratings.iter().map(|r| r.sigma).sum::<f64>() / count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rater() -> WengLinRater {
        WengLinRater::new(RatingConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RatingConfig {
            beta: 0.0,
            ..RatingConfig::default()
        };
        assert!(WengLinRater::new(config).is_err());
    }

    #[test]
    fn test_winners_gain_losers_lose() {
        let rater = rater();
        let default = rater.default_rating();

        let (winners, losers) = rater
            .rate(&[default, default, default, default], &[default; 4])
            .unwrap();

        assert_eq!(winners.len(), 4);
        assert_eq!(losers.len(), 4);
        assert!(winners.iter().all(|r| r.mu > default.mu));
        assert!(losers.iter().all(|r| r.mu < default.mu));
        assert!(winners.iter().all(|r| r.sigma < default.sigma));
    }

    #[test]
    fn test_upset_moves_more() {
        let rater = rater();
        let strong = Rating {
            mu: 35.0,
            sigma: 3.0,
        };
        let weak = Rating {
            mu: 15.0,
            sigma: 3.0,
        };

        let (expected, _) = rater.rate(&[strong], &[weak]).unwrap();
        let (upset, _) = rater.rate(&[weak], &[strong]).unwrap();

        assert!(upset[0].mu - weak.mu > expected[0].mu - strong.mu);
    }

    #[test]
    fn test_empty_side_fails() {
        let rater = rater();
        let error = rater.rate(&[], &[rater.default_rating()]).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<EngineError>(),
            Some(EngineError::RatingCalculationFailed { .. })
        ));
    }

    #[test]
    fn test_rate_conservative_never_exceeds_ordinary() {
        let rater = rater();
        let team = rater.default_rating();
        let opponent = rater.default_rating();
        let strong_players = Rating {
            mu: 32.0,
            sigma: 4.0,
        };
        let weak_players = Rating {
            mu: 18.0,
            sigma: 4.0,
        };

        let (ordinary_winner, ordinary_loser) = rater.rate_one_vs_one(team, opponent).unwrap();
        let (winner, loser) = rater
            .rate_conservative(team, opponent, strong_players, weak_players)
            .unwrap();

        assert!(rater.ordinal(&winner) <= rater.ordinal(&ordinary_winner));
        assert!(rater.ordinal(&loser) >= rater.ordinal(&ordinary_loser));
        assert!(winner.mu > team.mu);
        assert!(loser.mu < opponent.mu);
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[]), None);

        let average = average_rating(&[
            Rating { mu: 20.0, sigma: 4.0 },
            Rating { mu: 30.0, sigma: 6.0 },
        ])
        .unwrap();
        assert_eq!(average, Rating { mu: 25.0, sigma: 5.0 });
    }
}
