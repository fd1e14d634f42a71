//! Elo rating system for team strength estimation
//!
//! World Football Elo variant: the rating change scales with the winning
//! margin, and draws count as half a win.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{MatchRecord, TeamId};

/// Elo rating configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EloConfig {
    /// K-factor: how much ratings change per match
    pub k_factor: f32,
    /// Home advantage in rating points
    pub home_advantage: f32,
    /// Starting rating for new teams
    pub initial_rating: f32,
}

impl Default for EloConfig {
    fn default() -> Self {
        EloConfig {
            k_factor: 20.0,
            home_advantage: 60.0,
            initial_rating: 1500.0,
        }
    }
}

/// Elo rating computer
#[derive(Debug, Clone)]
pub struct EloRatings {
    ratings: HashMap<TeamId, f32>,
    config: EloConfig,
}

impl Default for EloRatings {
    fn default() -> Self {
        Self::new(EloConfig::default())
    }
}

impl EloRatings {
    pub fn new(config: EloConfig) -> Self {
        EloRatings {
            ratings: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &EloConfig {
        &self.config
    }

    /// Get current rating for a team (returns initial if unknown)
    pub fn get_rating(&self, team: TeamId) -> f32 {
        *self
            .ratings
            .get(&team)
            .unwrap_or(&self.config.initial_rating)
    }

    /// Expected score (0-1) for the home team, home advantage included
    pub fn expected_score(&self, home: TeamId, away: TeamId) -> f32 {
        let diff = self.get_rating(home) + self.config.home_advantage - self.get_rating(away);
        expected_from_diff(diff)
    }

    /// Update ratings after a match (call AFTER getting pre-match ratings)
    pub fn update(&mut self, record: &MatchRecord) {
        let home_expected = self.expected_score(record.home_team, record.away_team);

        let home_actual = match record.home_goals.cmp(&record.away_goals) {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Equal => 0.5,
            std::cmp::Ordering::Less => 0.0,
        };

        let k = self.config.k_factor * margin_multiplier(record.goal_difference());
        let delta = k * (home_actual - home_expected);

        let home_rating = self.get_rating(record.home_team);
        let away_rating = self.get_rating(record.away_team);

        self.ratings.insert(record.home_team, home_rating + delta);
        self.ratings.insert(record.away_team, away_rating - delta);
    }

    /// Features for a fixture (call BEFORE update)
    pub fn compute(&self, home: TeamId, away: TeamId) -> EloFeatures {
        let home_rating = self.get_rating(home);
        let away_rating = self.get_rating(away);
        EloFeatures {
            home_elo: (home_rating - self.config.initial_rating) / 400.0,
            away_elo: (away_rating - self.config.initial_rating) / 400.0,
            elo_diff: (home_rating + self.config.home_advantage - away_rating) / 400.0,
            home_expected: self.expected_score(home, away),
        }
    }

    /// Teams sorted by rating, strongest first
    pub fn ranking(&self) -> Vec<(TeamId, f32)> {
        let mut ranking: Vec<_> = self.ratings.iter().map(|(t, r)| (*t, *r)).collect();
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranking
    }

    /// Reset all ratings
    pub fn reset(&mut self) {
        self.ratings.clear();
    }
}

/// Logistic expectation for a rating difference
pub fn expected_from_diff(diff: f32) -> f32 {
    1.0 / (1.0 + 10.0_f32.powf(-diff / 400.0))
}

/// Goal-difference multiplier on K
fn margin_multiplier(goal_difference: i16) -> f32 {
    match goal_difference.unsigned_abs() {
        0 | 1 => 1.0,
        2 => 1.5,
        gd => (11.0 + gd as f32) / 8.0,
    }
}

/// Elo features for a match
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EloFeatures {
    pub home_elo: f32,
    pub away_elo: f32,
    /// Rating difference including home advantage
    pub elo_diff: f32,
    pub home_expected: f32,
}

impl EloFeatures {
    pub const DIM: usize = 4;

    pub fn to_vec(&self) -> Vec<f32> {
        vec![self.home_elo, self.away_elo, self.elo_diff, self.home_expected]
    }

    pub fn names() -> [&'static str; Self::DIM] {
        ["home_elo", "away_elo", "elo_diff", "elo_expected"]
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn make_match(home: i64, away: i64, home_goals: u8, away_goals: u8) -> MatchRecord {
        MatchRecord::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            TeamId(home),
            TeamId(away),
            home_goals,
            away_goals,
        )
    }

    #[test]
    fn test_initial_ratings() {
        let elo = EloRatings::default();
        assert_eq!(elo.get_rating(TeamId(1)), 1500.0);
        assert_eq!(elo.get_rating(TeamId(999)), 1500.0);
    }

    #[test]
    fn test_expected_score() {
        let elo = EloRatings::default();
        // Equal teams, home advantage gives ~58.5% expected
        let expected = elo.expected_score(TeamId(1), TeamId(2));
        assert!(expected > 0.55 && expected < 0.6);
    }

    #[test]
    fn test_rating_update_is_zero_sum() {
        let mut elo = EloRatings::default();
        elo.update(&make_match(1, 2, 2, 0));

        let home = elo.get_rating(TeamId(1));
        let away = elo.get_rating(TeamId(2));
        assert!(home > 1500.0);
        assert!((home + away - 3000.0).abs() < 1e-3);
    }

    #[test]
    fn test_home_draw_loses_rating() {
        // The home side was expected to win, so a draw costs it points
        let mut elo = EloRatings::default();
        elo.update(&make_match(1, 2, 1, 1));
        assert!(elo.get_rating(TeamId(1)) < 1500.0);
    }

    #[test]
    fn test_margin_multiplier() {
        let mut narrow = EloRatings::default();
        narrow.update(&make_match(1, 2, 0, 1));
        let mut heavy = EloRatings::default();
        heavy.update(&make_match(1, 2, 0, 4));

        assert!(heavy.get_rating(TeamId(2)) > narrow.get_rating(TeamId(2)));
        assert_eq!(margin_multiplier(3), 14.0 / 8.0);
    }

    #[test]
    fn test_features_favour_stronger_team() {
        let mut elo = EloRatings::default();
        for _ in 0..5 {
            elo.update(&make_match(1, 2, 3, 0));
        }

        let features = elo.compute(TeamId(1), TeamId(2));
        assert!(features.elo_diff > 0.0);
        assert!(features.home_expected > 0.7);
        assert_eq!(elo.ranking()[0].0, TeamId(1));
    }
}
