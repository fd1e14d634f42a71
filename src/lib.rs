//! Football match prediction and simulation
//!
//! Ingests historical match data, derives recency-weighted team features,
//! trains an ensemble of outcome/goal models and simulates matches both as
//! Monte Carlo score draws and minute by minute.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod simulation;
pub mod squad;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// Source of match data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Csv,
    Json,
    FootballDataApi,
    Wikipedia,
    Manual,
}

impl DataSource {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Csv" => DataSource::Csv,
            "Json" => DataSource::Json,
            "FootballDataApi" => DataSource::FootballDataApi,
            "Wikipedia" => DataSource::Wikipedia,
            _ => DataSource::Manual,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Csv => write!(f, "CSV"),
            DataSource::Json => write!(f, "JSON"),
            DataSource::FootballDataApi => write!(f, "football-data.org"),
            DataSource::Wikipedia => write!(f, "Wikipedia"),
            DataSource::Manual => write!(f, "Manual"),
        }
    }
}

/// A football team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub country: Option<String>,
    pub aliases: Vec<String>,
}

impl Team {
    pub fn matches_name(&self, name: &str) -> bool {
        let name_lower = name.to_lowercase();
        self.name.to_lowercase() == name_lower
            || self.aliases.iter().any(|a| a.to_lowercase() == name_lower)
    }
}

/// Three-way match result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::HomeWin, Outcome::Draw, Outcome::AwayWin];

    pub fn from_goals(home: u8, away: u8) -> Self {
        match home.cmp(&away) {
            std::cmp::Ordering::Greater => Outcome::HomeWin,
            std::cmp::Ordering::Equal => Outcome::Draw,
            std::cmp::Ordering::Less => Outcome::AwayWin,
        }
    }

    /// Class index used by the models (0 = home, 1 = draw, 2 = away)
    pub fn index(&self) -> usize {
        match self {
            Outcome::HomeWin => 0,
            Outcome::Draw => 1,
            Outcome::AwayWin => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::HomeWin => write!(f, "Home win"),
            Outcome::Draw => write!(f, "Draw"),
            Outcome::AwayWin => write!(f, "Away win"),
        }
    }
}

/// A single played match from any data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: NaiveDate,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home_goals: u8,
    pub away_goals: u8,
    pub half_time: Option<(u8, u8)>,
    pub home_shots: Option<u8>,
    pub away_shots: Option<u8>,
    pub home_shots_on_target: Option<u8>,
    pub away_shots_on_target: Option<u8>,
    pub competition: Option<String>,
    pub matchday: Option<u16>,
    pub venue: Option<String>,
    pub source: DataSource,
}

impl MatchRecord {
    /// Minimal record with only the score filled in
    pub fn new(
        date: NaiveDate,
        home_team: TeamId,
        away_team: TeamId,
        home_goals: u8,
        away_goals: u8,
    ) -> Self {
        MatchRecord {
            date,
            home_team,
            away_team,
            home_goals,
            away_goals,
            half_time: None,
            home_shots: None,
            away_shots: None,
            home_shots_on_target: None,
            away_shots_on_target: None,
            competition: None,
            matchday: None,
            venue: None,
            source: DataSource::Manual,
        }
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::from_goals(self.home_goals, self.away_goals)
    }

    /// Returns the winning team, or None for a draw
    pub fn winner(&self) -> Option<TeamId> {
        match self.outcome() {
            Outcome::HomeWin => Some(self.home_team),
            Outcome::AwayWin => Some(self.away_team),
            Outcome::Draw => None,
        }
    }

    /// Goal difference (positive = home win)
    pub fn goal_difference(&self) -> i16 {
        self.home_goals as i16 - self.away_goals as i16
    }

    pub fn total_goals(&self) -> u16 {
        self.home_goals as u16 + self.away_goals as u16
    }

    /// Check if a team was playing at home
    pub fn is_home(&self, team: TeamId) -> Option<bool> {
        if team == self.home_team {
            Some(true)
        } else if team == self.away_team {
            Some(false)
        } else {
            None
        }
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.home_team == team || self.away_team == team
    }

    /// Get the opponent for a given team
    pub fn opponent(&self, team: TeamId) -> Option<TeamId> {
        self.is_home(team)
            .map(|home| if home { self.away_team } else { self.home_team })
    }

    /// Goals scored by a specific team
    pub fn goals_for(&self, team: TeamId) -> Option<u8> {
        self.is_home(team)
            .map(|home| if home { self.home_goals } else { self.away_goals })
    }

    /// Goals conceded by a specific team
    pub fn goals_against(&self, team: TeamId) -> Option<u8> {
        self.is_home(team)
            .map(|home| if home { self.away_goals } else { self.home_goals })
    }

    /// League points earned by a team (3 win, 1 draw, 0 loss)
    pub fn points_for(&self, team: TeamId) -> Option<u8> {
        let scored = self.goals_for(team)?;
        let conceded = self.goals_against(team)?;
        Some(match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => 3,
            std::cmp::Ordering::Equal => 1,
            std::cmp::Ordering::Less => 0,
        })
    }

    /// Shots and shots on target for a team, when the source recorded them
    pub fn shots_for(&self, team: TeamId) -> Option<(u8, Option<u8>)> {
        let home = self.is_home(team)?;
        if home {
            self.home_shots.map(|s| (s, self.home_shots_on_target))
        } else {
            self.away_shots.map(|s| (s, self.away_shots_on_target))
        }
    }
}

/// A scheduled match without a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub date: NaiveDate,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub competition: Option<String>,
    pub matchday: Option<u16>,
    pub venue: Option<String>,
}

/// Probabilities of the three outcomes, always summing to one
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbs {
    pub home_win: f32,
    pub draw: f32,
    pub away_win: f32,
}

impl Default for OutcomeProbs {
    fn default() -> Self {
        OutcomeProbs::uniform()
    }
}

impl OutcomeProbs {
    pub fn uniform() -> Self {
        OutcomeProbs {
            home_win: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away_win: 1.0 / 3.0,
        }
    }

    /// Build from (possibly unnormalized) weights
    pub fn new(home_win: f32, draw: f32, away_win: f32) -> Self {
        let home_win = home_win.max(0.0);
        let draw = draw.max(0.0);
        let away_win = away_win.max(0.0);
        let total = home_win + draw + away_win;
        if !total.is_finite() || total <= f32::EPSILON {
            return Self::uniform();
        }
        OutcomeProbs {
            home_win: home_win / total,
            draw: draw / total,
            away_win: away_win / total,
        }
    }

    pub fn from_slice(values: &[f32]) -> Self {
        match values {
            [h, d, a, ..] => Self::new(*h, *d, *a),
            _ => Self::uniform(),
        }
    }

    pub fn get(&self, outcome: Outcome) -> f32 {
        match outcome {
            Outcome::HomeWin => self.home_win,
            Outcome::Draw => self.draw,
            Outcome::AwayWin => self.away_win,
        }
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.home_win, self.draw, self.away_win]
    }

    pub fn most_likely(&self) -> Outcome {
        let mut best = Outcome::HomeWin;
        for outcome in Outcome::ALL {
            if self.get(outcome) > self.get(best) {
                best = outcome;
            }
        }
        best
    }
}

/// Model prediction output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub probs: OutcomeProbs,
    pub expected_home_goals: f32,
    pub expected_away_goals: f32,
    pub most_likely_score: (u8, u8),
    pub confidence: ConfidenceLevel,
}

impl Prediction {
    pub fn predicted_outcome(&self) -> Outcome {
        self.probs.most_likely()
    }

    /// Expected goal difference (positive = home side favoured)
    pub fn expected_goal_difference(&self) -> f32 {
        self.expected_home_goals - self.expected_away_goals
    }
}

/// Confidence level based on available match history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,   // Both teams have full history
    Medium, // One team has limited history
    Low,    // Both teams have limited history
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "High"),
            ConfidenceLevel::Medium => write!(f, "Medium"),
            ConfidenceLevel::Low => write!(f, "Low"),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum FootballError {
    #[error("Source {data_source} failed: {message}")]
    Source {
        data_source: DataSource,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Team not found with ID: {0}")]
    TeamNotFound(TeamId),

    #[error("Model not trained - run `football train` first")]
    NoModel,

    #[error("Insufficient history for {team}: has {matches} matches, need {required}")]
    InsufficientHistory {
        team: String,
        matches: usize,
        required: usize,
    },

    #[error("Squad error: {0}")]
    Squad(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, FootballError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub features: FeatureConfig,
    pub training: TrainingConfig,
    pub ensemble: EnsembleConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub model_path: String,
    /// football-data.org token; falls back to FOOTBALL_DATA_TOKEN
    #[serde(default)]
    pub api_token: Option<String>,
    /// Competition code used by `data sync` (e.g. PL, PD, SA)
    pub competition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Matches per team in the recency window
    pub window: usize,
    /// Multiplier applied to each older match's weight
    pub decay: f32,
    /// Prior matches each team needs before a sample is emitted
    pub min_history: usize,
    /// Head-to-head meetings considered
    pub h2h_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub dropout: f64,
    pub early_stopping_patience: usize,
    pub hidden_dims: Vec<usize>,
    /// Fraction of the most recent samples held out for validation
    pub validation_fraction: f32,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// "voting" or "stacking"
    pub strategy: String,
    /// Member models: any of logistic, mlp, poisson, elo
    pub members: Vec<String>,
    /// Fixed voting weights; empty means inverse validation log-loss
    #[serde(default)]
    pub weights: Vec<f32>,
    pub stacking_folds: usize,
    /// Dixon-Coles low-score correlation
    pub rho: f32,
    pub max_goals: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub iterations: usize,
    pub seed: u64,
    /// Log-normal sigma applied to expected goals per iteration
    pub goal_noise: f32,
    /// Gaussian noise (in standard deviations) applied to normalized features
    pub feature_noise: f32,
    pub league_avg_goals: f32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                database_path: "data/football.db".to_string(),
                model_path: "model/ensemble".to_string(),
                api_token: None,
                competition: "PL".to_string(),
            },
            features: FeatureConfig {
                window: 10,
                decay: 0.85,
                min_history: 3,
                h2h_window: 6,
            },
            training: TrainingConfig {
                epochs: 150,
                batch_size: 64,
                learning_rate: 5e-3,
                weight_decay: 1e-4,
                dropout: 0.2,
                early_stopping_patience: 15,
                hidden_dims: vec![64, 32],
                validation_fraction: 0.2,
                seed: 42,
            },
            ensemble: EnsembleConfig {
                strategy: "stacking".to_string(),
                members: vec![
                    "logistic".to_string(),
                    "mlp".to_string(),
                    "poisson".to_string(),
                    "elo".to_string(),
                ],
                weights: vec![],
                stacking_folds: 4,
                rho: -0.1,
                max_goals: 10,
            },
            simulation: SimulationConfig {
                iterations: 10_000,
                seed: 7,
                goal_noise: 0.15,
                feature_noise: 0.1,
                league_avg_goals: 1.35,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FootballError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| FootballError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FootballError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(home_goals: u8, away_goals: u8) -> MatchRecord {
        MatchRecord::new(
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            TeamId(1),
            TeamId(2),
            home_goals,
            away_goals,
        )
    }

    #[test]
    fn test_team_relative_accessors() {
        let m = record(2, 1);
        assert_eq!(m.outcome(), Outcome::HomeWin);
        assert_eq!(m.winner(), Some(TeamId(1)));
        assert_eq!(m.goals_for(TeamId(2)), Some(1));
        assert_eq!(m.goals_against(TeamId(2)), Some(2));
        assert_eq!(m.points_for(TeamId(1)), Some(3));
        assert_eq!(m.points_for(TeamId(2)), Some(0));
        assert_eq!(m.opponent(TeamId(2)), Some(TeamId(1)));
        assert_eq!(m.goals_for(TeamId(3)), None);

        let draw = record(1, 1);
        assert_eq!(draw.winner(), None);
        assert_eq!(draw.points_for(TeamId(2)), Some(1));
    }

    #[test]
    fn test_outcome_probs_normalize() {
        let p = OutcomeProbs::new(2.0, 1.0, 1.0);
        assert!((p.home_win - 0.5).abs() < 1e-6);
        assert_eq!(p.most_likely(), Outcome::HomeWin);

        let degenerate = OutcomeProbs::new(0.0, 0.0, 0.0);
        assert!((degenerate.draw - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_config_roundtrip_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.features.window, config.features.window);
        assert_eq!(parsed.ensemble.members.len(), 4);
    }
}
