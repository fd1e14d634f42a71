//! Model inference for predictions

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::data::Database;
use crate::features::FeatureBuilder;
use crate::model::{Ensemble, ScoreGrid};
use crate::{Config, ConfidenceLevel, FootballError, Prediction, Result, Team};

/// A prediction together with the names and score markets shown to users
#[derive(Debug, Clone, Serialize)]
pub struct MatchPrediction {
    pub date: NaiveDate,
    pub home_name: String,
    pub away_name: String,
    pub prediction: Prediction,
    /// Most likely scorelines with their probabilities
    pub top_scores: Vec<(u8, u8, f32)>,
    pub over_2_5: f32,
    pub both_teams_score: f32,
}

/// Predictor for making match predictions
pub struct Predictor {
    ensemble: Ensemble,
    db: Database,
    builder: FeatureBuilder,
    config: Config,
}

impl Predictor {
    /// Create a predictor whose feature state reflects every stored result
    pub fn new(ensemble: Ensemble, db: Database, config: Config) -> Result<Self> {
        let matches = db.get_all_matches()?;
        let mut builder = FeatureBuilder::new(config.features.clone());
        builder.observe_all(&matches);
        log::debug!("Predictor state built from {} matches", matches.len());

        Ok(Predictor {
            ensemble,
            db,
            builder,
            config,
        })
    }

    /// Load predictor from the saved ensemble at `config.data.model_path`
    pub fn load(db: Database, config: Config) -> Result<Self> {
        let ensemble = Ensemble::load(Path::new(&config.data.model_path), &config)?;
        Self::new(ensemble, db, config)
    }

    /// Predict a single match; `date` defaults to the day after the last result
    pub fn predict(
        &self,
        home_team: &str,
        away_team: &str,
        date: Option<NaiveDate>,
    ) -> Result<MatchPrediction> {
        let home = self.resolve(home_team)?;
        let away = self.resolve(away_team)?;
        self.predict_teams(&home, &away, date.unwrap_or_else(|| self.default_date()))
    }

    /// Predict a match between two known teams
    pub fn predict_teams(&self, home: &Team, away: &Team, date: NaiveDate) -> Result<MatchPrediction> {
        let features = self.fixture_features(home, away, date)?;
        let output = self.ensemble.predict(&features)?;
        let (expected_home, expected_away) =
            output.expected_goals.unwrap_or(self.ensemble.fallback_goals());

        let grid = ScoreGrid::new(
            expected_home,
            expected_away,
            self.config.ensemble.rho,
            self.config.ensemble.max_goals,
        );

        let prediction = Prediction {
            home_team: home.id,
            away_team: away.id,
            probs: output.probs,
            expected_home_goals: expected_home,
            expected_away_goals: expected_away,
            most_likely_score: grid.most_likely_score(),
            confidence: self.compute_confidence(
                self.builder.history_len(home.id),
                self.builder.history_len(away.id),
            ),
        };

        Ok(MatchPrediction {
            date,
            home_name: home.name.clone(),
            away_name: away.name.clone(),
            prediction,
            top_scores: grid.top_scores(5),
            over_2_5: grid.over(2.5),
            both_teams_score: grid.both_teams_score(),
        })
    }

    /// Predict stored fixtures from today onwards; fixtures whose teams lack
    /// history are skipped with a warning
    pub fn predict_upcoming(&self, limit: usize) -> Result<Vec<MatchPrediction>> {
        let today = chrono::Local::now().date_naive();
        let fixtures = self.db.get_upcoming_fixtures(today, limit)?;

        let mut predictions = Vec::with_capacity(fixtures.len());
        for fixture in fixtures {
            let home = self.db.get_team(fixture.home_team)?;
            let away = self.db.get_team(fixture.away_team)?;
            match self.predict_teams(&home, &away, fixture.date) {
                Ok(p) => predictions.push(p),
                Err(FootballError::InsufficientHistory { team, matches, .. }) => {
                    log::warn!(
                        "Skipping {} vs {}: {} has only {} matches",
                        home.name,
                        away.name,
                        team,
                        matches
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(predictions)
    }

    /// Raw feature row for a fixture, checking both teams have enough history
    pub fn fixture_features(&self, home: &Team, away: &Team, date: NaiveDate) -> Result<Vec<f32>> {
        let required = self.config.features.min_history;
        for team in [home, away] {
            let matches = self.builder.history_len(team.id);
            if matches < required {
                return Err(FootballError::InsufficientHistory {
                    team: team.name.clone(),
                    matches,
                    required,
                });
            }
        }
        Ok(self
            .builder
            .features_for_fixture(home.id, away.id, date)
            .to_vec())
    }

    pub fn resolve(&self, name: &str) -> Result<Team> {
        self.db
            .find_team_by_name(name)?
            .ok_or_else(|| FootballError::UnknownTeam(name.to_string()))
    }

    fn default_date(&self) -> NaiveDate {
        self.builder
            .last_date()
            .and_then(|d| d.succ_opt())
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Compute confidence level based on history
    fn compute_confidence(&self, home_count: usize, away_count: usize) -> ConfidenceLevel {
        let window = self.config.features.window;
        let threshold_high = window * 3 / 4;
        let threshold_medium = window / 2;

        if home_count >= threshold_high && away_count >= threshold_high {
            ConfidenceLevel::High
        } else if home_count >= threshold_medium || away_count >= threshold_medium {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn ensemble(&self) -> &Ensemble {
        &self.ensemble
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the database
    pub fn database(&self) -> &Database {
        &self.db
    }
}

/// Format a prediction for display
pub fn format_prediction(pred: &MatchPrediction) -> String {
    let p = &pred.prediction;
    let scores = pred
        .top_scores
        .iter()
        .take(3)
        .map(|(h, a, prob)| format!("{}-{} ({:.1}%)", h, a, prob * 100.0))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"
┌─────────────────────────────────────────────────┐
│  {} vs {}  ({})
├─────────────────────────────────────────────────┤
│  Home win:         {:.1}%
│  Draw:             {:.1}%
│  Away win:         {:.1}%
│  Expected goals:   {:.2} - {:.2}
│  Likely scores:    {}
│  Over 2.5 goals:   {:.1}%
│  Both teams score: {:.1}%
│  Confidence:       {}
└─────────────────────────────────────────────────┘
"#,
        pred.home_name,
        pred.away_name,
        pred.date,
        p.probs.home_win * 100.0,
        p.probs.draw * 100.0,
        p.probs.away_win * 100.0,
        p.expected_home_goals,
        p.expected_away_goals,
        scores,
        pred.over_2_5 * 100.0,
        pred.both_teams_score * 100.0,
        p.confidence
    )
}
