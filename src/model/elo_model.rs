//! Elo expected score mapped to three-way probabilities
//!
//! With `z = logit(E)` for the home side's expected score `E`:
//!
//! ```text
//! P(home) = σ(scale·z − width)
//! P(away) = σ(−scale·z − width)
//! P(draw) = 1 − P(home) − P(away)
//! ```
//!
//! A non-negative `width` keeps the draw band non-empty.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ModelKind, ModelOutput, OutcomeModel, TrainingSet};
use crate::data::dataset::FootballDataset;
use crate::features::FixtureFeatures;
use crate::{FootballError, OutcomeProbs, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EloOutcomeModel {
    pub width: f32,
    pub scale: f32,
}

impl Default for EloOutcomeModel {
    fn default() -> Self {
        Self::new()
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl EloOutcomeModel {
    const FILE: &'static str = "elo_model.json";

    /// Unfitted parameters giving roughly a quarter of draws for even sides
    pub fn new() -> Self {
        EloOutcomeModel {
            width: 0.55,
            scale: 1.0,
        }
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(dir.join(Self::FILE))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Probabilities for a home expected score in (0, 1)
    pub fn probs_from_expected(&self, expected: f32) -> OutcomeProbs {
        let e = expected.clamp(1e-4, 1.0 - 1e-4);
        let z = (e / (1.0 - e)).ln();
        let home = sigmoid(self.scale * z - self.width);
        let away = sigmoid(-self.scale * z - self.width);
        let draw = (1.0 - home - away).max(0.0);
        OutcomeProbs::new(home, draw, away)
    }

    fn expected_score(features: &[f32]) -> Result<f32> {
        features
            .get(FixtureFeatures::ELO_EXPECTED_INDEX)
            .copied()
            .ok_or_else(|| {
                FootballError::Model(format!(
                    "Feature row has {} values, Elo expectation is at index {}",
                    features.len(),
                    FixtureFeatures::ELO_EXPECTED_INDEX
                ))
            })
    }

    fn log_likelihood(&self, data: &[(f32, usize)]) -> f64 {
        data.iter()
            .map(|(e, outcome)| {
                let p = self.probs_from_expected(*e).to_array()[*outcome];
                (p.max(1e-7) as f64).ln()
            })
            .sum()
    }

    /// Grid search over width and scale
    fn fit_dataset(&mut self, dataset: &FootballDataset) -> Result<()> {
        let data: Vec<(f32, usize)> = dataset
            .samples()
            .iter()
            .map(|s| Ok((Self::expected_score(&s.features)?, s.outcome.index())))
            .collect::<Result<_>>()?;
        if data.is_empty() {
            return Err(FootballError::Model(
                "Cannot fit Elo model on an empty dataset".to_string(),
            ));
        }

        let mut best = (*self, f64::NEG_INFINITY);
        for w in 0..=40 {
            for s in 0..=30 {
                let candidate = EloOutcomeModel {
                    width: w as f32 * 0.05,
                    scale: 0.25 + s as f32 * 0.075,
                };
                let ll = candidate.log_likelihood(&data);
                if ll > best.1 {
                    best = (candidate, ll);
                }
            }
        }

        *self = best.0;
        log::info!(
            "Elo model fitted: width={:.2}, scale={:.3}, mean log-loss={:.4}",
            self.width,
            self.scale,
            -best.1 / data.len() as f64
        );
        Ok(())
    }
}

impl OutcomeModel for EloOutcomeModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Elo
    }

    fn fit(&mut self, data: &TrainingSet) -> Result<()> {
        self.fit_dataset(&data.train)
    }

    fn predict(&self, features: &[f32]) -> Result<ModelOutput> {
        Ok(ModelOutput {
            probs: self.probs_from_expected(Self::expected_score(features)?),
            expected_goals: None,
        })
    }

    fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(Self::FILE), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::FixtureSample;
    use crate::Outcome;
    use chrono::NaiveDate;

    fn row(expected: f32) -> Vec<f32> {
        let mut features = vec![0.0; FixtureFeatures::DIM];
        features[FixtureFeatures::ELO_EXPECTED_INDEX] = expected;
        features
    }

    #[test]
    fn test_probabilities_are_symmetric_and_ordered() {
        let model = EloOutcomeModel::new();
        let even = model.probs_from_expected(0.5);
        assert!((even.home_win - even.away_win).abs() < 1e-6);
        assert!(even.draw > 0.2);

        let favourite = model.probs_from_expected(0.8);
        assert!(favourite.home_win > even.home_win);
        assert!(favourite.away_win < even.away_win);
        let sum = favourite.home_win + favourite.draw + favourite.away_win;
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_fit_widens_band_for_draw_heavy_data() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let samples: Vec<FixtureSample> = (0..90)
            .map(|i| {
                let (hg, ag) = if i % 3 == 0 { (1, 0) } else { (1, 1) };
                FixtureSample {
                    features: row(0.5),
                    outcome: Outcome::from_goals(hg, ag),
                    home_goals: hg,
                    away_goals: ag,
                    date,
                }
            })
            .collect();
        let dataset = FootballDataset::from_samples(samples);

        let mut model = EloOutcomeModel::new();
        model
            .fit(&TrainingSet::new(dataset, FootballDataset::from_samples(vec![])))
            .unwrap();
        let probs = model.predict(&row(0.5)).unwrap().probs;
        assert!(probs.draw > 0.5, "draw prob {}", probs.draw);
    }

    #[test]
    fn test_short_row_is_an_error() {
        assert!(EloOutcomeModel::new().predict(&[0.5; 4]).is_err());
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let model = EloOutcomeModel {
            width: 0.7,
            scale: 1.2,
        };
        model.save(dir.path()).unwrap();
        assert_eq!(EloOutcomeModel::load(dir.path()).unwrap(), model);
    }
}
