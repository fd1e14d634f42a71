//! Outcome and goal models
//!
//! Every model predicts three-way outcome probabilities from a fixture
//! feature row; Poisson and MLP also predict expected goals. The ensemble
//! combines them.

pub mod elo_model;
pub mod ensemble;
pub mod logistic;
pub mod mlp;
pub mod net;
pub mod poisson;
pub mod scoregrid;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};

use crate::data::dataset::FootballDataset;
use crate::{Config, FootballError, OutcomeProbs, Result};

pub use elo_model::EloOutcomeModel;
pub use ensemble::{Ensemble, EnsembleStrategy};
pub use logistic::LogisticModel;
pub use mlp::MlpModel;
pub use poisson::PoissonModel;
pub use scoregrid::ScoreGrid;

/// Backend used for inference and stored weights
pub type InferenceBackend = NdArray<f32>;
/// Backend used while training
pub type TrainBackend = Autodiff<InferenceBackend>;

pub fn device() -> NdArrayDevice {
    NdArrayDevice::Cpu
}

/// Prediction of one model for one fixture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelOutput {
    pub probs: OutcomeProbs,
    /// Expected (home, away) goals, for models with a goal head
    pub expected_goals: Option<(f32, f32)>,
}

/// Training data with a chronologically later validation split
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub train: FootballDataset,
    pub validation: FootballDataset,
}

impl TrainingSet {
    pub fn new(train: FootballDataset, validation: FootballDataset) -> Self {
        TrainingSet { train, validation }
    }

    pub fn feature_dim(&self) -> usize {
        self.train.feature_dim().max(self.validation.feature_dim())
    }
}

/// Common interface of all member models
pub trait OutcomeModel {
    fn kind(&self) -> ModelKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn fit(&mut self, data: &TrainingSet) -> Result<()>;

    fn predict(&self, features: &[f32]) -> Result<ModelOutput>;

    fn predict_batch(&self, rows: &[Vec<f32>]) -> Result<Vec<ModelOutput>> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Write the fitted model into `dir`
    fn save(&self, dir: &Path) -> Result<()>;
}

/// Available member models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Logistic,
    Mlp,
    Poisson,
    Elo,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Logistic,
        ModelKind::Mlp,
        ModelKind::Poisson,
        ModelKind::Elo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Logistic => "logistic",
            ModelKind::Mlp => "mlp",
            ModelKind::Poisson => "poisson",
            ModelKind::Elo => "elo",
        }
    }

    /// Unfitted model configured from the application config
    pub fn build(&self, config: &Config) -> Box<dyn OutcomeModel> {
        match self {
            ModelKind::Logistic => Box::new(LogisticModel::new(config.training.clone())),
            ModelKind::Mlp => Box::new(MlpModel::new(config.training.clone())),
            ModelKind::Poisson => Box::new(PoissonModel::new(
                config.training.clone(),
                config.ensemble.rho,
                config.ensemble.max_goals,
            )),
            ModelKind::Elo => Box::new(EloOutcomeModel::new()),
        }
    }

    /// Load a fitted model saved in `dir`
    pub fn load(&self, dir: &Path, config: &Config) -> Result<Box<dyn OutcomeModel>> {
        Ok(match self {
            ModelKind::Logistic => Box::new(LogisticModel::load(dir, config.training.clone())?),
            ModelKind::Mlp => Box::new(MlpModel::load(dir, config.training.clone())?),
            ModelKind::Poisson => Box::new(PoissonModel::load(
                dir,
                config.training.clone(),
                config.ensemble.rho,
                config.ensemble.max_goals,
            )?),
            ModelKind::Elo => Box::new(EloOutcomeModel::load(dir)?),
        })
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ModelKind {
    type Err = FootballError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "logistic" | "logreg" => Ok(ModelKind::Logistic),
            "mlp" | "nn" => Ok(ModelKind::Mlp),
            "poisson" => Ok(ModelKind::Poisson),
            "elo" => Ok(ModelKind::Elo),
            _ => Err(FootballError::Config(format!(
                "Unknown model '{}'. Use: logistic, mlp, poisson, elo",
                s
            ))),
        }
    }
}

/// Error for predicting with a model that has not been fitted
pub(crate) fn not_fitted(kind: ModelKind) -> FootballError {
    FootballError::Model(format!("{} model has not been fitted", kind))
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    use crate::data::dataset::{FixtureSample, FootballDataset};
    use crate::Outcome;

    /// Synthetic samples where feature 0 drives the home side's goals
    pub fn synthetic_dataset(n: usize, dim: usize) -> FootballDataset {
        let start = NaiveDate::from_ymd_opt(2022, 8, 1).unwrap();
        let samples = (0..n)
            .map(|i| {
                let strength = ((i * 7919) % 13) as f32 / 6.0 - 1.0;
                let mut features = vec![0.0; dim];
                features[0] = strength;
                for (j, f) in features.iter_mut().enumerate().skip(1) {
                    *f = ((i + j) % 5) as f32 / 5.0;
                }
                let (hg, ag) = if strength > 0.3 {
                    (2 + (i % 2) as u8, (i % 2) as u8)
                } else if strength < -0.3 {
                    ((i % 2) as u8, 2)
                } else {
                    (1, 1)
                };
                FixtureSample {
                    features,
                    outcome: Outcome::from_goals(hg, ag),
                    home_goals: hg,
                    away_goals: ag,
                    date: start + chrono::Duration::days(i as i64),
                }
            })
            .collect();
        FootballDataset::from_samples(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_kind_parse() {
        assert_eq!("MLP".parse::<ModelKind>().unwrap(), ModelKind::Mlp);
        assert_eq!("logreg".parse::<ModelKind>().unwrap(), ModelKind::Logistic);
        assert!("forest".parse::<ModelKind>().is_err());
        for kind in ModelKind::ALL {
            assert_eq!(kind.name().parse::<ModelKind>().unwrap(), kind);
        }
    }
}
