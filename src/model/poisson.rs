//! Poisson goal model
//!
//! A log-linear regression predicts each side's goal rate; outcome
//! probabilities come from the Dixon-Coles corrected score grid.

use std::path::Path;

use burn::module::{AutodiffModule, Module};
use burn::nn::{Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::net::{load_module, predict_rows, save_module, NetLoss, NetOutput, OutcomeNet};
use super::scoregrid::ScoreGrid;
use super::{not_fitted, InferenceBackend, ModelKind, ModelOutput, OutcomeModel, TrainBackend, TrainingSet};
use crate::data::dataset::FeatureNormalization;
use crate::training::trainer::NetTrainer;
use crate::{FootballError, Result, TrainingConfig};

/// Linear layer producing (home, away) log goal rates
#[derive(Module, Debug)]
pub struct PoissonNet<B: Backend> {
    rates: Linear<B>,
}

impl<B: Backend> PoissonNet<B> {
    pub fn new(device: &B::Device, input_dim: usize) -> Self {
        PoissonNet {
            rates: LinearConfig::new(input_dim, 2).init(device),
        }
    }
}

impl<B: Backend> OutcomeNet<B> for PoissonNet<B> {
    fn forward(&self, features: Tensor<B, 2>) -> NetOutput<B> {
        NetOutput {
            outcome_logits: None,
            log_rates: Some(self.rates.forward(features)),
        }
    }
}

#[derive(Debug)]
pub struct PoissonModel {
    net: Option<PoissonNet<InferenceBackend>>,
    norm: Option<FeatureNormalization>,
    config: TrainingConfig,
    rho: f32,
    max_goals: usize,
}

impl PoissonModel {
    const WEIGHTS: &'static str = "poisson";
    const NORM: &'static str = "poisson_norm.json";

    pub fn new(config: TrainingConfig, rho: f32, max_goals: usize) -> Self {
        PoissonModel {
            net: None,
            norm: None,
            config,
            rho,
            max_goals,
        }
    }

    pub fn load(dir: &Path, config: TrainingConfig, rho: f32, max_goals: usize) -> Result<Self> {
        let norm = FeatureNormalization::load(&dir.join(Self::NORM))?;
        let template = PoissonNet::<InferenceBackend>::new(&super::device(), norm.dim());
        let net = load_module(template, &dir.join(Self::WEIGHTS))?;
        Ok(PoissonModel {
            net: Some(net),
            norm: Some(norm),
            config,
            rho,
            max_goals,
        })
    }

    /// Expected goals for a feature row
    pub fn rates(&self, features: &[f32]) -> Result<(f32, f32)> {
        let (net, norm) = self.fitted()?;
        predict_rows(net, norm, &[features.to_vec()])?
            .first()
            .and_then(|p| p.rates)
            .ok_or_else(|| FootballError::Model("Missing rate head".to_string()))
    }

    /// Full score distribution for a feature row
    pub fn score_grid(&self, features: &[f32]) -> Result<ScoreGrid> {
        let (home, away) = self.rates(features)?;
        Ok(ScoreGrid::new(home, away, self.rho, self.max_goals))
    }

    fn fitted(&self) -> Result<(&PoissonNet<InferenceBackend>, &FeatureNormalization)> {
        match (&self.net, &self.norm) {
            (Some(net), Some(norm)) => Ok((net, norm)),
            _ => Err(not_fitted(self.kind())),
        }
    }
}

impl OutcomeModel for PoissonModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Poisson
    }

    fn fit(&mut self, data: &TrainingSet) -> Result<()> {
        let norm = FeatureNormalization::from_dataset(&data.train);
        TrainBackend::seed(self.config.seed);
        let net = PoissonNet::<TrainBackend>::new(&super::device(), norm.dim());

        log::info!("Fitting Poisson goal model on {} samples", data.train.len());
        let trainer = NetTrainer::new(net, self.config.clone(), NetLoss::new(0.0, 1.0));
        let (net, _history) = trainer.train(data.train.clone(), data.validation.clone(), &norm)?;

        self.net = Some(net.valid());
        self.norm = Some(norm);
        Ok(())
    }

    fn predict(&self, features: &[f32]) -> Result<ModelOutput> {
        self.predict_batch(&[features.to_vec()])?
            .pop()
            .ok_or_else(|| FootballError::Model("Empty prediction".to_string()))
    }

    fn predict_batch(&self, rows: &[Vec<f32>]) -> Result<Vec<ModelOutput>> {
        let (net, norm) = self.fitted()?;
        predict_rows(net, norm, rows)?
            .into_iter()
            .map(|p| {
                let (home, away) = p
                    .rates
                    .ok_or_else(|| FootballError::Model("Missing rate head".to_string()))?;
                let grid = ScoreGrid::new(home, away, self.rho, self.max_goals);
                Ok(ModelOutput {
                    probs: grid.outcome_probs(),
                    expected_goals: Some((home, away)),
                })
            })
            .collect()
    }

    fn save(&self, dir: &Path) -> Result<()> {
        let (net, norm) = self.fitted()?;
        std::fs::create_dir_all(dir)?;
        save_module(net, &dir.join(Self::WEIGHTS))?;
        norm.save(&dir.join(Self::NORM))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::synthetic_dataset;

    #[test]
    fn test_fit_tracks_goal_rates() {
        let config = TrainingConfig {
            epochs: 80,
            batch_size: 32,
            learning_rate: 0.05,
            early_stopping_patience: 0,
            ..crate::Config::default().training
        };
        let data = synthetic_dataset(200, 3);
        let (train, val) = data.split_chronological(0.2);
        let mut model = PoissonModel::new(config, -0.1, 10);
        model.fit(&TrainingSet::new(train, val)).unwrap();

        let (strong_home, strong_away) = model.rates(&[1.0, 0.4, 0.4]).unwrap();
        let (weak_home, weak_away) = model.rates(&[-1.0, 0.4, 0.4]).unwrap();
        assert!(strong_home > weak_home);
        assert!(strong_away < weak_away);

        let output = model.predict(&[1.0, 0.4, 0.4]).unwrap();
        assert!(output.probs.home_win > output.probs.away_win);
        let sum = output.probs.home_win + output.probs.draw + output.probs.away_win;
        assert!((sum - 1.0).abs() < 1e-4);

        let grid = model.score_grid(&[1.0, 0.4, 0.4]).unwrap();
        assert_eq!(grid.max_goals(), 10);
    }
}
