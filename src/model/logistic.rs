//! Multinomial logistic regression over fixture features

use std::path::Path;

use burn::module::{AutodiffModule, Module};
use burn::nn::{Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::net::{load_module, predict_rows, save_module, NetLoss, NetOutput, OutcomeNet};
use super::{not_fitted, InferenceBackend, ModelKind, ModelOutput, OutcomeModel, TrainBackend, TrainingSet};
use crate::data::dataset::FeatureNormalization;
use crate::training::trainer::NetTrainer;
use crate::{FootballError, Result, TrainingConfig};

/// Single linear layer producing outcome logits
#[derive(Module, Debug)]
pub struct LogisticNet<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> LogisticNet<B> {
    pub fn new(device: &B::Device, input_dim: usize) -> Self {
        LogisticNet {
            linear: LinearConfig::new(input_dim, 3).init(device),
        }
    }
}

impl<B: Backend> OutcomeNet<B> for LogisticNet<B> {
    fn forward(&self, features: Tensor<B, 2>) -> NetOutput<B> {
        NetOutput {
            outcome_logits: Some(self.linear.forward(features)),
            log_rates: None,
        }
    }
}

/// Logistic regression member; weight decay acts as L2 regularization
#[derive(Debug)]
pub struct LogisticModel {
    net: Option<LogisticNet<InferenceBackend>>,
    norm: Option<FeatureNormalization>,
    config: TrainingConfig,
}

impl LogisticModel {
    const WEIGHTS: &'static str = "logistic";
    const NORM: &'static str = "logistic_norm.json";

    pub fn new(config: TrainingConfig) -> Self {
        LogisticModel {
            net: None,
            norm: None,
            config,
        }
    }

    pub fn load(dir: &Path, config: TrainingConfig) -> Result<Self> {
        let norm = FeatureNormalization::load(&dir.join(Self::NORM))?;
        let template = LogisticNet::<InferenceBackend>::new(&super::device(), norm.dim());
        let net = load_module(template, &dir.join(Self::WEIGHTS))?;
        Ok(LogisticModel {
            net: Some(net),
            norm: Some(norm),
            config,
        })
    }

    fn fitted(&self) -> Result<(&LogisticNet<InferenceBackend>, &FeatureNormalization)> {
        match (&self.net, &self.norm) {
            (Some(net), Some(norm)) => Ok((net, norm)),
            _ => Err(not_fitted(self.kind())),
        }
    }
}

impl OutcomeModel for LogisticModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Logistic
    }

    fn fit(&mut self, data: &TrainingSet) -> Result<()> {
        let norm = FeatureNormalization::from_dataset(&data.train);
        TrainBackend::seed(self.config.seed);
        let net = LogisticNet::<TrainBackend>::new(&super::device(), norm.dim());

        log::info!("Fitting logistic regression on {} samples", data.train.len());
        let trainer = NetTrainer::new(net, self.config.clone(), NetLoss::new(1.0, 0.0));
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
                let probs = p
                    .probs
                    .ok_or_else(|| FootballError::Model("Missing outcome head".to_string()))?;
                Ok(ModelOutput {
                    probs,
                    expected_goals: None,
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
    use crate::Outcome;

    fn config() -> TrainingConfig {
        TrainingConfig {
            epochs: 60,
            batch_size: 32,
            learning_rate: 0.05,
            early_stopping_patience: 0,
            ..crate::Config::default().training
        }
    }

    #[test]
    fn test_unfitted_model_errors() {
        let model = LogisticModel::new(config());
        assert!(model.predict(&[0.0; 4]).is_err());
    }

    #[test]
    fn test_fit_learns_strength_feature() {
        let data = synthetic_dataset(200, 4);
        let (train, val) = data.split_chronological(0.2);
        let mut model = LogisticModel::new(config());
        model.fit(&TrainingSet::new(train, val)).unwrap();

        let strong = model.predict(&[1.0, 0.4, 0.4, 0.4]).unwrap();
        let weak = model.predict(&[-1.0, 0.4, 0.4, 0.4]).unwrap();
        assert!(strong.probs.home_win > weak.probs.home_win);
        assert_eq!(strong.probs.most_likely(), Outcome::HomeWin);
        assert!(strong.expected_goals.is_none());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let data = synthetic_dataset(60, 3);
        let (train, val) = data.split_chronological(0.2);
        let mut model = LogisticModel::new(TrainingConfig {
            epochs: 3,
            ..config()
        });
        model.fit(&TrainingSet::new(train, val)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        model.save(dir.path()).unwrap();
        let loaded = LogisticModel::load(dir.path(), config()).unwrap();

        let row = [0.5, 0.2, 0.1];
        let a = model.predict(&row).unwrap().probs;
        let b = loaded.predict(&row).unwrap().probs;
        assert!((a.home_win - b.home_win).abs() < 1e-5);
    }
}
