//! Multi-task MLP
//!
//! Architecture: Input → [Linear → ReLU → Dropout] per hidden layer
//!                     → outcome_head(3), rate_head(2)
//!
//! The outcome head is trained with cross-entropy and the rate head with a
//! Poisson likelihood on goals, so one network gives both probabilities and
//! expected goals.

use std::path::Path;

use burn::module::{AutodiffModule, Module};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use super::net::{load_module, predict_rows, save_module, NetLoss, NetOutput, OutcomeNet};
use super::{not_fitted, InferenceBackend, ModelKind, ModelOutput, OutcomeModel, TrainBackend, TrainingSet};
use crate::data::dataset::FeatureNormalization;
use crate::training::trainer::NetTrainer;
use crate::{FootballError, Result, TrainingConfig};

/// Layer sizes of the MLP, stored next to its weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpArchitecture {
    pub input_dim: usize,
    /// Hidden layer dimensions (e.g., [64, 32] for two layers)
    pub hidden_dims: Vec<usize>,
    pub dropout: f64,
}

/// A single hidden layer block: Linear → ReLU → Dropout
#[derive(Module, Debug)]
pub struct HiddenBlock<B: Backend> {
    linear: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> HiddenBlock<B> {
    pub fn new(device: &B::Device, in_dim: usize, out_dim: usize, dropout: f64) -> Self {
        HiddenBlock {
            linear: LinearConfig::new(in_dim, out_dim).init(device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear.forward(x);
        let x = relu(x);
        self.dropout.forward(x)
    }
}

#[derive(Module, Debug)]
pub struct MlpNet<B: Backend> {
    hidden: Vec<HiddenBlock<B>>,
    outcome_head: Linear<B>,
    rate_head: Linear<B>,
}

impl<B: Backend> MlpNet<B> {
    pub fn new(device: &B::Device, arch: &MlpArchitecture) -> Self {
        let mut hidden = Vec::with_capacity(arch.hidden_dims.len());
        let mut in_dim = arch.input_dim;
        for &out_dim in &arch.hidden_dims {
            hidden.push(HiddenBlock::new(device, in_dim, out_dim, arch.dropout));
            in_dim = out_dim;
        }

        MlpNet {
            hidden,
            outcome_head: LinearConfig::new(in_dim, 3).init(device),
            rate_head: LinearConfig::new(in_dim, 2).init(device),
        }
    }
}

impl<B: Backend> OutcomeNet<B> for MlpNet<B> {
    fn forward(&self, features: Tensor<B, 2>) -> NetOutput<B> {
        let x = self
            .hidden
            .iter()
            .fold(features, |x, block| block.forward(x));

        NetOutput {
            outcome_logits: Some(self.outcome_head.forward(x.clone())),
            log_rates: Some(self.rate_head.forward(x)),
        }
    }
}

/// MLP member model
#[derive(Debug)]
pub struct MlpModel {
    net: Option<MlpNet<InferenceBackend>>,
    norm: Option<FeatureNormalization>,
    arch: Option<MlpArchitecture>,
    config: TrainingConfig,
    loss: NetLoss,
}

impl MlpModel {
    const WEIGHTS: &'static str = "mlp";
    const NORM: &'static str = "mlp_norm.json";
    const ARCH: &'static str = "mlp_arch.json";

    pub fn new(config: TrainingConfig) -> Self {
        MlpModel {
            net: None,
            norm: None,
            arch: None,
            config,
            loss: NetLoss::new(1.0, 0.5),
        }
    }

    pub fn load(dir: &Path, config: TrainingConfig) -> Result<Self> {
        let norm = FeatureNormalization::load(&dir.join(Self::NORM))?;
        let arch: MlpArchitecture =
            serde_json::from_str(&std::fs::read_to_string(dir.join(Self::ARCH))?)?;
        let template = MlpNet::<InferenceBackend>::new(&super::device(), &arch);
        let net = load_module(template, &dir.join(Self::WEIGHTS))?;

        Ok(MlpModel {
            net: Some(net),
            norm: Some(norm),
            arch: Some(arch),
            ..MlpModel::new(config)
        })
    }

    /// Architecture of the fitted network
    pub fn architecture(&self) -> Option<&MlpArchitecture> {
        self.arch.as_ref()
    }

    fn fitted(&self) -> Result<(&MlpNet<InferenceBackend>, &FeatureNormalization)> {
        match (&self.net, &self.norm) {
            (Some(net), Some(norm)) => Ok((net, norm)),
            _ => Err(not_fitted(self.kind())),
        }
    }
}

impl OutcomeModel for MlpModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Mlp
    }

    fn fit(&mut self, data: &TrainingSet) -> Result<()> {
        let norm = FeatureNormalization::from_dataset(&data.train);
        let arch = MlpArchitecture {
            input_dim: norm.dim(),
            hidden_dims: self.config.hidden_dims.clone(),
            dropout: self.config.dropout,
        };

        TrainBackend::seed(self.config.seed);
        let net = MlpNet::<TrainBackend>::new(&super::device(), &arch);

        log::info!(
            "Fitting MLP {:?} on {} samples",
            arch.hidden_dims,
            data.train.len()
        );
        let trainer = NetTrainer::new(net, self.config.clone(), self.loss);
        let (net, _history) = trainer.train(data.train.clone(), data.validation.clone(), &norm)?;

        self.net = Some(net.valid());
        self.norm = Some(norm);
        self.arch = Some(arch);
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
                    expected_goals: p.rates,
                })
            })
            .collect()
    }

    fn save(&self, dir: &Path) -> Result<()> {
        let (net, norm) = self.fitted()?;
        let arch = self.arch.as_ref().ok_or_else(|| not_fitted(self.kind()))?;
        std::fs::create_dir_all(dir)?;
        save_module(net, &dir.join(Self::WEIGHTS))?;
        norm.save(&dir.join(Self::NORM))?;
        std::fs::write(dir.join(Self::ARCH), serde_json::to_string_pretty(arch)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::synthetic_dataset;

    fn config() -> TrainingConfig {
        TrainingConfig {
            epochs: 40,
            batch_size: 32,
            learning_rate: 0.01,
            dropout: 0.0,
            hidden_dims: vec![16, 8],
            early_stopping_patience: 0,
            ..crate::Config::default().training
        }
    }

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let arch = MlpArchitecture {
            input_dim: 5,
            hidden_dims: vec![8, 4],
            dropout: 0.1,
        };
        let net = MlpNet::<InferenceBackend>::new(&device, &arch);
        let output = net.forward(Tensor::zeros([3, 5], &device));

        assert_eq!(output.outcome_logits.unwrap().dims(), [3, 3]);
        assert_eq!(output.log_rates.unwrap().dims(), [3, 2]);
    }

    #[test]
    fn test_fit_predicts_goals_and_outcomes() {
        let data = synthetic_dataset(200, 4);
        let (train, val) = data.split_chronological(0.2);
        let mut model = MlpModel::new(config());
        model.fit(&TrainingSet::new(train, val)).unwrap();

        let strong = model.predict(&[1.0, 0.4, 0.4, 0.4]).unwrap();
        let weak = model.predict(&[-1.0, 0.4, 0.4, 0.4]).unwrap();
        assert!(strong.probs.home_win > weak.probs.home_win);

        let (strong_home, _) = strong.expected_goals.unwrap();
        let (weak_home, _) = weak.expected_goals.unwrap();
        assert!(strong_home > weak_home);
        assert!(strong_home > 0.0);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let data = synthetic_dataset(60, 3);
        let (train, val) = data.split_chronological(0.2);
        let mut model = MlpModel::new(TrainingConfig {
            epochs: 2,
            ..config()
        });
        model.fit(&TrainingSet::new(train, val)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        model.save(dir.path()).unwrap();
        let loaded = MlpModel::load(dir.path(), config()).unwrap();
        assert_eq!(loaded.architecture(), model.architecture());

        let row = [0.1, 0.6, 0.2];
        let a = model.predict(&row).unwrap();
        let b = loaded.predict(&row).unwrap();
        assert!((a.probs.draw - b.probs.draw).abs() < 1e-5);
        assert_eq!(a.expected_goals.is_some(), b.expected_goals.is_some());
    }
}
