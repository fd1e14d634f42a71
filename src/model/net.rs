//! Shared pieces of the burn networks: output heads, loss, persistence

use std::path::Path;

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::activation::{log_softmax, softmax};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::InferenceBackend;
use crate::data::dataset::{rows_to_tensor, FeatureNormalization, FixtureBatch};
use crate::{FootballError, OutcomeProbs, Result};

/// Raw network outputs; a net may provide either head or both
#[derive(Debug, Clone)]
pub struct NetOutput<B: Backend> {
    /// Outcome logits (home, draw, away): [batch, 3]
    pub outcome_logits: Option<Tensor<B, 2>>,
    /// Log goal rates (home, away): [batch, 2]
    pub log_rates: Option<Tensor<B, 2>>,
}

/// A network mapping normalized fixture features to outputs
pub trait OutcomeNet<B: Backend>: Module<B> {
    fn forward(&self, features: Tensor<B, 2>) -> NetOutput<B>;
}

/// Multi-task loss: weighted cross-entropy plus Poisson NLL
#[derive(Debug, Clone, Copy)]
pub struct NetLoss {
    pub outcome_weight: f32,
    pub goals_weight: f32,
}

impl NetLoss {
    pub fn new(outcome_weight: f32, goals_weight: f32) -> Self {
        NetLoss {
            outcome_weight,
            goals_weight,
        }
    }

    /// Compute loss and return (total, outcome_loss, goals_loss)
    pub fn forward<B: Backend>(
        &self,
        output: &NetOutput<B>,
        batch: &FixtureBatch<B>,
    ) -> (Tensor<B, 1>, Tensor<B, 1>, Tensor<B, 1>) {
        let device = batch.features.device();

        let outcome_loss = match &output.outcome_logits {
            Some(logits) => cross_entropy(logits.clone(), batch.outcome.clone()),
            None => Tensor::zeros([1], &device),
        };

        let goals_loss = match &output.log_rates {
            Some(log_rates) => {
                let targets = Tensor::cat(
                    vec![
                        batch.home_goals.clone().unsqueeze_dim(1),
                        batch.away_goals.clone().unsqueeze_dim(1),
                    ],
                    1,
                );
                poisson_nll(log_rates.clone(), targets)
            }
            None => Tensor::zeros([1], &device),
        };

        let total = outcome_loss.clone().mul_scalar(self.outcome_weight)
            + goals_loss.clone().mul_scalar(self.goals_weight);

        (total, outcome_loss, goals_loss)
    }
}

/// Softmax cross-entropy against one-hot targets
fn cross_entropy<B: Backend>(logits: Tensor<B, 2>, one_hot: Tensor<B, 2>) -> Tensor<B, 1> {
    (one_hot * log_softmax(logits, 1)).sum_dim(1).neg().mean()
}

/// Poisson negative log-likelihood without the constant log(y!) term
fn poisson_nll<B: Backend>(log_rates: Tensor<B, 2>, goals: Tensor<B, 2>) -> Tensor<B, 1> {
    (log_rates.clone().exp() - goals * log_rates).mean()
}

/// Per-row output of a network on the inference backend
#[derive(Debug, Clone, Copy)]
pub struct NetPrediction {
    pub probs: Option<OutcomeProbs>,
    pub rates: Option<(f32, f32)>,
}

/// Run a trained net over raw feature rows
pub fn predict_rows<N: OutcomeNet<InferenceBackend>>(
    net: &N,
    norm: &FeatureNormalization,
    rows: &[Vec<f32>],
) -> Result<Vec<NetPrediction>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let device = super::device();
    let input = norm.normalize_tensor(rows_to_tensor::<InferenceBackend>(rows, &device)?);
    let output = net.forward(input);

    let probs = match output.outcome_logits {
        Some(logits) => Some(tensor_values(softmax(logits, 1))?),
        None => None,
    };
    let rates = match output.log_rates {
        Some(log_rates) => Some(tensor_values(log_rates.exp())?),
        None => None,
    };

    Ok((0..rows.len())
        .map(|i| NetPrediction {
            probs: probs
                .as_ref()
                .map(|p| OutcomeProbs::from_slice(&p[i * 3..i * 3 + 3])),
            rates: rates.as_ref().map(|r| (r[i * 2], r[i * 2 + 1])),
        })
        .collect())
}

/// Flatten a tensor into host memory
pub fn tensor_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| FootballError::Model(format!("Failed to read tensor: {:?}", e)))
}

/// Save a module's weights (`.mpk` is appended)
pub fn save_module<M: Module<InferenceBackend>>(module: &M, path: &Path) -> Result<()> {
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    recorder
        .record(module.clone().into_record(), path.to_path_buf())
        .map_err(|e| FootballError::Io(std::io::Error::other(e.to_string())))
}

/// Load weights saved by `save_module` into a freshly initialised module
pub fn load_module<M: Module<InferenceBackend>>(template: M, path: &Path) -> Result<M> {
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let record = recorder
        .load(path.to_path_buf(), &super::device())
        .map_err(|e| FootballError::Io(std::io::Error::other(e.to_string())))?;
    Ok(template.load_record(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Int;

    type TestBackend = InferenceBackend;

    fn batch(outcome: [f32; 3], goals: (f32, f32)) -> FixtureBatch<TestBackend> {
        let device = Default::default();
        FixtureBatch {
            features: Tensor::zeros([1, 2], &device),
            outcome: Tensor::<TestBackend, 1>::from_floats(outcome, &device).reshape([1, 3]),
            outcome_index: Tensor::<TestBackend, 1, Int>::from_ints([0], &device),
            home_goals: Tensor::from_floats([goals.0], &device),
            away_goals: Tensor::from_floats([goals.1], &device),
        }
    }

    #[test]
    fn test_uniform_logits_cross_entropy_is_ln3() {
        let device = Default::default();
        let output = NetOutput::<TestBackend> {
            outcome_logits: Some(Tensor::zeros([1, 3], &device)),
            log_rates: None,
        };
        let (total, ce, goals) = NetLoss::new(1.0, 1.0).forward(&output, &batch([0.0, 1.0, 0.0], (1.0, 1.0)));

        let ce = tensor_values(ce).unwrap()[0];
        assert!((ce - 3.0f32.ln()).abs() < 1e-5);
        assert_eq!(tensor_values(goals).unwrap()[0], 0.0);
        assert!((tensor_values(total).unwrap()[0] - ce).abs() < 1e-6);
    }

    #[test]
    fn test_poisson_nll_minimised_at_true_rate() {
        let device = Default::default();
        let loss = NetLoss::new(0.0, 1.0);
        let at = |rate: f32| {
            let output = NetOutput::<TestBackend> {
                outcome_logits: None,
                log_rates: Some(
                    Tensor::<TestBackend, 1>::from_floats([rate.ln(), rate.ln()], &device)
                        .reshape([1, 2]),
                ),
            };
            let (total, _, _) = loss.forward(&output, &batch([1.0, 0.0, 0.0], (2.0, 2.0)));
            tensor_values(total).unwrap()[0]
        };

        assert!(at(2.0) < at(1.0));
        assert!(at(2.0) < at(3.0));
    }
}
