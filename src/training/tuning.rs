//! MLP hyperparameter grid search on the validation split

use crate::model::{MlpModel, OutcomeModel, TrainingSet};
use crate::training::metrics::EvalMetrics;
use crate::{OutcomeProbs, Result, TrainingConfig};

/// Hyperparameters to tune
#[derive(Debug, Clone, PartialEq)]
pub struct MlpHyperparams {
    pub learning_rate: f64,
    pub hidden_dims: Vec<usize>,
    pub weight_decay: f64,
}

/// Results from a tuning run
#[derive(Debug, Clone)]
pub struct TuningResult {
    pub hyperparams: MlpHyperparams,
    pub val_metrics: EvalMetrics,
}

/// Grid of candidate values; every combination is tried
#[derive(Debug, Clone)]
pub struct TuningGrid {
    pub learning_rates: Vec<f64>,
    pub hidden_dims: Vec<Vec<usize>>,
    pub weight_decays: Vec<f64>,
}

impl Default for TuningGrid {
    fn default() -> Self {
        TuningGrid {
            learning_rates: vec![1e-3, 5e-3, 1e-2],
            hidden_dims: vec![vec![32], vec![64, 32], vec![128, 64]],
            weight_decays: vec![0.0, 1e-4, 1e-3],
        }
    }
}

impl TuningGrid {
    pub fn candidates(&self) -> Vec<MlpHyperparams> {
        let mut out = Vec::new();
        for &learning_rate in &self.learning_rates {
            for hidden_dims in &self.hidden_dims {
                for &weight_decay in &self.weight_decays {
                    out.push(MlpHyperparams {
                        learning_rate,
                        hidden_dims: hidden_dims.clone(),
                        weight_decay,
                    });
                }
            }
        }
        out
    }
}

/// MLP tuner for hyperparameter search
pub struct MlpTuner {
    base: TrainingConfig,
}

impl MlpTuner {
    pub fn new(base: TrainingConfig) -> Self {
        MlpTuner { base }
    }

    /// Cap epochs per candidate
    pub fn with_max_epochs(mut self, epochs: usize) -> Self {
        self.base.epochs = epochs;
        self
    }

    /// Run every candidate; results are ranked by validation log-loss
    pub fn tune(&self, data: &TrainingSet, grid: &TuningGrid) -> Result<Vec<TuningResult>> {
        let candidates = grid.candidates();
        let rows = data.validation.feature_rows();
        let outcomes = data.validation.outcomes();
        let mut results = Vec::with_capacity(candidates.len());

        for (i, hyperparams) in candidates.into_iter().enumerate() {
            log::info!(
                "[{}/{}] Testing lr={}, hidden={:?}, weight_decay={}",
                i + 1,
                grid.learning_rates.len() * grid.hidden_dims.len() * grid.weight_decays.len(),
                hyperparams.learning_rate,
                hyperparams.hidden_dims,
                hyperparams.weight_decay
            );

            let config = TrainingConfig {
                learning_rate: hyperparams.learning_rate,
                hidden_dims: hyperparams.hidden_dims.clone(),
                weight_decay: hyperparams.weight_decay,
                ..self.base.clone()
            };
            let mut model = MlpModel::new(config);
            model.fit(data)?;

            let probs: Vec<OutcomeProbs> = model
                .predict_batch(&rows)?
                .into_iter()
                .map(|o| o.probs)
                .collect();
            let val_metrics = EvalMetrics::compute(&probs, &outcomes);
            log::info!("  {}", val_metrics);

            results.push(TuningResult {
                hyperparams,
                val_metrics,
            });
        }

        results.sort_by(|a, b| a.val_metrics.log_loss.total_cmp(&b.val_metrics.log_loss));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::synthetic_dataset;

    #[test]
    fn test_grid_enumerates_all_combinations() {
        let grid = TuningGrid::default();
        let candidates = grid.candidates();
        assert_eq!(candidates.len(), 27);
        assert_eq!(candidates[0].hidden_dims, vec![32]);
    }

    #[test]
    fn test_results_are_ranked() {
        let (train, val) = synthetic_dataset(80, 3).split_chronological(0.25);
        let data = TrainingSet::new(train, val);
        let grid = TuningGrid {
            learning_rates: vec![1e-4, 1e-2],
            hidden_dims: vec![vec![8]],
            weight_decays: vec![0.0],
        };
        let base = TrainingConfig {
            batch_size: 16,
            early_stopping_patience: 0,
            ..crate::Config::default().training
        };

        let results = MlpTuner::new(base).with_max_epochs(5).tune(&data, &grid).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].val_metrics.log_loss <= results[1].val_metrics.log_loss);
        assert_eq!(results[0].val_metrics.count, 20);
    }
}
