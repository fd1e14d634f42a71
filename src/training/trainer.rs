//! Training loop shared by the neural member models

use burn::data::dataloader::DataLoaderBuilder;
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::softmax;
use burn::tensor::ElementConversion;

use crate::data::dataset::{FeatureNormalization, FixtureBatch, FixtureBatcher, FootballDataset};
use crate::model::net::{tensor_values, NetLoss, NetOutput, OutcomeNet};
use crate::model::{ScoreGrid, TrainBackend};
use crate::training::metrics::{Metrics, TrainingHistory};
use crate::{FootballError, Result, TrainingConfig};

/// Trains any `OutcomeNet` with Adam, keeping the weights of the epoch with
/// the lowest validation loss
pub struct NetTrainer<M: AutodiffModule<TrainBackend>> {
    model: M,
    optimizer: OptimizerAdaptor<Adam, M, TrainBackend>,
    loss_fn: NetLoss,
    config: TrainingConfig,
}

impl<M> NetTrainer<M>
where
    M: AutodiffModule<TrainBackend> + OutcomeNet<TrainBackend>,
{
    pub fn new(model: M, config: TrainingConfig, loss_fn: NetLoss) -> Self {
        let optimizer = AdamConfig::new()
            .with_weight_decay(Some(burn::optim::decay::WeightDecayConfig::new(
                config.weight_decay as f32,
            )))
            .init();

        NetTrainer {
            model,
            optimizer,
            loss_fn,
            config,
        }
    }

    /// Train the model; an empty validation set falls back to the training set
    pub fn train(
        mut self,
        train_dataset: FootballDataset,
        val_dataset: FootballDataset,
        norm: &FeatureNormalization,
    ) -> Result<(M, TrainingHistory)> {
        if train_dataset.is_empty() {
            return Err(FootballError::Model(
                "Cannot train on an empty dataset".to_string(),
            ));
        }
        let val_dataset = if val_dataset.is_empty() {
            log::warn!("Validation set is empty, validating on training data");
            train_dataset.clone()
        } else {
            val_dataset
        };

        let batch_size = self.config.batch_size.clamp(1, train_dataset.len());
        let val_batch_size = self.config.batch_size.clamp(1, val_dataset.len());

        let train_loader = DataLoaderBuilder::new(FixtureBatcher::<TrainBackend>::new(
            crate::model::device(),
            norm.clone(),
        ))
        .batch_size(batch_size)
        .shuffle(self.config.seed)
        .build(train_dataset);

        let val_loader = DataLoaderBuilder::new(FixtureBatcher::<TrainBackend>::new(
            crate::model::device(),
            norm.clone(),
        ))
        .batch_size(val_batch_size)
        .build(val_dataset);

        let mut history = TrainingHistory::new();
        let mut best_model = self.model.clone();
        let epochs = self.config.epochs;

        log::info!("Starting training for {} epochs", epochs);

        for epoch in 0..epochs {
            let train_metrics = self.train_epoch(train_loader.iter())?;
            let val_metrics = self.validate_epoch(val_loader.iter())?;

            let improved = history.record_epoch(epoch, &train_metrics, &val_metrics);

            log::debug!(
                "Epoch {}/{}: Train: {} | Val: {}",
                epoch + 1,
                epochs,
                train_metrics,
                val_metrics
            );

            if improved {
                best_model = self.model.clone();
                log::debug!("  New best model (val_loss: {:.4})", history.best_val_loss);
            }

            if history.should_early_stop(self.config.early_stopping_patience) {
                log::info!(
                    "Early stopping at epoch {} (best was epoch {})",
                    epoch + 1,
                    history.best_epoch + 1
                );
                break;
            }
        }

        log::info!(
            "Training finished after {} epochs, best val loss {:.4} at epoch {}",
            history.epochs(),
            history.best_val_loss,
            history.best_epoch + 1
        );

        Ok((best_model, history))
    }

    fn train_epoch(
        &mut self,
        loader: impl Iterator<Item = FixtureBatch<TrainBackend>>,
    ) -> Result<Metrics> {
        let mut metrics = Metrics::new();

        for batch in loader {
            let batch_size = batch.features.dims()[0];
            let output = self.model.forward(batch.features.clone());
            let (total_loss, outcome_loss, goals_loss) = self.loss_fn.forward(&output, &batch);

            let total_val: f32 = total_loss.clone().into_scalar().elem();
            let outcome_val: f32 = outcome_loss.into_scalar().elem();
            let goals_val: f32 = goals_loss.into_scalar().elem();

            let grads = total_loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);
            self.model = self
                .optimizer
                .step(self.config.learning_rate, self.model.clone(), grads);

            let correct = count_correct(&output, &batch)?;
            metrics.update(total_val, outcome_val, goals_val, correct, batch_size);
        }

        Ok(metrics)
    }

    fn validate_epoch(
        &self,
        loader: impl Iterator<Item = FixtureBatch<TrainBackend>>,
    ) -> Result<Metrics> {
        let mut metrics = Metrics::new();

        for batch in loader {
            let batch_size = batch.features.dims()[0];
            let output = self.model.forward(batch.features.clone());
            let (total_loss, outcome_loss, goals_loss) = self.loss_fn.forward(&output, &batch);

            let correct = count_correct(&output, &batch)?;
            metrics.update(
                total_loss.into_scalar().elem(),
                outcome_loss.into_scalar().elem(),
                goals_loss.into_scalar().elem(),
                correct,
                batch_size,
            );
        }

        Ok(metrics)
    }
}

/// Number of rows whose most likely outcome matches the result
fn count_correct(
    output: &NetOutput<TrainBackend>,
    batch: &FixtureBatch<TrainBackend>,
) -> Result<usize> {
    let targets = tensor_values(batch.outcome.clone())?;
    let actual: Vec<usize> = targets.chunks(3).map(argmax).collect();

    let predicted: Vec<usize> = if let Some(logits) = &output.outcome_logits {
        tensor_values(softmax(logits.clone(), 1))?
            .chunks(3)
            .map(argmax)
            .collect()
    } else if let Some(log_rates) = &output.log_rates {
        tensor_values(log_rates.clone().exp())?
            .chunks(2)
            .map(|r| {
                let probs = ScoreGrid::new(r[0], r[1], 0.0, 10).outcome_probs();
                probs.most_likely().index()
            })
            .collect()
    } else {
        return Ok(0);
    };

    Ok(predicted
        .iter()
        .zip(actual.iter())
        .filter(|(p, a)| p == a)
        .count())
}

fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.2, 0.5, 0.3]), 1);
        assert_eq!(argmax(&[0.9, 0.05, 0.05]), 0);
        assert_eq!(argmax(&[]), 0);
    }
}
