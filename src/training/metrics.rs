//! Training metrics and evaluation

use std::fmt;

use crate::{Outcome, OutcomeProbs};

/// Loss and accuracy accumulated over one epoch
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Total loss
    pub total_loss: f64,
    /// Outcome cross-entropy component
    pub outcome_loss: f64,
    /// Poisson goal NLL component
    pub goals_loss: f64,
    /// Number of correct arg-max outcome predictions
    pub correct: usize,
    /// Total predictions
    pub total_predictions: usize,
    /// Number of batches accumulated
    pub batch_count: usize,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update metrics with a batch result
    pub fn update(
        &mut self,
        total_loss: f32,
        outcome_loss: f32,
        goals_loss: f32,
        correct: usize,
        batch_size: usize,
    ) {
        self.total_loss += total_loss as f64;
        self.outcome_loss += outcome_loss as f64;
        self.goals_loss += goals_loss as f64;
        self.correct += correct;
        self.total_predictions += batch_size;
        self.batch_count += 1;
    }

    /// Get average total loss
    pub fn avg_loss(&self) -> f64 {
        if self.batch_count == 0 {
            0.0
        } else {
            self.total_loss / self.batch_count as f64
        }
    }

    pub fn avg_outcome_loss(&self) -> f64 {
        if self.batch_count == 0 {
            0.0
        } else {
            self.outcome_loss / self.batch_count as f64
        }
    }

    pub fn avg_goals_loss(&self) -> f64 {
        if self.batch_count == 0 {
            0.0
        } else {
            self.goals_loss / self.batch_count as f64
        }
    }

    /// Outcome prediction accuracy
    pub fn accuracy(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.correct as f64 / self.total_predictions as f64
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loss: {:.4} (outcome: {:.4}, goals: {:.4}) | Acc: {:.2}%",
            self.avg_loss(),
            self.avg_outcome_loss(),
            self.avg_goals_loss(),
            self.accuracy() * 100.0,
        )
    }
}

/// Training history for tracking progress
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    pub train_losses: Vec<f64>,
    pub val_losses: Vec<f64>,
    pub train_accuracies: Vec<f64>,
    pub val_accuracies: Vec<f64>,
    pub best_val_loss: f64,
    pub best_epoch: usize,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self {
            best_val_loss: f64::INFINITY,
            ..Default::default()
        }
    }

    /// Record metrics for an epoch; returns true if it is the best so far
    pub fn record_epoch(&mut self, epoch: usize, train: &Metrics, val: &Metrics) -> bool {
        self.train_losses.push(train.avg_loss());
        self.val_losses.push(val.avg_loss());
        self.train_accuracies.push(train.accuracy());
        self.val_accuracies.push(val.accuracy());

        if val.avg_loss() < self.best_val_loss {
            self.best_val_loss = val.avg_loss();
            self.best_epoch = epoch;
            true
        } else {
            false
        }
    }

    /// Check if we should early stop
    pub fn should_early_stop(&self, patience: usize) -> bool {
        if patience == 0 || self.val_losses.len() < patience {
            return false;
        }
        let current_epoch = self.val_losses.len() - 1;
        current_epoch - self.best_epoch >= patience
    }

    pub fn epochs(&self) -> usize {
        self.val_losses.len()
    }
}

/// Probabilistic quality of a set of predictions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalMetrics {
    /// Mean negative log probability of the actual outcome
    pub log_loss: f64,
    /// Mean multi-class Brier score
    pub brier: f64,
    /// Mean ranked probability score (outcomes ordered home, draw, away)
    pub rps: f64,
    pub accuracy: f64,
    /// Mean absolute goal error over both sides, when goals were predicted
    pub goals_mae: Option<f64>,
    pub count: usize,
}

impl EvalMetrics {
    const EPS: f64 = 1e-7;

    pub fn compute(probs: &[OutcomeProbs], actual: &[Outcome]) -> Self {
        let n = probs.len().min(actual.len());
        if n == 0 {
            return EvalMetrics {
                log_loss: 0.0,
                brier: 0.0,
                rps: 0.0,
                accuracy: 0.0,
                goals_mae: None,
                count: 0,
            };
        }

        let (mut log_loss, mut brier, mut rps, mut correct) = (0.0, 0.0, 0.0, 0usize);
        for (p, outcome) in probs.iter().zip(actual.iter()).take(n) {
            let p_arr = p.to_array().map(|v| v as f64);
            let mut y = [0.0f64; 3];
            y[outcome.index()] = 1.0;

            log_loss -= p_arr[outcome.index()].clamp(Self::EPS, 1.0).ln();
            brier += p_arr
                .iter()
                .zip(y.iter())
                .map(|(pi, yi)| (pi - yi).powi(2))
                .sum::<f64>();

            let cum_p1 = p_arr[0];
            let cum_p2 = p_arr[0] + p_arr[1];
            let cum_y1 = y[0];
            let cum_y2 = y[0] + y[1];
            rps += 0.5 * ((cum_p1 - cum_y1).powi(2) + (cum_p2 - cum_y2).powi(2));

            if p.most_likely() == *outcome {
                correct += 1;
            }
        }

        let n_f = n as f64;
        EvalMetrics {
            log_loss: log_loss / n_f,
            brier: brier / n_f,
            rps: rps / n_f,
            accuracy: correct as f64 / n_f,
            goals_mae: None,
            count: n,
        }
    }

    /// Add goal MAE from (expected, actual) pairs; rows without a goal
    /// prediction are skipped
    pub fn with_goals(mut self, expected: &[Option<(f32, f32)>], actual: &[(u8, u8)]) -> Self {
        let errors: Vec<f64> = expected
            .iter()
            .zip(actual.iter())
            .filter_map(|(e, a)| {
                e.map(|(eh, ea)| {
                    ((eh - a.0 as f32).abs() as f64 + (ea - a.1 as f32).abs() as f64) / 2.0
                })
            })
            .collect();
        if !errors.is_empty() {
            self.goals_mae = Some(errors.iter().sum::<f64>() / errors.len() as f64);
        }
        self
    }
}

impl fmt::Display for EvalMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LogLoss: {:.4} | Brier: {:.4} | RPS: {:.4} | Acc: {:.2}%",
            self.log_loss,
            self.brier,
            self.rps,
            self.accuracy * 100.0
        )?;
        if let Some(mae) = self.goals_mae {
            write!(f, " | Goals MAE: {:.3}", mae)?;
        }
        write!(f, " (n={})", self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_and_uniform_predictions() {
        let perfect = EvalMetrics::compute(&[OutcomeProbs::new(1.0, 0.0, 0.0)], &[Outcome::HomeWin]);
        assert!(perfect.log_loss < 1e-6);
        assert!(perfect.brier < 1e-9);
        assert!(perfect.rps < 1e-9);
        assert_eq!(perfect.accuracy, 1.0);

        let uniform = EvalMetrics::compute(&[OutcomeProbs::uniform()], &[Outcome::Draw]);
        assert!((uniform.log_loss - 3.0f64.ln()).abs() < 1e-5);
        assert!((uniform.brier - 2.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_rps_rewards_near_misses() {
        // Predicting a draw is closer to a home win than predicting an away win
        let near = EvalMetrics::compute(&[OutcomeProbs::new(0.0, 1.0, 0.0)], &[Outcome::HomeWin]);
        let far = EvalMetrics::compute(&[OutcomeProbs::new(0.0, 0.0, 1.0)], &[Outcome::HomeWin]);
        assert!(near.rps < far.rps);
        assert!((far.rps - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_goals_mae() {
        let metrics = EvalMetrics::compute(&[OutcomeProbs::uniform(); 2], &[Outcome::Draw; 2])
            .with_goals(&[Some((1.0, 1.0)), None], &[(2, 0), (5, 5)]);
        assert_eq!(metrics.goals_mae, Some(1.0));
    }

    #[test]
    fn test_early_stopping() {
        let mut history = TrainingHistory::new();
        let epoch = |loss: f32| {
            let mut m = Metrics::new();
            m.update(loss, loss, 0.0, 0, 1);
            m
        };

        assert!(history.record_epoch(0, &epoch(1.0), &epoch(1.0)));
        assert!(!history.record_epoch(1, &epoch(0.9), &epoch(1.1)));
        assert!(!history.should_early_stop(2));
        history.record_epoch(2, &epoch(0.8), &epoch(1.2));
        assert!(history.should_early_stop(2));
        assert_eq!(history.best_epoch, 0);
    }
}
