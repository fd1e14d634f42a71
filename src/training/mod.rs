//! Model training
//!
//! Training loop, dataset splits, hyperparameter search and metrics.

pub mod metrics;
pub mod split;
pub mod trainer;
pub mod tuning;

pub use metrics::{EvalMetrics, Metrics, TrainingHistory};
pub use split::{expanding_folds, random_split, time_split, RandomSplit, SplitRatios};
pub use trainer::NetTrainer;
pub use tuning::{MlpHyperparams, MlpTuner, TuningGrid, TuningResult};
