//! Ensemble of member models
//!
//! Voting averages member probabilities with fixed or validation-derived
//! weights. Stacking trains a logistic meta-model on out-of-fold member
//! probabilities from expanding time folds.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::logistic::LogisticModel;
use super::{ModelKind, ModelOutput, OutcomeModel, TrainingSet};
use crate::data::dataset::{FeatureNormalization, FixtureSample, FootballDataset};
use crate::training::metrics::EvalMetrics;
use crate::training::split::expanding_folds;
use crate::{Config, FootballError, OutcomeProbs, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnsembleStrategy {
    Voting,
    Stacking,
}

impl fmt::Display for EnsembleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnsembleStrategy::Voting => write!(f, "voting"),
            EnsembleStrategy::Stacking => write!(f, "stacking"),
        }
    }
}

impl FromStr for EnsembleStrategy {
    type Err = FootballError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "voting" | "vote" => Ok(EnsembleStrategy::Voting),
            "stacking" | "stack" => Ok(EnsembleStrategy::Stacking),
            _ => Err(FootballError::Config(format!(
                "Unknown ensemble strategy '{}'. Use: voting, stacking",
                s
            ))),
        }
    }
}

/// Contents of `manifest.json` in a saved bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    strategy: EnsembleStrategy,
    members: Vec<ModelKind>,
    weights: Vec<f32>,
    fallback_goals: (f32, f32),
    trained_at: String,
    samples: usize,
}

/// Validation metrics of one ensemble component
#[derive(Debug, Clone)]
pub struct ComponentMetrics {
    pub name: String,
    pub metrics: EvalMetrics,
}

pub struct Ensemble {
    strategy: EnsembleStrategy,
    members: Vec<Box<dyn OutcomeModel>>,
    weights: Vec<f32>,
    meta: Option<LogisticModel>,
    /// Feature scale of the training data, used to perturb rows
    normalization: Option<FeatureNormalization>,
    fallback_goals: (f32, f32),
    samples: usize,
    config: Config,
}

impl fmt::Debug for Ensemble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ensemble")
            .field("strategy", &self.strategy)
            .field("members", &self.member_kinds())
            .field("weights", &self.weights)
            .field("fallback_goals", &self.fallback_goals)
            .finish()
    }
}

impl Ensemble {
    const MANIFEST: &'static str = "manifest.json";
    const NORM: &'static str = "features_norm.json";
    const META_DIR: &'static str = "meta";

    /// Unfitted ensemble from the `[ensemble]` config section
    pub fn new(config: &Config) -> Result<Self> {
        let strategy: EnsembleStrategy = config.ensemble.strategy.parse()?;
        let kinds: Vec<ModelKind> = config
            .ensemble
            .members
            .iter()
            .map(|m| m.parse())
            .collect::<Result<_>>()?;
        Self::with_members(config, strategy, &kinds)
    }

    pub fn with_members(
        config: &Config,
        strategy: EnsembleStrategy,
        kinds: &[ModelKind],
    ) -> Result<Self> {
        if kinds.is_empty() {
            return Err(FootballError::Config(
                "Ensemble needs at least one member model".to_string(),
            ));
        }
        let members = kinds.iter().map(|k| k.build(config)).collect();
        Ok(Ensemble {
            strategy,
            members,
            weights: vec![1.0 / kinds.len() as f32; kinds.len()],
            meta: None,
            normalization: None,
            fallback_goals: (
                config.simulation.league_avg_goals,
                config.simulation.league_avg_goals,
            ),
            samples: 0,
            config: config.clone(),
        })
    }

    pub fn strategy(&self) -> EnsembleStrategy {
        self.strategy
    }

    pub fn member_kinds(&self) -> Vec<ModelKind> {
        self.members.iter().map(|m| m.kind()).collect()
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Feature scale of the training data, if fitted
    pub fn normalization(&self) -> Option<&FeatureNormalization> {
        self.normalization.as_ref()
    }

    /// Expected goals used when no member predicts goals
    pub fn fallback_goals(&self) -> (f32, f32) {
        self.fallback_goals
    }

    pub fn is_fitted(&self) -> bool {
        self.normalization.is_some()
    }

    /// Fit all members (and the meta-model when stacking); returns
    /// validation metrics per member and for the ensemble
    pub fn fit(&mut self, data: &TrainingSet) -> Result<Vec<ComponentMetrics>> {
        if data.train.is_empty() {
            return Err(FootballError::Model(
                "No training samples; import match history first".to_string(),
            ));
        }
        // Validation rows stay unseen until the metrics below
        self.normalization = Some(FeatureNormalization::from_dataset(&data.train));
        self.fallback_goals = data.train.mean_goals();
        self.samples = data.train.len();

        if self.strategy == EnsembleStrategy::Stacking {
            match self.fit_meta(&data.train)? {
                Some(meta) => self.meta = Some(meta),
                None => {
                    log::warn!(
                        "Not enough samples for {} stacking folds, falling back to voting",
                        self.config.ensemble.stacking_folds
                    );
                    self.strategy = EnsembleStrategy::Voting;
                    self.meta = None;
                }
            }
        }

        // Members are refit on the whole training split
        for member in self.members.iter_mut() {
            log::info!("Fitting {} member", member.name());
            member.fit(data)?;
        }

        let mut report = Vec::new();
        let mut log_losses = Vec::new();
        if !data.validation.is_empty() {
            let rows = data.validation.feature_rows();
            let outcomes = data.validation.outcomes();
            let goals = data.validation.goals();
            for member in &self.members {
                let outputs = member.predict_batch(&rows)?;
                let metrics = metrics_for(&outputs, &outcomes, &goals);
                log::info!("  {:<9} {}", member.name(), metrics);
                log_losses.push(metrics.log_loss);
                report.push(ComponentMetrics {
                    name: member.name().to_string(),
                    metrics,
                });
            }
        }

        self.weights = self.resolve_weights(&log_losses);

        if !data.validation.is_empty() {
            let metrics = self.evaluate_dataset(&data.validation)?;
            log::info!("  {:<9} {}", "ensemble", metrics);
            report.push(ComponentMetrics {
                name: "ensemble".to_string(),
                metrics,
            });
        }

        Ok(report)
    }

    /// Configured weights, else inverse validation log-loss, else equal
    fn resolve_weights(&self, log_losses: &[f64]) -> Vec<f32> {
        let n = self.members.len();
        let configured = &self.config.ensemble.weights;
        let raw: Vec<f32> = if configured.len() == n && configured.iter().any(|w| *w > 0.0) {
            configured.iter().map(|w| w.max(0.0)).collect()
        } else if log_losses.len() == n {
            log_losses
                .iter()
                .map(|ll| 1.0 / (ll.max(1e-6) as f32))
                .collect()
        } else {
            vec![1.0; n]
        };
        let total: f32 = raw.iter().sum();
        if total <= 0.0 {
            return vec![1.0 / n as f32; n];
        }
        raw.iter().map(|w| w / total).collect()
    }

    /// Out-of-fold member probabilities over the training split feed a
    /// logistic meta-model
    fn fit_meta(&self, train: &FootballDataset) -> Result<Option<LogisticModel>> {
        let folds = expanding_folds(train.len(), self.config.ensemble.stacking_folds);
        if folds.is_empty() {
            return Ok(None);
        }
        let kinds = self.member_kinds();
        let fraction = self.config.training.validation_fraction;

        let mut meta_samples: Vec<FixtureSample> = Vec::new();
        for (i, (train_range, val_range)) in folds.into_iter().enumerate() {
            let fold_train: Vec<usize> = train_range.collect();
            let fold_val: Vec<usize> = val_range.collect();
            let fold_train = train.subset(&fold_train);
            let fold_val = train.subset(&fold_val);
            log::info!(
                "Stacking fold {}: train={}, predict={}",
                i + 1,
                fold_train.len(),
                fold_val.len()
            );

            let (inner_train, inner_val) = fold_train.split_chronological(fraction);
            let inner = TrainingSet::new(inner_train, inner_val);
            let rows = fold_val.feature_rows();

            let mut columns: Vec<Vec<ModelOutput>> = Vec::with_capacity(kinds.len());
            for kind in &kinds {
                let mut model = kind.build(&self.config);
                model.fit(&inner)?;
                columns.push(model.predict_batch(&rows)?);
            }

            for (j, sample) in fold_val.samples().iter().enumerate() {
                let features = columns
                    .iter()
                    .flat_map(|col| col[j].probs.to_array())
                    .collect();
                meta_samples.push(FixtureSample {
                    features,
                    ..sample.clone()
                });
            }
        }

        let meta_data = FootballDataset::from_samples(meta_samples);
        let (meta_train, meta_val) = meta_data.split_chronological(fraction);
        let mut meta = LogisticModel::new(self.config.training.clone());
        log::info!("Fitting stacking meta-model on {} samples", meta_data.len());
        meta.fit(&TrainingSet::new(meta_train, meta_val))?;
        Ok(Some(meta))
    }

    /// Outputs of every member for each row
    pub fn member_outputs(&self, rows: &[Vec<f32>]) -> Result<Vec<Vec<ModelOutput>>> {
        self.members.iter().map(|m| m.predict_batch(rows)).collect()
    }

    pub fn predict(&self, features: &[f32]) -> Result<ModelOutput> {
        self.predict_batch(&[features.to_vec()])?
            .pop()
            .ok_or_else(|| FootballError::Model("Empty prediction".to_string()))
    }

    pub fn predict_batch(&self, rows: &[Vec<f32>]) -> Result<Vec<ModelOutput>> {
        if !self.is_fitted() {
            return Err(FootballError::NoModel);
        }
        let columns = self.member_outputs(rows)?;

        let stacked = match (&self.strategy, &self.meta) {
            (EnsembleStrategy::Stacking, Some(meta)) => {
                let meta_rows: Vec<Vec<f32>> = (0..rows.len())
                    .map(|i| columns.iter().flat_map(|c| c[i].probs.to_array()).collect())
                    .collect();
                Some(meta.predict_batch(&meta_rows)?)
            }
            _ => None,
        };

        Ok((0..rows.len())
            .map(|i| {
                let probs = match &stacked {
                    Some(meta) => meta[i].probs,
                    None => self.vote(columns.iter().map(|c| &c[i])),
                };
                ModelOutput {
                    probs,
                    expected_goals: Some(self.combine_goals(columns.iter().map(|c| &c[i]))),
                }
            })
            .collect())
    }

    fn vote<'a>(&self, outputs: impl Iterator<Item = &'a ModelOutput>) -> OutcomeProbs {
        let mut acc = [0.0f32; 3];
        for (output, w) in outputs.zip(self.weights.iter()) {
            for (a, p) in acc.iter_mut().zip(output.probs.to_array()) {
                *a += w * p;
            }
        }
        OutcomeProbs::from_slice(&acc)
    }

    /// Weighted mean over the members that predict goals
    fn combine_goals<'a>(&self, outputs: impl Iterator<Item = &'a ModelOutput>) -> (f32, f32) {
        let (mut home, mut away, mut total) = (0.0f32, 0.0f32, 0.0f32);
        for (output, w) in outputs.zip(self.weights.iter()) {
            if let Some((h, a)) = output.expected_goals {
                home += w * h;
                away += w * a;
                total += w;
            }
        }
        if total > 0.0 {
            (home / total, away / total)
        } else {
            self.fallback_goals
        }
    }

    fn evaluate_dataset(&self, dataset: &FootballDataset) -> Result<EvalMetrics> {
        let outputs = self.predict_batch(&dataset.feature_rows())?;
        Ok(metrics_for(&outputs, &dataset.outcomes(), &dataset.goals()))
    }

    /// Metrics of each member and of the ensemble on `dataset`
    pub fn evaluate(&self, dataset: &FootballDataset) -> Result<Vec<ComponentMetrics>> {
        let rows = dataset.feature_rows();
        let outcomes = dataset.outcomes();
        let goals = dataset.goals();

        let mut report = Vec::with_capacity(self.members.len() + 1);
        for (member, outputs) in self.members.iter().zip(self.member_outputs(&rows)?) {
            report.push(ComponentMetrics {
                name: member.name().to_string(),
                metrics: metrics_for(&outputs, &outcomes, &goals),
            });
        }
        report.push(ComponentMetrics {
            name: "ensemble".to_string(),
            metrics: self.evaluate_dataset(dataset)?,
        });
        Ok(report)
    }

    /// Write the bundle: manifest, feature scale, one directory per member
    pub fn save(&self, dir: &Path) -> Result<()> {
        let normalization = self.normalization.as_ref().ok_or(FootballError::NoModel)?;
        std::fs::create_dir_all(dir)?;

        for member in &self.members {
            member.save(&dir.join(member.name()))?;
        }
        if let Some(meta) = &self.meta {
            meta.save(&dir.join(Self::META_DIR))?;
        }
        normalization.save(&dir.join(Self::NORM))?;

        let manifest = Manifest {
            strategy: self.strategy,
            members: self.member_kinds(),
            weights: self.weights.clone(),
            fallback_goals: self.fallback_goals,
            trained_at: chrono::Utc::now().to_rfc3339(),
            samples: self.samples,
        };
        std::fs::write(
            dir.join(Self::MANIFEST),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        log::info!("Saved {} ensemble to {}", self.strategy, dir.display());
        Ok(())
    }

    pub fn load(dir: &Path, config: &Config) -> Result<Self> {
        let manifest_path = dir.join(Self::MANIFEST);
        if !manifest_path.exists() {
            return Err(FootballError::NoModel);
        }
        let manifest: Manifest = serde_json::from_str(&std::fs::read_to_string(manifest_path)?)?;

        let members = manifest
            .members
            .iter()
            .map(|kind| kind.load(&dir.join(kind.name()), config))
            .collect::<Result<Vec<_>>>()?;
        let meta = match manifest.strategy {
            EnsembleStrategy::Stacking => Some(LogisticModel::load(
                &dir.join(Self::META_DIR),
                config.training.clone(),
            )?),
            EnsembleStrategy::Voting => None,
        };

        log::debug!(
            "Loaded {} ensemble trained at {} on {} samples",
            manifest.strategy,
            manifest.trained_at,
            manifest.samples
        );

        Ok(Ensemble {
            strategy: manifest.strategy,
            members,
            weights: manifest.weights,
            meta,
            normalization: Some(FeatureNormalization::load(&dir.join(Self::NORM))?),
            fallback_goals: manifest.fallback_goals,
            samples: manifest.samples,
            config: config.clone(),
        })
    }
}

fn metrics_for(outputs: &[ModelOutput], outcomes: &[crate::Outcome], goals: &[(u8, u8)]) -> EvalMetrics {
    let probs: Vec<OutcomeProbs> = outputs.iter().map(|o| o.probs).collect();
    let expected: Vec<Option<(f32, f32)>> = outputs.iter().map(|o| o.expected_goals).collect();
    EvalMetrics::compute(&probs, outcomes).with_goals(&expected, goals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::synthetic_dataset;
    use crate::features::FixtureFeatures;

    fn config(strategy: &str) -> Config {
        let mut config = Config::default();
        config.ensemble.strategy = strategy.to_string();
        config.ensemble.members = vec!["logistic".to_string(), "poisson".to_string()];
        config.ensemble.stacking_folds = 2;
        config.training.epochs = 15;
        config.training.batch_size = 32;
        config.training.learning_rate = 0.05;
        config.training.early_stopping_patience = 0;
        config
    }

    fn training_set(n: usize) -> TrainingSet {
        let (train, val) = synthetic_dataset(n, 4).split_chronological(0.2);
        TrainingSet::new(train, val)
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("Voting".parse::<EnsembleStrategy>().unwrap(), EnsembleStrategy::Voting);
        assert_eq!("stack".parse::<EnsembleStrategy>().unwrap(), EnsembleStrategy::Stacking);
        assert!("boosting".parse::<EnsembleStrategy>().is_err());
    }

    #[test]
    fn test_unfitted_predict_is_no_model() {
        let ensemble = Ensemble::new(&config("voting")).unwrap();
        assert!(matches!(ensemble.predict(&[0.0; 4]), Err(FootballError::NoModel)));
    }

    #[test]
    fn test_voting_weights_sum_to_one() {
        let mut ensemble = Ensemble::new(&config("voting")).unwrap();
        let report = ensemble.fit(&training_set(150)).unwrap();

        let total: f32 = ensemble.weights().iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert_eq!(report.len(), 3);
        assert_eq!(report.last().unwrap().name, "ensemble");

        let output = ensemble.predict(&[1.0, 0.4, 0.4, 0.4]).unwrap();
        let sum = output.probs.home_win + output.probs.draw + output.probs.away_win;
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(output.expected_goals.is_some());
    }

    #[test]
    fn test_configured_weights_are_normalized() {
        let mut config = config("voting");
        config.ensemble.weights = vec![3.0, 1.0];
        let mut ensemble = Ensemble::new(&config).unwrap();
        ensemble.fit(&training_set(80)).unwrap();
        assert!((ensemble.weights()[0] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_goals_fall_back_to_league_average() {
        let mut config = config("voting");
        config.ensemble.members = vec!["elo".to_string()];
        let mut ensemble = Ensemble::new(&config).unwrap();

        let data = synthetic_dataset(60, FixtureFeatures::DIM);
        let (train, val) = data.split_chronological(0.2);
        let expected = train.mean_goals();
        ensemble.fit(&TrainingSet::new(train, val)).unwrap();

        let row = vec![0.5; FixtureFeatures::DIM];
        let output = ensemble.predict(&row).unwrap();
        assert_eq!(output.expected_goals, Some(expected));
    }

    #[test]
    fn test_stacking_save_load_roundtrip() {
        let mut ensemble = Ensemble::new(&config("stacking")).unwrap();
        ensemble.fit(&training_set(120)).unwrap();
        assert_eq!(ensemble.strategy(), EnsembleStrategy::Stacking);

        let dir = tempfile::tempdir().unwrap();
        ensemble.save(dir.path()).unwrap();
        assert!(dir.path().join("manifest.json").exists());

        let loaded = Ensemble::load(dir.path(), &config("stacking")).unwrap();
        assert_eq!(loaded.member_kinds(), vec![ModelKind::Logistic, ModelKind::Poisson]);

        let row = [0.3, 0.1, 0.2, 0.4];
        let a = ensemble.predict(&row).unwrap();
        let b = loaded.predict(&row).unwrap();
        assert!((a.probs.home_win - b.probs.home_win).abs() < 1e-4);
    }

    #[test]
    fn test_validation_rows_do_not_leak_into_fit() {
        let (train, val) = synthetic_dataset(120, 4).split_chronological(0.2);
        let shifted: Vec<FixtureSample> = val
            .samples()
            .iter()
            .map(|s| {
                let mut s = s.clone();
                s.features[1] += 10.0;
                s
            })
            .collect();
        let expected = FeatureNormalization::from_dataset(&train);

        let mut ensemble = Ensemble::new(&config("stacking")).unwrap();
        ensemble
            .fit(&TrainingSet::new(train, FootballDataset::from_samples(shifted)))
            .unwrap();
        assert_eq!(ensemble.strategy(), EnsembleStrategy::Stacking);
        assert_eq!(ensemble.normalization(), Some(&expected));
        assert_eq!(ensemble.samples, 96);
    }

    #[test]
    fn test_stacking_without_enough_data_falls_back() {
        let mut config = config("stacking");
        config.ensemble.stacking_folds = 50;
        let mut ensemble = Ensemble::new(&config).unwrap();
        ensemble.fit(&training_set(30)).unwrap();
        assert_eq!(ensemble.strategy(), EnsembleStrategy::Voting);
    }
}
