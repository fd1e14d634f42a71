//! Burn Dataset implementation for football fixtures
//!
//! One sample per match with enough prior history: the flattened
//! [`FixtureFeatures`] vector plus the result as training targets.

use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::features::{FeatureBuilder, FixtureFeatures};
use crate::{FeatureConfig, FootballError, MatchRecord, Outcome, Result};

/// A single training example
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureSample {
    pub features: Vec<f32>,
    pub outcome: Outcome,
    pub home_goals: u8,
    pub away_goals: u8,
    pub date: NaiveDate,
}

impl FixtureSample {
    pub fn from_match(record: &MatchRecord, features: &FixtureFeatures) -> Self {
        FixtureSample {
            features: features.to_vec(),
            outcome: record.outcome(),
            home_goals: record.home_goals,
            away_goals: record.away_goals,
            date: record.date,
        }
    }
}

/// Chronologically ordered fixture samples
#[derive(Debug, Clone, Default)]
pub struct FootballDataset {
    samples: Vec<FixtureSample>,
}

impl FootballDataset {
    pub fn from_samples(mut samples: Vec<FixtureSample>) -> Self {
        samples.sort_by_key(|s| s.date);
        FootballDataset { samples }
    }

    /// Build samples by replaying the match history through a FeatureBuilder
    pub fn from_matches(matches: &[MatchRecord], config: &FeatureConfig) -> Self {
        let mut builder = FeatureBuilder::new(config.clone());
        let samples = builder
            .process(matches)
            .iter()
            .map(|(record, features)| FixtureSample::from_match(record, features))
            .collect();
        Self::from_samples(samples)
    }

    pub fn samples(&self) -> &[FixtureSample] {
        &self.samples
    }

    /// Get the number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Feature dimension (0 for an empty dataset)
    pub fn feature_dim(&self) -> usize {
        self.samples.first().map(|s| s.features.len()).unwrap_or(0)
    }

    /// Samples before `cutoff`, and samples on or after it
    pub fn split_by_date(&self, cutoff: NaiveDate) -> (Self, Self) {
        let (before, after): (Vec<_>, Vec<_>) =
            self.samples.iter().cloned().partition(|s| s.date < cutoff);
        (
            FootballDataset { samples: before },
            FootballDataset { samples: after },
        )
    }

    /// Hold out the most recent `val_fraction` of samples
    pub fn split_chronological(&self, val_fraction: f32) -> (Self, Self) {
        let n = self.samples.len();
        let val_len = ((n as f32 * val_fraction.clamp(0.0, 1.0)).round() as usize).min(n);
        let split_idx = n - val_len;
        (
            FootballDataset {
                samples: self.samples[..split_idx].to_vec(),
            },
            FootballDataset {
                samples: self.samples[split_idx..].to_vec(),
            },
        )
    }

    /// Samples at the given indices, in index order
    pub fn subset(&self, indices: &[usize]) -> Self {
        FootballDataset {
            samples: indices
                .iter()
                .filter_map(|&i| self.samples.get(i).cloned())
                .collect(),
        }
    }

    pub fn feature_rows(&self) -> Vec<Vec<f32>> {
        self.samples.iter().map(|s| s.features.clone()).collect()
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.samples.iter().map(|s| s.outcome).collect()
    }

    pub fn goals(&self) -> Vec<(u8, u8)> {
        self.samples
            .iter()
            .map(|s| (s.home_goals, s.away_goals))
            .collect()
    }

    /// Mean home and away goals, used as a fallback goal expectation
    pub fn mean_goals(&self) -> (f32, f32) {
        if self.samples.is_empty() {
            return (1.5, 1.2);
        }
        let n = self.samples.len() as f32;
        let home: f32 = self.samples.iter().map(|s| s.home_goals as f32).sum();
        let away: f32 = self.samples.iter().map(|s| s.away_goals as f32).sum();
        (home / n, away / n)
    }
}

impl Dataset<FixtureSample> for FootballDataset {
    fn get(&self, index: usize) -> Option<FixtureSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Z-score normalization fitted on the training split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureNormalization {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl FeatureNormalization {
    const MIN_STD: f32 = 1e-3;

    /// No-op normalization for `dim` features
    pub fn identity(dim: usize) -> Self {
        FeatureNormalization {
            mean: vec![0.0; dim],
            std: vec![1.0; dim],
        }
    }

    pub fn from_dataset(dataset: &FootballDataset) -> Self {
        Self::from_rows(&dataset.feature_rows())
    }

    pub fn from_rows(rows: &[Vec<f32>]) -> Self {
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.is_empty() {
            return Self::identity(dim);
        }

        let mut sum = vec![0.0f64; dim];
        let mut sum_sq = vec![0.0f64; dim];
        for row in rows {
            for (j, v) in row.iter().take(dim).enumerate() {
                sum[j] += *v as f64;
                sum_sq[j] += (*v as f64) * (*v as f64);
            }
        }

        let n = rows.len() as f64;
        let mean: Vec<f32> = sum.iter().map(|s| (s / n) as f32).collect();
        let std: Vec<f32> = sum_sq
            .iter()
            .zip(sum.iter())
            .map(|(sq, s)| {
                let m = s / n;
                ((sq / n - m * m).max(0.0).sqrt() as f32).max(Self::MIN_STD)
            })
            .collect();

        FeatureNormalization { mean, std }
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// (x - mean) / std
    pub fn normalize_row(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }

    /// Inverse of `normalize_row`
    pub fn denormalize_row(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(z, (m, s))| z * s + m)
            .collect()
    }

    /// Normalize a [batch, dim] tensor
    pub fn normalize_tensor<B: Backend>(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = features.device();
        let mean = Tensor::<B, 1>::from_floats(self.mean.as_slice(), &device).unsqueeze_dim(0);
        let std = Tensor::<B, 1>::from_floats(self.std.as_slice(), &device).unsqueeze_dim(0);
        (features - mean) / std
    }

    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Convert a row-major feature matrix to a [rows, dim] tensor
pub fn rows_to_tensor<B: Backend>(rows: &[Vec<f32>], device: &B::Device) -> Result<Tensor<B, 2>> {
    let dim = rows.first().map(|r| r.len()).unwrap_or(0);
    if rows.iter().any(|r| r.len() != dim) {
        return Err(FootballError::Model(
            "Feature rows have inconsistent lengths".to_string(),
        ));
    }
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    Ok(Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([rows.len(), dim]))
}

/// Batch of fixture samples for training
#[derive(Debug, Clone)]
pub struct FixtureBatch<B: Backend> {
    /// Normalized features: [batch, dim]
    pub features: Tensor<B, 2>,
    /// One-hot outcome (home, draw, away): [batch, 3]
    pub outcome: Tensor<B, 2>,
    /// Outcome class index: [batch]
    pub outcome_index: Tensor<B, 1, Int>,
    /// Goals scored by the home side: [batch]
    pub home_goals: Tensor<B, 1>,
    /// Goals scored by the away side: [batch]
    pub away_goals: Tensor<B, 1>,
}

/// Batcher for creating training batches
#[derive(Clone)]
pub struct FixtureBatcher<B: Backend> {
    device: B::Device,
    norm: FeatureNormalization,
}

impl<B: Backend> FixtureBatcher<B> {
    pub fn new(device: B::Device, norm: FeatureNormalization) -> Self {
        FixtureBatcher { device, norm }
    }
}

impl<B: Backend> burn::data::dataloader::batcher::Batcher<B, FixtureSample, FixtureBatch<B>>
    for FixtureBatcher<B>
{
    fn batch(&self, items: Vec<FixtureSample>, _device: &B::Device) -> FixtureBatch<B> {
        let batch_size = items.len();
        let dim = self.norm.dim();

        let mut feature_data = Vec::with_capacity(batch_size * dim);
        let mut outcome_data = Vec::with_capacity(batch_size * 3);
        let mut index_data = Vec::with_capacity(batch_size);
        let mut home_goals = Vec::with_capacity(batch_size);
        let mut away_goals = Vec::with_capacity(batch_size);

        for sample in &items {
            feature_data.extend(self.norm.normalize_row(&sample.features));
            let idx = sample.outcome.index();
            outcome_data.extend((0..3).map(|i| if i == idx { 1.0f32 } else { 0.0 }));
            index_data.push(idx as i32);
            home_goals.push(sample.home_goals as f32);
            away_goals.push(sample.away_goals as f32);
        }

        FixtureBatch {
            features: Tensor::<B, 1>::from_floats(feature_data.as_slice(), &self.device)
                .reshape([batch_size, dim]),
            outcome: Tensor::<B, 1>::from_floats(outcome_data.as_slice(), &self.device)
                .reshape([batch_size, 3]),
            outcome_index: Tensor::<B, 1, Int>::from_ints(index_data.as_slice(), &self.device),
            home_goals: Tensor::<B, 1>::from_floats(home_goals.as_slice(), &self.device),
            away_goals: Tensor::<B, 1>::from_floats(away_goals.as_slice(), &self.device),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::data::dataloader::batcher::Batcher;

    type TestBackend = NdArray<f32>;

    fn sample(day: u32, features: Vec<f32>, hg: u8, ag: u8) -> FixtureSample {
        FixtureSample {
            features,
            outcome: Outcome::from_goals(hg, ag),
            home_goals: hg,
            away_goals: ag,
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        }
    }

    #[test]
    fn test_normalization_zero_mean_unit_std() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let norm = FeatureNormalization::from_rows(&rows);

        assert_eq!(norm.mean, vec![2.0, 5.0]);
        assert!((norm.std[0] - 1.0).abs() < 1e-6);
        // Constant column keeps the floor
        assert!((norm.std[1] - 1e-3).abs() < 1e-9);

        let z = norm.normalize_row(&[3.0, 5.0]);
        assert!((z[0] - 1.0).abs() < 1e-6);
        assert_eq!(z[1], 0.0);
        assert_eq!(norm.denormalize_row(&z), vec![3.0, 5.0]);
    }

    #[test]
    fn test_chronological_split_holds_out_latest() {
        let dataset = FootballDataset::from_samples(vec![
            sample(3, vec![0.0], 1, 0),
            sample(1, vec![0.0], 0, 0),
            sample(2, vec![0.0], 0, 2),
            sample(4, vec![0.0], 2, 2),
            sample(5, vec![0.0], 1, 3),
        ]);

        let (train, val) = dataset.split_chronological(0.4);
        assert_eq!(train.len(), 3);
        assert_eq!(val.len(), 2);
        assert!(train.samples().iter().all(|s| s.date < val.samples()[0].date));

        let (before, after) = dataset.split_by_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 4);
    }

    #[test]
    fn test_batcher_shapes_and_targets() {
        let device = Default::default();
        let norm = FeatureNormalization::identity(2);
        let batcher = FixtureBatcher::<TestBackend>::new(device, norm);

        let batch = batcher.batch(
            vec![sample(1, vec![0.5, 1.0], 2, 1), sample(2, vec![0.0, -1.0], 0, 0)],
            &Default::default(),
        );

        assert_eq!(batch.features.dims(), [2, 2]);
        assert_eq!(batch.outcome.dims(), [2, 3]);
        let onehot = batch.outcome.into_data().to_vec::<f32>().unwrap();
        assert_eq!(onehot, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let goals = batch.home_goals.into_data().to_vec::<f32>().unwrap();
        assert_eq!(goals, vec![2.0, 0.0]);
    }

    #[test]
    fn test_normalize_tensor_matches_rows() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 20.0], vec![5.0, 60.0]];
        let norm = FeatureNormalization::from_rows(&rows);
        let device = Default::default();

        let tensor = rows_to_tensor::<TestBackend>(&rows, &device).unwrap();
        let values = norm.normalize_tensor(tensor).into_data().to_vec::<f32>().unwrap();
        let expected: Vec<f32> = rows.iter().flat_map(|r| norm.normalize_row(r)).collect();
        for (a, b) in values.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_rows_to_tensor_rejects_ragged_rows() {
        let device = Default::default();
        let result = rows_to_tensor::<TestBackend>(&[vec![1.0, 2.0], vec![1.0]], &device);
        assert!(result.is_err());
    }
}
