//! Dataset splits: chronological hold-out, seeded random, expanding folds

use std::ops::Range;

use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::dataset::FootballDataset;
use crate::{FootballError, Result};

/// Split ratios for train/val/test
#[derive(Debug, Clone)]
pub struct SplitRatios {
    pub train: f32,
    pub val: f32,
    pub test: f32,
}

impl Default for SplitRatios {
    fn default() -> Self {
        SplitRatios {
            train: 0.70,
            val: 0.15,
            test: 0.15,
        }
    }
}

/// Random split datasets
#[derive(Debug, Clone)]
pub struct RandomSplit {
    pub train: FootballDataset,
    pub val: FootballDataset,
    pub test: FootballDataset,
}

/// Hold out the most recent `val_fraction` of a date-sorted dataset
pub fn time_split(dataset: &FootballDataset, val_fraction: f32) -> (FootballDataset, FootballDataset) {
    dataset.split_chronological(val_fraction)
}

/// Shuffle with `seed` and cut into train/val/test by `ratios`
pub fn random_split(dataset: &FootballDataset, ratios: &SplitRatios, seed: u64) -> Result<RandomSplit> {
    let total = ratios.train + ratios.val + ratios.test;
    if ratios.train <= 0.0 || ratios.val < 0.0 || ratios.test < 0.0 || (total - 1.0).abs() > 1e-3 {
        return Err(FootballError::Config(format!(
            "Split ratios must be non-negative and sum to 1 (got {:.2}/{:.2}/{:.2})",
            ratios.train, ratios.val, ratios.test
        )));
    }

    let n = dataset.len();
    // Ratios may overshoot 1 within the tolerance above
    let n_train = ((n as f32 * ratios.train) as usize).min(n);
    let n_val = ((n as f32 * ratios.val) as usize).min(n.saturating_sub(n_train));

    // Shuffle with seed for reproducibility
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let split = RandomSplit {
        train: dataset.subset(&indices[..n_train]),
        val: dataset.subset(&indices[n_train..n_train + n_val]),
        test: dataset.subset(&indices[n_train + n_val..]),
    };

    log::info!(
        "Split {} samples: train={}, val={}, test={}",
        n,
        split.train.len(),
        split.val.len(),
        split.test.len()
    );

    Ok(split)
}

/// Expanding-window time folds over `n` date-sorted samples.
///
/// The samples are cut into `k + 1` contiguous blocks; fold `i` trains on
/// blocks `0..=i` and validates on block `i + 1`, so every validation
/// sample is later than all of its fold's training samples.
pub fn expanding_folds(n: usize, k: usize) -> Vec<(Range<usize>, Range<usize>)> {
    if k == 0 || n < k + 1 {
        return Vec::new();
    }
    let block = n / (k + 1);
    (0..k)
        .map(|i| {
            let train_end = block * (i + 1);
            let val_end = if i + 1 == k { n } else { block * (i + 2) };
            (0..train_end, train_end..val_end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::synthetic_dataset;

    #[test]
    fn test_expanding_folds_cover_tail() {
        let folds = expanding_folds(10, 4);
        assert_eq!(folds.len(), 4);
        assert_eq!(folds[0], (0..2, 2..4));
        assert_eq!(folds[3], (0..8, 8..10));
        for (train, val) in &folds {
            assert_eq!(train.end, val.start);
        }
        assert!(expanding_folds(3, 4).is_empty());
        assert!(expanding_folds(10, 0).is_empty());
    }

    #[test]
    fn test_random_split_is_seeded_and_complete() {
        let data = synthetic_dataset(40, 2);
        let a = random_split(&data, &SplitRatios::default(), 3).unwrap();
        let b = random_split(&data, &SplitRatios::default(), 3).unwrap();

        assert_eq!(a.train.len() + a.val.len() + a.test.len(), 40);
        assert_eq!(a.train.len(), 28);
        assert_eq!(a.train.samples()[0].date, b.train.samples()[0].date);
    }

    #[test]
    fn test_bad_ratios_rejected() {
        let data = synthetic_dataset(10, 2);
        let ratios = SplitRatios {
            train: 0.5,
            val: 0.1,
            test: 0.1,
        };
        assert!(random_split(&data, &ratios, 0).is_err());
    }

    #[test]
    fn test_ratios_slightly_over_one_stay_in_bounds() {
        let data = synthetic_dataset(2000, 2);
        let ratios = SplitRatios {
            train: 1.0005,
            val: 0.0,
            test: 0.0,
        };
        let split = random_split(&data, &ratios, 1).unwrap();
        assert_eq!(split.train.len(), 2000);
        assert!(split.val.is_empty());
        assert!(split.test.is_empty());
    }

    #[test]
    fn test_time_split_keeps_order() {
        let data = synthetic_dataset(20, 2);
        let (train, val) = time_split(&data, 0.25);
        assert_eq!(val.len(), 5);
        let last_train = train.samples().last().unwrap().date;
        assert!(val.samples().iter().all(|s| s.date > last_train));
    }
}
