//! Monte Carlo scoreline simulation
//!
//! Iterations run in fixed-size chunks, each with its own seed derived from
//! the simulator seed, so results do not depend on rayon's scheduling.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, LogNormal, Normal, Poisson};
use rayon::prelude::*;
use serde::Serialize;

use crate::model::Ensemble;
use crate::{FootballError, Result, SimulationConfig};

const CHUNK_SIZE: usize = 1_000;

/// Aggregated results of a batch of simulated matches
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub iterations: usize,
    pub home_win: f32,
    pub draw: f32,
    pub away_win: f32,
    /// Standard error of the home-win frequency
    pub home_win_std_error: f32,
    pub mean_home_goals: f32,
    pub mean_away_goals: f32,
    pub over_2_5: f32,
    pub both_teams_score: f32,
    /// Most frequent scorelines with their frequencies
    pub top_scores: Vec<(u8, u8, f32)>,
    /// 5th and 95th percentile of total goals
    pub total_goals_interval: (u16, u16),
}

impl SimulationSummary {
    /// Summarize simulated (home, away) scores
    pub fn from_scores(scores: &[(u8, u8)], top_n: usize) -> Self {
        let n = scores.len();
        if n == 0 {
            return SimulationSummary {
                iterations: 0,
                home_win: 0.0,
                draw: 0.0,
                away_win: 0.0,
                home_win_std_error: 0.0,
                mean_home_goals: 0.0,
                mean_away_goals: 0.0,
                over_2_5: 0.0,
                both_teams_score: 0.0,
                top_scores: Vec::new(),
                total_goals_interval: (0, 0),
            };
        }

        let (mut home, mut draw, mut away) = (0usize, 0usize, 0usize);
        let (mut home_goals, mut away_goals) = (0u64, 0u64);
        let (mut over, mut btts) = (0usize, 0usize);
        let mut counts: HashMap<(u8, u8), usize> = HashMap::new();
        let mut totals: Vec<u16> = Vec::with_capacity(n);

        for &(h, a) in scores {
            match h.cmp(&a) {
                std::cmp::Ordering::Greater => home += 1,
                std::cmp::Ordering::Equal => draw += 1,
                std::cmp::Ordering::Less => away += 1,
            }
            home_goals += h as u64;
            away_goals += a as u64;
            let total = h as u16 + a as u16;
            if total > 2 {
                over += 1;
            }
            if h > 0 && a > 0 {
                btts += 1;
            }
            *counts.entry((h, a)).or_insert(0) += 1;
            totals.push(total);
        }

        let n_f = n as f32;
        let p_home = home as f32 / n_f;

        let mut top: Vec<((u8, u8), usize)> = counts.into_iter().collect();
        top.sort_by(|x, y| y.1.cmp(&x.1).then(x.0.cmp(&y.0)));
        let top_scores = top
            .into_iter()
            .take(top_n)
            .map(|((h, a), c)| (h, a, c as f32 / n_f))
            .collect();

        totals.sort_unstable();
        let percentile = |q: f32| totals[((n - 1) as f32 * q).round() as usize];

        SimulationSummary {
            iterations: n,
            home_win: p_home,
            draw: draw as f32 / n_f,
            away_win: away as f32 / n_f,
            home_win_std_error: (p_home * (1.0 - p_home) / n_f).sqrt(),
            mean_home_goals: home_goals as f32 / n_f,
            mean_away_goals: away_goals as f32 / n_f,
            over_2_5: over as f32 / n_f,
            both_teams_score: btts as f32 / n_f,
            top_scores,
            total_goals_interval: (percentile(0.05), percentile(0.95)),
        }
    }
}

/// Repeated resampling of a match from perturbed inputs
#[derive(Debug, Clone)]
pub struct MonteCarloSimulator {
    pub iterations: usize,
    pub seed: u64,
    /// Log-normal sigma applied to expected goals per iteration
    pub goal_noise: f32,
    /// Gaussian noise in standard deviations applied to normalized features
    pub feature_noise: f32,
    pub top_n: usize,
}

impl MonteCarloSimulator {
    pub fn new(config: &SimulationConfig) -> Self {
        MonteCarloSimulator {
            iterations: config.iterations,
            seed: config.seed,
            goal_noise: config.goal_noise,
            feature_noise: config.feature_noise,
            top_n: 5,
        }
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn chunk_seed(&self, chunk: usize) -> u64 {
        self.seed
            .wrapping_add((chunk as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    fn check_iterations(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(FootballError::Config(
                "Simulation needs at least one iteration".to_string(),
            ));
        }
        Ok(())
    }

    /// Simulate from fixed expected goals with multiplicative log-normal noise
    pub fn run(&self, expected_home: f32, expected_away: f32) -> Result<SimulationSummary> {
        self.check_iterations()?;
        let sigma = self.goal_noise.max(0.0) as f64;
        // Mean-one multiplier: E[exp(N(-σ²/2, σ))] = 1
        let noise = LogNormal::new(-sigma * sigma / 2.0, sigma)
            .map_err(|e| FootballError::Config(format!("Invalid goal noise: {}", e)))?;

        let chunks = self.iterations.div_ceil(CHUNK_SIZE);
        let scores: Vec<(u8, u8)> = (0..chunks)
            .into_par_iter()
            .flat_map_iter(|chunk| {
                let mut rng = StdRng::seed_from_u64(self.chunk_seed(chunk));
                let len = CHUNK_SIZE.min(self.iterations - chunk * CHUNK_SIZE);
                (0..len)
                    .map(|_| {
                        let lh = expected_home as f64 * noise.sample(&mut rng);
                        let la = expected_away as f64 * noise.sample(&mut rng);
                        (sample_goals(lh, &mut rng), sample_goals(la, &mut rng))
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        log::debug!(
            "Simulated {} iterations from xG {:.2} - {:.2}",
            scores.len(),
            expected_home,
            expected_away
        );
        Ok(SimulationSummary::from_scores(&scores, self.top_n))
    }

    /// Perturb the fixture's normalized features, re-predict expected goals
    /// through the ensemble, and sample a score from each prediction
    pub fn run_with_model(&self, ensemble: &Ensemble, features: &[f32]) -> Result<SimulationSummary> {
        self.check_iterations()?;
        let norm = ensemble.normalization().ok_or(FootballError::NoModel)?;
        let base = norm.normalize_row(features);
        let noise = Normal::new(0.0f32, self.feature_noise.max(0.0))
            .map_err(|e| FootballError::Config(format!("Invalid feature noise: {}", e)))?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut rates: Vec<(f32, f32)> = Vec::with_capacity(self.iterations);
        let mut remaining = self.iterations;
        while remaining > 0 {
            let len = remaining.min(CHUNK_SIZE);
            let rows: Vec<Vec<f32>> = (0..len)
                .map(|_| {
                    let noisy: Vec<f32> = base.iter().map(|v| v + noise.sample(&mut rng)).collect();
                    norm.denormalize_row(&noisy)
                })
                .collect();
            for output in ensemble.predict_batch(&rows)? {
                rates.push(output.expected_goals.unwrap_or(ensemble.fallback_goals()));
            }
            remaining -= len;
        }

        let scores: Vec<(u8, u8)> = rates
            .par_chunks(CHUNK_SIZE)
            .enumerate()
            .flat_map_iter(|(chunk, rates)| {
                let mut rng = StdRng::seed_from_u64(self.chunk_seed(chunk));
                rates
                    .iter()
                    .map(|&(lh, la)| {
                        (
                            sample_goals(lh as f64, &mut rng),
                            sample_goals(la as f64, &mut rng),
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        Ok(SimulationSummary::from_scores(&scores, self.top_n))
    }
}

/// One Poisson draw, capped to fit a scoreline
fn sample_goals<R: rand::Rng>(lambda: f64, rng: &mut R) -> u8 {
    if !(lambda > 0.0 && lambda.is_finite()) {
        return 0;
    }
    match Poisson::new(lambda) {
        Ok(dist) => {
            let goals: f64 = dist.sample(rng);
            goals.min(u8::MAX as f64) as u8
        }
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn simulator(iterations: usize) -> MonteCarloSimulator {
        MonteCarloSimulator::new(&Config::default().simulation).with_iterations(iterations)
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = simulator(5_000).with_seed(11).run(1.6, 1.1).unwrap();
        let b = simulator(5_000).with_seed(11).run(1.6, 1.1).unwrap();
        assert_eq!(a.home_win, b.home_win);
        assert_eq!(a.top_scores, b.top_scores);

        let c = simulator(5_000).with_seed(12).run(1.6, 1.1).unwrap();
        assert_ne!(a.home_win, c.home_win);
    }

    #[test]
    fn test_frequencies_track_expected_goals() {
        let summary = simulator(20_000).run(1.8, 0.9).unwrap();
        let sum = summary.home_win + summary.draw + summary.away_win;
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(summary.home_win > summary.away_win);
        assert!((summary.mean_home_goals - 1.8).abs() < 0.1);
        assert!((summary.mean_away_goals - 0.9).abs() < 0.1);
        assert!(summary.home_win_std_error < 0.01);
        assert!(summary.total_goals_interval.0 <= summary.total_goals_interval.1);
        assert_eq!(summary.iterations, 20_000);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        assert!(simulator(0).run(1.0, 1.0).is_err());
    }

    #[test]
    fn test_summary_from_known_scores() {
        let scores = [(1, 0), (1, 0), (2, 2), (0, 3)];
        let summary = SimulationSummary::from_scores(&scores, 2);
        assert_eq!(summary.home_win, 0.5);
        assert_eq!(summary.draw, 0.25);
        assert_eq!(summary.over_2_5, 0.5);
        assert_eq!(summary.both_teams_score, 0.25);
        assert_eq!(summary.top_scores[0], (1, 0, 0.5));
    }

    #[test]
    fn test_run_with_model_requires_fitted_ensemble() {
        let ensemble = Ensemble::new(&Config::default()).unwrap();
        assert!(matches!(
            simulator(10).run_with_model(&ensemble, &[0.0; 4]),
            Err(FootballError::NoModel)
        ));
    }
}
