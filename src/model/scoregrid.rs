//! Score probability grid from two Poisson goal rates
//!
//! Low scores are corrected with the Dixon-Coles dependence term, then the
//! grid is renormalized so the truncated mass sums to one.

use crate::OutcomeProbs;

/// P(X = k) for X ~ Poisson(lambda)
pub fn poisson_pmf(k: usize, lambda: f32) -> f32 {
    if lambda <= 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    // Work in log space to stay finite for larger k
    let ln_factorial: f32 = (1..=k).map(|i| (i as f32).ln()).sum();
    (k as f32 * lambda.ln() - lambda - ln_factorial).exp()
}

/// Dixon-Coles adjustment for the four lowest scorelines
pub fn dixon_coles_tau(home: usize, away: usize, lambda_home: f32, lambda_away: f32, rho: f32) -> f32 {
    match (home, away) {
        (0, 0) => 1.0 - lambda_home * lambda_away * rho,
        (0, 1) => 1.0 + lambda_home * rho,
        (1, 0) => 1.0 + lambda_away * rho,
        (1, 1) => 1.0 - rho,
        _ => 1.0,
    }
}

/// Joint distribution of (home goals, away goals) up to `max_goals` each
#[derive(Debug, Clone)]
pub struct ScoreGrid {
    probs: Vec<Vec<f32>>,
    pub lambda_home: f32,
    pub lambda_away: f32,
}

impl ScoreGrid {
    pub fn new(lambda_home: f32, lambda_away: f32, rho: f32, max_goals: usize) -> Self {
        let lambda_home = lambda_home.max(0.01);
        let lambda_away = lambda_away.max(0.01);
        let size = max_goals + 1;

        let home_pmf: Vec<f32> = (0..size).map(|k| poisson_pmf(k, lambda_home)).collect();
        let away_pmf: Vec<f32> = (0..size).map(|k| poisson_pmf(k, lambda_away)).collect();

        let mut probs = vec![vec![0.0f32; size]; size];
        let mut total = 0.0f32;
        for h in 0..size {
            for a in 0..size {
                let tau = dixon_coles_tau(h, a, lambda_home, lambda_away, rho).max(0.0);
                let p = home_pmf[h] * away_pmf[a] * tau;
                probs[h][a] = p;
                total += p;
            }
        }
        if total > 0.0 {
            for row in probs.iter_mut() {
                for p in row.iter_mut() {
                    *p /= total;
                }
            }
        }

        ScoreGrid {
            probs,
            lambda_home,
            lambda_away,
        }
    }

    pub fn max_goals(&self) -> usize {
        self.probs.len() - 1
    }

    /// Probability of an exact score (0 beyond the grid)
    pub fn prob(&self, home: usize, away: usize) -> f32 {
        self.probs
            .get(home)
            .and_then(|row| row.get(away))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn outcome_probs(&self) -> OutcomeProbs {
        let (mut home, mut draw, mut away) = (0.0, 0.0, 0.0);
        for (h, row) in self.probs.iter().enumerate() {
            for (a, p) in row.iter().enumerate() {
                match h.cmp(&a) {
                    std::cmp::Ordering::Greater => home += p,
                    std::cmp::Ordering::Equal => draw += p,
                    std::cmp::Ordering::Less => away += p,
                }
            }
        }
        OutcomeProbs::new(home, draw, away)
    }

    pub fn most_likely_score(&self) -> (u8, u8) {
        self.top_scores(1)
            .first()
            .map(|(h, a, _)| (*h, *a))
            .unwrap_or((0, 0))
    }

    /// The `n` most likely scorelines, most likely first
    pub fn top_scores(&self, n: usize) -> Vec<(u8, u8, f32)> {
        let mut scores: Vec<(u8, u8, f32)> = self
            .probs
            .iter()
            .enumerate()
            .flat_map(|(h, row)| row.iter().enumerate().map(move |(a, p)| (h as u8, a as u8, *p)))
            .collect();
        scores.sort_by(|x, y| y.2.total_cmp(&x.2));
        scores.truncate(n);
        scores
    }

    /// P(total goals > line)
    pub fn over(&self, line: f32) -> f32 {
        let mut p = 0.0;
        for (h, row) in self.probs.iter().enumerate() {
            for (a, q) in row.iter().enumerate() {
                if (h + a) as f32 > line {
                    p += q;
                }
            }
        }
        p
    }

    pub fn both_teams_score(&self) -> f32 {
        let mut p = 0.0;
        for row in self.probs.iter().skip(1) {
            p += row.iter().skip(1).sum::<f32>();
        }
        p
    }

    /// Draw one scoreline by inverse CDF over the grid
    pub fn sample<R: rand::Rng>(&self, rng: &mut R) -> (u8, u8) {
        let u: f32 = rng.gen();
        let mut cumulative = 0.0;
        for (h, row) in self.probs.iter().enumerate() {
            for (a, p) in row.iter().enumerate() {
                cumulative += p;
                if u < cumulative {
                    return (h as u8, a as u8);
                }
            }
        }
        // Rounding left a sliver of mass uncovered
        self.most_likely_score()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poisson_pmf() {
        assert!((poisson_pmf(0, 1.0) - (-1.0f32).exp()).abs() < 1e-6);
        assert!((poisson_pmf(2, 1.5) - 0.2510).abs() < 1e-3);
        assert_eq!(poisson_pmf(0, 0.0), 1.0);
        let total: f32 = (0..30).map(|k| poisson_pmf(k, 2.3)).sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_grid_sums_to_one() {
        let grid = ScoreGrid::new(1.6, 1.1, -0.1, 10);
        let probs = grid.outcome_probs();
        assert!((probs.home_win + probs.draw + probs.away_win - 1.0).abs() < 1e-5);
        assert!(probs.home_win > probs.away_win);
    }

    #[test]
    fn test_negative_rho_inflates_low_draws() {
        let independent = ScoreGrid::new(1.3, 1.3, 0.0, 10);
        let corrected = ScoreGrid::new(1.3, 1.3, -0.1, 10);
        assert!(corrected.prob(0, 0) > independent.prob(0, 0));
        assert!(corrected.prob(1, 1) > independent.prob(1, 1));
        assert!(corrected.prob(1, 0) < independent.prob(1, 0));
    }

    #[test]
    fn test_markets() {
        let grid = ScoreGrid::new(1.0, 1.0, 0.0, 10);
        assert_eq!(grid.most_likely_score(), (0, 0));
        // P(no goals for either side) = e^-1, so BTTS = (1 - e^-1)^2
        let expected_btts = (1.0 - (-1.0f32).exp()).powi(2);
        assert!((grid.both_teams_score() - expected_btts).abs() < 1e-3);
        assert!(grid.over(2.5) > 0.3 && grid.over(2.5) < 0.35);
        assert_eq!(grid.top_scores(3).len(), 3);
    }

    #[test]
    fn test_sample_follows_grid() {
        use rand::SeedableRng;
        let grid = ScoreGrid::new(2.0, 0.5, -0.1, 10);
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let n = 5_000;
        let home_wins = (0..n)
            .map(|_| grid.sample(&mut rng))
            .filter(|(h, a)| h > a)
            .count();
        let freq = home_wins as f32 / n as f32;
        assert!((freq - grid.outcome_probs().home_win).abs() < 0.03);
    }
}
