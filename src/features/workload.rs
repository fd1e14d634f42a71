//! Workload window features
//!
//! Tracks match density over 7/14/21 day windows and days of rest to
//! approximate fatigue.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::TeamId;

/// Rest beyond two weeks makes no difference
const MAX_REST_DAYS: i64 = 14;
/// Fewer days than this between matches counts as a short turnaround
const SHORT_TURNAROUND_DAYS: i64 = 4;

/// Computes workload features from match history
#[derive(Default)]
pub struct WorkloadComputer {
    /// Recent match dates per team
    match_history: HashMap<TeamId, Vec<NaiveDate>>,
}

impl WorkloadComputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count matches in last N days for a team
    pub fn matches_in_window(&self, team: TeamId, current_date: NaiveDate, days: i64) -> u32 {
        self.match_history
            .get(&team)
            .map(|dates| {
                dates
                    .iter()
                    .filter(|d| {
                        let diff = (current_date - **d).num_days();
                        diff > 0 && diff <= days
                    })
                    .count() as u32
            })
            .unwrap_or(0)
    }

    /// Days since the previous match, capped at two weeks
    pub fn rest_days(&self, team: TeamId, current_date: NaiveDate) -> i64 {
        self.match_history
            .get(&team)
            .and_then(|dates| {
                dates
                    .iter()
                    .map(|d| (current_date - *d).num_days())
                    .filter(|diff| *diff > 0)
                    .min()
            })
            .unwrap_or(MAX_REST_DAYS)
            .min(MAX_REST_DAYS)
    }

    /// Compute workload features for a match (call BEFORE update)
    pub fn compute(&self, home: TeamId, away: TeamId, date: NaiveDate) -> WorkloadFeatures {
        let home_7d = self.matches_in_window(home, date, 7) as f32;
        let home_14d = self.matches_in_window(home, date, 14) as f32;
        let home_21d = self.matches_in_window(home, date, 21) as f32;

        let away_7d = self.matches_in_window(away, date, 7) as f32;
        let away_14d = self.matches_in_window(away, date, 14) as f32;
        let away_21d = self.matches_in_window(away, date, 21) as f32;

        let home_rest = self.rest_days(home, date);
        let away_rest = self.rest_days(away, date);
        let short = |rest: i64| if rest < SHORT_TURNAROUND_DAYS { 1.0 } else { 0.0 };

        WorkloadFeatures {
            // A congested fortnight is 4 matches
            home_matches_7d: (home_7d / 2.0).min(1.0),
            home_matches_14d: (home_14d / 4.0).min(1.0),
            home_matches_21d: (home_21d / 6.0).min(1.0),
            away_matches_7d: (away_7d / 2.0).min(1.0),
            away_matches_14d: (away_14d / 4.0).min(1.0),
            away_matches_21d: (away_21d / 6.0).min(1.0),
            home_rest: home_rest as f32 / MAX_REST_DAYS as f32,
            away_rest: away_rest as f32 / MAX_REST_DAYS as f32,
            rest_diff: (home_rest - away_rest) as f32 / MAX_REST_DAYS as f32,
            home_short_turnaround: short(home_rest),
            away_short_turnaround: short(away_rest),
            // Positive = home more fatigued
            workload_diff_14d: (home_14d - away_14d) / 4.0,
        }
    }

    /// Record a match for both teams
    pub fn update(&mut self, home: TeamId, away: TeamId, date: NaiveDate) {
        self.match_history.entry(home).or_default().push(date);
        self.match_history.entry(away).or_default().push(date);

        // Keep only last 30 days of history per team
        for dates in self.match_history.values_mut() {
            dates.retain(|d| (date - *d).num_days() <= 30);
        }
    }

    /// Reset all state
    pub fn reset(&mut self) {
        self.match_history.clear();
    }
}

/// Workload features for a match
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorkloadFeatures {
    pub home_matches_7d: f32,
    pub home_matches_14d: f32,
    pub home_matches_21d: f32,
    pub away_matches_7d: f32,
    pub away_matches_14d: f32,
    pub away_matches_21d: f32,
    pub home_rest: f32,
    pub away_rest: f32,
    pub rest_diff: f32,
    pub home_short_turnaround: f32,
    pub away_short_turnaround: f32,
    pub workload_diff_14d: f32,
}

impl WorkloadFeatures {
    pub const DIM: usize = 12;

    pub fn to_vec(&self) -> Vec<f32> {
        vec![
            self.home_matches_7d,
            self.home_matches_14d,
            self.home_matches_21d,
            self.away_matches_7d,
            self.away_matches_14d,
            self.away_matches_21d,
            self.home_rest,
            self.away_rest,
            self.rest_diff,
            self.home_short_turnaround,
            self.away_short_turnaround,
            self.workload_diff_14d,
        ]
    }

    pub fn names() -> [&'static str; Self::DIM] {
        [
            "home_matches_7d",
            "home_matches_14d",
            "home_matches_21d",
            "away_matches_7d",
            "away_matches_14d",
            "away_matches_21d",
            "home_rest",
            "away_rest",
            "rest_diff",
            "home_short_turnaround",
            "away_short_turnaround",
            "workload_diff_14d",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_empty_history() {
        let computer = WorkloadComputer::new();
        let features = computer.compute(TeamId(1), TeamId(2), date(15));

        assert_eq!(features.home_matches_7d, 0.0);
        assert_eq!(features.away_matches_14d, 0.0);
        assert_eq!(features.home_rest, 1.0);
        assert_eq!(features.home_short_turnaround, 0.0);
    }

    #[test]
    fn test_short_turnaround() {
        let mut computer = WorkloadComputer::new();
        computer.update(TeamId(1), TeamId(3), date(1));
        computer.update(TeamId(1), TeamId(4), date(12));

        let features = computer.compute(TeamId(1), TeamId(2), date(15));

        assert_eq!(computer.rest_days(TeamId(1), date(15)), 3);
        assert_eq!(features.home_short_turnaround, 1.0);
        assert!(features.rest_diff < 0.0);
        assert!(features.workload_diff_14d > 0.0);
    }

    #[test]
    fn test_same_day_match_is_not_counted() {
        let mut computer = WorkloadComputer::new();
        computer.update(TeamId(1), TeamId(2), date(15));
        assert_eq!(computer.matches_in_window(TeamId(1), date(15), 7), 0);
        assert_eq!(computer.rest_days(TeamId(1), date(15)), MAX_REST_DAYS);
    }
}
