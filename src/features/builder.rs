//! Chronological feature generation
//!
//! Walks the match history in date order. Matches sharing a date are all
//! featurised before any of them updates the state, so a match never sees
//! a result from its own day or later.

use chrono::NaiveDate;

use super::elo::{EloConfig, EloRatings};
use super::fixture::{season_progress, FixtureFeatures};
use super::form::FormTracker;
use super::head_to_head::HeadToHeadTracker;
use super::workload::WorkloadComputer;
use crate::{FeatureConfig, MatchRecord, TeamId};

/// Stateful builder shared by training and inference
pub struct FeatureBuilder {
    config: FeatureConfig,
    form: FormTracker,
    elo: EloRatings,
    h2h: HeadToHeadTracker,
    workload: WorkloadComputer,
    last_date: Option<NaiveDate>,
}

impl FeatureBuilder {
    pub fn new(config: FeatureConfig) -> Self {
        Self::with_elo(config, EloConfig::default())
    }

    pub fn with_elo(config: FeatureConfig, elo: EloConfig) -> Self {
        FeatureBuilder {
            form: FormTracker::new(config.window, config.decay),
            h2h: HeadToHeadTracker::new(config.h2h_window),
            elo: EloRatings::new(elo),
            workload: WorkloadComputer::new(),
            last_date: None,
            config,
        }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn elo(&self) -> &EloRatings {
        &self.elo
    }

    /// Matches seen for a team so far
    pub fn history_len(&self, team: TeamId) -> usize {
        self.form.history_len(team)
    }

    /// Both teams have enough history for a training sample
    pub fn has_history(&self, home: TeamId, away: TeamId) -> bool {
        self.history_len(home) >= self.config.min_history
            && self.history_len(away) >= self.config.min_history
    }

    /// Features for a fixture given the state so far (call BEFORE observe)
    pub fn features_for_fixture(&self, home: TeamId, away: TeamId, date: NaiveDate) -> FixtureFeatures {
        FixtureFeatures {
            home: self.form.compute(home, true),
            away: self.form.compute(away, false),
            h2h: self.h2h.compute(home, away),
            elo: self.elo.compute(home, away),
            workload: self.workload.compute(home, away, date),
            season_progress: season_progress(date),
            window: self.config.window,
            h2h_window: self.config.h2h_window,
        }
    }

    /// Feed a played match into every tracker
    pub fn observe(&mut self, record: &MatchRecord) {
        self.form.update(record);
        self.h2h.update(record);
        self.elo.update(record);
        self.workload
            .update(record.home_team, record.away_team, record.date);
        self.last_date = Some(self.last_date.map_or(record.date, |d| d.max(record.date)));
    }

    /// Observe every match without emitting samples
    pub fn observe_all(&mut self, matches: &[MatchRecord]) {
        let mut sorted: Vec<&MatchRecord> = matches.iter().collect();
        sorted.sort_by_key(|m| m.date);
        for record in sorted {
            self.observe(record);
        }
    }

    /// Emit (match, features) pairs for every match with enough history
    pub fn process(&mut self, matches: &[MatchRecord]) -> Vec<(MatchRecord, FixtureFeatures)> {
        let mut sorted: Vec<&MatchRecord> = matches.iter().collect();
        sorted.sort_by_key(|m| m.date);

        let mut samples = Vec::new();
        let mut start = 0;
        while start < sorted.len() {
            let date = sorted[start].date;
            let end = start
                + sorted[start..]
                    .iter()
                    .take_while(|m| m.date == date)
                    .count();
            let day = &sorted[start..end];

            for record in day {
                if self.has_history(record.home_team, record.away_team) {
                    let features =
                        self.features_for_fixture(record.home_team, record.away_team, record.date);
                    samples.push(((*record).clone(), features));
                }
            }
            for record in day {
                self.observe(record);
            }

            start = end;
        }

        log::debug!(
            "Built {} samples from {} matches (min history {})",
            samples.len(),
            matches.len(),
            self.config.min_history
        );
        samples
    }

    /// Date of the latest observed match
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.last_date
    }

    pub fn reset(&mut self) {
        self.form.reset();
        self.h2h.reset();
        self.elo.reset();
        self.workload.reset();
        self.last_date = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn m(day: u32, home: i64, away: i64, hg: u8, ag: u8) -> MatchRecord {
        MatchRecord::new(
            NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
            TeamId(home),
            TeamId(away),
            hg,
            ag,
        )
    }

    fn config(min_history: usize) -> FeatureConfig {
        FeatureConfig {
            min_history,
            ..Config::default().features
        }
    }

    #[test]
    fn test_min_history_filters_samples() {
        let matches = vec![
            m(1, 1, 2, 1, 0),
            m(1, 3, 4, 2, 2),
            m(8, 1, 3, 0, 1),
            m(8, 2, 4, 3, 1),
            m(15, 1, 4, 2, 0),
        ];
        let mut builder = FeatureBuilder::new(config(2));
        let samples = builder.process(&matches);

        // Only the day-15 match has two prior matches for both sides
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].0.date, NaiveDate::from_ymd_opt(2024, 2, 15).unwrap());
        assert_eq!(builder.history_len(TeamId(1)), 3);
    }

    #[test]
    fn test_same_day_results_do_not_leak() {
        let matches = vec![m(1, 1, 2, 5, 0), m(1, 1, 3, 0, 0)];
        let mut builder = FeatureBuilder::new(config(0));
        let samples = builder.process(&matches);

        assert_eq!(samples.len(), 2);
        for (_, features) in &samples {
            assert_eq!(features.home.matches, 0);
            assert_eq!(features.elo.home_elo, 0.0);
        }
    }

    #[test]
    fn test_fixture_features_use_accumulated_state() {
        let mut builder = FeatureBuilder::new(config(1));
        builder.observe_all(&[m(1, 1, 2, 3, 0), m(8, 2, 1, 0, 2)]);

        let features = builder.features_for_fixture(
            TeamId(1),
            TeamId(2),
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
        );
        assert_eq!(features.home.matches, 2);
        assert!(features.home.points_per_game > features.away.points_per_game);
        assert_eq!(features.h2h.meetings, 2);
        assert!(features.elo.elo_diff > 0.0);
        assert_eq!(features.to_vec().len(), FixtureFeatures::DIM);
    }
}
