//! Model input for one fixture

use chrono::{Datelike, NaiveDate};

use super::elo::EloFeatures;
use super::form::TeamForm;
use super::head_to_head::HeadToHead;
use super::workload::WorkloadFeatures;

/// Everything known about a fixture before kick-off
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureFeatures {
    pub home: TeamForm,
    pub away: TeamForm,
    pub h2h: HeadToHead,
    pub elo: EloFeatures,
    pub workload: WorkloadFeatures,
    /// 0.0 in August, 1.0 from June
    pub season_progress: f32,
    /// Form window, used to scale count features
    pub window: usize,
    pub h2h_window: usize,
}

impl FixtureFeatures {
    const DIFF_DIM: usize = 4;

    /// Length of `to_vec()`
    pub const DIM: usize = 2 * TeamForm::DIM
        + Self::DIFF_DIM
        + HeadToHead::DIM
        + EloFeatures::DIM
        + WorkloadFeatures::DIM
        + 1;

    /// Column holding the Elo expected score of the home side
    pub const ELO_EXPECTED_INDEX: usize =
        2 * TeamForm::DIM + Self::DIFF_DIM + HeadToHead::DIM + 3;

    pub fn to_vec(&self) -> Vec<f32> {
        let mut v = Vec::with_capacity(Self::DIM);
        v.extend(self.home.to_vec(self.window));
        v.extend(self.away.to_vec(self.window));
        v.push(self.home.points_per_game - self.away.points_per_game);
        v.push(self.home.goal_difference - self.away.goal_difference);
        v.push(self.home.momentum - self.away.momentum);
        v.push((self.home.shots_on_target - self.away.shots_on_target) / 10.0);
        v.extend(self.h2h.to_vec(self.h2h_window));
        v.extend(self.elo.to_vec());
        v.extend(self.workload.to_vec());
        v.push(self.season_progress);
        v
    }

    /// Column names matching `to_vec()`
    pub fn names() -> Vec<String> {
        let mut names = Vec::with_capacity(Self::DIM);
        names.extend(TeamForm::names().iter().map(|n| format!("home_{}", n)));
        names.extend(TeamForm::names().iter().map(|n| format!("away_{}", n)));
        names.extend(
            ["ppg_diff", "goal_diff_diff", "momentum_diff", "shots_on_target_diff"]
                .iter()
                .map(|n| n.to_string()),
        );
        names.extend(HeadToHead::names().iter().map(|n| n.to_string()));
        names.extend(EloFeatures::names().iter().map(|n| n.to_string()));
        names.extend(WorkloadFeatures::names().iter().map(|n| n.to_string()));
        names.push("season_progress".to_string());
        names
    }
}

/// Position within a European season (August start)
pub fn season_progress(date: NaiveDate) -> f32 {
    let months_since_august = (date.month() + 4) % 12;
    (months_since_august as f32 / 10.0).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral() -> FixtureFeatures {
        FixtureFeatures {
            home: TeamForm::neutral(),
            away: TeamForm::neutral(),
            h2h: HeadToHead::default(),
            elo: EloFeatures {
                home_expected: 0.585,
                ..EloFeatures::default()
            },
            workload: WorkloadFeatures::default(),
            season_progress: 0.5,
            window: 10,
            h2h_window: 6,
        }
    }

    #[test]
    fn test_vector_matches_names() {
        let features = neutral();
        let v = features.to_vec();
        assert_eq!(v.len(), FixtureFeatures::DIM);
        assert_eq!(FixtureFeatures::names().len(), FixtureFeatures::DIM);
        assert_eq!(
            FixtureFeatures::names()[FixtureFeatures::ELO_EXPECTED_INDEX],
            "elo_expected"
        );
        assert!((v[FixtureFeatures::ELO_EXPECTED_INDEX] - 0.585).abs() < 1e-6);
    }

    #[test]
    fn test_season_progress() {
        assert_eq!(season_progress(NaiveDate::from_ymd_opt(2023, 8, 12).unwrap()), 0.0);
        assert!((season_progress(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()) - 0.5).abs() < 1e-6);
        assert_eq!(season_progress(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()), 1.0);
    }
}
