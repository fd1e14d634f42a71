//! Recency-weighted team form
//!
//! Aggregates a team's last `window` matches. The most recent match has
//! weight 1 and every older match is multiplied by `decay`.

use std::collections::{HashMap, VecDeque};

use crate::{MatchRecord, TeamId};

/// League-wide neutral priors used when a team has no history
pub const NEUTRAL_PPG: f32 = 1.35;
pub const NEUTRAL_GOALS: f32 = 1.35;
const NEUTRAL_SHOTS: f32 = 12.0;
const NEUTRAL_SHOTS_ON_TARGET: f32 = 4.0;

/// Form of one team ahead of a fixture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamForm {
    /// Matches in the window (unweighted)
    pub matches: usize,
    pub points_per_game: f32,
    pub win_rate: f32,
    pub draw_rate: f32,
    pub loss_rate: f32,
    pub goals_for: f32,
    pub goals_against: f32,
    pub goal_difference: f32,
    pub clean_sheet_rate: f32,
    pub failed_to_score_rate: f32,
    pub over_2_5_rate: f32,
    pub both_scored_rate: f32,
    pub shots: f32,
    pub shots_on_target: f32,
    /// Weighted PPG in matches played on the same side (home/away)
    pub venue_ppg: f32,
    /// +n unbeaten run, -n winless run
    pub streak: i32,
    /// Weighted PPG of the last 3 minus weighted PPG of the window
    pub momentum: f32,
}

impl Default for TeamForm {
    fn default() -> Self {
        Self::neutral()
    }
}

impl TeamForm {
    pub const DIM: usize = 17;

    pub fn neutral() -> Self {
        TeamForm {
            matches: 0,
            points_per_game: NEUTRAL_PPG,
            win_rate: 1.0 / 3.0,
            draw_rate: 1.0 / 3.0,
            loss_rate: 1.0 / 3.0,
            goals_for: NEUTRAL_GOALS,
            goals_against: NEUTRAL_GOALS,
            goal_difference: 0.0,
            clean_sheet_rate: 0.3,
            failed_to_score_rate: 0.3,
            over_2_5_rate: 0.5,
            both_scored_rate: 0.5,
            shots: NEUTRAL_SHOTS,
            shots_on_target: NEUTRAL_SHOTS_ON_TARGET,
            venue_ppg: NEUTRAL_PPG,
            streak: 0,
            momentum: 0.0,
        }
    }

    /// Compute form from a chronological slice (most recent last)
    pub fn from_matches(team: TeamId, recent: &[MatchRecord], at_home: bool, decay: f32) -> Self {
        let played: Vec<&MatchRecord> = recent.iter().filter(|m| m.involves(team)).collect();
        if played.is_empty() {
            return Self::neutral();
        }

        let mut acc = WeightedSums::default();
        let mut venue = (0.0f32, 0.0f32);
        let mut shots = (0.0f32, 0.0f32, 0.0f32);
        let mut weight = 1.0f32;
        let mut last_three = (0.0f32, 0.0f32);

        for (age, m) in played.iter().rev().enumerate() {
            let scored = m.goals_for(team).unwrap_or(0);
            let conceded = m.goals_against(team).unwrap_or(0);
            let points = m.points_for(team).unwrap_or(0) as f32;

            acc.add(weight, points, scored, conceded);

            if m.is_home(team) == Some(at_home) {
                venue.0 += weight * points;
                venue.1 += weight;
            }
            if let Some((s, sot)) = m.shots_for(team) {
                shots.0 += weight * s as f32;
                shots.1 += weight * sot.unwrap_or((s as f32 / 3.0).round() as u8) as f32;
                shots.2 += weight;
            }
            if age < 3 {
                last_three.0 += weight * points;
                last_three.1 += weight;
            }

            weight *= decay;
        }

        let ppg = acc.points / acc.weight;
        let (shots_pg, sot_pg) = if shots.2 > 0.0 {
            (shots.0 / shots.2, shots.1 / shots.2)
        } else {
            (NEUTRAL_SHOTS, NEUTRAL_SHOTS_ON_TARGET)
        };

        TeamForm {
            matches: played.len(),
            points_per_game: ppg,
            win_rate: acc.wins / acc.weight,
            draw_rate: acc.draws / acc.weight,
            loss_rate: acc.losses / acc.weight,
            goals_for: acc.goals_for / acc.weight,
            goals_against: acc.goals_against / acc.weight,
            goal_difference: (acc.goals_for - acc.goals_against) / acc.weight,
            clean_sheet_rate: acc.clean_sheets / acc.weight,
            failed_to_score_rate: acc.failed_to_score / acc.weight,
            over_2_5_rate: acc.over_2_5 / acc.weight,
            both_scored_rate: acc.both_scored / acc.weight,
            shots: shots_pg,
            shots_on_target: sot_pg,
            venue_ppg: if venue.1 > 0.0 { venue.0 / venue.1 } else { ppg },
            streak: streak(team, &played),
            momentum: last_three.0 / last_three.1 - ppg,
        }
    }

    /// Flatten for the model; counts are scaled by `window`
    pub fn to_vec(&self, window: usize) -> Vec<f32> {
        let window = window.max(1) as f32;
        vec![
            self.matches as f32 / window,
            self.points_per_game,
            self.win_rate,
            self.draw_rate,
            self.loss_rate,
            self.goals_for,
            self.goals_against,
            self.goal_difference,
            self.clean_sheet_rate,
            self.failed_to_score_rate,
            self.over_2_5_rate,
            self.both_scored_rate,
            self.shots / 10.0,
            self.shots_on_target / 10.0,
            self.venue_ppg,
            self.streak as f32 / window,
            self.momentum,
        ]
    }

    pub fn names() -> [&'static str; Self::DIM] {
        [
            "history",
            "ppg",
            "win_rate",
            "draw_rate",
            "loss_rate",
            "goals_for",
            "goals_against",
            "goal_diff",
            "clean_sheets",
            "failed_to_score",
            "over_2_5",
            "both_scored",
            "shots",
            "shots_on_target",
            "venue_ppg",
            "streak",
            "momentum",
        ]
    }
}

#[derive(Default)]
struct WeightedSums {
    weight: f32,
    points: f32,
    wins: f32,
    draws: f32,
    losses: f32,
    goals_for: f32,
    goals_against: f32,
    clean_sheets: f32,
    failed_to_score: f32,
    over_2_5: f32,
    both_scored: f32,
}

impl WeightedSums {
    fn add(&mut self, w: f32, points: f32, scored: u8, conceded: u8) {
        let flag = |b: bool| if b { w } else { 0.0 };

        self.weight += w;
        self.points += w * points;
        self.wins += flag(scored > conceded);
        self.draws += flag(scored == conceded);
        self.losses += flag(scored < conceded);
        self.goals_for += w * scored as f32;
        self.goals_against += w * conceded as f32;
        self.clean_sheets += flag(conceded == 0);
        self.failed_to_score += flag(scored == 0);
        self.over_2_5 += flag(scored as u16 + conceded as u16 > 2);
        self.both_scored += flag(scored > 0 && conceded > 0);
    }
}

/// Current run: positive while unbeaten, negative while winless
fn streak(team: TeamId, played: &[&MatchRecord]) -> i32 {
    let mut iter = played.iter().rev().map(|m| m.points_for(team).unwrap_or(0));
    let Some(latest) = iter.next() else {
        return 0;
    };

    if latest > 0 {
        1 + iter.take_while(|p| *p > 0).count() as i32
    } else {
        -(1 + iter.take_while(|p| *p < 3).count() as i32)
    }
}

/// Keeps each team's last `window` matches
pub struct FormTracker {
    window: usize,
    decay: f32,
    recent: HashMap<TeamId, VecDeque<MatchRecord>>,
    played: HashMap<TeamId, usize>,
}

impl FormTracker {
    pub fn new(window: usize, decay: f32) -> Self {
        FormTracker {
            window: window.max(1),
            decay,
            recent: HashMap::new(),
            played: HashMap::new(),
        }
    }

    /// Form ahead of a fixture (call BEFORE update)
    pub fn compute(&self, team: TeamId, at_home: bool) -> TeamForm {
        match self.recent.get(&team) {
            Some(history) => {
                let slice: Vec<MatchRecord> = history.iter().cloned().collect();
                TeamForm::from_matches(team, &slice, at_home, self.decay)
            }
            None => TeamForm::neutral(),
        }
    }

    /// Total matches seen for a team (not capped by the window)
    pub fn history_len(&self, team: TeamId) -> usize {
        self.played.get(&team).copied().unwrap_or(0)
    }

    pub fn update(&mut self, record: &MatchRecord) {
        for team in [record.home_team, record.away_team] {
            let history = self.recent.entry(team).or_default();
            history.push_back(record.clone());
            while history.len() > self.window {
                history.pop_front();
            }
            *self.played.entry(team).or_insert(0) += 1;
        }
    }

    pub fn reset(&mut self) {
        self.recent.clear();
        self.played.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn m(day: u32, home: i64, away: i64, hg: u8, ag: u8) -> MatchRecord {
        MatchRecord::new(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            TeamId(home),
            TeamId(away),
            hg,
            ag,
        )
    }

    #[test]
    fn test_neutral_without_history() {
        let tracker = FormTracker::new(10, 0.85);
        let form = tracker.compute(TeamId(1), true);
        assert_eq!(form.matches, 0);
        assert_eq!(form.points_per_game, NEUTRAL_PPG);
        assert_eq!(form.to_vec(10).len(), TeamForm::DIM);
    }

    #[test]
    fn test_recent_matches_weigh_more() {
        // Two losses then a win: weighted PPG must exceed the plain mean of 1.0
        let history = vec![m(1, 1, 2, 0, 1), m(8, 3, 1, 2, 0), m(15, 1, 4, 3, 1)];
        let form = TeamForm::from_matches(TeamId(1), &history, true, 0.5);

        assert_eq!(form.matches, 3);
        assert!(form.points_per_game > 1.0);
        assert!(form.win_rate > 0.5);
        assert_eq!(form.streak, 1);
    }

    #[test]
    fn test_streaks() {
        let unbeaten = vec![m(1, 1, 2, 0, 2), m(8, 1, 3, 1, 1), m(15, 4, 1, 0, 2)];
        assert_eq!(TeamForm::from_matches(TeamId(1), &unbeaten, true, 0.85).streak, 2);

        let winless = vec![m(1, 1, 2, 3, 0), m(8, 1, 3, 1, 1), m(15, 4, 1, 2, 0)];
        assert_eq!(TeamForm::from_matches(TeamId(1), &winless, true, 0.85).streak, -2);
    }

    #[test]
    fn test_rates() {
        let history = vec![m(1, 1, 2, 2, 2), m(8, 3, 1, 0, 0)];
        let form = TeamForm::from_matches(TeamId(1), &history, false, 1.0);

        assert!((form.draw_rate - 1.0).abs() < 1e-6);
        assert!((form.clean_sheet_rate - 0.5).abs() < 1e-6);
        assert!((form.both_scored_rate - 0.5).abs() < 1e-6);
        assert!((form.over_2_5_rate - 0.5).abs() < 1e-6);
        // Only the away draw counts toward away venue form
        assert!((form.venue_ppg - 1.0).abs() < 1e-6);
        assert!(form.momentum.abs() < 1e-6);
    }

    #[test]
    fn test_window_caps_history() {
        let mut tracker = FormTracker::new(2, 0.85);
        tracker.update(&m(1, 1, 2, 0, 5));
        tracker.update(&m(8, 1, 3, 1, 0));
        tracker.update(&m(15, 1, 4, 1, 0));

        let form = tracker.compute(TeamId(1), true);
        assert_eq!(form.matches, 2);
        assert_eq!(form.loss_rate, 0.0);
        assert_eq!(tracker.history_len(TeamId(1)), 3);
    }
}
