//! Head-to-head record between two teams

use std::collections::{HashMap, VecDeque};

use crate::{MatchRecord, TeamId};

use super::form::NEUTRAL_GOALS;

/// Home win share used when a pair has never met at this ground
const NEUTRAL_HOME_WIN_RATE: f32 = 0.45;

/// Previous meetings seen from the upcoming home team's side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadToHead {
    pub meetings: usize,
    pub win_rate: f32,
    pub draw_rate: f32,
    pub loss_rate: f32,
    pub goals_for: f32,
    pub goals_against: f32,
    /// Win rate of the upcoming home team in meetings it hosted
    pub same_venue_win_rate: f32,
}

impl Default for HeadToHead {
    fn default() -> Self {
        HeadToHead {
            meetings: 0,
            win_rate: 1.0 / 3.0,
            draw_rate: 1.0 / 3.0,
            loss_rate: 1.0 / 3.0,
            goals_for: NEUTRAL_GOALS,
            goals_against: NEUTRAL_GOALS,
            same_venue_win_rate: NEUTRAL_HOME_WIN_RATE,
        }
    }
}

impl HeadToHead {
    pub const DIM: usize = 7;

    /// Summarise meetings (any order) for `home` against `away`
    pub fn from_meetings(home: TeamId, away: TeamId, meetings: &[MatchRecord]) -> Self {
        let relevant: Vec<&MatchRecord> = meetings
            .iter()
            .filter(|m| m.involves(home) && m.involves(away))
            .collect();
        if relevant.is_empty() {
            return Self::default();
        }

        let n = relevant.len() as f32;
        let (mut wins, mut draws, mut losses) = (0.0, 0.0, 0.0);
        let (mut scored, mut conceded) = (0.0, 0.0);
        let (mut hosted, mut hosted_wins) = (0.0, 0.0);

        for m in &relevant {
            let gf = m.goals_for(home).unwrap_or(0);
            let ga = m.goals_against(home).unwrap_or(0);
            scored += gf as f32;
            conceded += ga as f32;
            match gf.cmp(&ga) {
                std::cmp::Ordering::Greater => wins += 1.0,
                std::cmp::Ordering::Equal => draws += 1.0,
                std::cmp::Ordering::Less => losses += 1.0,
            }
            if m.home_team == home {
                hosted += 1.0;
                if gf > ga {
                    hosted_wins += 1.0;
                }
            }
        }

        HeadToHead {
            meetings: relevant.len(),
            win_rate: wins / n,
            draw_rate: draws / n,
            loss_rate: losses / n,
            goals_for: scored / n,
            goals_against: conceded / n,
            same_venue_win_rate: if hosted > 0.0 {
                hosted_wins / hosted
            } else {
                NEUTRAL_HOME_WIN_RATE
            },
        }
    }

    pub fn to_vec(&self, window: usize) -> Vec<f32> {
        vec![
            self.meetings as f32 / window.max(1) as f32,
            self.win_rate,
            self.draw_rate,
            self.loss_rate,
            self.goals_for,
            self.goals_against,
            self.same_venue_win_rate,
        ]
    }

    pub fn names() -> [&'static str; Self::DIM] {
        [
            "h2h_meetings",
            "h2h_win_rate",
            "h2h_draw_rate",
            "h2h_loss_rate",
            "h2h_goals_for",
            "h2h_goals_against",
            "h2h_same_venue_win_rate",
        ]
    }
}

/// Tracks the last `window` meetings of every pair
pub struct HeadToHeadTracker {
    window: usize,
    meetings: HashMap<(TeamId, TeamId), VecDeque<MatchRecord>>,
}

fn pair_key(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl HeadToHeadTracker {
    pub fn new(window: usize) -> Self {
        HeadToHeadTracker {
            window: window.max(1),
            meetings: HashMap::new(),
        }
    }

    /// Call BEFORE update
    pub fn compute(&self, home: TeamId, away: TeamId) -> HeadToHead {
        match self.meetings.get(&pair_key(home, away)) {
            Some(history) => {
                let slice: Vec<MatchRecord> = history.iter().cloned().collect();
                HeadToHead::from_meetings(home, away, &slice)
            }
            None => HeadToHead::default(),
        }
    }

    pub fn update(&mut self, record: &MatchRecord) {
        let history = self
            .meetings
            .entry(pair_key(record.home_team, record.away_team))
            .or_default();
        history.push_back(record.clone());
        while history.len() > self.window {
            history.pop_front();
        }
    }

    pub fn reset(&mut self) {
        self.meetings.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn m(day: u32, home: i64, away: i64, hg: u8, ag: u8) -> MatchRecord {
        MatchRecord::new(
            NaiveDate::from_ymd_opt(2023, 10, day).unwrap(),
            TeamId(home),
            TeamId(away),
            hg,
            ag,
        )
    }

    #[test]
    fn test_no_meetings_is_neutral() {
        let tracker = HeadToHeadTracker::new(6);
        let h2h = tracker.compute(TeamId(1), TeamId(2));
        assert_eq!(h2h, HeadToHead::default());
    }

    #[test]
    fn test_perspective_of_upcoming_home_team() {
        let mut tracker = HeadToHeadTracker::new(6);
        tracker.update(&m(1, 1, 2, 2, 0)); // 1 wins at home
        tracker.update(&m(8, 2, 1, 3, 1)); // 2 wins at home
        tracker.update(&m(15, 1, 3, 0, 0)); // other pair

        let h2h = tracker.compute(TeamId(2), TeamId(1));
        assert_eq!(h2h.meetings, 2);
        assert!((h2h.win_rate - 0.5).abs() < 1e-6);
        assert!((h2h.goals_for - 1.5).abs() < 1e-6);
        assert!((h2h.goals_against - 1.5).abs() < 1e-6);
        assert!((h2h.draw_rate).abs() < 1e-6);
        assert!((h2h.same_venue_win_rate - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_window_keeps_latest_meetings() {
        let mut tracker = HeadToHeadTracker::new(2);
        tracker.update(&m(1, 1, 2, 0, 3));
        tracker.update(&m(8, 1, 2, 1, 0));
        tracker.update(&m(15, 2, 1, 0, 1));

        let h2h = tracker.compute(TeamId(1), TeamId(2));
        assert_eq!(h2h.meetings, 2);
        assert_eq!(h2h.loss_rate, 0.0);
    }
}
