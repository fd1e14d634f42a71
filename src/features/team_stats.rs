//! League tables from played matches

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::{MatchRecord, TeamId};

/// Cumulative statistics for a team
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamStatistics {
    pub matches_played: usize,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub goals_for: u32,
    pub goals_against: u32,
    pub home_matches: usize,
    pub home_wins: usize,
    pub away_matches: usize,
    pub away_wins: usize,
    pub clean_sheets: usize,
}

impl TeamStatistics {
    /// Create new empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Update statistics with a match result
    pub fn update(&mut self, record: &MatchRecord, team: TeamId) {
        let Some(is_home) = record.is_home(team) else {
            return;
        };
        let scored = record.goals_for(team).unwrap_or(0);
        let conceded = record.goals_against(team).unwrap_or(0);

        self.matches_played += 1;
        self.goals_for += scored as u32;
        self.goals_against += conceded as u32;
        if conceded == 0 {
            self.clean_sheets += 1;
        }

        if is_home {
            self.home_matches += 1;
        } else {
            self.away_matches += 1;
        }

        match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => {
                self.wins += 1;
                if is_home {
                    self.home_wins += 1;
                } else {
                    self.away_wins += 1;
                }
            }
            std::cmp::Ordering::Less => self.losses += 1,
            std::cmp::Ordering::Equal => self.draws += 1,
        }
    }

    /// League points (3 per win, 1 per draw)
    pub fn points(&self) -> u32 {
        3 * self.wins as u32 + self.draws as u32
    }

    pub fn goal_difference(&self) -> i32 {
        self.goals_for as i32 - self.goals_against as i32
    }
}

/// League table built from a set of matches
#[derive(Debug, Default)]
pub struct LeagueTable {
    stats: HashMap<TeamId, TeamStatistics>,
}

impl LeagueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table for one competition from `since` onwards
    pub fn from_season(matches: &[MatchRecord], competition: Option<&str>, since: NaiveDate) -> Self {
        let mut table = LeagueTable::new();
        let season = matches.iter().filter(|m| {
            m.date >= since
                && competition.map_or(true, |c| m.competition.as_deref() == Some(c))
        });
        for record in season {
            table.add_match(record);
        }
        table
    }

    pub fn add_match(&mut self, record: &MatchRecord) {
        for team in [record.home_team, record.away_team] {
            self.stats.entry(team).or_default().update(record, team);
        }
    }

    pub fn process_matches(&mut self, matches: &[MatchRecord]) {
        for record in matches {
            self.add_match(record);
        }
    }

    /// Get statistics for a team
    pub fn get(&self, team: TeamId) -> Option<&TeamStatistics> {
        self.stats.get(&team)
    }

    /// Teams ordered by points, goal difference, goals scored
    pub fn standings(&self) -> Vec<(TeamId, TeamStatistics)> {
        let mut rows: Vec<_> = self.stats.iter().map(|(t, s)| (*t, s.clone())).collect();
        rows.sort_by(|(ta, a), (tb, b)| {
            b.points()
                .cmp(&a.points())
                .then(b.goal_difference().cmp(&a.goal_difference()))
                .then(b.goals_for.cmp(&a.goals_for))
                .then(ta.cmp(tb))
        });
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_match(day: u32, home: i64, away: i64, home_goals: u8, away_goals: u8) -> MatchRecord {
        MatchRecord::new(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            TeamId(home),
            TeamId(away),
            home_goals,
            away_goals,
        )
    }

    #[test]
    fn test_team_statistics() {
        let mut stats = TeamStatistics::new();

        // Home win
        stats.update(&make_match(1, 1, 2, 3, 0), TeamId(1));
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.home_wins, 1);
        assert_eq!(stats.clean_sheets, 1);

        // Away draw
        stats.update(&make_match(8, 2, 1, 1, 1), TeamId(1));
        assert_eq!(stats.draws, 1);
        assert_eq!(stats.away_matches, 1);
        assert_eq!(stats.points(), 4);
        assert_eq!(stats.goal_difference(), 3);

        // Not involved
        stats.update(&make_match(9, 3, 4, 1, 0), TeamId(1));
        assert_eq!(stats.matches_played, 2);
    }

    #[test]
    fn test_standings_tiebreaks() {
        let mut table = LeagueTable::new();
        table.process_matches(&[
            make_match(1, 1, 2, 1, 0),
            make_match(1, 3, 4, 4, 0),
            make_match(8, 2, 3, 0, 0),
            make_match(8, 4, 1, 0, 0),
        ]);

        let standings = table.standings();
        // Teams 1 and 3 both have 4 points; 3 has the better goal difference
        assert_eq!(standings[0].0, TeamId(3));
        assert_eq!(standings[1].0, TeamId(1));
        assert_eq!(standings[0].1.points(), 4);
    }

    #[test]
    fn test_from_season_filters() {
        let mut old = make_match(1, 1, 2, 1, 0);
        old.date = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        let mut cup = make_match(2, 1, 2, 0, 1);
        cup.competition = Some("FAC".to_string());
        let mut league = make_match(3, 2, 1, 2, 2);
        league.competition = Some("PL".to_string());

        let table = LeagueTable::from_season(
            &[old, cup, league],
            Some("PL"),
            NaiveDate::from_ymd_opt(2023, 8, 1).unwrap(),
        );
        assert_eq!(table.get(TeamId(1)).map(|s| s.matches_played), Some(1));
    }
}
