//! Monte Carlo simulation of the remainder of a league season

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::features::LeagueTable;
use crate::model::ScoreGrid;
use crate::{Config, FootballError, MatchRecord, Result, Team, TeamId};

/// Home goals are scaled up and away goals down by this factor when
/// expected goals are derived from the table
const HOME_ADVANTAGE: f32 = 1.1;

/// Current league position of a team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub team: String,
    pub played: u32,
    pub points: i32,
    pub goals_for: i32,
    pub goals_against: i32,
}

impl Standing {
    pub fn goal_difference(&self) -> i32 {
        self.goals_for - self.goals_against
    }

    /// Standings from a table of played matches
    pub fn from_league_table(table: &LeagueTable, names: &HashMap<TeamId, String>) -> Vec<Standing> {
        table
            .standings()
            .into_iter()
            .map(|(id, stats)| Standing {
                team: names.get(&id).cloned().unwrap_or_else(|| id.to_string()),
                played: stats.matches_played as u32,
                points: stats.points() as i32,
                goals_for: stats.goals_for as i32,
                goals_against: stats.goals_against as i32,
            })
            .collect()
    }
}

/// Table of the season so far from stored results, team ids resolved to
/// names through `teams`
pub fn standings_from_matches(
    matches: &[MatchRecord],
    teams: &[Team],
    competition: Option<&str>,
    since: NaiveDate,
) -> Vec<Standing> {
    let names: HashMap<TeamId, String> = teams.iter().map(|t| (t.id, t.name.clone())).collect();
    Standing::from_league_table(&LeagueTable::from_season(matches, competition, since), &names)
}

/// A remaining fixture, optionally with model expected goals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonFixture {
    pub home: String,
    pub away: String,
    #[serde(default)]
    pub expected_home: Option<f32>,
    #[serde(default)]
    pub expected_away: Option<f32>,
}

/// Per-team probabilities over the simulated seasons
#[derive(Debug, Clone, Serialize)]
pub struct TeamOutlook {
    pub team: String,
    pub title: f32,
    pub top_four: f32,
    pub relegation: f32,
    pub mean_points: f32,
    pub mean_position: f32,
}

pub fn load_standings_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Standing>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<Standing>, _>>()?;
    Ok(rows)
}

pub fn load_fixtures_csv<P: AsRef<Path>>(path: P) -> Result<Vec<SeasonFixture>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<SeasonFixture>, _>>()?;
    Ok(rows)
}

/// Order by points, goal difference, goals scored, then name
fn table_order(a: &Standing, b: &Standing) -> std::cmp::Ordering {
    b.points
        .cmp(&a.points)
        .then(b.goal_difference().cmp(&a.goal_difference()))
        .then(b.goals_for.cmp(&a.goals_for))
        .then(a.team.cmp(&b.team))
}

#[derive(Debug, Clone)]
pub struct SeasonSimulator {
    pub iterations: usize,
    pub seed: u64,
    pub rho: f32,
    pub max_goals: usize,
    pub league_avg_goals: f32,
    pub top_places: usize,
    pub relegation_places: usize,
}

impl SeasonSimulator {
    pub fn new(config: &Config) -> Self {
        SeasonSimulator {
            iterations: config.simulation.iterations,
            seed: config.simulation.seed,
            rho: config.ensemble.rho,
            max_goals: config.ensemble.max_goals,
            league_avg_goals: config.simulation.league_avg_goals,
            top_places: 4,
            relegation_places: 3,
        }
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Expected goals for a fixture, taken from the fixture when present and
    /// otherwise from each side's scoring and conceding rates so far
    pub fn expected_goals(&self, home: &Standing, away: &Standing, fixture: &SeasonFixture) -> (f32, f32) {
        let avg = self.league_avg_goals.max(0.1);
        let rate = |goals: i32, played: u32| {
            if played == 0 {
                1.0
            } else {
                (goals as f32 / played as f32 / avg).max(0.2)
            }
        };
        let derived_home =
            avg * rate(home.goals_for, home.played) * rate(away.goals_against, away.played) * HOME_ADVANTAGE;
        let derived_away =
            avg * rate(away.goals_for, away.played) * rate(home.goals_against, home.played) / HOME_ADVANTAGE;

        (
            fixture.expected_home.unwrap_or(derived_home),
            fixture.expected_away.unwrap_or(derived_away),
        )
    }

    pub fn run(&self, standings: &[Standing], fixtures: &[SeasonFixture]) -> Result<Vec<TeamOutlook>> {
        if self.iterations == 0 {
            return Err(FootballError::Config(
                "Simulation needs at least one iteration".to_string(),
            ));
        }
        if standings.is_empty() {
            return Err(FootballError::Parse("Standings table is empty".to_string()));
        }

        let index: HashMap<&str, usize> = standings
            .iter()
            .enumerate()
            .map(|(i, s)| (s.team.as_str(), i))
            .collect();

        let mut games = Vec::with_capacity(fixtures.len());
        for fixture in fixtures {
            let home = *index
                .get(fixture.home.as_str())
                .ok_or_else(|| FootballError::UnknownTeam(fixture.home.clone()))?;
            let away = *index
                .get(fixture.away.as_str())
                .ok_or_else(|| FootballError::UnknownTeam(fixture.away.clone()))?;
            let (xh, xa) = self.expected_goals(&standings[home], &standings[away], fixture);
            games.push((home, away, ScoreGrid::new(xh, xa, self.rho, self.max_goals)));
        }
        log::info!(
            "Simulating {} remaining fixtures for {} teams, {} iterations",
            games.len(),
            standings.len(),
            self.iterations
        );

        // (final position, final points) per team for each iteration
        let outcomes: Vec<Vec<(usize, i32)>> = (0..self.iterations)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(i as u64));
                let mut table = standings.to_vec();
                for (home, away, grid) in &games {
                    let (hg, ag) = grid.sample(&mut rng);
                    let (hg, ag) = (hg as i32, ag as i32);
                    table[*home].goals_for += hg;
                    table[*home].goals_against += ag;
                    table[*away].goals_for += ag;
                    table[*away].goals_against += hg;
                    match hg.cmp(&ag) {
                        std::cmp::Ordering::Greater => table[*home].points += 3,
                        std::cmp::Ordering::Less => table[*away].points += 3,
                        std::cmp::Ordering::Equal => {
                            table[*home].points += 1;
                            table[*away].points += 1;
                        }
                    }
                }

                let mut order: Vec<usize> = (0..table.len()).collect();
                order.sort_by(|&a, &b| table_order(&table[a], &table[b]));
                let mut result = vec![(0, 0); table.len()];
                for (position, &team) in order.iter().enumerate() {
                    result[team] = (position + 1, table[team].points);
                }
                result
            })
            .collect();

        let n = outcomes.len() as f32;
        let teams = standings.len();
        let relegation_from = teams.saturating_sub(self.relegation_places) + 1;

        let mut outlook: Vec<TeamOutlook> = standings
            .iter()
            .enumerate()
            .map(|(team, standing)| {
                let (mut title, mut top, mut relegated) = (0usize, 0usize, 0usize);
                let (mut points, mut position) = (0f64, 0f64);
                for run in &outcomes {
                    let (pos, pts) = run[team];
                    if pos == 1 {
                        title += 1;
                    }
                    if pos <= self.top_places {
                        top += 1;
                    }
                    if pos >= relegation_from {
                        relegated += 1;
                    }
                    points += pts as f64;
                    position += pos as f64;
                }
                TeamOutlook {
                    team: standing.team.clone(),
                    title: title as f32 / n,
                    top_four: top as f32 / n,
                    relegation: relegated as f32 / n,
                    mean_points: (points / n as f64) as f32,
                    mean_position: (position / n as f64) as f32,
                }
            })
            .collect();

        outlook.sort_by(|a, b| a.mean_position.total_cmp(&b.mean_position));
        Ok(outlook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(team: &str, points: i32, gf: i32, ga: i32) -> Standing {
        Standing {
            team: team.to_string(),
            played: 30,
            points,
            goals_for: gf,
            goals_against: ga,
        }
    }

    fn league() -> Vec<Standing> {
        vec![
            standing("Alpha", 75, 70, 25),
            standing("Bravo", 60, 55, 35),
            standing("Charlie", 45, 40, 40),
            standing("Delta", 40, 35, 45),
            standing("Echo", 30, 30, 55),
            standing("Foxtrot", 20, 25, 65),
        ]
    }

    fn simulator() -> SeasonSimulator {
        SeasonSimulator::new(&Config::default()).with_iterations(500)
    }

    #[test]
    fn test_no_fixtures_keeps_table() {
        let outlook = simulator().run(&league(), &[]).unwrap();
        assert_eq!(outlook[0].team, "Alpha");
        assert_eq!(outlook[0].title, 1.0);
        assert_eq!(outlook[0].mean_points, 75.0);
        let last = outlook.last().unwrap();
        assert_eq!(last.team, "Foxtrot");
        assert_eq!(last.relegation, 1.0);
        // Six teams, bottom three relegated
        assert_eq!(outlook[3].relegation, 1.0);
        assert_eq!(outlook[2].relegation, 0.0);
    }

    #[test]
    fn test_close_race_is_uncertain() {
        let mut table = league();
        table[1].points = 74;
        let fixtures = vec![
            SeasonFixture {
                home: "Alpha".into(),
                away: "Bravo".into(),
                expected_home: Some(1.3),
                expected_away: Some(1.3),
            },
            SeasonFixture {
                home: "Bravo".into(),
                away: "Foxtrot".into(),
                expected_home: None,
                expected_away: None,
            },
        ];
        let outlook = simulator().run(&table, &fixtures).unwrap();
        let alpha = outlook.iter().find(|o| o.team == "Alpha").unwrap();
        let bravo = outlook.iter().find(|o| o.team == "Bravo").unwrap();
        assert!(alpha.title > 0.05 && alpha.title < 0.95);
        assert!((alpha.title + bravo.title - 1.0).abs() < 1e-4);
        assert!(bravo.mean_points > 74.0);
    }

    #[test]
    fn test_unknown_fixture_team() {
        let fixtures = vec![SeasonFixture {
            home: "Alpha".into(),
            away: "Zulu".into(),
            expected_home: None,
            expected_away: None,
        }];
        assert!(matches!(
            simulator().run(&league(), &fixtures),
            Err(FootballError::UnknownTeam(name)) if name == "Zulu"
        ));
    }

    #[test]
    fn test_derived_expected_goals_favour_stronger_side() {
        let table = league();
        let fixture = SeasonFixture {
            home: "Alpha".into(),
            away: "Foxtrot".into(),
            expected_home: None,
            expected_away: None,
        };
        let (xh, xa) = simulator().expected_goals(&table[0], &table[5], &fixture);
        assert!(xh > 2.0 * xa);
    }

    #[test]
    fn test_load_csv() {
        let dir = tempfile::tempdir().unwrap();
        let table_path = dir.path().join("table.csv");
        std::fs::write(
            &table_path,
            "team,played,points,goals_for,goals_against\nAlpha,30,75,70,25\nBravo,30,60,55,35\n",
        )
        .unwrap();
        let fixtures_path = dir.path().join("fixtures.csv");
        std::fs::write(
            &fixtures_path,
            "home,away,expected_home,expected_away\nAlpha,Bravo,1.4,1.1\nBravo,Alpha,,\n",
        )
        .unwrap();

        let standings = load_standings_csv(&table_path).unwrap();
        assert_eq!(standings.len(), 2);
        assert_eq!(standings[1].goal_difference(), 20);

        let fixtures = load_fixtures_csv(&fixtures_path).unwrap();
        assert_eq!(fixtures[0].expected_home, Some(1.4));
        assert_eq!(fixtures[1].expected_away, None);
    }
}
