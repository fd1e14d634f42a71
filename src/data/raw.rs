//! Match and fixture data before team ID resolution

use chrono::NaiveDate;

use crate::{DataSource, Fixture, MatchRecord, Result, TeamId};

/// Played match with team names as they appeared in the source
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatch {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: u8,
    pub away_goals: u8,
    pub half_time: Option<(u8, u8)>,
    pub home_shots: Option<u8>,
    pub away_shots: Option<u8>,
    pub home_shots_on_target: Option<u8>,
    pub away_shots_on_target: Option<u8>,
    pub competition: Option<String>,
    pub matchday: Option<u16>,
    pub venue: Option<String>,
    pub source: DataSource,
}

impl RawMatch {
    pub fn new(
        date: NaiveDate,
        home_team: &str,
        away_team: &str,
        home_goals: u8,
        away_goals: u8,
        source: DataSource,
    ) -> Self {
        RawMatch {
            date,
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            home_goals,
            away_goals,
            half_time: None,
            home_shots: None,
            away_shots: None,
            home_shots_on_target: None,
            away_shots_on_target: None,
            competition: None,
            matchday: None,
            venue: None,
            source,
        }
    }

    /// Deduplication key: (date, home, away) with names lowercased
    pub fn key(&self) -> (NaiveDate, String, String) {
        (
            self.date,
            self.home_team.to_lowercase(),
            self.away_team.to_lowercase(),
        )
    }
}

/// Upcoming match (no score yet)
#[derive(Debug, Clone, PartialEq)]
pub struct RawFixture {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub competition: Option<String>,
    pub matchday: Option<u16>,
    pub venue: Option<String>,
}

/// Output of any ingestion path
#[derive(Debug, Clone, Default)]
pub struct LoadedData {
    pub matches: Vec<RawMatch>,
    pub fixtures: Vec<RawFixture>,
}

impl LoadedData {
    pub fn extend(&mut self, other: LoadedData) {
        self.matches.extend(other.matches);
        self.fixtures.extend(other.fixtures);
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.fixtures.is_empty()
    }

    /// Resolve team names into IDs and build storable records
    pub fn to_records(
        &self,
        team_resolver: &impl Fn(&str) -> Result<TeamId>,
    ) -> Result<(Vec<MatchRecord>, Vec<Fixture>)> {
        let records = to_match_records(&self.matches, team_resolver)?;

        let mut fixtures = Vec::with_capacity(self.fixtures.len());
        for raw in &self.fixtures {
            fixtures.push(Fixture {
                date: raw.date,
                home_team: team_resolver(&raw.home_team)?,
                away_team: team_resolver(&raw.away_team)?,
                competition: raw.competition.clone(),
                matchday: raw.matchday,
                venue: raw.venue.clone(),
            });
        }

        Ok((records, fixtures))
    }
}

/// Convert raw matches to MatchRecords, resolving team IDs
pub fn to_match_records(
    raw_matches: &[RawMatch],
    team_resolver: &impl Fn(&str) -> Result<TeamId>,
) -> Result<Vec<MatchRecord>> {
    let mut records = Vec::with_capacity(raw_matches.len());

    for raw in raw_matches {
        records.push(MatchRecord {
            date: raw.date,
            home_team: team_resolver(&raw.home_team)?,
            away_team: team_resolver(&raw.away_team)?,
            home_goals: raw.home_goals,
            away_goals: raw.away_goals,
            half_time: raw.half_time,
            home_shots: raw.home_shots,
            away_shots: raw.away_shots,
            home_shots_on_target: raw.home_shots_on_target,
            away_shots_on_target: raw.away_shots_on_target,
            competition: raw.competition.clone(),
            matchday: raw.matchday,
            venue: raw.venue.clone(),
            source: raw.source,
        });
    }

    records.sort_by_key(|r| r.date);
    Ok(records)
}
