//! football-data.org v4 REST client
//!
//! Finished matches become results, scheduled/timed matches become fixtures.
//! Responses are cached as JSON so seasons can be re-imported offline.

use chrono::NaiveDate;
use serde::Deserialize;

use super::{with_retry, ResponseCache, Source};
use crate::data::raw::{LoadedData, RawFixture, RawMatch};
use crate::{DataSource, FootballError, Result};

const BASE_URL: &str = "https://api.football-data.org/v4";
const TOKEN_ENV: &str = "FOOTBALL_DATA_TOKEN";

/// Client for one competition on football-data.org
pub struct FootballDataApi {
    client: reqwest::blocking::Client,
    competition: String,
    token: Option<String>,
    cache: ResponseCache,
    base_url: String,
}

impl FootballDataApi {
    /// `competition` is the API code, e.g. PL, PD, SA, BL1
    pub fn new(competition: &str, token: Option<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .user_agent("football-predictor/0.1")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        let token = token.or_else(|| std::env::var(TOKEN_ENV).ok());

        FootballDataApi {
            client,
            competition: competition.to_string(),
            token,
            cache: ResponseCache::disabled(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn season_url(&self, year: u16) -> String {
        format!(
            "{}/competitions/{}/matches?season={}",
            self.base_url, self.competition, year
        )
    }

    fn fetch_json(&self, url: &str) -> Result<String> {
        self.cache
            .get_or_fetch(url, "json", DataSource::FootballDataApi, || {
                let token = self.token.as_deref().ok_or_else(|| FootballError::Source {
                    data_source: DataSource::FootballDataApi,
                    message: format!("No API token (set {} or data.api_token)", TOKEN_ENV),
                })?;

                with_retry(
                    || {
                        log::debug!("Fetching {}", url);
                        let response = self
                            .client
                            .get(url)
                            .header("X-Auth-Token", token)
                            .send()?;

                        if !response.status().is_success() {
                            return Err(FootballError::Source {
                                data_source: DataSource::FootballDataApi,
                                message: format!("HTTP {}: {}", response.status(), url),
                            });
                        }
                        Ok(response.text()?)
                    },
                    3,
                )
            })
    }

    /// Parse a `/competitions/{code}/matches` response body
    pub fn parse_matches(&self, body: &str) -> Result<LoadedData> {
        let response: MatchesResponse = serde_json::from_str(body)?;
        let mut data = LoadedData::default();

        for m in response.matches {
            let Some(date) = m.utc_date.get(..10).and_then(|d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()
            }) else {
                log::warn!("Skipping match {} with bad date {:?}", m.id, m.utc_date);
                continue;
            };

            let (Some(home_team), Some(away_team)) = (m.home_team.display_name(), m.away_team.display_name()) else {
                log::debug!("Skipping match {} without both teams", m.id);
                continue;
            };

            let competition = m
                .competition
                .as_ref()
                .and_then(|c| c.code.clone())
                .or_else(|| Some(self.competition.clone()));

            match m.status.as_str() {
                "FINISHED" => {
                    let (Some(home_goals), Some(away_goals)) =
                        (m.score.full_time.home, m.score.full_time.away)
                    else {
                        log::warn!("Finished match {} has no full-time score", m.id);
                        continue;
                    };
                    let mut record = RawMatch::new(
                        date,
                        &home_team,
                        &away_team,
                        home_goals,
                        away_goals,
                        DataSource::FootballDataApi,
                    );
                    record.half_time = m.score.half_time.home.zip(m.score.half_time.away);
                    record.competition = competition;
                    record.matchday = m.matchday;
                    record.venue = m.venue;
                    data.matches.push(record);
                }
                "SCHEDULED" | "TIMED" => data.fixtures.push(RawFixture {
                    date,
                    home_team,
                    away_team,
                    competition,
                    matchday: m.matchday,
                    venue: m.venue,
                }),
                other => log::debug!("Ignoring match {} with status {}", m.id, other),
            }
        }

        Ok(data)
    }
}

impl Source for FootballDataApi {
    fn source(&self) -> DataSource {
        DataSource::FootballDataApi
    }

    fn fetch_season(&self, year: u16) -> Result<LoadedData> {
        let url = self.season_url(year);
        let body = self.fetch_json(&url)?;
        self.parse_matches(&body)
    }
}

#[derive(Debug, Deserialize)]
struct MatchesResponse {
    matches: Vec<ApiMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMatch {
    #[serde(default)]
    id: i64,
    utc_date: String,
    status: String,
    matchday: Option<u16>,
    #[serde(default)]
    venue: Option<String>,
    home_team: ApiTeam,
    away_team: ApiTeam,
    score: ApiScore,
    #[serde(default)]
    competition: Option<ApiCompetition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTeam {
    name: Option<String>,
    short_name: Option<String>,
}

impl ApiTeam {
    fn display_name(&self) -> Option<String> {
        self.short_name.clone().or_else(|| self.name.clone())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiScore {
    full_time: ApiGoals,
    #[serde(default)]
    half_time: ApiGoals,
}

#[derive(Debug, Default, Deserialize)]
struct ApiGoals {
    home: Option<u8>,
    away: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct ApiCompetition {
    code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "matches": [
            {
                "id": 1,
                "utcDate": "2024-08-16T19:00:00Z",
                "status": "FINISHED",
                "matchday": 1,
                "homeTeam": {"id": 66, "name": "Manchester United FC", "shortName": "Man United"},
                "awayTeam": {"id": 63, "name": "Fulham FC", "shortName": "Fulham"},
                "score": {"winner": "HOME_TEAM", "fullTime": {"home": 1, "away": 0}, "halfTime": {"home": 0, "away": 0}},
                "competition": {"code": "PL"}
            },
            {
                "id": 2,
                "utcDate": "2025-05-25T15:00:00Z",
                "status": "TIMED",
                "matchday": 38,
                "homeTeam": {"id": 63, "name": "Fulham FC", "shortName": "Fulham"},
                "awayTeam": {"id": 66, "name": "Manchester United FC", "shortName": "Man United"},
                "score": {"winner": null, "fullTime": {"home": null, "away": null}, "halfTime": {"home": null, "away": null}}
            },
            {
                "id": 3,
                "utcDate": "2024-09-01T12:00:00Z",
                "status": "POSTPONED",
                "homeTeam": {"name": "Chelsea FC"},
                "awayTeam": {"name": "Arsenal FC"},
                "score": {"fullTime": {"home": null, "away": null}}
            }
        ]
    }"#;

    #[test]
    fn test_parse_matches_by_status() {
        let api = FootballDataApi::new("PL", Some("token".to_string()));
        let data = api.parse_matches(SAMPLE).unwrap();

        assert_eq!(data.matches.len(), 1);
        assert_eq!(data.fixtures.len(), 1);

        let m = &data.matches[0];
        assert_eq!(m.home_team, "Man United");
        assert_eq!((m.home_goals, m.away_goals), (1, 0));
        assert_eq!(m.half_time, Some((0, 0)));
        assert_eq!(m.matchday, Some(1));
        assert_eq!(m.competition.as_deref(), Some("PL"));

        let f = &data.fixtures[0];
        assert_eq!(f.date, NaiveDate::from_ymd_opt(2025, 5, 25).unwrap());
        assert_eq!(f.competition.as_deref(), Some("PL"));
    }

    #[test]
    fn test_season_url() {
        let api = FootballDataApi::new("SA", None);
        assert_eq!(
            api.season_url(2023),
            "https://api.football-data.org/v4/competitions/SA/matches?season=2023"
        );
    }

    #[test]
    fn test_offline_fetch_reads_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path());
        let api = FootballDataApi::new("PL", None).with_cache(cache.clone().offline_only(true));

        assert!(api.fetch_season(2024).is_err());

        cache.store(&api.season_url(2024), "json", SAMPLE).unwrap();
        let data = api.fetch_season(2024).unwrap();
        assert_eq!(data.matches.len(), 1);
    }
}
