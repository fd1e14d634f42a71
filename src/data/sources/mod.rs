//! Remote match data sources
//!
//! Every source returns [`LoadedData`] with team names still unresolved, so
//! the results of several sources can be merged before touching the database.

pub mod football_data;
pub mod wikipedia;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};

use super::raw::{LoadedData, RawMatch};
use crate::{DataSource, FootballError, Result};

/// Trait for all remote match data sources
pub trait Source {
    /// The data source this fetcher reads from
    fn source(&self) -> DataSource;

    /// Fetch results and fixtures for the season starting in `year`
    fn fetch_season(&self, year: u16) -> Result<LoadedData>;

    /// Fetch several seasons, skipping the ones that fail
    fn fetch_seasons(&self, years: &[u16]) -> Result<LoadedData> {
        let mut data = LoadedData::default();
        for &year in years {
            log::info!("Fetching {} season from {}...", year, self.source());
            match self.fetch_season(year) {
                Ok(season) => {
                    log::info!(
                        "  Found {} matches, {} fixtures",
                        season.matches.len(),
                        season.fixtures.len()
                    );
                    data.extend(season);
                }
                Err(e) => log::warn!("Failed to fetch {} season: {}", year, e),
            }
        }
        Ok(data)
    }
}

/// Retry a fetch operation with exponential backoff
pub fn with_retry<T, F>(mut operation: F, max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut last_error = None;
    for attempt in 0..max_attempts.max(1) {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) => {
                log::warn!("Attempt {} failed: {}", attempt + 1, e);
                last_error = Some(e);
                if attempt + 1 < max_attempts {
                    let delay = std::time::Duration::from_millis(100 * 2u64.pow(attempt));
                    std::thread::sleep(delay);
                }
            }
        }
    }
    Err(last_error.unwrap_or_else(|| FootballError::Parse("no attempts made".to_string())))
}

/// Starting year of the season `date` falls in; seasons start in July
pub fn season_of(date: NaiveDate) -> Result<u16> {
    let year = if date.month() >= 7 { date.year() } else { date.year() - 1 };
    u16::try_from(year).map_err(|_| FootballError::Parse(format!("Season year {} out of range", year)))
}

/// First day of the season starting in `year`
pub fn season_start(year: u16) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year as i32, 7, 1)
        .ok_or_else(|| FootballError::Parse(format!("Invalid season {}", year)))
}

/// Merge data from multiple sources
///
/// Matches are keyed on (date, home, away). The API wins on scores; other
/// fields are backfilled from whichever source has them. Fixtures that
/// already have a result are dropped.
pub fn merge_sources(sources: Vec<LoadedData>) -> LoadedData {
    let mut merged: HashMap<_, RawMatch> = HashMap::new();
    let mut fixtures = Vec::new();

    for data in sources {
        for record in data.matches {
            match merged.get_mut(&record.key()) {
                Some(existing) => {
                    if record.source == DataSource::FootballDataApi {
                        existing.home_goals = record.home_goals;
                        existing.away_goals = record.away_goals;
                    }
                    if existing.half_time.is_none() {
                        existing.half_time = record.half_time;
                    }
                    if existing.home_shots.is_none() {
                        existing.home_shots = record.home_shots;
                        existing.home_shots_on_target = record.home_shots_on_target;
                    }
                    if existing.away_shots.is_none() {
                        existing.away_shots = record.away_shots;
                        existing.away_shots_on_target = record.away_shots_on_target;
                    }
                    if existing.venue.is_none() {
                        existing.venue = record.venue;
                    }
                    if existing.matchday.is_none() {
                        existing.matchday = record.matchday;
                    }
                    if existing.competition.is_none() {
                        existing.competition = record.competition;
                    }
                }
                None => {
                    merged.insert(record.key(), record);
                }
            }
        }
        fixtures.extend(data.fixtures);
    }

    let mut seen = HashSet::new();
    fixtures.retain(|f| {
        let key = (f.date, f.home_team.to_lowercase(), f.away_team.to_lowercase());
        !merged.contains_key(&key) && seen.insert(key)
    });
    fixtures.sort_by_key(|f| f.date);

    let mut matches: Vec<_> = merged.into_values().collect();
    matches.sort_by(|a, b| (a.date, &a.home_team).cmp(&(b.date, &b.home_team)));

    LoadedData { matches, fixtures }
}

/// On-disk response cache shared by the HTTP sources
#[derive(Debug, Clone, Default)]
pub struct ResponseCache {
    dir: Option<PathBuf>,
    /// If true, only the cache is consulted
    offline_only: bool,
}

impl ResponseCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        ResponseCache {
            dir: Some(dir.as_ref().to_path_buf()),
            offline_only: false,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn offline_only(mut self, offline: bool) -> Self {
        self.offline_only = offline;
        self
    }

    pub fn is_offline(&self) -> bool {
        self.offline_only
    }

    /// Cache file for a URL
    fn path_for(&self, url: &str, extension: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| {
            let filename: String = url
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
                .collect();
            dir.join(format!("{}.{}", filename, extension))
        })
    }

    pub fn load(&self, url: &str, extension: &str) -> Option<String> {
        let path = self.path_for(url, extension)?;
        if path.exists() {
            log::debug!("Loading from cache: {}", path.display());
            std::fs::read_to_string(&path).ok()
        } else {
            None
        }
    }

    pub fn store(&self, url: &str, extension: &str, body: &str) -> Result<()> {
        if let Some(path) = self.path_for(url, extension) {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, body)?;
            log::debug!("Saved to cache: {}", path.display());
        }
        Ok(())
    }

    /// Cached body, or the result of `fetch` (stored on success)
    pub fn get_or_fetch<F>(
        &self,
        url: &str,
        extension: &str,
        data_source: DataSource,
        fetch: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Result<String>,
    {
        if let Some(body) = self.load(url, extension) {
            return Ok(body);
        }
        if self.offline_only {
            return Err(FootballError::Source {
                data_source,
                message: format!("No cached data for {} (offline mode)", url),
            });
        }

        let body = fetch()?;
        if let Err(e) = self.store(url, extension, &body) {
            log::warn!("Failed to cache {}: {}", url, e);
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::raw::RawFixture;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_merge_prefers_api_scores_and_backfills() {
        let mut wiki = RawMatch::new(date(2), "Arsenal", "Chelsea", 2, 2, DataSource::Wikipedia);
        wiki.venue = Some("Emirates Stadium".to_string());
        let mut api = RawMatch::new(date(2), "arsenal", "chelsea", 2, 1, DataSource::FootballDataApi);
        api.matchday = Some(27);

        let merged = merge_sources(vec![
            LoadedData {
                matches: vec![wiki],
                fixtures: vec![],
            },
            LoadedData {
                matches: vec![api],
                fixtures: vec![],
            },
        ]);

        assert_eq!(merged.matches.len(), 1);
        let m = &merged.matches[0];
        assert_eq!((m.home_goals, m.away_goals), (2, 1));
        assert_eq!(m.venue.as_deref(), Some("Emirates Stadium"));
        assert_eq!(m.matchday, Some(27));
    }

    #[test]
    fn test_merge_drops_played_fixtures() {
        let played = RawMatch::new(date(9), "Everton", "Fulham", 0, 0, DataSource::Csv);
        let fixture = |day| RawFixture {
            date: date(day),
            home_team: "Everton".to_string(),
            away_team: "Fulham".to_string(),
            competition: None,
            matchday: None,
            venue: None,
        };

        let merged = merge_sources(vec![LoadedData {
            matches: vec![played],
            fixtures: vec![fixture(9), fixture(16), fixture(16)],
        }]);

        assert_eq!(merged.fixtures.len(), 1);
        assert_eq!(merged.fixtures[0].date, date(16));
    }

    #[test]
    fn test_with_retry_returns_last_error() {
        let mut calls = 0;
        let result: Result<()> = with_retry(
            || {
                calls += 1;
                Err(FootballError::Parse(format!("failure {}", calls)))
            },
            2,
        );
        assert_eq!(calls, 2);
        assert!(matches!(result, Err(FootballError::Parse(msg)) if msg == "failure 2"));
    }

    #[test]
    fn test_offline_cache_miss_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path()).offline_only(true);
        let result = cache.get_or_fetch("https://example.org/x", "json", DataSource::Wikipedia, || {
            Ok("unreachable".to_string())
        });
        assert!(matches!(result, Err(FootballError::Source { .. })));

        cache.store("https://example.org/x", "json", "{}").unwrap();
        let hit = cache
            .get_or_fetch("https://example.org/x", "json", DataSource::Wikipedia, || {
                Ok("unreachable".to_string())
            })
            .unwrap();
        assert_eq!(hit, "{}");
    }

    #[test]
    fn test_season_of() {
        let ymd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(season_of(ymd(2024, 8, 10)).unwrap(), 2024);
        assert_eq!(season_of(ymd(2025, 3, 1)).unwrap(), 2024);
        assert_eq!(season_of(ymd(2025, 7, 1)).unwrap(), 2025);
        assert!(season_of(ymd(0, 3, 1)).is_err());
        assert_eq!(season_start(2024).unwrap(), ymd(2024, 7, 1));
    }
}
