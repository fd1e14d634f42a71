//! Local file ingestion (CSV and JSON match lists)
//!
//! CSV files follow the football-data.co.uk column layout; JSON files are an
//! array of match objects. Rows without goals are treated as fixtures.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use super::raw::{LoadedData, RawFixture, RawMatch};
use crate::{DataSource, FootballError, Result};

/// Reads match history from disk
#[derive(Debug, Clone, Default)]
pub struct DataLoader {
    /// Competition label applied when a file has no division column
    default_competition: Option<String>,
}

impl DataLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_competition(mut self, competition: &str) -> Self {
        self.default_competition = Some(competition.to_string());
        self
    }

    /// Load a file by extension, or every csv/json file in a directory
    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<LoadedData> {
        let path = path.as_ref();

        if path.is_dir() {
            let mut entries: Vec<_> = std::fs::read_dir(path)?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| matches!(extension(p).as_deref(), Some("csv") | Some("json")))
                .collect();
            entries.sort();

            let mut data = LoadedData::default();
            for file in entries {
                log::info!("Loading {}", file.display());
                match self.load_path(&file) {
                    Ok(loaded) => {
                        log::info!(
                            "  {} matches, {} fixtures",
                            loaded.matches.len(),
                            loaded.fixtures.len()
                        );
                        data.extend(loaded);
                    }
                    Err(e) => log::warn!("  Failed: {}", e),
                }
            }
            return Ok(data);
        }

        match extension(path).as_deref() {
            Some("csv") => self.load_csv(path),
            Some("json") => self.load_json(path),
            other => Err(FootballError::Parse(format!(
                "Unsupported file type {:?} for {}",
                other,
                path.display()
            ))),
        }
    }

    /// Load a football-data.co.uk style CSV file
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<LoadedData> {
        let file = std::fs::File::open(path.as_ref())?;
        self.read_csv(file)
    }

    /// Parse CSV content from any reader
    pub fn read_csv<R: std::io::Read>(&self, reader: R) -> Result<LoadedData> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let columns = CsvColumns::from_headers(&headers)?;

        let mut data = LoadedData::default();
        let mut skipped = 0usize;

        for (line, row) in reader.records().enumerate() {
            let row = row?;
            match columns.parse_row(&row, self.default_competition.as_deref()) {
                Some(ParsedRow::Match(m)) => data.matches.push(m),
                Some(ParsedRow::Fixture(f)) => data.fixtures.push(f),
                None => {
                    skipped += 1;
                    log::debug!("Skipping CSV row {}: {:?}", line + 2, row);
                }
            }
        }

        if skipped > 0 {
            log::warn!("Skipped {} CSV rows with missing date or teams", skipped);
        }

        Ok(data)
    }

    /// Load a JSON array of match objects
    pub fn load_json<P: AsRef<Path>>(&self, path: P) -> Result<LoadedData> {
        let content = std::fs::read_to_string(path.as_ref())?;
        self.parse_json(&content)
    }

    pub fn parse_json(&self, content: &str) -> Result<LoadedData> {
        let rows: Vec<JsonMatch> = serde_json::from_str(content)?;
        let mut data = LoadedData::default();

        for row in rows {
            let Some(date) = parse_date(&row.date) else {
                log::warn!("Skipping JSON match with bad date {:?}", row.date);
                continue;
            };
            let competition = row
                .competition
                .clone()
                .or_else(|| self.default_competition.clone());

            match (row.home_goals, row.away_goals) {
                (Some(home_goals), Some(away_goals)) => data.matches.push(RawMatch {
                    date,
                    home_team: row.home_team,
                    away_team: row.away_team,
                    home_goals,
                    away_goals,
                    half_time: row.ht_home_goals.zip(row.ht_away_goals),
                    home_shots: row.home_shots,
                    away_shots: row.away_shots,
                    home_shots_on_target: row.home_shots_on_target,
                    away_shots_on_target: row.away_shots_on_target,
                    competition,
                    matchday: row.matchday,
                    venue: row.venue,
                    source: DataSource::Json,
                }),
                _ => data.fixtures.push(RawFixture {
                    date,
                    home_team: row.home_team,
                    away_team: row.away_team,
                    competition,
                    matchday: row.matchday,
                    venue: row.venue,
                }),
            }
        }

        Ok(data)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// JSON input row
#[derive(Debug, Deserialize)]
struct JsonMatch {
    date: String,
    home_team: String,
    away_team: String,
    home_goals: Option<u8>,
    away_goals: Option<u8>,
    ht_home_goals: Option<u8>,
    ht_away_goals: Option<u8>,
    home_shots: Option<u8>,
    away_shots: Option<u8>,
    home_shots_on_target: Option<u8>,
    away_shots_on_target: Option<u8>,
    competition: Option<String>,
    matchday: Option<u16>,
    venue: Option<String>,
}

enum ParsedRow {
    Match(RawMatch),
    Fixture(RawFixture),
}

/// Header positions of the recognised CSV columns
struct CsvColumns {
    date: usize,
    home: usize,
    away: usize,
    home_goals: Option<usize>,
    away_goals: Option<usize>,
    ht_home: Option<usize>,
    ht_away: Option<usize>,
    home_shots: Option<usize>,
    away_shots: Option<usize>,
    home_sot: Option<usize>,
    away_sot: Option<usize>,
    division: Option<usize>,
    venue: Option<usize>,
}

impl CsvColumns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim_start_matches('\u{feff}').to_string(), i))
            .collect();

        let find = |names: &[&str]| names.iter().find_map(|n| index.get(*n).copied());
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| {
                FootballError::Parse(format!("CSV is missing a {} column", names.join("/")))
            })
        };

        Ok(CsvColumns {
            date: require(&["Date"])?,
            home: require(&["HomeTeam", "Home"])?,
            away: require(&["AwayTeam", "Away"])?,
            home_goals: find(&["FTHG", "HG"]),
            away_goals: find(&["FTAG", "AG"]),
            ht_home: find(&["HTHG"]),
            ht_away: find(&["HTAG"]),
            home_shots: find(&["HS"]),
            away_shots: find(&["AS"]),
            home_sot: find(&["HST"]),
            away_sot: find(&["AST"]),
            division: find(&["Div", "League"]),
            venue: find(&["Venue"]),
        })
    }

    fn parse_row(&self, row: &csv::StringRecord, default_competition: Option<&str>) -> Option<ParsedRow> {
        let text = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        let number = |idx: Option<usize>| text(idx).and_then(|s| s.parse::<u8>().ok());

        let date = parse_date(text(Some(self.date))?)?;
        let home_team = text(Some(self.home))?.to_string();
        let away_team = text(Some(self.away))?.to_string();
        let competition = text(self.division)
            .map(str::to_string)
            .or_else(|| default_competition.map(str::to_string));
        let venue = text(self.venue).map(str::to_string);

        match (number(self.home_goals), number(self.away_goals)) {
            (Some(home_goals), Some(away_goals)) => Some(ParsedRow::Match(RawMatch {
                date,
                home_team,
                away_team,
                home_goals,
                away_goals,
                half_time: number(self.ht_home).zip(number(self.ht_away)),
                home_shots: number(self.home_shots),
                away_shots: number(self.away_shots),
                home_shots_on_target: number(self.home_sot),
                away_shots_on_target: number(self.away_sot),
                competition,
                matchday: None,
                venue,
                source: DataSource::Csv,
            })),
            _ => Some(ParsedRow::Fixture(RawFixture {
                date,
                home_team,
                away_team,
                competition,
                matchday: None,
                venue,
            })),
        }
    }
}

/// Parse `dd/mm/yy`, `dd/mm/yyyy` or ISO `yyyy-mm-dd`
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.contains('-') {
        // Allow ISO timestamps such as 2024-03-02T15:00:00Z
        let day = s.get(..10).unwrap_or(s);
        return NaiveDate::parse_from_str(day, "%Y-%m-%d").ok();
    }

    let year_part = s.rsplit('/').next()?;
    let format = if year_part.len() == 2 {
        "%d/%m/%y"
    } else {
        "%d/%m/%Y"
    };
    NaiveDate::parse_from_str(s, format).ok()
}
