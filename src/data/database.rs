//! SQLite database management for football data

use crate::{
    DataSource, Fixture, FootballError, MatchRecord, Prediction, Result, Team, TeamId,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const MATCH_COLUMNS: &str = "date, home_team_id, away_team_id, home_goals, away_goals,
    ht_home_goals, ht_away_goals, home_shots, away_shots,
    home_shots_on_target, away_shots_on_target, competition, matchday, venue, source";

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                country TEXT,
                aliases TEXT DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                home_team_id INTEGER NOT NULL REFERENCES teams(id),
                away_team_id INTEGER NOT NULL REFERENCES teams(id),
                home_goals INTEGER NOT NULL,
                away_goals INTEGER NOT NULL,
                ht_home_goals INTEGER,
                ht_away_goals INTEGER,
                home_shots INTEGER,
                away_shots INTEGER,
                home_shots_on_target INTEGER,
                away_shots_on_target INTEGER,
                competition TEXT,
                matchday INTEGER,
                venue TEXT,
                source TEXT NOT NULL,
                UNIQUE(date, home_team_id, away_team_id)
            );

            CREATE TABLE IF NOT EXISTS fixtures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                home_team_id INTEGER NOT NULL REFERENCES teams(id),
                away_team_id INTEGER NOT NULL REFERENCES teams(id),
                competition TEXT,
                matchday INTEGER,
                venue TEXT,
                UNIQUE(date, home_team_id, away_team_id)
            );

            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                home_team_id INTEGER NOT NULL REFERENCES teams(id),
                away_team_id INTEGER NOT NULL REFERENCES teams(id),
                home_win_prob REAL NOT NULL,
                draw_prob REAL NOT NULL,
                away_win_prob REAL NOT NULL,
                expected_home_goals REAL,
                expected_away_goals REAL,
                actual_home_goals INTEGER,
                actual_away_goals INTEGER,
                model_version TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(date);
            CREATE INDEX IF NOT EXISTS idx_matches_teams ON matches(home_team_id, away_team_id);
            CREATE INDEX IF NOT EXISTS idx_fixtures_date ON fixtures(date);
            "#,
        )?;
        Ok(())
    }

    // ==================== Team Operations ====================

    /// Get or create a team by name
    pub fn get_or_create_team(&self, name: &str, country: Option<&str>) -> Result<Team> {
        if let Some(team) = self.find_team_by_name(name)? {
            return Ok(team);
        }

        self.conn.execute(
            "INSERT INTO teams (name, country, aliases) VALUES (?1, ?2, '[]')",
            params![name, country],
        )?;

        let id = TeamId(self.conn.last_insert_rowid());
        Ok(Team {
            id,
            name: name.to_string(),
            country: country.map(str::to_string),
            aliases: vec![],
        })
    }

    /// Find a team by name or alias
    pub fn find_team_by_name(&self, name: &str) -> Result<Option<Team>> {
        let name_lower = name.trim().to_lowercase();

        let team = self
            .conn
            .query_row(
                "SELECT id, name, country, aliases FROM teams WHERE LOWER(name) = ?1",
                params![&name_lower],
                Self::row_to_team,
            )
            .optional()?;

        if team.is_some() {
            return Ok(team);
        }

        // Fall back to aliases
        Ok(self
            .get_all_teams()?
            .into_iter()
            .find(|team| team.matches_name(&name_lower)))
    }

    /// Get team by ID
    pub fn get_team(&self, id: TeamId) -> Result<Team> {
        self.conn
            .query_row(
                "SELECT id, name, country, aliases FROM teams WHERE id = ?1",
                params![id.0],
                Self::row_to_team,
            )
            .optional()?
            .ok_or(FootballError::TeamNotFound(id))
    }

    /// Get all teams
    pub fn get_all_teams(&self) -> Result<Vec<Team>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, country, aliases FROM teams ORDER BY name")?;

        let teams = stmt
            .query_map([], Self::row_to_team)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(teams)
    }

    /// Add an alias for a team
    pub fn add_team_alias(&self, team_id: TeamId, alias: &str) -> Result<()> {
        let team = self.get_team(team_id)?;
        let mut aliases = team.aliases;
        if !aliases
            .iter()
            .any(|a| a.to_lowercase() == alias.to_lowercase())
        {
            aliases.push(alias.to_string());
            let aliases_json = serde_json::to_string(&aliases)?;
            self.conn.execute(
                "UPDATE teams SET aliases = ?1 WHERE id = ?2",
                params![aliases_json, team_id.0],
            )?;
        }
        Ok(())
    }

    fn row_to_team(row: &rusqlite::Row) -> rusqlite::Result<Team> {
        let aliases_json: Option<String> = row.get(3)?;
        let aliases: Vec<String> = aliases_json
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();
        Ok(Team {
            id: TeamId(row.get(0)?),
            name: row.get(1)?,
            country: row.get(2)?,
            aliases,
        })
    }

    // ==================== Match Operations ====================

    /// Insert or update a match record
    ///
    /// A stored fixture for the same teams and date is removed, since it has
    /// now been played.
    pub fn upsert_match(&self, record: &MatchRecord) -> Result<()> {
        let date = record.date.format("%Y-%m-%d").to_string();
        let source_str = format!("{:?}", record.source);
        self.conn.execute(
            r#"
            INSERT INTO matches (date, home_team_id, away_team_id, home_goals, away_goals,
                                 ht_home_goals, ht_away_goals, home_shots, away_shots,
                                 home_shots_on_target, away_shots_on_target,
                                 competition, matchday, venue, source)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(date, home_team_id, away_team_id) DO UPDATE SET
                home_goals = excluded.home_goals,
                away_goals = excluded.away_goals,
                ht_home_goals = COALESCE(excluded.ht_home_goals, ht_home_goals),
                ht_away_goals = COALESCE(excluded.ht_away_goals, ht_away_goals),
                home_shots = COALESCE(excluded.home_shots, home_shots),
                away_shots = COALESCE(excluded.away_shots, away_shots),
                home_shots_on_target = COALESCE(excluded.home_shots_on_target, home_shots_on_target),
                away_shots_on_target = COALESCE(excluded.away_shots_on_target, away_shots_on_target),
                competition = COALESCE(excluded.competition, competition),
                matchday = COALESCE(excluded.matchday, matchday),
                venue = COALESCE(excluded.venue, venue)
            "#,
            params![
                date,
                record.home_team.0,
                record.away_team.0,
                record.home_goals,
                record.away_goals,
                record.half_time.map(|(h, _)| h),
                record.half_time.map(|(_, a)| a),
                record.home_shots,
                record.away_shots,
                record.home_shots_on_target,
                record.away_shots_on_target,
                record.competition,
                record.matchday,
                record.venue,
                source_str,
            ],
        )?;

        self.conn.execute(
            "DELETE FROM fixtures WHERE date = ?1 AND home_team_id = ?2 AND away_team_id = ?3",
            params![date, record.home_team.0, record.away_team.0],
        )?;
        Ok(())
    }

    /// Insert multiple match records
    pub fn upsert_matches(&self, records: &[MatchRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for record in records {
            self.upsert_match(record)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Get all matches in chronological order
    pub fn get_all_matches(&self) -> Result<Vec<MatchRecord>> {
        self.query_matches(
            &format!("SELECT {} FROM matches ORDER BY date, id", MATCH_COLUMNS),
            [],
        )
    }

    /// Get matches for a team
    pub fn get_team_matches(&self, team_id: TeamId) -> Result<Vec<MatchRecord>> {
        self.query_matches(
            &format!(
                "SELECT {} FROM matches
                 WHERE home_team_id = ?1 OR away_team_id = ?1
                 ORDER BY date, id",
                MATCH_COLUMNS
            ),
            params![team_id.0],
        )
    }

    /// Get recent matches for a team (up to limit), oldest first
    pub fn get_recent_team_matches(
        &self,
        team_id: TeamId,
        limit: usize,
    ) -> Result<Vec<MatchRecord>> {
        let mut matches = self.query_matches(
            &format!(
                "SELECT {} FROM matches
                 WHERE home_team_id = ?1 OR away_team_id = ?1
                 ORDER BY date DESC, id DESC
                 LIMIT ?2",
                MATCH_COLUMNS
            ),
            params![team_id.0, limit as i64],
        )?;
        matches.reverse();
        Ok(matches)
    }

    /// Get matches before a given date
    pub fn get_matches_before(&self, date: NaiveDate) -> Result<Vec<MatchRecord>> {
        self.query_matches(
            &format!(
                "SELECT {} FROM matches WHERE date < ?1 ORDER BY date, id",
                MATCH_COLUMNS
            ),
            params![date.format("%Y-%m-%d").to_string()],
        )
    }

    /// Get matches in date range (inclusive)
    pub fn get_matches_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MatchRecord>> {
        self.query_matches(
            &format!(
                "SELECT {} FROM matches WHERE date >= ?1 AND date <= ?2 ORDER BY date, id",
                MATCH_COLUMNS
            ),
            params![
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string()
            ],
        )
    }

    /// Most recent meetings between two teams (either venue), oldest first
    pub fn get_head_to_head(&self, a: TeamId, b: TeamId, limit: usize) -> Result<Vec<MatchRecord>> {
        let mut matches = self.query_matches(
            &format!(
                "SELECT {} FROM matches
                 WHERE (home_team_id = ?1 AND away_team_id = ?2)
                    OR (home_team_id = ?2 AND away_team_id = ?1)
                 ORDER BY date DESC, id DESC
                 LIMIT ?3",
                MATCH_COLUMNS
            ),
            params![a.0, b.0, limit as i64],
        )?;
        matches.reverse();
        Ok(matches)
    }

    fn query_matches<P: rusqlite::Params>(&self, query: &str, params: P) -> Result<Vec<MatchRecord>> {
        let mut stmt = self.conn.prepare(query)?;
        let matches = stmt
            .query_map(params, Self::row_to_match)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(matches)
    }

    fn row_to_match(row: &rusqlite::Row) -> rusqlite::Result<MatchRecord> {
        let date_str: String = row.get(0)?;
        let date = parse_stored_date(&date_str, 0)?;

        let ht_home: Option<u8> = row.get(5)?;
        let ht_away: Option<u8> = row.get(6)?;
        let source_str: String = row.get(14)?;

        Ok(MatchRecord {
            date,
            home_team: TeamId(row.get(1)?),
            away_team: TeamId(row.get(2)?),
            home_goals: row.get(3)?,
            away_goals: row.get(4)?,
            half_time: ht_home.zip(ht_away),
            home_shots: row.get(7)?,
            away_shots: row.get(8)?,
            home_shots_on_target: row.get(9)?,
            away_shots_on_target: row.get(10)?,
            competition: row.get(11)?,
            matchday: row.get(12)?,
            venue: row.get(13)?,
            source: DataSource::from_name(&source_str),
        })
    }

    // ==================== Fixture Operations ====================

    /// Insert or update an upcoming fixture
    pub fn upsert_fixture(&self, fixture: &Fixture) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO fixtures (date, home_team_id, away_team_id, competition, matchday, venue)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(date, home_team_id, away_team_id) DO UPDATE SET
                competition = COALESCE(excluded.competition, competition),
                matchday = COALESCE(excluded.matchday, matchday),
                venue = COALESCE(excluded.venue, venue)
            "#,
            params![
                fixture.date.format("%Y-%m-%d").to_string(),
                fixture.home_team.0,
                fixture.away_team.0,
                fixture.competition,
                fixture.matchday,
                fixture.venue,
            ],
        )?;
        Ok(())
    }

    pub fn upsert_fixtures(&self, fixtures: &[Fixture]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for fixture in fixtures {
            self.upsert_fixture(fixture)?;
        }
        tx.commit()?;
        Ok(fixtures.len())
    }

    /// Fixtures on or after `from`, soonest first
    pub fn get_upcoming_fixtures(&self, from: NaiveDate, limit: usize) -> Result<Vec<Fixture>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, home_team_id, away_team_id, competition, matchday, venue
             FROM fixtures
             WHERE date >= ?1
             ORDER BY date, id
             LIMIT ?2",
        )?;

        let fixtures = stmt
            .query_map(
                params![from.format("%Y-%m-%d").to_string(), limit as i64],
                |row| {
                    let date_str: String = row.get(0)?;
                    Ok(Fixture {
                        date: parse_stored_date(&date_str, 0)?,
                        home_team: TeamId(row.get(1)?),
                        away_team: TeamId(row.get(2)?),
                        competition: row.get(3)?,
                        matchday: row.get(4)?,
                        venue: row.get(5)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(fixtures)
    }

    // ==================== Prediction Log ====================

    /// Store an issued prediction for later evaluation
    pub fn record_prediction(&self, prediction: &Prediction, model_version: &str) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO predictions (home_team_id, away_team_id, home_win_prob, draw_prob,
                                     away_win_prob, expected_home_goals, expected_away_goals,
                                     model_version)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                prediction.home_team.0,
                prediction.away_team.0,
                prediction.probs.home_win as f64,
                prediction.probs.draw as f64,
                prediction.probs.away_win as f64,
                prediction.expected_home_goals as f64,
                prediction.expected_away_goals as f64,
                model_version,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let team_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM teams", [], |row| row.get(0))?;

        let match_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))?;

        let fixture_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM fixtures", [], |row| row.get(0))?;

        let (min_date, max_date): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(date), MAX(date) FROM matches",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(DatabaseStats {
            team_count: team_count as usize,
            match_count: match_count as usize,
            fixture_count: fixture_count as usize,
            earliest_match: min_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            latest_match: max_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }
}

fn parse_stored_date(value: &str, column: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub team_count: usize,
    pub match_count: usize,
    pub fixture_count: usize,
    pub earliest_match: Option<NaiveDate>,
    pub latest_match: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.team_count, 0);
        assert_eq!(stats.match_count, 0);
        assert!(stats.earliest_match.is_none());
    }

    #[test]
    fn test_create_team_and_alias() {
        let db = Database::in_memory().unwrap();
        let team = db.get_or_create_team("Arsenal", Some("England")).unwrap();
        assert_eq!(team.name, "Arsenal");

        let again = db.get_or_create_team("arsenal", None).unwrap();
        assert_eq!(team.id, again.id);

        db.add_team_alias(team.id, "Arsenal FC").unwrap();
        let by_alias = db.find_team_by_name("ARSENAL FC").unwrap().unwrap();
        assert_eq!(by_alias.id, team.id);
        assert!(db.find_team_by_name("Chelsea").unwrap().is_none());
    }

    #[test]
    fn test_upsert_match_backfills_and_clears_fixture() {
        let db = Database::in_memory().unwrap();
        let home = db.get_or_create_team("Leeds", None).unwrap();
        let away = db.get_or_create_team("Hull", None).unwrap();

        db.upsert_fixture(&Fixture {
            date: date(2024, 3, 1),
            home_team: home.id,
            away_team: away.id,
            competition: Some("ELC".to_string()),
            matchday: Some(30),
            venue: None,
        })
        .unwrap();
        assert_eq!(db.get_stats().unwrap().fixture_count, 1);

        let mut record = MatchRecord::new(date(2024, 3, 1), home.id, away.id, 2, 0);
        db.upsert_match(&record).unwrap();
        assert_eq!(db.get_stats().unwrap().fixture_count, 0);

        record.home_shots = Some(14);
        record.half_time = Some((1, 0));
        db.upsert_match(&record).unwrap();

        let matches = db.get_all_matches().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].home_shots, Some(14));
        assert_eq!(matches[0].half_time, Some((1, 0)));
    }

    #[test]
    fn test_recent_and_head_to_head_are_chronological() {
        let db = Database::in_memory().unwrap();
        let a = db.get_or_create_team("A", None).unwrap().id;
        let b = db.get_or_create_team("B", None).unwrap().id;
        let c = db.get_or_create_team("C", None).unwrap().id;

        let records = vec![
            MatchRecord::new(date(2024, 1, 6), a, b, 1, 0),
            MatchRecord::new(date(2024, 1, 13), c, a, 2, 2),
            MatchRecord::new(date(2024, 1, 20), b, a, 0, 3),
            MatchRecord::new(date(2024, 1, 27), a, c, 1, 1),
        ];
        assert_eq!(db.upsert_matches(&records).unwrap(), 4);

        let recent = db.get_recent_team_matches(a, 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].date < recent[1].date);
        assert_eq!(recent[1].date, date(2024, 1, 27));

        let h2h = db.get_head_to_head(a, b, 10).unwrap();
        assert_eq!(h2h.len(), 2);
        assert_eq!(h2h[0].date, date(2024, 1, 6));

        let before = db.get_matches_before(date(2024, 1, 20)).unwrap();
        assert_eq!(before.len(), 2);
    }

    #[test]
    fn test_record_prediction() {
        let db = Database::in_memory().unwrap();
        let a = db.get_or_create_team("A", None).unwrap().id;
        let b = db.get_or_create_team("B", None).unwrap().id;
        let prediction = Prediction {
            home_team: a,
            away_team: b,
            probs: crate::OutcomeProbs::new(0.5, 0.3, 0.2),
            expected_home_goals: 1.6,
            expected_away_goals: 0.9,
            most_likely_score: (1, 0),
            confidence: crate::ConfidenceLevel::High,
        };
        let id = db.record_prediction(&prediction, "test").unwrap();
        assert!(id > 0);
    }
}
