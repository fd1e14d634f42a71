//! Wikipedia scraper for league season pages
//!
//! Results and fixtures on football season pages are rendered with the
//! `footballbox` template: a date cell, home/score/away header cells and a
//! venue block. Boxes whose score cell holds "v" are upcoming fixtures.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{ResponseCache, Source};
use crate::data::raw::{LoadedData, RawFixture, RawMatch};
use crate::{DataSource, FootballError, Result};

static SCORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\d{1,2})\s*[–\-]\s*(\d{1,2})").unwrap());
static FOOTNOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap());
static LONG_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d{1,2})\s+(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{4})",
    )
    .unwrap()
});

/// Scraper for Wikipedia "{season} {league}" pages
pub struct WikipediaScraper {
    client: reqwest::blocking::Client,
    /// Page title suffix, e.g. "Premier_League" for "2023–24_Premier_League"
    league_page: String,
    team_aliases: HashMap<String, String>,
    cache: ResponseCache,
}

impl WikipediaScraper {
    pub fn new(league_page: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .user_agent("football-predictor/0.1")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        WikipediaScraper {
            client,
            league_page: league_page.replace(' ', "_"),
            team_aliases: HashMap::new(),
            cache: ResponseCache::disabled(),
        }
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = cache;
        self
    }

    /// Map an alternative spelling onto a canonical team name
    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.team_aliases
            .insert(alias.to_lowercase(), canonical.to_string());
        self
    }

    /// Season page URL; football seasons span two years ("2023–24")
    pub fn season_url(&self, year: u16) -> String {
        format!(
            "https://en.wikipedia.org/wiki/{}%E2%80%93{:02}_{}",
            year,
            (year + 1) % 100,
            self.league_page
        )
    }

    /// Parse a saved HTML page directly
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<LoadedData> {
        let html = std::fs::read_to_string(path.as_ref())?;
        self.parse_page(&html)
    }

    fn fetch_page(&self, url: &str) -> Result<String> {
        self.cache
            .get_or_fetch(url, "html", DataSource::Wikipedia, || {
                log::debug!("Fetching {}", url);
                let response = self.client.get(url).send()?;
                if !response.status().is_success() {
                    return Err(FootballError::Source {
                        data_source: DataSource::Wikipedia,
                        message: format!("HTTP {}: {}", response.status(), url),
                    });
                }
                Ok(response.text()?)
            })
    }

    /// Parse every footballbox on a page
    pub fn parse_page(&self, html: &str) -> Result<LoadedData> {
        let document = Html::parse_document(html);
        let mut data = LoadedData::default();

        let box_selector = Selector::parse("div.footballbox").unwrap();
        let date_selector = Selector::parse(".fdate").unwrap();
        let home_selector = Selector::parse(".fhome").unwrap();
        let score_selector = Selector::parse(".fscore").unwrap();
        let away_selector = Selector::parse(".faway").unwrap();
        let venue_selector = Selector::parse(".fright .location, .fright [itemprop='name']").unwrap();

        for fbox in document.select(&box_selector) {
            let date = fbox
                .select(&date_selector)
                .next()
                .and_then(|el| parse_box_date(&element_text(el)));
            let home = fbox
                .select(&home_selector)
                .next()
                .map(|el| self.normalize_team_name(&element_text(el)));
            let away = fbox
                .select(&away_selector)
                .next()
                .map(|el| self.normalize_team_name(&element_text(el)));
            let score_text = fbox
                .select(&score_selector)
                .next()
                .map(element_text)
                .unwrap_or_default();
            let venue = fbox
                .select(&venue_selector)
                .next()
                .map(element_text)
                .filter(|v| !v.is_empty());

            let (Some(date), Some(home_team), Some(away_team)) = (date, home, away) else {
                log::debug!("Skipping incomplete footballbox");
                continue;
            };
            if home_team.is_empty() || away_team.is_empty() {
                continue;
            }

            if let Some(caps) = SCORE.captures(&score_text) {
                let home_goals: u8 = caps[1].parse().unwrap_or(0);
                let away_goals: u8 = caps[2].parse().unwrap_or(0);
                let mut record = RawMatch::new(
                    date,
                    &home_team,
                    &away_team,
                    home_goals,
                    away_goals,
                    DataSource::Wikipedia,
                );
                record.venue = venue;
                data.matches.push(record);
            } else {
                data.fixtures.push(RawFixture {
                    date,
                    home_team,
                    away_team,
                    competition: None,
                    matchday: None,
                    venue,
                });
            }
        }

        data.matches
            .sort_by(|a, b| (a.date, &a.home_team).cmp(&(b.date, &b.home_team)));
        data.matches.dedup_by(|a, b| a.key() == b.key());

        Ok(data)
    }

    /// Strip footnote markers and apply aliases
    fn normalize_team_name(&self, name: &str) -> String {
        let cleaned = FOOTNOTE.replace_all(name, "");
        let cleaned = cleaned.trim();
        self.team_aliases
            .get(&cleaned.to_lowercase())
            .cloned()
            .unwrap_or_else(|| cleaned.to_string())
    }
}

impl Source for WikipediaScraper {
    fn source(&self) -> DataSource {
        DataSource::Wikipedia
    }

    fn fetch_season(&self, year: u16) -> Result<LoadedData> {
        let url = self.season_url(year);
        let html = self.fetch_page(&url)?;
        self.parse_page(&html)
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Dates appear as an ISO microformat span or as "16 August 2024"
fn parse_box_date(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = ISO_DATE.captures(text) {
        return NaiveDate::parse_from_str(&caps[0], "%Y-%m-%d").ok();
    }

    let caps = LONG_DATE.captures(text)?;
    NaiveDate::parse_from_str(&format!("{} {} {}", &caps[1], &caps[2], &caps[3]), "%d %B %Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
    <html><body>
      <div class="footballbox">
        <div class="fleft"><div class="fdate">16 August 2024<span class="bday dtstart">(2024-08-16)</span></div></div>
        <table class="fevent"><tr>
          <th class="fhome"><span>Manchester United</span></th>
          <th class="fscore">1–0</th>
          <th class="faway"><span>Fulham[a]</span></th>
        </tr></table>
        <div class="fright"><div><span class="location">Old Trafford</span>, Manchester</div></div>
      </div>
      <div class="footballbox">
        <div class="fleft"><div class="fdate">25 May 2025</div></div>
        <table class="fevent"><tr>
          <th class="fhome">Fulham</th>
          <th class="fscore">v</th>
          <th class="faway">Man Utd</th>
        </tr></table>
      </div>
      <div class="footballbox">
        <table class="fevent"><tr><th class="fhome">No date</th><th class="fscore">2–2</th><th class="faway">Here</th></tr></table>
      </div>
    </body></html>"#;

    #[test]
    fn test_parse_page_results_and_fixtures() {
        let scraper = WikipediaScraper::new("Premier League").with_alias("Man Utd", "Manchester United");
        let data = scraper.parse_page(PAGE).unwrap();

        assert_eq!(data.matches.len(), 1);
        let m = &data.matches[0];
        assert_eq!(m.date, NaiveDate::from_ymd_opt(2024, 8, 16).unwrap());
        assert_eq!(m.home_team, "Manchester United");
        assert_eq!(m.away_team, "Fulham");
        assert_eq!((m.home_goals, m.away_goals), (1, 0));
        assert_eq!(m.venue.as_deref(), Some("Old Trafford"));

        assert_eq!(data.fixtures.len(), 1);
        assert_eq!(data.fixtures[0].away_team, "Manchester United");
    }

    #[test]
    fn test_season_url_spans_two_years() {
        let scraper = WikipediaScraper::new("Premier League");
        assert_eq!(
            scraper.season_url(2023),
            "https://en.wikipedia.org/wiki/2023%E2%80%9324_Premier_League"
        );
    }

    #[test]
    fn test_parse_box_date() {
        assert_eq!(
            parse_box_date("3 March 2024"),
            NaiveDate::from_ymd_opt(2024, 3, 3)
        );
        assert_eq!(parse_box_date("TBD"), None);
    }
}
