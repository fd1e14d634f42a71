//! Match and season simulation
//!
//! Monte Carlo score resampling, a minute-by-minute event engine, and
//! league-season projection.

pub mod events;
pub mod monte_carlo;
pub mod season;

pub use events::{EventKind, EventSimulationSummary, MatchEngine, MatchEvent, MatchTimeline, Side, TeamMatchStats, TeamProfile};
pub use monte_carlo::{MonteCarloSimulator, SimulationSummary};
pub use season::{
    load_fixtures_csv, load_standings_csv, standings_from_matches, SeasonFixture, SeasonSimulator, Standing, TeamOutlook,
};
