//! Feature extraction
//!
//! Converts raw match history into model-ready features. Every feature for
//! a match is derived from strictly earlier matches.

pub mod builder;
pub mod elo;
pub mod fixture;
pub mod form;
pub mod head_to_head;
pub mod team_stats;
pub mod workload;

pub use builder::FeatureBuilder;
pub use elo::{EloConfig, EloRatings};
pub use fixture::FixtureFeatures;
pub use form::TeamForm;
pub use head_to_head::HeadToHead;
pub use team_stats::{LeagueTable, TeamStatistics};
