//! Data ingestion and storage
//!
//! File loaders, remote sources and SQLite database management.

pub mod database;
pub mod dataset;
pub mod loader;
pub mod raw;
pub mod sources;

pub use database::Database;
pub use dataset::FootballDataset;
pub use loader::DataLoader;
pub use raw::{LoadedData, RawFixture, RawMatch};
