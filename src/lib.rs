//! Directory catalog core: listings, paid placements, moderated submissions,
//! bulk ingestion and reporting over a SQLite store.

pub mod analytics;
pub mod category;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod ingest;
pub mod listing;
pub mod model;
pub mod priority;
pub mod settings;
pub mod submission;

pub use error::{CatalogError, Result};
pub use identity::Identity;
