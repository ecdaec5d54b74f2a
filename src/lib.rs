//! Scrape a public profile through mirror front-ends, extract posts from
//! drifting markup and keep an idempotent history of them.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod locate;
pub mod model;
pub mod patterns;
pub mod rest;
pub mod scrape;
pub mod store;

pub use error::ScrapeError;
pub use model::{GroupedView, PostRecord, ScrapeReport, ScrapeResponse};
