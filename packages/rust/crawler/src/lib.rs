//! Competitor-site fetching and heuristic profile extraction.
//!
//! This crate provides:
//! - [`extract`]: the [`ProfileExtractor`] strategy trait and the built-in
//!   [`HeuristicExtractor`]
//! - [`engine`]: the concurrent, failure-isolating [`Fetcher`]

pub mod engine;
pub mod extract;

pub use engine::{FetchSummary, Fetcher};
pub use extract::{
    DEFAULT_DESCRIPTION, DEFAULT_MARKETING_TONE, DEFAULT_NAME, HeuristicExtractor,
    ProfileExtractor,
};
