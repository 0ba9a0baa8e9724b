//! Shared types, error model, and configuration for RivalScope.
//!
//! This crate is the foundation depended on by all other RivalScope crates.
//! It provides:
//! - [`RivalScopeError`]: the unified error type
//! - Domain types ([`CompetitorProfile`], [`PricingTier`], [`Analysis`], [`PartialProfile`])
//! - Configuration ([`AppConfig`], [`FetchConfig`], [`AiAvailability`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AiAvailability, AppConfig, DefaultsConfig, FetchConfig, OpenAiConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{Result, RivalScopeError};
pub use types::{
    Analysis, AnalysisRequest, CompetitorProfile, DEFAULT_ANALYSIS_TITLE, DesignStyle,
    PartialProfile, PricingTier, new_id,
};
