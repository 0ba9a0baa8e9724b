//! Core pipeline orchestration and domain logic for RivalScope.
//!
//! This crate ties together fetching, AI enrichment, and market synthesis
//! into the end-to-end `analyze` workflow, with a fixed demo analysis as the
//! fallback whenever the language model is unavailable.

pub mod ai;
pub mod demo;
pub mod enrichment;
pub mod pipeline;
pub mod synthesis;

#[cfg(test)]
mod testing;

pub use ai::{LanguageModel, OpenAiClient, generate_object, strict_schema};
pub use demo::{DemoReason, demo_analysis, demo_dataset};
pub use enrichment::Enricher;
pub use pipeline::{
    AiBackend, AnalysisOutcome, Pipeline, PipelineConfig, PipelineStage, ProgressReporter,
    SilentProgress,
};
pub use synthesis::{MarketInsights, Synthesizer};
