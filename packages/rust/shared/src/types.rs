//! Core domain types for competitor analyses.
//!
//! All wire-facing types serialize with camelCase field names
//! (`callsToAction`, `createdAt`, ...) so an exported or returned analysis
//! can be fed straight back into `export`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, RivalScopeError};

/// Title used when the request does not supply one.
pub const DEFAULT_ANALYSIS_TITLE: &str = "Competitor Analysis";

/// Generate a fresh time-sortable identifier (UUID v7).
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

// ---------------------------------------------------------------------------
// PricingTier / DesignStyle
// ---------------------------------------------------------------------------

/// One plan on a competitor's pricing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingTier {
    /// Plan name (e.g. "Starter").
    pub name: String,
    /// Free-text price, currency-agnostic (e.g. "$29/month").
    pub price: String,
    /// Features listed for this plan.
    #[serde(default)]
    pub features: Vec<String>,
    /// Whether the plan is highlighted as the popular choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_popular: Option<bool>,
}

/// Visual presentation of a competitor site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignStyle {
    pub primary_colors: Vec<String>,
    pub layout: String,
    pub imagery: String,
}

impl Default for DesignStyle {
    fn default() -> Self {
        Self {
            primary_colors: vec!["#000000".into(), "#ffffff".into()],
            layout: "Modern".into(),
            imagery: "Professional".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// PartialProfile
// ---------------------------------------------------------------------------

/// Signals gathered about one site before enrichment.
///
/// Every field is optional: the extractor fills what it can and the enricher
/// substitutes defaults for the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Vec<PricingTier>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calls_to_action: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing_tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_style: Option<DesignStyle>,
}

// ---------------------------------------------------------------------------
// CompetitorProfile
// ---------------------------------------------------------------------------

/// A fully populated profile of one analyzed competitor site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorProfile {
    /// Unique within a run (UUID v7 for live results).
    pub id: String,
    /// Source URL (never empty).
    pub url: String,
    /// Display name.
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub pricing: Vec<PricingTier>,
    #[serde(default)]
    pub features: Vec<String>,
    pub marketing_tone: String,
    pub design_style: DesignStyle,
    #[serde(default)]
    pub calls_to_action: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Owning analysis; empty until the profile is attached to an [`Analysis`].
    #[serde(default)]
    pub analysis_id: String,
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// The aggregate result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: String,
    /// Owning user. Only the demo dataset sets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub competitors: Vec<CompetitorProfile>,
    pub summary: String,
    #[serde(default)]
    pub opportunities: Vec<String>,
    #[serde(default)]
    pub threats: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// AnalysisRequest
// ---------------------------------------------------------------------------

/// Input to the analysis pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Competitor URLs, in the order results should appear.
    #[serde(default)]
    pub urls: Vec<String>,
    /// Optional analysis title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl AnalysisRequest {
    pub fn new(urls: Vec<String>, title: Option<String>) -> Self {
        Self { urls, title }
    }

    /// Reject requests with no URLs to analyze.
    pub fn validate(&self) -> Result<()> {
        if self.urls.iter().all(|u| u.trim().is_empty()) {
            return Err(RivalScopeError::validation(
                "Please provide valid URLs to analyze",
            ));
        }
        Ok(())
    }

    /// The requested title, or `default` when absent or blank.
    pub fn resolved_title(&self, default: &str) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => default.to_string(),
        }
    }
}
