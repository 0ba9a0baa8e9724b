//! Market-level synthesis across all enriched competitors.

use std::sync::Arc;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use rivalscope_shared::{CompetitorProfile, PricingTier, Result};

use crate::ai::{LanguageModel, generate_object, with_timeout};

const SYSTEM_PROMPT: &str =
    "You are a market strategist. Respond only with the requested JSON fields.";

/// Structured output of the synthesis call.
///
/// `positioning` is requested and kept here but is not part of an
/// [`Analysis`](rivalscope_shared::Analysis).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarketInsights {
    /// Overall market analysis summary.
    pub summary: String,
    /// Market opportunities identified.
    pub opportunities: Vec<String>,
    /// Competitive threats identified.
    pub threats: Vec<String>,
    /// Strategic recommendations.
    pub recommendations: Vec<String>,
    /// Suggested market positioning.
    pub positioning: String,
}

/// The slice of a profile the synthesis prompt sees.
///
/// Design style and calls-to-action are left out.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompetitorDigest<'a> {
    name: &'a str,
    description: &'a str,
    pricing: &'a [PricingTier],
    features: &'a [String],
    marketing_tone: &'a str,
}

impl<'a> From<&'a CompetitorProfile> for CompetitorDigest<'a> {
    fn from(p: &'a CompetitorProfile) -> Self {
        Self {
            name: &p.name,
            description: &p.description,
            pricing: &p.pricing,
            features: &p.features,
            marketing_tone: &p.marketing_tone,
        }
    }
}

/// Produces [`MarketInsights`] from a set of competitor profiles.
#[derive(Clone)]
pub struct Synthesizer {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// One structured completion over all profiles. Errors propagate unchanged.
    #[instrument(skip_all, fields(competitors = profiles.len(), model = self.model.model()))]
    pub async fn synthesize(&self, profiles: &[CompetitorProfile]) -> Result<MarketInsights> {
        let prompt = build_synthesis_prompt(profiles);
        let insights: MarketInsights = with_timeout(
            self.timeout,
            "synthesis",
            generate_object(self.model.as_ref(), SYSTEM_PROMPT, &prompt),
        )
        .await?;

        info!(
            opportunities = insights.opportunities.len(),
            threats = insights.threats.len(),
            recommendations = insights.recommendations.len(),
            "synthesis complete"
        );
        Ok(insights)
    }
}

/// Prompt embedding the pretty-printed competitor digests.
pub fn build_synthesis_prompt(profiles: &[CompetitorProfile]) -> String {
    let digests: Vec<CompetitorDigest<'_>> = profiles.iter().map(CompetitorDigest::from).collect();
    let competitors_json = serde_json::to_string_pretty(&digests).unwrap_or_default();

    format!(
        "Analyze the following competitor data and provide strategic insights:\n\
         \n\
         {competitors_json}\n\
         \n\
         Please provide:\n\
         1. A comprehensive market analysis summary\n\
         2. Key opportunities in the market\n\
         3. Competitive threats to be aware of\n\
         4. Strategic recommendations for differentiation\n\
         5. Suggested market positioning\n\
         \n\
         Focus on actionable insights that would help a business compete effectively."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedModel, sample_insights};
    use chrono::Utc;
    use rivalscope_shared::{DesignStyle, RivalScopeError};

    fn profile(name: &str) -> CompetitorProfile {
        CompetitorProfile {
            id: format!("id-{name}"),
            url: format!("https://{name}.test"),
            name: name.into(),
            description: format!("{name} description"),
            pricing: vec![PricingTier {
                name: "Pro".into(),
                price: "$10/mo".into(),
                features: vec!["All features".into()],
                is_popular: Some(true),
            }],
            features: vec!["Reporting".into()],
            marketing_tone: "Playful".into(),
            design_style: DesignStyle {
                primary_colors: vec!["#ff00aa".into()],
                layout: "Grid".into(),
                imagery: "Illustrations".into(),
            },
            calls_to_action: vec!["Book a Demo".into()],
            created_at: Utc::now(),
            analysis_id: String::new(),
        }
    }

    #[test]
    fn prompt_includes_projection_only() {
        let prompt = build_synthesis_prompt(&[profile("acme")]);
        assert!(prompt.contains(r#""name": "acme""#));
        assert!(prompt.contains(r#""marketingTone": "Playful""#));
        assert!(prompt.contains("$10/mo"));
        assert!(prompt.contains("Reporting"));
        assert!(!prompt.contains("#ff00aa"));
        assert!(!prompt.contains("Book a Demo"));
        assert!(!prompt.contains("https://acme.test"));
    }

    #[tokio::test]
    async fn synthesize_returns_all_fields() {
        let model = Arc::new(ScriptedModel::new());
        let synthesizer = Synthesizer::new(model.clone(), Duration::from_secs(5));

        let insights = synthesizer
            .synthesize(&[profile("acme"), profile("globex")])
            .await
            .unwrap();

        assert_eq!(insights, sample_insights());
        assert!(!insights.positioning.is_empty());
        assert_eq!(model.structured_calls(), 1);
        let prompt = model.last_prompt().unwrap_or_default();
        assert!(prompt.contains("globex"));
    }

    #[tokio::test]
    async fn synthesize_propagates_failure() {
        let model = Arc::new(ScriptedModel::new().fail_structured());
        let synthesizer = Synthesizer::new(model, Duration::from_secs(5));
        let err = synthesizer.synthesize(&[profile("acme")]).await.unwrap_err();
        assert!(matches!(err, RivalScopeError::Ai(_)));
    }

    #[tokio::test]
    async fn malformed_output_is_an_error() {
        let model = Arc::new(
            ScriptedModel::new().with_structured(serde_json::json!({ "summary": "only this" })),
        );
        let synthesizer = Synthesizer::new(model, Duration::from_secs(5));
        assert!(synthesizer.synthesize(&[profile("acme")]).await.is_err());
    }
}
