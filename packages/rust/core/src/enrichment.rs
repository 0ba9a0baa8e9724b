//! Per-competitor enrichment.
//!
//! Each extracted [`PartialProfile`] gets one text completion that rewrites
//! its description; every other missing field is filled with the extractor
//! defaults so the result is always a complete [`CompetitorProfile`].
//!
//! Failures are not handled here. A failed call propagates to the pipeline,
//! which decides whether the whole request falls back.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, instrument};

use rivalscope_crawler::{DEFAULT_DESCRIPTION, DEFAULT_MARKETING_TONE, DEFAULT_NAME};
use rivalscope_shared::{CompetitorProfile, PartialProfile, Result, new_id};

use crate::ai::{LanguageModel, with_timeout};

/// Enriches partial profiles with a language model.
#[derive(Clone)]
pub struct Enricher {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl Enricher {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Enrich one profile.
    ///
    /// The returned profile has a fresh id and timestamp and an empty
    /// `analysis_id`.
    #[instrument(skip_all, fields(url = partial.url.as_deref().unwrap_or_default()))]
    pub async fn enrich(&self, partial: PartialProfile) -> Result<CompetitorProfile> {
        let prompt = build_enrichment_prompt(&partial);
        let text = with_timeout(self.timeout, "enrichment", self.model.generate_text(&prompt))
            .await?;

        let description = match text.trim() {
            "" => partial
                .description
                .clone()
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            refined => refined.to_string(),
        };

        debug!(chars = description.len(), "description refined");
        Ok(complete_profile(partial, description))
    }

    /// Enrich every profile concurrently, all or nothing.
    ///
    /// Waits for every call to settle, then returns the profiles in input
    /// order, or the first error in input order if any call failed.
    #[instrument(skip_all, fields(profiles = partials.len(), model = self.model.model()))]
    pub async fn enrich_all(&self, partials: Vec<PartialProfile>) -> Result<Vec<CompetitorProfile>> {
        let results = join_all(partials.into_iter().map(|p| self.enrich(p))).await;
        let enriched = results.into_iter().collect::<Result<Vec<_>>>()?;
        info!(enriched = enriched.len(), "enrichment complete");
        Ok(enriched)
    }
}

/// Prompt asking for a refined description of one competitor.
pub fn build_enrichment_prompt(partial: &PartialProfile) -> String {
    let name = partial.name.as_deref().unwrap_or(DEFAULT_NAME);
    let description = partial.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION);
    let features = partial.features.as_deref().unwrap_or_default().join(", ");
    let ctas = partial.calls_to_action.as_deref().unwrap_or_default().join(", ");

    format!(
        "Analyze this competitor's website data and provide an enhanced description:\n\
         \n\
         Name: {name}\n\
         Description: {description}\n\
         Features: {features}\n\
         CTAs: {ctas}\n\
         \n\
         Provide a concise but comprehensive description of what this company does,\n\
         their target market, and their key value proposition."
    )
}

/// Fill every missing field with its default.
fn complete_profile(partial: PartialProfile, description: String) -> CompetitorProfile {
    CompetitorProfile {
        id: new_id(),
        url: partial.url.unwrap_or_default(),
        name: partial.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
        description,
        pricing: partial.pricing.unwrap_or_default(),
        features: partial.features.unwrap_or_default(),
        marketing_tone: partial
            .marketing_tone
            .unwrap_or_else(|| DEFAULT_MARKETING_TONE.to_string()),
        design_style: partial.design_style.unwrap_or_default(),
        calls_to_action: partial.calls_to_action.unwrap_or_default(),
        created_at: Utc::now(),
        analysis_id: String::new(),
    }
}
