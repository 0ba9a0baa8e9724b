//! Profile extraction from raw competitor HTML.
//!
//! Extractors are pure: the same document always yields the same
//! [`PartialProfile`], and a missing signal falls back to a fixed default
//! instead of failing. [`HeuristicExtractor`] is the built-in strategy; a
//! smarter pricing/feature parser can be swapped in behind
//! [`ProfileExtractor`] without touching the fetcher.

use std::sync::LazyLock;

use regex::Regex;
use rivalscope_shared::{DesignStyle, PartialProfile, PricingTier};
use scraper::{Html, Selector};

/// Name used when a page has no `<title>`.
pub const DEFAULT_NAME: &str = "Unknown Company";

/// Description used when a page has no meta description.
pub const DEFAULT_DESCRIPTION: &str = "No description available";

/// Tone assigned before any language-model pass.
pub const DEFAULT_MARKETING_TONE: &str = "Professional";

/// At most this many price tokens become pricing tiers.
const MAX_PRICING_TIERS: usize = 3;

/// At most this many calls-to-action are kept.
const MAX_CALLS_TO_ACTION: usize = 5;

/// Action phrases searched for, in priority order.
const CTA_PHRASES: [&str; 5] = ["Get Started", "Sign Up", "Try Free", "Contact Us", "Learn More"];

/// Feature list assigned to every site until enrichment supplies real content.
const PLACEHOLDER_FEATURES: [&str; 4] = [
    "Core functionality",
    "Customer support",
    "Analytics dashboard",
    "API access",
];

/// Feature list attached to each synthesized pricing tier.
const PLACEHOLDER_TIER_FEATURES: [&str; 3] = ["Feature 1", "Feature 2", "Feature 3"];

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Strategy for turning one HTML document into profile signals.
pub trait ProfileExtractor: Send + Sync {
    /// Extract signals from raw HTML. Never fails.
    fn extract(&self, html: &str) -> PartialProfile;

    /// Human-readable extractor name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// HeuristicExtractor
// ---------------------------------------------------------------------------

/// Pattern-based extractor: title/meta lookups plus fixed vocabularies.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicExtractor;

impl ProfileExtractor for HeuristicExtractor {
    fn extract(&self, html: &str) -> PartialProfile {
        let doc = Html::parse_document(html);

        PartialProfile {
            url: None,
            name: Some(extract_title(&doc)),
            description: Some(extract_description(&doc)),
            pricing: Some(extract_pricing(html)),
            features: Some(PLACEHOLDER_FEATURES.iter().map(|f| f.to_string()).collect()),
            calls_to_action: Some(extract_calls_to_action(html)),
            marketing_tone: Some(DEFAULT_MARKETING_TONE.to_string()),
            design_style: Some(DesignStyle::default()),
        }
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// First `<title>` text, trimmed. The default applies only when no title element exists.
fn extract_title(doc: &Html) -> String {
    let title_sel = Selector::parse("title").unwrap();
    doc.select(&title_sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_else(|| DEFAULT_NAME.to_string())
}

/// `content` of the first `<meta name="description">` (name matched case-insensitively).
fn extract_description(doc: &Html) -> String {
    let meta_sel = Selector::parse("meta[name][content]").unwrap();
    doc.select(&meta_sel)
        .filter(|el| {
            el.value()
                .attr("name")
                .is_some_and(|n| n.eq_ignore_ascii_case("description"))
        })
        .filter_map(|el| el.value().attr("content"))
        .find(|c| !c.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string())
}

/// One placeholder tier per monetary token, first three in document order.
fn extract_pricing(html: &str) -> Vec<PricingTier> {
    static PRICE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[$€£][0-9]+(?:\.[0-9]{2})?").expect("valid regex"));

    PRICE_RE
        .find_iter(html)
        .take(MAX_PRICING_TIERS)
        .enumerate()
        .map(|(i, m)| PricingTier {
            name: format!("Plan {}", i + 1),
            price: m.as_str().to_string(),
            features: PLACEHOLDER_TIER_FEATURES
                .iter()
                .map(|f| f.to_string())
                .collect(),
            is_popular: None,
        })
        .collect()
}

/// Case-insensitive phrase matches, deduplicated on the literal text and capped.
///
/// Phrases are scanned in vocabulary order; within a phrase, matches keep
/// document order.
fn extract_calls_to_action(html: &str) -> Vec<String> {
    static CTA_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
        CTA_PHRASES
            .iter()
            .map(|p| Regex::new(&format!("(?i){}", regex::escape(p))).expect("valid regex"))
            .collect()
    });

    let mut ctas: Vec<String> = Vec::new();
    for re in CTA_RES.iter() {
        for m in re.find_iter(html) {
            if !ctas.iter().any(|c| c == m.as_str()) {
                ctas.push(m.as_str().to_string());
            }
        }
    }
    ctas.truncate(MAX_CALLS_TO_ACTION);
    ctas
}
