//! Scriptable language model for pipeline tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rivalscope_shared::{Result, RivalScopeError};

use crate::ai::LanguageModel;
use crate::synthesis::MarketInsights;

/// Insights returned by [`ScriptedModel`] unless overridden.
pub(crate) fn sample_insights() -> MarketInsights {
    MarketInsights {
        summary: "Two incumbents split the market.".into(),
        opportunities: vec!["Mobile-first teams".into()],
        threats: vec!["Price war".into()],
        recommendations: vec!["Lead with onboarding".into()],
        positioning: "The friendly alternative".into(),
    }
}

/// A deterministic [`LanguageModel`] that records its calls.
pub(crate) struct ScriptedModel {
    text: String,
    structured: serde_json::Value,
    fail_text_on: Option<String>,
    fail_structured: bool,
    delay: Option<Duration>,
    text_calls: AtomicUsize,
    structured_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub(crate) fn new() -> Self {
        Self {
            text: "A refined description.".into(),
            structured: serde_json::to_value(sample_insights()).unwrap(),
            fail_text_on: None,
            fail_structured: false,
            delay: None,
            text_calls: AtomicUsize::new(0),
            structured_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Text returned by every `generate_text` call.
    pub(crate) fn with_text(mut self, text: &str) -> Self {
        self.text = text.into();
        self
    }

    /// JSON returned by every `generate_structured` call.
    pub(crate) fn with_structured(mut self, value: serde_json::Value) -> Self {
        self.structured = value;
        self
    }

    /// Fail text calls whose prompt contains `needle`.
    pub(crate) fn fail_text_on(mut self, needle: &str) -> Self {
        self.fail_text_on = Some(needle.into());
        self
    }

    /// Fail every structured call.
    pub(crate) fn fail_structured(mut self) -> Self {
        self.fail_structured = true;
        self
    }

    /// Sleep before answering any call.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn structured_calls(&self) -> usize {
        self.structured_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }

    fn record(&self, prompt: &str) {
        self.prompts.lock().unwrap().push(prompt.to_string());
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.record(prompt);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.fail_text_on {
            Some(needle) if prompt.contains(needle.as_str()) => {
                Err(RivalScopeError::Ai(format!("scripted failure for {needle}")))
            }
            _ => Ok(self.text.clone()),
        }
    }

    async fn generate_structured(
        &self,
        _system: &str,
        prompt: &str,
        _schema_name: &str,
        _schema: serde_json::Value,
    ) -> Result<serde_json::Value> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        self.record(prompt);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_structured {
            return Err(RivalScopeError::Ai("scripted structured failure".into()));
        }
        Ok(self.structured.clone())
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
