//! End-to-end `analyze` pipeline: URLs → fetch → enrich → synthesize → Analysis.
//!
//! The pipeline never surfaces an AI failure to its caller. A missing
//! credential short-circuits to the demo dataset before anything is fetched,
//! and a failed enrichment or synthesis call discards the whole batch in
//! favour of the demo dataset. The only error `run` returns is a validation
//! error for a request without URLs.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, instrument, warn};

use rivalscope_crawler::Fetcher;
use rivalscope_shared::{
    AiAvailability, Analysis, AnalysisRequest, AppConfig, CompetitorProfile, FetchConfig,
    OpenAiConfig, Result, new_id,
};

use crate::ai::{LanguageModel, OpenAiClient};
use crate::demo::{DemoReason, demo_analysis};
use crate::enrichment::Enricher;
use crate::synthesis::{MarketInsights, Synthesizer};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Language model handed to the pipeline at construction.
#[derive(Clone)]
pub enum AiBackend {
    /// Calls go to this model.
    Available(Arc<dyn LanguageModel>),
    /// No credential; every request is answered with the demo dataset.
    Unconfigured { env_var: String },
}

impl AiBackend {
    /// Build the backend from a resolved credential.
    pub fn from_availability(
        availability: &AiAvailability,
        config: &OpenAiConfig,
        timeout: Duration,
    ) -> Result<Self> {
        match availability {
            AiAvailability::Configured { api_key } => {
                let client = OpenAiClient::new(api_key.as_str(), config, timeout)?;
                Ok(Self::Available(Arc::new(client)))
            }
            AiAvailability::Unconfigured { env_var } => Ok(Self::Unconfigured {
                env_var: env_var.clone(),
            }),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

impl fmt::Debug for AiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(model) => f.debug_tuple("Available").field(&model.model()).finish(),
            Self::Unconfigured { env_var } => f
                .debug_struct("Unconfigured")
                .field("env_var", env_var)
                .finish(),
        }
    }
}

/// Runtime configuration for [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Title used when the request has none.
    pub default_title: String,
    /// Fetcher settings.
    pub fetch: FetchConfig,
    /// Bound on each enrichment and synthesis call.
    pub ai_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            default_title: config.defaults.title.clone(),
            fetch: FetchConfig::from(config),
            ai_timeout: Duration::from_secs(config.defaults.enrich_timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Stages and progress
// ---------------------------------------------------------------------------

/// Pipeline state, reported to [`ProgressReporter::phase`] on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Fetching,
    Enriching,
    Synthesizing,
    DemoFallback,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "Idle",
            Self::Fetching => "Fetching competitor sites",
            Self::Enriching => "Enriching competitor profiles",
            Self::Synthesizing => "Synthesizing market insights",
            Self::DemoFallback => "Preparing demo analysis",
            Self::Done => "Done",
        };
        f.write_str(label)
    }
}

/// Which terminal path a run took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Live,
    Demo(DemoReason),
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new stage.
    fn phase(&self, stage: PipelineStage);
    /// Called once the analysis is ready.
    fn done(&self, analysis: &Analysis, outcome: AnalysisOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _stage: PipelineStage) {}
    fn done(&self, _analysis: &Analysis, _outcome: AnalysisOutcome) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Competitor analysis orchestrator.
pub struct Pipeline {
    config: PipelineConfig,
    fetcher: Fetcher,
    backend: AiBackend,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, backend: AiBackend) -> Result<Self> {
        let fetcher = Fetcher::new(config.fetch.clone())?;
        Ok(Self {
            config,
            fetcher,
            backend,
        })
    }

    /// Analyze the requested competitors.
    pub async fn run(
        &self,
        request: &AnalysisRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<Analysis> {
        self.run_with_outcome(request, progress)
            .await
            .map(|(analysis, _)| analysis)
    }

    /// Like [`run`](Self::run), also reporting which path was taken.
    #[instrument(skip_all, fields(urls = request.urls.len(), ai = self.backend.is_available()))]
    pub async fn run_with_outcome(
        &self,
        request: &AnalysisRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<(Analysis, AnalysisOutcome)> {
        let start = Instant::now();
        progress.phase(PipelineStage::Idle);
        request.validate()?;

        let (analysis, outcome) = match &self.backend {
            AiBackend::Unconfigured { env_var } => {
                warn!(%env_var, "no API key configured, returning demo analysis");
                self.fall_back(DemoReason::MissingApiKey, progress)
            }
            AiBackend::Available(model) => match self.run_live(model, request, progress).await {
                Ok(analysis) => (analysis, AnalysisOutcome::Live),
                Err(e) => {
                    warn!(error = %e, "AI stage failed, returning demo analysis");
                    self.fall_back(DemoReason::AiUnavailable, progress)
                }
            },
        };

        progress.phase(PipelineStage::Done);
        progress.done(&analysis, outcome);

        info!(
            analysis_id = %analysis.id,
            competitors = analysis.competitors.len(),
            ?outcome,
            elapsed_ms = start.elapsed().as_millis(),
            "analysis complete"
        );

        Ok((analysis, outcome))
    }

    /// Fetch, enrich and synthesize. Any error here is an AI-stage error.
    async fn run_live(
        &self,
        model: &Arc<dyn LanguageModel>,
        request: &AnalysisRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<Analysis> {
        // --- Fetching ---
        progress.phase(PipelineStage::Fetching);
        let summary = self.fetcher.fetch_all_with_summary(&request.urls).await;
        info!(
            requested = summary.requested,
            fetched = summary.profiles.len(),
            failed = summary.errors.len(),
            "fetch stage complete"
        );

        // --- Enriching ---
        progress.phase(PipelineStage::Enriching);
        let enricher = Enricher::new(model.clone(), self.config.ai_timeout);
        let competitors = enricher.enrich_all(summary.profiles).await?;

        // --- Synthesizing ---
        progress.phase(PipelineStage::Synthesizing);
        let synthesizer = Synthesizer::new(model.clone(), self.config.ai_timeout);
        let insights = synthesizer.synthesize(&competitors).await?;

        Ok(assemble(
            request.resolved_title(&self.config.default_title),
            competitors,
            insights,
        ))
    }

    fn fall_back(
        &self,
        reason: DemoReason,
        progress: &dyn ProgressReporter,
    ) -> (Analysis, AnalysisOutcome) {
        progress.phase(PipelineStage::DemoFallback);
        (demo_analysis(reason), AnalysisOutcome::Demo(reason))
    }
}

/// Build the final analysis. `positioning` is not carried over.
fn assemble(
    title: String,
    mut competitors: Vec<CompetitorProfile>,
    insights: MarketInsights,
) -> Analysis {
    let id = new_id();
    for competitor in &mut competitors {
        competitor.analysis_id = id.clone();
    }

    Analysis {
        id,
        user_id: None,
        title,
        competitors,
        summary: insights.summary,
        opportunities: insights.opportunities,
        threats: insights.threats,
        recommendations: insights.recommendations,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_dataset;
    use crate::testing::{ScriptedModel, sample_insights};
    use rivalscope_shared::RivalScopeError;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><head><title>Acme Analytics</title>
        <meta name="description" content="Dashboards for teams"></head>
        <body><p>Pro $49</p><a>Get Started</a></body></html>"#;

    #[derive(Default)]
    struct RecordingProgress {
        stages: Mutex<Vec<PipelineStage>>,
        outcome: Mutex<Option<AnalysisOutcome>>,
    }

    impl RecordingProgress {
        fn stages(&self) -> Vec<PipelineStage> {
            self.stages.lock().unwrap().clone()
        }
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, stage: PipelineStage) {
            self.stages.lock().unwrap().push(stage);
        }
        fn done(&self, _analysis: &Analysis, outcome: AnalysisOutcome) {
            *self.outcome.lock().unwrap() = Some(outcome);
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            default_title: "Competitor Analysis".into(),
            fetch: FetchConfig {
                concurrency: 4,
                timeout_secs: 5,
                allow_private_hosts: true,
            },
            ai_timeout: Duration::from_secs(5),
        }
    }

    fn live(model: ScriptedModel) -> (Pipeline, Arc<ScriptedModel>) {
        let model = Arc::new(model);
        let pipeline = Pipeline::new(config(), AiBackend::Available(model.clone())).unwrap();
        (pipeline, model)
    }

    fn unconfigured() -> Pipeline {
        let backend = AiBackend::Unconfigured {
            env_var: "OPENAI_API_KEY".into(),
        };
        Pipeline::new(config(), backend).unwrap()
    }

    async fn mount_page(server: &MockServer, route: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    fn assert_matches_demo(analysis: &Analysis) {
        let demo = demo_dataset();
        let names: Vec<_> = analysis.competitors.iter().map(|c| &c.name).collect();
        let demo_names: Vec<_> = demo.competitors.iter().map(|c| &c.name).collect();
        assert_eq!(names, demo_names);
        assert_eq!(analysis.summary, demo.summary);
        assert_eq!(analysis.opportunities, demo.opportunities);
        assert_eq!(analysis.threats, demo.threats);
        assert_eq!(analysis.recommendations, demo.recommendations);
    }

    #[tokio::test]
    async fn end_to_end_single_competitor() {
        let server = MockServer::start().await;
        mount_page(&server, "/", PAGE).await;

        let (pipeline, model) = live(ScriptedModel::new());
        let url = format!("{}/", server.uri());
        let request = AnalysisRequest::new(vec![url.clone()], Some("Q1".into()));
        let progress = RecordingProgress::default();

        let analysis = pipeline.run(&request, &progress).await.unwrap();

        assert_eq!(analysis.title, "Q1");
        assert_eq!(analysis.competitors.len(), 1);
        let competitor = &analysis.competitors[0];
        assert_eq!(competitor.url, url);
        assert_eq!(competitor.name, "Acme Analytics");
        assert_eq!(competitor.description, "A refined description.");
        assert_eq!(competitor.analysis_id, analysis.id);
        assert!(analysis.user_id.is_none());

        let insights = sample_insights();
        assert_eq!(analysis.summary, insights.summary);
        assert_eq!(analysis.recommendations, insights.recommendations);

        assert_eq!(model.text_calls(), 1);
        assert_eq!(model.structured_calls(), 1);
        assert_eq!(
            progress.stages(),
            vec![
                PipelineStage::Idle,
                PipelineStage::Fetching,
                PipelineStage::Enriching,
                PipelineStage::Synthesizing,
                PipelineStage::Done,
            ]
        );
        assert_eq!(*progress.outcome.lock().unwrap(), Some(AnalysisOutcome::Live));
    }

    #[tokio::test]
    async fn positioning_is_not_serialized() {
        let server = MockServer::start().await;
        mount_page(&server, "/", PAGE).await;

        let (pipeline, _) = live(ScriptedModel::new());
        let request = AnalysisRequest::new(vec![format!("{}/", server.uri())], None);
        let analysis = pipeline.run(&request, &SilentProgress).await.unwrap();

        assert_eq!(analysis.title, "Competitor Analysis");
        let json = serde_json::to_value(&analysis).unwrap();
        assert!(json.get("positioning").is_none());
        assert!(json.get("createdAt").is_some());
    }

    #[tokio::test]
    async fn missing_key_returns_demo_without_fetching() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(0)
            .mount(&server)
            .await;

        let pipeline = unconfigured();
        let request = AnalysisRequest::new(vec![format!("{}/", server.uri())], Some("Q1".into()));
        let progress = RecordingProgress::default();

        let (analysis, outcome) = pipeline.run_with_outcome(&request, &progress).await.unwrap();

        assert_eq!(outcome, AnalysisOutcome::Demo(DemoReason::MissingApiKey));
        assert!(analysis.title.contains("Demo"));
        assert!(analysis.title.contains("API Key Required"));
        assert_matches_demo(&analysis);
        assert!(!progress.stages().contains(&PipelineStage::Fetching));
    }

    #[tokio::test]
    async fn one_enrichment_failure_falls_back_to_demo() {
        let server = MockServer::start().await;
        for (route, name) in [("/a", "Alpha"), ("/b", "Beta"), ("/c", "Gamma")] {
            let body = format!("<html><head><title>{name}</title></head></html>");
            mount_page(&server, route, &body).await;
        }

        let (pipeline, model) = live(ScriptedModel::new().fail_text_on("Name: Beta"));
        let urls = ["/a", "/b", "/c"]
            .iter()
            .map(|p| format!("{}{p}", server.uri()))
            .collect();
        let request = AnalysisRequest::new(urls, None);

        let (analysis, outcome) = pipeline
            .run_with_outcome(&request, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(outcome, AnalysisOutcome::Demo(DemoReason::AiUnavailable));
        assert!(analysis.title.contains("AI Service Unavailable"));
        assert_matches_demo(&analysis);
        assert_eq!(model.text_calls(), 3);
        assert_eq!(model.structured_calls(), 0);
    }

    #[tokio::test]
    async fn synthesis_failure_falls_back_to_demo() {
        let server = MockServer::start().await;
        mount_page(&server, "/", PAGE).await;

        let (pipeline, _) = live(ScriptedModel::new().fail_structured());
        let request = AnalysisRequest::new(vec![format!("{}/", server.uri())], Some("Q1".into()));
        let progress = RecordingProgress::default();

        let analysis = pipeline.run(&request, &progress).await.unwrap();

        assert!(analysis.title.contains("AI Service Unavailable"));
        assert_matches_demo(&analysis);
        assert!(progress.stages().contains(&PipelineStage::DemoFallback));
    }

    #[tokio::test]
    async fn ai_timeout_falls_back_to_demo() {
        let server = MockServer::start().await;
        mount_page(&server, "/", PAGE).await;

        let model = Arc::new(ScriptedModel::new().with_delay(Duration::from_millis(500)));
        let config = PipelineConfig {
            ai_timeout: Duration::from_millis(50),
            ..config()
        };
        let pipeline = Pipeline::new(config, AiBackend::Available(model)).unwrap();
        let request = AnalysisRequest::new(vec![format!("{}/", server.uri())], None);

        let (_, outcome) = pipeline
            .run_with_outcome(&request, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(outcome, AnalysisOutcome::Demo(DemoReason::AiUnavailable));
    }

    #[tokio::test]
    async fn failing_fetch_is_dropped_from_batch() {
        let server = MockServer::start().await;
        mount_page(&server, "/a", "<title>Alpha</title>").await;
        mount_page(&server, "/c", "<title>Gamma</title>").await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (pipeline, model) = live(ScriptedModel::new());
        let urls = ["/a", "/b", "/c"]
            .iter()
            .map(|p| format!("{}{p}", server.uri()))
            .collect();
        let request = AnalysisRequest::new(urls, None);

        let analysis = pipeline.run(&request, &SilentProgress).await.unwrap();

        let names: Vec<_> = analysis.competitors.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Gamma"]);
        assert_eq!(model.text_calls(), 2);
    }

    #[tokio::test]
    async fn zero_surviving_fetches_is_still_an_analysis() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (pipeline, model) = live(ScriptedModel::new());
        let request = AnalysisRequest::new(vec![format!("{}/gone", server.uri())], Some("Q1".into()));

        let (analysis, outcome) = pipeline
            .run_with_outcome(&request, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(outcome, AnalysisOutcome::Live);
        assert_eq!(analysis.title, "Q1");
        assert!(analysis.competitors.is_empty());
        assert!(!analysis.summary.is_empty());
        assert_eq!(model.text_calls(), 0);
        assert_eq!(model.structured_calls(), 1);
    }

    #[tokio::test]
    async fn empty_request_is_a_validation_error() {
        let (pipeline, model) = live(ScriptedModel::new());

        let err = pipeline
            .run(&AnalysisRequest::default(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, RivalScopeError::Validation { .. }));
        assert!(err.to_string().contains("Please provide valid URLs to analyze"));

        let blank = AnalysisRequest::new(vec!["  ".into()], None);
        assert!(pipeline.run(&blank, &SilentProgress).await.is_err());
        assert_eq!(model.text_calls(), 0);
    }

    #[tokio::test]
    async fn validation_precedes_demo_fallback() {
        let err = unconfigured()
            .run(&AnalysisRequest::default(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn backend_from_availability() {
        let config = OpenAiConfig::default();
        let timeout = Duration::from_secs(5);

        let missing = AiAvailability::Unconfigured {
            env_var: "OPENAI_API_KEY".into(),
        };
        let backend = AiBackend::from_availability(&missing, &config, timeout).unwrap();
        assert!(!backend.is_available());

        let present = AiAvailability::Configured {
            api_key: "sk-test".into(),
        };
        let backend = AiBackend::from_availability(&present, &config, timeout).unwrap();
        assert!(backend.is_available());
        assert!(format!("{backend:?}").contains("gpt-4o"));
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_title, "Competitor Analysis");
        assert_eq!(config.fetch.concurrency, 8);
        assert_eq!(config.ai_timeout, Duration::from_secs(60));
    }
}
