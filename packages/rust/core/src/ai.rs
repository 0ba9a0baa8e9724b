//! Language-model capability used by enrichment and synthesis.
//!
//! [`LanguageModel`] is the seam the pipeline depends on; [`OpenAiClient`]
//! implements it against the OpenAI chat-completions REST API. Structured
//! calls send a strict JSON schema derived from the Rust response type.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rivalscope_shared::{OpenAiConfig, Result, RivalScopeError};
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Text and structured generation.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Free-form completion for a single prompt.
    async fn generate_text(&self, prompt: &str) -> Result<String>;

    /// Completion constrained to `schema`, returned as parsed JSON.
    async fn generate_structured(
        &self,
        system: &str,
        prompt: &str,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value>;

    /// Model identifier for tracing.
    fn model(&self) -> &str;
}

/// Run a structured completion and decode it into `T`.
pub async fn generate_object<T>(model: &dyn LanguageModel, system: &str, prompt: &str) -> Result<T>
where
    T: JsonSchema + DeserializeOwned,
{
    let name = <T as JsonSchema>::schema_name();
    let value = model
        .generate_structured(system, prompt, &name, strict_schema::<T>())
        .await?;
    serde_json::from_value(value)
        .map_err(|e| RivalScopeError::Ai(format!("response does not match {name}: {e}")))
}

/// Bound one model call by `timeout`; expiry is reported as an AI error.
pub(crate) async fn with_timeout<T>(
    timeout: Duration,
    what: &str,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, call).await.map_err(|_| {
        RivalScopeError::Ai(format!("{what} timed out after {}s", timeout.as_secs()))
    })?
}

// ---------------------------------------------------------------------------
// Schema generation
// ---------------------------------------------------------------------------

/// JSON schema for `T`, adjusted for OpenAI strict mode.
///
/// Strict mode requires `additionalProperties: false` and every property
/// listed in `required` on each object schema. Nested types are inlined so
/// the schema carries no `$ref`.
pub fn strict_schema<T: JsonSchema>() -> serde_json::Value {
    let generator = SchemaSettings::draft07()
        .with(|s| s.inline_subschemas = true)
        .into_generator();
    let root = generator.into_root_schema_for::<T>();

    let mut value = serde_json::to_value(root).unwrap_or_default();
    fix_object_schemas(&mut value);
    if let serde_json::Value::Object(map) = &mut value {
        map.remove("$schema");
        map.remove("title");
        map.remove("definitions");
    }
    value
}

fn fix_object_schemas(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if map.get("type").and_then(|t| t.as_str()) == Some("object") {
                map.insert("additionalProperties".into(), serde_json::Value::Bool(false));
                if let Some(serde_json::Value::Object(props)) = map.get("properties") {
                    let keys = props
                        .keys()
                        .map(|k| serde_json::Value::String(k.clone()))
                        .collect();
                    map.insert("required".into(), serde_json::Value::Array(keys));
                }
            }
            for (_, v) in map.iter_mut() {
                fix_object_schemas(v);
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(fix_object_schemas),
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// OpenAI client
// ---------------------------------------------------------------------------

/// System prompt for plain text completions.
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// OpenAI chat-completions client.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client from the `[openai]` config section.
    pub fn new(api_key: impl Into<String>, config: &OpenAiConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RivalScopeError::Ai(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Send one chat request and return the first choice's content.
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| RivalScopeError::Ai(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RivalScopeError::Ai(format!(
                "OpenAI API error ({status}): {error_text}"
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| RivalScopeError::Ai(format!("invalid OpenAI response: {e}")))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RivalScopeError::Ai("no response from OpenAI".into()))
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage::new("system", DEFAULT_SYSTEM_PROMPT),
                ChatMessage::new("user", prompt),
            ],
            response_format: None,
        };
        let text = self.chat(&request).await?;
        debug!(chars = text.len(), "text completion received");
        Ok(text)
    }

    #[instrument(skip_all, fields(model = %self.model, schema = schema_name))]
    async fn generate_structured(
        &self,
        system: &str,
        prompt: &str,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage::new("system", system),
                ChatMessage::new("user", prompt),
            ],
            response_format: Some(ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: schema_name,
                    strict: true,
                    schema,
                },
            }),
        };
        let content = self.chat(&request).await?;
        serde_json::from_str(&content)
            .map_err(|e| RivalScopeError::Ai(format!("structured output is not JSON: {e}")))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl<'a> ChatMessage<'a> {
    fn new(role: &'a str, content: &'a str) -> Self {
        Self { role, content }
    }
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'a str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
