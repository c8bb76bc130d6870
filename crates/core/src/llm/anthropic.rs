use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::http::{send_json, Endpoint, EndpointDefaults};
use crate::llm::{system_prompt, user_prompt, LlmClient, Provider};
use anyhow::Context;
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 400;
const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    endpoint: Endpoint,
    api_key: String,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let endpoint = Endpoint::from_env(
            "ANTHROPIC",
            EndpointDefaults {
                base_url: "https://api.anthropic.com",
                model: DEFAULT_MODEL,
                max_tokens: DEFAULT_MAX_TOKENS,
                timeout_secs: 60,
            },
        )?;
        Ok(Self { endpoint, api_key })
    }

    async fn create_message(
        &self,
        req: CreateMessageRequest,
    ) -> anyhow::Result<(serde_json::Value, CreateMessageResponse)> {
        let builder = self
            .endpoint
            .http
            .post(self.endpoint.url("/v1/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req);

        let raw_json = send_json(Provider::Anthropic, builder).await?;
        let parsed = serde_json::from_value::<CreateMessageResponse>(raw_json.clone())
            .context("failed to decode Anthropic response into CreateMessageResponse")?;
        Ok((raw_json, parsed))
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            match block {
                ContentBlock::Text { text } => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(text);
                }
                ContentBlock::Unknown => {}
            }
        }
        out.trim().to_string()
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn summarize(&self, text: &str) -> anyhow::Result<String> {
        let req = CreateMessageRequest {
            model: self.endpoint.model.clone(),
            max_tokens: self.endpoint.max_tokens,
            temperature: TEMPERATURE,
            system: Some(system_prompt().to_string()),
            messages: vec![Message {
                role: "user",
                content: user_prompt(text),
            }],
        };

        let (raw_json, res) = self.create_message(req).await?;
        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::debug!(max_tokens = self.endpoint.max_tokens, "Anthropic summary hit max_tokens");
        }

        let summary = Self::response_text(&res);
        if summary.is_empty() {
            return Err(LlmDiagnosticsError::empty_output(Provider::Anthropic, raw_json).into());
        }
        Ok(summary)
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(other)]
    Unknown,
}
