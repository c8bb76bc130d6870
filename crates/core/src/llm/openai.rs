use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::http::{send_json, Endpoint, EndpointDefaults};
use crate::llm::{system_prompt, user_prompt, LlmClient, Provider};
use anyhow::Context;
use serde::{Deserialize, Serialize};

const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    endpoint: Endpoint,
    api_key: String,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let endpoint = Endpoint::from_env(
            "OPENAI",
            EndpointDefaults {
                base_url: "https://api.openai.com",
                model: "gpt-4o-mini",
                max_tokens: 400,
                timeout_secs: 60,
            },
        )?;
        Ok(Self { endpoint, api_key })
    }

    fn request(&self, text: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.endpoint.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt().to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(text),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: self.endpoint.max_tokens,
        }
    }

    fn response_text(res: &ChatCompletionResponse) -> Option<String> {
        res.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn summarize(&self, text: &str) -> anyhow::Result<String> {
        let req = self
            .endpoint
            .http
            .post(self.endpoint.url("/v1/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&self.request(text));

        let raw_json = send_json(Provider::OpenAI, req).await?;
        let parsed = serde_json::from_value::<ChatCompletionResponse>(raw_json.clone())
            .context("failed to decode OpenAI response into ChatCompletionResponse")?;

        Self::response_text(&parsed)
            .ok_or_else(|| LlmDiagnosticsError::empty_output(Provider::OpenAI, raw_json).into())
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
