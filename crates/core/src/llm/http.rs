use crate::config::env_parse;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::Provider;
use anyhow::Context;
use serde_json::Value;
use std::time::Duration;

/// Connection settings shared by the remote summarizers, read from `{PREFIX}_BASE_URL`,
/// `{PREFIX}_MODEL`, `{PREFIX}_MAX_TOKENS` and `{PREFIX}_TIMEOUT_SECS`.
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    pub http: reqwest::Client,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

pub(crate) struct EndpointDefaults {
    pub base_url: &'static str,
    pub model: &'static str,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Endpoint {
    pub fn from_env(prefix: &str, defaults: EndpointDefaults) -> anyhow::Result<Self> {
        let base_url = std::env::var(format!("{prefix}_BASE_URL"))
            .unwrap_or_else(|_| defaults.base_url.to_string());
        let model =
            std::env::var(format!("{prefix}_MODEL")).unwrap_or_else(|_| defaults.model.to_string());
        let max_tokens = env_parse(&format!("{prefix}_MAX_TOKENS"), defaults.max_tokens);
        let timeout_secs = env_parse(&format!("{prefix}_TIMEOUT_SECS"), defaults.timeout_secs);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            base_url,
            model,
            max_tokens,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

/// Sends the request and parses the body as JSON. A non-2xx status becomes an
/// [`LlmDiagnosticsError`] carrying the raw body.
pub(crate) async fn send_json(
    provider: Provider,
    req: reqwest::RequestBuilder,
) -> anyhow::Result<Value> {
    let res = req
        .send()
        .await
        .with_context(|| format!("{provider:?} request failed"))?;

    let status = res.status();
    let text = res
        .text()
        .await
        .with_context(|| format!("failed to read {provider:?} response body"))?;
    if !status.is_success() {
        return Err(LlmDiagnosticsError::http(provider, status, text).into());
    }

    serde_json::from_str::<Value>(&text)
        .with_context(|| format!("failed to parse {provider:?} response JSON: {text}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> EndpointDefaults {
        EndpointDefaults {
            base_url: "https://llm.example.com/",
            model: "small-model",
            max_tokens: 123,
            timeout_secs: 5,
        }
    }

    #[test]
    fn unset_prefix_uses_defaults() {
        let ep = Endpoint::from_env("STOCKPICK_UNSET_LLM", defaults()).unwrap();
        assert_eq!(ep.model, "small-model");
        assert_eq!(ep.max_tokens, 123);
        assert_eq!(ep.url("/v1/messages"), "https://llm.example.com/v1/messages");
    }
}
