use crate::config::Settings;

pub mod anthropic;
pub mod error;
pub mod heuristic;
mod http;
pub mod openai;

/// Remote input is cut to this many characters before it is sent.
pub const MAX_INPUT_CHARS: usize = 12_000;

const SYSTEM_PROMPT: &str = "You are a finance analyst assistant. Be factual and concise.";
const SUMMARY_INSTRUCTION: &str =
    "Summarize the earnings call into 5 concise bullets: results, guidance, demand, margins, risks.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn summarize(&self, text: &str) -> anyhow::Result<String>;
}

/// Transcript summarizer: a remote LLM when a key is configured, the local heuristic
/// otherwise. Remote failures of any kind degrade to the heuristic.
pub enum Summarizer {
    Remote(Box<dyn LlmClient>),
    Heuristic,
}

impl std::fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Summarizer::Remote(client) => write!(f, "Summarizer::Remote({:?})", client.provider()),
            Summarizer::Heuristic => f.write_str("Summarizer::Heuristic"),
        }
    }
}

impl Summarizer {
    /// OpenAI key first, then Anthropic, else the heuristic. A client that cannot be built
    /// counts as not configured.
    pub fn from_settings(settings: &Settings) -> Self {
        if settings.openai_api_key.is_some() {
            match openai::OpenAiClient::from_settings(settings) {
                Ok(client) => return Summarizer::Remote(Box::new(client)),
                Err(err) => tracing::warn!(error = %err, "OpenAI client unavailable"),
            }
        }

        if settings.anthropic_api_key.is_some() {
            match anthropic::AnthropicClient::from_settings(settings) {
                Ok(client) => return Summarizer::Remote(Box::new(client)),
                Err(err) => tracing::warn!(error = %err, "Anthropic client unavailable"),
            }
        }

        Summarizer::Heuristic
    }

    pub async fn summarize(&self, text: &str) -> String {
        if let Summarizer::Remote(client) = self {
            match client.summarize(text).await {
                Ok(summary) => return summary,
                Err(err) => {
                    tracing::warn!(
                        provider = ?client.provider(),
                        error = %err,
                        "remote summarizer failed; using heuristic summary"
                    );
                }
            }
        }

        heuristic::summarize(text)
    }
}

pub(crate) fn user_prompt(text: &str) -> String {
    format!("{SUMMARY_INSTRUCTION}\n\n{}", truncate_chars(text, MAX_INPUT_CHARS))
}

pub(crate) fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::error::LlmDiagnosticsError;

    struct DownClient;

    #[async_trait::async_trait]
    impl LlmClient for DownClient {
        fn provider(&self) -> Provider {
            Provider::OpenAI
        }

        async fn summarize(&self, _text: &str) -> anyhow::Result<String> {
            Err(LlmDiagnosticsError {
                provider: Provider::OpenAI,
                stage: "http",
                detail: "status=429 Too Many Requests".to_string(),
                raw_output: None,
                raw_response_json: None,
            }
            .into())
        }
    }

    struct EchoClient;

    #[async_trait::async_trait]
    impl LlmClient for EchoClient {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn summarize(&self, text: &str) -> anyhow::Result<String> {
            Ok(format!("- {}", text.trim()))
        }
    }

    #[test]
    fn no_keys_selects_heuristic() {
        let s = Summarizer::from_settings(&Settings::default());
        assert!(matches!(s, Summarizer::Heuristic));
    }

    fn remote_provider(s: &Summarizer) -> Option<Provider> {
        match s {
            Summarizer::Remote(client) => Some(client.provider()),
            Summarizer::Heuristic => None,
        }
    }

    #[test]
    fn openai_key_is_preferred_over_anthropic() {
        let both = Settings {
            openai_api_key: Some("sk-test".to_string()),
            anthropic_api_key: Some("ak-test".to_string()),
            ..Settings::default()
        };
        assert_eq!(
            remote_provider(&Summarizer::from_settings(&both)),
            Some(Provider::OpenAI)
        );

        let anthropic_only = Settings {
            anthropic_api_key: Some("ak-test".to_string()),
            ..Settings::default()
        };
        assert_eq!(
            remote_provider(&Summarizer::from_settings(&anthropic_only)),
            Some(Provider::Anthropic)
        );
    }

    #[tokio::test]
    async fn remote_failure_falls_back_to_heuristic() {
        let s = Summarizer::Remote(Box::new(DownClient));
        let out = s.summarize("Revenue grew 12%\n\nMargins flat").await;
        assert_eq!(out, "Heuristic summary:\n- Revenue grew 12%\n- Margins flat");
    }

    #[tokio::test]
    async fn remote_success_is_returned_verbatim() {
        let s = Summarizer::Remote(Box::new(EchoClient));
        assert_eq!(s.summarize(" guidance raised ").await, "- guidance raised");
    }

    #[test]
    fn prompt_truncates_on_char_boundary() {
        let text = "é".repeat(MAX_INPUT_CHARS + 50);
        let prompt = user_prompt(&text);
        assert!(prompt.starts_with(SUMMARY_INSTRUCTION));
        assert_eq!(prompt.chars().filter(|c| *c == 'é').count(), MAX_INPUT_CHARS);
    }
}
