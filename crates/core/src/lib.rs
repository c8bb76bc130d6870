pub mod domain;
pub mod ingest;
pub mod llm;
pub mod picks;
pub mod query;
pub mod rank;
pub mod report;
pub mod time;
pub mod universe;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub openai_api_key: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub market_data_base_url: Option<String>,
        pub universe_dir: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                openai_api_key: non_blank_env("OPENAI_API_KEY"),
                anthropic_api_key: non_blank_env("ANTHROPIC_API_KEY"),
                sentry_dsn: non_blank_env("SENTRY_DSN"),
                market_data_base_url: non_blank_env("MARKET_DATA_BASE_URL"),
                universe_dir: non_blank_env("UNIVERSE_DIR"),
            })
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }
    }

    // An empty key in .env means "not configured", same as an unset one.
    fn non_blank_env(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

    pub(crate) fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
        std::env::var(key)
            .ok()
            .and_then(|s| s.trim().parse::<T>().ok())
            .unwrap_or(default)
    }
}
