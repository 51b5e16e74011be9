pub mod chart;
pub mod domain;
pub mod llm;
pub mod sources;
pub mod synthesis;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub gemini_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                // API_KEY is the legacy name still used by older deploys.
                gemini_api_key: std::env::var("GEMINI_API_KEY")
                    .ok()
                    .or_else(|| std::env::var("API_KEY").ok()),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY is required")
        }
    }
}
