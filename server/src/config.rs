use anyhow::{Context, Result};

use crate::domains::Domains;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite connection string, e.g. "sqlite:./shortlinks.db"
    pub database_url: String,

    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Alias table and writable host set
    pub domains: Domains,

    /// Completion-service credentials. Only checked when a suggestion is
    /// requested.
    pub openai_api_key: Option<String>,

    /// Completion-service base URL, without trailing slash.
    pub openai_base_url: String,

    pub openai_model: String,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        let port = std::env::var("PORT")
            .context("PORT must be set in the environment or .env file")?
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set in the environment or .env file")?;

        let domains = Domains::parse(
            &std::env::var("DOMAIN_ALIASES").unwrap_or_default(),
            &std::env::var("WRITABLE_DOMAINS").unwrap_or_default(),
        )
        .context("Failed to load DOMAIN_ALIASES / WRITABLE_DOMAINS")?;

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let openai_base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.into())
            .trim_end_matches('/')
            .to_owned();

        Ok(Self {
            database_url,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            domains,
            openai_api_key,
            openai_base_url,
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.into()),
        })
    }
}
