use chrono::{DateTime, Utc};
use serde::Serialize;

/// A current link from the `links` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Link {
    pub short: String,
    pub long: String,
    pub domain: String,
    pub generated: bool,
}

/// A superseded link version from the `links_history` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct LinkHistory {
    pub short: String,
    pub long: String,
    pub domain: String,
    pub generated: bool,
    pub until: DateTime<Utc>,
}

/// A current link with its public URL and past versions, newest first.
/// Used on the list page.
#[derive(Debug, Clone, Serialize)]
pub struct LinkWithHistory {
    pub short: String,
    pub long: String,
    pub domain: String,
    pub generated: bool,
    pub url: String,
    pub history: Vec<LinkHistory>,
}

/// Body returned by `POST /`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetResponse {
    pub short: String,
    pub domain: String,
    pub url: String,
}

/// Body returned by `QUERY /`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestResponse {
    pub shorts: Vec<String>,
    pub domain: String,
}

/// Public redirect URL for a short token.
pub fn short_url(domain: &str, short: &str) -> String {
    format!("https://{domain}/{short}")
}
