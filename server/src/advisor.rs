use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::AppConfig;

const SYSTEM_PROMPT: &str = "You are an assistant helping a user choose useful short names for a \
URL shortener. The request contains a JSON object where the optional `shorts` key contains a list \
of recent names chosen by the user, with the most recent names first, and the optional `title` key \
contains a title for the URL. Respond with only a JSON object where the `shorts` key contains a \
list of possible suggestions for additional short names. In descending order of preference, \
suggestions should include: plural/singular variations, 2 and 3 letter abbreviations, conceptual \
variations, other variations that are likely to be useful. Your bar for suggestions should be \
relatively high; responding with a shorter list of high quality suggestions is preferred.";

#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("completion response had no choices")]
    NoChoices,

    #[error("invalid suggestion payload: {0}")]
    Payload(#[from] serde_json::Error),
}

// ── Chat-completion wire shapes ────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: Value,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// User payload sent alongside the system prompt.
#[derive(Debug, Serialize)]
struct SuggestInput<'a> {
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    shorts: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

/// Schema-constrained model output.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SuggestOutput {
    shorts: Vec<String>,
}

// ── Client ─────────────────────────────────────────────────────────────────

/// Client for the chat-completion service that proposes short names.
#[derive(Debug, Clone)]
pub struct Advisor {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl Advisor {
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_owned(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.openai_api_key.clone(),
            &config.openai_base_url,
            &config.openai_model,
        )
    }

    /// Ask the model for more short names given the user's recent ones
    /// (most recent first) and/or a page title. Suggestions come back in the
    /// model's preference order, trimmed and lower-cased, empties dropped.
    pub async fn suggest(
        &self,
        shorts: &[String],
        title: Option<&str>,
    ) -> Result<Vec<String>, AdvisorError> {
        let input = SuggestInput { shorts, title };
        let content = self.complete_chat(SYSTEM_PROMPT, &input).await?;
        let output: SuggestOutput = serde_json::from_str(&content)?;
        Ok(normalize(output.shorts))
    }

    /// One schema-constrained chat completion; returns the first choice's
    /// message content.
    async fn complete_chat<T: Serialize>(
        &self,
        system: &str,
        input: &T,
    ) -> Result<String, AdvisorError> {
        let api_key = self.api_key.as_deref().ok_or(AdvisorError::MissingApiKey)?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: system.into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: serde_json::to_string(input)?,
                },
            ],
            response_format: response_format(),
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("Failed to read completion error body: {}", e);
                    format!("<unreadable body: {e}>")
                }
            };
            return Err(AdvisorError::Status { status, body });
        }

        let chat: ChatResponse = serde_json::from_slice(&response.bytes().await?)?;
        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(AdvisorError::NoChoices)
    }
}

fn response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "suggest_response",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "shorts": {
                        "type": "array",
                        "items": { "type": "string" }
                    }
                },
                "required": ["shorts"],
                "additionalProperties": false
            }
        }
    })
}

fn normalize(shorts: Vec<String>) -> Vec<String> {
    shorts
        .into_iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_lowercases_and_keeps_order() {
        let raw: Vec<String> = vec![
            " Docs ".into(),
            "".into(),
            "DOC".into(),
            "   ".into(),
            "d".into(),
        ];
        assert_eq!(normalize(raw), ["docs", "doc", "d"]);
    }

    #[test]
    fn input_omits_absent_fields() {
        let none: [String; 0] = [];
        let v = serde_json::to_value(SuggestInput {
            shorts: &none,
            title: Some("Rust Book"),
        })
        .unwrap();
        assert_eq!(v, json!({ "title": "Rust Book" }));

        let shorts = ["docs".to_owned()];
        let v = serde_json::to_value(SuggestInput {
            shorts: &shorts,
            title: None,
        })
        .unwrap();
        assert_eq!(v, json!({ "shorts": ["docs"] }));
    }

    #[test]
    fn output_rejects_schema_violations() {
        assert!(serde_json::from_str::<SuggestOutput>(r#"{"shorts": ["a"]}"#).is_ok());
        assert!(serde_json::from_str::<SuggestOutput>(r#"{"names": ["a"]}"#).is_err());
        assert!(serde_json::from_str::<SuggestOutput>(r#"{"shorts": "a"}"#).is_err());
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let advisor = Advisor::new(None, "http://127.0.0.1:9", "gpt-4o");
        let err = advisor.suggest(&["docs".to_owned()], None).await.unwrap_err();
        assert!(matches!(err, AdvisorError::MissingApiKey));
    }
}
