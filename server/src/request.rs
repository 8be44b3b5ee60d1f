use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequest, Request},
    http::{header, request::Parts, HeaderMap},
};
use serde::Deserialize;

use crate::{domains::Domains, error::ApiError, AppState};

const MAX_BODY_BYTES: usize = 64 * 1024;

// ── Site ───────────────────────────────────────────────────────────────────

/// The host a request arrived on and what it is allowed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    /// Raw request host, lower-cased (port included if sent).
    pub host: String,
    /// Canonical domain: the partition key for links.
    pub domain: String,
    pub writable: bool,
}

impl Site {
    pub fn resolve(domains: &Domains, host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        Self {
            domain: domains.canonical(&host).to_owned(),
            writable: domains.is_writable(&host),
            host,
        }
    }

    /// Write, list and suggest routes pretend not to exist on read-only hosts.
    pub fn require_writable(&self) -> Result<(), ApiError> {
        if self.writable {
            Ok(())
        } else {
            Err(ApiError::NotFound)
        }
    }
}

// ── Parameters ─────────────────────────────────────────────────────────────

/// Request parameters gathered from the query string and the body.
///
/// Sources are applied in order: query, form body, JSON body. A later
/// scalar replaces an earlier one; `shorts` values accumulate.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkParams {
    pub short: Option<String>,
    pub long: Option<String>,
    pub title: Option<String>,
    pub shorts: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct JsonParams {
    short: Option<String>,
    long: Option<String>,
    title: Option<String>,
    shorts: Option<OneOrMany>,
}

impl LinkParams {
    /// Apply `application/x-www-form-urlencoded` pairs (query strings too).
    pub fn absorb_form(&mut self, input: &[u8]) {
        for (key, value) in url::form_urlencoded::parse(input) {
            let value = value.into_owned();
            match key.as_ref() {
                "short" => self.short = Some(value),
                "long" => self.long = Some(value),
                "title" => self.title = Some(value),
                "shorts" => self.shorts.push(value),
                _ => {}
            }
        }
    }

    /// Apply a JSON object body. Blank input adds nothing.
    pub fn absorb_json(&mut self, input: &[u8]) -> Result<(), serde_json::Error> {
        if input.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }

        let body: JsonParams = serde_json::from_slice(input)?;
        if body.short.is_some() {
            self.short = body.short;
        }
        if body.long.is_some() {
            self.long = body.long;
        }
        if body.title.is_some() {
            self.title = body.title;
        }
        match body.shorts {
            Some(OneOrMany::One(s)) => self.shorts.push(s),
            Some(OneOrMany::Many(list)) => self.shorts.extend(list),
            None => {}
        }
        Ok(())
    }

    /// Client-chosen short token, lower-cased; `None` when blank.
    pub fn short(&self) -> Option<String> {
        non_blank(self.short.as_deref()).map(str::to_lowercase)
    }

    pub fn long(&self) -> Option<&str> {
        non_blank(self.long.as_deref())
    }

    pub fn title(&self) -> Option<&str> {
        non_blank(self.title.as_deref())
    }

    /// Prior short tokens in the order given, lower-cased, blanks dropped.
    pub fn prior_shorts(&self) -> Vec<String> {
        self.shorts
            .iter()
            .filter_map(|s| non_blank(Some(s.as_str())))
            .map(str::to_lowercase)
            .collect()
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

// ── Incoming extractor ─────────────────────────────────────────────────────

/// Extractor every handler takes: resolves the host against the domain
/// tables, normalizes the parameters and logs the request.
#[derive(Debug)]
pub struct Incoming {
    pub site: Site,
    pub params: LinkParams,
}

enum BodyKind {
    Json,
    Form,
    Other,
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "application/json" => BodyKind::Json,
        "application/x-www-form-urlencoded" => BodyKind::Form,
        _ => BodyKind::Other,
    }
}

fn request_host(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| parts.uri.authority().map(|a| a.as_str()))
        .filter(|h| !h.is_empty())
}

#[async_trait]
impl<S> FromRequest<S> for Incoming
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let state = Arc::<AppState>::from_ref(state);
        let (parts, body) = req.into_parts();

        let host = request_host(&parts)
            .ok_or_else(|| ApiError::bad_request("init request: missing host"))?;
        let site = Site::resolve(&state.config.domains, host);

        let mut params = LinkParams::default();
        if let Some(query) = parts.uri.query() {
            params.absorb_form(query.as_bytes());
        }

        let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| ApiError::bad_request(format!("init request: {e}")))?;

        match body_kind(&parts.headers) {
            BodyKind::Json => params
                .absorb_json(&bytes)
                .map_err(|e| ApiError::bad_request(format!("init request: {e}")))?,
            BodyKind::Form => params.absorb_form(&bytes),
            BodyKind::Other => {}
        }

        tracing::info!(
            method = %parts.method,
            host = %site.host,
            domain = %site.domain,
            path = %parts.uri.path(),
            params = ?params,
            "request"
        );

        Ok(Self { site, params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_pairs_fill_typed_fields() {
        let mut p = LinkParams::default();
        p.absorb_form(b"short=Docs&long=https%3A%2F%2Fa.example&shorts=a&shorts=b&other=x");
        assert_eq!(p.short(), Some("docs".into()));
        assert_eq!(p.long(), Some("https://a.example"));
        assert_eq!(p.shorts, ["a", "b"]);
        assert_eq!(p.title(), None);
    }

    #[test]
    fn json_overrides_scalars_and_appends_lists() {
        let mut p = LinkParams::default();
        p.absorb_form(b"long=https://query.example&shorts=q");
        p.absorb_json(br#"{"long": "https://body.example", "shorts": ["x", "y"], "title": "T"}"#)
            .unwrap();
        assert_eq!(p.long(), Some("https://body.example"));
        assert_eq!(p.shorts, ["q", "x", "y"]);
        assert_eq!(p.title(), Some("T"));
    }

    #[test]
    fn json_single_string_short_list() {
        let mut p = LinkParams::default();
        p.absorb_json(br#"{"shorts": "docs"}"#).unwrap();
        assert_eq!(p.shorts, ["docs"]);
    }

    #[test]
    fn json_null_keeps_earlier_value() {
        let mut p = LinkParams::default();
        p.absorb_form(b"short=keep");
        p.absorb_json(br#"{"short": null}"#).unwrap();
        assert_eq!(p.short(), Some("keep".into()));
    }

    #[test]
    fn json_non_string_scalar_is_rejected() {
        let mut p = LinkParams::default();
        assert!(p.absorb_json(br#"{"short": 12}"#).is_err());
        assert!(p.absorb_json(b"not json").is_err());
    }

    #[test]
    fn blank_json_body_is_empty() {
        let mut p = LinkParams::default();
        p.absorb_json(b"  \n").unwrap();
        assert_eq!(p, LinkParams::default());
    }

    #[test]
    fn blank_values_read_as_absent() {
        let mut p = LinkParams::default();
        p.absorb_form(b"short=%20&long=&shorts=&shorts=%20Two%20");
        assert_eq!(p.short(), None);
        assert_eq!(p.long(), None);
        assert_eq!(p.prior_shorts(), ["two"]);
    }

    #[test]
    fn content_type_detection_ignores_parameters() {
        let mut h = HeaderMap::new();
        h.insert(header::CONTENT_TYPE, "application/json; charset=utf-8".parse().unwrap());
        assert!(matches!(body_kind(&h), BodyKind::Json));
        h.insert(header::CONTENT_TYPE, "application/x-www-form-urlencoded".parse().unwrap());
        assert!(matches!(body_kind(&h), BodyKind::Form));
        h.remove(header::CONTENT_TYPE);
        assert!(matches!(body_kind(&h), BodyKind::Other));
    }

    #[test]
    fn site_resolution() {
        let domains = Domains::parse("s.example=sh.example", "sh.example").unwrap();
        let site = Site::resolve(&domains, "S.Example");
        assert_eq!(site.domain, "sh.example");
        assert!(!site.writable);
        assert!(site.require_writable().is_err());
        assert!(Site::resolve(&domains, "sh.example").require_writable().is_ok());
    }
}
