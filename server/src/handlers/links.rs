use crate::{
    db,
    error::ApiError,
    models::{short_url, LinkWithHistory, SetResponse},
    request::{Incoming, LinkParams, Site},
    shorts, AppState,
};
use askama::Template;
use axum::{extract::State, http::StatusCode, response::Html, Json};
use std::sync::Arc;

/// Width of the `short` column.
const MAX_SHORT_LEN: usize = 100;

// ── Template structs ───────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    short: &'a str,
    host: &'a str,
    long: &'a str,
    title: &'a str,
}

#[derive(Template)]
#[template(path = "help.html")]
struct HelpTemplate<'a> {
    write_host: &'a str,
    read_host: &'a str,
}

#[derive(Template)]
#[template(path = "list.html")]
struct ListTemplate<'a> {
    domain: &'a str,
    links: Vec<LinkWithHistory>,
}

/// Render the edit form for `site`, prefilled with `short` and whatever
/// `long`/`title` the request carried.
pub fn edit_form(
    site: &Site,
    short: Option<String>,
    params: &LinkParams,
) -> Result<Html<String>, ApiError> {
    let html = IndexTemplate {
        short: short.as_deref().unwrap_or_default(),
        host: &site.domain,
        long: params.long().unwrap_or_default(),
        title: params.title().unwrap_or_default(),
    }
    .render()?;

    Ok(Html(html))
}

// ── Handlers ───────────────────────────────────────────────────────────────

/// POST /
///
/// Create or overwrite a link. Without `short` a random unused token is
/// generated and the link is marked as generated.
pub async fn set_link(
    State(state): State<Arc<AppState>>,
    incoming: Incoming,
) -> Result<Json<SetResponse>, ApiError> {
    let Incoming { site, params } = incoming;
    site.require_writable()?;

    let long = params
        .long()
        .ok_or_else(|| ApiError::bad_request("long= param required"))?;

    let (short, generated) = match params.short() {
        Some(short) if short.chars().count() > MAX_SHORT_LEN => {
            return Err(ApiError::bad_request(format!(
                "short= must be at most {MAX_SHORT_LEN} characters"
            )));
        }
        Some(short) => (short, false),
        None => (shorts::generate(&state.db, &site.domain).await?, true),
    };

    db::update_link(&state.db, &short, long, &site.domain, generated)
        .await
        .map_err(|e| ApiError::internal("update_link", e))?;

    tracing::info!(
        "Set {}/{} -> {} (generated: {})",
        site.domain,
        short,
        long,
        generated
    );

    Ok(Json(SetResponse {
        url: short_url(&site.domain, &short),
        short,
        domain: site.domain,
    }))
}

/// GET /_help
pub async fn help(incoming: Incoming) -> Result<Html<String>, ApiError> {
    let site = incoming.site;
    site.require_writable()?;

    let html = HelpTemplate {
        write_host: &site.host,
        read_host: &site.domain,
    }
    .render()?;

    Ok(Html(html))
}

/// GET /_list
///
/// Every current link of the canonical domain with its past versions.
pub async fn list(
    State(state): State<Arc<AppState>>,
    incoming: Incoming,
) -> Result<Html<String>, ApiError> {
    let site = incoming.site;
    site.require_writable()?;

    let links = db::list_links(&state.db, &site.domain)
        .await
        .map_err(|e| ApiError::internal("select links", e))?;

    let html = ListTemplate {
        domain: &site.domain,
        links,
    }
    .render()?;

    Ok(Html(html))
}

/// OPTIONS /
///
/// CORS preflight. The CORS headers themselves are added by the router.
pub async fn preflight(_incoming: Incoming) -> StatusCode {
    StatusCode::NO_CONTENT
}
