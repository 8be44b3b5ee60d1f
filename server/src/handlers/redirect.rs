use crate::{
    db,
    domains::split_subdomain,
    error::ApiError,
    handlers::links::edit_form,
    request::{Incoming, Site},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

/// Token a read-only host redirects to when nothing more specific matches `/`.
pub const ROOT_SHORT: &str = "_root";

/// Token a read-only host redirects to instead of answering 404.
pub const NOT_FOUND_SHORT: &str = "_404";

static FAVICON: &[u8] = include_bytes!("../../static/favicon.png");

/// GET /
///
/// Writable hosts get the edit form, prefilled from the query string.
/// Read-only hosts try, in order:
/// 1. the first host label as a short token in the host's own domain
///    (an alias such as `foo.a.example=sh.example` -> `foo` on `sh.example`),
/// 2. the same label in the parent host's domain
///    (`foo.sh.example` -> `foo` on `sh.example`),
/// 3. the `_root` token,
/// 4. the `_404` token,
/// 5. a 404.
pub async fn root(
    State(state): State<Arc<AppState>>,
    incoming: Incoming,
) -> Result<Response, ApiError> {
    let Incoming { site, params } = incoming;

    if site.writable {
        return edit_form(&site, params.short(), &params).map(IntoResponse::into_response);
    }

    if let Some((label, parent)) = split_subdomain(&site.host) {
        let label = label.to_lowercase();
        if let Some(resp) = try_redirect(&state, &label, &site.domain).await? {
            return Ok(resp);
        }

        let parent_domain = state.config.domains.canonical(parent);
        if parent_domain != site.domain {
            if let Some(resp) = try_redirect(&state, &label, parent_domain).await? {
                return Ok(resp);
            }
        }
    }

    if let Some(resp) = try_redirect(&state, ROOT_SHORT, &site.domain).await? {
        return Ok(resp);
    }

    not_found(&state, &site).await
}

/// GET /:short
///
/// Redirect to the current long URL. On a miss, writable hosts get the edit
/// form prefilled with the token so it can be created on the spot.
pub async fn short(
    State(state): State<Arc<AppState>>,
    Path(short): Path<String>,
    incoming: Incoming,
) -> Result<Response, ApiError> {
    let Incoming { site, params } = incoming;
    let short = short.to_lowercase();

    if let Some(resp) = try_redirect(&state, &short, &site.domain).await? {
        return Ok(resp);
    }

    if site.writable {
        return edit_form(&site, Some(short), &params).map(IntoResponse::into_response);
    }

    not_found(&state, &site).await
}

/// GET /_favicon.png
pub async fn favicon(_incoming: Incoming) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], FAVICON)
}

// ── Helpers ────────────────────────────────────────────────────────────────

/// 307 to the long URL for `(short, domain)`, or `None` if there is no
/// current link. Temporary so a later overwrite takes effect for clients.
async fn try_redirect(
    state: &AppState,
    short: &str,
    domain: &str,
) -> Result<Option<Response>, ApiError> {
    let long = db::get_long(&state.db, short, domain)
        .await
        .map_err(|e| ApiError::internal("get_long", e))?;

    Ok(long.map(|long| {
        tracing::debug!("Redirecting {}/{} -> {}", domain, short, long);
        Redirect::temporary(&long).into_response()
    }))
}

/// Read-only miss: the domain's `_404` link if it has one, else 404.
async fn not_found(state: &AppState, site: &Site) -> Result<Response, ApiError> {
    match try_redirect(state, NOT_FOUND_SHORT, &site.domain).await? {
        Some(resp) => Ok(resp),
        None => Err(ApiError::NotFound),
    }
}
