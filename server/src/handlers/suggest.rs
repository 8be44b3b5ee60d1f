use crate::{error::ApiError, models::SuggestResponse, request::Incoming, AppState};
use axum::{extract::State, http::Method, Json};
use std::sync::Arc;

/// Name of the HTTP method that asks for suggestions.
pub const QUERY_METHOD: &str = "QUERY";

/// Any method on `/` without a dedicated route lands here; only `QUERY` is
/// served.
///
/// QUERY /
pub async fn query(
    method: Method,
    State(state): State<Arc<AppState>>,
    incoming: Incoming,
) -> Result<Json<SuggestResponse>, ApiError> {
    if method.as_str() != QUERY_METHOD {
        return Err(ApiError::MethodNotAllowed);
    }

    let Incoming { site, params } = incoming;
    site.require_writable()?;

    let prior = params.prior_shorts();
    let title = params.title();
    if prior.is_empty() && title.is_none() {
        return Err(ApiError::bad_request("shorts= or title= param required"));
    }

    let shorts = state.advisor.suggest(&prior, title).await?;
    tracing::info!("Suggested {} short(s) for {}", shorts.len(), site.domain);

    Ok(Json(SuggestResponse {
        shorts,
        domain: site.domain,
    }))
}
