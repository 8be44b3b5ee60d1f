pub mod links;
pub mod redirect;
pub mod suggest;

use crate::{error::ApiError, request::Incoming};

/// Fallback for paths no route matches.
pub async fn not_found(_incoming: Incoming) -> ApiError {
    ApiError::NotFound
}
