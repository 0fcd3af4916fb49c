//! Admin bearer-token gate

use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::warn;

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};

/// Bearer token from the `Authorization` header, if well formed
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Reject the request unless it carries a configured admin token
///
/// Missing or malformed credentials give 401, an unknown token gives 403.
pub fn require_admin(headers: &HeaderMap, config: &ServerConfig) -> ApiResult<()> {
    let token = bearer_token(headers).ok_or_else(|| {
        warn!("Admin request rejected: missing bearer token");
        ApiError::unauthorized("Authentication credentials were not provided")
    })?;

    if !config.is_admin_token(token) {
        warn!("Admin request rejected: token is not an admin token");
        return Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        ));
    }

    Ok(())
}
