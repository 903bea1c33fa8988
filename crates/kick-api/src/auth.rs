use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::ApiError;
use crate::state::AppState;

/// Decode an `Authorization: Basic ...` header value into `(user, password)`.
pub fn parse_basic(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?.trim();
    let decoded = STANDARD.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, pass) = text.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Middleware guarding the admin routes with HTTP Basic authentication.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(credentials) = state.admin.as_ref() else {
        return Err(ApiError::Unauthorized("Admin access is disabled".into()));
    };

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(header) = header.filter(|h| h.starts_with("Basic ")) else {
        return Err(ApiError::Unauthorized("Authentication required".into()));
    };

    match parse_basic(header) {
        Some((user, pass)) if credentials.matches(&user, &pass) => Ok(next.run(request).await),
        _ => {
            tracing::debug!("Rejected admin credentials");
            Err(ApiError::Unauthorized("Invalid credentials".into()))
        }
    }
}
