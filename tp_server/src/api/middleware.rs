//! Authentication middleware for protected endpoints.
//!
//! Extracts the identity token from the `Authorization: Bearer <token>`
//! header, verifies it and injects the decoded [`Claims`] into request
//! extensions for downstream handlers.
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use tp_server::api::auth::Claims;
//!
//! async fn protected_handler(Extension(claims): Extension<Claims>) -> String {
//!     format!("Authenticated as {}", claims.username)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use super::{AppState, auth::AuthError};
use crate::logging::log_security_event;

/// Reject the request with `401 Unauthorized` unless it carries a valid token
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken);

    match token.and_then(|token| state.verifier.verify(token)) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(e) => {
            log_security_event("rejected_token", None, &e.to_string());
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
