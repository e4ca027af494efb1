use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_cookies::Cookies;

use crate::{services::auth as auth_service, state::AppState};

/// Name of the cookie carrying the opaque session token.
pub const SESSION_COOKIE: &str = "session_id";

/// Extracts the session token from the request cookies.
///
/// # Arguments
///
/// * `cookies` - The request cookies.
///
/// # Returns
///
/// An `Option` containing the token if a non-empty cookie is present.
pub fn extract_session_token(cookies: &Cookies) -> Option<String> {
    cookies
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// A middleware that requires a valid session to be present.
///
/// On success the resolved `Session` is inserted into the request extensions
/// for handlers to pick up with `Extension<Session>`.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    tracing::debug!("🔐 Checking authentication...");

    let token = extract_session_token(&cookies);
    if token.is_none() {
        tracing::debug!("❌ No session_id cookie found");
    }

    let session = match auth_service::require_session(&state, token.as_deref()).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    tracing::debug!("✅ User authenticated: {}", session.user_id);

    request.extensions_mut().insert(session);

    next.run(request).await
}
