use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};

use crate::{
    error::Result,
    middleware_layer::auth::{extract_session_token, SESSION_COOKIE},
    models::session::Session,
    models::user::UserId,
    services::auth as auth_service,
    state::AppState,
};

/// The request payload for registration and login.
///
/// Missing fields deserialize as empty strings and are rejected by validation.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CredentialsRequest {
    pub email: String,
    #[serde(alias = "pass")]
    pub password: String,
}

/// The response payload for authentication-related requests.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

/// The response payload for `GET /api/auth/me`.
#[derive(Serialize)]
pub struct MeResponse {
    pub id: UserId,
    pub email: String,
}

/// Creates the session cookie.
fn create_secure_cookie(value: String, max_age_days: i64, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, value);

    cookie.set_http_only(true);
    if secure {
        cookie.set_secure(true);
    }

    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(Duration::seconds(max_age_days * 86400));
    cookie.set_path("/");

    cookie
}

/// Handles user registration.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    tracing::info!("📝 Register attempt");

    let user = auth_service::register(&state, &payload.email, &payload.password).await?;

    let response = AuthResponse {
        success: true,
        message: format!("Registered {}", user.email),
    };

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    tracing::info!("🔐 Login attempt");

    let (token, session) =
        auth_service::authenticate(&state, &payload.email, &payload.password).await?;

    cookies.add(create_secure_cookie(
        token,
        state.config.session_duration_days,
        state.config.secure_cookies,
    ));
    tracing::info!("✅ Session cookie added for user: {}", session.user_id);

    let response = AuthResponse {
        success: true,
        message: "Login successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles user logout.
///
/// Always succeeds: a missing or unknown session is already logged out, and a
/// store failure still clears the client cookie.
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Response {
    if let Some(token) = extract_session_token(&cookies) {
        match auth_service::invalidate(&state, &token).await {
            Ok(()) => tracing::info!("✅ Session invalidated"),
            Err(e) => tracing::error!("❌ Failed to invalidate session: {}", e),
        }
    }

    let mut session_cookie = Cookie::new(SESSION_COOKIE, "");
    session_cookie.set_max_age(Duration::seconds(0));
    session_cookie.set_path("/");
    cookies.remove(session_cookie);

    let response = AuthResponse {
        success: true,
        message: "Logout successful".to_string(),
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// Returns the logged-in user.
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<MeResponse>> {
    let user = auth_service::current_user(&state, &session).await?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_empty() {
        let payload: CredentialsRequest = serde_json::from_str("{}").unwrap();
        assert!(payload.email.is_empty());
        assert!(payload.password.is_empty());
    }

    #[test]
    fn form_field_name_is_accepted() {
        let payload: CredentialsRequest =
            serde_json::from_str(r#"{"email":"a@x.com","pass":"pw1"}"#).unwrap();
        assert_eq!(payload.password, "pw1");
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = create_secure_cookie("token".to_string(), 7, true);
        assert_eq!(cookie.name(), "session_id");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::days(7)));

        let dev = create_secure_cookie("token".to_string(), 7, false);
        assert_eq!(dev.secure(), None);
    }
}
