use chrono::Utc;
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::{
    crypto::password::CredentialHasher,
    crypto::token::generate_session_token,
    error::{AppError, Result},
    models::session::Session,
    models::user::{User, UserId},
    services::deadline::with_deadline,
    state::AppState,
    validation::auth::validate_credentials,
};

/// Runs an Argon2 call on the blocking pool so it does not stall the runtime.
async fn run_hasher<T, F>(hasher: &Arc<CredentialHasher>, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&CredentialHasher) -> T + Send + 'static,
{
    let hasher = Arc::clone(hasher);
    tokio::task::spawn_blocking(move || job(&hasher))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))
}

/// Creates a new user.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `email` - The login name. Stored and matched exactly.
/// * `password` - The plaintext password.
///
/// # Returns
///
/// A `Result` containing the created `User`, or `AppError::Conflict` if the
/// email is taken.
pub async fn register(state: &AppState, email: &str, password: &str) -> Result<User> {
    validate_credentials(email, password)?;

    tracing::debug!("🔐 Creating user");
    let secret = Zeroizing::new(password.to_string());
    let password_hash = run_hasher(&state.hasher, move |hasher| hasher.hash(&secret)).await??;

    let user = User {
        id: UserId::new(),
        email: email.to_string(),
        password_hash,
        created_at: Utc::now(),
    };

    with_deadline(state.config.store_timeout, state.users.create(&user)).await?;

    tracing::info!("✅ User created with ID: {}", user.id);
    Ok(user)
}

/// Authenticates a user and opens a session.
///
/// # Returns
///
/// The opaque session token and the stored `Session`. An unknown email and a
/// wrong password both yield `AppError::InvalidCredentials`.
pub async fn authenticate(state: &AppState, email: &str, password: &str) -> Result<(String, Session)> {
    if validate_credentials(email, password).is_err() {
        return Err(AppError::InvalidCredentials);
    }

    let user = with_deadline(state.config.store_timeout, state.users.find_by_email(email)).await?;

    let secret = Zeroizing::new(password.to_string());
    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let verified = run_hasher(&state.hasher, move |hasher| match stored_hash {
        Some(hash) => hasher.verify(&secret, &hash),
        None => hasher.verify_decoy(&secret),
    })
    .await?;

    let user = match user {
        Some(user) if verified => user,
        _ => return Err(AppError::InvalidCredentials),
    };

    let now = Utc::now();
    let session = Session {
        user_id: user.id,
        created_at: now,
        expires_at: now + state.config.session_duration(),
    };

    let token = generate_session_token();
    with_deadline(state.config.store_timeout, state.sessions.create(&token, &session)).await?;

    tracing::info!("✅ User authenticated: {}", user.id);
    Ok((token, session))
}

/// Resolves the session behind a token.
///
/// Missing, unknown and expired tokens are all `AppError::Unauthenticated`.
/// Expired sessions are removed on sight.
pub async fn require_session(state: &AppState, token: Option<&str>) -> Result<Session> {
    let token = token.ok_or(AppError::Unauthenticated)?;

    let session = with_deadline(state.config.store_timeout, state.sessions.get(token))
        .await?
        .ok_or(AppError::Unauthenticated)?;

    if session.is_expired_at(Utc::now()) {
        tracing::warn!("❌ Session expired for user: {}", session.user_id);
        with_deadline(state.config.store_timeout, state.sessions.invalidate(token)).await?;
        return Err(AppError::Unauthenticated);
    }

    Ok(session)
}

/// Destroys the session behind a token. Idempotent.
pub async fn invalidate(state: &AppState, token: &str) -> Result<()> {
    with_deadline(state.config.store_timeout, state.sessions.invalidate(token)).await
}

/// Returns the user a session belongs to.
pub async fn current_user(state: &AppState, session: &Session) -> Result<User> {
    with_deadline(state.config.store_timeout, state.users.find_by_id(session.user_id))
        .await?
        .ok_or(AppError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_state;
    use chrono::Duration;

    #[tokio::test]
    async fn test_register_then_login() {
        let state = memory_state();
        register(&state, "a@x.com", "pw1").await.unwrap();

        let (token, session) = authenticate(&state, "a@x.com", "pw1").await.unwrap();
        let resolved = require_session(&state, Some(&token)).await.unwrap();
        assert_eq!(resolved.user_id, session.user_id);
    }

    #[tokio::test]
    async fn test_register_rejects_missing_fields_and_duplicates() {
        let state = memory_state();
        assert!(matches!(register(&state, "", "pw").await, Err(AppError::Validation(_))));
        assert!(matches!(register(&state, "a@x.com", "").await, Err(AppError::Validation(_))));

        register(&state, "a@x.com", "pw1").await.unwrap();
        assert!(matches!(
            register(&state, "a@x.com", "other").await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_user_and_wrong_password_are_indistinguishable() {
        let state = memory_state();
        register(&state, "a@x.com", "pw1").await.unwrap();

        let wrong_password = authenticate(&state, "a@x.com", "wrong").await.unwrap_err();
        let unknown_user = authenticate(&state, "b@x.com", "pw1").await.unwrap_err();
        let wrong_case = authenticate(&state, "A@X.COM", "pw1").await.unwrap_err();

        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_user, AppError::InvalidCredentials));
        assert!(matches!(wrong_case, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_require_session_rejects_missing_and_unknown_tokens() {
        let state = memory_state();
        assert!(matches!(require_session(&state, None).await, Err(AppError::Unauthenticated)));
        assert!(matches!(
            require_session(&state, Some("made-up")).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let state = memory_state();
        register(&state, "a@x.com", "pw1").await.unwrap();
        let (token, _) = authenticate(&state, "a@x.com", "pw1").await.unwrap();

        invalidate(&state, &token).await.unwrap();
        invalidate(&state, &token).await.unwrap();
        assert!(matches!(
            require_session(&state, Some(&token)).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_removed() {
        let state = memory_state();
        let now = Utc::now();
        let session = Session {
            user_id: UserId::new(),
            created_at: now - Duration::days(8),
            expires_at: now - Duration::days(1),
        };
        state.sessions.create("old-token", &session).await.unwrap();

        assert!(matches!(
            require_session(&state, Some("old-token")).await,
            Err(AppError::Unauthenticated)
        ));
        assert!(state.sessions.get("old-token").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_logins_all_succeed() {
        let state = memory_state();
        register(&state, "a@x.com", "pw1").await.unwrap();

        let logins = (0..8).map(|_| {
            let state = state.clone();
            tokio::spawn(async move { authenticate(&state, "a@x.com", "pw1").await })
        });

        let mut user_ids = Vec::new();
        for login in logins {
            let (_, session) = login.await.unwrap().unwrap();
            user_ids.push(session.user_id);
        }
        assert_eq!(user_ids.len(), 8);
        assert!(user_ids.iter().all(|id| *id == user_ids[0]));
    }

    #[tokio::test]
    async fn test_current_user_returns_email() {
        let state = memory_state();
        register(&state, "a@x.com", "pw1").await.unwrap();
        let (_, session) = authenticate(&state, "a@x.com", "pw1").await.unwrap();

        let user = current_user(&state, &session).await.unwrap();
        assert_eq!(user.email, "a@x.com");
    }
}
