use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::entry::{EntryId, EntryPage, NewEntry},
    models::session::Session,
    services::vault as vault_service,
    state::AppState,
};

/// Query parameters for listing entries.
#[derive(Deserialize, Debug, Default)]
pub struct ListQuery {
    /// Kept as text so that garbage falls back to the first page.
    pub page: Option<String>,
}

impl ListQuery {
    /// The requested page, defaulting to 1 when absent, non-numeric or below 1.
    pub fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|page| *page >= 1)
            .unwrap_or(1)
    }
}

/// The request payload for adding an entry.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct AddEntryRequest {
    pub site: String,
    pub link: Option<String>,
    #[serde(alias = "uname")]
    pub username: String,
    #[serde(alias = "pw")]
    pub password: String,
}

/// The response payload for a created entry.
#[derive(Serialize)]
pub struct CreatedResponse {
    pub id: EntryId,
}

/// Lists one page of the caller's entries.
#[axum::debug_handler]
pub async fn list_entries(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<ListQuery>,
) -> Result<Json<EntryPage>> {
    let page = vault_service::list_entries(&state, session.user_id, query.page()).await?;
    Ok(Json(page))
}

/// Adds an entry to the caller's vault.
#[axum::debug_handler]
pub async fn add_entry(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: std::result::Result<Json<AddEntryRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    let new_entry = NewEntry {
        site: payload.site,
        link: payload.link,
        username: payload.username,
        password: payload.password,
    };

    let id = vault_service::create_entry(&state, session.user_id, new_entry).await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })).into_response())
}

/// Deletes one of the caller's entries.
///
/// Ids that do not parse cannot name an entry, so they are the same no-op as
/// an unknown id.
#[axum::debug_handler]
pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(entry_id): Path<String>,
) -> Result<StatusCode> {
    if let Ok(id) = entry_id.parse::<EntryId>() {
        vault_service::delete_entry(&state, session.user_id, id).await?;
    }
    Ok(StatusCode::OK)
}

/// Returns the decrypted password of one of the caller's entries as plain text.
#[axum::debug_handler]
pub async fn reveal_password(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(entry_id): Path<String>,
) -> Result<Response> {
    let id = entry_id.parse::<EntryId>().map_err(|_| AppError::NotFound)?;

    let password = vault_service::reveal_password(&state, session.user_id, id).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        password.as_str().to_owned(),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>) -> ListQuery {
        ListQuery {
            page: page.map(str::to_string),
        }
    }

    #[test]
    fn page_parsing_is_lenient() {
        assert_eq!(query(None).page(), 1);
        assert_eq!(query(Some("2")).page(), 2);
        assert_eq!(query(Some("abc")).page(), 1);
        assert_eq!(query(Some("0")).page(), 1);
        assert_eq!(query(Some("-3")).page(), 1);
        assert_eq!(query(Some("")).page(), 1);
    }

    #[test]
    fn entry_form_names_are_accepted() {
        let payload: AddEntryRequest =
            serde_json::from_str(r#"{"site":"Bank","uname":"alice","pw":"secret123"}"#).unwrap();
        assert_eq!(payload.username, "alice");
        assert_eq!(payload.password, "secret123");
        assert_eq!(payload.link, None);
    }

    #[test]
    fn missing_entry_fields_default_to_empty() {
        let payload: AddEntryRequest = serde_json::from_str(r#"{"site":"Bank"}"#).unwrap();
        assert!(payload.username.is_empty());
        assert!(payload.password.is_empty());
    }
}
