use chrono::Utc;
use garde::Validate;
use zeroize::{Zeroize, Zeroizing};

use crate::{
    error::{AppError, Result},
    models::entry::{EntryId, EntryPage, NewEntry, VaultEntry},
    models::user::UserId,
    services::deadline::with_deadline,
    state::AppState,
};

/// Stores a new entry with its password sealed.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `owner` - The authenticated user.
/// * `new_entry` - Site, link, username and plaintext password.
///
/// # Returns
///
/// The id of the new entry. Nothing is stored if a required field is empty.
pub async fn create_entry(state: &AppState, owner: UserId, mut new_entry: NewEntry) -> Result<EntryId> {
    if let Err(report) = new_entry.validate() {
        new_entry.password.zeroize();
        return Err(report.into());
    }

    let cipher = state.cipher.encrypt(new_entry.password.as_bytes());
    new_entry.password.zeroize();

    let entry = VaultEntry {
        id: EntryId::new(),
        owner_id: owner,
        site: new_entry.site,
        link: new_entry.link.filter(|link| !link.trim().is_empty()),
        username: new_entry.username,
        cipher: cipher?,
        created_at: Utc::now(),
    };

    with_deadline(state.config.store_timeout, state.entries.insert(&entry)).await?;

    tracing::info!("✅ Entry {} created for user {}", entry.id, owner);
    Ok(entry.id)
}

/// Lists one page of the owner's entries, newest first, without secrets.
///
/// `page` below 1 is treated as 1. `total_pages` is never less than 1.
pub async fn list_entries(state: &AppState, owner: UserId, page: i64) -> Result<EntryPage> {
    let page = page.max(1);
    let page_size = state.config.page_size;
    let offset = (page - 1).saturating_mul(page_size);

    let total = with_deadline(state.config.store_timeout, state.entries.count(owner)).await?;
    let entries = with_deadline(
        state.config.store_timeout,
        state.entries.list(owner, page_size, offset),
    )
    .await?;

    let total_pages = ((total + page_size - 1) / page_size).max(1);

    Ok(EntryPage {
        entries,
        page,
        page_size,
        total,
        total_pages,
    })
}

/// Deletes one of the owner's entries. Absent or foreign ids are a silent no-op.
pub async fn delete_entry(state: &AppState, owner: UserId, id: EntryId) -> Result<()> {
    let removed = with_deadline(state.config.store_timeout, state.entries.delete(owner, id)).await?;

    if removed > 0 {
        tracing::info!("🗑️ Entry {} deleted by user {}", id, owner);
    } else {
        tracing::debug!("Delete of entry {} by user {} matched nothing", id, owner);
    }
    Ok(())
}

/// Decrypts the password of one of the owner's entries.
///
/// Fails with `AppError::NotFound` when the entry is absent or belongs to
/// someone else, and with `AppError::Integrity` when the stored blob does not
/// authenticate.
pub async fn reveal_password(state: &AppState, owner: UserId, id: EntryId) -> Result<Zeroizing<String>> {
    let entry = with_deadline(state.config.store_timeout, state.entries.find(owner, id))
        .await?
        .ok_or(AppError::NotFound)?;

    let password = state.cipher.decrypt_string(&entry.cipher).inspect_err(|_| {
        tracing::error!("❌ Entry {} failed integrity check", id);
    })?;

    tracing::debug!("🔓 Entry {} revealed to owner", id);
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::{MemoryEntryRepository, MemorySessionStore, MemoryUserRepository};
    use crate::test_support::{memory_state, test_config};
    use std::sync::Arc;

    fn new_entry(site: &str, username: &str, password: &str) -> NewEntry {
        NewEntry {
            site: site.to_string(),
            link: None,
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_reveal() {
        let state = memory_state();
        let owner = UserId::new();

        let id = create_entry(&state, owner, new_entry("Bank", "alice", "secret123")).await.unwrap();
        let password = reveal_password(&state, owner, id).await.unwrap();
        assert_eq!(password.as_str(), "secret123");
    }

    #[tokio::test]
    async fn test_stored_blob_is_not_plaintext() {
        let state = memory_state();
        let owner = UserId::new();

        let id = create_entry(&state, owner, new_entry("Bank", "alice", "secret123")).await.unwrap();
        let stored = state.entries.find(owner, id).await.unwrap().unwrap();
        assert!(!stored.cipher.contains("secret123"));
        assert_eq!(stored.cipher.len() % 4, 0);
    }

    #[tokio::test]
    async fn test_empty_required_fields_store_nothing() {
        let state = memory_state();
        let owner = UserId::new();

        for entry in [
            new_entry("", "alice", "pw"),
            new_entry("Bank", "", "pw"),
            new_entry("Bank", "alice", ""),
        ] {
            assert!(matches!(
                create_entry(&state, owner, entry).await,
                Err(AppError::Validation(_))
            ));
        }
        assert_eq!(state.entries.count(owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_blank_link_is_stored_as_absent() {
        let state = memory_state();
        let owner = UserId::new();
        let mut entry = new_entry("Bank", "alice", "pw");
        entry.link = Some("  ".to_string());

        create_entry(&state, owner, entry).await.unwrap();
        let page = list_entries(&state, owner, 1).await.unwrap();
        assert_eq!(page.entries[0].link, None);
    }

    #[tokio::test]
    async fn test_pagination_newest_first() {
        let state = memory_state();
        let owner = UserId::new();

        for i in 1..=25 {
            create_entry(&state, owner, new_entry(&format!("E{}", i), "u", "p")).await.unwrap();
        }

        let first = list_entries(&state, owner, 1).await.unwrap();
        assert_eq!(first.entries.len(), 20);
        assert_eq!(first.total, 25);
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.entries[0].site, "E25");
        assert_eq!(first.entries[19].site, "E6");

        let second = list_entries(&state, owner, 2).await.unwrap();
        assert_eq!(second.entries.len(), 5);
        assert_eq!(second.entries[0].site, "E5");
        assert_eq!(second.entries[4].site, "E1");

        let beyond = list_entries(&state, owner, 3).await.unwrap();
        assert!(beyond.entries.is_empty());
        assert_eq!(beyond.total_pages, 2);
    }

    #[tokio::test]
    async fn test_page_is_clamped_and_empty_vault_has_one_page() {
        let state = memory_state();
        let owner = UserId::new();

        let page = list_entries(&state, owner, -4).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 1);
    }

    #[tokio::test]
    async fn test_other_owner_gets_not_found() {
        let state = memory_state();
        let alice = UserId::new();
        let bob = UserId::new();

        let id = create_entry(&state, alice, new_entry("Bank", "alice", "pw")).await.unwrap();

        assert!(matches!(reveal_password(&state, bob, id).await, Err(AppError::NotFound)));
        assert!(matches!(
            reveal_password(&state, bob, EntryId::new()).await,
            Err(AppError::NotFound)
        ));
        assert!(list_entries(&state, bob, 1).await.unwrap().entries.is_empty());

        delete_entry(&state, bob, id).await.unwrap();
        assert!(reveal_password(&state, alice, id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_twice_is_noop() {
        let state = memory_state();
        let owner = UserId::new();
        let id = create_entry(&state, owner, new_entry("Bank", "alice", "pw")).await.unwrap();

        delete_entry(&state, owner, id).await.unwrap();
        delete_entry(&state, owner, id).await.unwrap();
        assert!(matches!(reveal_password(&state, owner, id).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_concurrent_deletes_both_succeed() {
        let state = memory_state();
        let owner = UserId::new();
        let id = create_entry(&state, owner, new_entry("Bank", "alice", "pw")).await.unwrap();

        let (a, b) = tokio::join!(
            delete_entry(&state, owner, id),
            delete_entry(&state, owner, id)
        );
        assert!(a.is_ok());
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_tampered_blob_is_integrity_error() {
        let entries = Arc::new(MemoryEntryRepository::new());
        let state = AppState::with_stores(
            &test_config(),
            Arc::new(MemoryUserRepository::new()),
            entries.clone(),
            Arc::new(MemorySessionStore::new()),
        )
        .unwrap();
        let owner = UserId::new();
        let id = create_entry(&state, owner, new_entry("Bank", "alice", "pw")).await.unwrap();

        assert!(entries.replace_cipher(id, "AAAA".to_string()).await);
        assert!(matches!(reveal_password(&state, owner, id).await, Err(AppError::Integrity)));

        let foreign = memory_state().cipher.encrypt(b"pw").unwrap();
        let mut other_key = test_config();
        other_key.vault_secret = zeroize::Zeroizing::new(b"a different secret".to_vec());
        let other_state = AppState::in_memory(&other_key).unwrap();
        let sealed_elsewhere = other_state.cipher.encrypt(b"pw").unwrap();

        // Same key as ours: opens. Different key: integrity failure.
        assert!(entries.replace_cipher(id, foreign).await);
        assert!(reveal_password(&state, owner, id).await.is_ok());
        assert!(entries.replace_cipher(id, sealed_elsewhere).await);
        assert!(matches!(reveal_password(&state, owner, id).await, Err(AppError::Integrity)));
    }
}
