//! Game identity to wallet links.
//!
//! The service never owns this data; callers hand it an [`IdentityStore`].
//! [`InMemoryIdentityStore`] backs tests and local runs.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A game account and the wallet currently linked to it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedIdentity {
    pub uuid: String,
    pub wallet_address: Option<String>,
    /// Unix seconds.
    pub created_at: u64,
    pub updated_at: u64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity {0} not found")]
    NotFound(String),

    #[error("wallet {wallet} is already linked to {uuid}")]
    DuplicateWallet { wallet: String, uuid: String },

    #[error("store unavailable: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

pub trait IdentityStore: Send + Sync {
    fn find(&self, uuid: &str) -> Result<Option<LinkedIdentity>, IdentityError>;

    fn find_by_wallet(&self, wallet: &str) -> Result<Option<LinkedIdentity>, IdentityError>;

    fn list(&self) -> Result<Vec<LinkedIdentity>, IdentityError>;

    /// Create the identity on first link, otherwise replace its wallet.
    ///
    /// # Errors
    ///
    /// [`IdentityError::DuplicateWallet`] if another identity holds `wallet`.
    fn link(&self, uuid: &str, wallet: &str) -> Result<LinkedIdentity, IdentityError>;

    /// Clear the wallet. The identity itself is kept.
    fn unlink(&self, uuid: &str) -> Result<LinkedIdentity, IdentityError>;
}

// ---------------------------------------------------------------------------
// InMemoryIdentityStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryIdentityStore {
    entries: RwLock<HashMap<String, LinkedIdentity>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> IdentityError {
    IdentityError::Backend("identity map lock poisoned".into())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl IdentityStore for InMemoryIdentityStore {
    fn find(&self, uuid: &str) -> Result<Option<LinkedIdentity>, IdentityError> {
        Ok(self.entries.read().map_err(poisoned)?.get(uuid).cloned())
    }

    fn find_by_wallet(&self, wallet: &str) -> Result<Option<LinkedIdentity>, IdentityError> {
        let map = self.entries.read().map_err(poisoned)?;
        Ok(map
            .values()
            .find(|id| id.wallet_address.as_deref() == Some(wallet))
            .cloned())
    }

    fn list(&self) -> Result<Vec<LinkedIdentity>, IdentityError> {
        let map = self.entries.read().map_err(poisoned)?;
        let mut all: Vec<_> = map.values().cloned().collect();
        all.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        Ok(all)
    }

    fn link(&self, uuid: &str, wallet: &str) -> Result<LinkedIdentity, IdentityError> {
        let mut map = self.entries.write().map_err(poisoned)?;

        if let Some(holder) = map
            .values()
            .find(|id| id.uuid != uuid && id.wallet_address.as_deref() == Some(wallet))
        {
            return Err(IdentityError::DuplicateWallet {
                wallet: wallet.to_string(),
                uuid: holder.uuid.clone(),
            });
        }

        let now = now_secs();
        let entry = map.entry(uuid.to_string()).or_insert_with(|| LinkedIdentity {
            uuid: uuid.to_string(),
            wallet_address: None,
            created_at: now,
            updated_at: now,
        });
        entry.wallet_address = Some(wallet.to_string());
        entry.updated_at = now;
        Ok(entry.clone())
    }

    fn unlink(&self, uuid: &str) -> Result<LinkedIdentity, IdentityError> {
        let mut map = self.entries.write().map_err(poisoned)?;
        let entry = map
            .get_mut(uuid)
            .ok_or_else(|| IdentityError::NotFound(uuid.to_string()))?;
        entry.wallet_address = None;
        entry.updated_at = now_secs();
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET_A: &str = "4pw5VSwn2Sec4SjMhbUSBcVjS51rG34Ho1WuHQgxqVd2";
    const WALLET_B: &str = "22azTH3E48Dxqj4a4xwq4caszCFr8ihrwhGGadt1KSRH";

    #[test]
    fn first_link_creates_identity() {
        let store = InMemoryIdentityStore::new();
        assert_eq!(store.find("steve").unwrap(), None);

        let linked = store.link("steve", WALLET_A).unwrap();
        assert_eq!(linked.wallet_address.as_deref(), Some(WALLET_A));
        assert_eq!(store.find("steve").unwrap(), Some(linked));
    }

    #[test]
    fn relink_replaces_wallet_and_keeps_creation_time() {
        let store = InMemoryIdentityStore::new();
        let first = store.link("steve", WALLET_A).unwrap();
        let second = store.link("steve", WALLET_B).unwrap();

        assert_eq!(second.wallet_address.as_deref(), Some(WALLET_B));
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(store.find_by_wallet(WALLET_A).unwrap(), None);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn relinking_same_wallet_to_same_identity_is_allowed() {
        let store = InMemoryIdentityStore::new();
        store.link("steve", WALLET_A).unwrap();
        assert!(store.link("steve", WALLET_A).is_ok());
    }

    #[test]
    fn wallet_cannot_be_shared() {
        let store = InMemoryIdentityStore::new();
        store.link("steve", WALLET_A).unwrap();
        assert_eq!(
            store.link("alex", WALLET_A).unwrap_err(),
            IdentityError::DuplicateWallet {
                wallet: WALLET_A.into(),
                uuid: "steve".into()
            }
        );
    }

    #[test]
    fn unlink_keeps_identity() {
        let store = InMemoryIdentityStore::new();
        store.link("steve", WALLET_A).unwrap();

        let unlinked = store.unlink("steve").unwrap();
        assert_eq!(unlinked.wallet_address, None);
        assert!(store.find("steve").unwrap().is_some());
        assert_eq!(store.find_by_wallet(WALLET_A).unwrap(), None);
    }

    #[test]
    fn unlink_unknown_identity() {
        let store = InMemoryIdentityStore::new();
        assert_eq!(
            store.unlink("nobody").unwrap_err(),
            IdentityError::NotFound("nobody".into())
        );
    }

    #[test]
    fn list_is_sorted_by_uuid() {
        let store = InMemoryIdentityStore::new();
        store.link("zed", WALLET_A).unwrap();
        store.link("amy", WALLET_B).unwrap();
        let uuids: Vec<_> = store.list().unwrap().into_iter().map(|i| i.uuid).collect();
        assert_eq!(uuids, ["amy", "zed"]);
    }
}
