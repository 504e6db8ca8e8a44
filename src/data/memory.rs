use crate::domain::store::CredentialStore;
use crate::domain::user::UserRecord;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

/// Process-local credential store. Not a deployment backend: it backs unit
/// and integration tests where a file or database would only add noise.
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    records: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct read of the stored record, for asserting on persisted hashes.
    pub async fn raw_record(&self, username: &str) -> Option<UserRecord> {
        self.records.read().await.get(username).cloned()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    #[instrument(skip(self, record), fields(username = %record.username))]
    async fn save(&self, record: UserRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.username.clone(), record);
        debug!("credential record saved");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, username: &str) -> Result<Option<UserRecord>> {
        let records = self.records.read().await;
        let record = records.get(username).cloned();
        trace!(found = record.is_some(), "credential lookup");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(username: &str, hash: &str) -> UserRecord {
        UserRecord {
            username: username.to_string(),
            password_hash: hash.to_string(),
            first_name: "Ana".to_string(),
            last_name: "Sosa".to_string(),
        }
    }

    #[tokio::test]
    async fn save_then_find_returns_the_record() {
        let store = InMemoryCredentialStore::new();
        store.save(record("ana", "h1")).await.unwrap();

        let found = store.find("ana").await.unwrap().unwrap();
        assert_eq!(found.username, "ana");
        assert_eq!(found.password_hash, "h1");
    }

    #[tokio::test]
    async fn find_unknown_username_returns_none() {
        let store = InMemoryCredentialStore::new();
        assert!(store.find("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_replaces_an_existing_record() {
        let store = InMemoryCredentialStore::new();
        store.save(record("ana", "old")).await.unwrap();
        store.save(record("ana", "new")).await.unwrap();

        let found = store.find("ana").await.unwrap().unwrap();
        assert_eq!(found.password_hash, "new");
    }

    #[tokio::test]
    async fn lookup_is_case_sensitive() {
        let store = InMemoryCredentialStore::new();
        store.save(record("Ana", "h")).await.unwrap();
        assert!(store.find("ana").await.unwrap().is_none());
    }
}
