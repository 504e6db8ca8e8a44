use crate::domain::user::UserRecord;
use anyhow::Result;
use async_trait::async_trait;

/// Credential persistence contract shared by every backend (flat file,
/// SQLite, remote sheet, in-memory).
///
/// `save` has insert-or-replace semantics: registration inserts a new record
/// and a password change rewrites the existing one. Backends rewrite their
/// store wholesale on mutation; concurrent writers can race and the last
/// write wins.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn save(&self, record: UserRecord) -> Result<()>;
    async fn find(&self, username: &str) -> Result<Option<UserRecord>>;
}
