use crate::domain::store::CredentialStore;
use crate::domain::user::UserRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Flat-file backend: a JSON object mapping username to the stored fields,
/// rewritten wholesale on every mutation. The wire keys (`password`,
/// `nombre`, `apellido`) are the historical format; existing deployments
/// carry files in it, so they must not change.
pub struct FileCredentialStore {
    path: PathBuf,
    // serializes writers within this process; cross-process races stay
    // possible and the last write wins
    write_lock: Mutex<()>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredUser {
    password: String,
    nombre: String,
    apellido: String,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, StoredUser>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("malformed user file {}", self.path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => {
                Err(err).with_context(|| format!("cannot read user file {}", self.path.display()))
            }
        }
    }

    async fn persist(&self, users: &BTreeMap<String, StoredUser>) -> Result<()> {
        let raw = serde_json::to_string_pretty(users)?;
        tokio::fs::write(&self.path, raw)
            .await
            .with_context(|| format!("cannot write user file {}", self.path.display()))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    #[instrument(skip(self, record), fields(username = %record.username))]
    async fn save(&self, record: UserRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load().await?;
        users.insert(
            record.username,
            StoredUser {
                password: record.password_hash,
                nombre: record.first_name,
                apellido: record.last_name,
            },
        );
        self.persist(&users).await?;
        debug!(total = users.len(), "user file rewritten");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, username: &str) -> Result<Option<UserRecord>> {
        let users = self.load().await?;
        Ok(users.get(username).map(|stored| UserRecord {
            username: username.to_string(),
            password_hash: stored.password.clone(),
            first_name: stored.nombre.clone(),
            last_name: stored.apellido.clone(),
        }))
    }
}
