use crate::domain::store::CredentialStore;
use crate::domain::user::UserRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Remote tabular backend: the endpoint serves the whole user table as a
/// JSON array of rows and accepts the full row set back on POST. Same four
/// columns as the other backends; saving rewrites the table wholesale, so
/// two writers can race exactly like the flat file.
pub struct SheetCredentialStore {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetRow {
    pub username: String,
    pub password: String,
    pub nombre: String,
    pub apellido: String,
}

impl From<UserRecord> for SheetRow {
    fn from(record: UserRecord) -> Self {
        Self {
            username: record.username,
            password: record.password_hash,
            nombre: record.first_name,
            apellido: record.last_name,
        }
    }
}

impl From<SheetRow> for UserRecord {
    fn from(row: SheetRow) -> Self {
        Self {
            username: row.username,
            password_hash: row.password,
            first_name: row.nombre,
            last_name: row.apellido,
        }
    }
}

impl SheetCredentialStore {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    async fn load_rows(&self) -> Result<Vec<SheetRow>> {
        self.client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .with_context(|| format!("cannot read user sheet at {}", self.url))?
            .json()
            .await
            .context("user sheet returned malformed rows")
    }

    async fn store_rows(&self, rows: &[SheetRow]) -> Result<()> {
        self.client
            .post(&self.url)
            .json(rows)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .with_context(|| format!("cannot write user sheet at {}", self.url))?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for SheetCredentialStore {
    #[instrument(skip(self, record), fields(username = %record.username))]
    async fn save(&self, record: UserRecord) -> Result<()> {
        let mut rows = self.load_rows().await?;
        let row = SheetRow::from(record);
        match rows.iter_mut().find(|r| r.username == row.username) {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
        self.store_rows(&rows).await?;
        debug!(total = rows.len(), "user sheet rewritten");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, username: &str) -> Result<Option<UserRecord>> {
        let rows = self.load_rows().await?;
        Ok(rows
            .into_iter()
            .find(|row| row.username == username)
            .map(UserRecord::from))
    }
}
