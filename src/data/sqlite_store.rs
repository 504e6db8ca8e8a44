use crate::domain::store::CredentialStore;
use crate::domain::user::UserRecord;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};

/// SQLite backend. Schema is the historical one: the `password` column holds
/// the SHA-256 hex digest, `nombre`/`apellido` the profile names.
pub struct SqliteCredentialStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    password TEXT NOT NULL,
    nombre TEXT NOT NULL,
    apellido TEXT NOT NULL
)";

impl SqliteCredentialStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("cannot open user database {}", path.display()))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("user database mutex poisoned"))
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    #[instrument(skip(self, record), fields(username = %record.username))]
    async fn save(&self, record: UserRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (username, password, nombre, apellido)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(username) DO UPDATE SET
                 password = excluded.password,
                 nombre = excluded.nombre,
                 apellido = excluded.apellido",
            params![
                record.username,
                record.password_hash,
                record.first_name,
                record.last_name
            ],
        )?;
        debug!("credential row upserted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, username: &str) -> Result<Option<UserRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT password, nombre, apellido FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(UserRecord {
                        username: username.to_string(),
                        password_hash: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }
}
