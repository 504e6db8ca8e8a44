use anyhow::{Context, Result, bail};
use std::env;
use std::path::PathBuf;

/// Which credential backend to run. Exactly one is active per deployment;
/// all implement the same `CredentialStore` contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    File { path: PathBuf },
    Sqlite { path: PathBuf },
    Sheet { url: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub backend: StoreBackend,
    pub template_path: PathBuf,
    pub jwt_secret: String,
    /// Development shortcut: unauthenticated requests run as a placeholder
    /// identity instead of being rejected.
    pub dev_mode: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let backend = select_backend(
            &env::var("AUTH_BACKEND").unwrap_or_else(|_| "file".to_string()),
            env::var("USERS_FILE").ok(),
            env::var("USERS_DB").ok(),
            env::var("SHEET_URL").ok(),
        )?;

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            backend,
            template_path: env::var("TEMPLATE_PATH")
                .unwrap_or_else(|_| "modeloReceta.pdf".to_string())
                .into(),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                tracing::warn!("JWT_SECRET not set, using the development default");
                "dev-secret-change-me".to_string()
            }),
            dev_mode: env::var("DEV_MODE")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }
}

fn select_backend(
    name: &str,
    users_file: Option<String>,
    users_db: Option<String>,
    sheet_url: Option<String>,
) -> Result<StoreBackend> {
    match name {
        "file" => Ok(StoreBackend::File {
            path: users_file.unwrap_or_else(|| "users.json".to_string()).into(),
        }),
        "sqlite" => Ok(StoreBackend::Sqlite {
            path: users_db.unwrap_or_else(|| "users.db".to_string()).into(),
        }),
        "sheet" => Ok(StoreBackend::Sheet {
            url: sheet_url.context("SHEET_URL must be set when AUTH_BACKEND=sheet")?,
        }),
        other => bail!("unknown AUTH_BACKEND '{other}' (expected file, sqlite or sheet)"),
    }
}
