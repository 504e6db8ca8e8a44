use crate::domain::error::DomainError;
use crate::domain::store::CredentialStore;
use crate::domain::user::{LoginRequest, RegisterRequest, UserProfile, UserRecord};
use crate::infrastructure::security::{generate_token, hash_password, verify_password};
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

const MIN_USERNAME_CHARS: usize = 3;
const MIN_PASSWORD_CHARS: usize = 6;

/// Register / login / password change against whichever credential backend
/// the deployment selected.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, jwt_secret: String) -> Self {
        Self { store, jwt_secret }
    }

    #[instrument(skip(self, req), fields(username = %req.username))]
    pub async fn register(&self, req: RegisterRequest) -> Result<UserProfile> {
        if req.username.chars().count() < MIN_USERNAME_CHARS {
            return Err(DomainError::Validation(format!(
                "username must be at least {MIN_USERNAME_CHARS} characters"
            ))
            .into());
        }
        if req.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(DomainError::Validation(format!(
                "password must be at least {MIN_PASSWORD_CHARS} characters"
            ))
            .into());
        }
        if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
            return Err(
                DomainError::Validation("first name and last name are required".to_string()).into(),
            );
        }

        if self.store.find(&req.username).await?.is_some() {
            warn!("registration rejected, username taken");
            return Err(DomainError::Conflict("user already exists".to_string()).into());
        }

        let record = UserRecord {
            username: req.username,
            password_hash: hash_password(&req.password),
            first_name: req.first_name,
            last_name: req.last_name,
        };
        self.store.save(record.clone()).await?;

        info!("user registered");
        Ok(record.profile())
    }

    /// An absent user and a wrong password fail identically.
    #[instrument(skip(self, req), fields(username = %req.username))]
    pub async fn login(&self, req: LoginRequest) -> Result<(UserProfile, String)> {
        if req.username.is_empty() || req.password.is_empty() {
            return Err(DomainError::Validation(
                "username and password are required".to_string(),
            )
            .into());
        }

        let record = self.store.find(&req.username).await?.ok_or_else(|| {
            warn!("login failed, unknown username");
            DomainError::Auth
        })?;

        if !verify_password(&req.password, &record.password_hash) {
            warn!("login failed, digest mismatch");
            return Err(DomainError::Auth.into());
        }

        let profile = record.profile();
        let token = generate_token(&profile, &self.jwt_secret).map_err(|e| {
            error!(error = %e, "failed to issue token");
            DomainError::Internal(format!("failed to issue token: {e}"))
        })?;

        info!("login successful");
        Ok((profile, token))
    }

    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        if new_password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(DomainError::Validation(format!(
                "new password must be at least {MIN_PASSWORD_CHARS} characters"
            ))
            .into());
        }

        let record = self.store.find(username).await?.ok_or(DomainError::Auth)?;
        if !verify_password(old_password, &record.password_hash) {
            warn!("password change rejected, current password incorrect");
            return Err(DomainError::Auth.into());
        }

        self.store
            .save(UserRecord {
                password_hash: hash_password(new_password),
                ..record
            })
            .await?;

        info!("password changed");
        Ok(())
    }
}
