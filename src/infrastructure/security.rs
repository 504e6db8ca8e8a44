use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::domain::user::UserProfile;

// Long-lived tokens: there is no server-side session to expire, the client
// holds the token for the working day.
const TOKEN_TTL_SECS: usize = 12 * 3600;

/// Unsalted SHA-256 hex digest of the password.
///
/// This is the credential format the existing user stores hold (a single
/// digest round, no salt) and every backend depends on it staying exactly
/// this. It is not a KDF and is a poor choice for new deployments.
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    hash_password(password) == stored_hash
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    given_name: String,
    family_name: String,
    exp: usize,
    iat: usize,
}

pub fn generate_token(
    profile: &UserProfile,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0);

    let claims = Claims {
        sub: profile.username.clone(),
        given_name: profile.first_name.clone(),
        family_name: profile.last_name.clone(),
        exp: now + TOKEN_TTL_SECS,
        iat: now,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn validate_token(
    token: &str,
    secret: &str,
) -> Result<UserProfile, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 60;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;

    Ok(UserProfile {
        username: data.claims.sub,
        first_name: data.claims.given_name,
        last_name: data.claims.family_name,
    })
}
