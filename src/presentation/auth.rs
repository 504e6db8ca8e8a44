use crate::domain::user::{ChangePasswordRequest, LoginRequest, RegisterRequest, UserProfile};
use crate::presentation::handlers::{ApiError, AppState};
use crate::presentation::middleware::AuthenticatedUser;
use actix_web::{HttpResponse, web};
use serde::Serialize;
use tracing::{info, instrument};

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserProfile,
}

#[instrument(skip(state, req), fields(username = %req.username))]
pub async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let profile = state
        .auth
        .register(req.into_inner())
        .await
        .map_err(ApiError::from)?;
    info!(username = %profile.username, "user registered");
    Ok(HttpResponse::Created().json(profile))
}

#[instrument(skip(state, req), fields(username = %req.username))]
pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let (user, access_token) = state
        .auth
        .login(req.into_inner())
        .await
        .map_err(ApiError::from)?;
    info!(username = %user.username, "login successful");
    Ok(HttpResponse::Ok().json(LoginResponse { access_token, user }))
}

#[instrument(skip(state, user, req), fields(username = %user.username))]
pub async fn change_password(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = req.into_inner();
    state
        .auth
        .change_password(&user.username, &req.old_password, &req.new_password)
        .await
        .map_err(ApiError::from)?;
    info!("password changed");
    Ok(HttpResponse::NoContent().finish())
}

/// Tokens are not revocable (there is no server-side token store); logout
/// drops the form session and the client discards its token.
#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn logout(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    state.forms.close_session(&user.username).await;
    info!("session closed");
    Ok(HttpResponse::NoContent().finish())
}
