use crate::application::auth_service::AuthService;
use crate::application::form_service::FormService;
use crate::domain::error::DomainError;
use crate::domain::prescription::PrescriptionForm;
use crate::presentation::middleware::AuthenticatedUser;
use actix_web::http::header;
use actix_web::{HttpResponse, ResponseError, web};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

pub struct AppState {
    pub auth: AuthService,
    pub forms: FormService,
    pub jwt_secret: String,
    pub dev_mode: bool,
}

// Uniform error body rendered to the end user
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    details: serde_json::Value,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized: {0}")]
    Auth(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Document generation failed: {0}")]
    Generation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_msg = self.to_string();

        let message = match self {
            ApiError::Validation(msg)
            | ApiError::Conflict(msg)
            | ApiError::Auth(msg)
            | ApiError::NotFound(msg)
            | ApiError::Generation(msg)
            | ApiError::Internal(msg) => msg.clone(),
        };

        match self {
            ApiError::Generation(_) | ApiError::Internal(_) => {
                error!(error = %error_msg, status = %status, "request failed")
            }
            _ => warn!(error = %error_msg, status = %status, "request rejected"),
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: error_msg,
            details: serde_json::json!({ "message": message }),
        })
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::Validation(msg)) => ApiError::Validation(msg.clone()),
            Some(DomainError::Conflict(msg)) => ApiError::Conflict(msg.clone()),
            Some(DomainError::Auth) => ApiError::Auth("incorrect credentials".to_string()),
            Some(DomainError::NotFound(msg)) => ApiError::NotFound(msg.clone()),
            Some(DomainError::Generation(msg)) => ApiError::Generation(msg.clone()),
            Some(DomainError::Internal(msg)) => ApiError::Internal(msg.clone()),
            None => ApiError::Internal(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
}

#[instrument]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn get_form(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let view = state.forms.snapshot(&user.username).await;
    Ok(HttpResponse::Ok().json(view))
}

#[instrument(skip(state, user, form), fields(username = %user.username))]
pub async fn update_form(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    form: web::Json<PrescriptionForm>,
) -> Result<HttpResponse, ApiError> {
    let view = state
        .forms
        .update_form(&user.username, form.into_inner())
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(view))
}

#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn generate_document(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let view = state
        .forms
        .generate(&user.username)
        .await
        .map_err(ApiError::from)?;
    info!("document generated");
    Ok(HttpResponse::Ok().json(view))
}

#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn clear_form(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let view = state.forms.clear(&user.username).await;
    Ok(HttpResponse::Ok().json(view))
}

#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn download_document(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let document = state
        .forms
        .document(&user.username)
        .await
        .map_err(ApiError::from)?;
    info!(filename = %document.filename, size = document.bytes.len(), "document downloaded");
    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.filename),
        ))
        .body(document.bytes))
}
