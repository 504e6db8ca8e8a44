use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Incorrect credentials")]
    Auth,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Document generation failed: {0}")]
    Generation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
