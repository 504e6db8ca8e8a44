pub mod auth_service;
pub mod form_service;
