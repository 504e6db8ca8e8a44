pub mod application;
pub mod data;
pub mod document;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
