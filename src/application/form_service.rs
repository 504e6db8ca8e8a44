use crate::document::filler::{self, FieldValues};
use crate::document::formatter::join_marker_lines;
use crate::domain::error::DomainError;
use crate::domain::prescription::{GeneratedDocument, PrescriptionForm};
use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Fields are editable; no document exists yet.
    Editing,
    /// A document was generated; fields are read-only until cleared.
    Generated,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentMeta {
    pub filename: String,
    pub size: usize,
    pub flattened: bool,
}

/// What the client sees of a session: the form, which phase it is in, and
/// metadata of the generated document when one exists.
#[derive(Debug, Clone, Serialize)]
pub struct FormView {
    pub phase: SessionPhase,
    pub read_only: bool,
    pub form: PrescriptionForm,
    pub document: Option<DocumentMeta>,
}

#[derive(Debug)]
struct FormSession {
    form: PrescriptionForm,
    document: Option<GeneratedDocument>,
}

impl FormSession {
    fn fresh() -> Self {
        Self {
            form: PrescriptionForm::empty(Local::now().date_naive()),
            document: None,
        }
    }

    fn view(&self) -> FormView {
        let generated = self.document.is_some();
        FormView {
            phase: if generated {
                SessionPhase::Generated
            } else {
                SessionPhase::Editing
            },
            read_only: generated,
            form: self.form.clone(),
            document: self.document.as_ref().map(|doc| DocumentMeta {
                filename: doc.filename.clone(),
                size: doc.bytes.len(),
                flattened: doc.flattened,
            }),
        }
    }
}

/// Session-scoped form state, one entry per logged-in user. A username with
/// no entry is logged out; the first authenticated access opens a fresh
/// editing session.
pub struct FormService {
    sessions: RwLock<HashMap<String, FormSession>>,
    template_path: PathBuf,
}

impl FormService {
    pub fn new(template_path: PathBuf) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            template_path,
        }
    }

    #[instrument(skip(self))]
    pub async fn snapshot(&self, username: &str) -> FormView {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(username.to_string())
            .or_insert_with(FormSession::fresh)
            .view()
    }

    /// Replaces the form fields. Refused while a generated document exists:
    /// the form is read-only until cleared.
    #[instrument(skip(self, form))]
    pub async fn update_form(&self, username: &str, form: PrescriptionForm) -> Result<FormView> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(username.to_string())
            .or_insert_with(FormSession::fresh);
        if session.document.is_some() {
            warn!("edit rejected, document already generated");
            return Err(DomainError::Validation(
                "a document was already generated; clear the form to edit again".to_string(),
            )
            .into());
        }
        session.form = form;
        Ok(session.view())
    }

    /// Validates the form, formats the body and fills the template.
    /// On failure the session stays in the editing phase with no document.
    #[instrument(skip(self))]
    pub async fn generate(&self, username: &str) -> Result<FormView> {
        let form = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .entry(username.to_string())
                .or_insert_with(FormSession::fresh);
            if session.document.is_some() {
                return Err(DomainError::Validation(
                    "a document was already generated; clear the form first".to_string(),
                )
                .into());
            }
            session.form.validate()?;
            session.form.clone()
        };

        // The template fill runs outside the session lock. Two concurrent
        // submits can race; the last write wins, like the wholesale store
        // rewrites.
        let values = FieldValues {
            date: form.date.format("%d/%m/%Y").to_string(),
            patient: format!("{} {}", form.patient_first_name, form.patient_last_name),
            diagnosis: form.diagnosis.clone(),
            body: join_marker_lines(&form.body_text),
        };
        let filled = filler::fill_template(&self.template_path, &values)?;

        let document = GeneratedDocument {
            filename: form.download_filename(),
            bytes: filled.bytes,
            flattened: filled.flattened,
        };
        info!(
            filename = %document.filename,
            size = document.bytes.len(),
            flattened = document.flattened,
            "document generated"
        );

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(username.to_string())
            .or_insert_with(FormSession::fresh);
        session.document = Some(document);
        Ok(session.view())
    }

    /// Back to an empty editing form; the generated document is discarded.
    #[instrument(skip(self))]
    pub async fn clear(&self, username: &str) -> FormView {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(username.to_string())
            .or_insert_with(FormSession::fresh);
        *session = FormSession::fresh();
        session.view()
    }

    #[instrument(skip(self))]
    pub async fn document(&self, username: &str) -> Result<GeneratedDocument> {
        let sessions = self.sessions.read().await;
        sessions
            .get(username)
            .and_then(|session| session.document.clone())
            .ok_or_else(|| DomainError::NotFound("no generated document".to_string()).into())
    }

    /// Logout: the whole session entry goes away.
    #[instrument(skip(self))]
    pub async fn close_session(&self, username: &str) {
        self.sessions.write().await.remove(username);
    }
}
