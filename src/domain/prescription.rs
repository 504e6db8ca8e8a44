use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[default]
    Prescription,
    Notes,
}

/// The form a practitioner fills in for one document. Transient: it lives in
/// the session store for the duration of a login and is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionForm {
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub date: NaiveDate,
    pub diagnosis: String,
    pub document_kind: DocumentKind,
    pub body_text: String,
}

impl PrescriptionForm {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            patient_first_name: String::new(),
            patient_last_name: String::new(),
            date,
            diagnosis: String::new(),
            document_kind: DocumentKind::default(),
            body_text: String::new(),
        }
    }

    /// A form converts into a document only when every required text field
    /// is non-empty.
    pub fn validate(&self) -> Result<(), DomainError> {
        let missing = |field: &str| DomainError::Validation(format!("{field} is required"));
        if self.patient_first_name.trim().is_empty() {
            return Err(missing("patient first name"));
        }
        if self.patient_last_name.trim().is_empty() {
            return Err(missing("patient last name"));
        }
        if self.diagnosis.trim().is_empty() {
            return Err(missing("diagnosis"));
        }
        if self.body_text.trim().is_empty() {
            return Err(missing("document body"));
        }
        Ok(())
    }

    /// Download name contract: `Receta_<apellido>_<nombre>_<YYYYMMDD>.pdf`.
    pub fn download_filename(&self) -> String {
        format!(
            "Receta_{}_{}_{}.pdf",
            self.patient_last_name,
            self.patient_first_name,
            self.date.format("%Y%m%d")
        )
    }
}

/// A filled, serialized PDF. `flattened` is false when the template carried
/// no AcroForm and the field values were left interactive (degraded but
/// accepted output).
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub flattened: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> PrescriptionForm {
        PrescriptionForm {
            patient_first_name: "Juan".to_string(),
            patient_last_name: "Pérez".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 11, 18).unwrap(),
            diagnosis: "Gripe".to_string(),
            document_kind: DocumentKind::Prescription,
            body_text: "Rp./\nParacetamol".to_string(),
        }
    }

    #[test]
    fn complete_form_validates() {
        assert!(filled_form().validate().is_ok());
    }

    #[test]
    fn each_required_field_is_checked() {
        let wipes: [fn(&mut PrescriptionForm); 4] = [
            |f| f.patient_first_name.clear(),
            |f| f.patient_last_name.clear(),
            |f| f.diagnosis.clear(),
            |f| f.body_text.clear(),
        ];
        for wipe in wipes {
            let mut form = filled_form();
            wipe(&mut form);
            let err = form.validate().unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
    }

    #[test]
    fn whitespace_only_fields_are_rejected() {
        let mut form = filled_form();
        form.diagnosis = "   ".to_string();
        assert!(form.validate().is_err());
    }

    #[test]
    fn download_filename_pattern() {
        assert_eq!(
            filled_form().download_filename(),
            "Receta_Pérez_Juan_20251118.pdf"
        );
    }
}
