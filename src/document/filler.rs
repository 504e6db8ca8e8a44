use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat, dictionary};
use std::path::Path;
use tracing::{debug, warn};

use crate::domain::error::DomainError;

/// Field names the template contract guarantees. The filler depends on these
/// exact names existing as text-field widgets in the template.
pub const FIELD_DATE: &str = "Date";
pub const FIELD_PATIENT: &str = "Paciente";
pub const FIELD_DIAGNOSIS: &str = "Dx";
pub const FIELD_BODY: &str = "Texto1";

const PRODUCER: &str = "Generador de Recetas Medicas";

// PDF annotation flag bit 3: render the widget when printing.
const FLAG_PRINT: i64 = 4;
// PDF form field flag bit 1: field is read-only.
const FLAG_READ_ONLY: i64 = 1;

/// The four strings injected into the template, already formatted for
/// rendering (date as DD/MM/YYYY, patient as "first last", body with the
/// marker lines joined).
#[derive(Debug, Clone)]
pub struct FieldValues {
    pub date: String,
    pub patient: String,
    pub diagnosis: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct FilledPdf {
    pub bytes: Vec<u8>,
    /// False when the document carried no AcroForm and the values were left
    /// as interactive fields. Accepted, degraded output.
    pub flattened: bool,
}

/// A form field discovered in a template, for diagnostics.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub kind: String,
    pub value: Option<String>,
}

/// Loads the template, writes the four named field values and serializes the
/// result. Flattening is best-effort: a template without an AcroForm still
/// produces a document, flagged as not flattened.
pub fn fill_template(template: &Path, values: &FieldValues) -> Result<FilledPdf, DomainError> {
    if !template.exists() {
        return Err(DomainError::NotFound(format!(
            "template {} does not exist",
            template.display()
        )));
    }

    let mut doc = Document::load(template).map_err(gen_err)?;

    for (name, value) in [
        (FIELD_DATE, values.date.as_str()),
        (FIELD_PATIENT, values.patient.as_str()),
        (FIELD_DIAGNOSIS, values.diagnosis.as_str()),
        (FIELD_BODY, values.body.as_str()),
    ] {
        let updated = set_field(&mut doc, name, value)?;
        if updated == 0 {
            return Err(DomainError::Generation(format!(
                "form field `{name}` not found in template"
            )));
        }
        debug!(field = name, widgets = updated, "form field written");
    }

    let flattened = flatten_fields(&mut doc);
    if !flattened {
        warn!("template has no AcroForm; field values stay interactive");
    }
    stamp_producer(&mut doc);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|err| DomainError::Generation(err.to_string()))?;
    Ok(FilledPdf { bytes, flattened })
}

/// Lists the form fields of a template. Diagnostic companion to
/// `fill_template`, used by the `inspect_template` binary.
pub fn list_fields(template: &Path) -> Result<Vec<FieldInfo>, DomainError> {
    if !template.exists() {
        return Err(DomainError::NotFound(format!(
            "template {} does not exist",
            template.display()
        )));
    }

    let doc = Document::load(template).map_err(gen_err)?;
    let mut fields = Vec::new();
    for page_id in doc.get_pages().into_values() {
        for annot_id in annotation_ids(&doc, page_id)? {
            let annot = doc
                .get_object(annot_id)
                .and_then(Object::as_dict)
                .map_err(gen_err)?;
            let Some(name) = field_name(annot) else {
                continue;
            };
            let kind = match annot.get(b"FT") {
                Ok(Object::Name(n)) => String::from_utf8_lossy(n).into_owned(),
                _ => "?".to_string(),
            };
            let value = match annot.get(b"V") {
                Ok(Object::String(bytes, _)) => Some(decode_pdf_text(bytes)),
                _ => None,
            };
            fields.push(FieldInfo {
                name: decode_pdf_text(name),
                kind,
                value,
            });
        }
    }
    Ok(fields)
}

/// Writes `value` into every widget named `name`, dropping any stale
/// appearance stream so viewers re-render the new value. Returns the number
/// of widgets touched.
fn set_field(doc: &mut Document, name: &str, value: &str) -> Result<usize, DomainError> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let mut updated = 0;

    for page_id in page_ids {
        for annot_id in annotation_ids(doc, page_id)? {
            let matches = {
                let annot = doc
                    .get_object(annot_id)
                    .and_then(Object::as_dict)
                    .map_err(gen_err)?;
                field_name(annot).is_some_and(|n| n == name.as_bytes())
            };
            if !matches {
                continue;
            }
            let annot = doc
                .get_object_mut(annot_id)
                .and_then(Object::as_dict_mut)
                .map_err(gen_err)?;
            annot.set("V", pdf_text_string(value));
            annot.remove(b"AP");
            updated += 1;
        }
    }
    Ok(updated)
}

/// Best-effort flatten: print-flag every widget, mark every field read-only
/// and ask viewers to regenerate appearances. Returns false when the
/// document has no AcroForm to rewrite.
fn flatten_fields(doc: &mut Document) -> bool {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in page_ids {
        let Ok(annot_ids) = annotation_ids(doc, page_id) else {
            continue;
        };
        for annot_id in annot_ids {
            let Ok(annot) = doc.get_object_mut(annot_id).and_then(Object::as_dict_mut) else {
                continue;
            };
            let flags = match annot.get(b"F") {
                Ok(Object::Integer(i)) => *i,
                _ => 0,
            };
            annot.set("F", flags | FLAG_PRINT);
            let field_flags = match annot.get(b"Ff") {
                Ok(Object::Integer(i)) => *i,
                _ => 0,
            };
            annot.set("Ff", field_flags | FLAG_READ_ONLY);
        }
    }
    set_need_appearances(doc)
}

fn set_need_appearances(doc: &mut Document) -> bool {
    let Some(root_id) = doc
        .trailer
        .get(b"Root")
        .ok()
        .and_then(|o| o.as_reference().ok())
    else {
        return false;
    };

    // AcroForm is usually an indirect reference out of the catalog
    let form_id = doc
        .get_object(root_id)
        .ok()
        .and_then(|o| o.as_dict().ok())
        .and_then(|catalog| catalog.get(b"AcroForm").ok())
        .and_then(|o| o.as_reference().ok());

    if let Some(form_id) = form_id {
        if let Ok(form) = doc.get_object_mut(form_id).and_then(Object::as_dict_mut) {
            form.set("NeedAppearances", true);
            return true;
        }
        return false;
    }

    // or an inline dictionary
    if let Ok(catalog) = doc.get_object_mut(root_id).and_then(Object::as_dict_mut)
        && let Ok(Object::Dictionary(form)) = catalog.get_mut(b"AcroForm")
    {
        form.set("NeedAppearances", true);
        return true;
    }
    false
}

fn stamp_producer(doc: &mut Document) {
    let info_id = doc.add_object(dictionary! {
        "Producer" => Object::string_literal(PRODUCER),
    });
    doc.trailer.set("Info", info_id);
}

fn annotation_ids(doc: &Document, page_id: ObjectId) -> Result<Vec<ObjectId>, DomainError> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(gen_err)?;
    let annots = match page.get(b"Annots") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(Object::Reference(id)) => doc
            .get_object(*id)
            .and_then(Object::as_array)
            .map_err(gen_err)?
            .clone(),
        _ => Vec::new(),
    };
    Ok(annots
        .iter()
        .filter_map(|obj| obj.as_reference().ok())
        .collect())
}

fn field_name(annot: &Dictionary) -> Option<&[u8]> {
    match annot.get(b"T") {
        Ok(Object::String(bytes, _)) => Some(bytes.as_slice()),
        _ => None,
    }
}

/// PDF text string encoding: plain bytes for ASCII, UTF-16BE with a BOM
/// otherwise.
fn pdf_text_string(value: &str) -> Object {
    if value.is_ascii() {
        Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

/// Inverse of `pdf_text_string`, tolerant of Latin-1 text written by other
/// producers.
pub fn decode_pdf_text(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

fn gen_err(err: lopdf::Error) -> DomainError {
    DomainError::Generation(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Content;
    use lopdf::{Stream, dictionary};

    fn values() -> FieldValues {
        FieldValues {
            date: "18/11/2025".to_string(),
            patient: "Juan Pérez".to_string(),
            diagnosis: "Gripe".to_string(),
            body: "Rp./\nParacetamol".to_string(),
        }
    }

    // Single-page document with one text field named "Date" and no AcroForm.
    fn one_field_template() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![],
            "Count" => 0,
        });
        let field_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Tx",
            "T" => Object::string_literal("Date"),
            "Rect" => vec![72.into(), 700.into(), 300.into(), 720.into()],
        });
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            Content { operations: vec![] }.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Contents" => content_id,
            "Annots" => vec![Object::Reference(field_id)],
        });
        let pages = doc
            .get_object_mut(pages_id)
            .and_then(Object::as_dict_mut)
            .unwrap();
        pages.set("Kids", vec![Object::Reference(page_id)]);
        pages.set("Count", 1);
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn missing_template_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = fill_template(&dir.path().join("nope.pdf"), &values()).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn missing_field_is_a_generation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.pdf");
        std::fs::write(&path, one_field_template()).unwrap();

        // "Date" exists but "Paciente" does not
        let err = fill_template(&path, &values()).unwrap_err();
        match err {
            DomainError::Generation(msg) => assert!(msg.contains("Paciente"), "{msg}"),
            other => panic!("expected Generation, got {other:?}"),
        }
    }

    #[test]
    fn garbage_template_is_a_generation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();

        let err = fill_template(&path, &values()).unwrap_err();
        assert!(matches!(err, DomainError::Generation(_)));
    }

    #[test]
    fn text_encoding_round_trips() {
        for text in ["18/11/2025", "Juan Pérez", "Rp./\nParacetamol", "漢字"] {
            let Object::String(bytes, _) = pdf_text_string(text) else {
                panic!("expected a string object");
            };
            assert_eq!(decode_pdf_text(&bytes), text);
        }
    }

    #[test]
    fn ascii_values_stay_plain_bytes() {
        let Object::String(bytes, _) = pdf_text_string("Gripe") else {
            panic!("expected a string object");
        };
        assert_eq!(bytes, b"Gripe");
    }

    #[test]
    fn list_fields_reports_name_and_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.pdf");
        std::fs::write(&path, one_field_template()).unwrap();

        let fields = list_fields(&path).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "Date");
        assert_eq!(fields[0].kind, "Tx");
        assert!(fields[0].value.is_none());
    }
}
