#![allow(dead_code)]

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use std::path::{Path, PathBuf};

use receta_api::document::filler::decode_pdf_text;

/// Minimal single-page AcroForm template carrying the four text fields the
/// filler expects (Date, Paciente, Dx, Texto1).
pub fn template_bytes() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => vec![],
        "Count" => 0,
    });
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut field_ids = Vec::new();
    for (index, name) in ["Date", "Paciente", "Dx", "Texto1"].iter().enumerate() {
        let top = 760 - (index as i64) * 60;
        let field_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Tx",
            "T" => Object::string_literal(*name),
            "Rect" => vec![72.into(), (top - 20).into(), 520.into(), top.into()],
            "DA" => Object::string_literal("/Helv 10 Tf 0 g"),
        });
        field_ids.push(field_id);
    }

    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        Content { operations: vec![] }.encode().unwrap(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        "Contents" => content_id,
        "Annots" => field_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
    });

    let pages = doc
        .get_object_mut(pages_id)
        .and_then(Object::as_dict_mut)
        .unwrap();
    pages.set("Kids", vec![Object::Reference(page_id)]);
    pages.set("Count", 1);

    let acroform_id = doc.add_object(dictionary! {
        "Fields" => field_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        "DR" => dictionary! { "Font" => dictionary! { "Helv" => font_id } },
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => acroform_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Writes the template into `dir` under the conventional name.
pub fn write_template(dir: &Path) -> PathBuf {
    let path = dir.join("modeloReceta.pdf");
    std::fs::write(&path, template_bytes()).unwrap();
    path
}

fn widget_dict<'a>(doc: &'a Document, name: &str) -> Option<&'a Dictionary> {
    for page_id in doc.get_pages().into_values() {
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let annots = match page.get(b"Annots") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Reference(id)) => {
                doc.get_object(*id).unwrap().as_array().unwrap().clone()
            }
            _ => Vec::new(),
        };
        for annot in annots {
            let id = annot.as_reference().unwrap();
            let dict = doc.get_object(id).unwrap().as_dict().unwrap();
            if let Ok(Object::String(t, _)) = dict.get(b"T")
                && t == name.as_bytes()
            {
                return Some(dict);
            }
        }
    }
    None
}

/// Reads a field's `/V` back out of generated PDF bytes.
pub fn field_value(bytes: &[u8], name: &str) -> Option<String> {
    let doc = Document::load_mem(bytes).unwrap();
    let dict = widget_dict(&doc, name)?;
    match dict.get(b"V") {
        Ok(Object::String(value, _)) => Some(decode_pdf_text(value)),
        _ => None,
    }
}

/// The widget's annotation flags (`/F`), 0 when unset.
pub fn widget_flags(bytes: &[u8], name: &str) -> i64 {
    let doc = Document::load_mem(bytes).unwrap();
    let dict = widget_dict(&doc, name).expect("widget not found");
    match dict.get(b"F") {
        Ok(Object::Integer(flags)) => *flags,
        _ => 0,
    }
}

/// Whether the AcroForm asks viewers to regenerate field appearances.
pub fn needs_appearances(bytes: &[u8]) -> bool {
    let doc = Document::load_mem(bytes).unwrap();
    let root_id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
    let catalog = doc.get_object(root_id).unwrap().as_dict().unwrap();
    let form = match catalog.get(b"AcroForm") {
        Ok(Object::Reference(id)) => doc.get_object(*id).unwrap().as_dict().unwrap(),
        Ok(Object::Dictionary(dict)) => dict,
        _ => return false,
    };
    matches!(form.get(b"NeedAppearances"), Ok(Object::Boolean(true)))
}
