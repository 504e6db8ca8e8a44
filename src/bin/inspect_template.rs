//! Lists the form fields of a PDF template, so a new template can be
//! checked against the field names the filler expects
//! (Date, Paciente, Dx, Texto1).
//!
//! Usage: `inspect_template [path]` (defaults to modeloReceta.pdf)

use receta_api::document::filler::list_fields;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let path: PathBuf = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "modeloReceta.pdf".to_string())
        .into();

    let fields = match list_fields(&path) {
        Ok(fields) => fields,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if fields.is_empty() {
        println!(
            "no form fields found in {} (flattened, protected, or not a form)",
            path.display()
        );
        return ExitCode::SUCCESS;
    }

    println!("{} form field(s) in {}:", fields.len(), path.display());
    for field in fields {
        match field.value {
            Some(value) => println!("  {} ({}) = {:?}", field.name, field.kind, value),
            None => println!("  {} ({})", field.name, field.kind),
        }
    }
    ExitCode::SUCCESS
}
