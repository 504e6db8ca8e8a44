/// Joins the prescription marker with a slash that the editor pushed onto
/// the following line, so that `Rp.` and `/` render as a single `Rp./`
/// token. Handles the four spacing variants the editor produces.
///
/// Pure and idempotent: text that is already joined passes through
/// unchanged.
pub fn join_marker_lines(text: &str) -> String {
    const JOINED: &str = "Rp./";
    let mut out = text.to_string();
    for split in ["Rp.\n/", "Rp. \n/", "Rp.\n /", "Rp. \n /"] {
        out = out.replace(split, JOINED);
    }
    out
}
