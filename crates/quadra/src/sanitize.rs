//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Log output is shared for support, so it carries file names but never full
//! upload paths, and bank identifiers only in masked form.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Same as [`redact_path`] for names that arrive as strings, such as
/// archive entries (`batch/2024/advice.pdf`).
pub fn redact_name(name: &str) -> String {
    redact_path(Path::new(name))
}

/// Keeps the country code, check digits and the last four characters:
/// `IT60X0542811101000000123456` becomes `IT60****3456`.
pub fn mask_iban(iban: &str) -> String {
    let compact: Vec<char> = iban.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() <= 8 {
        return "****".to_string();
    }
    let head: String = compact[..4].iter().collect();
    let tail: String = compact[compact.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}
