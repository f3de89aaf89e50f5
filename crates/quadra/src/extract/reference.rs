use std::sync::LazyLock;

use regex::Regex;

use super::{FieldStrategy, PartialFields};

static RE_PREFIXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:CRO|TRN|N\.\s*verbale)\b\s*(?:n\.|nr\.|n°)?\s*[:#]?\s*(?P<code>[A-Z0-9][A-Z0-9/-]{4,34})",
    )
    .unwrap()
});
static RE_FALLBACK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z]\d{10,12}\b").unwrap());

/// Code following a CRO, TRN or "N. Verbale" label. A code must contain at
/// least one digit, which keeps plain words after the label from matching.
pub struct PrefixedReference;

impl FieldStrategy for PrefixedReference {
    fn name(&self) -> &'static str {
        "prefixed_reference"
    }

    fn apply(&self, text: &str) -> PartialFields {
        let reference = RE_PREFIXED.captures_iter(text).find_map(|caps| {
            let code = caps.name("code")?.as_str();
            code.chars()
                .any(|c| c.is_ascii_digit())
                .then(|| code.to_ascii_uppercase())
        });

        PartialFields {
            reference,
            ..Default::default()
        }
    }
}

/// One uppercase letter followed by 10 to 12 digits.
pub struct FallbackReference;

impl FieldStrategy for FallbackReference {
    fn name(&self) -> &'static str {
        "fallback_reference"
    }

    fn apply(&self, text: &str) -> PartialFields {
        PartialFields {
            reference: RE_FALLBACK.find(text).map(|m| m.as_str().to_string()),
            ..Default::default()
        }
    }
}
