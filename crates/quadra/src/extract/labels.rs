use std::sync::LazyLock;

use regex::Regex;

use super::{FieldStrategy, PartialFields};

static RE_NAME_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:beneficiario|ordinante)\b\s*[:\-]?").unwrap());
static RE_REMARK_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:causale|descrizione|oggetto)\b\s*[:\-]?").unwrap());

/// Returns the whitespace-collapsed remainder of the first line carrying
/// `label`, skipping lines where nothing follows the label.
fn labelled_value(text: &str, label: &Regex) -> Option<String> {
    text.lines().find_map(|line| {
        let m = label.find(line)?;
        let value = collapse_whitespace(&line[m.end()..]);
        (!value.is_empty()).then_some(value)
    })
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `Beneficiario:` / `Ordinante:` lines.
pub struct LabelledName;

impl FieldStrategy for LabelledName {
    fn name(&self) -> &'static str {
        "labelled_name"
    }

    fn apply(&self, text: &str) -> PartialFields {
        PartialFields {
            name: labelled_value(text, &RE_NAME_LABEL),
            ..Default::default()
        }
    }
}

/// `Causale:` / `Descrizione:` / `Oggetto:` lines.
pub struct LabelledRemark;

impl FieldStrategy for LabelledRemark {
    fn name(&self) -> &'static str {
        "labelled_remark"
    }

    fn apply(&self, text: &str) -> PartialFields {
        PartialFields {
            remark: labelled_value(text, &RE_REMARK_LABEL),
            ..Default::default()
        }
    }
}
