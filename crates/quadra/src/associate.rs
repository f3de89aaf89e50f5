//! Secondary linking of records to the vehicles, drivers and invoices they
//! belong to.
//!
//! Matching is bidirectional, case-insensitive substring containment between
//! a record's text fields and each entity's label. When several entities
//! match, the longest matched text wins, then the lowest entity id.

use serde::{Deserialize, Serialize};

use crate::extract::labels::collapse_whitespace;
use crate::record::Record;

/// Shorter matches are ignored.
pub const MIN_MATCH_CHARS: usize = 3;

/// A business entity a record can be linked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEntity {
    pub id: String,
    /// Plate for vehicles, full name for drivers, supplier for invoices.
    pub label: String,
}

impl ReferenceEntity {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSet {
    #[serde(default)]
    pub vehicles: Vec<ReferenceEntity>,
    #[serde(default)]
    pub drivers: Vec<ReferenceEntity>,
    #[serde(default)]
    pub invoices: Vec<ReferenceEntity>,
}

impl ReferenceSet {
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty() && self.drivers.is_empty() && self.invoices.is_empty()
    }
}

/// Links newly set by one [`AutoAssociator::associate`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationResult {
    pub vehicle_id: Option<String>,
    pub driver_id: Option<String>,
    pub invoice_id: Option<String>,
}

impl AssociationResult {
    pub fn changed(&self) -> bool {
        self.vehicle_id.is_some() || self.driver_id.is_some() || self.invoice_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssociationCounts {
    pub vehicles: u64,
    pub drivers: u64,
    pub invoices: u64,
}

impl AssociationCounts {
    pub fn add(&mut self, result: &AssociationResult) {
        self.vehicles += u64::from(result.vehicle_id.is_some());
        self.drivers += u64::from(result.driver_id.is_some());
        self.invoices += u64::from(result.invoice_id.is_some());
    }
}

pub struct AutoAssociator {
    references: ReferenceSet,
}

impl AutoAssociator {
    pub fn new(references: ReferenceSet) -> Self {
        Self { references }
    }

    pub fn references(&self) -> &ReferenceSet {
        &self.references
    }

    /// Links `record` to the best matching entities. Links already present
    /// are kept unless `force` is set; running twice changes nothing.
    pub fn associate(&self, record: &mut Record, force: bool) -> AssociationResult {
        let fields = record.fields();
        let plate_texts: Vec<String> = [fields.plate.as_deref(), Some(fields.remark.as_str())]
            .into_iter()
            .flatten()
            .map(compact)
            .collect();
        let name_texts: Vec<String> = [
            fields.counterpart_name.as_deref(),
            Some(fields.remark.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(normalize)
        .collect();

        let vehicle = best_match(&self.references.vehicles, &plate_texts, compact);
        let driver = best_match(&self.references.drivers, &name_texts, normalize);
        let invoice = best_match(&self.references.invoices, &name_texts, normalize);

        let links = record.links_mut();
        let result = AssociationResult {
            vehicle_id: apply(&mut links.vehicle_id, vehicle, force),
            driver_id: apply(&mut links.driver_id, driver, force),
            invoice_id: apply(&mut links.invoice_id, invoice, force),
        };

        if result.changed() {
            record.touch();
            tracing::debug!(
                record_id = record.id(),
                vehicle = result.vehicle_id.as_deref(),
                driver = result.driver_id.as_deref(),
                invoice = result.invoice_id.as_deref(),
                "Associated record"
            );
        }
        result
    }
}

fn apply(slot: &mut Option<String>, found: Option<&str>, force: bool) -> Option<String> {
    let found = found?;
    if slot.is_some() && !force {
        return None;
    }
    if slot.as_deref() == Some(found) {
        return None;
    }
    *slot = Some(found.to_string());
    Some(found.to_string())
}

/// Picks the entity with the longest contained text; ties go to the lowest id.
fn best_match<'a>(
    entities: &'a [ReferenceEntity],
    texts: &[String],
    norm: fn(&str) -> String,
) -> Option<&'a str> {
    let mut best: Option<(usize, &str)> = None;

    for entity in entities {
        let label = norm(&entity.label);
        let Some(len) = texts.iter().filter_map(|t| containment(t, &label)).max() else {
            continue;
        };
        let better = match best {
            None => true,
            Some((best_len, best_id)) => {
                len > best_len || (len == best_len && entity.id.as_str() < best_id)
            }
        };
        if better {
            best = Some((len, entity.id.as_str()));
        }
    }

    best.map(|(_, id)| id)
}

/// Length in chars of the shorter string when either contains the other.
fn containment(text: &str, label: &str) -> Option<usize> {
    let (text_len, label_len) = (text.chars().count(), label.chars().count());
    if text_len < MIN_MATCH_CHARS || label_len < MIN_MATCH_CHARS {
        return None;
    }
    if text.contains(label) {
        Some(label_len)
    } else if label.contains(text) {
        Some(text_len)
    } else {
        None
    }
}

fn normalize(s: &str) -> String {
    collapse_whitespace(&s.to_lowercase())
}

/// Plates are compared without any whitespace.
fn compact(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
