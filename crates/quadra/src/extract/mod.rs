//! Heuristic field extraction from raw document text.
//!
//! Extraction never fails: a field that cannot be recognised is simply left
//! empty. Strategies are ranked, and a lower-ranked strategy can only fill
//! fields that every higher-ranked strategy left empty.

pub mod amount;
pub mod date;
pub mod identifier;
pub mod labels;
pub mod reference;

use chrono::NaiveDate;

use crate::record::Amount;

pub use amount::{format_amount, parse_amount, AmountStyle};
pub use identifier::normalize_iban;

/// Candidate fields recovered from text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialFields {
    pub date: Option<NaiveDate>,
    pub amount: Option<Amount>,
    pub reference: Option<String>,
    pub iban: Option<String>,
    pub name: Option<String>,
    pub remark: Option<String>,
    pub plate: Option<String>,
}

impl PartialFields {
    /// Copies every field of `other` that is still empty here.
    pub fn fill_missing(&mut self, other: PartialFields) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        fill(&mut self.date, other.date);
        fill(&mut self.amount, other.amount);
        fill(&mut self.reference, other.reference);
        fill(&mut self.iban, other.iban);
        fill(&mut self.name, other.name);
        fill(&mut self.remark, other.remark);
        fill(&mut self.plate, other.plate);
    }

    pub fn is_empty(&self) -> bool {
        *self == PartialFields::default()
    }
}

/// One ranked way of recognising fields. A strategy reports what it found;
/// precedence is enforced by [`FieldExtractor`].
pub trait FieldStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, text: &str) -> PartialFields;
}

pub struct FieldExtractor {
    strategies: Vec<Box<dyn FieldStrategy>>,
}

impl FieldExtractor {
    pub fn new(strategies: Vec<Box<dyn FieldStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn extract(&self, text: &str) -> PartialFields {
        let mut fields = PartialFields::default();
        for strategy in &self.strategies {
            let found = strategy.apply(text);
            if !found.is_empty() {
                tracing::trace!(strategy = strategy.name(), ?found, "Strategy matched");
            }
            fields.fill_missing(found);
        }
        fields
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new(vec![
            Box::new(amount::LabelledAmount),
            Box::new(amount::FreeAmount),
            Box::new(date::DayFirstDate),
            Box::new(date::IsoDate),
            Box::new(reference::PrefixedReference),
            Box::new(reference::FallbackReference),
            Box::new(identifier::Iban),
            Box::new(labels::LabelledName),
            Box::new(labels::LabelledRemark),
            Box::new(identifier::Plate),
        ])
    }
}

/// Runs the default strategy ranking over `text`.
pub fn extract(text: &str) -> PartialFields {
    FieldExtractor::default().extract(text)
}
