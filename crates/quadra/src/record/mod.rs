//! Record model shared by ingestion, reconciliation and export.
//!
//! Documents are extracted into a flat [`ExtractedRecord`] and then stored as
//! one of the [`Record`] variants. Every variant exposes the [`Matchable`]
//! view the matcher works on.

pub mod builder;
pub mod filename;

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::lifecycle::{self, FineState, LedgerState};

pub use builder::RecordBuilder;

/// Signed monetary amount in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

/// Canonical form: optional `-`, integer part, `.`, two decimals.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Fields recovered from one document (or one statement line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecord {
    pub date: Option<NaiveDate>,
    pub amount: Option<Amount>,
    pub currency: String,
    pub counterpart_name: Option<String>,
    pub counterpart_iban: Option<String>,
    #[serde(default)]
    pub remark: String,
    pub reference: Option<String>,
    #[serde(default)]
    pub plate: Option<String>,
    pub source_filename: String,
    pub job_id: Option<String>,
}

impl ExtractedRecord {
    pub fn new(source_filename: &str, job_id: Option<&str>) -> Self {
        Self {
            date: None,
            amount: None,
            currency: "EUR".to_string(),
            counterpart_name: None,
            counterpart_iban: None,
            remark: String::new(),
            reference: None,
            plate: None,
            source_filename: source_filename.to_string(),
            job_id: job_id.map(str::to_string),
        }
    }

    /// IBAN when known, otherwise the counterpart name.
    pub fn counterpart_identifier(&self) -> Option<&str> {
        self.counterpart_iban
            .as_deref()
            .or(self.counterpart_name.as_deref())
    }

    /// At least one of amount or reference code is required to persist.
    pub fn is_persistable(&self) -> bool {
        self.amount.is_some() || self.reference.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Transfer,
    StatementLine,
    Fine,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Transfer => "transfer",
            RecordKind::StatementLine => "statement_line",
            RecordKind::Fine => "fine",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "transfer" => Some(RecordKind::Transfer),
            "statement_line" => Some(RecordKind::StatementLine),
            "fine" => Some(RecordKind::Fine),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Links to owning business entities. Vehicle and driver survive a reset,
/// invoice and salary links do not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_id: Option<String>,
}

/// A transfer advice or a bank-statement line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: String,
    pub dedup_key: String,
    pub fields: ExtractedRecord,
    pub state: LedgerState,
    #[serde(default)]
    pub match_id: Option<String>,
    #[serde(default)]
    pub links: EntityLinks,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A traffic-fine notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FineNotice {
    pub id: String,
    pub dedup_key: String,
    pub fields: ExtractedRecord,
    /// The notice document has been downloaded and stored.
    #[serde(default)]
    pub saved: bool,
    #[serde(default)]
    pub invoice_ref: Option<String>,
    #[serde(default)]
    pub payment_ref: Option<String>,
    #[serde(default)]
    pub links: EntityLinks,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FineNotice {
    pub fn state(&self) -> FineState {
        lifecycle::fine_state(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Transfer(LedgerEntry),
    StatementLine(LedgerEntry),
    Fine(FineNotice),
}

impl Record {
    /// Creates a freshly ingested record with a new opaque id.
    pub fn new(kind: RecordKind, fields: ExtractedRecord, dedup_key: String) -> Self {
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();
        match kind {
            RecordKind::Transfer | RecordKind::StatementLine => {
                let entry = LedgerEntry {
                    id,
                    dedup_key,
                    fields,
                    state: LedgerState::Ingested,
                    match_id: None,
                    links: EntityLinks::default(),
                    created_at: now,
                    updated_at: now,
                };
                if kind == RecordKind::Transfer {
                    Record::Transfer(entry)
                } else {
                    Record::StatementLine(entry)
                }
            }
            RecordKind::Fine => Record::Fine(FineNotice {
                id,
                dedup_key,
                fields,
                saved: false,
                invoice_ref: None,
                payment_ref: None,
                links: EntityLinks::default(),
                created_at: now,
                updated_at: now,
            }),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Record::Transfer(e) | Record::StatementLine(e) => &e.id,
            Record::Fine(f) => &f.id,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Transfer(_) => RecordKind::Transfer,
            Record::StatementLine(_) => RecordKind::StatementLine,
            Record::Fine(_) => RecordKind::Fine,
        }
    }

    pub fn fields(&self) -> &ExtractedRecord {
        match self {
            Record::Transfer(e) | Record::StatementLine(e) => &e.fields,
            Record::Fine(f) => &f.fields,
        }
    }

    pub fn dedup_key(&self) -> &str {
        match self {
            Record::Transfer(e) | Record::StatementLine(e) => &e.dedup_key,
            Record::Fine(f) => &f.dedup_key,
        }
    }

    pub fn links(&self) -> &EntityLinks {
        match self {
            Record::Transfer(e) | Record::StatementLine(e) => &e.links,
            Record::Fine(f) => &f.links,
        }
    }

    pub fn links_mut(&mut self) -> &mut EntityLinks {
        match self {
            Record::Transfer(e) | Record::StatementLine(e) => &mut e.links,
            Record::Fine(f) => &mut f.links,
        }
    }

    pub fn as_ledger(&self) -> Option<&LedgerEntry> {
        match self {
            Record::Transfer(e) | Record::StatementLine(e) => Some(e),
            Record::Fine(_) => None,
        }
    }

    pub fn as_fine(&self) -> Option<&FineNotice> {
        match self {
            Record::Fine(f) => Some(f),
            _ => None,
        }
    }

    /// Lifecycle state label as persisted in the `state` column.
    pub fn state_label(&self) -> &'static str {
        match self {
            Record::Transfer(e) | Record::StatementLine(e) => e.state.as_str(),
            Record::Fine(f) => f.state().as_str(),
        }
    }

    /// Whether the record still sits in the unmatched pool of its kind.
    pub fn is_unmatched(&self) -> bool {
        match self {
            Record::Transfer(e) | Record::StatementLine(e) => e.match_id.is_none(),
            Record::Fine(f) => f.payment_ref.is_none() || f.invoice_ref.is_none(),
        }
    }

    pub fn touch(&mut self) {
        let now = Utc::now();
        match self {
            Record::Transfer(e) | Record::StatementLine(e) => e.updated_at = now,
            Record::Fine(f) => f.updated_at = now,
        }
    }
}

/// The view of a record the matcher needs.
pub trait Matchable {
    fn record_id(&self) -> &str;
    fn amount(&self) -> Option<Amount>;
    fn date(&self) -> Option<NaiveDate>;
    fn identifier(&self) -> Option<&str>;
}

impl Matchable for Record {
    fn record_id(&self) -> &str {
        self.id()
    }

    fn amount(&self) -> Option<Amount> {
        self.fields().amount
    }

    fn date(&self) -> Option<NaiveDate> {
        self.fields().date
    }

    fn identifier(&self) -> Option<&str> {
        self.fields().counterpart_identifier()
    }
}
