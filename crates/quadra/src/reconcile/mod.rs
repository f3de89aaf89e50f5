//! Tolerant amount/date matching between record pools.

pub mod matcher;
pub mod service;
pub mod tolerance;

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{Amount, Matchable};

pub use matcher::{reconcile, MatchResult};
pub use service::{ReconcileOutcome, ReconcileService};
pub use tolerance::{AmountTolerance, Tolerance};

/// An externally supplied line to match against, such as an invoice or a
/// salary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counterpart {
    pub id: String,
    pub amount: Option<Amount>,
    pub date: Option<NaiveDate>,
    /// Supplier or employee name.
    #[serde(default)]
    pub name: Option<String>,
}

impl Matchable for Counterpart {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn amount(&self) -> Option<Amount> {
        self.amount
    }

    fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    fn identifier(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    StatementLines,
    FinePayments,
    Invoices,
    Payroll,
}

impl PlanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanKind::StatementLines => "statement_lines",
            PlanKind::FinePayments => "fine_payments",
            PlanKind::Invoices => "invoices",
            PlanKind::Payroll => "payroll",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "statement_lines" => Some(PlanKind::StatementLines),
            "fine_payments" => Some(PlanKind::FinePayments),
            "invoices" => Some(PlanKind::Invoices),
            "payroll" => Some(PlanKind::Payroll),
            _ => None,
        }
    }
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to reconcile against what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchPlan {
    /// Unmatched transfers against unmatched statement lines.
    StatementLines,
    /// Fines without a payment against unmatched transfers.
    FinePayments,
    /// Fines without an invoice against the given invoice lines.
    Invoices(Vec<Counterpart>),
    /// Unmatched transfers against the given salary lines.
    Payroll(Vec<Counterpart>),
}

impl MatchPlan {
    pub fn kind(&self) -> PlanKind {
        match self {
            MatchPlan::StatementLines => PlanKind::StatementLines,
            MatchPlan::FinePayments => PlanKind::FinePayments,
            MatchPlan::Invoices(_) => PlanKind::Invoices,
            MatchPlan::Payroll(_) => PlanKind::Payroll,
        }
    }
}

/// A persisted match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMatch {
    pub id: String,
    pub plan: PlanKind,
    pub source_id: String,
    pub candidate_id: String,
    pub delta_cents: i64,
    pub date_offset_days: i64,
    pub created_at: DateTime<Utc>,
}

impl StoredMatch {
    pub fn from_result(plan: PlanKind, result: &MatchResult) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            plan,
            source_id: result.source_id.clone(),
            candidate_id: result.candidate_id.clone(),
            delta_cents: result.delta_cents,
            date_offset_days: result.date_offset_days,
            created_at: Utc::now(),
        }
    }
}
