//! Per-record lifecycle states and transitions.
//!
//! Transitions never fail. When a precondition does not hold, the record comes
//! back unchanged with `applied == false` and a reason for the caller to log.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::{FineNotice, LedgerEntry, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FineState {
    DaScaricare,
    Salvato,
    Identificato,
    FatturaRicevuta,
    Pagato,
    Riconciliato,
}

impl FineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FineState::DaScaricare => "da_scaricare",
            FineState::Salvato => "salvato",
            FineState::Identificato => "identificato",
            FineState::FatturaRicevuta => "fattura_ricevuta",
            FineState::Pagato => "pagato",
            FineState::Riconciliato => "riconciliato",
        }
    }
}

impl fmt::Display for FineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerState {
    Ingested,
    Matched,
    Reconciled,
}

impl LedgerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerState::Ingested => "ingested",
            LedgerState::Matched => "matched",
            LedgerState::Reconciled => "reconciled",
        }
    }
}

impl fmt::Display for LedgerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<T> {
    pub record: T,
    pub applied: bool,
    pub reason: Option<String>,
}

impl<T> Transition<T> {
    fn applied(record: T) -> Self {
        Self {
            record,
            applied: true,
            reason: None,
        }
    }

    fn skipped(record: T, reason: impl Into<String>) -> Self {
        Self {
            record,
            applied: false,
            reason: Some(reason.into()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Transition<U> {
        Transition {
            record: f(self.record),
            applied: self.applied,
            reason: self.reason,
        }
    }
}

/// Financial progress wins over identification when reporting.
pub fn fine_state(fine: &FineNotice) -> FineState {
    match (fine.invoice_ref.is_some(), fine.payment_ref.is_some()) {
        (true, true) => FineState::Riconciliato,
        (_, true) => FineState::Pagato,
        (true, false) => FineState::FatturaRicevuta,
        (false, false) if fine.links.vehicle_id.is_some() || fine.links.driver_id.is_some() => {
            FineState::Identificato
        }
        (false, false) if fine.saved => FineState::Salvato,
        (false, false) => FineState::DaScaricare,
    }
}

pub mod fine {
    use super::*;

    pub fn mark_saved(mut fine: FineNotice) -> Transition<FineNotice> {
        if fine.saved {
            return Transition::skipped(fine, "notice already saved");
        }
        fine.saved = true;
        Transition::applied(fine)
    }

    /// Records the owning vehicle and/or driver. Independent of financial
    /// progress.
    pub fn identify(
        mut fine: FineNotice,
        vehicle_id: Option<String>,
        driver_id: Option<String>,
    ) -> Transition<FineNotice> {
        if vehicle_id.is_none() && driver_id.is_none() {
            return Transition::skipped(fine, "no vehicle or driver given");
        }
        if vehicle_id.is_some() {
            fine.links.vehicle_id = vehicle_id;
        }
        if driver_id.is_some() {
            fine.links.driver_id = driver_id;
        }
        Transition::applied(fine)
    }

    pub fn attach_invoice(mut fine: FineNotice, invoice_ref: String) -> Transition<FineNotice> {
        if !fine.saved {
            return Transition::skipped(fine, "notice not saved yet");
        }
        if fine.invoice_ref.is_some() {
            return Transition::skipped(fine, "invoice already attached");
        }
        fine.links.invoice_id = Some(invoice_ref.clone());
        fine.invoice_ref = Some(invoice_ref);
        Transition::applied(fine)
    }

    pub fn attach_payment(mut fine: FineNotice, payment_ref: String) -> Transition<FineNotice> {
        if !fine.saved {
            return Transition::skipped(fine, "notice not saved yet");
        }
        if fine.payment_ref.is_some() {
            return Transition::skipped(fine, "payment already attached");
        }
        fine.payment_ref = Some(payment_ref);
        Transition::applied(fine)
    }

    /// Drops the payment only; an attached invoice stays.
    pub fn detach_payment(mut fine: FineNotice) -> Transition<FineNotice> {
        if fine.payment_ref.is_none() {
            return Transition::skipped(fine, "no payment attached");
        }
        fine.payment_ref = None;
        Transition::applied(fine)
    }

    /// Drops the invoice only; a recorded payment stays.
    pub fn detach_invoice(mut fine: FineNotice) -> Transition<FineNotice> {
        if fine.invoice_ref.is_none() {
            return Transition::skipped(fine, "no invoice attached");
        }
        fine.invoice_ref = None;
        fine.links.invoice_id = None;
        Transition::applied(fine)
    }

    /// Clears invoice and payment. Vehicle and driver stay, so the notice
    /// falls back to `identificato` or `salvato`.
    pub fn reset(mut fine: FineNotice) -> Transition<FineNotice> {
        if fine.invoice_ref.is_none() && fine.payment_ref.is_none() && fine.links.invoice_id.is_none()
        {
            return Transition::skipped(fine, "nothing to reset");
        }
        fine.invoice_ref = None;
        fine.payment_ref = None;
        fine.links.invoice_id = None;
        fine.links.salary_id = None;
        Transition::applied(fine)
    }
}

pub mod ledger {
    use super::*;

    pub fn mark_matched(mut entry: LedgerEntry, match_id: String) -> Transition<LedgerEntry> {
        if entry.state != LedgerState::Ingested {
            let reason = format!("entry is {}, expected ingested", entry.state);
            return Transition::skipped(entry, reason);
        }
        entry.state = LedgerState::Matched;
        entry.match_id = Some(match_id);
        Transition::applied(entry)
    }

    pub fn mark_reconciled(mut entry: LedgerEntry) -> Transition<LedgerEntry> {
        if entry.state != LedgerState::Matched {
            let reason = format!("entry is {}, expected matched", entry.state);
            return Transition::skipped(entry, reason);
        }
        entry.state = LedgerState::Reconciled;
        Transition::applied(entry)
    }

    /// Back to `ingested`; drops the match and invoice/salary links, keeps
    /// vehicle and driver.
    pub fn reset(mut entry: LedgerEntry) -> Transition<LedgerEntry> {
        if entry.state == LedgerState::Ingested
            && entry.match_id.is_none()
            && entry.links.invoice_id.is_none()
            && entry.links.salary_id.is_none()
        {
            return Transition::skipped(entry, "nothing to reset");
        }
        entry.state = LedgerState::Ingested;
        entry.match_id = None;
        entry.links.invoice_id = None;
        entry.links.salary_id = None;
        Transition::applied(entry)
    }
}

/// Resets any record variant.
pub fn reset(record: Record) -> Transition<Record> {
    match record {
        Record::Transfer(e) => ledger::reset(e).map(Record::Transfer),
        Record::StatementLine(e) => ledger::reset(e).map(Record::StatementLine),
        Record::Fine(f) => fine::reset(f).map(Record::Fine),
    }
}
