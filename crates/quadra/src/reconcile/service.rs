//! Runs match plans against the store and applies their side effects.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use super::matcher::{reconcile, MatchResult};
use super::{Counterpart, MatchPlan, PlanKind, StoredMatch, Tolerance};
use crate::associate::{AssociationCounts, AutoAssociator, ReferenceSet};
use crate::config::TolerancesConfig;
use crate::error::StoreError;
use crate::lifecycle::{self, Transition};
use crate::record::{Record, RecordKind};
use crate::store::Store;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub matches: Vec<MatchResult>,
    /// Sources left without a partner.
    pub unmatched_sources: Vec<String>,
    /// Candidates left without a partner.
    pub unmatched_candidates: Vec<String>,
    /// Matches persisted; zero for a dry run.
    pub persisted: u64,
    /// Ledger entries moved to `reconciled`.
    pub reconciled: u64,
    pub associations: AssociationCounts,
}

pub struct ReconcileService {
    store: Arc<dyn Store>,
    tolerances: TolerancesConfig,
    associator: AutoAssociator,
}

impl ReconcileService {
    pub fn new(store: Arc<dyn Store>, tolerances: TolerancesConfig) -> Self {
        Self {
            store,
            tolerances,
            associator: AutoAssociator::new(ReferenceSet::default()),
        }
    }

    pub fn with_references(mut self, references: ReferenceSet) -> Self {
        self.associator = AutoAssociator::new(references);
        self
    }

    fn tolerance_for(&self, plan: PlanKind) -> Tolerance {
        match plan {
            PlanKind::StatementLines => self.tolerances.statement,
            PlanKind::FinePayments | PlanKind::Invoices => self.tolerances.invoice,
            PlanKind::Payroll => self.tolerances.payroll,
        }
    }

    /// Matches the plan's pools. A dry run only reports; otherwise matches are
    /// stored and both sides move forward in their lifecycle.
    pub async fn run(
        &self,
        plan: &MatchPlan,
        dry_run: bool,
    ) -> Result<ReconcileOutcome, StoreError> {
        let kind = plan.kind();
        let span = info_span!("reconcile", plan = kind.as_str(), dry_run);
        self.run_inner(plan, dry_run).instrument(span).await
    }

    async fn run_inner(
        &self,
        plan: &MatchPlan,
        dry_run: bool,
    ) -> Result<ReconcileOutcome, StoreError> {
        let kind = plan.kind();
        let tolerance = self.tolerance_for(kind);

        let (sources, records, counterparts) = match plan {
            MatchPlan::StatementLines => {
                let transfers = self.unmatched_ledger(RecordKind::Transfer).await?;
                let lines = self.unmatched_ledger(RecordKind::StatementLine).await?;
                (transfers, Pool::Records(lines), Vec::new())
            }
            MatchPlan::FinePayments => {
                let fines = self.fines_missing(|f| f.payment_ref.is_none()).await?;
                let transfers = self.unpaid_transfers().await?;
                (fines, Pool::Records(transfers), Vec::new())
            }
            MatchPlan::Invoices(lines) => {
                let fines = self.fines_missing(|f| f.invoice_ref.is_none()).await?;
                let open = self.unclaimed(kind, lines).await?;
                (fines, Pool::Counterparts, open)
            }
            MatchPlan::Payroll(lines) => {
                let transfers = self.unmatched_ledger(RecordKind::Transfer).await?;
                let open = self.unclaimed(kind, lines).await?;
                (transfers, Pool::Counterparts, open)
            }
        };

        let matches = match &records {
            Pool::Records(candidates) => reconcile(&sources, candidates, &tolerance),
            Pool::Counterparts => reconcile(&sources, &counterparts, &tolerance),
        };

        let paired_sources: HashSet<&str> = matches.iter().map(|m| m.source_id.as_str()).collect();
        let paired_candidates: HashSet<&str> =
            matches.iter().map(|m| m.candidate_id.as_str()).collect();
        let candidate_ids: Vec<String> = match &records {
            Pool::Records(candidates) => candidates.iter().map(|r| r.id().to_string()).collect(),
            Pool::Counterparts => counterparts.iter().map(|c| c.id.clone()).collect(),
        };

        let mut outcome = ReconcileOutcome {
            unmatched_sources: sources
                .iter()
                .map(Record::id)
                .filter(|id| !paired_sources.contains(id))
                .map(str::to_string)
                .collect(),
            unmatched_candidates: candidate_ids
                .into_iter()
                .filter(|id| !paired_candidates.contains(id.as_str()))
                .collect(),
            ..ReconcileOutcome::default()
        };

        info!(
            sources = sources.len(),
            matches = matches.len(),
            "Reconciliation pass complete"
        );

        if !dry_run {
            let mut pool: HashMap<String, Record> = sources
                .into_iter()
                .map(|r| (r.id().to_string(), r))
                .collect();
            if let Pool::Records(candidates) = records {
                pool.extend(candidates.into_iter().map(|r| (r.id().to_string(), r)));
            }
            self.persist(kind, &matches, pool, &mut outcome).await?;
        }

        outcome.matches = matches;
        Ok(outcome)
    }

    /// Commits each match with the records it moves forward, one store
    /// transaction per match.
    async fn persist(
        &self,
        plan: PlanKind,
        matches: &[MatchResult],
        mut pool: HashMap<String, Record>,
        outcome: &mut ReconcileOutcome,
    ) -> Result<(), StoreError> {
        for result in matches {
            let stored = StoredMatch::from_result(plan, result);
            let Some(source) = pool.remove(&result.source_id) else {
                continue;
            };

            let transition = match (plan, source) {
                (PlanKind::StatementLines | PlanKind::Payroll, Record::Transfer(entry)) => {
                    let mut t = lifecycle::ledger::mark_matched(entry, stored.id.clone());
                    if plan == PlanKind::Payroll && t.applied {
                        t.record.links.salary_id = Some(result.candidate_id.clone());
                    }
                    t.map(Record::Transfer)
                }
                (PlanKind::FinePayments, Record::Fine(fine)) => {
                    lifecycle::fine::attach_payment(fine, result.candidate_id.clone())
                        .map(Record::Fine)
                }
                (PlanKind::Invoices, Record::Fine(fine)) => {
                    lifecycle::fine::attach_invoice(fine, result.candidate_id.clone())
                        .map(Record::Fine)
                }
                (_, other) => Transition {
                    record: other,
                    applied: false,
                    reason: Some(format!("record kind does not belong to plan {}", plan)),
                },
            };

            if !transition.applied {
                warn!(
                    source_id = %result.source_id,
                    reason = transition.reason.as_deref(),
                    "Skipping match"
                );
                continue;
            }
            let mut changed = vec![transition.record];

            // Only a statement line gives up its own match slot. A transfer
            // paying a fine stays free for its statement line.
            if plan == PlanKind::StatementLines {
                if let Some(candidate) = pool.remove(&result.candidate_id) {
                    let transition = match candidate {
                        Record::StatementLine(e) => {
                            lifecycle::ledger::mark_matched(e, stored.id.clone())
                                .map(Record::StatementLine)
                        }
                        other => Transition {
                            record: other,
                            applied: false,
                            reason: Some("only statement lines are claimed".to_string()),
                        },
                    };
                    if let Some(reason) = &transition.reason {
                        debug!(candidate_id = %result.candidate_id, reason, "Candidate unchanged");
                    }
                    changed.push(transition.record);
                }
            }

            let mut settled = Vec::with_capacity(changed.len());
            for mut record in changed {
                record.touch();
                outcome
                    .associations
                    .add(&self.associator.associate(&mut record, false));
                let transition = settle(record);
                if transition.applied {
                    outcome.reconciled += 1;
                }
                settled.push(transition.record);
            }

            self.store.commit_match(&stored, &settled).await?;
            outcome.persisted += 1;
        }

        Ok(())
    }

    /// Deletes the match and returns both sides to their unmatched pools.
    pub async fn unmatch(&self, match_id: &str) -> Result<(), StoreError> {
        let stored = self
            .store
            .get_match(match_id)
            .await?
            .ok_or_else(|| StoreError::MatchNotFound(match_id.to_string()))?;

        if !self.release(&stored).await? {
            return Err(StoreError::MatchNotFound(match_id.to_string()));
        }
        Ok(())
    }

    /// Removes a record after releasing every match it takes part in.
    pub async fn delete_record(&self, record_id: &str) -> Result<bool, StoreError> {
        if self.store.get_record(record_id).await?.is_none() {
            return Ok(false);
        }
        for stored in self.store.matches_for_record(record_id).await? {
            self.release(&stored).await?;
        }
        self.store.delete_record(record_id).await
    }

    /// Deletes one match and undoes its effect on each stored side. Other
    /// matches the records take part in are left alone. Returns `false` if
    /// the match was already gone.
    async fn release(&self, stored: &StoredMatch) -> Result<bool, StoreError> {
        let mut released = Vec::new();
        for id in [&stored.source_id, &stored.candidate_id] {
            // Counterpart ids have no stored record.
            let Some(record) = self.store.get_record(id).await? else {
                continue;
            };
            let transition = undo(stored, record);
            if !transition.applied {
                debug!(record_id = %id, reason = transition.reason.as_deref(), "Record unchanged");
                continue;
            }
            let mut record = transition.record;
            record.touch();
            debug!(record_id = %id, match_id = %stored.id, "Record released");
            released.push(record);
        }

        self.store.remove_match(&stored.id, &released).await
    }

    /// Transfers not yet used to pay a fine. Their own ledger state does not
    /// matter: paying a fine and showing up on a statement are independent.
    async fn unpaid_transfers(&self) -> Result<Vec<Record>, StoreError> {
        let claimed = self.store.claimed_candidates(PlanKind::FinePayments).await?;
        let transfers = self.store.list_records(RecordKind::Transfer).await?;
        Ok(transfers
            .into_iter()
            .filter(|r| !claimed.contains(r.id()))
            .collect())
    }

    async fn unmatched_ledger(&self, kind: RecordKind) -> Result<Vec<Record>, StoreError> {
        let records = self.store.list_records(kind).await?;
        Ok(records.into_iter().filter(Record::is_unmatched).collect())
    }

    async fn fines_missing(
        &self,
        missing: impl Fn(&crate::record::FineNotice) -> bool,
    ) -> Result<Vec<Record>, StoreError> {
        let fines = self.store.list_records(RecordKind::Fine).await?;
        Ok(fines
            .into_iter()
            .filter(|r| r.as_fine().is_some_and(&missing))
            .collect())
    }

    async fn unclaimed(
        &self,
        plan: PlanKind,
        lines: &[Counterpart],
    ) -> Result<Vec<Counterpart>, StoreError> {
        let claimed = self.store.claimed_candidates(plan).await?;
        Ok(lines
            .iter()
            .filter(|c| !claimed.contains(&c.id))
            .cloned()
            .collect())
    }
}

enum Pool {
    Records(Vec<Record>),
    Counterparts,
}

/// Moves a matched ledger entry on to `reconciled`; fines pass through.
fn settle(record: Record) -> Transition<Record> {
    match record {
        Record::Transfer(e) => lifecycle::ledger::mark_reconciled(e).map(Record::Transfer),
        Record::StatementLine(e) => lifecycle::ledger::mark_reconciled(e).map(Record::StatementLine),
        fine @ Record::Fine(_) => Transition {
            record: fine,
            applied: false,
            reason: None,
        },
    }
}

/// Reverses what `stored` did to one of its sides.
fn undo(stored: &StoredMatch, record: Record) -> Transition<Record> {
    let candidate = Some(stored.candidate_id.as_str());
    match record {
        Record::Fine(fine) => match stored.plan {
            PlanKind::FinePayments if fine.payment_ref.as_deref() == candidate => {
                lifecycle::fine::detach_payment(fine).map(Record::Fine)
            }
            PlanKind::Invoices if fine.invoice_ref.as_deref() == candidate => {
                lifecycle::fine::detach_invoice(fine).map(Record::Fine)
            }
            _ => Transition {
                record: Record::Fine(fine),
                applied: false,
                reason: Some("fine does not carry this match".to_string()),
            },
        },
        ledger => {
            let owned = ledger
                .as_ledger()
                .is_some_and(|e| e.match_id.as_deref() == Some(stored.id.as_str()));
            if owned {
                lifecycle::reset(ledger)
            } else {
                Transition {
                    record: ledger,
                    applied: false,
                    reason: Some("entry is not held by this match".to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::associate::ReferenceEntity;
    use crate::db::Database;
    use crate::lifecycle::FineState;
    use crate::record::{Amount, ExtractedRecord};
    use crate::store::flaky::FlakyStore;
    use crate::store::{MatchStore, RecordStore, SqliteStore};

    fn store() -> Arc<SqliteStore> {
        Arc::new(SqliteStore::new(Database::open_in_memory().unwrap()))
    }

    fn service(store: &Arc<SqliteStore>) -> ReconcileService {
        ReconcileService::new(store.clone(), TolerancesConfig::default())
    }

    fn fields(cents: i64, date: &str) -> ExtractedRecord {
        let mut f = ExtractedRecord::new("doc.pdf", None);
        f.amount = Some(Amount::from_cents(cents));
        f.date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok();
        f
    }

    async fn insert(store: &SqliteStore, kind: RecordKind, f: ExtractedRecord) -> Record {
        let mut record = Record::new(kind, f, uuid::Uuid::new_v4().to_string());
        if let Record::Fine(fine) = record {
            record = Record::Fine(lifecycle::fine::mark_saved(fine).record);
        }
        store.insert_record(&record).await.unwrap();
        record
    }

    #[tokio::test]
    async fn test_dry_run_persists_nothing() {
        let store = store();
        let transfer = insert(&store, RecordKind::Transfer, fields(123456, "2024-03-10")).await;
        let line = insert(&store, RecordKind::StatementLine, fields(123456, "2024-03-11")).await;

        let outcome = service(&store)
            .run(&MatchPlan::StatementLines, true)
            .await
            .unwrap();
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.persisted, 0);

        let reloaded = store.get_record(transfer.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.state_label(), "ingested");
        assert!(store.matches_for_record(line.id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_statement_run_reconciles_both_sides() {
        let store = store();
        let transfer = insert(&store, RecordKind::Transfer, fields(123456, "2024-03-10")).await;
        let line = insert(&store, RecordKind::StatementLine, fields(123456, "2024-03-11")).await;
        let stray = insert(&store, RecordKind::StatementLine, fields(999, "2024-03-11")).await;

        let outcome = service(&store)
            .run(&MatchPlan::StatementLines, false)
            .await
            .unwrap();
        assert_eq!(outcome.persisted, 1);
        assert_eq!(outcome.reconciled, 2);
        assert_eq!(outcome.unmatched_candidates, vec![stray.id().to_string()]);

        for id in [transfer.id(), line.id()] {
            let r = store.get_record(id).await.unwrap().unwrap();
            assert_eq!(r.state_label(), "reconciled");
            assert!(!r.is_unmatched());
        }
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let store = store();
        insert(&store, RecordKind::Transfer, fields(5000, "2024-03-10")).await;
        insert(&store, RecordKind::StatementLine, fields(5000, "2024-03-10")).await;

        let svc = service(&store);
        assert_eq!(svc.run(&MatchPlan::StatementLines, false).await.unwrap().persisted, 1);
        let second = svc.run(&MatchPlan::StatementLines, false).await.unwrap();
        assert!(second.matches.is_empty());
        assert_eq!(second.persisted, 0);
    }

    #[tokio::test]
    async fn test_fine_payment_and_invoice() {
        let store = store();
        let fine = insert(&store, RecordKind::Fine, fields(-8400, "2024-03-01")).await;
        let transfer = insert(&store, RecordKind::Transfer, fields(-8400, "2024-03-05")).await;

        let svc = service(&store);
        svc.run(&MatchPlan::FinePayments, false).await.unwrap();
        let reloaded = store.get_record(fine.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.as_fine().unwrap().state(), FineState::Pagato);
        assert_eq!(
            reloaded.as_fine().unwrap().payment_ref.as_deref(),
            Some(transfer.id())
        );

        let invoices = vec![Counterpart {
            id: "inv-7".to_string(),
            amount: Some(Amount::from_cents(8400)),
            date: NaiveDate::from_ymd_opt(2024, 3, 20),
            name: Some("Comune di Milano".to_string()),
        }];
        let outcome = svc
            .run(&MatchPlan::Invoices(invoices.clone()), false)
            .await
            .unwrap();
        assert_eq!(outcome.persisted, 1);
        let reloaded = store.get_record(fine.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.as_fine().unwrap().state(), FineState::Riconciliato);

        // The invoice line is claimed now.
        let again = svc.run(&MatchPlan::Invoices(invoices), true).await.unwrap();
        assert!(again.matches.is_empty());
    }

    #[tokio::test]
    async fn test_payroll_links_salary_and_associates() {
        let store = store();
        let mut f = fields(-150000, "2024-03-27");
        f.counterpart_name = Some("Mario Rossi".to_string());
        let transfer = insert(&store, RecordKind::Transfer, f).await;

        let salaries = vec![Counterpart {
            id: "sal-03".to_string(),
            amount: Some(Amount::from_cents(147000)),
            date: NaiveDate::from_ymd_opt(2024, 3, 25),
            name: Some("Mario Rossi".to_string()),
        }];
        let refs = ReferenceSet {
            drivers: vec![ReferenceEntity::new("drv-1", "Mario Rossi")],
            ..ReferenceSet::default()
        };

        let outcome = service(&store)
            .with_references(refs)
            .run(&MatchPlan::Payroll(salaries), false)
            .await
            .unwrap();
        assert_eq!(outcome.persisted, 1);
        assert_eq!(outcome.associations.drivers, 1);

        let reloaded = store.get_record(transfer.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.links().salary_id.as_deref(), Some("sal-03"));
        assert_eq!(reloaded.links().driver_id.as_deref(), Some("drv-1"));
        assert_eq!(reloaded.state_label(), "reconciled");
    }

    #[tokio::test]
    async fn test_unmatch_resets_both_sides() {
        let store = store();
        let transfer = insert(&store, RecordKind::Transfer, fields(700, "2024-03-10")).await;
        let line = insert(&store, RecordKind::StatementLine, fields(700, "2024-03-10")).await;

        let svc = service(&store);
        svc.run(&MatchPlan::StatementLines, false).await.unwrap();
        let m = store.matches_for_record(transfer.id()).await.unwrap().remove(0);

        svc.unmatch(&m.id).await.unwrap();
        for id in [transfer.id(), line.id()] {
            let r = store.get_record(id).await.unwrap().unwrap();
            assert_eq!(r.state_label(), "ingested");
            assert!(r.is_unmatched());
        }
        assert!(store.get_match(&m.id).await.unwrap().is_none());

        assert!(matches!(
            svc.unmatch(&m.id).await,
            Err(StoreError::MatchNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_record_frees_partner() {
        let store = store();
        let transfer = insert(&store, RecordKind::Transfer, fields(700, "2024-03-10")).await;
        let line = insert(&store, RecordKind::StatementLine, fields(700, "2024-03-10")).await;

        let svc = service(&store);
        svc.run(&MatchPlan::StatementLines, false).await.unwrap();

        assert!(svc.delete_record(line.id()).await.unwrap());
        assert!(store.get_record(line.id()).await.unwrap().is_none());
        let freed = store.get_record(transfer.id()).await.unwrap().unwrap();
        assert!(freed.is_unmatched());

        assert!(!svc.delete_record(line.id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_transfer_paying_a_fine_still_reconciles() {
        let store = store();
        let fine = insert(&store, RecordKind::Fine, fields(-4200, "2024-03-01")).await;
        let transfer = insert(&store, RecordKind::Transfer, fields(-4200, "2024-03-05")).await;
        let line = insert(&store, RecordKind::StatementLine, fields(-4200, "2024-03-05")).await;
        let svc = service(&store);

        let paid = svc.run(&MatchPlan::FinePayments, false).await.unwrap();
        assert_eq!(paid.persisted, 1);
        let reloaded = store.get_record(transfer.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.state_label(), "ingested");
        assert!(reloaded.is_unmatched());

        let booked = svc.run(&MatchPlan::StatementLines, false).await.unwrap();
        assert_eq!(booked.persisted, 1);
        for id in [transfer.id(), line.id()] {
            let r = store.get_record(id).await.unwrap().unwrap();
            assert_eq!(r.state_label(), "reconciled");
        }
        let fine = store.get_record(fine.id()).await.unwrap().unwrap();
        assert_eq!(fine.as_fine().unwrap().payment_ref.as_deref(), Some(transfer.id()));

        // One transfer pays one fine
        insert(&store, RecordKind::Fine, fields(-4200, "2024-03-02")).await;
        let again = svc.run(&MatchPlan::FinePayments, false).await.unwrap();
        assert_eq!(again.persisted, 0);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_orphan_match() {
        let store = Arc::new(FlakyStore::new());
        let inner = store.inner();
        let mut ids = Vec::new();
        for cents in [1000, 2000] {
            ids.push(insert(inner, RecordKind::Transfer, fields(cents, "2024-03-10")).await);
            ids.push(insert(inner, RecordKind::StatementLine, fields(cents, "2024-03-10")).await);
        }
        let svc = ReconcileService::new(store.clone(), TolerancesConfig::default());
        let match_rows = || -> i64 {
            inner
                .database()
                .with_conn(|conn| {
                    Ok(conn.query_row("SELECT COUNT(*) FROM matches", [], |r| r.get(0))?)
                })
                .unwrap()
        };

        store.fail_commit_after(1);
        assert!(svc.run(&MatchPlan::StatementLines, false).await.is_err());
        assert_eq!(match_rows(), 1);
        for record in &ids {
            let r = store.get_record(record.id()).await.unwrap().unwrap();
            let held = store.matches_for_record(record.id()).await.unwrap().len();
            let expected = if held == 1 { "reconciled" } else { "ingested" };
            assert_eq!(r.state_label(), expected);
        }

        let rerun = svc.run(&MatchPlan::StatementLines, false).await.unwrap();
        assert_eq!(rerun.persisted, 1);
        assert_eq!(match_rows(), 2);
        for record in &ids {
            assert_eq!(store.matches_for_record(record.id()).await.unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_unmatching_payment_keeps_invoice() {
        let store = store();
        let fine = insert(&store, RecordKind::Fine, fields(-8400, "2024-03-01")).await;
        let transfer = insert(&store, RecordKind::Transfer, fields(-8400, "2024-03-05")).await;
        let svc = service(&store);

        svc.run(&MatchPlan::FinePayments, false).await.unwrap();
        let invoices = vec![Counterpart {
            id: "inv-7".to_string(),
            amount: Some(Amount::from_cents(8400)),
            date: NaiveDate::from_ymd_opt(2024, 3, 20),
            name: Some("Comune di Milano".to_string()),
        }];
        svc.run(&MatchPlan::Invoices(invoices), false).await.unwrap();

        let matches = store.matches_for_record(fine.id()).await.unwrap();
        assert_eq!(matches.len(), 2);
        let payment = matches
            .iter()
            .find(|m| m.plan == PlanKind::FinePayments)
            .unwrap();

        svc.unmatch(&payment.id).await.unwrap();
        let reloaded = store.get_record(fine.id()).await.unwrap().unwrap();
        let notice = reloaded.as_fine().unwrap();
        assert_eq!(notice.state(), FineState::FatturaRicevuta);
        assert_eq!(notice.invoice_ref.as_deref(), Some("inv-7"));
        assert_eq!(notice.payment_ref, None);

        let left = store.matches_for_record(fine.id()).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].plan, PlanKind::Invoices);

        // The freed transfer can pay again
        let repaid = svc.run(&MatchPlan::FinePayments, true).await.unwrap();
        assert_eq!(repaid.matches.len(), 1);
        assert_eq!(repaid.matches[0].candidate_id, transfer.id());
    }
}
