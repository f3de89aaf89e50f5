use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info_span, warn, Instrument};

use crate::config::IngestConfig;
use crate::dedup::{dedup_key, DedupPool};
use crate::error::ProcessError;
use crate::jobs::progress::JobPhase;
use crate::lifecycle;
use crate::processor::{DocumentFormat, ProcessorRegistry};
use crate::record::{Record, RecordBuilder, RecordKind};
use crate::sanitize;
use crate::statement;
use crate::store::Store;

use super::context::{IngestOutcome, PipelineContext};
use super::error::PipelineError;
use super::progress::{ProgressEvent, ProgressReporter};

/// Wording only a bank transfer advice carries. A transfer that pays a fine
/// quotes the fine in its remark, so these win over [`FINE_KEYWORDS`].
static RE_TRANSFER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:bonifico|ordinante|beneficiario|data\s+esecuzione|cro|trn)\b").unwrap()
});

/// Lowercase phrases that mark a document as a traffic fine notice.
const FINE_KEYWORDS: &[&str] = &[
    "verbale",
    "contravvenzione",
    "sanzione",
    "codice della strada",
];

pub struct Pipeline {
    processor: ProcessorRegistry,
    builder: RecordBuilder,
    store: Arc<dyn Store>,
}

impl Pipeline {
    /// Production constructor.
    pub fn from_config(config: &IngestConfig, store: Arc<dyn Store>) -> Self {
        Self {
            processor: ProcessorRegistry::new(config.max_document_bytes),
            builder: RecordBuilder::default(),
            store,
        }
    }

    /// Test constructor, inject specific sub-components.
    #[cfg(test)]
    pub fn new(processor: ProcessorRegistry, builder: RecordBuilder, store: Arc<dyn Store>) -> Self {
        Self {
            processor,
            builder,
            store,
        }
    }

    /// Ingests one document. Keys accepted here are added to `pool`, so the
    /// caller shares one pool across a whole batch.
    pub async fn run(
        &self,
        ctx: PipelineContext,
        pool: &mut DedupPool,
        progress: &dyn ProgressReporter,
    ) -> (Vec<IngestOutcome>, PipelineContext) {
        let span = info_span!("pipeline",
            job_id = %ctx.job_id,
            filename = %sanitize::redact_name(&ctx.filename),
        );
        self.run_steps(ctx, pool, progress).instrument(span).await
    }

    async fn run_steps(
        &self,
        mut ctx: PipelineContext,
        pool: &mut DedupPool,
        progress: &dyn ProgressReporter,
    ) -> (Vec<IngestOutcome>, PipelineContext) {
        // Step 1: Process document
        {
            let _step = info_span!("process_document").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Processing,
                message: "Reading document...".to_string(),
            });
            if let Err(e) = self.step_process_document(&mut ctx) {
                let err_msg = e.to_string();
                warn!(error = %err_msg, "Document could not be processed");
                progress.report(ProgressEvent::Failed {
                    error: err_msg.clone(),
                });
                ctx.outcomes.push(IngestOutcome::failed(err_msg));
                return (ctx.outcomes.clone(), ctx);
            }
        }

        // Step 2: Classify
        {
            let _step = info_span!("classify").entered();
            self.step_classify(&mut ctx);
        }

        // Step 3: Extract fields
        {
            let _step = info_span!("extract_fields").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Extracting,
                message: "Extracting fields...".to_string(),
            });
            self.step_extract(&mut ctx);
        }

        // Step 4: Deduplicate
        {
            let _step = info_span!("deduplicate").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Deduplicating,
                message: "Checking duplicates...".to_string(),
            });
            self.step_deduplicate(&mut ctx, pool);
        }

        // Step 5: Persist
        progress.report(ProgressEvent::Phase {
            phase: JobPhase::Persisting,
            message: "Saving records...".to_string(),
        });
        self.step_persist(&mut ctx, pool)
            .instrument(info_span!("persist"))
            .await;

        let (mut imported, mut duplicates, mut errors) = (0, 0, 0);
        for outcome in &ctx.outcomes {
            match outcome {
                IngestOutcome::Imported { .. } => imported += 1,
                IngestOutcome::Duplicate { .. } => duplicates += 1,
                IngestOutcome::Failed { .. } => errors += 1,
            }
        }
        progress.report(ProgressEvent::Completed {
            imported,
            duplicates,
            errors,
        });

        (ctx.outcomes.clone(), ctx)
    }

    fn step_process_document(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let document = ctx
            .document
            .take()
            .ok_or_else(|| ProcessError::TextExtraction(ctx.filename.clone()))?;
        let format = document.format();
        ctx.format = format;

        if format == Some(DocumentFormat::Statement) {
            self.processor.check_size(&document)?;
            ctx.candidates =
                statement::parse_statement(&document.bytes, &ctx.filename, Some(&ctx.job_id))?;
            ctx.kind = Some(RecordKind::StatementLine);
            debug!(rows = ctx.candidates.len(), "Parsed statement");
            return Ok(());
        }

        let processed = self.processor.process(&document)?;
        debug!(chars = processed.text.len(), "Extracted document text");
        ctx.text = Some(processed.text);
        Ok(())
    }

    fn step_classify(&self, ctx: &mut PipelineContext) {
        if ctx.kind.is_some() {
            return;
        }
        let kind = ctx
            .text
            .as_deref()
            .map(classify)
            .unwrap_or(RecordKind::Transfer);
        debug!(kind = kind.as_str(), "Classified document");
        ctx.kind = Some(kind);
    }

    fn step_extract(&self, ctx: &mut PipelineContext) {
        if let Some(text) = ctx.text.as_deref() {
            let built = self
                .builder
                .from_text(text, &ctx.filename, Some(&ctx.job_id));
            ctx.candidates.push(built);
        }
    }

    fn step_deduplicate(&self, ctx: &mut PipelineContext, pool: &mut DedupPool) {
        let kind = ctx.kind.unwrap_or(RecordKind::Transfer);
        for candidate in std::mem::take(&mut ctx.candidates) {
            let fields = match candidate {
                Ok(fields) => fields,
                Err(e) => {
                    debug!(error = %e, "Candidate rejected");
                    ctx.outcomes
                        .push(IngestOutcome::failed(PipelineError::from(e)));
                    continue;
                }
            };

            let key = dedup_key(&fields);
            if pool.check_and_insert(kind, key.clone()) {
                ctx.fresh.push((fields, key));
            } else {
                debug!(dedup_key = %key, "Duplicate skipped");
                ctx.outcomes.push(IngestOutcome::Duplicate { dedup_key: key });
            }
        }
    }

    async fn step_persist(&self, ctx: &mut PipelineContext, pool: &mut DedupPool) {
        let kind = ctx.kind.unwrap_or(RecordKind::Transfer);

        for (fields, key) in std::mem::take(&mut ctx.fresh) {
            let mut record = Record::new(kind, fields, key.as_str().to_string());
            if let Record::Fine(fine) = record {
                record = Record::Fine(lifecycle::fine::mark_saved(fine).record);
            }

            match self.store.insert_record(&record).await {
                Ok(()) => {
                    debug!(
                        record_id = record.id(),
                        iban = %record
                            .fields()
                            .counterpart_iban
                            .as_deref()
                            .map(sanitize::mask_iban)
                            .unwrap_or_default(),
                        "Record imported"
                    );
                    ctx.outcomes.push(IngestOutcome::Imported {
                        record_id: record.id().to_string(),
                        kind,
                    });
                }
                Err(e) => {
                    warn!(error = %e, record_id = record.id(), "Failed to persist record");
                    // Let a later copy of the same document try again
                    pool.forget(kind, &key);
                    ctx.outcomes
                        .push(IngestOutcome::failed(PipelineError::from(e)));
                }
            }
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Fine notices are recognised by wording; everything else is a transfer
/// advice.
fn classify(text: &str) -> RecordKind {
    if RE_TRANSFER_MARKER.is_match(text) {
        return RecordKind::Transfer;
    }
    let lower = text.to_lowercase();
    if FINE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        RecordKind::Fine
    } else {
        RecordKind::Transfer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::pipeline::progress::NoopProgress;
    use crate::processor::RawDocument;
    use crate::store::{RecordStore, SqliteStore};

    fn setup() -> (Pipeline, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::new(Database::open_in_memory().unwrap()));
        let pipeline = Pipeline::from_config(&IngestConfig::default(), store.clone());
        (pipeline, store)
    }

    fn ctx(name: &str, content: &str) -> PipelineContext {
        PipelineContext::new("job-1", RawDocument::new(name, content))
    }

    // ── Pipeline happy path ──

    #[tokio::test]
    async fn test_transfer_advice_is_imported() {
        let (pipeline, store) = setup();
        let mut pool = DedupPool::default();

        let (outcomes, ctx) = pipeline
            .run(
                ctx("advice.txt", "Bonifico SEPA\nImporto: 1.234,56 EUR\nCausale: fattura 12"),
                &mut pool,
                &NoopProgress,
            )
            .await;

        assert_eq!(outcomes.len(), 1);
        let IngestOutcome::Imported { record_id, kind } = &outcomes[0] else {
            panic!("Expected Imported, got {:?}", outcomes[0]);
        };
        assert_eq!(*kind, RecordKind::Transfer);
        assert!(ctx.document.is_none());

        let stored = store.get_record(record_id).await.unwrap().unwrap();
        assert_eq!(stored.fields().job_id.as_deref(), Some("job-1"));
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn test_fine_notice_is_saved() {
        let (pipeline, store) = setup();
        let mut pool = DedupPool::default();
        let text = "Verbale di contravvenzione n. 991\nVeicolo targato AB 123 CD\nImporto: 42,00";

        let (outcomes, _) = pipeline
            .run(ctx("verbale.txt", text), &mut pool, &NoopProgress)
            .await;

        let IngestOutcome::Imported { record_id, kind } = &outcomes[0] else {
            panic!("Expected Imported, got {:?}", outcomes[0]);
        };
        assert_eq!(*kind, RecordKind::Fine);
        let stored = store.get_record(record_id).await.unwrap().unwrap();
        assert_eq!(stored.state_label(), "salvato");
        assert_eq!(stored.fields().plate.as_deref(), Some("AB123CD"));
    }

    #[tokio::test]
    async fn test_statement_rows_become_statement_lines() {
        let (pipeline, store) = setup();
        let mut pool = DedupPool::default();
        let csv = "Data;Importo;Causale\n10/03/2024;-50,00;Commissioni\n\
                   11/03/2024;;Saldo iniziale\n12/03/2024;1.500,00;Stipendio\n";

        let (outcomes, _) = pipeline
            .run(ctx("estratto.csv", csv), &mut pool, &NoopProgress)
            .await;

        assert_eq!(outcomes.len(), 3);
        let failed = outcomes
            .iter()
            .filter(|o| matches!(o, IngestOutcome::Failed { .. }))
            .count();
        assert_eq!(failed, 1);
        assert_eq!(
            store
                .list_records(RecordKind::StatementLine)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    // ── Failures and duplicates ──

    #[tokio::test]
    async fn test_duplicate_within_pool_is_skipped() {
        let (pipeline, store) = setup();
        let mut pool = DedupPool::default();
        let text = "Importo: 10,00\nCausale: test";

        pipeline
            .run(ctx("a.txt", text), &mut pool, &NoopProgress)
            .await;
        let (outcomes, _) = pipeline
            .run(ctx("copy-of-a.txt", text), &mut pool, &NoopProgress)
            .await;

        assert!(matches!(outcomes[0], IngestOutcome::Duplicate { .. }));
        assert_eq!(store.all_records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_text_without_amount_fails_extraction() {
        let (pipeline, _store) = setup();
        let mut pool = DedupPool::default();

        let (outcomes, _) = pipeline
            .run(ctx("note.txt", "nothing useful here"), &mut pool, &NoopProgress)
            .await;

        match &outcomes[0] {
            IngestOutcome::Failed { error } => assert!(error.contains("note.txt")),
            other => panic!("Expected Failed, got {:?}", other),
        }
        assert!(pool.is_empty());
    }

    // ── Individual step behavior ──

    #[test]
    fn test_step_process_document_unsupported_format() {
        let (pipeline, _store) = setup();
        let mut ctx = PipelineContext::new("job-1", RawDocument::new("photo.jpg", vec![0xff]));

        let result = pipeline.step_process_document(&mut ctx);
        assert!(matches!(result, Err(PipelineError::Processing(_))));
        assert!(ctx.document.is_none());
    }

    #[test]
    fn test_step_process_statement_respects_size_limit() {
        let store = Arc::new(SqliteStore::new(Database::open_in_memory().unwrap()));
        let pipeline = Pipeline::new(ProcessorRegistry::new(8), RecordBuilder::default(), store);
        let mut ctx = ctx("estratto.csv", "Data;Importo\n10/03/2024;5,00\n");

        let result = pipeline.step_process_document(&mut ctx);
        assert!(matches!(
            result,
            Err(PipelineError::Processing(ProcessError::TooLarge { .. }))
        ));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("VERBALE DI ACCERTAMENTO - Codice della Strada"),
            RecordKind::Fine
        );
        assert_eq!(classify("Bonifico SEPA a vostro favore"), RecordKind::Transfer);
    }

    #[test]
    fn test_classify_transfer_paying_a_fine() {
        let advice = "BONIFICO SEPA\n\
                      Beneficiario: Comune di Milano\n\
                      Importo: EUR 42,00\n\
                      Causale: pagamento verbale A12345678901 sanzione CdS\n\
                      CRO: 0306909606512345";
        assert_eq!(classify(advice), RecordKind::Transfer);

        // Marker words inside longer words do not count
        assert_eq!(
            classify("Verbale n. 12 - sanzione per microcredito non pagato"),
            RecordKind::Fine
        );
    }
}
