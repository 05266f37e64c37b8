//! Pipeline driver - runs one subject end to end, or a batch of subjects.
//!
//! For each subject the driver retrieves every document, chunks it,
//! extracts candidate claims chunk by chunk, verifies them into a
//! per-subject accumulator and finally scores the verified claims.
//!
//! Documents are processed in kind order (supplier profiles, filings,
//! bills) so that suppliers found early become prompt context for the
//! bills that follow. Failures scoped to a chunk are counted and never
//! abort the subject.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::{ExtractionError, Result};
use crate::pipeline::accumulator::ClaimAccumulator;
use crate::pipeline::aggregate::aggregate;
use crate::pipeline::chunker::Chunker;
use crate::pipeline::extract::{ExtractorClient, ParsedClaims};
use crate::pipeline::prompts::prompt_fingerprint;
use crate::pipeline::quality::QualityFilter;
use crate::pipeline::verify::QuoteVerifier;
use crate::stores::AggregateFile;
use crate::traits::{extractor::StructuredExtractor, source::DocumentSource, store::RecordStore};
use crate::types::chunk::Chunk;
use crate::types::config::PipelineConfig;
use crate::types::document::{DocumentKind, DocumentRef, KnownEntity, Subject, SubjectContext};
use crate::types::record::RiskRecord;

/// A subject left out of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSubject {
    pub id: String,
    pub reason: String,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Records in input order
    pub records: Vec<RiskRecord>,

    /// Subjects skipped because a document could not be retrieved
    pub skipped: Vec<SkippedSubject>,
}

impl BatchReport {
    /// Records from most negative direct risk to most positive.
    ///
    /// Ties are broken by subject id so the ranking is stable.
    pub fn ranking(&self) -> Vec<&RiskRecord> {
        let mut ranked: Vec<&RiskRecord> = self.records.iter().collect();
        ranked.sort_by(|a, b| {
            a.direct_risk
                .total_cmp(&b.direct_risk)
                .then_with(|| a.subject_id.cmp(&b.subject_id))
        });
        ranked
    }

    /// The `n` records with the most negative direct risk.
    pub fn most_at_risk(&self, n: usize) -> Vec<&RiskRecord> {
        let mut ranked = self.ranking();
        ranked.truncate(n);
        ranked
    }
}

/// Runs the extraction pipeline against a document source and an extractor.
pub struct Pipeline<S, E> {
    source: S,
    client: ExtractorClient<E>,
    chunker: Chunker,
    verifier: QuoteVerifier,
    config: PipelineConfig,
}

impl<S: DocumentSource, E: StructuredExtractor> Pipeline<S, E> {
    /// Create a pipeline. Fails if the configuration is invalid.
    pub fn new(source: S, extractor: E, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let chunker = Chunker::from_config(&config)?;
        let verifier = QuoteVerifier::from_config(&config);
        let client =
            ExtractorClient::new(extractor).with_max_context_entities(config.max_context_entities);

        Ok(Self {
            source,
            client,
            chunker,
            verifier,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The wrapped extractor.
    pub fn extractor(&self) -> &E {
        self.client.extractor()
    }

    /// Analyze one subject.
    pub async fn run(&self, subject: &Subject) -> Result<RiskRecord> {
        self.run_pipeline(&subject.id, &subject.context, &subject.documents)
            .await
    }

    /// Analyze one subject from its context and documents.
    ///
    /// Document names must be distinct within a subject; claims are
    /// de-duplicated and cited by name, so a repeated name is a
    /// [`ExtractionError::Config`]. Every document is retrieved before the
    /// first extractor call, so a [`ExtractionError::Retrieval`] costs no
    /// model calls. Errors scoped to
    /// a chunk are counted in the record's stats; an aggregation invariant
    /// violation is returned.
    pub async fn run_pipeline(
        &self,
        subject_id: &str,
        context: &SubjectContext,
        documents: &[DocumentRef],
    ) -> Result<RiskRecord> {
        info!(
            subject = subject_id,
            documents = documents.len(),
            "Analyzing subject"
        );

        check_unique_names(documents)?;

        let mut ordered: Vec<&DocumentRef> = documents.iter().collect();
        ordered.sort_by_key(|d| d.kind.priority());

        let mut texts = Vec::with_capacity(ordered.len());
        for document in &ordered {
            let text = self.source.get_document_text(&document.source_ref).await?;
            debug!(
                document = %document.name,
                chars = text.chars().count(),
                "Retrieved document"
            );
            texts.push(text);
        }

        let mut context = context.clone();
        let mut accumulator = ClaimAccumulator::new();

        for (document, text) in ordered.iter().zip(&texts) {
            self.process_document(document, text, &context, &mut accumulator)
                .await?;

            if document.kind == DocumentKind::SupplierProfile {
                let added = enrich_context(&mut context, &accumulator);
                if added > 0 {
                    debug!(
                        subject = subject_id,
                        added,
                        known_entities = context.known_entities.len(),
                        "Added suppliers to context"
                    );
                }
            }
        }

        let laws_analyzed = ordered
            .iter()
            .filter(|d| d.kind == DocumentKind::Bill)
            .count();
        let (claims, stats) = accumulator.into_parts();
        let score = aggregate(&context, laws_analyzed, &claims, &self.config)?;

        info!(
            subject = subject_id,
            direct_risk = score.direct_risk,
            indirect_risk = score.indirect_risk,
            time_factor = score.time_factor,
            claims_accepted = stats.claims_accepted,
            claims_rejected = stats.claims_rejected(),
            chunk_failures = stats.chunk_failures(),
            "Subject scored"
        );

        Ok(RiskRecord::new(
            subject_id,
            score,
            stats,
            prompt_fingerprint(),
        ))
    }

    /// Chunk one document, extract from each chunk and admit what verifies.
    async fn process_document(
        &self,
        document: &DocumentRef,
        text: &str,
        context: &SubjectContext,
        accumulator: &mut ClaimAccumulator,
    ) -> Result<()> {
        let kind = document.kind.schema_kind();
        let chunks = self.chunker.chunks(&document.name, text);
        let window_count = chunks.window_count();
        let (skippable, extractable): (Vec<Chunk>, Vec<Chunk>) =
            chunks.partition(|c| c.skippable);

        {
            let stats = accumulator.stats_mut();
            stats.documents_processed += 1;
            stats.chunks_total += window_count;
            stats.chunks_skipped_empty += window_count - skippable.len() - extractable.len();
            stats.chunks_skipped_boilerplate += skippable.len();
        }
        for chunk in &skippable {
            debug!(
                document = %document.name,
                chunk = chunk.sequence_index,
                "Skipping boilerplate chunk"
            );
        }

        info!(
            document = %document.name,
            kind = %kind,
            chunks = extractable.len(),
            "Extracting document"
        );

        // Results arrive in chunk order whatever the concurrency.
        let results: Vec<(Chunk, Result<ParsedClaims>)> = stream::iter(extractable)
            .map(|chunk| async move {
                let result = self.client.extract(&chunk, kind, context).await;
                (chunk, result)
            })
            .buffered(self.config.chunk_concurrency)
            .collect()
            .await;

        let filter = QualityFilter::new(&self.config);
        for (chunk, result) in results {
            match result {
                Ok(parsed) => {
                    accumulator.stats_mut().chunks_extracted += 1;
                    let admitted =
                        accumulator.admit(&document.name, &chunk, parsed, &self.verifier, &filter);
                    debug!(
                        document = %document.name,
                        chunk = chunk.sequence_index,
                        admitted,
                        "Chunk extracted"
                    );
                }
                Err(ExtractionError::ContextTooLarge { message, .. }) => {
                    warn!(
                        document = %document.name,
                        chunk = chunk.sequence_index,
                        chunk_chars = chunk.char_len(),
                        char_offset = chunk.char_offset_start,
                        error = %message,
                        "Chunk exceeds model context, skipping"
                    );
                    accumulator.stats_mut().chunks_context_too_large += 1;
                }
                Err(e @ ExtractionError::MalformedOutput { .. }) => {
                    warn!(
                        document = %document.name,
                        chunk = chunk.sequence_index,
                        error = %e,
                        "Discarding malformed response"
                    );
                    accumulator.stats_mut().chunks_malformed += 1;
                }
                Err(e) if e.is_chunk_local() => {
                    warn!(
                        document = %document.name,
                        chunk = chunk.sequence_index,
                        error = %e,
                        "Chunk extraction failed"
                    );
                    accumulator.stats_mut().chunks_failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Analyze subjects in order, saving each record as it completes.
    ///
    /// A subject whose documents cannot be retrieved, or whose document
    /// names collide, is skipped; any other subject-level error aborts the
    /// batch. When an aggregate file is
    /// given it is rewritten after every saved record.
    pub async fn run_batch<R: RecordStore>(
        &self,
        subjects: &[Subject],
        store: &R,
        aggregate_file: Option<&AggregateFile>,
    ) -> Result<BatchReport> {
        let mut report = BatchReport::default();

        for (i, subject) in subjects.iter().enumerate() {
            info!(
                subject = %subject.id,
                position = i + 1,
                total = subjects.len(),
                "Starting subject"
            );

            match self.run(subject).await {
                Ok(record) => {
                    store.save_record(&subject.id, &record).await?;
                    report.records.push(record);
                    if let Some(file) = aggregate_file {
                        file.write(&report.records).await?;
                    }
                }
                Err(e @ (ExtractionError::Retrieval { .. } | ExtractionError::Config { .. })) => {
                    warn!(subject = %subject.id, error = %e, "Skipping subject");
                    report.skipped.push(SkippedSubject {
                        id: subject.id.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            analyzed = report.records.len(),
            skipped = report.skipped.len(),
            "Batch complete"
        );
        Ok(report)
    }
}

fn check_unique_names(documents: &[DocumentRef]) -> Result<()> {
    let mut seen = HashSet::new();
    for document in documents {
        if !seen.insert(document.name.as_str()) {
            return Err(ExtractionError::config(format!(
                "duplicate document name \"{}\" (source {})",
                document.name, document.source_ref
            )));
        }
    }
    Ok(())
}

/// Add verified suppliers to the context. Returns how many were new.
fn enrich_context(context: &mut SubjectContext, accumulator: &ClaimAccumulator) -> usize {
    let mut added = 0;
    for supplier in accumulator.suppliers() {
        let mut entity =
            KnownEntity::new(supplier.name.clone()).with_criticality(supplier.criticality);
        entity.country = supplier.country.clone();
        if context.add_entity(entity) {
            added += 1;
        }
    }
    added
}
