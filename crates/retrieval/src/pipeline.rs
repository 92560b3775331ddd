//! Pipeline coordinator and batch runner
//!
//! Sequences the three stages per question (extract -> search -> verify),
//! aggregates verified ids into a deterministic result record, and emits an
//! optional audit snapshot of the intermediate state. Questions are
//! independent; the batch runner processes them concurrently up to a
//! configured limit and no question's failure blocks another's result.

use crate::constraints::ConstraintSet;
use crate::extractor::ConstraintExtractor;
use crate::index::VectorIndex;
use crate::search::{Candidate, CandidateSearch};
use crate::verifier::CandidateVerifier;
use astromenu_common::catalog::DishCatalog;
use astromenu_common::completion::CompletionClient;
use astromenu_common::embeddings::Embedder;
use astromenu_common::errors::Result;
use astromenu_common::models::{QuestionRecord, ResultRecord};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Per-question processing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionState {
    Extracting,
    Searching,
    Verifying,
    Done,
    Failed,
}

/// Per-question audit snapshot of the intermediate pipeline state
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub row_id: u32,
    pub question: String,
    pub constraints: ConstraintSet,
    pub rewritten_query: String,
    pub fallback_used: bool,
    pub candidates: Vec<Candidate>,
    pub verified_ids: Vec<u32>,
    pub state: QuestionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Outcome of processing one question
#[derive(Debug, Clone, Serialize)]
pub struct QuestionOutcome {
    pub result: ResultRecord,
    pub state: QuestionState,
    pub audit: AuditRecord,
}

/// The retrieval pipeline: extract, search, verify
pub struct RetrievalPipeline {
    extractor: ConstraintExtractor,
    search: CandidateSearch,
    verifier: CandidateVerifier,
    top_k: usize,
}

impl RetrievalPipeline {
    /// Wire the pipeline stages to their external services
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        catalog: Arc<DishCatalog>,
        top_k: usize,
    ) -> Self {
        Self {
            extractor: ConstraintExtractor::new(completion.clone()),
            search: CandidateSearch::new(embedder, index),
            verifier: CandidateVerifier::new(completion, catalog),
            top_k,
        }
    }

    /// Process a single question through the full pipeline.
    ///
    /// Extraction and verification failures degrade in place; only a search
    /// (index/embedding) failure produces a `Failed` outcome. The question's
    /// failure is recorded, never propagated to the rest of the batch.
    pub async fn process(&self, record: &QuestionRecord) -> QuestionOutcome {
        let row_id = record.row_id;
        tracing::info!(row_id, question = %record.question, "Processing question");

        tracing::debug!(row_id, state = ?QuestionState::Extracting, "Stage transition");
        let extraction = self.extractor.extract(&record.question).await;

        tracing::debug!(row_id, state = ?QuestionState::Searching, "Stage transition");
        let outcome = match self
            .search
            .search(&extraction.rewritten_query, &extraction.constraints, self.top_k)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(row_id, error = %e, "Search failed, recording question as failed");
                let audit = AuditRecord {
                    row_id,
                    question: record.question.clone(),
                    constraints: extraction.constraints,
                    rewritten_query: extraction.rewritten_query,
                    fallback_used: false,
                    candidates: vec![],
                    verified_ids: vec![],
                    state: QuestionState::Failed,
                    error: Some(e.to_string()),
                    completed_at: Utc::now(),
                };
                return QuestionOutcome {
                    result: ResultRecord::from_ids(row_id, vec![]),
                    state: QuestionState::Failed,
                    audit,
                };
            }
        };

        tracing::debug!(row_id, state = ?QuestionState::Verifying, "Stage transition");
        let verified = self
            .verifier
            .verify(&record.question, &outcome.candidates)
            .await;

        let verified_ids: Vec<u32> = verified.iter().copied().collect();
        tracing::info!(
            row_id,
            candidates = outcome.candidates.len(),
            verified = verified_ids.len(),
            fallback = outcome.fallback_used,
            "Question complete"
        );

        QuestionOutcome {
            result: ResultRecord::from_ids(row_id, verified),
            state: QuestionState::Done,
            audit: AuditRecord {
                row_id,
                question: record.question.clone(),
                constraints: extraction.constraints,
                rewritten_query: extraction.rewritten_query,
                fallback_used: outcome.fallback_used,
                candidates: outcome.candidates,
                verified_ids,
                state: QuestionState::Done,
                error: None,
                completed_at: Utc::now(),
            },
        }
    }
}

/// Options for a batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// CSV file with question records (row_id, question, difficulty)
    pub questions_file: PathBuf,

    /// CSV file for result records (row_id, result)
    pub output_file: PathBuf,

    /// Process only questions with this difficulty label
    pub difficulty: Option<String>,

    /// Maximum questions processed concurrently
    pub concurrency: usize,

    /// Directory for the audit snapshot (None disables it)
    pub audit_dir: Option<PathBuf>,
}

/// Summary of a completed batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Questions processed to a terminal state
    pub processed: usize,

    /// Questions that ended in the Failed state
    pub failed: usize,

    /// Input rows rejected before entering the pipeline
    pub invalid_rows: usize,

    /// Questions that produced an empty result
    pub empty_results: usize,
}

/// Run the pipeline over a batch of questions.
///
/// Malformed rows are rejected and reported individually; the remaining
/// questions run concurrently and results are written ordered by row id.
pub async fn run_batch(
    pipeline: Arc<RetrievalPipeline>,
    options: &BatchOptions,
) -> Result<BatchSummary> {
    let (records, invalid_rows) = read_questions(&options.questions_file)?;

    let records = match &options.difficulty {
        Some(difficulty) => {
            let total = records.len();
            let filtered: Vec<QuestionRecord> = records
                .into_iter()
                .filter(|r| {
                    r.difficulty
                        .as_deref()
                        .is_some_and(|d| d.eq_ignore_ascii_case(difficulty))
                })
                .collect();
            tracing::info!(
                difficulty = %difficulty,
                selected = filtered.len(),
                total,
                "Filtered questions by difficulty"
            );
            filtered
        }
        None => records,
    };

    tracing::info!(questions = records.len(), "Starting batch run");

    let concurrency = options.concurrency.max(1);
    let mut outcomes: Vec<QuestionOutcome> = stream::iter(records)
        .map(|record| {
            let pipeline = pipeline.clone();
            async move { pipeline.process(&record).await }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    // Deterministic output regardless of completion order
    outcomes.sort_by_key(|o| o.result.row_id);

    let summary = BatchSummary {
        processed: outcomes.len(),
        failed: outcomes
            .iter()
            .filter(|o| o.state == QuestionState::Failed)
            .count(),
        invalid_rows,
        empty_results: outcomes
            .iter()
            .filter(|o| o.result.result.is_empty())
            .count(),
    };

    write_results(&options.output_file, &outcomes)?;

    if let Some(audit_dir) = &options.audit_dir {
        write_audit(audit_dir, &outcomes)?;
    }

    tracing::info!(
        processed = summary.processed,
        failed = summary.failed,
        invalid_rows = summary.invalid_rows,
        empty_results = summary.empty_results,
        output = %options.output_file.display(),
        "Batch run complete"
    );

    Ok(summary)
}

/// Read and validate question records; malformed rows are reported and
/// skipped without aborting the batch.
fn read_questions(path: &Path) -> Result<(Vec<QuestionRecord>, usize)> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        astromenu_common::AppError::Validation {
            message: format!("Failed to read questions file {}: {}", path.display(), e),
            field: None,
        }
    })?;

    let mut records = Vec::new();
    let mut invalid_rows = 0;
    for (row, result) in reader.deserialize::<QuestionRecord>().enumerate() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                invalid_rows += 1;
                tracing::error!(row = row + 1, error = %e, "Rejected malformed question record");
            }
        }
    }

    Ok((records, invalid_rows))
}

fn write_results(path: &Path, outcomes: &[QuestionOutcome]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer =
        csv::Writer::from_path(path).map_err(|e| astromenu_common::AppError::Internal {
            message: format!("Failed to open output file {}: {}", path.display(), e),
        })?;
    for outcome in outcomes {
        writer
            .serialize(&outcome.result)
            .map_err(|e| astromenu_common::AppError::Internal {
                message: format!("Failed to write result record: {}", e),
            })?;
    }
    writer.flush()?;
    Ok(())
}

fn write_audit(dir: &Path, outcomes: &[QuestionOutcome]) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join("retrieval_results.json");
    let audits: Vec<&AuditRecord> = outcomes.iter().map(|o| &o.audit).collect();
    let json = serde_json::to_string_pretty(&audits)?;
    std::fs::write(&path, json)?;
    tracing::info!(path = %path.display(), "Audit snapshot written");
    Ok(())
}
