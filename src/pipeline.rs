// 🔗 Pipeline - merge, enrich, score, rank
//
// Every stage takes the full record collection and returns it enriched.
// Stages run strictly in order; each one owns the fields it writes.

use crate::config::{AppConfig, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::export::{CsvSink, Ranker, RecordSink};
use crate::fake_score::FakeScoring;
use crate::normalize::PhoneNormalizer;
use crate::predictor::Predictor;
use crate::record::{is_reserved_column, RawBatch, Record, REQUIRED_COLUMNS};
use crate::source::{BatchSource, CsvFolderSource};
use crate::status::StatusClassifier;
use crate::temporal::DateResolver;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

// ============================================================================
// STAGE CONTRACT
// ============================================================================

/// Batch-wide facts every stage may read
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Merged header list (union of all extracts, first-seen order)
    pub headers: Vec<String>,
    pub config: PipelineConfig,
    /// Captured once per run
    pub today: NaiveDate,
}

impl RunContext {
    pub fn new(headers: Vec<String>, config: PipelineConfig, today: NaiveDate) -> Self {
        RunContext {
            headers,
            config,
            today,
        }
    }
}

pub trait Stage {
    fn name(&self) -> &str;

    fn apply(&self, records: Vec<Record>, ctx: &RunContext) -> Result<Vec<Record>>;
}

// ============================================================================
// MERGE
// ============================================================================

/// Final, ranked table handed to the sink
#[derive(Debug, Clone)]
pub struct MasterTable {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

/// Concatenate batches; never drops or adds rows
pub fn merge_batches(batches: Vec<RawBatch>) -> MasterTable {
    let mut headers: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(batches.iter().map(|b| b.len()).sum());

    for batch in batches {
        for header in &batch.headers {
            if !is_reserved_column(header) && !headers.contains(header) {
                headers.push(header.clone());
            }
        }

        for row in batch.rows {
            records.push(Record::from_raw(&batch.source_file, row));
        }
    }

    MasterTable { headers, records }
}

/// Fails when a column the rules read is absent from every extract
pub fn check_required_columns(headers: &[String]) -> Result<()> {
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(PipelineError::MissingColumn(column.to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Standard order: phones, dates, status, predictions, score, rank
    pub fn new() -> Self {
        Pipeline {
            stages: vec![
                Box::new(PhoneNormalizer),
                Box::new(DateResolver),
                Box::new(StatusClassifier),
                Box::new(Predictor),
                Box::new(FakeScoring),
                Box::new(Ranker),
            ],
        }
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Merge batches and run every stage
    pub fn run(
        &self,
        batches: Vec<RawBatch>,
        config: &PipelineConfig,
        today: NaiveDate,
    ) -> Result<MasterTable> {
        config.validate()?;

        let MasterTable { headers, records } = merge_batches(batches);
        check_required_columns(&headers)?;

        info!(records = records.len(), columns = headers.len(), "Merged extracts");

        let ctx = RunContext::new(headers, config.clone(), today);
        let mut records = records;
        for stage in &self.stages {
            records = stage.apply(records, &ctx)?;
            debug!(stage = stage.name(), records = records.len(), "Stage complete");
        }

        Ok(MasterTable {
            headers: ctx.headers,
            records,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Source → pipeline → sink
///
/// Returns `Ok(None)` when the source has nothing to offer; that is a normal
/// early exit and nothing is written.
pub fn build_master<S: BatchSource + ?Sized, K: RecordSink + ?Sized>(
    source: &S,
    sink: &K,
    config: &PipelineConfig,
    today: NaiveDate,
) -> Result<Option<MasterTable>> {
    let batches = source.load()?;
    if batches.is_empty() {
        warn!("No extract files found, nothing to build");
        return Ok(None);
    }

    let table = Pipeline::new().run(batches, config, today)?;
    sink.write(&table.headers, &table.records)?;

    Ok(Some(table))
}

/// Folder of CSV extracts in, one CSV master file out
pub fn run_master_build(config: &AppConfig, today: NaiveDate) -> Result<Option<MasterTable>> {
    config.validate()?;

    let source = CsvFolderSource::new(&config.input_folder).excluding(&config.output_file);
    let sink = CsvSink::new(config.output_path());

    build_master(&source, &sink, &config.pipeline, today)
}

// ============================================================================
// TESTS
// ============================================================================
