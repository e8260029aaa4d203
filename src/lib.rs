// P3 Master Builder - Core Library
// Merges registration extracts, scores them for fakeness, ranks the result.

pub mod config;
pub mod error;
pub mod export;         // Ranker + CSV sink
pub mod fake_score;     // Fake-Score Engine
pub mod logging;
pub mod normalize;      // Field Normalizer
pub mod pipeline;
pub mod predictor;
pub mod record;
pub mod source;         // CSV folder source
pub mod status;         // Status Classifier
pub mod temporal;       // Date Resolver

// Re-export commonly used types
pub use config::{AppConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use export::{rank_records, CsvSink, RecordSink};
pub use fake_score::{BatchSummary, ConfidenceLabel, FakeAssessment, FakeScoreEngine, FakeSignal};
pub use normalize::normalize_phone;
pub use pipeline::{build_master, run_master_build, MasterTable, Pipeline, RunContext, Stage};
pub use predictor::{child_age_months, predict_birth_date};
pub use record::{RawBatch, RawRow, Record};
pub use source::{BatchSource, CsvFolderSource};
pub use status::PregnancyStatus;
pub use temporal::{resolve_registration_date, DateMethod, DateResolution};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
