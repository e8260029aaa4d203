// ⚠️ Error taxonomy for the master build
// Date parse failures never reach this type: they degrade to an absent date.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A column the scoring rules read is absent from every source batch
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading one extract failed; names the file so the bad one can be pulled
    #[error("Failed to read extract {file}: {source}")]
    Extract {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
