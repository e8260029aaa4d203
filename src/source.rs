// 📂 Source provider - registration extracts in, raw batches out
//
// One CSV file = one RawBatch tagged with its file name. Header quirks are
// handled the way spreadsheet readers handle them: duplicate names get a
// ".1", ".2" suffix and blank names become "Unnamed: <index>".

use crate::error::{PipelineError, Result};
use crate::record::{RawBatch, RawRow};
use csv::ReaderBuilder;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// TRAIT
// ============================================================================

/// Yields zero or more raw batches for one run
pub trait BatchSource {
    fn load(&self) -> Result<Vec<RawBatch>>;
}

/// In-memory batches, mostly for tests and embedding
impl BatchSource for Vec<RawBatch> {
    fn load(&self) -> Result<Vec<RawBatch>> {
        Ok(self.clone())
    }
}

// ============================================================================
// HEADERS
// ============================================================================

/// Make header names unique: `Month, Month` → `Month, Month.1`
pub fn dedupe_headers(raw: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());

    for (idx, name) in raw.iter().enumerate() {
        let base = if name.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            name.clone()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }

        seen.insert(candidate.clone());
        out.push(candidate);
    }

    out
}

// ============================================================================
// CSV READING
// ============================================================================

/// Read one CSV extract into a batch
///
/// Short rows are padded with nulls; cells past the last header are ignored.
pub fn read_csv_batch(path: &Path) -> Result<RawBatch> {
    let source_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.csv")
        .to_string();

    let extract_error = |source: csv::Error| PipelineError::Extract {
        file: source_file.clone(),
        source,
    };

    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    // Byte records + lossy decoding: a legacy code-page export still loads,
    // with U+FFFD in place of the undecodable bytes
    let raw_headers: Vec<String> = reader
        .byte_headers()
        .map_err(extract_error)?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    let headers = dedupe_headers(&raw_headers);

    let mut batch = RawBatch::new(&source_file, headers.clone());
    let mut lossy_rows = 0;

    for (line_num, result) in reader.byte_records().enumerate() {
        let record = result.map_err(extract_error)?;

        // +2 because: 1-indexed + header row
        let mut row = RawRow::new(line_num + 2);
        let mut lossy = false;
        for (idx, column) in headers.iter().enumerate() {
            if let Some(bytes) = record.get(idx) {
                let value = String::from_utf8_lossy(bytes);
                lossy |= matches!(value, Cow::Owned(_));
                row.set(column, &value);
            }
        }
        if lossy {
            lossy_rows += 1;
        }

        batch.rows.push(row);
    }

    if lossy_rows > 0 {
        warn!(file = %source_file, rows = lossy_rows, "Extract is not valid UTF-8, undecodable bytes replaced");
    }

    debug!(file = %source_file, rows = batch.len(), columns = headers.len(), "Read extract");
    Ok(batch)
}

// ============================================================================
// FOLDER SOURCE
// ============================================================================

/// Every `*.csv` file directly inside a folder, except the output artifact
pub struct CsvFolderSource {
    folder: PathBuf,
    exclude_file: Option<String>,
}

impl CsvFolderSource {
    pub fn new<P: AsRef<Path>>(folder: P) -> Self {
        CsvFolderSource {
            folder: folder.as_ref().to_path_buf(),
            exclude_file: None,
        }
    }

    /// Builder pattern: skip a file name (the previous run's output)
    pub fn excluding(mut self, file_name: &str) -> Self {
        self.exclude_file = Some(file_name.to_string());
        self
    }

    /// Extract files, sorted by name so merge order is reproducible
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.folder)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }

            let is_csv = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if !is_csv {
                continue;
            }

            let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if self.exclude_file.as_deref() == Some(file_name) {
                continue;
            }

            files.push(path);
        }

        files.sort();
        Ok(files)
    }
}

impl BatchSource for CsvFolderSource {
    fn load(&self) -> Result<Vec<RawBatch>> {
        let files = self.discover()?;
        info!(folder = %self.folder.display(), count = files.len(), "Found extract files");

        let mut batches = Vec::with_capacity(files.len());
        for path in files {
            info!(file = %path.display(), "Reading extract");
            batches.push(read_csv_batch(&path)?);
        }

        Ok(batches)
    }
}

// ============================================================================
// TESTS
// ============================================================================
