// 🏁 Ranker / Exporter - best data first, one master file out
//
// Ranking only reorders: score ascending, then register date ascending,
// records without a date last within their score. Nothing is filtered.

use crate::error::Result;
use crate::pipeline::{RunContext, Stage};
use crate::record::{is_reserved_column, Record, COL_SOURCE_FILE, DERIVED_COLUMNS};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::info;

const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// RANKER
// ============================================================================

fn cmp_register_date(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort by (fake score, register date)
pub fn rank_records(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by(|a, b| {
        a.fake_score()
            .cmp(&b.fake_score())
            .then_with(|| cmp_register_date(a.register_date, b.register_date))
    });
    records
}

pub struct Ranker;

impl Stage for Ranker {
    fn name(&self) -> &str {
        "ranker"
    }

    fn apply(&self, records: Vec<Record>, _ctx: &RunContext) -> Result<Vec<Record>> {
        Ok(rank_records(records))
    }
}

// ============================================================================
// TABLE RENDERING
// ============================================================================

/// Original columns, then provenance, then derived columns
///
/// An input column sharing a reserved name is replaced, not repeated.
pub fn output_headers(headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .filter(|h| !is_reserved_column(h))
        .cloned()
        .chain(std::iter::once(COL_SOURCE_FILE.to_string()))
        .chain(DERIVED_COLUMNS.iter().map(|c| c.to_string()))
        .collect()
}

fn render_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default()
}

fn render_bool(value: bool) -> String {
    let text = if value { "True" } else { "False" };
    text.to_string()
}

/// One output row aligned with `output_headers(headers)`
pub fn render_row(headers: &[String], record: &Record) -> Vec<String> {
    let mut row: Vec<String> = headers
        .iter()
        .filter(|h| !is_reserved_column(h))
        .map(|h| record.cell(h).unwrap_or("").to_string())
        .collect();

    row.push(record.source_file.clone());
    row.push(record.mobile_norm.clone());
    row.push(render_date(record.register_date));
    row.push(record.status.label().to_string());
    row.push(render_date(record.predicted_birth_date));
    row.push(
        record
            .child_age_months
            .map(|age| format!("{:.1}", age))
            .unwrap_or_default(),
    );

    match &record.assessment {
        Some(a) => {
            row.push(a.score.to_string());
            row.push(a.confidence.label().to_string());
            row.push(render_bool(a.sales_ready));
            row.push(a.reasons());
        }
        None => row.extend(std::iter::repeat(String::new()).take(4)),
    }

    row
}

// ============================================================================
// SINK
// ============================================================================

/// Accepts the final ordered table
pub trait RecordSink {
    fn write(&self, headers: &[String], records: &[Record]) -> Result<()>;
}

/// Writes the master table as CSV, replacing any previous file
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        CsvSink {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvSink {
    fn write(&self, headers: &[String], records: &[Record]) -> Result<()> {
        let mut writer = csv::Writer::from_path(&self.path)?;

        writer.write_record(output_headers(headers))?;
        for record in records {
            writer.write_record(render_row(headers, record))?;
        }
        writer.flush()?;

        info!(path = %self.path.display(), rows = records.len(), "Wrote master file");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_score::{ConfidenceLabel, FakeAssessment, FakeSignal};
    use crate::record::{RawRow, COL_FIRST_NAME, COL_MOBILE};
    use crate::status::PregnancyStatus;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn scored(line: usize, score: u8, date: Option<NaiveDate>) -> Record {
        let mut r = Record::from_raw("a.csv", RawRow::new(line));
        r.register_date = date;
        r.assessment = Some(FakeAssessment {
            score,
            signals: Vec::new(),
            confidence: ConfidenceLabel::from_score(score),
            sales_ready: score <= 70,
        });
        r
    }

    #[test]
    fn test_rank_by_score_then_date() {
        let records = vec![
            scored(2, 45, Some(ymd(2024, 1, 1))),
            scored(3, 0, Some(ymd(2024, 5, 1))),
            scored(4, 0, Some(ymd(2024, 2, 1))),
            scored(5, 20, None),
        ];

        let ranked = rank_records(records);
        let lines: Vec<usize> = ranked.iter().map(|r| r.line_number).collect();

        assert_eq!(lines, vec![4, 3, 5, 2]);
    }

    #[test]
    fn test_missing_dates_last_within_score() {
        let records = vec![
            scored(2, 15, None),
            scored(3, 15, Some(ymd(2024, 1, 1))),
            scored(4, 15, None),
        ];

        let ranked = rank_records(records);
        let lines: Vec<usize> = ranked.iter().map(|r| r.line_number).collect();

        // stable for the two undated rows
        assert_eq!(lines, vec![3, 2, 4]);
    }

    #[test]
    fn test_rank_keeps_every_record() {
        let records: Vec<Record> = (0..20).map(|i| scored(i, (i * 7 % 101) as u8, None)).collect();
        let ranked = rank_records(records);

        assert_eq!(ranked.len(), 20);
        assert!(ranked.windows(2).all(|w| w[0].fake_score() <= w[1].fake_score()));
    }

    #[test]
    fn test_output_headers_order() {
        let headers = vec![
            COL_MOBILE.to_string(),
            COL_SOURCE_FILE.to_string(),
            COL_FIRST_NAME.to_string(),
        ];

        let out = output_headers(&headers);

        assert_eq!(&out[..3], &["Mobile", "FirstName", "Source_File"]);
        assert_eq!(out.len(), 3 + DERIVED_COLUMNS.len());
        assert_eq!(out.last().map(|s| s.as_str()), Some("Fake_Reasons"));
    }

    #[test]
    fn test_render_row() {
        let headers = vec![COL_FIRST_NAME.to_string(), COL_MOBILE.to_string()];
        let row = RawRow::new(2).with_cell(COL_MOBILE, "0901 234 567");
        let mut r = Record::from_raw("b.csv", row);
        r.mobile_norm = "0901234567".to_string();
        r.register_date = Some(ymd(2024, 3, 5));
        r.status = PregnancyStatus::HasChild;
        r.child_age_months = Some(6.0);
        r.assessment = Some(FakeAssessment {
            score: 20,
            signals: vec![FakeSignal::MissingName],
            confidence: ConfidenceLabel::High,
            sales_ready: true,
        });

        let out = render_row(&headers, &r);

        assert_eq!(
            out,
            vec![
                "", "0901 234 567", "b.csv", "0901234567", "2024-03-05", "Has_Child", "", "6.0",
                "20", "High", "True", "missing_name",
            ]
        );
        assert_eq!(out.len(), output_headers(&headers).len());
    }

    #[test]
    fn test_input_fake_score_column_is_replaced() {
        let headers = vec![
            COL_FIRST_NAME.to_string(),
            "Fake_Score".to_string(),
            COL_MOBILE.to_string(),
        ];
        let row = RawRow::new(2)
            .with_cell(COL_FIRST_NAME, "Lan")
            .with_cell("Fake_Score", "99")
            .with_cell(COL_MOBILE, "0901234567");
        let mut r = Record::from_raw("master.csv", row);
        r.assessment = Some(FakeAssessment {
            score: 0,
            signals: Vec::new(),
            confidence: ConfidenceLabel::High,
            sales_ready: true,
        });

        let out_headers = output_headers(&headers);
        let out = render_row(&headers, &r);

        assert_eq!(out_headers.iter().filter(|h| *h == "Fake_Score").count(), 1);
        assert_eq!(&out_headers[..3], &["FirstName", "Mobile", "Source_File"]);
        assert_eq!(out.len(), out_headers.len());
        let score_col = out_headers.iter().position(|h| h == "Fake_Score").unwrap();
        assert_eq!(out[score_col], "0");
    }
}
