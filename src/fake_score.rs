// 🕵️ Fake-Score Engine - heuristic suspicion score for registrations
//
// Five independent signals, each worth 0 or its weight:
//
//   missing name            20
//   phone < 9 digits        25
//   phone seen twice+       20   (blank phones duplicate each other too)
//   missing register date   15
//   child age > 72 months   20   (absent age counts as 0)
//
// Sum → clamp 0..=100 → confidence label → sales-ready flag.

use crate::config::DEFAULT_FAKE_THRESHOLD;
use crate::error::Result;
use crate::pipeline::{RunContext, Stage};
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

pub const MAX_SCORE: u8 = 100;

// ============================================================================
// SIGNALS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FakeSignal {
    MissingName,
    InvalidPhone,
    DuplicatePhone,
    MissingDate,
    UnrealisticChildAge,
}

impl FakeSignal {
    pub const ALL: [FakeSignal; 5] = [
        FakeSignal::MissingName,
        FakeSignal::InvalidPhone,
        FakeSignal::DuplicatePhone,
        FakeSignal::MissingDate,
        FakeSignal::UnrealisticChildAge,
    ];

    pub fn weight(&self) -> u32 {
        match self {
            FakeSignal::MissingName => 20,
            FakeSignal::InvalidPhone => 25,
            FakeSignal::DuplicatePhone => 20,
            FakeSignal::MissingDate => 15,
            FakeSignal::UnrealisticChildAge => 20,
        }
    }

    /// Short code for the Fake_Reasons column
    pub fn code(&self) -> &str {
        match self {
            FakeSignal::MissingName => "missing_name",
            FakeSignal::InvalidPhone => "invalid_phone",
            FakeSignal::DuplicatePhone => "duplicate_phone",
            FakeSignal::MissingDate => "missing_date",
            FakeSignal::UnrealisticChildAge => "unrealistic_child_age",
        }
    }
}

// ============================================================================
// CONFIDENCE LABEL
// ============================================================================

/// Bins: ..=30 High, 31..=70 Medium, 71.. Low
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
}

impl ConfidenceLabel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=30 => ConfidenceLabel::High,
            31..=70 => ConfidenceLabel::Medium,
            _ => ConfidenceLabel::Low,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ConfidenceLabel::High => "High",
            ConfidenceLabel::Medium => "Medium",
            ConfidenceLabel::Low => "Low",
        }
    }
}

// ============================================================================
// ASSESSMENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakeAssessment {
    /// 0..=100
    pub score: u8,

    /// Signals that fired, in table order
    pub signals: Vec<FakeSignal>,

    pub confidence: ConfidenceLabel,

    /// score <= fake_threshold
    pub sales_ready: bool,
}

impl FakeAssessment {
    pub fn has(&self, signal: FakeSignal) -> bool {
        self.signals.contains(&signal)
    }

    /// `;`-joined signal codes, empty when nothing fired
    pub fn reasons(&self) -> String {
        self.signals
            .iter()
            .map(|s| s.code())
            .collect::<Vec<_>>()
            .join(";")
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct FakeScoreEngine {
    /// Phones shorter than this are invalid (default: 9)
    pub min_phone_digits: usize,

    /// Child ages above this many months are unrealistic (default: 72)
    pub max_child_age_months: f64,

    /// Highest score that is still sales-ready (default: 70)
    pub fake_threshold: u8,
}

impl FakeScoreEngine {
    pub fn new(fake_threshold: u8) -> Self {
        FakeScoreEngine {
            min_phone_digits: 9,
            max_child_age_months: 72.0,
            fake_threshold,
        }
    }

    /// Occurrences of every normalized phone in the batch, blanks included
    pub fn phone_counts<'a>(&self, records: &'a [Record]) -> HashMap<&'a str, usize> {
        let mut counts = HashMap::new();
        for record in records {
            *counts.entry(record.mobile_norm.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Which signals fire for one record, given batch-wide phone counts
    pub fn signals(&self, record: &Record, phone_counts: &HashMap<&str, usize>) -> Vec<FakeSignal> {
        FakeSignal::ALL
            .iter()
            .copied()
            .filter(|signal| match signal {
                FakeSignal::MissingName => record.first_name().is_none(),
                FakeSignal::InvalidPhone => record.mobile_norm.len() < self.min_phone_digits,
                FakeSignal::DuplicatePhone => {
                    phone_counts.get(record.mobile_norm.as_str()).copied().unwrap_or(0) > 1
                }
                FakeSignal::MissingDate => record.register_date.is_none(),
                FakeSignal::UnrealisticChildAge => {
                    record.child_age_months.unwrap_or(0.0) > self.max_child_age_months
                }
            })
            .collect()
    }

    pub fn assess(&self, record: &Record, phone_counts: &HashMap<&str, usize>) -> FakeAssessment {
        let signals = self.signals(record, phone_counts);

        let raw: u32 = signals.iter().map(|s| s.weight()).sum();
        let score = raw.min(MAX_SCORE as u32) as u8;

        FakeAssessment {
            score,
            signals,
            confidence: ConfidenceLabel::from_score(score),
            sales_ready: score <= self.fake_threshold,
        }
    }

    /// Assess every record; duplicate detection spans the whole slice
    pub fn assess_batch(&self, records: &[Record]) -> Vec<FakeAssessment> {
        let counts = self.phone_counts(records);
        records.iter().map(|r| self.assess(r, &counts)).collect()
    }

    pub fn batch_summary(&self, records: &[Record]) -> BatchSummary {
        let assessments: Vec<&FakeAssessment> =
            records.iter().filter_map(|r| r.assessment.as_ref()).collect();

        let count_label =
            |label: ConfidenceLabel| assessments.iter().filter(|a| a.confidence == label).count();
        let count_signal =
            |signal: FakeSignal| assessments.iter().filter(|a| a.has(signal)).count();

        let average_score = if assessments.is_empty() {
            0.0
        } else {
            assessments.iter().map(|a| a.score as f64).sum::<f64>() / assessments.len() as f64
        };

        BatchSummary {
            total_records: records.len(),
            high_count: count_label(ConfidenceLabel::High),
            medium_count: count_label(ConfidenceLabel::Medium),
            low_count: count_label(ConfidenceLabel::Low),
            sales_ready_count: assessments.iter().filter(|a| a.sales_ready).count(),
            duplicate_phone_count: count_signal(FakeSignal::DuplicatePhone),
            blank_phone_count: records.iter().filter(|r| r.mobile_norm.is_empty()).count(),
            average_score,
        }
    }
}

impl Default for FakeScoreEngine {
    fn default() -> Self {
        Self::new(DEFAULT_FAKE_THRESHOLD)
    }
}

// ============================================================================
// BATCH SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_records: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub sales_ready_count: usize,
    pub duplicate_phone_count: usize,
    pub blank_phone_count: usize,
    pub average_score: f64,
}

impl BatchSummary {
    pub fn summary(&self) -> String {
        format!(
            "{} records: avg score {:.1} | {} high, {} medium, {} low | {} sales-ready, {} duplicate phones ({} blank)",
            self.total_records,
            self.average_score,
            self.high_count,
            self.medium_count,
            self.low_count,
            self.sales_ready_count,
            self.duplicate_phone_count,
            self.blank_phone_count
        )
    }
}

// ============================================================================
// STAGE
// ============================================================================

/// Scores every record and freezes it
pub struct FakeScoring;

impl Stage for FakeScoring {
    fn name(&self) -> &str {
        "fake_scoring"
    }

    fn apply(&self, mut records: Vec<Record>, ctx: &RunContext) -> Result<Vec<Record>> {
        let engine = FakeScoreEngine::new(ctx.config.fake_threshold);
        let assessments = engine.assess_batch(&records);

        for (record, assessment) in records.iter_mut().zip(assessments) {
            record.assessment = Some(assessment);
        }

        let summary = engine.batch_summary(&records);
        info!(
            total = summary.total_records,
            sales_ready = summary.sales_ready_count,
            duplicates = summary.duplicate_phone_count,
            "{}",
            summary.summary()
        );

        Ok(records)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RawRow, COL_FIRST_NAME, COL_MOBILE};
    use chrono::NaiveDate;

    fn create_test_record(name: &str, phone_norm: &str, dated: bool, child_age: Option<f64>) -> Record {
        let row = RawRow::new(2)
            .with_cell(COL_FIRST_NAME, name)
            .with_cell(COL_MOBILE, phone_norm);
        let mut record = Record::from_raw("test.csv", row);
        record.mobile_norm = phone_norm.to_string();
        record.register_date = if dated {
            NaiveDate::from_ymd_opt(2024, 3, 1)
        } else {
            None
        };
        record.child_age_months = child_age;
        record
    }

    #[test]
    fn test_clean_record_scores_zero() {
        let engine = FakeScoreEngine::default();
        let records = vec![create_test_record("Lan", "0901234567", true, None)];

        let a = &engine.assess_batch(&records)[0];

        assert_eq!(a.score, 0);
        assert!(a.signals.is_empty());
        assert_eq!(a.confidence, ConfidenceLabel::High);
        assert!(a.sales_ready);
        assert_eq!(a.reasons(), "");
    }

    #[test]
    fn test_missing_name_and_short_phone_scores_45() {
        let engine = FakeScoreEngine::default();
        let records = vec![
            create_test_record("", "12345", true, None),
            create_test_record("Mai", "0907654321", true, None),
        ];

        let a = &engine.assess_batch(&records)[0];

        assert_eq!(a.score, 45);
        assert_eq!(a.signals, vec![FakeSignal::MissingName, FakeSignal::InvalidPhone]);
        assert_eq!(a.confidence, ConfidenceLabel::Medium);
        assert_eq!(a.reasons(), "missing_name;invalid_phone");
    }

    #[test]
    fn test_duplicate_phone_penalizes_both() {
        let engine = FakeScoreEngine::default();
        let records = vec![
            create_test_record("Lan", "0901234567", true, None),
            create_test_record("Mai", "0901234567", true, None),
            create_test_record("Hoa", "0907654321", true, None),
        ];

        let out = engine.assess_batch(&records);

        assert_eq!(out[0].score, 20);
        assert_eq!(out[1].score, 20);
        assert!(out[0].has(FakeSignal::DuplicatePhone));
        assert!(!out[2].has(FakeSignal::DuplicatePhone));
    }

    #[test]
    fn test_blank_phones_duplicate_each_other() {
        let engine = FakeScoreEngine::default();
        let records = vec![
            create_test_record("Lan", "", true, None),
            create_test_record("Mai", "", true, None),
        ];

        let out = engine.assess_batch(&records);

        // 25 invalid + 20 duplicate
        assert_eq!(out[0].score, 45);
        assert_eq!(out[1].score, 45);
    }

    #[test]
    fn test_single_blank_phone_is_not_duplicate() {
        let engine = FakeScoreEngine::default();
        let records = vec![create_test_record("Lan", "", true, None)];

        let a = &engine.assess_batch(&records)[0];

        assert_eq!(a.signals, vec![FakeSignal::InvalidPhone]);
    }

    #[test]
    fn test_child_age_threshold() {
        let engine = FakeScoreEngine::default();
        let records = vec![
            create_test_record("A", "0900000001", true, Some(72.0)),
            create_test_record("B", "0900000002", true, Some(72.1)),
            create_test_record("C", "0900000003", true, None),
        ];

        let out = engine.assess_batch(&records);

        assert_eq!(out[0].score, 0);
        assert_eq!(out[1].score, 20);
        assert_eq!(out[2].score, 0);
    }

    #[test]
    fn test_worst_record_hits_100() {
        let engine = FakeScoreEngine::default();
        let records = vec![
            create_test_record("", "1", false, Some(100.0)),
            create_test_record("", "1", false, Some(100.0)),
        ];

        let a = &engine.assess_batch(&records)[0];

        assert_eq!(a.score, 100);
        assert_eq!(a.signals.len(), 5);
        assert_eq!(a.confidence, ConfidenceLabel::Low);
        assert!(!a.sales_ready);
    }

    #[test]
    fn test_confidence_boundaries() {
        assert_eq!(ConfidenceLabel::from_score(0), ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::from_score(30), ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::from_score(31), ConfidenceLabel::Medium);
        assert_eq!(ConfidenceLabel::from_score(70), ConfidenceLabel::Medium);
        assert_eq!(ConfidenceLabel::from_score(71), ConfidenceLabel::Low);
        assert_eq!(ConfidenceLabel::from_score(100), ConfidenceLabel::Low);
    }

    #[test]
    fn test_sales_ready_threshold() {
        let strict = FakeScoreEngine::new(40);
        let records = vec![create_test_record("", "12345", true, None)];

        assert!(!strict.assess_batch(&records)[0].sales_ready);
        assert!(FakeScoreEngine::default().assess_batch(&records)[0].sales_ready);
    }

    #[test]
    fn test_scores_always_in_bounds() {
        let engine = FakeScoreEngine::default();
        let names = ["", "Lan"];
        let phones = ["", "123", "0901234567"];
        let mut records = Vec::new();
        for name in names {
            for phone in phones {
                for dated in [true, false] {
                    for age in [None, Some(10.0), Some(80.0)] {
                        records.push(create_test_record(name, phone, dated, age));
                    }
                }
            }
        }

        for a in engine.assess_batch(&records) {
            assert!(a.score <= 100);
            assert_eq!(a.confidence, ConfidenceLabel::from_score(a.score));
        }
    }

    #[test]
    fn test_batch_summary() {
        let engine = FakeScoreEngine::default();
        let mut records = vec![
            create_test_record("Lan", "0901234567", true, None),
            create_test_record("", "", false, None),
            create_test_record("", "", false, Some(90.0)),
        ];
        let assessments = engine.assess_batch(&records);
        for (r, a) in records.iter_mut().zip(assessments) {
            r.assessment = Some(a);
        }

        let summary = engine.batch_summary(&records);

        // scores: 0, 80, 100
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.high_count, 1);
        assert_eq!(summary.low_count, 2);
        assert_eq!(summary.sales_ready_count, 1);
        assert_eq!(summary.duplicate_phone_count, 2);
        assert_eq!(summary.blank_phone_count, 2);
        assert!((summary.average_score - 60.0).abs() < 1e-9);
        assert!(!summary.summary().is_empty());
    }
}
