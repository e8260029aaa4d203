// 🤰 Status Classifier - pregnancy / child status from survey markers
// Presence test only: any non-empty S1/S2 cell counts, whatever it says.

use crate::error::Result;
use crate::pipeline::{RunContext, Stage};
use crate::record::{Record, COL_S1, COL_S2};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PregnancyStatus {
    /// S1 answered
    Pregnant,
    /// S2 answered (and S1 not)
    HasChild,
    Unknown,
}

impl PregnancyStatus {
    /// Label written to the master file
    pub fn label(&self) -> &str {
        match self {
            PregnancyStatus::Pregnant => "Pregnant",
            PregnancyStatus::HasChild => "Has_Child",
            PregnancyStatus::Unknown => "Unknown",
        }
    }
}

/// S1 wins over S2; neither means Unknown
pub fn classify(record: &Record) -> PregnancyStatus {
    if record.has_cell(COL_S1) {
        return PregnancyStatus::Pregnant;
    }

    if record.has_cell(COL_S2) {
        return PregnancyStatus::HasChild;
    }

    PregnancyStatus::Unknown
}

pub struct StatusClassifier;

impl Stage for StatusClassifier {
    fn name(&self) -> &str {
        "status_classifier"
    }

    fn apply(&self, records: Vec<Record>, _ctx: &RunContext) -> Result<Vec<Record>> {
        let records: Vec<Record> = records
            .into_iter()
            .map(|mut record| {
                record.status = classify(&record);
                record
            })
            .collect();

        debug!(
            pregnant = records.iter().filter(|r| r.status == PregnancyStatus::Pregnant).count(),
            has_child = records.iter().filter(|r| r.status == PregnancyStatus::HasChild).count(),
            "Classified pregnancy status"
        );

        Ok(records)
    }
}
