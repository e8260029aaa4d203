// 🔮 Predictor - forward-looking estimates conditioned on status
//
// Pregnant  → predicted birth date = register date + remaining_weeks * 7 days
// Has_Child → child age in months = (today - register date) / 30 days, 1 decimal
// Unknown   → nothing
//
// An absent register date never produces a fabricated prediction.

use crate::error::Result;
use crate::pipeline::{RunContext, Stage};
use crate::record::Record;
use crate::status::PregnancyStatus;
use chrono::{Days, NaiveDate};

/// Days in a "month" for child age estimates
pub const DAYS_PER_MONTH: f64 = 30.0;

pub fn predict_birth_date(register_date: Option<NaiveDate>, remaining_weeks: i64) -> Option<NaiveDate> {
    let days = u64::try_from(remaining_weeks.checked_mul(7)?).ok()?;
    register_date?.checked_add_days(Days::new(days))
}

/// Child age in months, rounded to one decimal (negative for future dates)
pub fn child_age_months(register_date: Option<NaiveDate>, today: NaiveDate) -> Option<f64> {
    let elapsed_days = (today - register_date?).num_days();
    let months = elapsed_days as f64 / DAYS_PER_MONTH;
    Some((months * 10.0).round() / 10.0)
}

pub struct Predictor;

impl Stage for Predictor {
    fn name(&self) -> &str {
        "predictor"
    }

    fn apply(&self, records: Vec<Record>, ctx: &RunContext) -> Result<Vec<Record>> {
        let weeks = ctx.config.remaining_weeks;

        Ok(records
            .into_iter()
            .map(|mut record| {
                let (birth, age) = match record.status {
                    PregnancyStatus::Pregnant => (predict_birth_date(record.register_date, weeks), None),
                    PregnancyStatus::HasChild => (None, child_age_months(record.register_date, ctx.today)),
                    PregnancyStatus::Unknown => (None, None),
                };
                record.predicted_birth_date = birth;
                record.child_age_months = age;
                record
            })
            .collect())
    }
}
