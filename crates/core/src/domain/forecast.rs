use crate::time::cadence::MONTH_LABELS;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub yhat: f64,
    pub yhat_upper: f64,
    pub yhat_lower: f64,
    pub trend: f64,
    pub yearly: f64,
}

/// Mean yearly-seasonality effect per calendar month, January first.
/// Months with no rows are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeasonality {
    pub values: [Option<f64>; 12],
}

impl MonthlySeasonality {
    pub fn from_rows(rows: &[ForecastRow]) -> Self {
        let mut sums = [0.0_f64; 12];
        let mut counts = [0_usize; 12];
        for row in rows {
            let idx = row.date.month0() as usize;
            sums[idx] += row.yearly;
            counts[idx] += 1;
        }

        let mut values = [None; 12];
        for (idx, value) in values.iter_mut().enumerate() {
            if counts[idx] > 0 {
                *value = Some(sums[idx] / counts[idx] as f64);
            }
        }
        Self { values }
    }

    /// `month` is 1-based.
    pub fn get(&self, month: u32) -> Option<f64> {
        let idx = usize::try_from(month).ok()?.checked_sub(1)?;
        self.values.get(idx).copied().flatten()
    }

    pub fn labeled(&self) -> impl Iterator<Item = (&'static str, Option<f64>)> + '_ {
        MONTH_LABELS.iter().copied().zip(self.values.iter().copied())
    }
}

/// Full fitted-plus-future frame of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastOutput {
    rows: Vec<ForecastRow>,
    last_training_date: NaiveDate,
    future_start: usize,
    monthly: MonthlySeasonality,
}

impl ForecastOutput {
    /// `rows` must be in ascending date order.
    pub fn new(rows: Vec<ForecastRow>, last_training_date: NaiveDate) -> Self {
        let future_start = rows.partition_point(|r| r.date <= last_training_date);
        let monthly = MonthlySeasonality::from_rows(&rows);
        Self {
            rows,
            last_training_date,
            future_start,
            monthly,
        }
    }

    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn last_training_date(&self) -> NaiveDate {
        self.last_training_date
    }

    pub fn in_sample(&self) -> &[ForecastRow] {
        &self.rows[..self.future_start]
    }

    /// Rows dated strictly after the last training date.
    pub fn future(&self) -> &[ForecastRow] {
        &self.rows[self.future_start..]
    }

    pub fn monthly_seasonality(&self) -> &MonthlySeasonality {
        &self.monthly
    }
}
