use anyhow::Context;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

// Accepted date layouts for input files, tried in order.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
}

impl Frequency {
    pub fn step(self) -> Duration {
        match self {
            Frequency::Daily => Duration::days(1),
            Frequency::Weekly => Duration::weeks(1),
        }
    }
}

/// Upper bound on forecast periods accepted from configuration or callers.
pub const MAX_HORIZON_PERIODS: usize = 1_040;

/// Dates strictly after `last`, `periods` steps apart at `freq`.
///
/// `None` when `periods` exceeds [`MAX_HORIZON_PERIODS`] or a date would fall
/// outside the representable calendar.
pub fn future_dates(last: NaiveDate, periods: usize, freq: Frequency) -> Option<Vec<NaiveDate>> {
    if periods > MAX_HORIZON_PERIODS {
        return None;
    }
    let step = freq.step();
    let mut out = Vec::with_capacity(periods);
    let mut date = last;
    for _ in 0..periods {
        date = date.checked_add_signed(step)?;
        out.push(date);
    }
    Some(out)
}

pub fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    let s = raw.trim();
    // Timestamps such as "2010-02-05 00:00:00" keep only their date part.
    let s = s.split_whitespace().next().unwrap_or(s);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .with_context(|| format!("unrecognized date: {raw:?}"))
}

pub fn parse_iso_date(raw: &str) -> anyhow::Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")?)
}
