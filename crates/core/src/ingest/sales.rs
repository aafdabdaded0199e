use crate::domain::series::{Observation, TrainingSeries};
use crate::ingest::types::SalesColumns;
use crate::time::cadence::parse_date;
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

const DATE_ALIASES: [&str; 2] = ["date", "ds"];
const VALUE_ALIASES: [&str; 4] = ["weekly_sales", "sales", "value", "y"];

pub fn load_sales_file(path: &Path, columns: &SalesColumns) -> Result<TrainingSeries> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("sales data unavailable: {}", path.display()))?;
    let t0 = std::time::Instant::now();
    let series = read_sales(file, columns)
        .with_context(|| format!("failed to load sales data from {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        observations = series.len(),
        first_date = ?series.first_date(),
        last_date = ?series.last_date(),
        elapsed_ms = t0.elapsed().as_millis(),
        "loaded sales series"
    );
    Ok(series)
}

/// Reads rows with a date and a sales column and collapses them to one value per date.
pub fn read_sales<R: Read>(reader: R, columns: &SalesColumns) -> Result<TrainingSeries> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .context("failed to read sales header row")?
        .clone();
    let date_idx = resolve_column(&headers, &columns.date, &DATE_ALIASES)?;
    let value_idx = resolve_column(&headers, &columns.value, &VALUE_ALIASES)?;

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result.context("malformed sales row")?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let raw_date = record.get(date_idx).unwrap_or_default();
        let date = parse_date(raw_date).with_context(|| format!("line {line}: bad date"))?;

        let raw_value = record.get(value_idx).unwrap_or_default();
        let value = raw_value
            .parse::<f64>()
            .with_context(|| format!("line {line}: bad sales value {raw_value:?}"))?;
        anyhow::ensure!(value.is_finite(), "line {line}: non-finite sales value");

        rows.push(Observation { date, value });
    }

    let raw_rows = rows.len();
    let series = TrainingSeries::from_observations(rows);
    tracing::debug!(raw_rows, observations = series.len(), "aggregated sales rows by date");
    Ok(series)
}

pub(crate) fn resolve_column(
    headers: &csv::StringRecord,
    wanted: &str,
    aliases: &[&str],
) -> Result<usize> {
    if let Some(idx) = headers.iter().position(|h| h == wanted) {
        return Ok(idx);
    }
    if let Some(idx) = headers.iter().position(|h| h.eq_ignore_ascii_case(wanted)) {
        return Ok(idx);
    }
    for alias in aliases {
        if let Some(idx) = headers.iter().position(|h| h.eq_ignore_ascii_case(alias)) {
            return Ok(idx);
        }
    }

    let found: Vec<&str> = headers.iter().collect();
    anyhow::bail!(
        "missing required column {wanted:?} (found: {})",
        found.join(", ")
    )
}
