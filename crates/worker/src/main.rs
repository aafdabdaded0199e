use anyhow::Context;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salescast_core::dashboard::Dashboard;
use salescast_core::forecast::pipeline::ForecastPipeline;
use salescast_core::ingest::LoadedData;
use salescast_core::time::cadence::parse_iso_date;

#[derive(Debug, Parser)]
#[command(name = "salescast_report")]
struct Args {
    /// Sales CSV. Overrides SALES_DATA_PATH.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Store reference CSV. Overrides STORES_DATA_PATH.
    #[arg(long)]
    stores: Option<PathBuf>,

    /// Weeks to forecast past the last training date. Overrides FORECAST_HORIZON_WEEKS.
    #[arg(long)]
    horizon: Option<usize>,

    /// First training date (YYYY-MM-DD). Defaults to the start of the series.
    #[arg(long)]
    start: Option<String>,

    /// Last training date (YYYY-MM-DD). Defaults to the end of the series.
    #[arg(long)]
    end: Option<String>,

    /// Write the report here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut settings = salescast_core::config::Settings::from_env()?;
    apply_overrides(&args, &mut settings)?;

    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let result = run(&args, &settings);
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %format!("{err:#}"), "report failed");
    }
    result
}

fn apply_overrides(
    args: &Args,
    settings: &mut salescast_core::config::Settings,
) -> anyhow::Result<()> {
    if let Some(path) = &args.data {
        settings.sales_data_path = path.clone();
    }
    if let Some(path) = &args.stores {
        settings.stores_data_path = Some(path.clone());
    }
    if let Some(horizon) = args.horizon {
        settings.horizon_weeks = horizon;
    }
    settings
        .validate()
        .context("invalid command-line overrides")
}

fn run(args: &Args, settings: &salescast_core::config::Settings) -> anyhow::Result<()> {
    let start = args.start.as_deref().map(parse_iso_date).transpose()?;
    let end = args.end.as_deref().map(parse_iso_date).transpose()?;

    let data = salescast_core::ingest::load_all(settings)?;
    let pipeline = ForecastPipeline::from_settings(settings);
    let report = build_report(data, pipeline, start, end)?;

    let body = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, body)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{body}")?;
        }
    }
    Ok(())
}

fn build_report(
    data: LoadedData,
    pipeline: ForecastPipeline,
    start: Option<chrono::NaiveDate>,
    end: Option<chrono::NaiveDate>,
) -> anyhow::Result<serde_json::Value> {
    let warnings = data.report.warnings.clone();
    let stores = data.stores.len();
    let dashboard = Dashboard::new(data.series, pipeline);
    let view = dashboard.recompute(start, end)?;

    tracing::info!(
        forecast_date = %view.summary.date_text,
        forecasted_sales = %view.summary.sales_text,
        training_start = ?view.training_start,
        training_end = ?view.training_end,
        "forecast summary"
    );

    Ok(serde_json::json!({
        "generated_at": chrono::Utc::now(),
        "stores": stores,
        "warnings": warnings,
        "view": view,
    }))
}

fn init_sentry(settings: &salescast_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use salescast_core::domain::series::{Observation, TrainingSeries};
    use salescast_core::forecast::additive::AdditiveEngine;
    use salescast_core::ingest::types::{LoadReport, StoreReference};
    use salescast_core::time::cadence::Frequency;
    use std::sync::Arc;

    fn data(weeks: i64) -> LoadedData {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut report = LoadReport::default();
        report.warn("store reference stores.csv unavailable");
        LoadedData {
            series: TrainingSeries::from_observations((0..weeks).map(|i| Observation {
                date: start + Duration::weeks(i),
                value: 5_000.0 + 10.0 * i as f64 + ((i % 3) as f64) * 40.0,
            })),
            stores: StoreReference::default(),
            report,
        }
    }

    fn pipeline(horizon: usize) -> ForecastPipeline {
        ForecastPipeline::new(Arc::new(AdditiveEngine::default()), horizon, Frequency::Weekly)
    }

    #[test]
    fn report_carries_view_and_warnings() {
        let report = build_report(data(105), pipeline(10), None, None).unwrap();
        assert_eq!(report["view"]["summary"]["date_text"], "2025-03-09");
        assert_eq!(report["warnings"].as_array().unwrap().len(), 1);
        assert_eq!(report["stores"], 0);
    }

    #[test]
    fn zero_horizon_reports_no_forecast() {
        let report = build_report(data(30), pipeline(0), None, None).unwrap();
        assert_eq!(
            report["view"]["summary"]["sales_text"],
            salescast_core::dashboard::views::NO_FORECAST
        );
    }

    #[test]
    fn degenerate_window_fails() {
        let day = NaiveDate::from_ymd_opt(2023, 1, 8);
        assert!(build_report(data(30), pipeline(10), day, day).is_err());
    }

    #[test]
    fn cli_parses_flags() {
        let args = Args::try_parse_from([
            "salescast_report",
            "--data",
            "train.csv",
            "--horizon",
            "12",
            "--start",
            "2011-01-01",
            "--pretty",
        ])
        .unwrap();
        assert_eq!(args.horizon, Some(12));
        assert!(args.pretty);
        assert!(args.end.is_none());
    }

    #[test]
    fn overrides_apply_and_validate_horizon() {
        let mut settings = salescast_core::config::Settings::default();
        let args = Args::try_parse_from(["salescast_report", "--horizon", "26", "--data", "x.csv"])
            .unwrap();
        apply_overrides(&args, &mut settings).unwrap();
        assert_eq!(settings.horizon_weeks, 26);
        assert_eq!(settings.sales_data_path, PathBuf::from("x.csv"));

        let args = Args::try_parse_from(["salescast_report", "--horizon", "14000000"]).unwrap();
        let err = apply_overrides(&args, &mut settings).unwrap_err();
        assert!(format!("{err:#}").contains("FORECAST_HORIZON_WEEKS"));
    }

    #[test]
    fn oversized_horizon_pipeline_reports_error() {
        assert!(build_report(data(30), pipeline(14_000_000), None, None).is_err());
    }
}
