use crate::config::Settings;
use crate::domain::forecast::ForecastOutput;
use crate::domain::series::TrainingSeries;
use crate::forecast::additive::AdditiveEngine;
use crate::forecast::error::ForecastError;
use crate::forecast::ForecastEngine;
use crate::time::cadence::Frequency;
use chrono::NaiveDate;
use std::sync::Arc;

/// Fit -> extend -> predict -> partition -> monthly seasonality.
///
/// Stateless between runs: every call fits a fresh model on the series it is given.
#[derive(Clone)]
pub struct ForecastPipeline {
    engine: Arc<dyn ForecastEngine>,
    horizon: usize,
    frequency: Frequency,
}

impl std::fmt::Debug for ForecastPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForecastPipeline")
            .field("engine", &self.engine.name())
            .field("horizon", &self.horizon)
            .field("frequency", &self.frequency)
            .finish()
    }
}

impl ForecastPipeline {
    pub fn new(engine: Arc<dyn ForecastEngine>, horizon: usize, frequency: Frequency) -> Self {
        Self {
            engine,
            horizon,
            frequency,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(AdditiveEngine::from_settings(settings)),
            settings.horizon_weeks,
            Frequency::Weekly,
        )
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn run(&self, series: &TrainingSeries) -> anyhow::Result<ForecastOutput> {
        let last = series
            .last_date()
            .ok_or_else(|| ForecastError::fit("training series is empty"))?;

        let t0 = std::time::Instant::now();
        let model = self
            .engine
            .fit(series)
            .map_err(|e| tag_stage(e, |d| ForecastError::fit(d)))?;
        let frame = model
            .make_future_frame(self.horizon, self.frequency)
            .map_err(|e| tag_stage(e, |d| ForecastError::predict(d)))?;
        let rows = model
            .predict(&frame)
            .map_err(|e| tag_stage(e, |d| ForecastError::predict(d)))?;

        let output = ForecastOutput::new(rows, last);
        tracing::debug!(
            engine = self.engine.name(),
            observations = series.len(),
            rows = output.rows().len(),
            future = output.future().len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "forecast pipeline run"
        );
        Ok(output)
    }

    /// Runs on the observations within `[start, end]` (inclusive, either bound optional).
    pub fn run_window(
        &self,
        series: &TrainingSeries,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> anyhow::Result<ForecastOutput> {
        self.run(&select_window(series, start, end)?)
    }
}

/// Observations within `[start, end]`; an inverted range is a window error.
pub fn select_window(
    series: &TrainingSeries,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> anyhow::Result<TrainingSeries> {
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(
                ForecastError::window(format!("start date {s} is after end date {e}")).into(),
            );
        }
    }
    Ok(series.between(start, end))
}

// Foreign engine errors keep their message verbatim under the given stage.
fn tag_stage(e: anyhow::Error, wrap: fn(String) -> ForecastError) -> anyhow::Error {
    if e.is::<ForecastError>() {
        e
    } else {
        wrap(format!("{e:#}")).into()
    }
}
