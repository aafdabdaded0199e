pub mod session;
pub mod views;

use crate::domain::series::TrainingSeries;
use crate::forecast::pipeline::{select_window, ForecastPipeline};
use chrono::NaiveDate;
use std::sync::Arc;
use views::DashboardView;

/// Loaded series plus pipeline, shared read-only across requests.
#[derive(Debug, Clone)]
pub struct Dashboard {
    series: Arc<TrainingSeries>,
    pipeline: ForecastPipeline,
}

impl Dashboard {
    pub fn new(series: TrainingSeries, pipeline: ForecastPipeline) -> Self {
        Self {
            series: Arc::new(series),
            pipeline,
        }
    }

    pub fn series(&self) -> &TrainingSeries {
        &self.series
    }

    pub fn pipeline(&self) -> &ForecastPipeline {
        &self.pipeline
    }

    /// Full refit on the observations within `[start, end]`; no caching.
    pub fn recompute(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> anyhow::Result<DashboardView> {
        let training = select_window(&self.series, start, end)?;
        let output = self.pipeline.run(&training)?;
        Ok(views::render(&output, &training))
    }
}
