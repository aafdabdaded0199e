pub mod additive;
pub mod error;
pub mod pipeline;

use crate::domain::forecast::ForecastRow;
use crate::forecast::error::ForecastError;
use crate::domain::series::TrainingSeries;
use crate::time::cadence::{future_dates, Frequency, MAX_HORIZON_PERIODS};
use chrono::NaiveDate;

/// A time-series model family that can be fit to a training series.
pub trait ForecastEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn fit(&self, series: &TrainingSeries) -> anyhow::Result<Box<dyn FittedModel>>;
}

pub trait FittedModel: Send {
    /// Dates the model was fit on, ascending.
    fn history_dates(&self) -> &[NaiveDate];

    fn predict(&self, dates: &[NaiveDate]) -> anyhow::Result<Vec<ForecastRow>>;

    /// History dates followed by `periods` dates after the last one.
    fn make_future_frame(
        &self,
        periods: usize,
        freq: Frequency,
    ) -> anyhow::Result<Vec<NaiveDate>> {
        let history = self.history_dates();
        let mut frame = history.to_vec();
        if let Some(&last) = history.last() {
            let future = future_dates(last, periods, freq).ok_or_else(|| {
                ForecastError::predict(format!(
                    "horizon of {periods} periods after {last} is out of range \
                     (at most {MAX_HORIZON_PERIODS} periods within the calendar)"
                ))
            })?;
            frame.extend(future);
        }
        Ok(frame)
    }
}
