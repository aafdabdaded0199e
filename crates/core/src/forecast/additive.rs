use crate::config::Settings;
use crate::domain::forecast::ForecastRow;
use crate::domain::series::TrainingSeries;
use crate::forecast::error::ForecastError;
use crate::forecast::{FittedModel, ForecastEngine};
use chrono::{Datelike, NaiveDate};
use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

const YEAR_DAYS: f64 = 365.25;
// Days from 0001-01-01 to 1970-01-01; seasonality is phased on days since the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;
// Near-zero ridge on the trend terms keeps the normal equations positive definite.
const TREND_RIDGE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct AdditiveConfig {
    pub yearly_seasonality: bool,
    pub yearly_fourier_order: usize,
    pub seasonality_prior_scale: f64,
    /// Coverage of the uncertainty band, e.g. 0.80.
    pub interval_width: f64,
}

impl Default for AdditiveConfig {
    fn default() -> Self {
        Self {
            yearly_seasonality: true,
            yearly_fourier_order: 10,
            seasonality_prior_scale: 10.0,
            interval_width: 0.80,
        }
    }
}

/// Linear trend plus a yearly Fourier seasonality, fit by penalised least squares.
#[derive(Debug, Clone, Default)]
pub struct AdditiveEngine {
    config: AdditiveConfig,
}

impl AdditiveEngine {
    pub fn new(config: AdditiveConfig) -> Self {
        Self { config }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(AdditiveConfig {
            yearly_seasonality: true,
            yearly_fourier_order: settings.yearly_fourier_order,
            seasonality_prior_scale: settings.seasonality_prior_scale,
            interval_width: settings.interval_width,
        })
    }

    pub fn config(&self) -> &AdditiveConfig {
        &self.config
    }

    fn seasonal_order(&self) -> usize {
        if self.config.yearly_seasonality {
            self.config.yearly_fourier_order
        } else {
            0
        }
    }
}

impl ForecastEngine for AdditiveEngine {
    fn name(&self) -> &'static str {
        "additive"
    }

    fn fit(&self, series: &TrainingSeries) -> anyhow::Result<Box<dyn FittedModel>> {
        let n = series.len();
        if n < 2 {
            return Err(ForecastError::fit(format!(
                "need at least 2 observations to fit, got {n}"
            ))
            .into());
        }

        let (Some(t0), Some(last)) = (series.first_date(), series.last_date()) else {
            return Err(ForecastError::fit("series has no dates").into());
        };
        let span = (last - t0).num_days() as f64;
        if span <= 0.0 {
            return Err(ForecastError::fit("series spans a single date").into());
        }

        let values: Vec<f64> = series.values().collect();
        let y_scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if y_scale == 0.0 || (max - min) <= f64::EPSILON * y_scale {
            return Err(ForecastError::fit("series has zero variance").into());
        }

        let order = self.seasonal_order();
        let p = 2 + 2 * order;
        let dates: Vec<NaiveDate> = series.dates().collect();

        let mut x = DMatrix::<f64>::zeros(n, p);
        for (i, &date) in dates.iter().enumerate() {
            let row = feature_row(date, t0, span, order);
            for (j, v) in row.into_iter().enumerate() {
                x[(i, j)] = v;
            }
        }
        let y = DVector::from_iterator(n, values.iter().map(|v| v / y_scale));

        // Seasonal coefficients get a Gaussian prior of width `seasonality_prior_scale`.
        let seasonal_ridge = 1.0 / self.config.seasonality_prior_scale.powi(2);
        let penalty = DVector::from_iterator(
            p,
            (0..p).map(|j| if j < 2 { TREND_RIDGE } else { seasonal_ridge }),
        );

        let xt = x.transpose();
        let a = &xt * &x + DMatrix::from_diagonal(&penalty);
        let b = &xt * &y;
        let beta = a
            .cholesky()
            .ok_or_else(|| ForecastError::fit("normal equations are not positive definite"))?
            .solve(&b);

        let resid = &y - &x * &beta;
        let sigma = (resid.norm_squared() / n as f64).sqrt();

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::fit(format!("standard normal unavailable: {e}")))?;
        let z = normal.inverse_cdf(0.5 + self.config.interval_width / 2.0);

        tracing::debug!(
            engine = self.name(),
            observations = n,
            order,
            sigma_scaled = sigma,
            "fit additive model"
        );

        Ok(Box::new(AdditiveModel {
            history: dates,
            t0,
            span,
            y_scale,
            order,
            beta: beta.iter().copied().collect(),
            sigma,
            z,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct AdditiveModel {
    history: Vec<NaiveDate>,
    t0: NaiveDate,
    span: f64,
    y_scale: f64,
    order: usize,
    beta: Vec<f64>,
    sigma: f64,
    z: f64,
}

impl FittedModel for AdditiveModel {
    fn history_dates(&self) -> &[NaiveDate] {
        &self.history
    }

    fn predict(&self, dates: &[NaiveDate]) -> anyhow::Result<Vec<ForecastRow>> {
        let mut out = Vec::with_capacity(dates.len());
        for &date in dates {
            let features = feature_row(date, self.t0, self.span, self.order);
            if features.len() != self.beta.len() {
                return Err(ForecastError::predict(format!(
                    "feature width {} does not match {} coefficients",
                    features.len(),
                    self.beta.len()
                ))
                .into());
            }

            let t = features[1];
            let trend = (self.beta[0] + self.beta[1] * t) * self.y_scale;
            let yearly: f64 = features[2..]
                .iter()
                .zip(&self.beta[2..])
                .map(|(f, b)| f * b)
                .sum::<f64>()
                * self.y_scale;
            let yhat = trend + yearly;

            // The band widens with distance past the end of the history (t > 1).
            let horizon = (t - 1.0).max(0.0);
            let margin = self.z * self.sigma * self.y_scale * (1.0 + horizon).sqrt();

            out.push(ForecastRow {
                date,
                yhat,
                yhat_upper: yhat + margin,
                yhat_lower: yhat - margin,
                trend,
                yearly,
            });
        }
        Ok(out)
    }
}

/// `[1, t, sin(2πk·d/365.25), cos(2πk·d/365.25), ...]` for k in 1..=order.
fn feature_row(date: NaiveDate, t0: NaiveDate, span: f64, order: usize) -> Vec<f64> {
    let t = (date - t0).num_days() as f64 / span;
    let days = f64::from(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE);

    let mut row = Vec::with_capacity(2 + 2 * order);
    row.push(1.0);
    row.push(t);
    for k in 1..=order {
        let angle = 2.0 * PI * k as f64 * days / YEAR_DAYS;
        row.push(angle.sin());
        row.push(angle.cos());
    }
    row
}
