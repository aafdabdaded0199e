use crate::domain::forecast::ForecastOutput;
use crate::domain::series::TrainingSeries;
use chrono::NaiveDate;
use serde::Serialize;

pub const NO_FORECAST: &str = "No forecast available";

const COLOR_FORECAST: &str = "#8ab4f8";
const COLOR_FUTURE: &str = "#ff6d00";
const COLOR_BAND: &str = "#4a4a4a";
const COLOR_BAND_FILL: &str = "rgba(74,74,74,0.3)";
const COLOR_TREND: &str = "#03dac6";
const COLOR_FUTURE_TREND: &str = "#bb86fc";
const COLOR_ACTUAL: &str = "#ffffff";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub forecast_date: Option<NaiveDate>,
    /// Rounded to cents.
    pub forecasted_sales: Option<f64>,
    pub date_text: String,
    pub sales_text: String,
}

impl Summary {
    fn empty() -> Self {
        Self {
            forecast_date: None,
            forecasted_sales: None,
            date_text: NO_FORECAST.to_string(),
            sales_text: NO_FORECAST.to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.forecast_date.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dash {
    Solid,
    Dot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fill {
    /// Plotly fill mode, e.g. `tonexty` (area down to the previous series).
    pub mode: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<Option<f64>>,
    pub color: &'static str,
    pub dash: Dash,
    pub fill: Option<Fill>,
    pub show_legend: bool,
}

impl Series {
    fn line(
        name: impl Into<String>,
        color: &'static str,
        points: impl Iterator<Item = (String, Option<f64>)>,
    ) -> Self {
        let (x, y) = points.unzip();
        Self {
            name: name.into(),
            x,
            y,
            color,
            dash: Dash::Solid,
            fill: None,
            show_legend: true,
        }
    }

    fn dotted(mut self) -> Self {
        self.dash = Dash::Dot;
        self
    }

    fn filled_to_previous(mut self, color: &'static str) -> Self {
        self.fill = Some(Fill {
            mode: "tonexty",
            color,
        });
        self
    }

    fn without_legend(mut self) -> Self {
        self.show_legend = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBundle {
    pub main_forecast: Chart,
    pub trend: Chart,
    pub yearly_seasonality: Chart,
    pub forecast_vs_actual: Chart,
}

/// Everything one dashboard render needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub training_start: Option<NaiveDate>,
    pub training_end: Option<NaiveDate>,
    pub summary: Summary,
    pub charts: ChartBundle,
}

pub fn render(output: &ForecastOutput, training: &TrainingSeries) -> DashboardView {
    DashboardView {
        training_start: training.first_date(),
        training_end: training.last_date(),
        summary: summarize(output),
        charts: ChartBundle {
            main_forecast: main_forecast_chart(output),
            trend: trend_chart(output),
            yearly_seasonality: yearly_seasonality_chart(output),
            forecast_vs_actual: forecast_vs_actual_chart(output, training),
        },
    }
}

pub fn summarize(output: &ForecastOutput) -> Summary {
    let Some(latest) = output.future().last() else {
        return Summary::empty();
    };

    let sales = round_cents(latest.yhat);
    Summary {
        forecast_date: Some(latest.date),
        forecasted_sales: Some(sales),
        date_text: latest.date.format("%Y-%m-%d").to_string(),
        sales_text: format_currency(sales),
    }
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// `$1,234,567.89`; negatives as `-$12.00`.
pub fn format_currency(v: f64) -> String {
    let cents = (v * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();

    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}${grouped}.{:02}", cents % 100)
}

fn date_label(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn main_forecast_chart(output: &ForecastOutput) -> Chart {
    let rows = output.rows();
    let future = output.future();

    Chart {
        title: "Weekly Sales Forecast".to_string(),
        x_title: "Date".to_string(),
        y_title: "Sales".to_string(),
        series: vec![
            Series::line(
                "Overall Forecast",
                COLOR_FORECAST,
                rows.iter().map(|r| (date_label(r.date), Some(r.yhat))),
            ),
            Series::line(
                format!("{}-week Forecast", future.len()),
                COLOR_FUTURE,
                future.iter().map(|r| (date_label(r.date), Some(r.yhat))),
            ),
            // Upper then lower, so the lower bound fills up to the upper one.
            Series::line(
                "Upper Bound",
                COLOR_BAND,
                rows.iter().map(|r| (date_label(r.date), Some(r.yhat_upper))),
            )
            .dotted()
            .without_legend(),
            Series::line(
                "Lower Bound",
                COLOR_BAND,
                rows.iter().map(|r| (date_label(r.date), Some(r.yhat_lower))),
            )
            .filled_to_previous(COLOR_BAND_FILL)
            .without_legend(),
        ],
    }
}

fn trend_chart(output: &ForecastOutput) -> Chart {
    Chart {
        title: "Trend Component".to_string(),
        x_title: "Date".to_string(),
        y_title: "Trend".to_string(),
        series: vec![
            Series::line(
                "Trend",
                COLOR_TREND,
                output.rows().iter().map(|r| (date_label(r.date), Some(r.trend))),
            ),
            Series::line(
                "Future Trend",
                COLOR_FUTURE_TREND,
                output.future().iter().map(|r| (date_label(r.date), Some(r.trend))),
            ),
        ],
    }
}

fn yearly_seasonality_chart(output: &ForecastOutput) -> Chart {
    Chart {
        title: "Yearly Seasonality Effect".to_string(),
        x_title: "Month".to_string(),
        y_title: "Effect".to_string(),
        series: vec![Series::line(
            "Yearly Seasonality",
            COLOR_TREND,
            output
                .monthly_seasonality()
                .labeled()
                .map(|(label, v)| (label.to_string(), v)),
        )],
    }
}

fn forecast_vs_actual_chart(output: &ForecastOutput, training: &TrainingSeries) -> Chart {
    Chart {
        title: "Forecast vs Actual".to_string(),
        x_title: "Date".to_string(),
        y_title: "Sales".to_string(),
        series: vec![
            Series::line(
                "Actual",
                COLOR_ACTUAL,
                training
                    .observations()
                    .iter()
                    .filter(|o| o.date <= output.last_training_date())
                    .map(|o| (date_label(o.date), Some(o.value))),
            ),
            Series::line(
                "Predicted",
                COLOR_FORECAST,
                output.rows().iter().map(|r| (date_label(r.date), Some(r.yhat))),
            ),
        ],
    }
}
