pub mod dashboard;
pub mod domain;
pub mod forecast;
pub mod ingest;
pub mod time;

pub mod config {
    use crate::time::cadence::MAX_HORIZON_PERIODS;
    use anyhow::Context;
    use std::path::PathBuf;
    use std::str::FromStr;

    const DEFAULT_SALES_DATA_PATH: &str = "train.csv";
    const DEFAULT_STORES_DATA_PATH: &str = "stores.csv";
    const DEFAULT_DATE_COLUMN: &str = "Date";
    const DEFAULT_VALUE_COLUMN: &str = "Weekly_Sales";
    const DEFAULT_STORE_ID_COLUMN: &str = "Store";
    const DEFAULT_HORIZON_WEEKS: usize = 10;
    const DEFAULT_INTERVAL_WIDTH: f64 = 0.80;
    const DEFAULT_YEARLY_FOURIER_ORDER: usize = 10;
    const DEFAULT_SEASONALITY_PRIOR_SCALE: f64 = 10.0;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub sales_data_path: PathBuf,
        pub stores_data_path: Option<PathBuf>,
        pub date_column: String,
        pub value_column: String,
        pub store_id_column: String,
        pub horizon_weeks: usize,
        pub interval_width: f64,
        pub yearly_fourier_order: usize,
        pub seasonality_prior_scale: f64,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                sales_data_path: PathBuf::from(DEFAULT_SALES_DATA_PATH),
                stores_data_path: Some(PathBuf::from(DEFAULT_STORES_DATA_PATH)),
                date_column: DEFAULT_DATE_COLUMN.to_string(),
                value_column: DEFAULT_VALUE_COLUMN.to_string(),
                store_id_column: DEFAULT_STORE_ID_COLUMN.to_string(),
                horizon_weeks: DEFAULT_HORIZON_WEEKS,
                interval_width: DEFAULT_INTERVAL_WIDTH,
                yearly_fourier_order: DEFAULT_YEARLY_FOURIER_ORDER,
                seasonality_prior_scale: DEFAULT_SEASONALITY_PRIOR_SCALE,
                sentry_dsn: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = Self::default();

            // An explicitly empty STORES_DATA_PATH disables the store reference.
            let stores_data_path = match std::env::var("STORES_DATA_PATH") {
                Ok(s) if s.trim().is_empty() => None,
                Ok(s) => Some(PathBuf::from(s)),
                Err(_) => defaults.stores_data_path,
            };

            let settings = Self {
                sales_data_path: std::env::var("SALES_DATA_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.sales_data_path),
                stores_data_path,
                date_column: env_or("SALES_DATE_COLUMN", defaults.date_column),
                value_column: env_or("SALES_VALUE_COLUMN", defaults.value_column),
                store_id_column: env_or("STORE_ID_COLUMN", defaults.store_id_column),
                horizon_weeks: env_parse("FORECAST_HORIZON_WEEKS", defaults.horizon_weeks)?,
                interval_width: env_parse("FORECAST_INTERVAL_WIDTH", defaults.interval_width)?,
                yearly_fourier_order: env_parse(
                    "YEARLY_FOURIER_ORDER",
                    defaults.yearly_fourier_order,
                )?,
                seasonality_prior_scale: env_parse(
                    "SEASONALITY_PRIOR_SCALE",
                    defaults.seasonality_prior_scale,
                )?,
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            };

            settings.validate()?;
            Ok(settings)
        }

        /// Range checks on numeric settings. Re-run after applying overrides.
        pub fn validate(&self) -> anyhow::Result<()> {
            anyhow::ensure!(
                self.horizon_weeks <= MAX_HORIZON_PERIODS,
                "FORECAST_HORIZON_WEEKS must be at most {MAX_HORIZON_PERIODS} (got {})",
                self.horizon_weeks
            );
            anyhow::ensure!(
                self.interval_width > 0.0 && self.interval_width < 1.0,
                "FORECAST_INTERVAL_WIDTH must be in (0, 1) (got {})",
                self.interval_width
            );
            anyhow::ensure!(
                self.seasonality_prior_scale > 0.0,
                "SEASONALITY_PRIOR_SCALE must be > 0 (got {})",
                self.seasonality_prior_scale
            );
            Ok(())
        }
    }

    fn env_or(key: &str, default: String) -> String {
        std::env::var(key)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(default)
    }

    fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match std::env::var(key) {
            Ok(s) => s
                .trim()
                .parse::<T>()
                .with_context(|| format!("{key} is not a valid value: {s:?}")),
            Err(_) => Ok(default),
        }
    }

}
