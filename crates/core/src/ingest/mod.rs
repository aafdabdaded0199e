pub mod sales;
pub mod stores;
pub mod types;

use crate::config::Settings;
use crate::domain::series::TrainingSeries;
use types::{LoadReport, SalesColumns, StoreReference};

/// Everything read from disk at startup. Read-only afterwards.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub series: TrainingSeries,
    pub stores: StoreReference,
    pub report: LoadReport,
}

/// Fails only when the primary sales file cannot be used.
pub fn load_all(settings: &Settings) -> anyhow::Result<LoadedData> {
    let columns = SalesColumns {
        date: settings.date_column.clone(),
        value: settings.value_column.clone(),
    };
    let series = sales::load_sales_file(&settings.sales_data_path, &columns)?;
    anyhow::ensure!(
        !series.is_empty(),
        "sales data unavailable: {} has no rows",
        settings.sales_data_path.display()
    );

    let mut report = LoadReport::default();
    let stores = stores::load_store_reference(
        settings.stores_data_path.as_deref(),
        &settings.store_id_column,
        &mut report,
    );

    Ok(LoadedData {
        series,
        stores,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn settings_for(sales: PathBuf, stores: Option<PathBuf>) -> Settings {
        Settings {
            sales_data_path: sales,
            stores_data_path: stores,
            ..Settings::default()
        }
    }

    fn sales_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn missing_store_file_still_loads_sales() {
        let sales = sales_file(
            "Store,Date,Weekly_Sales\n1,2024-01-07,100\n2,2024-01-07,50\n1,2024-01-14,120\n",
        );
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_for(
            sales.path().to_path_buf(),
            Some(dir.path().join("stores.csv")),
        );

        let data = load_all(&settings).unwrap();
        assert_eq!(data.series.len(), 2);
        assert!(data.stores.is_empty());
        assert_eq!(data.report.warnings.len(), 1);
    }

    #[test]
    fn disabled_store_reference_records_no_warning() {
        let sales = sales_file("Date,Weekly_Sales\n2024-01-07,100\n");
        let data = load_all(&settings_for(sales.path().to_path_buf(), None)).unwrap();
        assert_eq!(data.series.len(), 1);
        assert!(data.report.warnings.is_empty());
    }

    #[test]
    fn header_only_sales_file_is_unavailable() {
        let sales = sales_file("Date,Weekly_Sales\n");
        let err = load_all(&settings_for(sales.path().to_path_buf(), None)).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.starts_with("sales data unavailable"), "{msg}");
        assert!(msg.contains("has no rows"), "{msg}");
    }

    #[test]
    fn missing_sales_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_all(&settings_for(dir.path().join("train.csv"), None)).unwrap_err();
        assert!(format!("{err:#}").starts_with("sales data unavailable"));
    }
}
