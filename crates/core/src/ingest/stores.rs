use crate::ingest::types::{LoadReport, StoreRecord, StoreReference, UNKNOWN_STORE};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Best-effort load of the store side table. Never fails: problems are
/// recorded on `report` and an empty (or partially keyed) table is returned.
pub fn load_store_reference(
    path: Option<&Path>,
    id_column: &str,
    report: &mut LoadReport,
) -> StoreReference {
    let Some(path) = path else {
        return StoreReference::default();
    };

    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            report.warn(format!(
                "store reference {} unavailable ({e}); continuing without it",
                path.display()
            ));
            return StoreReference::default();
        }
    };

    match read_store_reference(file, id_column, report) {
        Ok(stores) => {
            tracing::info!(path = %path.display(), stores = stores.len(), "loaded store reference");
            stores
        }
        Err(e) => {
            report.warn(format!(
                "store reference {} unreadable ({e:#}); continuing without it",
                path.display()
            ));
            StoreReference::default()
        }
    }
}

pub fn read_store_reference<R: Read>(
    reader: R,
    id_column: &str,
    report: &mut LoadReport,
) -> anyhow::Result<StoreReference> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let id_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(id_column));
    if id_idx.is_none() {
        report.warn(format!(
            "store reference has no {id_column:?} column; using {UNKNOWN_STORE:?}"
        ));
    }

    let mut records = Vec::new();
    for result in csv_reader.records() {
        let row = result?;
        let store = id_idx
            .and_then(|idx| row.get(idx))
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_STORE)
            .to_string();

        let attributes: BTreeMap<String, String> = headers
            .iter()
            .zip(row.iter())
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != id_idx)
            .map(|(_, (h, v))| (h.to_string(), v.to_string()))
            .collect();

        records.push(StoreRecord { store, attributes });
    }

    Ok(StoreReference { records })
}
