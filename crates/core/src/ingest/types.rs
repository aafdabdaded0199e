use serde::Serialize;
use std::collections::BTreeMap;

pub const UNKNOWN_STORE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesColumns {
    pub date: String,
    pub value: String,
}

impl Default for SalesColumns {
    fn default() -> Self {
        Self {
            date: "Date".to_string(),
            value: "Weekly_Sales".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreRecord {
    pub store: String,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreReference {
    pub records: Vec<StoreRecord>,
}

impl StoreReference {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, store: &str) -> Option<&StoreRecord> {
        self.records.iter().find(|r| r.store == store)
    }
}

/// Recoverable problems met while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub warnings: Vec<String>,
}

impl LoadReport {
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(warning = %message, "load warning");
        self.warnings.push(message);
    }
}
