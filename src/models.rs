use crate::stats::ALL_DATES;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// A single customer visit as stored in the remote collection.
///
/// Field names follow both the English schema and the Italian one the
/// collection was first populated with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    #[serde(default, alias = "data", deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(
        default,
        alias = "orario",
        alias = "time_of_day",
        alias = "time-of-day",
        deserialize_with = "lenient_text"
    )]
    pub time: Option<String>,
    #[serde(default, alias = "descrizione", deserialize_with = "lenient_text")]
    pub description: Option<String>,
}

impl VisitRecord {
    pub fn new(date: &str, time: &str, description: &str) -> Self {
        Self {
            date: Some(date.to_string()),
            time: Some(time.to_string()),
            description: Some(description.to_string()),
        }
    }
}

/// Accepts strings and scalar values as text; null and nested values become `None`.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(text) => Some(text),
        serde_json::Value::Number(number) => Some(number.to_string()),
        serde_json::Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    })
}

/// The records fetched at startup. Read-only for the rest of the process.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<VisitRecord>,
}

impl Dataset {
    /// Dates are trimmed on load so the dropdown offers exactly what a filter matches.
    pub fn new(mut records: Vec<VisitRecord>) -> Self {
        for record in &mut records {
            record.date = record
                .date
                .take()
                .map(|date| date.trim().to_string())
                .filter(|date| !date.is_empty());
        }
        Self { records }
    }

    pub fn records(&self) -> &[VisitRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct dates, ascending. A stored date equal to the "all" sentinel is left out.
    pub fn dates(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|record| record.date.as_deref())
            .filter(|date| *date != ALL_DATES)
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn contains_date(&self, date: &str) -> bool {
        date != ALL_DATES
            && self
                .records
                .iter()
                .any(|record| record.date.as_deref() == Some(date))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DateOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DateOptionsResponse {
    pub default: String,
    pub options: Vec<DateOption>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub records: usize,
}
