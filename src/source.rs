use crate::config::{FirestoreConfig, SourceConfig};
use crate::models::{Dataset, VisitRecord};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use std::{collections::BTreeMap, path::PathBuf, time::Duration};
use tokio::fs;
use tracing::{debug, error, info};

const PAGE_SIZE: u32 = 300;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const DATE_FIELDS: [&str; 2] = ["date", "data"];
const TIME_FIELDS: [&str; 4] = ["time", "time_of_day", "time-of-day", "orario"];
const DESCRIPTION_FIELDS: [&str; 2] = ["description", "descrizione"];

/// Any failure to obtain the collection. Callers treat every variant as "source unavailable".
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },
    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    fn describe(&self) -> String;

    async fn fetch_all(&self) -> Result<Vec<VisitRecord>, SourceError>;
}

pub fn build_source(config: &SourceConfig) -> Result<Box<dyn RecordSource>, SourceError> {
    let source: Box<dyn RecordSource> = match config {
        SourceConfig::File { path } => Box::new(JsonFileSource::new(path.clone())),
        SourceConfig::Firestore(firestore) => Box::new(FirestoreSource::new(firestore.clone())?),
    };
    Ok(source)
}

/// Fetches once; an unavailable source yields an empty dataset.
pub async fn load_dataset(source: &dyn RecordSource) -> Dataset {
    match source.fetch_all().await {
        Ok(records) => {
            info!(source = %source.describe(), records = records.len(), "fetched visit records");
            Dataset::new(records)
        }
        Err(err) => {
            error!(source = %source.describe(), "record source unavailable, starting with no data: {err}");
            Dataset::default()
        }
    }
}

/// A JSON array of flat records, e.g. an export of the collection.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl RecordSource for JsonFileSource {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn fetch_all(&self) -> Result<Vec<VisitRecord>, SourceError> {
        let bytes = fs::read(&self.path).await.map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| SourceError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

/// Reads a Firestore collection through the REST API.
pub struct FirestoreSource {
    client: reqwest::Client,
    config: FirestoreConfig,
}

impl FirestoreSource {
    pub fn new(config: FirestoreConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| SourceError::Http {
                url: config.base_url.clone(),
                source,
            })?;
        Ok(Self { client, config })
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/{}/documents/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.project_id,
            self.config.database,
            self.config.collection
        )
    }

    async fn fetch_page(&self, url: &str, page_token: Option<&str>) -> Result<ListDocumentsResponse, SourceError> {
        let http_err = |source: reqwest::Error| SourceError::Http {
            url: url.to_string(),
            source,
        };

        let mut request = self.client.get(url).query(&[("pageSize", PAGE_SIZE.to_string())]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status,
            });
        }
        response.json().await.map_err(http_err)
    }
}

#[async_trait]
impl RecordSource for FirestoreSource {
    fn describe(&self) -> String {
        format!(
            "firestore {}/{}",
            self.config.project_id, self.config.collection
        )
    }

    async fn fetch_all(&self) -> Result<Vec<VisitRecord>, SourceError> {
        let url = self.collection_url();
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.fetch_page(&url, page_token.as_deref()).await?;
            debug!(documents = page.documents.len(), "fetched firestore page");
            records.extend(page.documents.iter().map(FirestoreDocument::to_record));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(records)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: BTreeMap<String, FirestoreValue>,
}

impl FirestoreDocument {
    fn to_record(&self) -> VisitRecord {
        VisitRecord {
            date: self.text(&DATE_FIELDS, "%Y-%m-%d"),
            time: self.text(&TIME_FIELDS, "%H:%M"),
            description: self.text(&DESCRIPTION_FIELDS, "%Y-%m-%d %H:%M"),
        }
    }

    fn text(&self, names: &[&str], timestamp_format: &str) -> Option<String> {
        names
            .iter()
            .find_map(|name| self.fields.get(*name))
            .and_then(|value| value.text(timestamp_format))
    }
}

/// One typed Firestore value. Map, array and null values carry no text.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirestoreValue {
    string_value: Option<String>,
    integer_value: Option<serde_json::Value>,
    double_value: Option<f64>,
    boolean_value: Option<bool>,
    timestamp_value: Option<String>,
}

impl FirestoreValue {
    fn text(&self, timestamp_format: &str) -> Option<String> {
        if let Some(text) = &self.string_value {
            return Some(text.clone());
        }
        if let Some(integer) = &self.integer_value {
            return match integer {
                serde_json::Value::String(text) => Some(text.clone()),
                serde_json::Value::Number(number) => Some(number.to_string()),
                _ => None,
            };
        }
        if let Some(double) = self.double_value {
            return Some(double.to_string());
        }
        if let Some(flag) = self.boolean_value {
            return Some(flag.to_string());
        }
        self.timestamp_value.as_deref().map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|timestamp| timestamp.format(timestamp_format).to_string())
                .unwrap_or_else(|_| raw.to_string())
        })
    }
}
