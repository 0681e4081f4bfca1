use crate::stats::Classifier;
use std::{env, net::SocketAddr, path::PathBuf};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_PATH: &str = "data/visits.json";
pub const DEFAULT_COLLECTION: &str = "clienti";
pub const DEFAULT_DATABASE: &str = "(default)";
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid PORT value {0:?}")]
    InvalidPort(String),
    #[error("unknown STATS_SOURCE {0:?}, expected \"file\" or \"firestore\"")]
    UnknownSource(String),
    #[error("FIRESTORE_PROJECT_ID must be set when STATS_SOURCE=firestore")]
    MissingProject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirestoreConfig {
    pub base_url: String,
    pub project_id: String,
    pub database: String,
    pub collection: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    File { path: PathBuf },
    Firestore(FirestoreConfig),
}

impl SourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Firestore(_) => "firestore",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub source: SourceConfig,
    pub classifier: Classifier,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty());

        let port = match var("PORT") {
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidPort(value))?,
            None => DEFAULT_PORT,
        };

        let source = match var("STATS_SOURCE").as_deref().unwrap_or("file") {
            "file" => SourceConfig::File {
                path: PathBuf::from(var("STATS_DATA_PATH").unwrap_or_else(|| DEFAULT_DATA_PATH.to_string())),
            },
            "firestore" => SourceConfig::Firestore(FirestoreConfig {
                base_url: var("FIRESTORE_BASE_URL").unwrap_or_else(|| DEFAULT_FIRESTORE_URL.to_string()),
                project_id: var("FIRESTORE_PROJECT_ID").ok_or(ConfigError::MissingProject)?,
                database: var("FIRESTORE_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
                collection: var("FIRESTORE_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
                token: var("FIRESTORE_TOKEN"),
            }),
            other => return Err(ConfigError::UnknownSource(other.to_string())),
        };

        let classifier = match var("STATS_CHILD_KEYWORDS") {
            Some(keywords) => Classifier::new(keywords.split(',')),
            None => Classifier::default(),
        };

        Ok(Self {
            port,
            source,
            classifier,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}
