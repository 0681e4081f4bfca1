use crate::models::Dataset;
use crate::stats::Classifier;
use std::sync::Arc;

/// Fetched once at startup and never mutated afterwards, so handlers share it without locking.
#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub classifier: Arc<Classifier>,
}

impl AppState {
    pub fn new(dataset: Dataset, classifier: Classifier) -> Self {
        Self {
            dataset: Arc::new(dataset),
            classifier: Arc::new(classifier),
        }
    }
}
