//! Shared application state

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::adapter::ModelAdapter;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// The served model
    pub adapter: Arc<ModelAdapter>,

    /// Prometheus handle for rendering `/metrics`, absent when no recorder
    /// is installed
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(adapter: Arc<ModelAdapter>) -> Self {
        Self {
            adapter,
            metrics_handle: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
