//! Model adapter between the HTTP host and the classification pipeline

use axum::http::HeaderMap;
use emoserve_classifiers::{ModelLoader, TextClassifier};
use emoserve_core::{
    Error, InputLimits, LabelScore, PredictRequest, PredictResponse, Result,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::telemetry;

/// Header whose value is attached to prediction logs; a random id is used
/// when it is absent
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Lifecycle of the adapter
///
/// `NotReady` moves to `Ready` once, when the pipeline loads. There is no
/// way back and no reload.
#[derive(Clone, Default)]
pub enum AdapterState {
    #[default]
    NotReady,
    Ready(Arc<dyn TextClassifier>),
}

impl AdapterState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl std::fmt::Debug for AdapterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotReady => f.write_str("NotReady"),
            Self::Ready(classifier) => f.debug_tuple("Ready").field(&classifier.name()).finish(),
        }
    }
}

/// Named model served by the endpoint
pub struct ModelAdapter {
    name: String,
    limits: InputLimits,
    state: RwLock<AdapterState>,
    workers: Semaphore,
}

impl ModelAdapter {
    /// Create an adapter in the `NotReady` state
    ///
    /// `workers` bounds how many predictions run at once.
    pub fn new(name: impl Into<String>, limits: InputLimits, workers: usize) -> Self {
        Self {
            name: name.into(),
            limits,
            state: RwLock::new(AdapterState::NotReady),
            workers: Semaphore::new(workers.max(1)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limits(&self) -> &InputLimits {
        &self.limits
    }

    pub fn is_ready(&self) -> bool {
        self.state.read().is_ready()
    }

    /// Labels of the loaded model, empty before loading
    pub fn labels(&self) -> Vec<String> {
        match &*self.state.read() {
            AdapterState::Ready(classifier) => classifier.labels().to_vec(),
            AdapterState::NotReady => Vec::new(),
        }
    }

    /// Load the pipeline and move to `Ready`
    ///
    /// Fails with [`Error::AlreadyLoaded`] when called on a ready adapter;
    /// the loaded pipeline is kept. A loader error leaves the adapter
    /// `NotReady`.
    pub async fn load(&self, loader: &dyn ModelLoader) -> Result<()> {
        if self.is_ready() {
            return Err(Error::AlreadyLoaded(self.name.clone()));
        }

        let start = Instant::now();
        info!(model = %self.name, source = %loader.model_id(), "Loading model");

        let classifier = loader.load().await.map_err(|e| {
            error!(model = %self.name, "Failed to load model: {}", e);
            e
        })?;

        {
            let mut state = self.state.write();
            if state.is_ready() {
                return Err(Error::AlreadyLoaded(self.name.clone()));
            }
            *state = AdapterState::Ready(classifier);
        }

        telemetry::set_model_ready(true);
        info!(
            model = %self.name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model ready"
        );
        Ok(())
    }

    /// Classify the request input, one prediction set per input item
    pub async fn predict(
        &self,
        request: PredictRequest,
        headers: &HeaderMap,
    ) -> Result<PredictResponse> {
        let classifier = self.classifier()?;
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        telemetry::record_request(&self.name);
        info!(model = %self.name, request_id = %request_id, "Request: {:?}", request);

        self.limits.validate(&request.input)?;
        let texts = request.input.into_texts();
        info!(model = %self.name, request_id = %request_id, "input: {:?}", texts);

        let _permit = self
            .workers
            .acquire()
            .await
            .map_err(|e| Error::internal(format!("Worker pool closed: {}", e)))?;
        debug!(model = %self.name, request_id = %request_id, "Acquired worker");

        let start = Instant::now();
        let results = classifier.classify_batch(&texts).await?;
        telemetry::record_inference_latency(&self.name, start.elapsed().as_micros() as u64);

        let predictions: Vec<Vec<LabelScore>> =
            results.into_iter().map(|r| r.into_scores()).collect();
        info!(model = %self.name, request_id = %request_id, "results: {:?}", predictions);
        telemetry::record_predictions(&self.name, &predictions);

        Ok(PredictResponse { predictions })
    }

    fn classifier(&self) -> Result<Arc<dyn TextClassifier>> {
        match &*self.state.read() {
            AdapterState::Ready(classifier) => Ok(Arc::clone(classifier)),
            AdapterState::NotReady => Err(Error::NotReady(self.name.clone())),
        }
    }
}

impl std::fmt::Debug for ModelAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAdapter")
            .field("name", &self.name)
            .field("state", &*self.state.read())
            .finish()
    }
}
