//! Prometheus metrics

use anyhow::Result;
use emoserve_core::LabelScore;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{debug, info};

pub const REQUESTS_TOTAL: &str = "emoserve_requests_total";
pub const ERRORS_TOTAL: &str = "emoserve_errors_total";
pub const INFERENCE_LATENCY_US: &str = "emoserve_inference_latency_us";
pub const MODEL_READY: &str = "emoserve_model_ready";
pub const PREDICTIONS_TOTAL: &str = "emoserve_predictions_total";

/// Install the global Prometheus recorder and return the handle for rendering
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    describe_metrics();
    set_model_ready(false);

    info!("Metrics exporter initialized");
    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_counter!(REQUESTS_TOTAL, "Total number of prediction requests received");
    metrics::describe_counter!(ERRORS_TOTAL, "Total number of failed requests by kind");
    metrics::describe_histogram!(
        INFERENCE_LATENCY_US,
        metrics::Unit::Microseconds,
        "Pipeline latency per prediction request in microseconds"
    );
    metrics::describe_gauge!(MODEL_READY, "1 once the model has loaded, 0 before");
    metrics::describe_counter!(
        PREDICTIONS_TOTAL,
        "Prediction sets by their highest-scoring label"
    );
}

pub fn record_request(model: &str) {
    metrics::counter!(REQUESTS_TOTAL, "model" => model.to_string()).increment(1);
}

pub fn record_error(kind: &'static str) {
    metrics::counter!(ERRORS_TOTAL, "kind" => kind).increment(1);
}

pub fn record_inference_latency(model: &str, latency_us: u64) {
    metrics::histogram!(INFERENCE_LATENCY_US, "model" => model.to_string())
        .record(latency_us as f64);
}

pub fn set_model_ready(ready: bool) {
    metrics::gauge!(MODEL_READY).set(if ready { 1.0 } else { 0.0 });
}

/// Count each prediction set under its highest-scoring label
pub fn record_predictions(model: &str, predictions: &[Vec<LabelScore>]) {
    for set in predictions {
        let Some(top) = set.iter().max_by(|a, b| a.score.total_cmp(&b.score)) else {
            continue;
        };
        debug!(model = %model, label = %top.label, score = top.score, "Top label");
        metrics::counter!(
            PREDICTIONS_TOTAL,
            "model" => model.to_string(),
            "label" => top.label.clone()
        )
        .increment(1);
    }
}
