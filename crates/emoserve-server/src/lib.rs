//! emoserve Server
//!
//! Serves a single named text-classification model over HTTP using the
//! KServe V1 path conventions (`/v1/models/{name}:predict`).
//!
//! The [`ModelAdapter`] owns the loaded pipeline and gates every prediction
//! on its readiness state; [`routes::create_router`] exposes it together with
//! health, readiness and Prometheus endpoints.

pub mod adapter;
pub mod config;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use adapter::{AdapterState, ModelAdapter};
pub use config::{AppConfig, ConfigOverrides, ServerConfig};
pub use state::AppState;
