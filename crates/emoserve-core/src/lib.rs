//! emoserve Core
//!
//! Types shared across emoserve components.
//!
//! This crate provides:
//! - The prediction request/response schema served over HTTP
//! - Input limits applied to every prediction request
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{InputLimits, LabelScore, PredictInput, PredictRequest, PredictResponse};
