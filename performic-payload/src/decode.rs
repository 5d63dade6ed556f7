//! Result Payload Decoding
//!
//! Turns the kernel's JSON text into a [`BenchmarkResult`].
//!
//! Recognized keys:
//!
//! ```text
//! success            bool      required
//! message            string    optional
//! singleCore         number    optional
//! multiCore          number    optional
//! ramScore           number    optional
//! ramGBs             number    optional
//! l1GBs              number    optional
//! l2GBs              number    optional
//! singleCoreHistory  [number]  optional, absent -> []
//! multiCoreHistory   [number]  optional, absent -> []
//! ```
//!
//! Unknown keys are ignored and `null` counts as absent. A recognized key with
//! the wrong type fails the whole payload: partially trusted results are never
//! produced.

use crate::result::BenchmarkResult;
use crate::{MAX_PAYLOAD_SIZE, UNEXPLAINED_FAILURE_MESSAGE};
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while decoding a payload
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty payload")]
    Empty,

    #[error("payload too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPayload {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    single_core: Option<f64>,
    #[serde(default)]
    multi_core: Option<f64>,
    #[serde(default)]
    ram_score: Option<f64>,
    #[serde(default, rename = "ramGBs")]
    ram_gbs: Option<f64>,
    #[serde(default, rename = "l1GBs")]
    l1_gbs: Option<f64>,
    #[serde(default, rename = "l2GBs")]
    l2_gbs: Option<f64>,
    #[serde(default)]
    single_core_history: Option<Vec<f64>>,
    #[serde(default)]
    multi_core_history: Option<Vec<f64>>,
}

impl From<RawPayload> for BenchmarkResult {
    fn from(raw: RawPayload) -> Self {
        if !raw.success {
            return BenchmarkResult::failure(
                raw.message
                    .unwrap_or_else(|| UNEXPLAINED_FAILURE_MESSAGE.to_string()),
            );
        }

        let mut result = BenchmarkResult::success(raw.message.unwrap_or_default())
            .with_bandwidths(raw.ram_gbs, raw.l1_gbs, raw.l2_gbs)
            .with_histories(
                raw.single_core_history.unwrap_or_default(),
                raw.multi_core_history.unwrap_or_default(),
            );
        if let Some(score) = raw.single_core {
            result = result.with_single_core(score);
        }
        if let Some(score) = raw.multi_core {
            result = result.with_multi_core(score);
        }
        if let Some(score) = raw.ram_score {
            result = result.with_ram_score(score);
        }
        result
    }
}

/// Decode a payload, reporting why it was rejected.
pub fn try_decode(payload: &str) -> Result<BenchmarkResult, DecodeError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(DecodeError::TooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }
    if payload.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    let raw: RawPayload = serde_json::from_str(payload)?;
    Ok(raw.into())
}

/// Decode a payload. Never fails: rejected payloads become failure results.
pub fn decode(payload: &str) -> BenchmarkResult {
    match try_decode(payload) {
        Ok(result) => result,
        Err(e) => BenchmarkResult::failure(format!("Result parsing error: {}", e)),
    }
}

/// Stateless decoder handle for callers that inject decoding as a component
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultDecoder;

impl ResultDecoder {
    /// Decode a payload into a result (see [`decode`])
    pub fn decode(&self, payload: &str) -> BenchmarkResult {
        decode(payload)
    }
}
