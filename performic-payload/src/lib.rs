#![warn(missing_docs)]
//! Performic Payload
//!
//! Data model shared by every performic crate and the defensive decoder that
//! turns the compute kernel's raw text payload into a structured result.
//!
//! The kernel is opaque: it hands back one JSON object per run. Decoding never
//! fails past this crate's boundary. Malformed input becomes a failure result
//! whose `message` explains what went wrong.

mod decode;
mod result;
mod thermal;

pub use decode::{DecodeError, ResultDecoder, decode, try_decode};
pub use result::BenchmarkResult;
pub use thermal::ThermalPoint;

/// Maximum accepted payload size (16 MB) to prevent memory exhaustion
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Message used when a failure payload carries no message of its own
pub const UNEXPLAINED_FAILURE_MESSAGE: &str = "Kernel reported failure without a message";
