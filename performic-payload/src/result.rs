//! Structured Benchmark Result
//!
//! Built once by the decoder (or by a failure path) and never mutated after.
//! Optional numbers keep "not measured" apart from "measured zero": the scoring
//! policy depends on that distinction.

use serde::Serialize;

/// Outcome of one compute-kernel run.
///
/// When `success` is false, `message` is authoritative and the numeric
/// accessors return `None` / empty series regardless of what the payload
/// carried, so downstream consumers cannot pick up untrusted values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    single_core: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    multi_core: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ram_score: Option<f64>,
    #[serde(rename = "ramBandwidthGBs", skip_serializing_if = "Option::is_none")]
    ram_bandwidth_gbs: Option<f64>,
    #[serde(rename = "l1BandwidthGBs", skip_serializing_if = "Option::is_none")]
    l1_bandwidth_gbs: Option<f64>,
    #[serde(rename = "l2BandwidthGBs", skip_serializing_if = "Option::is_none")]
    l2_bandwidth_gbs: Option<f64>,
    single_core_history: Vec<f64>,
    multi_core_history: Vec<f64>,
}

impl BenchmarkResult {
    /// A successful result with no measurements yet attached
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            single_core: None,
            multi_core: None,
            ram_score: None,
            ram_bandwidth_gbs: None,
            l1_bandwidth_gbs: None,
            l2_bandwidth_gbs: None,
            single_core_history: Vec::new(),
            multi_core_history: Vec::new(),
        }
    }

    /// A failed result. An empty message is replaced so failures always explain themselves.
    pub fn failure(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = crate::UNEXPLAINED_FAILURE_MESSAGE.to_string();
        }
        Self {
            success: false,
            message,
            ..Self::success(String::new())
        }
    }

    /// Attach the single-core score
    pub fn with_single_core(mut self, score: f64) -> Self {
        self.single_core = Some(score);
        self
    }

    /// Attach the multi-core score
    pub fn with_multi_core(mut self, score: f64) -> Self {
        self.multi_core = Some(score);
        self
    }

    /// Attach the RAM score
    pub fn with_ram_score(mut self, score: f64) -> Self {
        self.ram_score = Some(score);
        self
    }

    /// Attach the measured bandwidths in GB/s (RAM, L1, L2)
    pub fn with_bandwidths(mut self, ram: Option<f64>, l1: Option<f64>, l2: Option<f64>) -> Self {
        self.ram_bandwidth_gbs = ram;
        self.l1_bandwidth_gbs = l1;
        self.l2_bandwidth_gbs = l2;
        self
    }

    /// Attach the per-iteration score histories
    pub fn with_histories(mut self, single_core: Vec<f64>, multi_core: Vec<f64>) -> Self {
        self.single_core_history = single_core;
        self.multi_core_history = multi_core;
        self
    }

    /// Whether the kernel reported a successful run
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Status text from the kernel, or the failure description
    pub fn message(&self) -> &str {
        &self.message
    }

    fn trusted(&self, value: Option<f64>) -> Option<f64> {
        if self.success { value } else { None }
    }

    /// Single-core score, if measured
    pub fn single_core(&self) -> Option<f64> {
        self.trusted(self.single_core)
    }

    /// Multi-core score, if measured
    pub fn multi_core(&self) -> Option<f64> {
        self.trusted(self.multi_core)
    }

    /// RAM score, if measured
    pub fn ram_score(&self) -> Option<f64> {
        self.trusted(self.ram_score)
    }

    /// RAM copy bandwidth in GB/s, if measured
    pub fn ram_bandwidth_gbs(&self) -> Option<f64> {
        self.trusted(self.ram_bandwidth_gbs)
    }

    /// L1 cache copy bandwidth in GB/s, if measured
    pub fn l1_bandwidth_gbs(&self) -> Option<f64> {
        self.trusted(self.l1_bandwidth_gbs)
    }

    /// L2 cache copy bandwidth in GB/s, if measured
    pub fn l2_bandwidth_gbs(&self) -> Option<f64> {
        self.trusted(self.l2_bandwidth_gbs)
    }

    /// Per-iteration single-core scores as reported (possibly empty)
    pub fn single_core_history(&self) -> &[f64] {
        if self.success {
            &self.single_core_history
        } else {
            &[]
        }
    }

    /// Per-iteration multi-core scores as reported (possibly empty)
    pub fn multi_core_history(&self) -> &[f64] {
        if self.success {
            &self.multi_core_history
        } else {
            &[]
        }
    }

    /// Single-core series for charts.
    ///
    /// Presentation policy only: an empty history with a present scalar score
    /// is shown as the one-point series `[score]`. This is not a measurement.
    pub fn single_core_series(&self) -> Vec<f64> {
        display_series(self.single_core_history(), self.single_core())
    }

    /// Multi-core series for charts, with the same single-point fallback
    pub fn multi_core_series(&self) -> Vec<f64> {
        display_series(self.multi_core_history(), self.multi_core())
    }
}

fn display_series(history: &[f64], scalar: Option<f64>) -> Vec<f64> {
    match (history.is_empty(), scalar) {
        (false, _) => history.to_vec(),
        (true, Some(score)) => vec![score],
        (true, None) => Vec::new(),
    }
}
