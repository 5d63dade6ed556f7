//! Configuration loading from performic.toml
//!
//! Performic configuration can be specified in a `performic.toml` file. The
//! file is discovered by walking up from the current directory; every field is
//! optional and falls back to its default.

use anyhow::Context;
use performic_score::ReferenceScores;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file name looked up during discovery
pub const CONFIG_FILE_NAME: &str = "performic.toml";

/// Performic configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PerformicConfig {
    /// Thermal sampler settings
    #[serde(default)]
    pub sampler: SamplerConfig,
    /// CPU/memory kernel settings
    #[serde(default)]
    pub kernel: KernelConfig,
    /// GPU kernel settings
    #[serde(default)]
    pub gpu: GpuConfig,
    /// Prepare/cleanup commands
    #[serde(default)]
    pub hooks: HooksConfig,
    /// Thermal start gate
    #[serde(default)]
    pub gate: GateConfig,
    /// Reference values for progress fractions
    #[serde(default)]
    pub reference: ReferenceScores,
    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Thermal sampler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Sampling cadence (e.g., "500ms")
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Extra wait on top of one interval when stopping the sampler
    #[serde(default = "default_join_grace")]
    pub join_grace: String,
    /// Only consider sensors whose label contains this text
    #[serde(default)]
    pub sensor: Option<String>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            join_grace: default_join_grace(),
            sensor: None,
        }
    }
}

fn default_interval() -> String {
    "500ms".to_string()
}
fn default_join_grace() -> String {
    "250ms".to_string()
}

/// Compute kernel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Program and arguments; stdout is the result payload
    #[serde(default)]
    pub command: Vec<String>,
    /// Hard limit for one kernel run (e.g., "10m")
    #[serde(default = "default_kernel_timeout")]
    pub timeout: String,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout: default_kernel_timeout(),
        }
    }
}

fn default_kernel_timeout() -> String {
    "10m".to_string()
}

/// GPU kernel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuConfig {
    /// Program and arguments; no GPU test runs when empty
    #[serde(default)]
    pub command: Vec<String>,
    /// Hard limit for one GPU run
    #[serde(default = "default_gpu_timeout")]
    pub timeout: String,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout: default_gpu_timeout(),
        }
    }
}

fn default_gpu_timeout() -> String {
    "2m".to_string()
}

/// Best-effort commands run around the benchmark
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HooksConfig {
    /// Run before the sampler starts
    #[serde(default)]
    pub prepare: Vec<String>,
    /// Run after the sampler stopped
    #[serde(default)]
    pub cleanup: Vec<String>,
    /// Hard limit for each hook command
    #[serde(default = "default_hook_timeout")]
    pub timeout: String,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            prepare: Vec::new(),
            cleanup: Vec::new(),
            timeout: default_hook_timeout(),
        }
    }
}

fn default_hook_timeout() -> String {
    "30s".to_string()
}

/// Thermal start gate
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GateConfig {
    /// Refuse to start at or above this temperature (°C)
    #[serde(default)]
    pub max_start_temperature: Option<f32>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human", "json", "csv"
    #[serde(default = "default_format")]
    pub format: String,
    /// Write the report here instead of stdout
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            path: None,
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}

impl PerformicConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("invalid {}", path.display()))?;
        Ok(config)
    }

    /// Find `performic.toml` by walking up from `start`
    pub fn find_from(start: &Path) -> Option<PathBuf> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Try to discover and load configuration from the current directory upward.
    ///
    /// A discovered file that fails to parse is an error, not a silent default.
    pub fn discover() -> anyhow::Result<Option<Self>> {
        let cwd = std::env::current_dir()?;
        match Self::find_from(&cwd) {
            Some(path) => Self::load(path).map(Some),
            None => Ok(None),
        }
    }

    /// Sampling interval
    pub fn sample_interval(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.sampler.interval).context("[sampler] interval")
    }

    /// Sampler join grace
    pub fn join_grace(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.sampler.join_grace).context("[sampler] join_grace")
    }

    /// Compute kernel timeout
    pub fn kernel_timeout(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.kernel.timeout).context("[kernel] timeout")
    }

    /// Per-hook timeout
    pub fn hook_timeout(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.hooks.timeout).context("[hooks] timeout")
    }

    /// GPU kernel timeout
    pub fn gpu_timeout(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.gpu.timeout).context("[gpu] timeout")
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# Performic Configuration

[sampler]
# Thermal sampling cadence
interval = "500ms"
# Extra time allowed for the sampler to stop, on top of one interval
join_grace = "250ms"
# Only read sensors whose label contains this text (uncomment to enable)
# sensor = "Package"

[kernel]
# Compute kernel; its stdout is the JSON result payload
command = []
# Hard limit for one kernel run
timeout = "10m"

[gpu]
# GPU kernel; prints "fps <n>" lines and a final "score <x>" line
# (without a score line, the score is average fps x 100)
command = []
timeout = "2m"

[hooks]
# Best-effort commands run before and after the benchmark
prepare = []
cleanup = []
# A hook still running after this is killed
timeout = "30s"

[gate]
# Refuse to start when the device is at or above this temperature (uncomment to enable)
# max_start_temperature = 45.0

[reference]
# A score equal to its reference fills the progress bar
single_core = 2000.0
multi_core = 8000.0
ram = 2000.0
gpu = 6000.0
ram_bandwidth_gbs = 20.0
l1_bandwidth_gbs = 100.0
l2_bandwidth_gbs = 50.0

[output]
# Default output format: human, json, csv
format = "human"
# Write the report to a file instead of stdout (uncomment to enable)
# path = "performic-report.json"
"#
        .to_string()
    }
}

/// Parse duration string (e.g., "500ms", "2s", "1.5m")
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(anyhow::anyhow!("Empty duration string"));
    }

    let (num_part, unit_part) = s
        .char_indices()
        .find(|(_, c)| c.is_alphabetic())
        .map(|(i, _)| s.split_at(i))
        .unwrap_or((s, "s"));

    let value: f64 = num_part
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
    if !value.is_finite() || value < 0.0 {
        return Err(anyhow::anyhow!("Invalid duration: {}", s));
    }

    let multiplier: u64 = match unit_part.to_lowercase().as_str() {
        "ms" => 1_000_000,
        "s" | "" => 1_000_000_000,
        "m" | "min" => 60_000_000_000,
        "h" => 3_600_000_000_000,
        _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
    };

    Ok(Duration::from_nanos((value * multiplier as f64) as u64))
}
