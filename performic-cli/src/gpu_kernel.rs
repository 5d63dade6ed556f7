//! External GPU Kernel
//!
//! Line protocol on the program's stdout:
//!
//! ```text
//! fps 0        live frame rate (0 = not yet measured)
//! fps 58
//! score 5800   final GPU score, last one wins
//! ```
//!
//! Other lines are ignored. A kernel that prints no `score` line is scored
//! from the average of its non-zero `fps` readings. The surface label is passed
//! in `PERFORMIC_SURFACE`.

use crate::supervisor::ProcessHandle;
use performic_core::{FpsReporter, GpuKernel, KernelError, RenderSurface};
use performic_score::gpu_score_from_fps;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable carrying the render surface label
pub const SURFACE_ENV: &str = "PERFORMIC_SURFACE";

/// One recognized line of GPU kernel output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GpuLine {
    /// Live FPS reading
    Fps(u32),
    /// Final score
    Score(f64),
}

/// Parse one stdout line; unrecognized or malformed lines yield `None`
pub fn parse_gpu_line(line: &str) -> Option<GpuLine> {
    let mut parts = line.split_whitespace();
    let key = parts.next()?;
    let value = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    match key {
        "fps" => value.parse().ok().map(GpuLine::Fps),
        "score" => value.parse().ok().map(GpuLine::Score),
        _ => None,
    }
}

/// GPU kernel backed by an external command
#[derive(Debug, Clone)]
pub struct CommandGpuKernel {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandGpuKernel {
    /// GPU kernel running `argv`, killed after `timeout`
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self { argv, timeout }
    }
}

impl GpuKernel for CommandGpuKernel {
    fn run(&self, surface: &RenderSurface, fps: &FpsReporter) -> Result<f64, KernelError> {
        info!(command = ?self.argv, surface = %surface.label(), "running GPU kernel");
        let mut process =
            ProcessHandle::spawn(&self.argv, &[(SURFACE_ENV, surface.label())], self.timeout)?;

        let mut score = None;
        let mut measured = Vec::new();
        process.for_each_line(|line| match parse_gpu_line(line) {
            Some(GpuLine::Fps(value)) => {
                if value > 0 {
                    measured.push(value);
                }
                fps.report(value);
            }
            Some(GpuLine::Score(value)) => score = Some(value),
            None => debug!(line, "ignored GPU kernel output"),
        })?;

        match score.or_else(|| score_from_readings(&measured)) {
            Some(score) => Ok(score),
            None => Err(KernelError::Failed(
                "GPU kernel printed no score and no fps".to_string(),
            )),
        }
    }
}

/// Score from the mean of the measured frame rates
fn score_from_readings(readings: &[u32]) -> Option<f64> {
    if readings.is_empty() {
        return None;
    }
    let mean = readings.iter().map(|&fps| f64::from(fps)).sum::<f64>() / readings.len() as f64;
    Some(gpu_score_from_fps(mean))
}
