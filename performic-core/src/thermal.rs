//! Thermal Sampler
//!
//! Periodically reads a temperature probe on a background thread while a
//! benchmark runs.
//!
//! The sampling thread owns the growing sequence outright. Nobody else can see
//! it until [`ThermalSampler::stop`] has confirmed the thread finished, at which
//! point the whole `Vec` is moved to the caller. No lock guards the points.
//!
//! ```text
//! start ──► [sample, park(interval)] ──► [sample, park] ──► ... ─┐
//! stop  ──► set flag + unpark ──► thread exits ──► Vec handed over ◄┘
//! ```

use crate::clock::RunClock;
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use performic_payload::ThermalPoint;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Default sampling cadence
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Extra time granted on top of one interval when waiting for the thread to exit
pub const DEFAULT_JOIN_GRACE: Duration = Duration::from_millis(250);

/// Source of temperature readings.
///
/// Implementations must be fast and non-blocking and always produce a value.
pub trait TemperatureProbe: Send + Sync {
    /// Current temperature in degrees Celsius
    fn read_celsius(&self) -> f32;
}

impl<F> TemperatureProbe for F
where
    F: Fn() -> f32 + Send + Sync,
{
    fn read_celsius(&self) -> f32 {
        self()
    }
}

/// Errors reported by the sampler lifecycle
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("thermal sampler is already running")]
    AlreadyRunning,

    #[error("thermal sampler is not running")]
    NotRunning,

    #[error("sampling interval must be greater than zero")]
    InvalidInterval,

    #[error("failed to spawn thermal sampler thread: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("thermal sampler did not stop within {0:?}")]
    StopTimeout(Duration),

    #[error("thermal sampler thread terminated abnormally")]
    Panicked,
}

struct RunningSampler {
    stop: Arc<AtomicBool>,
    done: Receiver<Vec<ThermalPoint>>,
    handle: JoinHandle<()>,
    interval: Duration,
}

/// Background temperature sampler with a bounded, cooperative stop
pub struct ThermalSampler {
    probe: Arc<dyn TemperatureProbe>,
    join_grace: Duration,
    running: Option<RunningSampler>,
}

impl ThermalSampler {
    /// Create a sampler reading from `probe`
    pub fn new(probe: Arc<dyn TemperatureProbe>) -> Self {
        Self {
            probe,
            join_grace: DEFAULT_JOIN_GRACE,
            running: None,
        }
    }

    /// Override the grace period added to one interval when stopping
    pub fn with_join_grace(mut self, join_grace: Duration) -> Self {
        self.join_grace = join_grace;
        self
    }

    /// Whether a sampling thread is currently active
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Start sampling every `interval`, timing points from now
    pub fn start(&mut self, interval: Duration) -> Result<(), SamplerError> {
        self.start_with_clock(interval, RunClock::start())
    }

    /// Start sampling every `interval`, timing points against an existing run clock.
    ///
    /// The first point is taken immediately.
    pub fn start_with_clock(
        &mut self,
        interval: Duration,
        clock: RunClock,
    ) -> Result<(), SamplerError> {
        if self.running.is_some() {
            return Err(SamplerError::AlreadyRunning);
        }
        if interval.is_zero() {
            return Err(SamplerError::InvalidInterval);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done) = bounded(1);
        let probe = Arc::clone(&self.probe);
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("performic-thermal".to_string())
            .spawn(move || {
                let points = sample_loop(probe.as_ref(), clock, interval, &thread_stop);
                // The receiver may have given up already; the points are then discarded.
                let _ = done_tx.send(points);
            })?;

        debug!(interval_ms = interval.as_millis() as u64, "thermal sampler started");
        self.running = Some(RunningSampler {
            stop,
            done,
            handle,
            interval,
        });
        Ok(())
    }

    /// Stop sampling and take ownership of the collected sequence.
    ///
    /// Blocks for at most one interval plus the join grace. When this returns
    /// `Ok`, the sampling thread has exited and no further point can be added.
    ///
    /// On [`SamplerError::StopTimeout`] (a probe read outlasting the budget) the
    /// thread is detached rather than joined. The stop flag is already set, so
    /// it exits as soon as the read in progress returns, and its points are
    /// dropped unseen.
    pub fn stop(&mut self) -> Result<Vec<ThermalPoint>, SamplerError> {
        let running = self.running.take().ok_or(SamplerError::NotRunning)?;

        running.stop.store(true, Ordering::Release);
        running.handle.thread().unpark();

        let budget = running.interval + self.join_grace;
        match running.done.recv_timeout(budget) {
            Ok(points) => {
                running
                    .handle
                    .join()
                    .map_err(|_| SamplerError::Panicked)?;
                debug!(points = points.len(), "thermal sampler stopped");
                Ok(points)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(budget_ms = budget.as_millis() as u64, "thermal sampler stop timed out");
                Err(SamplerError::StopTimeout(budget))
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = running.handle.join();
                Err(SamplerError::Panicked)
            }
        }
    }
}

impl Drop for ThermalSampler {
    fn drop(&mut self) {
        if self.running.is_some() {
            let _ = self.stop();
        }
    }
}

impl std::fmt::Debug for ThermalSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThermalSampler")
            .field("join_grace", &self.join_grace)
            .field("running", &self.is_running())
            .finish()
    }
}

fn sample_loop(
    probe: &dyn TemperatureProbe,
    clock: RunClock,
    interval: Duration,
    stop: &AtomicBool,
) -> Vec<ThermalPoint> {
    let mut points = Vec::new();

    'sampling: loop {
        if stop.load(Ordering::Acquire) {
            break;
        }

        let elapsed_ms = clock.elapsed_ms();
        match catch_unwind(AssertUnwindSafe(|| probe.read_celsius())) {
            Ok(temperature_c) => points.push(ThermalPoint::new(elapsed_ms, temperature_c)),
            Err(_) => {
                warn!("temperature probe panicked; sampling stopped early");
                break;
            }
        }

        // park_timeout may wake spuriously, so wait against a deadline
        let deadline = Instant::now() + interval;
        loop {
            if stop.load(Ordering::Acquire) {
                break 'sampling;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_probe(counter: Arc<AtomicUsize>) -> Arc<dyn TemperatureProbe> {
        Arc::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            30.0 + n as f32 * 0.5
        })
    }

    #[test]
    fn test_collects_ordered_points() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut sampler = ThermalSampler::new(counting_probe(counter));
        sampler.start(Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(80));
        let points = sampler.stop().unwrap();

        assert!(points.len() >= 2);
        assert!(points[0].elapsed_ms < 10);
        assert_eq!(points[0].temperature_c, 30.0);
        for pair in points.windows(2) {
            assert!(pair[1].elapsed_ms >= pair[0].elapsed_ms);
        }
    }

    #[test]
    fn test_stop_is_bounded_by_one_interval() {
        let counter = Arc::new(AtomicUsize::new(0));
        let interval = Duration::from_millis(300);
        let mut sampler = ThermalSampler::new(counting_probe(counter));
        sampler.start(interval).unwrap();
        thread::sleep(Duration::from_millis(20));

        let begin = Instant::now();
        sampler.stop().unwrap();
        assert!(begin.elapsed() < interval + DEFAULT_JOIN_GRACE);
    }

    #[test]
    fn test_no_points_after_stop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut sampler = ThermalSampler::new(counting_probe(Arc::clone(&counter)));
        sampler.start(Duration::from_millis(5)).unwrap();
        thread::sleep(Duration::from_millis(30));
        let points = sampler.stop().unwrap();

        let reads = counter.load(Ordering::SeqCst);
        assert_eq!(reads, points.len());
        thread::sleep(Duration::from_millis(30));
        assert_eq!(counter.load(Ordering::SeqCst), reads);
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut sampler = ThermalSampler::new(Arc::new(|| 25.0_f32));
        assert!(matches!(sampler.stop(), Err(SamplerError::NotRunning)));
        assert!(matches!(
            sampler.start(Duration::ZERO),
            Err(SamplerError::InvalidInterval)
        ));

        sampler.start(Duration::from_millis(10)).unwrap();
        assert!(sampler.is_running());
        assert!(matches!(
            sampler.start(Duration::from_millis(10)),
            Err(SamplerError::AlreadyRunning)
        ));
        sampler.stop().unwrap();
        assert!(!sampler.is_running());

        // Restartable after a clean stop
        sampler.start(Duration::from_millis(10)).unwrap();
        assert!(!sampler.stop().unwrap().is_empty());
    }

    #[test]
    fn test_panicking_probe_keeps_earlier_points() {
        let counter = Arc::new(AtomicUsize::new(0));
        let probe_counter = Arc::clone(&counter);
        let probe: Arc<dyn TemperatureProbe> = Arc::new(move || {
            if probe_counter.fetch_add(1, Ordering::SeqCst) >= 2 {
                panic!("sensor went away");
            }
            40.0
        });
        let mut sampler = ThermalSampler::new(probe);
        sampler.start(Duration::from_millis(5)).unwrap();
        thread::sleep(Duration::from_millis(50));

        let points = sampler.stop().unwrap();
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn test_slow_probe_times_out_stop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let probe_counter = Arc::clone(&counter);
        let probe: Arc<dyn TemperatureProbe> = Arc::new(move || {
            if probe_counter.fetch_add(1, Ordering::SeqCst) > 0 {
                thread::sleep(Duration::from_millis(400));
            }
            45.0
        });
        let mut sampler = ThermalSampler::new(probe).with_join_grace(Duration::from_millis(20));
        sampler.start(Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(50));

        let begin = Instant::now();
        assert!(matches!(sampler.stop(), Err(SamplerError::StopTimeout(_))));
        assert!(begin.elapsed() < Duration::from_millis(300));
        assert!(!sampler.is_running());

        // The detached thread exits once the slow read returns
        thread::sleep(Duration::from_millis(600));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_stops_thread() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let mut sampler = ThermalSampler::new(counting_probe(Arc::clone(&counter)));
            sampler.start(Duration::from_millis(5)).unwrap();
            thread::sleep(Duration::from_millis(20));
        }
        let reads = counter.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(counter.load(Ordering::SeqCst), reads);
    }
}
